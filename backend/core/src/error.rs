use thiserror::Error;

/// Top-level error type for the StreamAudit engine and its page collaborators.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A probe, query or script failed against an unexpected page state.
    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    /// The collaborator rejected a single command.
    #[error("protocol error in {method}: {message}")]
    Protocol { method: String, message: String },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// The page collaborator is gone; nothing further can be read from the page.
    #[error("page disconnected: {0}")]
    Disconnected(String),

    #[error("page command timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuditError {
    /// Whether the whole analysis must stop.
    ///
    /// Everything else is local to one probe or heuristic and degrades to an
    /// empty or negative result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuditError::Disconnected(_) | AuditError::Timeout(_) | AuditError::Other(_)
        )
    }
}

/// Result alias used across the page collaborator boundary.
pub type PageResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_and_protocol_errors_are_recoverable() {
        assert!(!AuditError::Evaluation("window.Hls threw".into()).is_fatal());
        assert!(!AuditError::InvalidSelector("[[".into()).is_fatal());
        assert!(!AuditError::Protocol {
            method: "DOM.getAttributes".into(),
            message: "Could not find node with given id".into(),
        }
        .is_fatal());
    }

    #[test]
    fn transport_failures_are_fatal() {
        assert!(AuditError::Disconnected("socket closed".into()).is_fatal());
        assert!(AuditError::Timeout("Runtime.evaluate".into()).is_fatal());
    }
}
