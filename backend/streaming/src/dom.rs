//! DOM helpers shared by the detectors and checkers.

use streamaudit_core::{DomTrackInfo, ElementHandle, PageResult, PageState};
use tracing::warn;

/// Keep going with `T::default()` after a recoverable collaborator failure;
/// hand fatal ones back to the caller.
pub fn recover_or_propagate<T: Default>(
    result: PageResult<T>,
    component: &str,
    what: &str,
) -> PageResult<T> {
    Ok(skip_or_propagate(result, component, what)?.unwrap_or_default())
}

/// `None` after a recoverable failure, for callers that drop the one item
/// and carry on with the rest. Fatal failures are handed back.
pub fn skip_or_propagate<T>(
    result: PageResult<T>,
    component: &str,
    what: &str,
) -> PageResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(error = %e, "[{}] {} failed, continuing without it", component, what);
            Ok(None)
        }
    }
}

/// Attribute value with empty strings treated as absent.
pub async fn non_empty_attribute(
    page: &dyn PageState,
    element: &ElementHandle,
    name: &str,
) -> PageResult<Option<String>> {
    Ok(page
        .attribute(element, name)
        .await?
        .filter(|v| !v.is_empty()))
}

pub async fn trimmed_text(page: &dyn PageState, element: &ElementHandle) -> PageResult<String> {
    Ok(page.text_content(element).await?.trim().to_string())
}

/// Path-like locator: `#id` where available, otherwise the parent's locator
/// followed by `> tag`, disambiguated with `:nth-of-type(n)` among same-tag
/// siblings.
pub async fn structural_locator(page: &dyn PageState, element: &ElementHandle) -> PageResult<String> {
    let mut segments = Vec::new();
    let mut current = *element;
    loop {
        if let Some(id) = non_empty_attribute(page, &current, "id").await? {
            segments.push(format!("#{id}"));
            break;
        }
        let tag = page.tag_name(&current).await?;
        let Some(parent) = page.parent(&current).await? else {
            segments.push(tag);
            break;
        };

        let mut same_tag = Vec::new();
        for sibling in page.children(&parent).await? {
            if page.tag_name(&sibling).await? == tag {
                same_tag.push(sibling);
            }
        }
        if same_tag.len() > 1 {
            let position = same_tag.iter().position(|s| *s == current).unwrap_or(0) + 1;
            segments.push(format!("{tag}:nth-of-type({position})"));
        } else {
            segments.push(tag);
        }
        current = parent;
    }
    segments.reverse();
    Ok(segments.join(" > "))
}

/// `#id`, else `tag.class1.class2` (at most two classes), else `tag`.
pub async fn short_locator(page: &dyn PageState, element: &ElementHandle) -> PageResult<String> {
    if let Some(id) = non_empty_attribute(page, element, "id").await? {
        return Ok(format!("#{id}"));
    }
    let tag = page.tag_name(element).await?;
    let classes: Vec<String> = page
        .attribute(element, "class")
        .await?
        .unwrap_or_default()
        .split_whitespace()
        .take(2)
        .map(String::from)
        .collect();
    if classes.is_empty() {
        Ok(tag)
    } else {
        Ok(format!("{tag}.{}", classes.join(".")))
    }
}

/// Nearest ancestor (self excluded) whose tag is one of `tags`.
pub async fn closest_ancestor(
    page: &dyn PageState,
    element: &ElementHandle,
    tags: &[&str],
) -> PageResult<Option<ElementHandle>> {
    let mut current = page.parent(element).await?;
    while let Some(el) = current {
        if tags.contains(&page.tag_name(&el).await?.as_str()) {
            return Ok(Some(el));
        }
        current = page.parent(&el).await?;
    }
    Ok(None)
}

/// `<track>` elements matching `selector`, with the locator of their media element.
pub async fn collect_dom_tracks(
    page: &dyn PageState,
    selector: &str,
) -> PageResult<Vec<DomTrackInfo>> {
    let mut tracks = Vec::new();
    for track in page.query_all(selector, None).await? {
        let parent_selector = match closest_ancestor(page, &track, &["video", "audio"]).await? {
            Some(media) => structural_locator(page, &media).await?,
            None => "unknown".to_string(),
        };
        tracks.push(DomTrackInfo {
            kind: page
                .attribute(&track, "kind")
                .await?
                .unwrap_or_default()
                .to_ascii_lowercase(),
            src: page.attribute(&track, "src").await?,
            srclang: page.attribute(&track, "srclang").await?,
            label: page.attribute(&track, "label").await?,
            parent_selector,
        });
    }
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamaudit_browser::HtmlPage;
    use streamaudit_core::AuditError;

    const PAGE: &str = r#"<html><body>
        <div class="stage wide dark">
            <video src="a.mp4"></video>
            <video src="b.mp4">
                <track kind="captions" srclang="en" label="English" src="en.vtt">
            </video>
        </div>
        <section id="solo"><audio><track kind="descriptions" src="ad.vtt"></audio></section>
        <track kind="captions" src="orphan.vtt">
    </body></html>"#;

    #[tokio::test]
    async fn structural_locator_disambiguates_siblings() {
        let page = HtmlPage::new(PAGE);
        let videos = page.query_all("video", None).await.unwrap();
        assert_eq!(
            structural_locator(&page, &videos[1]).await.unwrap(),
            "html > body > div > video:nth-of-type(2)"
        );
        let audio = page.query_one("audio", None).await.unwrap().unwrap();
        assert_eq!(structural_locator(&page, &audio).await.unwrap(), "#solo > audio");
    }

    #[tokio::test]
    async fn short_locator_uses_first_two_classes() {
        let page = HtmlPage::new(PAGE);
        let stage = page.query_one("div", None).await.unwrap().unwrap();
        assert_eq!(short_locator(&page, &stage).await.unwrap(), "div.stage.wide");
        let solo = page.query_one("section", None).await.unwrap().unwrap();
        assert_eq!(short_locator(&page, &solo).await.unwrap(), "#solo");
    }

    #[tokio::test]
    async fn dom_tracks_record_their_media_element() {
        let page = HtmlPage::new(PAGE);
        let tracks = collect_dom_tracks(&page, r#"track[kind="captions"]"#).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].srclang.as_deref(), Some("en"));
        assert_eq!(tracks[0].parent_selector, "html > body > div > video:nth-of-type(2)");
        assert_eq!(tracks[1].parent_selector, "unknown");
        assert_eq!(tracks[1].srclang, None);
    }

    #[test]
    fn recoverable_errors_degrade_to_default() {
        let degraded: PageResult<Vec<u8>> = recover_or_propagate(
            Err(AuditError::Evaluation("boom".into())),
            "Test",
            "lookup",
        );
        assert_eq!(degraded.unwrap(), Vec::<u8>::new());

        let fatal: PageResult<bool> =
            recover_or_propagate(Err(AuditError::Disconnected("gone".into())), "Test", "lookup");
        assert!(matches!(fatal, Err(AuditError::Disconnected(_))));
    }

    #[test]
    fn recoverable_errors_skip_one_item() {
        let skipped: PageResult<Option<u8>> =
            skip_or_propagate(Err(AuditError::InvalidSelector("[[".into())), "Test", "lookup");
        assert_eq!(skipped.unwrap(), None);
        assert_eq!(skip_or_propagate(Ok(7u8), "Test", "lookup").unwrap(), Some(7));

        let fatal: PageResult<Option<u8>> =
            skip_or_propagate(Err(AuditError::Timeout("slow".into())), "Test", "lookup");
        assert!(matches!(fatal, Err(AuditError::Timeout(_))));
    }
}
