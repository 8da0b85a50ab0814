pub mod cdp_client;
pub mod element_query;
pub mod html_page;
pub mod network_capture;
pub mod page_control;
pub mod static_feed;

pub use cdp_client::{CdpClient, CdpEvent};
pub use element_query::ElementQuery;
pub use html_page::HtmlPage;
pub use network_capture::NetworkCapture;
pub use page_control::PageControl;
pub use static_feed::StaticManifestFeed;
