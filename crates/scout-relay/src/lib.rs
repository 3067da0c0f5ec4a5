//! Scout relay: streams upstream people-search results and proxies profile
//! lookups over HTTP.

pub mod error;
pub mod routes;
pub mod upstream;

pub use error::RelayError;
pub use routes::{AppState, build_router};
pub use upstream::UpstreamClient;
