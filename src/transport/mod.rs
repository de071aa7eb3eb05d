pub mod http;
#[cfg(test)]
pub mod scripted;
pub mod traits;

pub use http::{build_client, join_url, HttpTransport};
pub use traits::CommandTransport;
