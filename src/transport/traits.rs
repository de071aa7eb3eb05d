//! Transport trait abstraction for the device command endpoint

use async_trait::async_trait;
use rover_shared::{CommandRequest, DeviceResponse, LinkError};

/// Delivers one command request to the device and returns its raw answer
///
/// Implementations report connection-level problems as
/// [`LinkError::NetworkFailure`] and hand back any HTTP answer untouched;
/// status classification and deadlines belong to the dispatcher.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send(&self, request: &CommandRequest) -> Result<DeviceResponse, LinkError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
