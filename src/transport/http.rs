//! HTTP transport for the camera board's `/cmd` endpoint

use crate::transport::traits::CommandTransport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rover_shared::codec::COMMAND_PATH;
use rover_shared::{CommandRequest, DeviceResponse, LinkError};
use std::time::Duration;

/// Connect budget for the shared client; response budgets are applied by callers
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Build the HTTP client shared by the command transport and the stream reader
pub fn build_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

/// Join a base URL and an absolute path without doubling the slash
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Sends commands as `GET /cmd?cmd=...` requests
pub struct HttpTransport {
    client: Client,
    command_url: String,
}

impl HttpTransport {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            command_url: join_url(base_url, COMMAND_PATH),
        }
    }

    pub fn command_url(&self) -> &str {
        &self.command_url
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn send(&self, request: &CommandRequest) -> Result<DeviceResponse, LinkError> {
        let response = self
            .client
            .get(&self.command_url)
            .query(request)
            .send()
            .await
            .map_err(|e| LinkError::NetworkFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LinkError::NetworkFailure(e.to_string()))?;

        Ok(DeviceResponse::new(status, body.trim()))
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_shared::TargetOverride;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://192.168.4.1", "/cmd"), "http://192.168.4.1/cmd");
        assert_eq!(join_url("http://192.168.4.1/", "/cmd"), "http://192.168.4.1/cmd");
    }

    #[test]
    fn test_transport_name_and_url() {
        let client = build_client().expect("client");
        let transport = HttpTransport::new(client, "http://192.168.4.1/");
        assert_eq!(transport.name(), "HTTP");
        assert_eq!(transport.command_url(), "http://192.168.4.1/cmd");
    }

    #[tokio::test]
    async fn test_unreachable_device_is_network_failure() {
        let client = build_client().expect("client");
        // Port 9 on localhost (discard) is closed in test environments
        let transport = HttpTransport::new(client, "http://127.0.0.1:9");
        let request = CommandRequest::new("PING", &TargetOverride::default());

        let result = transport.send(&request).await;
        assert!(matches!(result, Err(LinkError::NetworkFailure(_))));
    }
}
