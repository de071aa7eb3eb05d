//! Device request/response codec
//!
//! Commands travel as query parameters on a plain GET:
//! ```text
//! GET /cmd?cmd=<command>[&ip=<addr>][&port=<port>]
//! ```
//! and the device answers with a short text body. Any 2xx status is a
//! delivered command; everything else is a protocol failure.

use serde::Serialize;

use crate::LinkError;

/// Path of the command endpoint
pub const COMMAND_PATH: &str = "/cmd";

/// Path of the media stream endpoint
pub const STREAM_PATH: &str = "/stream";

/// Optional forwarding target attached to every command request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOverride {
    ip: Option<String>,
    port: Option<String>,
}

impl TargetOverride {
    /// Build an override, dropping values that are empty after trimming
    pub fn new(ip: Option<&str>, port: Option<&str>) -> Self {
        Self {
            ip: non_empty(ip),
            port: non_empty(port),
        }
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Query parameters of a command request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRequest {
    pub cmd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl CommandRequest {
    pub fn new(cmd: impl Into<String>, target: &TargetOverride) -> Self {
        Self {
            cmd: cmd.into(),
            ip: target.ip.clone(),
            port: target.port.clone(),
        }
    }
}

/// Query parameters of a stream request; `t` defeats intermediate caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamRequest {
    pub t: u64,
}

impl StreamRequest {
    pub fn fresh() -> Self {
        Self { t: crate::now_ms() }
    }
}

/// Raw answer from the command endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse {
    pub status: u16,
    pub body: String,
}

impl DeviceResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Split into the delivered body or a protocol failure
    pub fn classify(self) -> Result<String, LinkError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(LinkError::ProtocolFailure {
                status: self.status,
                body: self.body,
            })
        }
    }
}
