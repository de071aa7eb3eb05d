//! Runtime configuration
//!
//! Defaults target the camera board's access point. Each field can be
//! overridden from the environment:
//!
//! | Variable            | Meaning                                   |
//! |---------------------|-------------------------------------------|
//! | `ROVER_BASE_URL`    | Camera board URL (`/cmd` and `/stream`)   |
//! | `ROVER_TARGET_IP`   | Motor board IP forwarded with each command |
//! | `ROVER_TARGET_PORT` | Motor board port forwarded with each command |
//! | `ROVER_SPEED`       | Initial motor speed (0-255)               |

use crate::dispatch::DispatchPolicy;
use crate::health::SupervisorConfig;
use anyhow::{bail, Context, Result};
use rover_shared::{SpeedSetting, TargetOverride};

pub const DEFAULT_BASE_URL: &str = "http://192.168.4.1";

/// Configuration for the control link
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Camera board URL serving `/cmd` and `/stream`
    pub base_url: String,
    /// Forwarding target attached to every command
    pub target: TargetOverride,
    pub initial_speed: SpeedSetting,
    pub dispatch: DispatchPolicy,
    pub supervisor: SupervisorConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            target: TargetOverride::default(),
            initial_speed: SpeedSetting::default(),
            dispatch: DispatchPolicy::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl LinkConfig {
    /// Defaults overridden by `ROVER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("ROVER_BASE_URL") {
            let url = url.trim();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("ROVER_BASE_URL must be an http(s) URL, got {:?}", url);
            }
            config.base_url = url.to_string();
        }

        let ip = lookup("ROVER_TARGET_IP");
        let port = lookup("ROVER_TARGET_PORT");
        if let Some(port) = port.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            let parsed: u16 = port
                .parse()
                .with_context(|| format!("invalid ROVER_TARGET_PORT {:?}", port))?;
            if parsed == 0 {
                bail!("ROVER_TARGET_PORT must be non-zero");
            }
        }
        config.target = TargetOverride::new(ip.as_deref(), port.as_deref());

        if let Some(speed) = lookup("ROVER_SPEED") {
            let speed: u8 = speed
                .trim()
                .parse()
                .with_context(|| format!("invalid ROVER_SPEED {:?} (expected 0-255)", speed))?;
            config.initial_speed = SpeedSetting::new(speed);
        }

        Ok(config)
    }
}
