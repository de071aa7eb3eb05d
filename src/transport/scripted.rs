//! In-memory transport with scripted replies, used by tests

use crate::transport::traits::CommandTransport;
use async_trait::async_trait;
use rover_shared::{CommandRequest, DeviceResponse, LinkError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// What the fake device does with the next request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer immediately
    Respond(DeviceResponse),
    /// Fail at the connection level
    Fail(String),
    /// Answer after a delay
    Delayed(Duration, DeviceResponse),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Respond(DeviceResponse::new(200, "OK"))
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Respond(DeviceResponse::new(status, body))
    }

    pub fn refused() -> Self {
        Reply::Fail("connection refused".into())
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    calls: Vec<(Instant, CommandRequest)>,
}

/// Transport that plays back queued replies and answers `200 OK` once they run out
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(Script {
                replies: replies.into_iter().collect(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().replies.push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().calls.len()
    }

    /// Commands sent so far, oldest first
    pub fn sent(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, req)| req.cmd.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<CommandRequest> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, req)| req.clone())
            .collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }
}

#[async_trait]
impl CommandTransport for ScriptedTransport {
    async fn send(&self, request: &CommandRequest) -> Result<DeviceResponse, LinkError> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.calls.push((Instant::now(), request.clone()));
            script.replies.pop_front()
        };

        match reply.unwrap_or_else(Reply::ok) {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(reason) => Err(LinkError::NetworkFailure(reason)),
            Reply::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
        }
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }
}
