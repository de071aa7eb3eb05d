//! Operator console input
//!
//! One line per action. Anything that is not a console keyword is treated as
//! a raw command template and handed to the encoder.

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    /// Raw command template, e.g. `ALL F 0` or `STOP`
    Command(String),
    SpeedUp,
    SpeedDown,
    SetSpeed(u8),
    /// One-shot connection test
    Test,
    RestartStream,
    /// Replace the forwarding target; missing parts clear the override
    Target { ip: Option<String>, port: Option<String> },
    ShowStatus,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub const HELP: &str = "commands: <raw command> | + | - | speed <0-255> | test | restart | \
                        target [ip] [port] | status | help | quit";

impl OperatorInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut words = line.split_whitespace();

        match words.next() {
            None => OperatorInput::Empty,
            Some("+") => OperatorInput::SpeedUp,
            Some("-") => OperatorInput::SpeedDown,
            Some("speed") => match words.next().map(str::parse::<u8>) {
                Some(Ok(value)) => OperatorInput::SetSpeed(value),
                _ => OperatorInput::Invalid("usage: speed <0-255>".into()),
            },
            Some("test") => OperatorInput::Test,
            Some("restart") => OperatorInput::RestartStream,
            Some("target") => OperatorInput::Target {
                ip: words.next().map(str::to_string),
                port: words.next().map(str::to_string),
            },
            Some("status") => OperatorInput::ShowStatus,
            Some("help") => OperatorInput::Help,
            Some("quit") | Some("exit") => OperatorInput::Quit,
            Some(_) => OperatorInput::Command(line.to_string()),
        }
    }
}
