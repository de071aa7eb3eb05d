//! Command vocabulary and encoder
//!
//! The device understands a small, case-sensitive grammar:
//! ```text
//! PING
//! STOP
//! ALL <F|R> <speed>
//! MOTOR <id> <F|R> <speed>
//! ```
//! Motion templates carry a trailing speed slot which is filled from the
//! current [`SpeedSetting`] at encode time.

use std::fmt;

/// Motor direction token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "F" => Some(Direction::Forward),
            "R" => Some(Direction::Reverse),
            _ => None,
        }
    }
}

/// Classification of a command string against the device vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Diagnostic round trip, no state change on the device
    Ping,
    /// Halt all motors
    Stop,
    /// Drive both motors
    All { direction: Direction, speed: u32 },
    /// Drive a single motor
    Motor { id: u8, direction: Direction, speed: u32 },
    /// Anything the vocabulary does not cover, forwarded verbatim
    Other,
}

impl CommandKind {
    /// Classify a command string
    pub fn parse(name: &str) -> Self {
        let tokens: Vec<&str> = name.split_whitespace().collect();

        match tokens.as_slice() {
            ["PING"] => CommandKind::Ping,
            ["STOP"] => CommandKind::Stop,
            ["ALL", dir, speed] => match (Direction::parse(dir), speed.parse()) {
                (Some(direction), Ok(speed)) => CommandKind::All { direction, speed },
                _ => CommandKind::Other,
            },
            ["MOTOR", id, dir, speed] => {
                match (id.parse(), Direction::parse(dir), speed.parse()) {
                    (Ok(id), Some(direction), Ok(speed)) => CommandKind::Motor {
                        id,
                        direction,
                        speed,
                    },
                    _ => CommandKind::Other,
                }
            }
            _ => CommandKind::Other,
        }
    }

    /// Whether the trailing token is a speed slot
    pub fn has_speed_slot(&self) -> bool {
        matches!(self, CommandKind::All { .. } | CommandKind::Motor { .. })
    }
}

/// A device instruction ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    is_critical: bool,
}

impl Command {
    /// Create a command, marking it critical if it is the stop directive
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_critical = CommandKind::parse(&name) == CommandKind::Stop;
        Self { name, is_critical }
    }

    pub fn ping() -> Self {
        Self::new("PING")
    }

    pub fn stop() -> Self {
        Self::new("STOP")
    }

    /// Device instruction string
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Critical commands are retried until the device confirms delivery
    pub fn is_critical(&self) -> bool {
        self.is_critical
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::parse(&self.name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Motor speed chosen by the operator, clamped to the PWM input range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedSetting(u8);

impl SpeedSetting {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 255;
    pub const DEFAULT: u8 = 150;
    /// Increment used by the speed up/down controls
    pub const STEP: u8 = 10;

    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Clamp an arbitrary integer into range
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn increase(&mut self) {
        self.0 = self.0.saturating_add(Self::STEP);
    }

    pub fn decrease(&mut self) {
        self.0 = self.0.saturating_sub(Self::STEP);
    }
}

impl Default for SpeedSetting {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Encode a raw command template with the current speed
///
/// Motion templates (`ALL F 0`, `MOTOR 1 R 0`) get their trailing speed slot
/// replaced by `speed`. Every other input is passed through unchanged.
pub fn encode(raw: &str, speed: SpeedSetting) -> Command {
    if !CommandKind::parse(raw).has_speed_slot() {
        return Command::new(raw);
    }

    let mut tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if let Some(last) = tokens.last_mut() {
        *last = speed.get().to_string();
    }

    Command::new(tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_substitutes_speed() {
        let cmd = encode("ALL F 0", SpeedSetting::new(150));
        assert_eq!(cmd.name(), "ALL F 150");
        assert!(!cmd.is_critical());
    }

    #[test]
    fn test_encode_motor_template() {
        let cmd = encode("MOTOR 2 R 0", SpeedSetting::new(90));
        assert_eq!(cmd.name(), "MOTOR 2 R 90");
        assert_eq!(
            cmd.kind(),
            CommandKind::Motor {
                id: 2,
                direction: Direction::Reverse,
                speed: 90
            }
        );
    }

    #[test]
    fn test_encode_passes_through_without_slot() {
        assert_eq!(encode("PING", SpeedSetting::new(150)).name(), "PING");
        assert_eq!(encode("LED ON", SpeedSetting::new(150)).name(), "LED ON");
        // Lower-case is not part of the vocabulary
        assert_eq!(encode("all f 0", SpeedSetting::new(150)).name(), "all f 0");
    }

    #[test]
    fn test_stop_is_critical() {
        let cmd = encode("STOP", SpeedSetting::default());
        assert_eq!(cmd.name(), "STOP");
        assert!(cmd.is_critical());
        assert!(!Command::ping().is_critical());
    }

    #[test]
    fn test_parse_rejects_bad_direction() {
        assert_eq!(CommandKind::parse("ALL X 100"), CommandKind::Other);
        assert_eq!(CommandKind::parse("MOTOR one F 100"), CommandKind::Other);
    }

    #[test]
    fn test_speed_setting_bounds() {
        let mut speed = SpeedSetting::new(250);
        speed.increase();
        assert_eq!(speed.get(), SpeedSetting::MAX);

        let mut speed = SpeedSetting::new(5);
        speed.decrease();
        assert_eq!(speed.get(), SpeedSetting::MIN);

        assert_eq!(SpeedSetting::clamped(900).get(), 255);
        assert_eq!(SpeedSetting::clamped(-3).get(), 0);
        assert_eq!(SpeedSetting::default().get(), 150);
    }
}
