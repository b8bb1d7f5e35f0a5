// Command bytes in, status lines out

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pan direction. Left decreases the position, right increases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn sign(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

/// One command byte from the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Stop,
    Home,
    Info,
    Invalid(u8),
}

impl Command {
    pub const NEUTRAL: u8 = b'S';

    pub fn byte(self) -> u8 {
        match self {
            Command::Move(Direction::Left) => b'L',
            Command::Move(Direction::Right) => b'R',
            Command::Stop => b'S',
            Command::Home => b'H',
            Command::Info => b'I',
            Command::Invalid(b) => b,
        }
    }

    pub fn is_motion(self) -> bool {
        matches!(self, Command::Move(_))
    }
}

impl From<u8> for Command {
    fn from(byte: u8) -> Self {
        match byte {
            b'L' => Command::Move(Direction::Left),
            b'R' => Command::Move(Direction::Right),
            b'S' => Command::Stop,
            b'H' => Command::Home,
            b'I' => Command::Info,
            other => Command::Invalid(other),
        }
    }
}

/// Status line written back over the link.
///
/// The `Display` output is the wire format the tracking host parses, so the
/// text must not change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Banner,
    TestingStepper,
    MotorTestComplete,
    Ready { commands: &'static str },
    Moving { direction: Direction, steps: i32, rpm: u32 },
    Moved { direction: Direction, steps: i32, position: i32 },
    LimitReached(Direction),
    Stopped,
    Info { position: i32, min: i32, max: i32 },
    InvalidCommand,
    Homing,
    HomeComplete,
    HomeInterrupted { position: i32 },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Banner => write!(f, "=== Face Tracker Arduino v2.0 ==="),
            Status::TestingStepper => write!(f, "Testing stepper motor..."),
            Status::MotorTestComplete => write!(f, "Motor test complete"),
            Status::Ready { commands } => write!(f, "Arduino Ready - Send {} commands", commands),
            Status::Moving {
                direction,
                steps,
                rpm,
            } => write!(f, "Moving {}:{} at {}RPM", direction.letter(), steps, rpm),
            Status::Moved {
                direction,
                steps,
                position,
            } => write!(f, "{}:{},P:{}", direction.letter(), steps, position),
            Status::LimitReached(direction) => write!(f, "{}:LIMIT_REACHED", direction.letter()),
            Status::Stopped => write!(f, "S:STOP"),
            Status::Info { position, min, max } => {
                write!(f, "INFO:P:{},L:{},R:{}", position, min, max)
            }
            Status::InvalidCommand => write!(f, "ERROR:INVALID_COMMAND"),
            Status::Homing => write!(f, "HOMING..."),
            Status::HomeComplete => write!(f, "HOME:COMPLETE"),
            Status::HomeInterrupted { position } => write!(f, "HOME:INTERRUPTED,P:{}", position),
        }
    }
}

/// Observable controller state, as written to the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub position: i32,
    pub last_command: char,
    pub consecutive: u32,
    pub min_position: i32,
    pub max_position: i32,
}

/// One journal line: the command byte that was handled and the state after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub command: char,
    pub state: Snapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_byte() {
        assert_eq!(Command::from(b'L'), Command::Move(Direction::Left));
        assert_eq!(Command::from(b'R'), Command::Move(Direction::Right));
        assert_eq!(Command::from(b'S'), Command::Stop);
        assert_eq!(Command::from(b'H'), Command::Home);
        assert_eq!(Command::from(b'I'), Command::Info);
        // Commands are case sensitive
        assert_eq!(Command::from(b'l'), Command::Invalid(b'l'));
        assert_eq!(Command::from(b'\n'), Command::Invalid(b'\n'));
    }

    #[test]
    fn test_command_byte_is_inverse() {
        for byte in [b'L', b'R', b'S', b'H', b'I', b'X'] {
            assert_eq!(Command::from(byte).byte(), byte);
        }
        assert!(Command::from(b'L').is_motion());
        assert!(!Command::from(b'S').is_motion());
    }

    #[test]
    fn test_status_wire_format() {
        let moving = Status::Moving {
            direction: Direction::Right,
            steps: 28,
            rpm: 12,
        };
        assert_eq!(moving.to_string(), "Moving R:28 at 12RPM");

        let moved = Status::Moved {
            direction: Direction::Left,
            steps: 20,
            position: -20,
        };
        assert_eq!(moved.to_string(), "L:20,P:-20");

        assert_eq!(
            Status::LimitReached(Direction::Right).to_string(),
            "R:LIMIT_REACHED"
        );
        assert_eq!(Status::Stopped.to_string(), "S:STOP");
        assert_eq!(
            Status::Info {
                position: 84,
                min: -1024,
                max: 1024
            }
            .to_string(),
            "INFO:P:84,L:-1024,R:1024"
        );
        assert_eq!(Status::InvalidCommand.to_string(), "ERROR:INVALID_COMMAND");
        assert_eq!(Status::Homing.to_string(), "HOMING...");
        assert_eq!(Status::HomeComplete.to_string(), "HOME:COMPLETE");
    }

    #[test]
    fn test_startup_lines() {
        assert_eq!(Status::Banner.to_string(), "=== Face Tracker Arduino v2.0 ===");
        assert_eq!(
            Status::Ready {
                commands: "L/R/S/H/I"
            }
            .to_string(),
            "Arduino Ready - Send L/R/S/H/I commands"
        );
    }

    #[test]
    fn test_journal_entry_json() {
        let entry = JournalEntry {
            command: 'R',
            state: Snapshot {
                position: 20,
                last_command: 'R',
                consecutive: 0,
                min_position: -1024,
                max_position: 1024,
            },
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"command\":\"R\""));
        assert!(json.contains("\"position\":20"));
    }
}
