//! Robo arm line protocol.
//!
//! Every command is a single ASCII line terminated by a carriage return. The
//! device answers by echoing the command, usually followed by an empty line
//! and a status or value line, each also terminated by a carriage return:
//!
//! ```text
//! host:   STOP\r
//! device: STOP\r\rSTOP::ok\r
//! ```
//!
//! Replies are not framed; the controller reads whatever the device has
//! queued after a fixed settle delay and hands the bytes to
//! [`Command::check_echo`], or to [`decode_position`] and [`decode_angles`]
//! for the two queries that carry values.

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use std::ops::RangeInclusive;
use strum::{Display, EnumString, IntoStaticStr};
use tokio_util::codec::Encoder;

use crate::error::{Error, Result};

/// Accepted number of steps per move.
pub const STEPS: RangeInclusive<i32> = 1..=100;

/// Accepted speed for cyclic and continuous movement.
pub const SPEED: RangeInclusive<i32> = 1..=100;

/// Accepted joint angle, in degrees.
pub const ANGLE: RangeInclusive<i32> = 0..=90;

const COUNTER_ECHO: &[u8] = b"COUNTER?\r\r";
const ANGLES_ECHO: &[u8] = b"ANGLES?\r\r";
const STEP_OK: &[u8] = b"STEP::ok\r";
const STOP_REPLY: &str = "STOP\r\rSTOP::ok\r";
const CALIBRATION_REPLY: &str = "CALIBRATION\r";
const CONTINUOUS_MOVE_REPLY: &str = "Wait...\r";

// The up angle starts at a fixed column of the angles reply, after the echo
// and an 11 character label.
const ANGLES_VALUE_OFFSET: usize = 20;

/// Direction of travel for stepped movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u8)]
pub enum Direction {
    Down = 0,
    Up = 1,
}

impl Direction {
    /// Value sent on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A request understood by the arm firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum Command {
    /// Identify the hardware (`HW?`).
    Hardware,
    /// Read the step counter (`COUNTER?`).
    Counter,
    /// Read both joint angles (`ANGLES?`).
    Angles,
    Step { direction: Direction, steps: i32 },
    /// Start cyclic movement.
    Start { speed: i32 },
    /// Stop cyclic movement.
    Stop,
    SetAngles { up: i32, down: i32 },
    Calibration,
    /// Move a number of steps at a given speed (`DoNsteps`).
    ContinuousMove { direction: Direction, speed: i32, steps: i32 },
}

/// Joint angles reported by the arm, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Angles {
    pub up: i32,
    pub down: i32,
}

/// What a reply must look like for a command to count as accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// Anything, including nothing at all: the exchange completing is enough.
    Any,
    Exact(String),
    Prefix(&'static [u8]),
    Suffix(&'static [u8]),
}

impl Expect {
    pub fn matches(&self, reply: &[u8]) -> bool {
        match self {
            Expect::Any => true,
            Expect::Exact(text) => reply == text.as_bytes(),
            Expect::Prefix(prefix) => reply.starts_with(prefix),
            Expect::Suffix(suffix) => reply.ends_with(suffix),
        }
    }
}

fn check_range(argument: &'static str, value: i32, range: RangeInclusive<i32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::OutOfRange {
            argument,
            value: value.into(),
            min: (*range.start()).into(),
            max: (*range.end()).into(),
        })
    }
}

impl Command {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Reject arguments the firmware does not accept.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Command::Step { steps, .. } => check_range("number of steps", steps, STEPS),
            Command::Start { speed } => check_range("speed", speed, SPEED),
            Command::SetAngles { up, down } => {
                check_range("angle", up, ANGLE)?;
                check_range("angle", down, ANGLE)
            }
            Command::ContinuousMove { speed, steps, .. } => {
                check_range("speed", speed, SPEED)?;
                check_range("number of steps", steps, STEPS)
            }
            Command::Hardware
            | Command::Counter
            | Command::Angles
            | Command::Stop
            | Command::Calibration => Ok(()),
        }
    }

    /// The command line as sent, including the trailing carriage return.
    pub fn line(&self) -> String {
        match *self {
            Command::Hardware => "HW?\r".to_string(),
            Command::Counter => "COUNTER?\r".to_string(),
            Command::Angles => "ANGLES?\r".to_string(),
            Command::Step { direction, steps } => {
                format!("STEP={},{}\r", direction.code(), steps)
            }
            Command::Start { speed } => format!("START={}\r", speed),
            Command::Stop => "STOP\r".to_string(),
            Command::SetAngles { up, down } => format!("SET+ANGLE={},{}\r", up, down),
            Command::Calibration => "CALIBRATION\r".to_string(),
            Command::ContinuousMove {
                direction,
                speed,
                steps,
            } => format!("DoNsteps={},{},{}\r", direction.code(), speed, steps),
        }
    }

    pub fn expected_reply(&self) -> Expect {
        match self {
            Command::Hardware => Expect::Any,
            Command::Counter => Expect::Prefix(COUNTER_ECHO),
            Command::Angles => Expect::Prefix(ANGLES_ECHO),
            Command::Step { .. } => Expect::Suffix(STEP_OK),
            Command::Start { .. } => Expect::Exact(format!("{}\rSTART::ok\r", self.line())),
            Command::Stop => Expect::Exact(STOP_REPLY.to_string()),
            Command::SetAngles { .. } => Expect::Exact(format!("{}\rANGLE::ok\r", self.line())),
            Command::Calibration => Expect::Exact(CALIBRATION_REPLY.to_string()),
            Command::ContinuousMove { .. } => Expect::Exact(CONTINUOUS_MOVE_REPLY.to_string()),
        }
    }

    /// Check a reply against the echo this command expects.
    pub fn check_echo(&self, reply: &[u8]) -> Result<()> {
        if self.expected_reply().matches(reply) {
            Ok(())
        } else {
            Err(self.unexpected(reply))
        }
    }

    fn unexpected(&self, reply: &[u8]) -> Error {
        Error::UnexpectedResponse {
            command: self.name().to_string(),
            received: String::from_utf8_lossy(reply).into_owned(),
        }
    }
}

/// Encodes commands into the transmit buffer.
#[derive(Debug, Default)]
pub struct CommandCodec;

impl Encoder<Command> for CommandCodec {
    type Error = Error;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<()> {
        command.validate()?;
        dst.put_slice(command.line().as_bytes());
        Ok(())
    }
}

/// Decode the step counter from a `COUNTER?` reply.
pub fn decode_position(reply: &[u8]) -> Result<i32> {
    let command = Command::Counter;
    command.check_echo(reply)?;
    atoi(&reply[COUNTER_ECHO.len()..]).ok_or_else(|| command.unexpected(reply))
}

/// Decode both joint angles from an `ANGLES?` reply.
pub fn decode_angles(reply: &[u8]) -> Result<Angles> {
    let command = Command::Angles;
    command.check_echo(reply)?;
    parse_angles(reply).ok_or_else(|| command.unexpected(reply))
}

fn parse_angles(reply: &[u8]) -> Option<Angles> {
    let tail = reply.get(ANGLES_VALUE_OFFSET..)?;
    let first = tail.split(|&b| b == b' ').next()?;
    let up = atoi(first)?;

    let last_space = reply.iter().rposition(|&b| b == b' ')?;
    let down = atoi(&reply[last_space + 1..])?;

    Some(Angles { up, down })
}

fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

/// Parse a leading decimal integer the way C `atoi` does: skip whitespace,
/// accept one sign, stop at the first non-digit. No digits parses as zero.
/// Returns `None` only on overflow.
fn atoi(bytes: &[u8]) -> Option<i32> {
    let start = bytes.iter().position(|&b| !is_c_space(b)).unwrap_or(bytes.len());
    let mut rest = &bytes[start..];

    let sign = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            -1
        }
        Some(b'+') => {
            rest = &rest[1..];
            1
        }
        _ => 1,
    };

    let mut value: i32 = 0;
    for &b in rest.iter().take_while(|b| b.is_ascii_digit()) {
        let digit = i32::from(b - b'0');
        value = value.checked_mul(10)?.checked_add(sign * digit)?;
    }
    Some(value)
}
