// MIT License - Copyright (c) 2026 Peter Wright
// Command values exchanged with the integration module

use std::fmt;

use bitflags::bitflags;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::constants::codes;

/// Arming mode reported by `652` Partition Armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmMode {
    Away,
    Stay,
    ZeroEntryAway,
    ZeroEntryStay,
}

impl ArmMode {
    pub fn from_digit(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Away),
            '1' => Some(Self::Stay),
            '2' => Some(Self::ZeroEntryAway),
            '3' => Some(Self::ZeroEntryStay),
            _ => None,
        }
    }

    pub fn as_digit(&self) -> char {
        match self {
            Self::Away => '0',
            Self::Stay => '1',
            Self::ZeroEntryAway => '2',
            Self::ZeroEntryStay => '3',
        }
    }
}

/// Status carried by `505` Login Interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginStatus {
    /// `0`: password rejected; the bridge drops the connection.
    Failed,
    /// `1`: password accepted.
    Success,
    /// `2`: no password was sent in time.
    TimedOut,
    /// `3`: the bridge is asking for its password.
    PasswordRequest,
}

impl LoginStatus {
    pub fn from_digit(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Failed),
            '1' => Some(Self::Success),
            '2' => Some(Self::TimedOut),
            '3' => Some(Self::PasswordRequest),
            _ => None,
        }
    }

    pub fn as_digit(&self) -> char {
        match self {
            Self::Failed => '0',
            Self::Success => '1',
            Self::TimedOut => '2',
            Self::PasswordRequest => '3',
        }
    }
}

bitflags! {
    /// Keypad LED bitmap from `510`/`511`, sent as two hex digits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeypadLeds: u8 {
        const READY     = 0b0000_0001;
        const ARMED     = 0b0000_0010;
        const MEMORY    = 0b0000_0100;
        const BYPASS    = 0b0000_1000;
        const TROUBLE   = 0b0001_0000;
        const PROGRAM   = 0b0010_0000;
        const FIRE      = 0b0100_0000;
        const BACKLIGHT = 0b1000_0000;
    }
}

/// Typed contents of a command's data field.
///
/// Which shape a code uses is fixed by its entry in the
/// [`CommandRegistry`](crate::registry::CommandRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFields {
    /// No data bytes.
    Empty,
    /// Unparsed data: unknown inbound codes, or outbound data validated at write time.
    Raw(String),
    Partition { partition: u8 },
    Zone { zone: u16 },
    PartitionZone { partition: u8, zone: u16 },
    PartitionMode { partition: u8, mode: ArmMode },
    PartitionUser { partition: u8, user: u16 },
    PartitionCode { partition: u8, code: String },
    PartitionOutput { partition: u8, output: u8 },
    AccessCode { code: String },
    Number { value: u32 },
    /// The code being acknowledged by `500`.
    CommandCode { code: String },
    Login { status: LoginStatus },
    Leds { leds: KeypadLeds },
    DateTime { at: NaiveDateTime },
    Password { password: String },
    Key { key: char },
}

/// A registered code whose data did not fit the code's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub code: String,
    pub data: String,
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse {} data {:?}: {}", self.code, self.data, self.reason)
    }
}

/// A decoded command received from the module. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub code: String,
    /// Variant name, or `None` when the code is not registered.
    pub name: Option<&'static str>,
    /// Data field exactly as received.
    pub data: String,
    /// Parsed fields, or why the data did not match the code's layout.
    pub fields: Result<CommandFields, ParseFailure>,
    pub received_at: DateTime<Utc>,
}

impl InboundCommand {
    /// Whether the code had no registry entry.
    pub fn is_unknown(&self) -> bool {
        self.name.is_none()
    }

    pub fn parse_failure(&self) -> Option<&ParseFailure> {
        self.fields.as_ref().err()
    }

    /// The login status, if this is a well-formed `505`.
    pub fn login_status(&self) -> Option<LoginStatus> {
        match self.fields {
            Ok(CommandFields::Login { status }) if self.code == codes::LOGIN_INTERACTION => {
                Some(status)
            }
            _ => None,
        }
    }
}

impl fmt::Display for InboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.name.unwrap_or("Unknown"))?;
        if !self.data.is_empty() {
            write!(f, " [{}]", self.data)?;
        }
        Ok(())
    }
}

/// A command to be written to the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub code: String,
    pub fields: CommandFields,
}

impl OutboundCommand {
    pub fn new(code: impl Into<String>, fields: CommandFields) -> Self {
        Self {
            code: code.into(),
            fields,
        }
    }

    /// Any code with pre-formatted data.
    ///
    /// If the code is registered, the data must still fit its layout.
    pub fn raw(code: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(code, CommandFields::Raw(data.into()))
    }

    /// `000`: liveness poll.
    pub fn poll() -> Self {
        Self::new(codes::POLL, CommandFields::Empty)
    }

    /// `001`: ask the module to replay current status.
    pub fn status_request() -> Self {
        Self::new(codes::STATUS_REQUEST, CommandFields::Empty)
    }

    /// `002`: ask the module for zone/partition labels.
    pub fn labels_request() -> Self {
        Self::new("002", CommandFields::Empty)
    }

    /// `005`: network bridge login.
    pub fn network_login(password: impl Into<String>) -> Self {
        Self::new(
            codes::NETWORK_LOGIN,
            CommandFields::Password {
                password: password.into(),
            },
        )
    }

    /// `010`: set the panel clock.
    pub fn set_time_date(at: NaiveDateTime) -> Self {
        Self::new("010", CommandFields::DateTime { at })
    }

    /// `020`: activate a command output.
    pub fn command_output(partition: u8, output: u8) -> Self {
        Self::new("020", CommandFields::PartitionOutput { partition, output })
    }

    /// `030`: arm away.
    pub fn arm_away(partition: u8) -> Self {
        Self::new("030", CommandFields::Partition { partition })
    }

    /// `031`: arm stay.
    pub fn arm_stay(partition: u8) -> Self {
        Self::new("031", CommandFields::Partition { partition })
    }

    /// `032`: arm with no entry delay.
    pub fn arm_no_entry_delay(partition: u8) -> Self {
        Self::new("032", CommandFields::Partition { partition })
    }

    /// `033`: arm with an access code.
    pub fn arm_with_code(partition: u8, code: impl Into<String>) -> Self {
        Self::new(
            "033",
            CommandFields::PartitionCode {
                partition,
                code: code.into(),
            },
        )
    }

    /// `040`: disarm with an access code.
    pub fn disarm(partition: u8, code: impl Into<String>) -> Self {
        Self::new(
            "040",
            CommandFields::PartitionCode {
                partition,
                code: code.into(),
            },
        )
    }

    /// `060`: trigger a panic alarm (1 fire, 2 ambulance, 3 police).
    pub fn panic(kind: u8) -> Self {
        Self::new(
            "060",
            CommandFields::Number {
                value: u32::from(kind),
            },
        )
    }

    /// `070`: a single virtual keypad press.
    pub fn key_press(key: char) -> Self {
        Self::new("070", CommandFields::Key { key })
    }

    /// `200`: send an access code after a code request.
    pub fn code_send(code: impl Into<String>) -> Self {
        Self::new(codes::CODE_SEND, CommandFields::AccessCode { code: code.into() })
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log the bridge password.
        if self.code == codes::NETWORK_LOGIN || matches!(self.fields, CommandFields::Password { .. }) {
            return write!(f, "{} <password>", self.code);
        }
        write!(f, "{} {:?}", self.code, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_mode_digits() {
        for mode in [
            ArmMode::Away,
            ArmMode::Stay,
            ArmMode::ZeroEntryAway,
            ArmMode::ZeroEntryStay,
        ] {
            assert_eq!(ArmMode::from_digit(mode.as_digit()), Some(mode));
        }
        assert_eq!(ArmMode::from_digit('4'), None);
    }

    #[test]
    fn test_login_status_digits() {
        assert_eq!(LoginStatus::from_digit('3'), Some(LoginStatus::PasswordRequest));
        assert_eq!(LoginStatus::from_digit('1'), Some(LoginStatus::Success));
        assert_eq!(LoginStatus::from_digit('9'), None);
        assert_eq!(LoginStatus::Failed.as_digit(), '0');
    }

    #[test]
    fn test_keypad_leds() {
        let leds = KeypadLeds::from_bits_truncate(0x81);
        assert!(leds.contains(KeypadLeds::READY));
        assert!(leds.contains(KeypadLeds::BACKLIGHT));
        assert!(!leds.contains(KeypadLeds::ARMED));
    }

    #[test]
    fn test_outbound_constructors() {
        assert_eq!(OutboundCommand::poll().code, "000");
        assert_eq!(OutboundCommand::poll().fields, CommandFields::Empty);
        assert_eq!(
            OutboundCommand::disarm(1, "1234"),
            OutboundCommand {
                code: "040".to_string(),
                fields: CommandFields::PartitionCode {
                    partition: 1,
                    code: "1234".to_string()
                },
            }
        );
        assert_eq!(
            OutboundCommand::raw("200", "1234").fields,
            CommandFields::Raw("1234".to_string())
        );
    }

    #[test]
    fn test_password_not_displayed() {
        let cmd = OutboundCommand::network_login("secret");
        assert_eq!(cmd.to_string(), "005 <password>");
    }
}
