// MIT License - Copyright (c) 2026 Peter Wright
// Command registry: code -> variant descriptor

//! Each 3-character code maps to a [`CommandVariant`]: a name plus a parse
//! function (data string → [`CommandFields`]) and a serialize function
//! (fields → data string). Most codes share one of a few data [`Layout`]s,
//! so the built-in catalog is a plain table.
//!
//! Unregistered codes are not errors. They come through as pass-through
//! commands carrying the raw data.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::constants::{CODE_LEN, CR, LF};
use crate::error::{It100Error, Result};
use crate::protocol::{
    ArmMode, CommandFields, InboundCommand, KeypadLeds, LoginStatus, OutboundCommand, ParseFailure,
};

/// Data string → typed fields, or a human-readable reason.
pub type ParseFn = fn(&str) -> std::result::Result<CommandFields, String>;
/// Typed fields → data string, or a human-readable reason.
pub type SerializeFn = fn(&CommandFields) -> std::result::Result<String, String>;

/// A parse/serialize pair describing one data field shape.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub parse: ParseFn,
    pub serialize: SerializeFn,
}

/// Registry entry for one code.
#[derive(Debug, Clone, Copy)]
pub struct CommandVariant {
    pub name: &'static str,
    pub parse: ParseFn,
    pub serialize: SerializeFn,
}

impl CommandVariant {
    pub const fn new(name: &'static str, parse: ParseFn, serialize: SerializeFn) -> Self {
        Self {
            name,
            parse,
            serialize,
        }
    }

    pub const fn with_layout(name: &'static str, layout: Layout) -> Self {
        Self::new(name, layout.parse, layout.serialize)
    }
}

/// Maps codes to variants.
///
/// [`CommandRegistry::default`] carries the built-in catalog;
/// [`CommandRegistry::new`] starts empty.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    variants: HashMap<String, CommandVariant>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut variants = HashMap::with_capacity(BUILTIN.len());
        for &(code, name, layout) in BUILTIN {
            variants.insert(code.to_string(), CommandVariant::with_layout(name, layout));
        }
        Self { variants }
    }
}

impl CommandRegistry {
    /// An empty registry: every code passes through unparsed.
    pub fn new() -> Self {
        Self {
            variants: HashMap::new(),
        }
    }

    /// Add a variant. Codes are unique; registering one twice is an error.
    pub fn register(&mut self, code: &str, variant: CommandVariant) -> Result<()> {
        validate_code(code)?;
        if self.variants.contains_key(code) {
            return Err(It100Error::DuplicateCode {
                code: code.to_string(),
            });
        }
        self.variants.insert(code.to_string(), variant);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&CommandVariant> {
        self.variants.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.variants.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Parse a received code and data, stamped with the current time.
    pub fn parse(&self, code: &str, data: &str) -> InboundCommand {
        self.parse_at(code, data, Utc::now())
    }

    pub fn parse_at(&self, code: &str, data: &str, received_at: DateTime<Utc>) -> InboundCommand {
        let (name, fields) = match self.variants.get(code) {
            Some(variant) => {
                let fields = if data.is_ascii() {
                    (variant.parse)(data)
                } else {
                    Err("data is not ASCII".to_string())
                };
                let fields = fields.map_err(|reason| ParseFailure {
                    code: code.to_string(),
                    data: data.to_string(),
                    reason,
                });
                (Some(variant.name), fields)
            }
            None => (None, Ok(CommandFields::Raw(data.to_string()))),
        };

        InboundCommand {
            code: code.to_string(),
            name,
            data: data.to_string(),
            fields,
            received_at,
        }
    }

    /// Produce the data string for an outbound command.
    ///
    /// Raw data for a registered code is checked against that code's layout.
    pub fn serialize(&self, command: &OutboundCommand) -> Result<String> {
        validate_code(&command.code)?;
        let fail = |reason: String| It100Error::Serialize {
            code: command.code.clone(),
            reason,
        };

        let data = match (self.variants.get(&command.code), &command.fields) {
            (Some(variant), CommandFields::Raw(data)) => {
                if !data.is_ascii() {
                    return Err(fail("data is not ASCII".to_string()));
                }
                (variant.parse)(data).map_err(&fail)?;
                data.clone()
            }
            (Some(variant), fields) => (variant.serialize)(fields).map_err(&fail)?,
            (None, CommandFields::Raw(data)) => data.clone(),
            (None, CommandFields::Empty) => String::new(),
            (None, fields) => {
                return Err(fail(format!(
                    "unregistered code needs raw data, got {:?}",
                    fields
                )));
            }
        };

        if data.bytes().any(|b| !b.is_ascii() || b == CR || b == LF) {
            return Err(fail("data must be ASCII without CR/LF".to_string()));
        }
        Ok(data)
    }
}

/// Codes are exactly three printable ASCII characters.
pub fn validate_code(code: &str) -> Result<()> {
    if code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(It100Error::InvalidCode {
            code: code.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

type ParseResult = std::result::Result<CommandFields, String>;
type SerializeResult = std::result::Result<String, String>;

pub mod layout {
    use super::*;

    pub const EMPTY: Layout = Layout {
        parse: parse_empty,
        serialize: serialize_empty,
    };
    pub const PARTITION: Layout = Layout {
        parse: parse_partition,
        serialize: serialize_partition,
    };
    pub const ZONE: Layout = Layout {
        parse: parse_zone,
        serialize: serialize_zone,
    };
    pub const PARTITION_ZONE: Layout = Layout {
        parse: parse_partition_zone,
        serialize: serialize_partition_zone,
    };
    pub const PARTITION_MODE: Layout = Layout {
        parse: parse_partition_mode,
        serialize: serialize_partition_mode,
    };
    pub const PARTITION_USER: Layout = Layout {
        parse: parse_partition_user,
        serialize: serialize_partition_user,
    };
    pub const PARTITION_CODE: Layout = Layout {
        parse: parse_partition_code,
        serialize: serialize_partition_code,
    };
    pub const PARTITION_OUTPUT: Layout = Layout {
        parse: parse_partition_output,
        serialize: serialize_partition_output,
    };
    pub const ACCESS_CODE: Layout = Layout {
        parse: parse_access_code,
        serialize: serialize_access_code,
    };
    pub const DIGIT: Layout = Layout {
        parse: parse_number::<1>,
        serialize: serialize_number::<1>,
    };
    pub const NUMBER_3: Layout = Layout {
        parse: parse_number::<3>,
        serialize: serialize_number::<3>,
    };
    pub const COMMAND_CODE: Layout = Layout {
        parse: parse_command_code,
        serialize: serialize_command_code,
    };
    pub const LOGIN: Layout = Layout {
        parse: parse_login,
        serialize: serialize_login,
    };
    pub const LEDS: Layout = Layout {
        parse: parse_leds,
        serialize: serialize_leds,
    };
    pub const DATE_TIME: Layout = Layout {
        parse: parse_date_time,
        serialize: serialize_date_time,
    };
    pub const PASSWORD: Layout = Layout {
        parse: parse_password,
        serialize: serialize_password,
    };
    pub const KEY: Layout = Layout {
        parse: parse_key,
        serialize: serialize_key,
    };
}

/// Split fixed-width ASCII fields, checking the total length first.
fn split_fixed<'a>(data: &'a str, widths: &[usize]) -> std::result::Result<Vec<&'a str>, String> {
    let expected: usize = widths.iter().sum();
    if data.len() != expected {
        return Err(format!(
            "Expected data length of {} bytes, received {}",
            expected,
            data.len()
        ));
    }
    if !data.is_ascii() {
        return Err("data is not ASCII".to_string());
    }
    let mut fields = Vec::with_capacity(widths.len());
    let mut start = 0;
    for width in widths {
        fields.push(&data[start..start + width]);
        start += width;
    }
    Ok(fields)
}

fn numeric(field: &str, what: &str) -> std::result::Result<u32, String> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{} must be numeric, got {:?}", what, field));
    }
    field
        .parse()
        .map_err(|_| format!("{} out of range: {}", what, field))
}

fn partition_number(field: &str) -> std::result::Result<u8, String> {
    match numeric(field, "partition")? {
        p @ 1..=8 => Ok(p as u8),
        p => Err(format!("partition {} out of range 1-8", p)),
    }
}

fn check_partition(partition: u8) -> std::result::Result<(), String> {
    if (1..=8).contains(&partition) {
        Ok(())
    } else {
        Err(format!("partition {} out of range 1-8", partition))
    }
}

fn check_code(code: &str) -> std::result::Result<(), String> {
    if (code.len() == 4 || code.len() == 6) && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(format!("access code must be 4 or 6 digits, got {} characters", code.len()))
    }
}

fn mismatch(expected: &str, fields: &CommandFields) -> SerializeResult {
    Err(format!("expected {} fields, got {:?}", expected, fields))
}

fn parse_empty(data: &str) -> ParseResult {
    split_fixed(data, &[])?;
    Ok(CommandFields::Empty)
}

fn serialize_empty(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Empty => Ok(String::new()),
        other => mismatch("empty", other),
    }
}

fn parse_partition(data: &str) -> ParseResult {
    let f = split_fixed(data, &[1])?;
    Ok(CommandFields::Partition {
        partition: partition_number(f[0])?,
    })
}

fn serialize_partition(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Partition { partition } => {
            check_partition(*partition)?;
            Ok(partition.to_string())
        }
        other => mismatch("partition", other),
    }
}

fn parse_zone(data: &str) -> ParseResult {
    let f = split_fixed(data, &[3])?;
    Ok(CommandFields::Zone {
        zone: numeric(f[0], "zone")? as u16,
    })
}

fn serialize_zone(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Zone { zone } if *zone <= 999 => Ok(format!("{:03}", zone)),
        CommandFields::Zone { zone } => Err(format!("zone {} does not fit 3 digits", zone)),
        other => mismatch("zone", other),
    }
}

fn parse_partition_zone(data: &str) -> ParseResult {
    let f = split_fixed(data, &[1, 3])?;
    Ok(CommandFields::PartitionZone {
        partition: partition_number(f[0])?,
        zone: numeric(f[1], "zone")? as u16,
    })
}

fn serialize_partition_zone(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::PartitionZone { partition, zone } if *zone <= 999 => {
            check_partition(*partition)?;
            Ok(format!("{}{:03}", partition, zone))
        }
        CommandFields::PartitionZone { zone, .. } => {
            Err(format!("zone {} does not fit 3 digits", zone))
        }
        other => mismatch("partition+zone", other),
    }
}

fn parse_partition_mode(data: &str) -> ParseResult {
    let f = split_fixed(data, &[1, 1])?;
    let partition = partition_number(f[0])?;
    let mode = f[1]
        .chars()
        .next()
        .and_then(ArmMode::from_digit)
        .ok_or_else(|| format!("unknown arm mode {:?}", f[1]))?;
    Ok(CommandFields::PartitionMode { partition, mode })
}

fn serialize_partition_mode(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::PartitionMode { partition, mode } => {
            check_partition(*partition)?;
            Ok(format!("{}{}", partition, mode.as_digit()))
        }
        other => mismatch("partition+mode", other),
    }
}

fn parse_partition_user(data: &str) -> ParseResult {
    let f = split_fixed(data, &[1, 4])?;
    Ok(CommandFields::PartitionUser {
        partition: partition_number(f[0])?,
        user: numeric(f[1], "user")? as u16,
    })
}

fn serialize_partition_user(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::PartitionUser { partition, user } if *user <= 9999 => {
            check_partition(*partition)?;
            Ok(format!("{}{:04}", partition, user))
        }
        CommandFields::PartitionUser { user, .. } => {
            Err(format!("user {} does not fit 4 digits", user))
        }
        other => mismatch("partition+user", other),
    }
}

fn parse_partition_code(data: &str) -> ParseResult {
    if data.len() != 5 && data.len() != 7 {
        return Err(format!(
            "Expected data length of 5 or 7 bytes, received {}",
            data.len()
        ));
    }
    let (partition, code) = split_fixed(data, &[1, data.len() - 1])
        .map(|f| (f[0], f[1]))?;
    check_code(code)?;
    Ok(CommandFields::PartitionCode {
        partition: partition_number(partition)?,
        code: code.to_string(),
    })
}

fn serialize_partition_code(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::PartitionCode { partition, code } => {
            check_partition(*partition)?;
            check_code(code)?;
            Ok(format!("{}{}", partition, code))
        }
        other => mismatch("partition+code", other),
    }
}

fn parse_partition_output(data: &str) -> ParseResult {
    let f = split_fixed(data, &[1, 1])?;
    let partition = partition_number(f[0])?;
    match numeric(f[1], "output")? {
        o @ 1..=4 => Ok(CommandFields::PartitionOutput {
            partition,
            output: o as u8,
        }),
        o => Err(format!("output {} out of range 1-4", o)),
    }
}

fn serialize_partition_output(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::PartitionOutput { partition, output } if (1..=4).contains(output) => {
            check_partition(*partition)?;
            Ok(format!("{}{}", partition, output))
        }
        CommandFields::PartitionOutput { output, .. } => {
            Err(format!("output {} out of range 1-4", output))
        }
        other => mismatch("partition+output", other),
    }
}

fn parse_access_code(data: &str) -> ParseResult {
    check_code(data)?;
    Ok(CommandFields::AccessCode {
        code: data.to_string(),
    })
}

fn serialize_access_code(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::AccessCode { code } => {
            check_code(code)?;
            Ok(code.clone())
        }
        other => mismatch("access code", other),
    }
}

fn parse_number<const W: usize>(data: &str) -> ParseResult {
    let f = split_fixed(data, &[W])?;
    Ok(CommandFields::Number {
        value: numeric(f[0], "value")?,
    })
}

fn serialize_number<const W: usize>(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Number { value } => {
            let text = format!("{:0width$}", value, width = W);
            if text.len() == W {
                Ok(text)
            } else {
                Err(format!("{} does not fit {} digits", value, W))
            }
        }
        other => mismatch("number", other),
    }
}

fn parse_command_code(data: &str) -> ParseResult {
    let f = split_fixed(data, &[CODE_LEN])?;
    validate_code(f[0]).map_err(|e| e.to_string())?;
    Ok(CommandFields::CommandCode {
        code: f[0].to_string(),
    })
}

fn serialize_command_code(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::CommandCode { code } => {
            validate_code(code).map_err(|e| e.to_string())?;
            Ok(code.clone())
        }
        other => mismatch("command code", other),
    }
}

fn parse_login(data: &str) -> ParseResult {
    let f = split_fixed(data, &[1])?;
    f[0].chars()
        .next()
        .and_then(LoginStatus::from_digit)
        .map(|status| CommandFields::Login { status })
        .ok_or_else(|| format!("unknown login status {:?}", f[0]))
}

fn serialize_login(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Login { status } => Ok(status.as_digit().to_string()),
        other => mismatch("login", other),
    }
}

fn parse_leds(data: &str) -> ParseResult {
    let f = split_fixed(data, &[2])?;
    if !f[0].bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("LED bitmap must be hex, got {:?}", f[0]));
    }
    let bits = u8::from_str_radix(f[0], 16).map_err(|e| e.to_string())?;
    Ok(CommandFields::Leds {
        leds: KeypadLeds::from_bits_retain(bits),
    })
}

fn serialize_leds(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Leds { leds } => Ok(format!("{:02X}", leds.bits())),
        other => mismatch("LED bitmap", other),
    }
}

/// `hhmmMMDDYY`, years 2000-2099.
fn parse_date_time(data: &str) -> ParseResult {
    let f = split_fixed(data, &[2, 2, 2, 2, 2])?;
    let hour = numeric(f[0], "hour")?;
    let minute = numeric(f[1], "minute")?;
    let month = numeric(f[2], "month")?;
    let day = numeric(f[3], "day")?;
    let year = numeric(f[4], "year")? as i32 + 2000;
    let at = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| format!("invalid date/time {:?}", data))?;
    Ok(CommandFields::DateTime { at })
}

fn serialize_date_time(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::DateTime { at } => format_date_time(at),
        other => mismatch("date/time", other),
    }
}

fn format_date_time(at: &NaiveDateTime) -> SerializeResult {
    use chrono::Datelike;
    if !(2000..=2099).contains(&at.year()) {
        return Err(format!("year {} not representable", at.year()));
    }
    Ok(at.format("%H%M%m%d%y").to_string())
}

fn check_password(password: &str) -> std::result::Result<(), String> {
    if (1..=10).contains(&password.len()) && password.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err("password must be 1-10 alphanumeric characters".to_string())
    }
}

fn parse_password(data: &str) -> ParseResult {
    check_password(data)?;
    Ok(CommandFields::Password {
        password: data.to_string(),
    })
}

fn serialize_password(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Password { password } => {
            check_password(password)?;
            Ok(password.clone())
        }
        other => mismatch("password", other),
    }
}

fn parse_key(data: &str) -> ParseResult {
    let f = split_fixed(data, &[1])?;
    match f[0].chars().next() {
        Some(key) if key.is_ascii_graphic() => Ok(CommandFields::Key { key }),
        _ => Err(format!("invalid key {:?}", f[0])),
    }
}

fn serialize_key(fields: &CommandFields) -> SerializeResult {
    match fields {
        CommandFields::Key { key } if key.is_ascii_graphic() => Ok(key.to_string()),
        CommandFields::Key { key } => Err(format!("invalid key {:?}", key)),
        other => mismatch("key", other),
    }
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

use layout::*;

/// Codes known out of the box: `(code, name, layout)`.
pub const BUILTIN: &[(&str, &str, Layout)] = &[
    // Application -> module
    ("000", "Poll", EMPTY),
    ("001", "StatusRequest", EMPTY),
    ("002", "LabelsRequest", EMPTY),
    ("005", "NetworkLogin", PASSWORD),
    ("010", "SetTimeAndDate", DATE_TIME),
    ("020", "CommandOutputControl", PARTITION_OUTPUT),
    ("030", "PartitionArmAway", PARTITION),
    ("031", "PartitionArmStay", PARTITION),
    ("032", "PartitionArmNoEntryDelay", PARTITION),
    ("033", "PartitionArmWithCode", PARTITION_CODE),
    ("040", "PartitionDisarm", PARTITION_CODE),
    ("055", "TimeStampControl", DIGIT),
    ("056", "TimeDateBroadcastControl", DIGIT),
    ("057", "TemperatureBroadcastControl", DIGIT),
    ("060", "TriggerPanicAlarm", DIGIT),
    ("070", "KeyPress", KEY),
    ("200", "CodeSend", ACCESS_CODE),
    // Module -> application
    ("500", "CommandAcknowledge", COMMAND_CODE),
    ("501", "CommandError", EMPTY),
    ("502", "SystemError", NUMBER_3),
    ("505", "LoginInteraction", LOGIN),
    ("510", "KeypadLedState", LEDS),
    ("511", "KeypadLedFlashState", LEDS),
    ("550", "TimeDateBroadcast", DATE_TIME),
    ("560", "RingDetected", EMPTY),
    ("601", "ZoneAlarm", PARTITION_ZONE),
    ("602", "ZoneAlarmRestore", PARTITION_ZONE),
    ("603", "ZoneTamper", PARTITION_ZONE),
    ("604", "ZoneTamperRestore", PARTITION_ZONE),
    ("605", "ZoneFault", PARTITION_ZONE),
    ("606", "ZoneFaultRestore", PARTITION_ZONE),
    ("609", "ZoneOpen", ZONE),
    ("610", "ZoneRestored", ZONE),
    ("620", "DuressAlarm", ACCESS_CODE),
    ("621", "FireKeyAlarm", EMPTY),
    ("622", "FireKeyRestore", EMPTY),
    ("623", "AuxiliaryKeyAlarm", EMPTY),
    ("624", "AuxiliaryKeyRestore", EMPTY),
    ("625", "PanicKeyAlarm", EMPTY),
    ("626", "PanicKeyRestore", EMPTY),
    ("631", "SmokeAuxAlarm", EMPTY),
    ("632", "SmokeAuxRestore", EMPTY),
    ("650", "PartitionReady", PARTITION),
    ("651", "PartitionNotReady", PARTITION),
    ("652", "PartitionArmed", PARTITION_MODE),
    ("653", "PartitionReadyForceArm", PARTITION),
    ("654", "PartitionInAlarm", PARTITION),
    ("655", "PartitionDisarmed", PARTITION),
    ("656", "ExitDelayInProgress", PARTITION),
    ("657", "EntryDelayInProgress", PARTITION),
    ("658", "KeypadLockout", PARTITION),
    ("659", "KeypadBlanking", PARTITION),
    ("660", "CommandOutputInProgress", PARTITION),
    ("670", "InvalidAccessCode", PARTITION),
    ("671", "FunctionNotAvailable", PARTITION),
    ("672", "FailedToArm", PARTITION),
    ("673", "PartitionBusy", PARTITION),
    ("700", "UserClosing", PARTITION_USER),
    ("701", "SpecialClosing", PARTITION),
    ("702", "PartialClosing", PARTITION),
    ("750", "UserOpening", PARTITION_USER),
    ("751", "SpecialOpening", PARTITION),
    ("800", "PanelBatteryTrouble", EMPTY),
    ("801", "PanelBatteryRestore", EMPTY),
    ("802", "PanelAcTrouble", EMPTY),
    ("803", "PanelAcRestore", EMPTY),
    ("806", "SystemBellTrouble", EMPTY),
    ("807", "SystemBellRestore", EMPTY),
    ("810", "TlmLine1Trouble", EMPTY),
    ("811", "TlmLine1Restore", EMPTY),
    ("812", "TlmLine2Trouble", EMPTY),
    ("813", "TlmLine2Restore", EMPTY),
    ("814", "FtcTrouble", EMPTY),
    ("816", "BufferNearFull", EMPTY),
    ("821", "DeviceLowBattery", ZONE),
    ("822", "DeviceLowBatteryRestore", ZONE),
    ("825", "WirelessKeyLowBattery", ZONE),
    ("826", "WirelessKeyLowBatteryRestore", ZONE),
    ("829", "SystemTamper", EMPTY),
    ("830", "SystemTamperRestore", EMPTY),
    ("840", "TroubleStatus", PARTITION),
    ("841", "TroubleStatusRestore", PARTITION),
    ("842", "FireTroubleAlarm", EMPTY),
    ("843", "FireTroubleRestore", EMPTY),
    ("896", "KeybusFault", EMPTY),
    ("897", "KeybusFaultRestore", EMPTY),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_codes_unique_and_valid() {
        let mut seen = HashSet::new();
        for (code, _, _) in BUILTIN {
            assert!(validate_code(code).is_ok(), "bad code {}", code);
            assert!(seen.insert(*code), "duplicate code {}", code);
        }
        assert_eq!(CommandRegistry::default().len(), BUILTIN.len());
    }

    #[test]
    fn test_parse_zone_alarm() {
        let registry = CommandRegistry::default();
        let cmd = registry.parse("601", "1001");
        assert_eq!(cmd.name, Some("ZoneAlarm"));
        assert_eq!(
            cmd.fields,
            Ok(CommandFields::PartitionZone {
                partition: 1,
                zone: 1
            })
        );
    }

    #[test]
    fn test_parse_failures_carry_reason() {
        let registry = CommandRegistry::default();

        let cmd = registry.parse("896", "1");
        let failure = cmd.parse_failure().expect("keybus fault takes no data");
        assert_eq!(failure.code, "896");
        assert_eq!(failure.data, "1");
        assert_eq!(failure.reason, "Expected data length of 0 bytes, received 1");

        let cmd = registry.parse("609", "0a1");
        assert!(cmd.parse_failure().unwrap().reason.contains("numeric"));

        let cmd = registry.parse("650", "9");
        assert!(cmd.parse_failure().unwrap().reason.contains("out of range"));

        let cmd = registry.parse("652", "17");
        assert!(cmd.parse_failure().unwrap().reason.contains("arm mode"));
    }

    #[test]
    fn test_wrong_length_always_fails_for_registered_codes() {
        let registry = CommandRegistry::default();
        for (code, _, _) in BUILTIN {
            let cmd = registry.parse(code, "123456789012");
            assert!(cmd.parse_failure().is_some(), "{} accepted an oversized field", code);
            assert!(!cmd.is_unknown());
        }
    }

    #[test]
    fn test_unknown_code_passes_through() {
        let registry = CommandRegistry::default();
        let cmd = registry.parse("999", "anything at all");
        assert!(cmd.is_unknown());
        assert_eq!(cmd.fields, Ok(CommandFields::Raw("anything at all".to_string())));

        let empty = CommandRegistry::new();
        assert!(empty.is_empty());
        assert!(empty.parse("601", "1001").is_unknown());
    }

    #[test]
    fn test_non_ascii_data_is_a_failure_not_a_panic() {
        let registry = CommandRegistry::default();
        let cmd = registry.parse("601", "1é1");
        assert!(cmd.parse_failure().is_some());
    }

    #[test]
    fn test_parse_typed_layouts() {
        let registry = CommandRegistry::default();
        assert_eq!(
            registry.parse("652", "21").fields,
            Ok(CommandFields::PartitionMode {
                partition: 2,
                mode: ArmMode::Stay
            })
        );
        assert_eq!(
            registry.parse("700", "10040").fields,
            Ok(CommandFields::PartitionUser {
                partition: 1,
                user: 40
            })
        );
        assert_eq!(
            registry.parse("505", "3").fields,
            Ok(CommandFields::Login {
                status: LoginStatus::PasswordRequest
            })
        );
        assert_eq!(
            registry.parse("510", "83").fields,
            Ok(CommandFields::Leds {
                leds: KeypadLeds::READY | KeypadLeds::ARMED | KeypadLeds::BACKLIGHT
            })
        );
        assert_eq!(
            registry.parse("500", "000").fields,
            Ok(CommandFields::CommandCode {
                code: "000".to_string()
            })
        );
        let at = NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(
            registry.parse("550", "1230051524").fields,
            Ok(CommandFields::DateTime { at })
        );
        assert!(registry.parse("550", "2530051524").parse_failure().is_some());
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_codes() {
        let mut registry = CommandRegistry::default();
        let variant = CommandVariant::with_layout("SoftwareVersion", layout::EMPTY);

        assert!(matches!(
            registry.register("601", variant),
            Err(It100Error::DuplicateCode { .. })
        ));
        assert!(matches!(
            registry.register("60", variant),
            Err(It100Error::InvalidCode { .. })
        ));
        assert!(matches!(
            registry.register("6 1", variant),
            Err(It100Error::InvalidCode { .. })
        ));

        registry.register("908", variant).unwrap();
        assert_eq!(registry.get("908").unwrap().name, "SoftwareVersion");
        assert!(!registry.parse("908", "").is_unknown());
    }

    #[test]
    fn test_custom_parse_fn() {
        fn parse_version(data: &str) -> std::result::Result<CommandFields, String> {
            if data.len() == 6 {
                Ok(CommandFields::Raw(data.to_string()))
            } else {
                Err("version is 6 characters".to_string())
            }
        }
        fn serialize_version(fields: &CommandFields) -> std::result::Result<String, String> {
            match fields {
                CommandFields::Raw(s) => Ok(s.clone()),
                _ => Err("raw only".to_string()),
            }
        }

        let mut registry = CommandRegistry::new();
        registry
            .register(
                "908",
                CommandVariant::new("SoftwareVersion", parse_version, serialize_version),
            )
            .unwrap();
        assert!(registry.parse("908", "010203").parse_failure().is_none());
        assert_eq!(
            registry.parse("908", "01").parse_failure().unwrap().reason,
            "version is 6 characters"
        );
    }

    #[test]
    fn test_serialize_typed_commands() {
        let registry = CommandRegistry::default();
        let cases = [
            (OutboundCommand::poll(), ""),
            (OutboundCommand::status_request(), ""),
            (OutboundCommand::code_send("1234"), "1234"),
            (OutboundCommand::arm_away(1), "1"),
            (OutboundCommand::disarm(2, "123456"), "2123456"),
            (OutboundCommand::command_output(1, 3), "13"),
            (OutboundCommand::panic(3), "3"),
            (OutboundCommand::key_press('*'), "*"),
            (OutboundCommand::network_login("user"), "user"),
        ];
        for (cmd, expected) in cases {
            assert_eq!(registry.serialize(&cmd).unwrap(), expected, "{}", cmd.code);
        }

        let at = NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(
            registry.serialize(&OutboundCommand::set_time_date(at)).unwrap(),
            "0905051524"
        );
    }

    #[test]
    fn test_serialize_rejects_bad_fields() {
        let registry = CommandRegistry::default();
        for cmd in [
            OutboundCommand::arm_away(9),
            OutboundCommand::code_send("12"),
            OutboundCommand::disarm(1, "12a4"),
            OutboundCommand::network_login(""),
            OutboundCommand::new("030", CommandFields::Empty),
            OutboundCommand::raw("200", "12"),
            OutboundCommand::raw("000", "1"),
            OutboundCommand::new("999", CommandFields::Partition { partition: 1 }),
            OutboundCommand::raw("999", "a\r\nb"),
        ] {
            assert!(
                matches!(registry.serialize(&cmd), Err(It100Error::Serialize { .. })),
                "{:?} should not serialize",
                cmd
            );
        }
        assert!(matches!(
            registry.serialize(&OutboundCommand::raw("12", "")),
            Err(It100Error::InvalidCode { .. })
        ));
    }

    #[test]
    fn test_serialize_raw() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.serialize(&OutboundCommand::raw("200", "1234")).unwrap(), "1234");
        assert_eq!(registry.serialize(&OutboundCommand::raw("999", "xyz")).unwrap(), "xyz");
        assert_eq!(
            registry
                .serialize(&OutboundCommand::new("999", CommandFields::Empty))
                .unwrap(),
            ""
        );
    }
}
