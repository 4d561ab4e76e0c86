// MIT License - Copyright (c) 2026 Peter Wright
// Wire constants and command codes

use std::time::Duration;

/// Frame terminator bytes.
pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';

/// Every frame starts with a 3-character command code.
pub const CODE_LEN: usize = 3;
/// Every frame ends (before CR LF) with two uppercase hex checksum digits.
pub const CHECKSUM_LEN: usize = 2;

/// Longest candidate frame the decoder will buffer before giving up on it.
///
/// The longest module message (an LCD update) is well under 64 bytes, so
/// anything past this is line noise or a baud-rate mismatch.
pub const MAX_FRAME_LEN: usize = 256;

/// Default TCP port of Envisalink-style network bridges.
pub const DEFAULT_PORT: u16 = 4025;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_KEEP_ALIVE_MULTIPLE: u32 = 3;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Command codes with special meaning to the engine itself.
///
/// The full catalog lives in [`crate::registry`]; these are the handful the
/// keep-alive, status poll and login handshake reach for directly.
pub mod codes {
    /// `000`: Poll. Answered by `500000`.
    pub const POLL: &str = "000";
    /// `001`: Status Request. The module replays current zone/partition state.
    pub const STATUS_REQUEST: &str = "001";
    /// `005`: Network Login (password for network bridges).
    pub const NETWORK_LOGIN: &str = "005";
    /// `200`: Code Send (access code in reply to a code request).
    pub const CODE_SEND: &str = "200";
    /// `500`: Command Acknowledge.
    pub const COMMAND_ACKNOWLEDGE: &str = "500";
    /// `505`: Login Interaction (prompt / result of a network login).
    pub const LOGIN_INTERACTION: &str = "505";
    /// `601`: Zone Alarm.
    pub const ZONE_ALARM: &str = "601";
}
