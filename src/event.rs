// MIT License - Copyright (c) 2026 Peter Wright
// Events delivered to session subscribers

use std::fmt;

use crate::codec::MalformedFrame;
use crate::error::CloseReason;
use crate::protocol::InboundCommand;

/// Everything a subscriber can observe on a session.
///
/// Obtain a stream with `client.subscribe()`. `Closed` is always the last
/// event; the stream ends after it.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A well-formed command, registered or pass-through.
    Command(InboundCommand),
    /// A registered code whose data did not fit its layout. The command's
    /// `fields` carries the failure.
    ParseFailure(InboundCommand),
    /// A frame that failed checksum or structural validation.
    Malformed(MalformedFrame),
    /// End of stream.
    Closed(CloseReason),
}

impl SessionEvent {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    /// The inbound command, for `Command` and `ParseFailure`.
    pub fn command(&self) -> Option<&InboundCommand> {
        match self {
            Self::Command(cmd) | Self::ParseFailure(cmd) => Some(cmd),
            _ => None,
        }
    }
}

impl From<InboundCommand> for SessionEvent {
    fn from(cmd: InboundCommand) -> Self {
        if cmd.parse_failure().is_some() {
            Self::ParseFailure(cmd)
        } else {
            Self::Command(cmd)
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmd) => write!(f, "{}", cmd),
            Self::ParseFailure(cmd) => match cmd.parse_failure() {
                Some(failure) => write!(f, "{}", failure),
                None => write!(f, "{}", cmd),
            },
            Self::Malformed(frame) => write!(f, "{}", frame),
            Self::Closed(reason) => write!(f, "closed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;

    #[test]
    fn test_from_inbound_routes_parse_failures() {
        let registry = CommandRegistry::default();

        let ok = SessionEvent::from(registry.parse("601", "1001"));
        assert!(matches!(ok, SessionEvent::Command(_)));

        let bad = SessionEvent::from(registry.parse("601", "001"));
        assert!(matches!(bad, SessionEvent::ParseFailure(_)));
        assert_eq!(bad.command().unwrap().data, "001");

        let unknown = SessionEvent::from(registry.parse("999", "x"));
        assert!(matches!(unknown, SessionEvent::Command(_)));
    }

    #[test]
    fn test_closed_is_terminal_marker() {
        let event = SessionEvent::Closed(CloseReason::Requested);
        assert!(event.is_closed());
        assert!(event.command().is_none());
        assert_eq!(event.to_string(), "closed: disconnect requested");
    }
}
