//! Line-oriented wire protocol.
//!
//! A request is `"<status>:<verb>:<payload>"` and a response is
//! `"<status>:<payload>"`. The status code packs a [`Range`] and an
//! [`Action`]: `status = (range + 1) * 100 + action`.

mod error;
pub mod message;
pub mod payload;

use core::fmt;

use crate::config::PAYLOAD_MAX;

pub use error::ProtocolError;
pub use message::{GameEvent, GameRequest, RegistrationReply, RegistrationRequest};
pub use payload::{ClientInfo, Payload, Placement, PlayerJoin, Role, Seat, Shot, Turn, TurnPhase, Winner};

/// Whether a frame asks, acknowledges or refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Range {
    Req,
    Ack,
    Err,
}

impl Range {
    fn ordinal(self) -> i16 {
        match self {
            Range::Req => 0,
            Range::Ack => 1,
            Range::Err => 2,
        }
    }
}

/// What a frame is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Unhandled,
    Connect,
    Place,
    Shoot,
    NextTurn,
    EndGame,
    StartGame,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Unhandled,
        Action::Connect,
        Action::Place,
        Action::Shoot,
        Action::NextTurn,
        Action::EndGame,
        Action::StartGame,
    ];

    /// Value carried in the low two digits of a status code.
    pub fn wire(self) -> i16 {
        match self {
            Action::Unhandled => 0,
            Action::Connect => 1,
            Action::Place => 2,
            Action::Shoot => 3,
            Action::NextTurn => 4,
            Action::EndGame => 5,
            Action::StartGame => 6,
        }
    }

    /// Unknown values map to [`Action::Unhandled`].
    pub fn from_wire(value: i16) -> Self {
        match value {
            1 => Action::Connect,
            2 => Action::Place,
            3 => Action::Shoot,
            4 => Action::NextTurn,
            5 => Action::EndGame,
            6 => Action::StartGame,
            _ => Action::Unhandled,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Unhandled => "UNHANDLED",
            Action::Connect => "CONNECT",
            Action::Place => "PLACE",
            Action::Shoot => "SHOOT",
            Action::NextTurn => "NEXT_TURN",
            Action::EndGame => "END_GAME",
            Action::StartGame => "START_GAME",
        };
        f.write_str(name)
    }
}

/// Request verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Delete,
}

impl Verb {
    pub fn code(self) -> u8 {
        match self {
            Verb::Get => 0,
            Verb::Post => 1,
            Verb::Delete => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Verb::Get),
            1 => Some(Verb::Post),
            2 => Some(Verb::Delete),
            _ => None,
        }
    }
}

pub fn status_code(range: Range, action: Action) -> i16 {
    (range.ordinal() + 1) * 100 + action.wire()
}

/// Range encoded in `code`. Anything outside 1xx..3xx reads as an error.
pub fn range_of(code: i16) -> Range {
    match code / 100 {
        1 => Range::Req,
        2 => Range::Ack,
        _ => Range::Err,
    }
}

pub fn action_of(code: i16) -> Action {
    Action::from_wire(code % 100)
}

/// Best-effort action of a line that failed to decode, used to address the
/// error reply.
pub fn action_hint(line: &str) -> Action {
    line.split(':')
        .next()
        .and_then(|code| code.trim().parse::<i16>().ok())
        .map(action_of)
        .unwrap_or(Action::Unhandled)
}

/// Cut a free-text reason down to what one payload can carry.
pub fn clip_reason(reason: impl Into<String>) -> String {
    let mut reason: String = reason.into().replace(['\n', '\r'], " ");
    if reason.len() > PAYLOAD_MAX {
        let mut end = PAYLOAD_MAX;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

fn check_payload(payload: &str) -> Result<(), ProtocolError> {
    if payload.len() > PAYLOAD_MAX {
        return Err(ProtocolError::PayloadTooLong(payload.len()));
    }
    if payload.contains(['\n', '\r']) {
        return Err(ProtocolError::InvalidField(payload.to_string()));
    }
    Ok(())
}

fn parse_status(field: &str) -> Result<i16, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::MalformedFrame(format!("bad status code {field:?}")))
}

fn strip_line_end(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// A frame sent by the side opening a dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub status: i16,
    pub verb: Verb,
    pub payload: String,
}

impl Request {
    pub fn new(range: Range, action: Action, verb: Verb, payload: impl Into<String>) -> Self {
        Self {
            status: status_code(range, action),
            verb,
            payload: payload.into(),
        }
    }

    pub fn range(&self) -> Range {
        range_of(self.status)
    }

    pub fn action(&self) -> Action {
        action_of(self.status)
    }

    /// Render the frame without its line terminator.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        check_payload(&self.payload)?;
        Ok(format!("{}:{}:{}", self.status, self.verb.code(), self.payload))
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let line = strip_line_end(line);
        let mut parts = line.splitn(3, ':');
        let (Some(status), Some(verb), Some(payload)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ProtocolError::MalformedFrame(format!("expected status:verb:payload, got {line:?}")));
        };
        let status = parse_status(status)?;
        let verb = verb
            .parse::<u8>()
            .ok()
            .and_then(Verb::from_code)
            .ok_or_else(|| ProtocolError::MalformedFrame(format!("bad verb {verb:?}")))?;
        check_payload(payload)?;
        Ok(Self {
            status,
            verb,
            payload: payload.to_string(),
        })
    }
}

/// A frame sent in answer to a request, or pushed by a game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: i16,
    pub payload: String,
}

impl Response {
    pub fn new(range: Range, action: Action, payload: impl Into<String>) -> Self {
        Self {
            status: status_code(range, action),
            payload: payload.into(),
        }
    }

    pub fn ack(action: Action, payload: impl Into<String>) -> Self {
        Self::new(Range::Ack, action, payload)
    }

    pub fn err(action: Action, payload: impl Into<String>) -> Self {
        Self::new(Range::Err, action, payload)
    }

    pub fn range(&self) -> Range {
        range_of(self.status)
    }

    pub fn action(&self) -> Action {
        action_of(self.status)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        check_payload(&self.payload)?;
        Ok(format!("{}:{}", self.status, self.payload))
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let line = strip_line_end(line);
        let Some((status, payload)) = line.split_once(':') else {
            return Err(ProtocolError::MalformedFrame(format!("expected status:payload, got {line:?}")));
        };
        let status = parse_status(status)?;
        check_payload(payload)?;
        Ok(Self {
            status,
            payload: payload.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_wire_table() {
        assert_eq!(status_code(Range::Req, Action::Connect), 101);
        assert_eq!(status_code(Range::Ack, Action::Shoot), 203);
        assert_eq!(status_code(Range::Err, Action::StartGame), 306);
        assert_eq!(status_code(Range::Ack, Action::Unhandled), 200);
    }

    #[test]
    fn action_hint_reads_leading_status() {
        assert_eq!(action_hint("102:9:x"), Action::Place);
        assert_eq!(action_hint("garbage"), Action::Unhandled);
    }
}
