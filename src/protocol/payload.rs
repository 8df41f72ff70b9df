//! Comma-separated payloads with a fixed field list per type.

use core::str::FromStr;

use super::ProtocolError;
use crate::common::ShotResult;
use crate::config::{NAME_MAX, PAYLOAD_MAX};
use crate::grid::is_ship;
use crate::ship::Orientation;

/// A value carried in the payload of a frame.
pub trait Payload: Sized {
    /// Number of comma-separated fields.
    const ARITY: usize;

    fn fields(&self) -> Vec<String>;

    /// Build the value from exactly [`Payload::ARITY`] fields.
    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError>;

    fn encode(&self) -> Result<String, ProtocolError> {
        let fields = self.fields();
        if let Some(bad) = fields.iter().find(|f| has_delimiter(f)) {
            return Err(ProtocolError::InvalidField(bad.clone()));
        }
        let payload = fields.join(",");
        if payload.len() > PAYLOAD_MAX {
            return Err(ProtocolError::PayloadTooLong(payload.len()));
        }
        Ok(payload)
    }

    fn decode(payload: &str) -> Result<Self, ProtocolError> {
        let fields: Vec<&str> = payload.split(',').collect();
        if fields.len() != Self::ARITY {
            return Err(ProtocolError::MalformedPayload(format!(
                "expected {} fields, got {} in {payload:?}",
                Self::ARITY,
                fields.len()
            )));
        }
        // Only the first two colons of a frame delimit; later ones land here.
        if let Some(bad) = fields.iter().find(|f| has_delimiter(f)) {
            return Err(ProtocolError::InvalidField(bad.to_string()));
        }
        Self::from_fields(&fields)
    }
}

fn has_delimiter(field: &str) -> bool {
    field.contains([',', ':', '\n', '\r'])
}

fn parse<T: FromStr>(field: &str, what: &str) -> Result<T, ProtocolError> {
    field
        .trim()
        .parse()
        .map_err(|_| ProtocolError::MalformedPayload(format!("bad {what} {field:?}")))
}

fn parse_flag(field: &str, what: &str) -> Result<bool, ProtocolError> {
    match parse::<u8>(field, what)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(ProtocolError::MalformedPayload(format!("bad {what} {field:?}"))),
    }
}

fn parse_team(field: &str) -> Result<u8, ProtocolError> {
    match parse::<u8>(field, "team id")? {
        id @ (0 | 1) => Ok(id),
        _ => Err(ProtocolError::MalformedPayload(format!("bad team id {field:?}"))),
    }
}

fn parse_name(field: &str) -> Result<String, ProtocolError> {
    let len = field.chars().count();
    if len == 0 || len > NAME_MAX {
        return Err(ProtocolError::MalformedPayload(format!("bad name {field:?}")));
    }
    Ok(field.to_string())
}

/// Role a client registers under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Role {
    Player,
    Host,
}

impl Role {
    pub fn code(self) -> u8 {
        match self {
            Role::Player => 0,
            Role::Host => 1,
        }
    }
}

/// Identity a client announces to the registration server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub role: Role,
    pub address: String,
    pub port: u16,
}

impl ClientInfo {
    pub fn new(name: impl Into<String>, role: Role, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            role,
            address: address.into(),
            port,
        }
    }
}

impl Payload for ClientInfo {
    const ARITY: usize = 4;

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.role.code().to_string(),
            self.address.clone(),
            self.port.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        let role = match parse::<u8>(fields[1], "role")? {
            0 => Role::Player,
            1 => Role::Host,
            _ => return Err(ProtocolError::MalformedPayload(format!("bad role {:?}", fields[1]))),
        };
        if fields[2].is_empty() {
            return Err(ProtocolError::MalformedPayload("empty address".into()));
        }
        Ok(Self {
            name: parse_name(fields[0])?,
            role,
            address: fields[2].to_string(),
            port: parse(fields[3], "port")?,
        })
    }
}

/// Sent by a player joining a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerJoin {
    pub id: usize,
    pub name: String,
}

impl Payload for PlayerJoin {
    const ARITY: usize = 2;

    fn fields(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: parse(fields[0], "player id")?,
            name: parse_name(fields[1])?,
        })
    }
}

/// Team and seat index granted to a joining player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub team_id: u8,
    pub player_index: usize,
}

impl Payload for Seat {
    const ARITY: usize = 2;

    fn fields(&self) -> Vec<String> {
        vec![self.team_id.to_string(), self.player_index.to_string()]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        Ok(Self {
            team_id: parse_team(fields[0])?,
            player_index: parse(fields[1], "player index")?,
        })
    }
}

/// A shot fired by `team_id` at the opposing grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shot {
    pub team_id: u8,
    pub row: usize,
    pub col: usize,
}

impl Payload for Shot {
    const ARITY: usize = 3;

    fn fields(&self) -> Vec<String> {
        vec![self.team_id.to_string(), self.row.to_string(), self.col.to_string()]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        Ok(Self {
            team_id: parse_team(fields[0])?,
            row: parse(fields[1], "row")?,
            col: parse(fields[2], "col")?,
        })
    }
}

/// One ship placed on a team grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: u8,
    pub length: usize,
    pub row: usize,
    pub col: usize,
    pub orientation: Orientation,
}

impl Payload for Placement {
    const ARITY: usize = 5;

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.length.to_string(),
            self.row.to_string(),
            self.col.to_string(),
            self.orientation.code().to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        let orientation = Orientation::from_code(parse(fields[4], "orientation")?)
            .ok_or_else(|| ProtocolError::MalformedPayload(format!("bad orientation {:?}", fields[4])))?;
        Ok(Self {
            id: parse(fields[0], "ship id")?,
            length: parse(fields[1], "length")?,
            row: parse(fields[2], "row")?,
            col: parse(fields[3], "col")?,
            orientation,
        })
    }
}

/// Which half of the match a turn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TurnPhase {
    Placement,
    Battle,
}

/// Tells a team (and in placement, a seat) that it may act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub team_id: u8,
    pub player_id: usize,
    pub phase: TurnPhase,
}

impl Payload for Turn {
    const ARITY: usize = 3;

    fn fields(&self) -> Vec<String> {
        let phase = match self.phase {
            TurnPhase::Placement => 0,
            TurnPhase::Battle => 1,
        };
        vec![self.team_id.to_string(), self.player_id.to_string(), phase.to_string()]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        let phase = if parse_flag(fields[2], "phase")? {
            TurnPhase::Battle
        } else {
            TurnPhase::Placement
        };
        Ok(Self {
            team_id: parse_team(fields[0])?,
            player_id: parse(fields[1], "player id")?,
            phase,
        })
    }
}

impl Payload for ShotResult {
    const ARITY: usize = 5;

    fn fields(&self) -> Vec<String> {
        vec![
            self.row.to_string(),
            self.col.to_string(),
            u8::from(self.hit).to_string(),
            u8::from(self.sunk).to_string(),
            self.ship_id.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        let hit = parse_flag(fields[2], "hit flag")?;
        let sunk = parse_flag(fields[3], "sunk flag")?;
        let ship_id = parse(fields[4], "ship id")?;
        // A hit names a ship cell code, a miss names none.
        let consistent = if hit { is_ship(ship_id) } else { ship_id == 0 && !sunk };
        if !consistent {
            return Err(ProtocolError::MalformedPayload(format!(
                "ship id {ship_id} does not match hit {hit} sunk {sunk}"
            )));
        }
        Ok(Self {
            row: parse(fields[0], "row")?,
            col: parse(fields[1], "col")?,
            hit,
            sunk,
            ship_id,
        })
    }
}

/// Team that won the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Winner {
    pub team_id: u8,
}

impl Payload for Winner {
    const ARITY: usize = 1;

    fn fields(&self) -> Vec<String> {
        vec![self.team_id.to_string()]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        Ok(Self {
            team_id: parse_team(fields[0])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coordinates_are_malformed() {
        assert!(matches!(Shot::decode("0,-1,3"), Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn shot_result_flags_are_binary() {
        assert!(ShotResult::decode("1,1,2,0,3").is_err());
        let res = ShotResult::decode("1,2,1,0,3").unwrap();
        assert!(res.hit && !res.sunk);
    }
}
