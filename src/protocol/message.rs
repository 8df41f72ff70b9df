//! Typed messages of both dialogues, each with one conversion to and from
//! frames.

use super::payload::{ClientInfo, Payload, Placement, PlayerJoin, Seat, Shot, Turn, Winner};
use super::{clip_reason, Action, ProtocolError, Range, Request, Response, Verb};
use crate::common::ShotResult;

/// Payload of a placement acknowledgement sent to the placer.
pub const PLACEMENT_OK: &str = "OK";

/// Client to registration server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationRequest {
    Register(ClientInfo),
    Unregister,
    /// Ask for the next connected host after the dialogue's cursor.
    ListNext,
}

impl RegistrationRequest {
    pub fn to_request(&self) -> Result<Request, ProtocolError> {
        Ok(match self {
            RegistrationRequest::Register(info) => {
                Request::new(Range::Req, Action::Connect, Verb::Post, info.encode()?)
            }
            RegistrationRequest::Unregister => Request::new(Range::Req, Action::Connect, Verb::Delete, ""),
            RegistrationRequest::ListNext => Request::new(Range::Req, Action::Connect, Verb::Get, ""),
        })
    }

    pub fn from_request(req: &Request) -> Result<Self, ProtocolError> {
        if req.range() != Range::Req || req.action() != Action::Connect {
            return Err(ProtocolError::Unhandled(req.status));
        }
        Ok(match req.verb {
            Verb::Post => RegistrationRequest::Register(ClientInfo::decode(&req.payload)?),
            Verb::Delete => RegistrationRequest::Unregister,
            Verb::Get => RegistrationRequest::ListNext,
        })
    }
}

/// Registration server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationReply {
    /// Registration or unregistration accepted.
    Ack,
    /// Next host in the listing.
    Host(ClientInfo),
    /// Refusal; an empty reason on `CONNECT` ends a host listing.
    Error { action: Action, reason: String },
}

impl RegistrationReply {
    pub fn to_response(&self) -> Result<Response, ProtocolError> {
        Ok(match self {
            RegistrationReply::Ack => Response::ack(Action::Connect, ""),
            RegistrationReply::Host(info) => Response::ack(Action::Connect, info.encode()?),
            RegistrationReply::Error { action, reason } => Response::err(*action, reason.clone()),
        })
    }

    pub fn from_response(resp: &Response) -> Result<Self, ProtocolError> {
        match (resp.range(), resp.action()) {
            (Range::Err, action) => Ok(RegistrationReply::Error {
                action,
                reason: resp.payload.clone(),
            }),
            (Range::Ack, Action::Connect) if resp.payload.is_empty() => Ok(RegistrationReply::Ack),
            (Range::Ack, Action::Connect) => Ok(RegistrationReply::Host(ClientInfo::decode(&resp.payload)?)),
            _ => Err(ProtocolError::Unhandled(resp.status)),
        }
    }
}

/// Player to game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRequest {
    Join(PlayerJoin),
    Leave,
    Place(Placement),
    Shoot(Shot),
}

impl GameRequest {
    pub fn action(&self) -> Action {
        match self {
            GameRequest::Join(_) | GameRequest::Leave => Action::Connect,
            GameRequest::Place(_) => Action::Place,
            GameRequest::Shoot(_) => Action::Shoot,
        }
    }

    pub fn to_request(&self) -> Result<Request, ProtocolError> {
        Ok(match self {
            GameRequest::Join(join) => Request::new(Range::Req, Action::Connect, Verb::Post, join.encode()?),
            GameRequest::Leave => Request::new(Range::Req, Action::Connect, Verb::Delete, ""),
            GameRequest::Place(p) => Request::new(Range::Req, Action::Place, Verb::Post, p.encode()?),
            GameRequest::Shoot(s) => Request::new(Range::Req, Action::Shoot, Verb::Post, s.encode()?),
        })
    }

    pub fn from_request(req: &Request) -> Result<Self, ProtocolError> {
        if req.range() != Range::Req {
            return Err(ProtocolError::Unhandled(req.status));
        }
        match (req.action(), req.verb) {
            (Action::Connect, Verb::Post) => Ok(GameRequest::Join(PlayerJoin::decode(&req.payload)?)),
            (Action::Connect, Verb::Delete) => Ok(GameRequest::Leave),
            (Action::Place, Verb::Post) => Ok(GameRequest::Place(Placement::decode(&req.payload)?)),
            (Action::Shoot, Verb::Post) => Ok(GameRequest::Shoot(Shot::decode(&req.payload)?)),
            _ => Err(ProtocolError::Unhandled(req.status)),
        }
    }
}

/// Game server to player: replies and broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Joined(Seat),
    Left,
    /// The placer's own ship was accepted.
    PlacementConfirmed,
    /// A teammate placed a ship on the shared grid.
    TeammatePlacement(Placement),
    ShotResolved(ShotResult),
    NextTurn(Turn),
    GameStarted,
    GameOver(Winner),
    Error { action: Action, reason: String },
}

impl GameEvent {
    pub fn action(&self) -> Action {
        match self {
            GameEvent::Joined(_) | GameEvent::Left => Action::Connect,
            GameEvent::PlacementConfirmed | GameEvent::TeammatePlacement(_) => Action::Place,
            GameEvent::ShotResolved(_) => Action::Shoot,
            GameEvent::NextTurn(_) => Action::NextTurn,
            GameEvent::GameStarted => Action::StartGame,
            GameEvent::GameOver(_) => Action::EndGame,
            GameEvent::Error { action, .. } => *action,
        }
    }

    pub fn error(action: Action, reason: impl Into<String>) -> Self {
        GameEvent::Error {
            action,
            reason: clip_reason(reason),
        }
    }

    pub fn to_response(&self) -> Result<Response, ProtocolError> {
        let payload = match self {
            GameEvent::Joined(seat) => seat.encode()?,
            GameEvent::Left | GameEvent::GameStarted => String::new(),
            GameEvent::PlacementConfirmed => PLACEMENT_OK.to_string(),
            GameEvent::TeammatePlacement(p) => p.encode()?,
            GameEvent::ShotResolved(res) => res.encode()?,
            GameEvent::NextTurn(turn) => turn.encode()?,
            GameEvent::GameOver(winner) => winner.encode()?,
            GameEvent::Error { action, reason } => return Ok(Response::err(*action, reason.clone())),
        };
        Ok(Response::ack(self.action(), payload))
    }

    pub fn from_response(resp: &Response) -> Result<Self, ProtocolError> {
        let payload = resp.payload.as_str();
        match (resp.range(), resp.action()) {
            (Range::Err, action) => Ok(GameEvent::error(action, payload)),
            (Range::Ack, Action::Connect) if payload.is_empty() => Ok(GameEvent::Left),
            (Range::Ack, Action::Connect) => Ok(GameEvent::Joined(Seat::decode(payload)?)),
            (Range::Ack, Action::Place) if payload == PLACEMENT_OK => Ok(GameEvent::PlacementConfirmed),
            (Range::Ack, Action::Place) => Ok(GameEvent::TeammatePlacement(Placement::decode(payload)?)),
            (Range::Ack, Action::Shoot) => Ok(GameEvent::ShotResolved(ShotResult::decode(payload)?)),
            (Range::Ack, Action::NextTurn) => Ok(GameEvent::NextTurn(Turn::decode(payload)?)),
            (Range::Ack, Action::StartGame) => Ok(GameEvent::GameStarted),
            (Range::Ack, Action::EndGame) => Ok(GameEvent::GameOver(Winner::decode(payload)?)),
            _ => Err(ProtocolError::Unhandled(resp.status)),
        }
    }
}
