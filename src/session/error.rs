use crate::common::GridError;
use crate::protocol::Action;

/// Reasons the match coordinator refuses a request. Each maps to an `ERR`
/// reply naming the request's action; none changes match state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("match is full ({0} players)")]
    MatchFull(usize),

    #[error("{0} is not allowed in the current phase")]
    OutOfPhase(Action),

    #[error("not your team's turn")]
    OutOfTurn,

    #[error("invalid position: {0}")]
    PlacementRejected(GridError),

    /// Id and length do not name a fleet ship, or the ship is already down.
    #[error("ship {id} of length {length} cannot be placed")]
    InvalidShip { id: u8, length: usize },

    #[error("need at least {needed} players, have {joined}")]
    NotEnoughPlayers { needed: usize, joined: usize },

    #[error("unknown seat {0}")]
    UnknownSeat(usize),
}
