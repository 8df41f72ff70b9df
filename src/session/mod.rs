//! Hosted matches: the coordinator, the game server dialogues and the
//! client that mirrors them.

pub mod client;
pub mod coordinator;
mod error;
pub mod server;
mod team;

pub use client::{GameClient, Outcome};
pub use coordinator::{Coordinator, Effect, MatchState, MatchSummary, Phase, Recipient, TeamSummary};
pub use error::SessionError;
pub use server::GameServer;
pub use team::{Member, Team};
