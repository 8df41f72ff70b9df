mod common;
mod config;
pub mod grid;
pub mod lobby;
mod logging;
pub mod player;
pub mod protocol;
pub mod registration;
pub mod session;
mod ship;
pub mod transport;

pub use common::*;
pub use config::*;
pub use grid::{Grid, OpponentView};
pub use logging::{init_logging, init_logging_with, LOG_ENV};
pub use player::{AiPlayer, NodeReport, Player, PlayerNode};
pub use protocol::{Action, Range, Request, Response, Verb};
pub use registration::{RegistrationClient, RegistrationServer, Registry};
pub use session::{Coordinator, GameClient, GameServer, MatchSummary, Outcome, Phase, SessionError};
pub use ship::*;
pub use transport::in_memory::{InMemoryConnection, InMemoryNetwork};
pub use transport::tcp::{TcpConnection, TcpNetwork};
pub use transport::{Connection, Listener, Network, Outbound};
