//! Automated players driving a [`GameClient`](crate::session::GameClient).
//!
//! A [`Player`] decides where ships go and where to fire; a [`PlayerNode`]
//! runs it against a live match.

use rand::rngs::SmallRng;

use crate::common::{GridError, ShotResult};
use crate::grid::{Grid, OpponentView};
use crate::protocol::Placement;

/// Strategy behind an automated seat.
pub trait Player: Send {
    /// Choose a position for the next fleet ship missing from `grid`, or
    /// `None` when the fleet is complete.
    fn next_placement(&mut self, rng: &mut SmallRng, grid: &Grid) -> Result<Option<Placement>, GridError>;

    /// Choose the next cell to fire at.
    fn select_target(&mut self, rng: &mut SmallRng, view: &OpponentView) -> (usize, usize);

    /// Inform the player of the result of its last shot.
    fn handle_shot_result(&mut self, _result: &ShotResult) {}
}

pub mod ai;
pub mod node;

pub use ai::AiPlayer;
pub use node::{NodeReport, PlayerNode};
