use log::{debug, info};
use rand::rngs::SmallRng;

use crate::player::Player;
use crate::session::{GameClient, Outcome};

/// What one seat did during a match.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeReport {
    pub team_id: u8,
    pub seat: usize,
    pub ships_placed: usize,
    pub shots: usize,
    pub hits: usize,
    pub outcome: Option<Outcome>,
}

/// Runs a [`Player`] through a whole match on a joined [`GameClient`].
pub struct PlayerNode {
    player: Box<dyn Player>,
    client: GameClient,
    ships_placed: usize,
    shots: usize,
    hits: usize,
}

impl PlayerNode {
    pub fn new(player: Box<dyn Player>, client: GameClient) -> Self {
        Self {
            player,
            client,
            ships_placed: 0,
            shots: 0,
            hits: 0,
        }
    }

    pub fn client(&self) -> &GameClient {
        &self.client
    }

    /// Play from the host's start signal until the match ends, then leave.
    pub fn run(mut self, rng: &mut SmallRng) -> anyhow::Result<NodeReport> {
        self.client.wait_for_start()?;
        self.place_fleet(rng)?;
        self.battle(rng)?;

        let seat = self.client.seat();
        let report = NodeReport {
            team_id: seat.team_id,
            seat: seat.player_index,
            ships_placed: self.ships_placed,
            shots: self.shots,
            hits: self.hits,
            outcome: self.client.outcome(),
        };
        info!("Seat {} finished: {:?}", seat.player_index, report.outcome);
        self.client.disconnect()?;
        Ok(report)
    }

    fn place_fleet(&mut self, rng: &mut SmallRng) -> anyhow::Result<()> {
        while !self.client.fleet_complete() {
            if self.client.wait_for_placement_turn()?.is_none() {
                break;
            }
            // A teammate may have finished the fleet since this turn was issued.
            loop {
                let grid = self.client.grid();
                let Some(placement) = self.player.next_placement(rng, &grid)? else {
                    break;
                };
                if self.client.place_ship(placement)? {
                    self.ships_placed += 1;
                    break;
                }
            }
        }
        debug!("Seat {} done placing", self.client.seat().player_index);
        Ok(())
    }

    fn battle(&mut self, rng: &mut SmallRng) -> anyhow::Result<()> {
        while self.client.wait_for_battle_turn()?.is_some() {
            if !self.client.is_shooter() {
                continue;
            }
            let view = self.client.view();
            let (row, col) = self.player.select_target(rng, &view);
            let result = self.client.shoot(row, col)?;
            self.shots += 1;
            if result.hit {
                self.hits += 1;
            }
            self.player.handle_shot_result(&result);
        }
        Ok(())
    }
}
