//! Match state machine and the lock that serializes it.
//!
//! [`MatchState`] is pure: every operation returns the list of frames to
//! send. [`Coordinator`] owns the state behind one mutex and writes those
//! frames, one recipient after another, before releasing it.

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{ship_type, SessionConfig};
use crate::protocol::{Action, GameEvent, GameRequest, Placement, PlayerJoin, Seat, Shot, Turn, TurnPhase, Winner};
use crate::session::error::SessionError;
use crate::session::team::Team;
use crate::transport::Outbound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Phase {
    Placement,
    Battle,
    Finished,
}

/// Who a frame goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// One seat, whether or not it has left.
    Seat(usize),
    Team(u8),
    Teammates { team: u8, except: usize },
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send(Recipient, GameEvent),
    /// Pause before the next send.
    Settle,
}

fn send(to: Recipient, event: GameEvent) -> Effect {
    Effect::Send(to, event)
}

#[derive(Debug, Clone)]
struct SeatState {
    team: u8,
    name: Option<String>,
    connected: bool,
}

pub struct MatchState {
    teams: [Team; 2],
    phase: Phase,
    started: bool,
    placement_done: [bool; 2],
    winner: Option<u8>,
    turn_team: u8,
    seats: Vec<SeatState>,
    max_players: usize,
    min_players: usize,
    shots: usize,
}

impl MatchState {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            teams: [Team::new(0, "Team A"), Team::new(1, "Team B")],
            phase: Phase::Placement,
            started: false,
            placement_done: [false; 2],
            winner: None,
            turn_team: 0,
            seats: Vec::new(),
            max_players: config.max_players,
            min_players: config.min_players,
            shots: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn winner(&self) -> Option<u8> {
        self.winner
    }

    /// Team allowed to shoot during battle.
    pub fn turn_team(&self) -> u8 {
        self.turn_team
    }

    pub fn team(&self, id: u8) -> &Team {
        &self.teams[usize::from(id & 1)]
    }

    pub fn shots(&self) -> usize {
        self.shots
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Seats that announced a name and have not left.
    pub fn joined_count(&self) -> usize {
        self.seats.iter().filter(|s| s.connected && s.name.is_some()).count()
    }

    /// Give the next connection a seat. Seat `i` plays for team `i % 2`.
    pub fn admit(&mut self) -> Result<usize, SessionError> {
        if self.seats.len() >= self.max_players {
            return Err(SessionError::MatchFull(self.max_players));
        }
        let index = self.seats.len();
        self.seats.push(SeatState {
            team: (index % 2) as u8,
            name: None,
            connected: true,
        });
        Ok(index)
    }

    fn seat_team(&self, seat: usize) -> Result<u8, SessionError> {
        self.seats
            .get(seat)
            .map(|s| s.team)
            .ok_or(SessionError::UnknownSeat(seat))
    }

    /// Connected seats a frame for `to` reaches.
    pub fn recipients(&self, to: Recipient) -> Vec<usize> {
        if let Recipient::Seat(seat) = to {
            return vec![seat];
        }
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.connected)
            .filter(|(i, s)| match to {
                Recipient::Seat(_) | Recipient::All => true,
                Recipient::Team(team) => s.team == team,
                Recipient::Teammates { team, except } => s.team == team && *i != except,
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Apply one request from `seat`. Refusals become an `ERR` frame to the
    /// requester.
    pub fn handle(&mut self, seat: usize, request: GameRequest) -> Vec<Effect> {
        let action = request.action();
        let outcome = match request {
            GameRequest::Join(join) => self.join(seat, join),
            GameRequest::Leave => self.leave(seat),
            GameRequest::Place(placement) => self.place(seat, placement),
            GameRequest::Shoot(shot) => self.shoot(seat, shot),
        };
        outcome.unwrap_or_else(|e| {
            warn!("Seat {} {} refused: {}", seat, action, e);
            vec![send(Recipient::Seat(seat), GameEvent::error(action, e.to_string()))]
        })
    }

    fn join(&mut self, seat: usize, join: PlayerJoin) -> Result<Vec<Effect>, SessionError> {
        let team_id = self.seat_team(seat)?;
        if self.started {
            return Err(SessionError::OutOfPhase(Action::Connect));
        }
        self.teams[usize::from(team_id)].add_player(seat, join.name.clone());
        self.seats[seat].name = Some(join.name.clone());
        info!("{} joined {} in seat {}", join.name, self.team(team_id).name(), seat);
        Ok(vec![send(
            Recipient::Seat(seat),
            GameEvent::Joined(Seat {
                team_id,
                player_index: seat,
            }),
        )])
    }

    fn leave(&mut self, seat: usize) -> Result<Vec<Effect>, SessionError> {
        self.seat_team(seat)?;
        self.seats[seat].connected = false;
        info!("Seat {} left the match", seat);
        Ok(vec![send(Recipient::Seat(seat), GameEvent::Left)])
    }

    /// Open the placement phase: both teams receive their first placement
    /// turn.
    pub fn start(&mut self) -> Result<Vec<Effect>, SessionError> {
        if self.started {
            return Err(SessionError::OutOfPhase(Action::StartGame));
        }
        let joined = self.joined_count();
        let both_teams = (0..2u8).all(|team| {
            self.seats
                .iter()
                .any(|s| s.team == team && s.connected && s.name.is_some())
        });
        if joined < self.min_players.max(2) || !both_teams {
            return Err(SessionError::NotEnoughPlayers {
                needed: self.min_players.max(2),
                joined,
            });
        }
        self.started = true;
        self.phase = Phase::Placement;
        info!("Match started with {} players", joined);
        Ok(vec![
            send(Recipient::All, GameEvent::GameStarted),
            send(
                Recipient::Team(0),
                GameEvent::NextTurn(Turn {
                    team_id: 0,
                    player_id: 0,
                    phase: TurnPhase::Placement,
                }),
            ),
            send(
                Recipient::Team(1),
                GameEvent::NextTurn(Turn {
                    team_id: 1,
                    player_id: 1,
                    phase: TurnPhase::Placement,
                }),
            ),
        ])
    }

    /// Next connected seat of `team` after `after`, wrapping to the team's
    /// first seat.
    fn next_placer(&self, team: u8, after: usize) -> usize {
        let team_seats: Vec<usize> = (usize::from(team)..self.seats.len())
            .step_by(2)
            .filter(|&i| self.seats[i].connected)
            .collect();
        team_seats
            .iter()
            .copied()
            .find(|&i| i > after)
            .or_else(|| team_seats.first().copied())
            .unwrap_or(after)
    }

    fn place(&mut self, seat: usize, placement: Placement) -> Result<Vec<Effect>, SessionError> {
        let team_id = self.seat_team(seat)?;
        if !self.started || self.phase != Phase::Placement {
            return Err(SessionError::OutOfPhase(Action::Place));
        }
        let invalid = SessionError::InvalidShip {
            id: placement.id,
            length: placement.length,
        };
        if !ship_type(placement.id).is_some_and(|def| def.length() == placement.length) {
            return Err(invalid);
        }
        let team_idx = usize::from(team_id);
        if self.teams[team_idx].grid.ship(placement.id).is_some() {
            return Err(invalid);
        }
        self.teams[team_idx]
            .grid
            .place_ship(
                placement.id,
                placement.length,
                placement.row,
                placement.col,
                placement.orientation,
            )
            .map_err(SessionError::PlacementRejected)?;
        debug!("Seat {} placed ship {} for team {}", seat, placement.id, team_id);

        let mut effects = vec![
            send(Recipient::Seat(seat), GameEvent::PlacementConfirmed),
            send(
                Recipient::Teammates {
                    team: team_id,
                    except: seat,
                },
                GameEvent::TeammatePlacement(placement),
            ),
        ];

        if !self.teams[team_idx].placement_done() {
            let next = self.next_placer(team_id, seat);
            self.teams[team_idx].set_active_seat(next);
            effects.push(send(
                Recipient::Team(team_id),
                GameEvent::NextTurn(Turn {
                    team_id,
                    player_id: next,
                    phase: TurnPhase::Placement,
                }),
            ));
            return Ok(effects);
        }

        self.placement_done[team_idx] = true;
        // The team's first seat fires in battle.
        self.teams[team_idx].set_active_seat(usize::from(team_id));
        info!("{} finished placement", self.teams[team_idx].name());
        if self.placement_done.iter().all(|&done| done) {
            self.phase = Phase::Battle;
            self.turn_team = 0;
            info!("Both fleets placed, battle begins");
            effects.push(Effect::Settle);
            effects.push(send(
                Recipient::All,
                GameEvent::NextTurn(Turn {
                    team_id: 0,
                    player_id: 0,
                    phase: TurnPhase::Battle,
                }),
            ));
        }
        Ok(effects)
    }

    fn shoot(&mut self, seat: usize, shot: Shot) -> Result<Vec<Effect>, SessionError> {
        let team_id = self.seat_team(seat)?;
        if self.phase != Phase::Battle {
            return Err(SessionError::OutOfPhase(Action::Shoot));
        }
        if team_id != self.turn_team || shot.team_id != team_id {
            return Err(SessionError::OutOfTurn);
        }

        let [team_a, team_b] = &mut self.teams;
        let (attacker, defender) = if team_id == 0 {
            (team_a, team_b)
        } else {
            (team_b, team_a)
        };
        let result = defender.grid.resolve_shot(&mut attacker.view, shot.row, shot.col);
        let victory = defender.grid.is_victory();
        self.shots += 1;
        debug!("Team {} fired at ({}, {}): {:?}", team_id, shot.row, shot.col, result);

        let mut effects = vec![
            send(Recipient::Seat(seat), GameEvent::ShotResolved(result)),
            send(Recipient::Team(1 - team_id), GameEvent::ShotResolved(result)),
        ];
        if victory {
            self.phase = Phase::Finished;
            self.winner = Some(team_id);
            info!("Team {} wins after {} shots", team_id, self.shots);
            effects.push(send(Recipient::All, GameEvent::GameOver(Winner { team_id })));
        } else {
            self.turn_team = if result.hit { team_id } else { 1 - team_id };
            effects.push(send(
                Recipient::All,
                GameEvent::NextTurn(Turn {
                    team_id: self.turn_team,
                    player_id: 0,
                    phase: TurnPhase::Battle,
                }),
            ));
        }
        Ok(effects)
    }
}

/// Per-team figures for reports.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TeamSummary {
    pub id: u8,
    pub name: String,
    pub players: Vec<String>,
    pub ships_placed: usize,
    pub ships_sunk: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MatchSummary {
    pub phase: Phase,
    pub winner: Option<u8>,
    pub shots: usize,
    pub teams: Vec<TeamSummary>,
}

struct Inner {
    state: MatchState,
    outbounds: Vec<Option<Outbound>>,
}

/// Shared match of one hosted session.
pub struct Coordinator {
    inner: Mutex<Inner>,
    settle_delay: Duration,
}

impl Coordinator {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: MatchState::new(config),
                outbounds: Vec::new(),
            }),
            settle_delay: config.settle_delay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seat a new connection, or refuse it when the match is full.
    pub fn admit(&self, out: Outbound) -> Result<usize, SessionError> {
        let mut inner = self.lock();
        let seat = inner.state.admit()?;
        inner.outbounds.push(Some(out));
        Ok(seat)
    }

    /// Apply a request from `seat` and send every resulting frame. Returns
    /// `true` once the seat has left.
    pub fn handle(&self, seat: usize, request: GameRequest) -> bool {
        let leaving = request == GameRequest::Leave;
        let mut inner = self.lock();
        let effects = inner.state.handle(seat, request);
        self.dispatch(&mut inner, effects);
        if leaving {
            if let Some(slot) = inner.outbounds.get_mut(seat) {
                *slot = None;
            }
        }
        leaving
    }

    /// Host command: open the placement phase.
    pub fn start_game(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let effects = inner.state.start()?;
        self.dispatch(&mut inner, effects);
        Ok(())
    }

    fn dispatch(&self, inner: &mut Inner, effects: Vec<Effect>) {
        for effect in effects {
            let (to, event) = match effect {
                Effect::Settle => {
                    if !self.settle_delay.is_zero() {
                        thread::sleep(self.settle_delay);
                    }
                    continue;
                }
                Effect::Send(to, event) => (to, event),
            };
            let resp = match event.to_response() {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Dropping unencodable {:?}: {}", event, e);
                    continue;
                }
            };
            for seat in inner.state.recipients(to) {
                let Some(Some(out)) = inner.outbounds.get(seat) else {
                    continue;
                };
                debug!("seat {} <- {:?}", seat, event);
                if let Err(e) = out.send_response(&resp) {
                    warn!("Send to seat {} failed: {}", seat, e);
                    inner.outbounds[seat] = None;
                }
            }
        }
    }

    pub fn joined_count(&self) -> usize {
        self.lock().state.joined_count()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase()
    }

    pub fn winner(&self) -> Option<u8> {
        self.lock().state.winner()
    }

    pub fn summary(&self) -> MatchSummary {
        let inner = self.lock();
        let state = &inner.state;
        MatchSummary {
            phase: state.phase(),
            winner: state.winner(),
            shots: state.shots(),
            teams: (0..2u8)
                .map(|id| {
                    let team = state.team(id);
                    TeamSummary {
                        id,
                        name: team.name().to_string(),
                        players: team.players().into_iter().map(String::from).collect(),
                        ships_placed: team.grid.placed_count(),
                        ships_sunk: team.grid.sunk_count(),
                    }
                })
                .collect(),
        }
    }
}
