//! Client side of a match.
//!
//! A dialogue thread receives every frame the game server pushes and
//! dispatches it by status code. The calling thread blocks on channels fed
//! by that dialogue; the only state shared between the two is the local
//! mirror of the team grid and the "awaiting my shot result" flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;

use anyhow::{anyhow, bail};
use log::{debug, info, warn};

use crate::common::ShotResult;
use crate::grid::{Grid, OpponentView};
use crate::protocol::{Action, GameEvent, GameRequest, Placement, PlayerJoin, Response, Seat, Shot, Turn, TurnPhase};
use crate::transport::{Connection, Outbound};

/// Result of a finished match, from this client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Outcome {
    Victory,
    Defeat,
}

/// Wake-ups delivered to the calling thread, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Started,
    /// A placement turn for this seat.
    PlacementTurn(Turn),
    /// A battle turn for either team.
    BattleTurn(Turn),
    GameOver,
    Closed,
}

#[derive(Default)]
struct Board {
    grid: Grid,
    view: OpponentView,
    pending: Option<Placement>,
    winner: Option<u8>,
}

struct Shared {
    board: Mutex<Board>,
    awaiting_shot: AtomicBool,
}

impl Shared {
    fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct GameClient {
    out: Outbound,
    seat: Seat,
    shared: Arc<Shared>,
    signals: mpsc::Receiver<Signal>,
    stashed: Option<Signal>,
    placement_acks: mpsc::Receiver<Result<(), String>>,
    shot_results: mpsc::Receiver<Result<ShotResult, String>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl GameClient {
    /// Announce `join` to the game server and wait for a seat.
    pub fn join(mut conn: Box<dyn Connection>, join: PlayerJoin) -> anyhow::Result<Self> {
        let out = conn.outbound();
        // A refused connection may be closed before the request lands; the
        // refusal is still waiting to be read.
        let sent = out.send_request(&GameRequest::Join(join.clone()).to_request()?);
        let seat = loop {
            let line = match conn.recv() {
                Ok(line) => line,
                Err(e) => return Err(sent.err().unwrap_or(e)),
            };
            match GameEvent::from_response(&Response::decode(&line)?)? {
                GameEvent::Joined(seat) => break seat,
                GameEvent::Error { reason, .. } => bail!("Join refused: {}", reason),
                other => debug!("Ignoring {:?} before seat assignment", other),
            }
        };
        info!("{} seated at {} in team {}", join.name, seat.player_index, seat.team_id);

        let shared = Arc::new(Shared {
            board: Mutex::new(Board::default()),
            awaiting_shot: AtomicBool::new(false),
        });
        let (signal_tx, signals) = mpsc::channel();
        let (ack_tx, placement_acks) = mpsc::channel();
        let (shot_tx, shot_results) = mpsc::channel();
        let dialogue = Dialogue {
            seat,
            shared: shared.clone(),
            signals: signal_tx,
            placement_acks: ack_tx,
            shot_results: shot_tx,
        };
        let thread = thread::spawn(move || dialogue.run(conn));

        Ok(Self {
            out,
            seat,
            shared,
            signals,
            stashed: None,
            placement_acks,
            shot_results,
            thread: Some(thread),
        })
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn team_id(&self) -> u8 {
        self.seat.team_id
    }

    /// The first seat of a team fires its shots.
    pub fn is_shooter(&self) -> bool {
        self.seat.player_index == usize::from(self.seat.team_id)
    }

    /// Copy of this team's grid as known locally.
    pub fn grid(&self) -> Grid {
        self.shared.board().grid.clone()
    }

    /// Copy of what this client has learned of the opposing grid.
    pub fn view(&self) -> OpponentView {
        self.shared.board().view
    }

    pub fn fleet_complete(&self) -> bool {
        self.shared.board().grid.placed_count() == crate::config::NUM_SHIPS
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.shared.board().winner.map(|winner| {
            if winner == self.seat.team_id {
                Outcome::Victory
            } else {
                Outcome::Defeat
            }
        })
    }

    pub fn is_finished(&self) -> bool {
        self.shared.board().winner.is_some()
    }

    fn next_signal(&mut self) -> anyhow::Result<Signal> {
        if let Some(signal) = self.stashed.take() {
            return Ok(signal);
        }
        self.signals.recv().map_err(|_| anyhow!("Game dialogue has ended"))
    }

    fn send(&self, request: GameRequest) -> anyhow::Result<()> {
        self.out.send_request(&request.to_request()?)
    }

    /// Block until the host starts the match.
    pub fn wait_for_start(&mut self) -> anyhow::Result<()> {
        loop {
            match self.next_signal()? {
                Signal::Started => return Ok(()),
                Signal::Closed => bail!("Connection closed before the match started"),
                other => debug!("Ignoring {:?} while waiting for start", other),
            }
        }
    }

    /// Block until this seat may place a ship. `None` once placement is over
    /// for this client: the battle started or the match ended.
    pub fn wait_for_placement_turn(&mut self) -> anyhow::Result<Option<Turn>> {
        loop {
            match self.next_signal()? {
                Signal::PlacementTurn(turn) => return Ok(Some(turn)),
                Signal::Started => {}
                Signal::Closed => bail!("Connection closed during placement"),
                other => {
                    self.stashed = Some(other);
                    return Ok(None);
                }
            }
        }
    }

    /// Submit a placement. Returns `false` when the server refused it.
    pub fn place_ship(&mut self, placement: Placement) -> anyhow::Result<bool> {
        self.shared.board().pending = Some(placement);
        self.send(GameRequest::Place(placement))?;
        match self.placement_acks.recv() {
            Ok(Ok(())) => Ok(true),
            Ok(Err(reason)) => {
                warn!("Placement of ship {} refused: {}", placement.id, reason);
                self.shared.board().pending = None;
                Ok(false)
            }
            Err(_) => Err(anyhow!("Connection closed while placing")),
        }
    }

    /// Block until this team holds the battle turn. `None` once the match
    /// is over.
    pub fn wait_for_battle_turn(&mut self) -> anyhow::Result<Option<Turn>> {
        loop {
            match self.next_signal()? {
                Signal::BattleTurn(turn) if turn.team_id == self.seat.team_id => return Ok(Some(turn)),
                Signal::GameOver => return Ok(None),
                Signal::Closed if self.is_finished() => return Ok(None),
                Signal::Closed => bail!("Connection closed during battle"),
                _ => {}
            }
        }
    }

    /// Fire at (`row`, `col`) and wait for the result.
    pub fn shoot(&mut self, row: usize, col: usize) -> anyhow::Result<ShotResult> {
        self.shared.awaiting_shot.store(true, Ordering::SeqCst);
        let sent = self.send(GameRequest::Shoot(Shot {
            team_id: self.seat.team_id,
            row,
            col,
        }));
        if let Err(e) = sent {
            self.shared.awaiting_shot.store(false, Ordering::SeqCst);
            return Err(e);
        }
        match self.shot_results.recv() {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(reason)) => bail!("Shot refused: {}", reason),
            Err(_) => Err(anyhow!("Connection closed while shooting")),
        }
    }

    /// Leave the match and wait for the dialogue thread to finish.
    pub fn disconnect(mut self) -> anyhow::Result<()> {
        let result = self.send(GameRequest::Leave);
        if result.is_err() {
            self.out.close();
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        result
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.out.close();
        }
    }
}

struct Dialogue {
    seat: Seat,
    shared: Arc<Shared>,
    signals: mpsc::Sender<Signal>,
    placement_acks: mpsc::Sender<Result<(), String>>,
    shot_results: mpsc::Sender<Result<ShotResult, String>>,
}

impl Dialogue {
    fn run(self, mut conn: Box<dyn Connection>) {
        loop {
            let line = match conn.recv() {
                Ok(line) => line,
                Err(e) => {
                    debug!("Game dialogue ended: {}", e);
                    break;
                }
            };
            let event = match Response::decode(&line).and_then(|resp| GameEvent::from_response(&resp)) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Ignoring frame {:?}: {}", line, e);
                    continue;
                }
            };
            debug!("seat {} <- {:?}", self.seat.player_index, event);
            if !self.dispatch(event) {
                break;
            }
        }
        let _ = self.signals.send(Signal::Closed);
    }

    /// Returns `false` once the dialogue should end.
    fn dispatch(&self, event: GameEvent) -> bool {
        match event {
            GameEvent::Joined(seat) => debug!("Repeated seat assignment {:?}", seat),
            GameEvent::Left => return false,
            GameEvent::PlacementConfirmed => {
                let mut board = self.shared.board();
                if let Some(p) = board.pending.take() {
                    if let Err(e) = board.grid.place_ship(p.id, p.length, p.row, p.col, p.orientation) {
                        warn!("Local grid rejected confirmed ship {}: {}", p.id, e);
                    }
                }
                drop(board);
                let _ = self.placement_acks.send(Ok(()));
            }
            GameEvent::TeammatePlacement(p) => {
                let mut board = self.shared.board();
                if let Err(e) = board.grid.place_ship(p.id, p.length, p.row, p.col, p.orientation) {
                    warn!("Local grid rejected teammate ship {}: {}", p.id, e);
                }
            }
            GameEvent::ShotResolved(result) => {
                if self.shared.awaiting_shot.swap(false, Ordering::SeqCst) {
                    self.shared.board().view.record(&result);
                    let _ = self.shot_results.send(Ok(result));
                } else {
                    self.shared.board().grid.mark_incoming(&result);
                }
            }
            GameEvent::NextTurn(turn) => match turn.phase {
                TurnPhase::Placement => {
                    if turn.team_id == self.seat.team_id && turn.player_id == self.seat.player_index {
                        let _ = self.signals.send(Signal::PlacementTurn(turn));
                    }
                }
                TurnPhase::Battle => {
                    let _ = self.signals.send(Signal::BattleTurn(turn));
                }
            },
            GameEvent::GameStarted => {
                let _ = self.signals.send(Signal::Started);
            }
            GameEvent::GameOver(winner) => {
                self.shared.board().winner = Some(winner.team_id);
                info!(
                    "Match over: team {} wins ({})",
                    winner.team_id,
                    if winner.team_id == self.seat.team_id { "victory" } else { "defeat" }
                );
                let _ = self.signals.send(Signal::GameOver);
            }
            GameEvent::Error { action, reason } => match action {
                Action::Place => {
                    self.shared.board().pending = None;
                    let _ = self.placement_acks.send(Err(reason));
                }
                Action::Shoot => {
                    self.shared.awaiting_shot.store(false, Ordering::SeqCst);
                    let _ = self.shot_results.send(Err(reason));
                }
                other => warn!("Server refused {}: {}", other, reason),
            },
        }
        true
    }
}
