//! Game server: seats connections at accept time and runs one dialogue
//! thread per seat.

use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::config::SessionConfig;
use crate::protocol::{action_hint, Action, GameEvent, GameRequest, ProtocolError, Request};
use crate::session::coordinator::Coordinator;
use crate::transport::{Connection, Listener, Outbound};

pub struct GameServer {
    coordinator: Arc<Coordinator>,
}

impl GameServer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            coordinator: Arc::new(Coordinator::new(config)),
        }
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        self.coordinator.clone()
    }

    /// Accept players until the listener fails.
    pub fn serve(&self, mut listener: Box<dyn Listener>) -> anyhow::Result<()> {
        info!("Game server listening on {}", listener.local_addr());
        loop {
            let conn = listener.accept()?;
            let out = conn.outbound();
            match self.coordinator.admit(out.clone()) {
                Ok(seat) => {
                    debug!("Seated {} at {}", conn.peer(), seat);
                    let coordinator = self.coordinator.clone();
                    thread::spawn(move || run_dialogue(coordinator, seat, conn));
                }
                Err(e) => {
                    warn!("Refusing {}: {}", conn.peer(), e);
                    if let Err(send_err) = reply(&out, GameEvent::error(Action::Connect, e.to_string())) {
                        debug!("Could not notify refused peer: {}", send_err);
                    }
                    out.close();
                }
            }
        }
    }

    pub fn spawn(self, listener: Box<dyn Listener>) -> thread::JoinHandle<anyhow::Result<()>> {
        thread::spawn(move || self.serve(listener))
    }
}

fn reply(out: &Outbound, event: GameEvent) -> anyhow::Result<()> {
    out.send_response(&event.to_response()?)
}

fn run_dialogue(coordinator: Arc<Coordinator>, seat: usize, mut conn: Box<dyn Connection>) {
    let out = conn.outbound();
    loop {
        let line = match conn.recv() {
            Ok(line) => line,
            Err(e) => {
                // Teammates are not told about a dropped seat.
                warn!("Seat {} connection lost: {}", seat, e);
                break;
            }
        };
        debug!("seat {} -> {}", seat, line);

        let request = Request::decode(&line).map_err(|e| (action_hint(&line), e));
        let request = request.and_then(|req| GameRequest::from_request(&req).map_err(|e| (req.action(), e)));
        let request = match request {
            Ok(request) => request,
            Err((action, e)) => {
                let reason = match e {
                    ProtocolError::Unhandled(_) => "unhandled request".to_string(),
                    other => other.to_string(),
                };
                if let Err(e) = reply(&out, GameEvent::error(action, reason)) {
                    warn!("Seat {} reply failed: {}", seat, e);
                    break;
                }
                continue;
            }
        };

        if coordinator.handle(seat, request) {
            break;
        }
    }
    out.close();
}
