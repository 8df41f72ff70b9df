//! Registration server: accept loop plus one dialogue thread per client.

use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::protocol::{action_hint, clip_reason, ProtocolError, RegistrationReply, RegistrationRequest, Request};
use crate::registration::table::Registry;
use crate::transport::{Connection, Listener, Outbound};

/// Called with the slot id whenever a dialogue ends and frees its slot.
pub type TerminationHook = Arc<dyn Fn(usize) + Send + Sync>;

pub struct RegistrationServer {
    registry: Arc<Registry>,
    on_terminate: Option<TerminationHook>,
}

impl RegistrationServer {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            registry: Arc::new(Registry::new(config)),
            on_terminate: None,
        }
    }

    pub fn with_termination_hook(mut self, hook: TerminationHook) -> Self {
        self.on_terminate = Some(hook);
        self
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Accept connections until the listener fails.
    pub fn serve(&self, mut listener: Box<dyn Listener>) -> anyhow::Result<()> {
        info!("Registration server listening on {}", listener.local_addr());
        loop {
            let conn = listener.accept()?;
            let slot = self.registry.claim();
            debug!("Accepted {} into slot {:?}", conn.peer(), slot);
            let dialogue = Dialogue {
                registry: self.registry.clone(),
                on_terminate: self.on_terminate.clone(),
                slot,
                cursor: 0,
            };
            thread::spawn(move || dialogue.run(conn));
        }
    }

    /// Run [`RegistrationServer::serve`] on a background thread.
    pub fn spawn(self, listener: Box<dyn Listener>) -> thread::JoinHandle<anyhow::Result<()>> {
        thread::spawn(move || self.serve(listener))
    }
}

enum Step {
    Continue,
    Finish,
}

struct Dialogue {
    registry: Arc<Registry>,
    on_terminate: Option<TerminationHook>,
    slot: Option<usize>,
    /// Slot after the last host returned to this client.
    cursor: usize,
}

impl Dialogue {
    fn run(mut self, mut conn: Box<dyn Connection>) {
        let out = conn.outbound();
        let peer = conn.peer();
        loop {
            let line = match conn.recv() {
                Ok(line) => line,
                Err(e) => {
                    warn!("Registration dialogue with {} ended: {}", peer, e);
                    break;
                }
            };
            debug!("{} -> {}", peer, line);
            match self.handle_line(&out, &line) {
                Ok(Step::Continue) => {}
                Ok(Step::Finish) => break,
                Err(e) => {
                    warn!("Failed to reply to {}: {}", peer, e);
                    break;
                }
            }
        }
        self.terminate();
    }

    fn terminate(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.registry.release(slot);
            if let Some(hook) = &self.on_terminate {
                hook(slot);
            }
        }
    }

    fn handle_line(&mut self, out: &Outbound, line: &str) -> anyhow::Result<Step> {
        let req = match Request::decode(line) {
            Ok(req) => req,
            Err(e) => {
                reply(out, RegistrationReply::Error {
                    action: action_hint(line),
                    reason: clip_reason(e.to_string()),
                })?;
                return Ok(Step::Continue);
            }
        };
        let msg = match RegistrationRequest::from_request(&req) {
            Ok(msg) => msg,
            Err(e) => {
                let reason = match e {
                    ProtocolError::Unhandled(_) => "unhandled status code".to_string(),
                    other => clip_reason(other.to_string()),
                };
                reply(out, RegistrationReply::Error {
                    action: req.action(),
                    reason,
                })?;
                return Ok(Step::Continue);
            }
        };

        match msg {
            RegistrationRequest::Register(info) => {
                if self.slot.is_none() {
                    self.slot = self.registry.claim();
                }
                let Some(slot) = self.slot else {
                    warn!("Refusing {}: registration server full", info.name);
                    reply(out, RegistrationReply::Error {
                        action: req.action(),
                        reason: "registration server full".into(),
                    })?;
                    out.close();
                    return Ok(Step::Finish);
                };
                info!("Registered {} ({:?}) at {}:{} in slot {}", info.name, info.role, info.address, info.port, slot);
                self.registry.register(slot, info);
                reply(out, RegistrationReply::Ack)?;
                Ok(Step::Continue)
            }
            RegistrationRequest::Unregister => {
                self.terminate();
                reply(out, RegistrationReply::Ack)?;
                Ok(Step::Finish)
            }
            RegistrationRequest::ListNext => {
                match self.registry.next_host(self.cursor) {
                    Some((slot, host)) => {
                        self.cursor = slot + 1;
                        reply(out, RegistrationReply::Host(host))?;
                    }
                    None => {
                        self.cursor = 0;
                        reply(out, RegistrationReply::Error {
                            action: req.action(),
                            reason: String::new(),
                        })?;
                    }
                }
                Ok(Step::Continue)
            }
        }
    }
}

fn reply(out: &Outbound, reply: RegistrationReply) -> anyhow::Result<()> {
    out.send_response(&reply.to_response()?)
}
