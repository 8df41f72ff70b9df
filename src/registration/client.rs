//! Client side of the registration dialogue.
//!
//! The connection is owned by a dialogue thread. Callers talk to it through
//! a command channel; every command carries its own reply channel.

use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, bail};
use log::{debug, info, warn};

use crate::config::MAX_HOSTS_PER_PAGE;
use crate::protocol::{ClientInfo, RegistrationReply, RegistrationRequest, Response};
use crate::transport::Connection;

enum Command {
    ListHosts(mpsc::Sender<anyhow::Result<Vec<ClientInfo>>>),
    Disconnect(mpsc::Sender<anyhow::Result<()>>),
}

fn exchange(conn: &mut dyn Connection, req: RegistrationRequest) -> anyhow::Result<RegistrationReply> {
    conn.outbound().send_request(&req.to_request()?)?;
    let line = conn.recv()?;
    debug!("registration <- {}", line);
    Ok(RegistrationReply::from_response(&Response::decode(&line)?)?)
}

pub struct RegistrationClient {
    commands: mpsc::Sender<Command>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RegistrationClient {
    /// Register `info` and wait for the server's acknowledgement.
    pub fn register(mut conn: Box<dyn Connection>, info: ClientInfo) -> anyhow::Result<Self> {
        let name = info.name.clone();
        match exchange(conn.as_mut(), RegistrationRequest::Register(info))? {
            RegistrationReply::Ack => info!("Registered as {}", name),
            RegistrationReply::Error { reason, .. } => bail!("Registration refused: {}", reason),
            other => bail!("Unexpected registration reply: {:?}", other),
        }
        let (commands, rx) = mpsc::channel();
        let thread = thread::spawn(move || dialogue(conn, rx));
        Ok(Self {
            commands,
            thread: Some(thread),
        })
    }

    fn call<T>(&self, make: impl FnOnce(mpsc::Sender<anyhow::Result<T>>) -> Command) -> anyhow::Result<T> {
        let (tx, rx) = mpsc::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| anyhow!("Registration dialogue has ended"))?;
        rx.recv().map_err(|_| anyhow!("Registration dialogue has ended"))?
    }

    /// Fetch up to one page of hosts. Successive calls continue where the
    /// previous page stopped and wrap to the start after the last host.
    pub fn refresh_hosts(&self) -> anyhow::Result<Vec<ClientInfo>> {
        self.call(Command::ListHosts)
    }

    /// Unregister and wait for the acknowledgement.
    pub fn disconnect(mut self) -> anyhow::Result<()> {
        let result = self.call(Command::Disconnect);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        result
    }
}

fn dialogue(mut conn: Box<dyn Connection>, commands: mpsc::Receiver<Command>) {
    while let Ok(cmd) = commands.recv() {
        match cmd {
            Command::ListHosts(reply) => {
                let hosts = list_hosts(conn.as_mut());
                let failed = hosts.is_err();
                let _ = reply.send(hosts);
                if failed {
                    break;
                }
            }
            Command::Disconnect(reply) => {
                let result = match exchange(conn.as_mut(), RegistrationRequest::Unregister) {
                    Ok(RegistrationReply::Ack) => Ok(()),
                    Ok(other) => Err(anyhow!("Unexpected reply to unregister: {:?}", other)),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
                break;
            }
        }
    }
    conn.outbound().close();
}

fn list_hosts(conn: &mut dyn Connection) -> anyhow::Result<Vec<ClientInfo>> {
    let mut hosts = Vec::new();
    for _ in 0..MAX_HOSTS_PER_PAGE {
        match exchange(conn, RegistrationRequest::ListNext)? {
            RegistrationReply::Host(info) => hosts.push(info),
            RegistrationReply::Error { reason, .. } => {
                if !reason.is_empty() {
                    warn!("Host listing stopped: {}", reason);
                }
                break;
            }
            RegistrationReply::Ack => bail!("Unexpected empty acknowledgement while listing hosts"),
        }
    }
    Ok(hosts)
}

impl Drop for RegistrationClient {
    fn drop(&mut self) {
        // Closing the command channel ends the dialogue thread.
        let (tx, _) = mpsc::channel();
        drop(std::mem::replace(&mut self.commands, tx));
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
