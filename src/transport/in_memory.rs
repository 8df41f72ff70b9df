use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};

use anyhow::anyhow;

use crate::transport::{Connection, Listener, Network, Outbound, Sender};

struct ChannelWriter {
    tx: Mutex<Option<mpsc::Sender<String>>>,
}

impl Sender for ChannelWriter {
    fn send_line(&self, line: &str) -> anyhow::Result<()> {
        let guard = self.tx.lock().map_err(|_| anyhow!("Writer lock poisoned"))?;
        match guard.as_ref() {
            Some(tx) => tx
                .send(line.to_string())
                .map_err(|_| anyhow!("Connection closed by peer")),
            None => Err(anyhow!("Connection closed")),
        }
    }

    fn close(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }
}

/// One end of an in-process connection. Lines travel over `mpsc` channels.
pub struct InMemoryConnection {
    rx: mpsc::Receiver<String>,
    writer: Arc<ChannelWriter>,
    peer: String,
}

impl InMemoryConnection {
    pub fn pair() -> (Self, Self) {
        Self::named_pair("a", "b")
    }

    fn named_pair(a: &str, b: &str) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel();
        let (tx_b, rx_b) = mpsc::channel();
        (
            Self {
                rx: rx_a,
                writer: Arc::new(ChannelWriter {
                    tx: Mutex::new(Some(tx_b)),
                }),
                peer: b.to_string(),
            },
            Self {
                rx: rx_b,
                writer: Arc::new(ChannelWriter {
                    tx: Mutex::new(Some(tx_a)),
                }),
                peer: a.to_string(),
            },
        )
    }
}

impl Connection for InMemoryConnection {
    fn recv(&mut self) -> anyhow::Result<String> {
        self.rx.recv().map_err(|_| anyhow!("Connection closed by peer"))
    }

    fn outbound(&self) -> Outbound {
        self.writer.clone()
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

pub struct InMemoryListener {
    rx: mpsc::Receiver<InMemoryConnection>,
    addr: String,
}

impl Listener for InMemoryListener {
    fn accept(&mut self) -> anyhow::Result<Box<dyn Connection>> {
        let conn = self.rx.recv().map_err(|_| anyhow!("Listener {} closed", self.addr))?;
        Ok(Box::new(conn))
    }

    fn local_addr(&self) -> String {
        self.addr.clone()
    }
}

/// In-process [`Network`]: listeners are registered under a name and
/// `connect` hands the server end to the matching listener.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    listeners: Arc<Mutex<HashMap<String, mpsc::Sender<InMemoryConnection>>>>,
    next_client: Arc<Mutex<usize>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Network for InMemoryNetwork {
    fn connect(&self, addr: &str) -> anyhow::Result<Box<dyn Connection>> {
        let client_name = {
            let mut next = self.next_client.lock().map_err(|_| anyhow!("Network lock poisoned"))?;
            *next += 1;
            format!("client-{}", *next)
        };
        let listeners = self.listeners.lock().map_err(|_| anyhow!("Network lock poisoned"))?;
        let accept_tx = listeners
            .get(addr)
            .ok_or_else(|| anyhow!("Connection refused: nothing listening on {}", addr))?;
        let (client, server) = InMemoryConnection::named_pair(&client_name, addr);
        accept_tx
            .send(server)
            .map_err(|_| anyhow!("Connection refused: listener {} closed", addr))?;
        Ok(Box::new(client))
    }

    fn listen(&self, addr: &str) -> anyhow::Result<Box<dyn Listener>> {
        let mut listeners = self.listeners.lock().map_err(|_| anyhow!("Network lock poisoned"))?;
        let (tx, rx) = mpsc::channel();
        listeners.insert(addr.to_string(), tx);
        Ok(Box::new(InMemoryListener {
            rx,
            addr: addr.to_string(),
        }))
    }
}
