//! Fixed-size table of registration slots.

use core::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::config::RegistryConfig;
use crate::protocol::{ClientInfo, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ClientStatus {
    Disconnected,
    /// A connection holds the slot but has not registered yet.
    Connecting,
    Connected,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClientStatus::Disconnected => "DISCONNECTED",
            ClientStatus::Connecting => "CONNECTING",
            ClientStatus::Connected => "CONNECTED",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub status: ClientStatus,
    pub info: Option<ClientInfo>,
}

impl ClientRecord {
    fn empty() -> Self {
        Self {
            status: ClientStatus::Disconnected,
            info: None,
        }
    }
}

/// One non-empty slot, as shown in the periodic table dump.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SlotSnapshot {
    pub slot: usize,
    pub status: ClientStatus,
    pub info: Option<ClientInfo>,
}

/// Directory of connected clients. Each slot sits behind its own lock and
/// no operation holds two slot locks at once.
pub struct Registry {
    slots: Vec<Mutex<ClientRecord>>,
}

impl Registry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            slots: (0..config.capacity).map(|_| Mutex::new(ClientRecord::empty())).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn lock(&self, slot: usize) -> Option<MutexGuard<'_, ClientRecord>> {
        // A panicked dialogue thread leaves a consistent record behind.
        self.slots
            .get(slot)
            .map(|m| m.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// Take the first free slot and mark it connecting.
    pub fn claim(&self) -> Option<usize> {
        (0..self.slots.len()).find(|&i| {
            let Some(mut rec) = self.lock(i) else { return false };
            if rec.status == ClientStatus::Disconnected {
                rec.status = ClientStatus::Connecting;
                true
            } else {
                false
            }
        })
    }

    /// Store the client's identity and mark the slot connected.
    pub fn register(&self, slot: usize, info: ClientInfo) {
        if let Some(mut rec) = self.lock(slot) {
            rec.status = ClientStatus::Connected;
            rec.info = Some(info);
        }
    }

    /// Free the slot for the next accepted connection.
    pub fn release(&self, slot: usize) {
        if let Some(mut rec) = self.lock(slot) {
            *rec = ClientRecord::empty();
        }
    }

    pub fn record(&self, slot: usize) -> Option<ClientRecord> {
        self.lock(slot).map(|rec| rec.clone())
    }

    /// First connected host at or after slot `from`.
    pub fn next_host(&self, from: usize) -> Option<(usize, ClientInfo)> {
        (from..self.slots.len()).find_map(|i| {
            let rec = self.lock(i)?;
            match (&rec.status, &rec.info) {
                (ClientStatus::Connected, Some(info)) if info.role == Role::Host => Some((i, info.clone())),
                _ => None,
            }
        })
    }

    /// Every slot not currently free.
    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        (0..self.slots.len())
            .filter_map(|i| {
                let rec = self.lock(i)?;
                (rec.status != ClientStatus::Disconnected).then(|| SlotSnapshot {
                    slot: i,
                    status: rec.status,
                    info: rec.info.clone(),
                })
            })
            .collect()
    }

    pub fn connected_count(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|s| s.status == ClientStatus::Connected)
            .count()
    }
}

/// Render a snapshot as a fixed-width table.
pub fn format_table(rows: &[SlotSnapshot]) -> String {
    let mut out = format!(
        "{:<10} {:<12} {:<6} {:<16} {:>5}\n",
        "NAME", "STATUS", "ROLE", "ADDRESS", "PORT"
    );
    for row in rows {
        let (name, role, address, port) = match &row.info {
            Some(info) => (
                info.name.as_str(),
                match info.role {
                    Role::Player => "PLAYER",
                    Role::Host => "HOST",
                },
                info.address.as_str(),
                info.port.to_string(),
            ),
            None => ("-", "-", "-", "-".to_string()),
        };
        out.push_str(&format!(
            "{:<10} {:<12} {:<6} {:<16} {:>5}\n",
            name,
            row.status.to_string(),
            role,
            address,
            port
        ));
    }
    out
}
