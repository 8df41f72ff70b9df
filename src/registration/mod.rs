//! Host discovery: clients register as players or hosts, players page
//! through the connected hosts.

pub mod client;
pub mod server;
pub mod table;

pub use client::RegistrationClient;
pub use server::{RegistrationServer, TerminationHook};
pub use table::{format_table, ClientRecord, ClientStatus, Registry, SlotSnapshot};
