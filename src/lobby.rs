//! End-to-end flows used by the binaries: advertise and run a match as a
//! host, or discover a host and join it.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail};
use log::info;
use rand::rngs::SmallRng;

use crate::config::SessionConfig;
use crate::player::{AiPlayer, NodeReport, PlayerNode};
use crate::protocol::{ClientInfo, PlayerJoin, Role};
use crate::registration::RegistrationClient;
use crate::session::{GameClient, GameServer, MatchSummary};
use crate::transport::Network;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct HostOptions {
    pub name: String,
    pub registry: String,
    /// Address the game listener binds to.
    pub bind: String,
    /// Address and port advertised to players.
    pub address: String,
    pub port: u16,
    /// Players (host included) to wait for before starting.
    pub players: usize,
    /// Give up waiting for players after this long.
    pub lobby_timeout: Duration,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct JoinOptions {
    pub name: String,
    pub registry: String,
    pub address: String,
    pub port: u16,
    /// Join the host with this name instead of the first one listed.
    pub host: Option<String>,
    /// Give up looking for a host after this long.
    pub discovery_timeout: Duration,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HostReport {
    pub summary: MatchSummary,
    pub node: NodeReport,
}

/// Run a game server, advertise it, play on it and start the match once
/// enough players have joined.
pub fn host_match(net: &dyn Network, opts: &HostOptions, rng: &mut SmallRng) -> anyhow::Result<HostReport> {
    let listener = net.listen(&opts.bind)?;
    let server = GameServer::new(&opts.session);
    let coordinator = server.coordinator();
    server.spawn(listener);

    let registration = RegistrationClient::register(
        net.connect(&opts.registry)?,
        ClientInfo::new(opts.name.clone(), Role::Host, opts.address.clone(), opts.port),
    )?;

    let dial = format!("{}:{}", opts.address, opts.port);
    let client = GameClient::join(
        net.connect(&dial)?,
        PlayerJoin {
            id: 0,
            name: opts.name.clone(),
        },
    )?;

    let deadline = Instant::now() + opts.lobby_timeout;
    while coordinator.joined_count() < opts.players {
        if Instant::now() > deadline {
            bail!(
                "Only {} of {} players joined in time",
                coordinator.joined_count(),
                opts.players
            );
        }
        thread::sleep(POLL_INTERVAL);
    }
    coordinator.start_game()?;
    info!("{} started the match with {} players", opts.name, coordinator.joined_count());
    registration.disconnect()?;

    let node = PlayerNode::new(Box::new(AiPlayer::new()), client).run(rng)?;
    Ok(HostReport {
        summary: coordinator.summary(),
        node,
    })
}

/// Find a host through the registry, join it and play until the end.
pub fn join_match(net: &dyn Network, opts: &JoinOptions, rng: &mut SmallRng) -> anyhow::Result<NodeReport> {
    let registration = RegistrationClient::register(
        net.connect(&opts.registry)?,
        ClientInfo::new(opts.name.clone(), Role::Player, opts.address.clone(), opts.port),
    )?;

    let deadline = Instant::now() + opts.discovery_timeout;
    let host = loop {
        let hosts = registration.refresh_hosts()?;
        info!("{} sees {} host(s)", opts.name, hosts.len());
        let found = match &opts.host {
            Some(wanted) => hosts.into_iter().find(|h| &h.name == wanted),
            None => hosts.into_iter().next(),
        };
        if let Some(host) = found {
            break host;
        }
        if Instant::now() > deadline {
            return Err(anyhow!("No host found"));
        }
        thread::sleep(POLL_INTERVAL);
    };
    registration.disconnect()?;

    let dial = format!("{}:{}", host.address, host.port);
    info!("{} joining {} at {}", opts.name, host.name, dial);
    let client = GameClient::join(
        net.connect(&dial)?,
        PlayerJoin {
            id: 0,
            name: opts.name.clone(),
        },
    )?;
    PlayerNode::new(Box::new(AiPlayer::new()), client).run(rng)
}
