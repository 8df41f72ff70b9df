use std::thread;
use std::time::Duration;

use armada::lobby::{host_match, join_match, HostOptions, JoinOptions};
use armada::{init_logging_with, InMemoryNetwork, Network, RegistrationServer, RegistryConfig, SessionConfig};
use rand::{rngs::SmallRng, SeedableRng};
use serde_json::json;

const REGISTRY: &str = "registry";

fn main() -> anyhow::Result<()> {
    init_logging_with(log::LevelFilter::Warn);
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <seed> <players>", args[0]);
        std::process::exit(1);
    }
    let seed: u64 = args[1].parse()?;
    let players: usize = args[2].parse()?;
    if players < 2 {
        anyhow::bail!("A match needs at least two players");
    }

    let net = InMemoryNetwork::new();
    RegistrationServer::new(&RegistryConfig::default()).spawn(net.listen(REGISTRY)?);

    let host_opts = HostOptions {
        name: "host".to_string(),
        registry: REGISTRY.to_string(),
        bind: "host-1:0".to_string(),
        address: "host-1".to_string(),
        port: 0,
        players,
        lobby_timeout: Duration::from_secs(30),
        session: SessionConfig {
            max_players: players,
            settle_delay: Duration::ZERO,
            ..SessionConfig::default()
        },
    };
    // The game listener must exist before any bot looks the host up.
    let host = {
        let net = net.clone();
        let mut rng = SmallRng::seed_from_u64(seed);
        thread::spawn(move || host_match(&net, &host_opts, &mut rng))
    };

    let bots: Vec<_> = (1..players)
        .map(|i| {
            let net = net.clone();
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(i as u64));
            let opts = JoinOptions {
                name: format!("bot-{}", i),
                registry: REGISTRY.to_string(),
                address: format!("bot-{}", i),
                port: 0,
                host: Some("host".to_string()),
                discovery_timeout: Duration::from_secs(30),
            };
            thread::spawn(move || join_match(&net, &opts, &mut rng))
        })
        .collect();

    let host_report = host
        .join()
        .map_err(|_| anyhow::anyhow!("Host thread panicked"))??;
    let mut nodes = vec![host_report.node.clone()];
    for bot in bots {
        nodes.push(bot.join().map_err(|_| anyhow::anyhow!("Bot thread panicked"))??);
    }

    let summary = &host_report.summary;
    let winner = summary
        .winner
        .and_then(|id| summary.teams.iter().find(|t| t.id == id))
        .map(|t| t.name.clone());
    let out = json!({
        "winner": winner,
        "shots": summary.shots,
        "teams": summary.teams,
        "players": nodes,
    });
    println!("{}", out);
    Ok(())
}
