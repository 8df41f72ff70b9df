use std::thread;
use std::time::Duration;

use armada::lobby::{host_match, join_match, HostOptions, JoinOptions};
use armada::registration::format_table;
use armada::{
    init_logging, Network, RegistrationServer, RegistryConfig, SessionConfig, TcpNetwork, DEFAULT_GAME_PORT,
    DEFAULT_REGISTRY_PORT, MAX_CLIENTS, MAX_PLAYERS,
};
use clap::Parser;
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Run the registration server that lets players find hosts.
    Registry {
        #[arg(long, default_value_t = format!("0.0.0.0:{}", DEFAULT_REGISTRY_PORT))]
        bind: String,
        #[arg(long, default_value_t = MAX_CLIENTS)]
        capacity: usize,
        /// Seconds between dumps of the client table (0 disables them).
        #[arg(long, default_value_t = 5)]
        table_interval: u64,
    },
    /// Host a match, play it with an automated player and start it once
    /// enough players joined.
    Host {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = format!("127.0.0.1:{}", DEFAULT_REGISTRY_PORT))]
        registry: String,
        /// Address advertised to players.
        #[arg(long, default_value = "127.0.0.1")]
        address: String,
        #[arg(long, default_value_t = DEFAULT_GAME_PORT)]
        port: u16,
        /// Players to wait for, the host included.
        #[arg(long, default_value_t = 2)]
        players: usize,
        #[arg(long, default_value_t = MAX_PLAYERS)]
        max_players: usize,
        /// Milliseconds between the last placement and the first battle turn.
        #[arg(long, default_value_t = 2000)]
        settle_ms: u64,
        #[arg(long, default_value_t = 300)]
        lobby_timeout_secs: u64,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Find a host through the registry and play on it automatically.
    Join {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = format!("127.0.0.1:{}", DEFAULT_REGISTRY_PORT))]
        registry: String,
        /// Join the host with this name instead of the first one listed.
        #[arg(long)]
        host: Option<String>,
        #[arg(long, default_value = "127.0.0.1")]
        address: String,
        #[arg(long, default_value_t = 30)]
        discovery_timeout_secs: u64,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => {
            info!("Using fixed seed: {} (game will be reproducible)", s);
            SmallRng::seed_from_u64(s)
        }
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let net = TcpNetwork;

    match cli.command {
        Commands::Registry {
            bind,
            capacity,
            table_interval,
        } => {
            let server = RegistrationServer::new(&RegistryConfig { capacity })
                .with_termination_hook(std::sync::Arc::new(|slot| info!("Slot {} released", slot)));
            if table_interval > 0 {
                let registry = server.registry();
                thread::spawn(move || loop {
                    thread::sleep(Duration::from_secs(table_interval));
                    let rows = registry.snapshot();
                    if !rows.is_empty() {
                        info!("Registered clients:\n{}", format_table(&rows));
                    }
                });
            }
            server.serve(net.listen(&bind)?)?;
        }
        Commands::Host {
            name,
            registry,
            address,
            port,
            players,
            max_players,
            settle_ms,
            lobby_timeout_secs,
            seed,
        } => {
            let mut rng = make_rng(seed);
            let opts = HostOptions {
                name,
                registry,
                bind: format!("0.0.0.0:{}", port),
                address,
                port,
                players,
                lobby_timeout: Duration::from_secs(lobby_timeout_secs),
                session: SessionConfig {
                    max_players,
                    settle_delay: Duration::from_millis(settle_ms),
                    ..SessionConfig::default()
                },
            };
            let report = host_match(&net, &opts, &mut rng)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Join {
            name,
            registry,
            host,
            address,
            discovery_timeout_secs,
            seed,
        } => {
            let mut rng = make_rng(seed);
            let opts = JoinOptions {
                name,
                registry,
                address,
                port: 0,
                host,
                discovery_timeout: Duration::from_secs(discovery_timeout_secs),
            };
            let report = join_match(&net, &opts, &mut rng)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
