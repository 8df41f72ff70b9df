use std::io::Write;
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use armada::protocol::{ClientInfo, PlayerJoin, Role};
use armada::transport::tcp::{TcpAcceptor, MAX_FRAME_SIZE};
use armada::transport::Sender;
use armada::{
    AiPlayer, Connection, GameClient, GameServer, Listener, Network, Outcome, PlayerNode, RegistrationClient, RegistrationServer,
    RegistryConfig, SessionConfig, TcpConnection, TcpNetwork,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn loopback() -> (Box<dyn Listener>, String) {
    let listener = TcpAcceptor::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr();
    (Box::new(listener), addr)
}

#[test]
fn lines_are_reassembled_across_writes() -> anyhow::Result<()> {
    let (mut listener, addr) = loopback();
    let writer = thread::spawn(move || -> anyhow::Result<()> {
        let mut raw = TcpStream::connect(&addr)?;
        raw.write_all(b"101:")?;
        raw.flush()?;
        thread::sleep(Duration::from_millis(20));
        raw.write_all(b"0:\r\n203:1,2,1,0,3\n")?;
        Ok(())
    });

    let mut conn = listener.accept()?;
    assert_eq!(conn.recv()?, "101:0:");
    assert_eq!(conn.recv()?, "203:1,2,1,0,3");
    writer.join().unwrap()?;
    assert!(conn.recv().is_err(), "peer closed after writing");
    Ok(())
}

#[test]
fn oversized_lines_are_refused() -> anyhow::Result<()> {
    let (mut listener, addr) = loopback();
    let client = thread::spawn(move || -> anyhow::Result<()> {
        let mut raw = TcpStream::connect(&addr)?;
        raw.write_all("9".repeat(MAX_FRAME_SIZE + 10).as_bytes())?;
        raw.write_all(b"\n")?;
        Ok(())
    });
    let mut conn = listener.accept()?;
    let err = conn.recv().unwrap_err().to_string();
    assert!(err.contains("Frame too large"), "{err}");
    client.join().unwrap()?;

    let out = conn.outbound();
    let err = out.send_line(&"x".repeat(MAX_FRAME_SIZE)).unwrap_err().to_string();
    assert!(err.contains("Frame too large"), "{err}");
    Ok(())
}

#[test]
fn close_ends_the_peer_dialogue() -> anyhow::Result<()> {
    let (mut listener, addr) = loopback();
    let mut client = TcpConnection::connect(&addr)?;
    let server = listener.accept()?;
    server.outbound().send_line("201:")?;
    server.outbound().close();

    assert_eq!(client.recv()?, "201:");
    assert!(client.recv().is_err());
    Ok(())
}

#[test]
fn registration_over_tcp() -> anyhow::Result<()> {
    let (listener, addr) = loopback();
    let server = RegistrationServer::new(&RegistryConfig { capacity: 4 });
    let registry = server.registry();
    server.spawn(listener);

    let net = TcpNetwork;
    let host = RegistrationClient::register(net.connect(&addr)?, ClientInfo::new("tcp-host", Role::Host, "127.0.0.1", 6000))?;
    let player = RegistrationClient::register(net.connect(&addr)?, ClientInfo::new("tcp-p", Role::Player, "127.0.0.1", 0))?;

    let hosts = player.refresh_hosts()?;
    assert_eq!(hosts, vec![ClientInfo::new("tcp-host", Role::Host, "127.0.0.1", 6000)]);
    host.disconnect()?;
    player.disconnect()?;
    assert_eq!(registry.connected_count(), 0);
    Ok(())
}

#[test]
fn bots_finish_a_match_over_tcp() -> anyhow::Result<()> {
    let (listener, addr) = loopback();
    let server = GameServer::new(&SessionConfig {
        settle_delay: Duration::from_millis(10),
        ..SessionConfig::default()
    });
    let coordinator = server.coordinator();
    server.spawn(listener);

    let nodes: Vec<_> = (0..2u64)
        .map(|i| {
            let addr = addr.clone();
            thread::spawn(move || {
                let client = GameClient::join(
                    TcpNetwork.connect(&addr)?,
                    PlayerJoin {
                        id: i as usize,
                        name: format!("tcp{i}"),
                    },
                )?;
                let mut rng = SmallRng::seed_from_u64(100 + i);
                PlayerNode::new(Box::new(AiPlayer::new()), client).run(&mut rng)
            })
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(5);
    while coordinator.joined_count() < 2 {
        assert!(Instant::now() < deadline, "players did not join in time");
        thread::sleep(Duration::from_millis(5));
    }
    coordinator.start_game()?;

    let mut outcomes = Vec::new();
    for node in nodes {
        outcomes.push(node.join().unwrap()?.outcome);
    }
    outcomes.sort_by_key(|o| *o == Some(Outcome::Victory));
    assert_eq!(outcomes, vec![Some(Outcome::Defeat), Some(Outcome::Victory)]);
    Ok(())
}
