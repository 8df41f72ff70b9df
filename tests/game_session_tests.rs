use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use armada::protocol::{GameEvent, GameRequest, PlayerJoin, Response, Seat};
use armada::session::Coordinator;
use armada::transport::Sender;
use armada::{
    AiPlayer, Connection, GameClient, GameServer, InMemoryNetwork, Network, NodeReport, Outcome, Phase, PlayerNode,
    SessionConfig,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

const ADDR: &str = "game";

fn config(max_players: usize) -> SessionConfig {
    SessionConfig {
        max_players,
        min_players: 2,
        settle_delay: Duration::ZERO,
    }
}

fn serve(max_players: usize) -> (InMemoryNetwork, Arc<Coordinator>) {
    let net = InMemoryNetwork::new();
    let server = GameServer::new(&config(max_players));
    let coordinator = server.coordinator();
    server.spawn(net.listen(ADDR).unwrap());
    (net, coordinator)
}

fn wait_for_players(coordinator: &Coordinator, players: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while coordinator.joined_count() < players {
        assert!(Instant::now() < deadline, "players did not join in time");
        thread::sleep(Duration::from_millis(5));
    }
}

fn play_match(players: usize, seed: u64) -> (Arc<Coordinator>, Vec<NodeReport>) {
    let (net, coordinator) = serve(players);
    let nodes: Vec<_> = (0..players)
        .map(|i| {
            let net = net.clone();
            thread::spawn(move || {
                let client = GameClient::join(
                    net.connect(ADDR)?,
                    PlayerJoin {
                        id: i,
                        name: format!("bot{i}"),
                    },
                )?;
                let mut rng = SmallRng::seed_from_u64(seed + i as u64);
                PlayerNode::new(Box::new(AiPlayer::new()), client).run(&mut rng)
            })
        })
        .collect();

    wait_for_players(&coordinator, players);
    coordinator.start_game().unwrap();

    let reports = nodes
        .into_iter()
        .map(|h| h.join().map_err(|_| anyhow!("node panicked")).and_then(|r| r))
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    (coordinator, reports)
}

#[test]
fn two_bots_play_to_the_end() {
    let (coordinator, reports) = play_match(2, 11);
    assert_eq!(coordinator.phase(), Phase::Finished);
    let winner = coordinator.winner().unwrap();

    for report in &reports {
        assert_eq!(report.ships_placed, 5);
        let expected = if report.team_id == winner {
            Outcome::Victory
        } else {
            Outcome::Defeat
        };
        assert_eq!(report.outcome, Some(expected));
    }
    let winning = reports.iter().find(|r| r.team_id == winner).unwrap();
    assert_eq!(winning.hits, 17, "the winner hit every ship segment");

    let summary = coordinator.summary();
    assert_eq!(summary.winner, Some(winner));
    assert_eq!(summary.teams[usize::from(1 - winner)].ships_sunk, 5);
    assert!(summary.teams.iter().all(|t| t.ships_placed == 5));
    assert_eq!(summary.shots, reports.iter().map(|r| r.shots).sum::<usize>());
}

#[test]
fn teams_of_two_share_placement_and_outcome() {
    let (coordinator, reports) = play_match(4, 23);
    let winner = coordinator.winner().unwrap();

    for team in 0..2u8 {
        let members: Vec<&NodeReport> = reports.iter().filter(|r| r.team_id == team).collect();
        assert_eq!(members.len(), 2);
        assert_eq!(members.iter().map(|r| r.ships_placed).sum::<usize>(), 5);
        for member in &members {
            assert_eq!(member.outcome == Some(Outcome::Victory), team == winner);
        }
        // Only the team's first seat fires.
        let shooters: Vec<usize> = members.iter().filter(|r| r.shots > 0).map(|r| r.seat).collect();
        assert!(shooters.iter().all(|&seat| seat == usize::from(team)));
    }
}

#[test]
fn full_match_refuses_extra_connections() {
    let (net, _coordinator) = serve(2);
    let _a = GameClient::join(net.connect(ADDR).unwrap(), PlayerJoin { id: 0, name: "a".into() }).unwrap();
    let _b = GameClient::join(net.connect(ADDR).unwrap(), PlayerJoin { id: 1, name: "b".into() }).unwrap();

    let refused = GameClient::join(net.connect(ADDR).unwrap(), PlayerJoin { id: 2, name: "c".into() });
    let err = refused.err().unwrap().to_string();
    assert!(err.contains("match is full"), "{err}");
}

fn exchange(conn: &mut Box<dyn Connection>, line: &str) -> String {
    conn.outbound().send_line(line).unwrap();
    conn.recv().unwrap()
}

#[test]
fn raw_dialogue_reports_bad_frames() {
    let (net, coordinator) = serve(2);
    let mut conn = net.connect(ADDR).unwrap();

    assert_eq!(exchange(&mut conn, "101:1:0,alice"), "201:0,0");
    assert!(exchange(&mut conn, "nonsense").starts_with("300:malformed frame"));
    assert_eq!(exchange(&mut conn, "104:1:0,0,0"), "304:unhandled request");
    assert!(exchange(&mut conn, "103:1:0,1").starts_with("303:malformed payload"));
    assert!(exchange(&mut conn, "102:1:2,5,0,0,0").starts_with("302:"), "placement before start");
    assert_eq!(coordinator.phase(), Phase::Placement);

    assert_eq!(exchange(&mut conn, "101:2:"), "201:");
    assert!(conn.recv().is_err(), "server closes after leaving");
    assert_eq!(coordinator.joined_count(), 0);
}

#[test]
fn start_is_refused_without_an_opponent() {
    let (net, coordinator) = serve(4);
    let _a = GameClient::join(net.connect(ADDR).unwrap(), PlayerJoin { id: 0, name: "a".into() }).unwrap();
    let _c = GameClient::join(net.connect(ADDR).unwrap(), PlayerJoin { id: 0, name: "c".into() }).unwrap();
    assert!(coordinator.start_game().is_ok(), "seats 0 and 1 sit on opposite teams");

    let (net, coordinator) = serve(4);
    let _solo = GameClient::join(net.connect(ADDR).unwrap(), PlayerJoin { id: 0, name: "solo".into() }).unwrap();
    assert!(coordinator.start_game().is_err());
}

/// Outbound that records lines, or fails every write.
struct Recorder {
    lines: Mutex<Vec<String>>,
    broken: bool,
}

impl Recorder {
    fn new(broken: bool) -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(Vec::new()),
            broken,
        })
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Sender for Recorder {
    fn send_line(&self, line: &str) -> anyhow::Result<()> {
        if self.broken {
            return Err(anyhow!("peer gone"));
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn close(&self) {}
}

#[test]
fn broadcasts_skip_dead_outbounds() {
    let coordinator = Coordinator::new(&config(3));
    let healthy = Recorder::new(false);
    let dead = Recorder::new(true);
    let third = Recorder::new(false);
    let seats = [
        coordinator.admit(healthy.clone()).unwrap(),
        coordinator.admit(dead.clone()).unwrap(),
        coordinator.admit(third.clone()).unwrap(),
    ];
    for (seat, name) in seats.iter().zip(["a", "b", "c"]) {
        assert!(!coordinator.handle(*seat, GameRequest::Join(PlayerJoin { id: *seat, name: name.into() })));
    }
    coordinator.start_game().unwrap();

    let first = healthy.lines();
    assert_eq!(first[0], "201:0,0");
    assert_eq!(first[1], "206:");
    assert_eq!(first[2], "204:0,0,0");
    assert!(third.lines().contains(&"206:".to_string()));
    assert!(dead.lines().is_empty());

    let resp = Response::decode(&third.lines()[0]).unwrap();
    assert_eq!(
        GameEvent::from_response(&resp).unwrap(),
        GameEvent::Joined(Seat {
            team_id: 0,
            player_index: 2,
        })
    );
    assert!(coordinator.handle(2, GameRequest::Leave));
    assert_eq!(third.lines().last().map(String::as_str), Some("201:"));
}

#[test]
fn client_places_ships_on_its_turns() -> anyhow::Result<()> {
    use armada::protocol::{Placement, TurnPhase};
    use armada::Orientation;

    let (net, coordinator) = serve(2);
    let mut a = GameClient::join(net.connect(ADDR)?, PlayerJoin { id: 0, name: "a".into() })?;
    let _b = GameClient::join(net.connect(ADDR)?, PlayerJoin { id: 1, name: "b".into() })?;
    assert_eq!(a.seat(), Seat { team_id: 0, player_index: 0 });
    assert!(a.is_shooter());
    coordinator.start_game()?;

    a.wait_for_start()?;
    let turn = a.wait_for_placement_turn()?.unwrap();
    assert_eq!((turn.team_id, turn.player_id, turn.phase), (0, 0, TurnPhase::Placement));

    let carrier = Placement {
        id: 2,
        length: 5,
        row: 0,
        col: 0,
        orientation: Orientation::Horizontal,
    };
    assert!(a.place_ship(carrier)?);
    assert_eq!(a.grid().cell(0, 4), Some(2));

    a.wait_for_placement_turn()?.unwrap();
    let overlapping = Placement {
        id: 3,
        length: 4,
        row: 0,
        col: 2,
        orientation: Orientation::Vertical,
    };
    assert!(!a.place_ship(overlapping)?);
    assert_eq!(a.grid().placed_count(), 1);
    assert!(!a.fleet_complete());
    assert_eq!(a.outcome(), None);
    Ok(())
}
