use std::sync::{mpsc, Arc};
use std::time::Duration;

use armada::protocol::{ClientInfo, Role};
use armada::registration::{ClientStatus, RegistrationClient, RegistrationServer, Registry};
use armada::transport::Sender;
use armada::{Connection, InMemoryNetwork, Network, RegistryConfig};

const ADDR: &str = "registry";

fn start(capacity: usize) -> (InMemoryNetwork, Arc<Registry>) {
    let net = InMemoryNetwork::new();
    let server = RegistrationServer::new(&RegistryConfig { capacity });
    let registry = server.registry();
    server.spawn(net.listen(ADDR).unwrap());
    (net, registry)
}

fn exchange(conn: &mut Box<dyn Connection>, line: &str) -> String {
    conn.outbound().send_line(line).unwrap();
    conn.recv().unwrap()
}

fn register_raw(net: &InMemoryNetwork, name: &str, role: u8) -> Box<dyn Connection> {
    let mut conn = net.connect(ADDR).unwrap();
    let reply = exchange(&mut conn, &format!("101:1:{name},{role},10.0.0.1,50001"));
    assert_eq!(reply, "201:");
    conn
}

#[test]
fn host_listing_pages_and_wraps() {
    let (net, _) = start(8);
    let _h1 = register_raw(&net, "h1", 1);
    let _h2 = register_raw(&net, "h2", 1);
    let _h3 = register_raw(&net, "h3", 1);
    let mut player = register_raw(&net, "p", 0);

    assert_eq!(exchange(&mut player, "101:0:"), "201:h1,1,10.0.0.1,50001");
    assert_eq!(exchange(&mut player, "101:0:"), "201:h2,1,10.0.0.1,50001");
    assert_eq!(exchange(&mut player, "101:0:"), "201:h3,1,10.0.0.1,50001");
    assert_eq!(exchange(&mut player, "101:0:"), "301:");
    assert_eq!(exchange(&mut player, "101:0:"), "201:h1,1,10.0.0.1,50001");
}

#[test]
fn full_registry_refuses_and_closes() {
    let (net, registry) = start(2);
    let mut first = register_raw(&net, "a", 0);
    let _second = register_raw(&net, "b", 1);

    let mut third = net.connect(ADDR).unwrap();
    let reply = exchange(&mut third, "101:1:c,0,10.0.0.1,1");
    assert_eq!(reply, "301:registration server full");
    assert!(third.recv().is_err(), "refused connection should be closed");
    assert_eq!(registry.connected_count(), 2);

    // Unregistering frees the slot for the next client.
    assert_eq!(exchange(&mut first, "101:2:"), "201:");
    let _fourth = register_raw(&net, "d", 0);
    assert_eq!(registry.connected_count(), 2);
    let names: Vec<String> = registry
        .snapshot()
        .into_iter()
        .filter_map(|row| row.info.map(|i| i.name))
        .collect();
    assert_eq!(names, vec!["d".to_string(), "b".to_string()]);
}

#[test]
fn bad_frames_get_error_replies_and_dialogue_continues() {
    let (net, _) = start(4);
    let mut conn = net.connect(ADDR).unwrap();

    assert_eq!(exchange(&mut conn, "199:1:x"), "300:unhandled status code");
    assert_eq!(exchange(&mut conn, "103:1:0,1,1"), "303:unhandled status code");
    assert!(exchange(&mut conn, "garbage").starts_with("300:malformed frame"));
    assert!(exchange(&mut conn, "101:1:only,two").starts_with("301:malformed payload"));

    assert_eq!(exchange(&mut conn, "101:1:late,0,10.0.0.9,7"), "201:");
}

#[test]
fn colons_inside_fields_are_refused_and_listing_survives() {
    let (net, registry) = start(8);
    let _h1 = register_raw(&net, "h1", 1);

    let mut bad = net.connect(ADDR).unwrap();
    let reply = exchange(&mut bad, "101:1:h:1,1,10.0.0.1,50001");
    assert!(reply.starts_with("301:invalid field"), "{reply}");
    let reply = exchange(&mut bad, "101:1:h2,1,::1,50001");
    assert!(reply.starts_with("301:invalid field"), "{reply}");
    assert_eq!(registry.connected_count(), 1);

    let mut player = register_raw(&net, "p", 0);
    assert_eq!(exchange(&mut player, "101:0:"), "201:h1,1,10.0.0.1,50001");
    assert_eq!(exchange(&mut player, "101:0:"), "301:");
    assert_eq!(exchange(&mut player, "101:0:"), "201:h1,1,10.0.0.1,50001");
}

#[test]
fn dropped_connection_frees_its_slot() {
    let net = InMemoryNetwork::new();
    let (tx, rx) = mpsc::channel();
    let server = RegistrationServer::new(&RegistryConfig { capacity: 2 }).with_termination_hook(Arc::new(
        move |slot| {
            let _ = tx.send(slot);
        },
    ));
    let registry = server.registry();
    server.spawn(net.listen(ADDR).unwrap());

    let conn = register_raw(&net, "gone", 1);
    assert_eq!(registry.record(0).unwrap().status, ClientStatus::Connected);
    drop(conn);

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
    assert_eq!(registry.record(0).unwrap().status, ClientStatus::Disconnected);
}

#[test]
fn client_lists_hosts_and_unregisters() {
    let (net, registry) = start(16);
    let hosts: Vec<RegistrationClient> = (0..3)
        .map(|i| {
            RegistrationClient::register(
                net.connect(ADDR).unwrap(),
                ClientInfo::new(format!("host{i}"), Role::Host, "10.0.0.2", 50001 + i),
            )
            .unwrap()
        })
        .collect();
    let player = RegistrationClient::register(
        net.connect(ADDR).unwrap(),
        ClientInfo::new("alice", Role::Player, "10.0.0.3", 0),
    )
    .unwrap();

    let page = player.refresh_hosts().unwrap();
    let names: Vec<&str> = page.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, ["host0", "host1", "host2"]);
    assert_eq!(page[2].port, 50003);

    for host in hosts {
        host.disconnect().unwrap();
    }
    assert!(player.refresh_hosts().unwrap().is_empty());
    assert_eq!(registry.connected_count(), 1);

    player.disconnect().unwrap();
    assert_eq!(registry.connected_count(), 0);
}

#[test]
fn client_pages_hold_at_most_ten_hosts() {
    let (net, _) = start(32);
    let _hosts: Vec<RegistrationClient> = (0..12)
        .map(|i| {
            RegistrationClient::register(
                net.connect(ADDR).unwrap(),
                ClientInfo::new(format!("h{i}"), Role::Host, "10.0.0.2", 40000 + i),
            )
            .unwrap()
        })
        .collect();
    let player = RegistrationClient::register(
        net.connect(ADDR).unwrap(),
        ClientInfo::new("bob", Role::Player, "10.0.0.3", 0),
    )
    .unwrap();

    assert_eq!(player.refresh_hosts().unwrap().len(), 10);
    let rest = player.refresh_hosts().unwrap();
    let names: Vec<&str> = rest.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, ["h10", "h11"]);
}

#[test]
fn registration_is_refused_when_full() {
    let (net, _) = start(1);
    let _only = RegistrationClient::register(
        net.connect(ADDR).unwrap(),
        ClientInfo::new("one", Role::Host, "10.0.0.2", 1),
    )
    .unwrap();
    let refused = RegistrationClient::register(
        net.connect(ADDR).unwrap(),
        ClientInfo::new("two", Role::Player, "10.0.0.3", 1),
    );
    let err = refused.err().unwrap().to_string();
    assert!(err.contains("registration server full"), "{err}");
}
