//! Cross-module scenario tests
//!
//! Exercise whole runs through the controller's public surface only.

use batmesh_core::Address;

use crate::controller::Controller;
use crate::node::Node;
use crate::topology::{NetworkBuilder, from_links, link_both};
use crate::{persist, report};

fn addr(n: u8) -> Address {
    Address::from_index(n)
}

#[test]
fn two_node_convergence_reaches_sequence_zero() {
    let mut net = from_links(&[("0.0.0.1", "0.0.0.2")]);
    net.tick(4);

    let a = net.node(addr(1)).unwrap();
    let b = net.node(addr(2)).unwrap();
    assert_eq!(a.routes()[&addr(2)].sequence, 0);
    assert_eq!(b.routes()[&addr(1)].sequence, 0);
    assert!(net.lost().is_empty());
}

#[test]
fn registry_view_follows_every_add_and_remove() {
    let mut net = Controller::new();
    net.add_node(Node::new(addr(1), 1, false));
    net.add_node(Node::new(addr(2), 1, false));
    assert_eq!(net.addresses(), vec![addr(1), addr(2)]);

    net.remove_node(addr(1));
    net.add_node(Node::new(addr(3), 1, false));
    assert_eq!(net.addresses(), vec![addr(2), addr(3)]);

    // A node added after the removal discovers only live peers: 2's adverts
    // reach 3 once linked, and 3's neighbor set stays inside the registry.
    link_both(&mut net, addr(2), addr(3));
    net.tick(6);
    for neighbor in net.node(addr(3)).unwrap().neighbors() {
        assert!(net.contains(*neighbor));
    }
}

#[test]
fn routing_sequence_never_regresses_across_a_run() {
    let mut net = from_links(&[("0.0.0.1", "0.0.0.2")]);
    let mut last_seen = 0u64;
    for _ in 0..20 {
        net.tick(1);
        if let Some(entry) = net.node(addr(1)).unwrap().routes().get(&addr(2)) {
            assert!(entry.sequence >= last_seen, "sequence regressed");
            last_seen = entry.sequence;
        }
    }
    assert!(last_seen > 0, "sequence should have advanced over 20 ticks");
}

#[test]
fn no_dead_message_survives_any_tick() {
    let mut net = NetworkBuilder::new(4).ring();
    for _ in 0..40 {
        net.tick(1);
        for address in net.addresses() {
            let node = net.node(address).unwrap();
            assert!(node.outbound().iter().all(|m| m.ttl > 0));
            assert!(node.inbound().iter().all(|m| m.ttl > 0));
            assert!(node.routes().values().all(|m| m.ttl > 0));
        }
    }
}

#[test]
fn removed_node_diverts_traffic_to_lost_sink() {
    let mut net = from_links(&[("0.0.0.1", "0.0.0.2")]);
    net.tick(4);
    net.remove_node(addr(2));

    net.send_message(addr(1), addr(2), 10, b"hello?".to_vec());
    net.tick(4);

    assert!(!net.lost().is_empty());
    assert!(net.lost().iter().all(|m| m.next_hop == addr(2)));
}

#[test]
fn chain_delivers_payload_spending_one_ttl_per_hop() {
    // Slow the advert cadence so the middle node's one-message-per-unit
    // transport keeps pace with flooding.
    let mut net = NetworkBuilder::new(3).interval(3).line();
    net.tick(16);

    // By now the far ends know each other through the middle node.
    assert!(net.node(addr(1)).unwrap().routes().contains_key(&addr(3)));

    net.send_message(addr(1), addr(3), 10, b"hi".to_vec());
    net.tick(16);

    let inbox = net.node(addr(3)).unwrap().inbox();
    let delivered = inbox.get(&addr(1)).expect("payload should have arrived");
    assert_eq!(delivered.payload.as_ref().unwrap().data, b"hi");
    assert_eq!(delivered.ttl, 8, "two hops, two TTL points");
    assert_eq!(delivered.trace, vec![addr(1), addr(2), addr(3)]);
}

#[test]
fn keep_alive_expiry_heals_stale_neighbors() {
    let mut net = from_links(&[("0.0.0.1", "0.0.0.2")]);
    net.tick(4);
    assert!(net.node(addr(1)).unwrap().neighbors().contains(&addr(2)));

    net.remove_node(addr(2));
    net.tick(15);

    let a = net.node(addr(1)).unwrap();
    assert!(a.routes().is_empty(), "route to the dead peer should decay");
    assert!(a.neighbors().is_empty(), "stale neighbor entry should self-heal");
}

#[test]
fn spoofed_adverts_poison_routes_toward_a_phantom() {
    let phantom: Address = "10.0.0.66".parse().unwrap();
    let mut net = Controller::new();
    net.add_node(Node::new(addr(1), 3, false));
    net.add_node(Node::new(addr(2), 3, false));
    net.add_node(Node::new(addr(3), 3, false).with_spoof(phantom));
    link_both(&mut net, addr(1), addr(2));
    link_both(&mut net, addr(2), addr(3));
    net.tick(12);

    // The phantom is routable knowledge but never a neighbor.
    let two = net.node(addr(2)).unwrap();
    assert!(two.routes().contains_key(&phantom));
    assert!(!two.neighbors().contains(&phantom));

    net.send_message(addr(1), phantom, 10, b"bait".to_vec());
    net.tick(12);
    assert!(net.lost().iter().any(|m| m.next_hop == phantom));
}

#[test]
fn directional_node_is_never_learned() {
    let mut net = Controller::new();
    net.add_node(Node::new(addr(1), 1, true));
    net.add_node(Node::new(addr(2), 1, false));
    link_both(&mut net, addr(1), addr(2));
    net.tick(10);

    // 2 hears 1's one-way adverts but must not learn from them; 1 learns 2
    // normally.
    assert!(!net.node(addr(2)).unwrap().routes().contains_key(&addr(1)));
    assert!(net.node(addr(1)).unwrap().routes().contains_key(&addr(2)));
}

#[test]
fn tick_zero_changes_nothing_anywhere() {
    let mut net = NetworkBuilder::new(3).ring();
    net.tick(7);
    let before = serde_json::to_string(&net).unwrap();
    net.tick(0);
    assert_eq!(serde_json::to_string(&net).unwrap(), before);
}

#[test]
fn reports_are_plain_serializable_records() {
    let mut net = NetworkBuilder::new(3).line();
    net.tick(8);

    let network: report::NetworkReport = net.report();
    let json = serde_json::to_string(&network).unwrap();
    assert!(json.contains("\"0.0.0.1\""));

    let node = net.report_node(addr(2)).unwrap();
    let json = serde_json::to_string(&node).unwrap();
    assert!(json.contains("\"sequence\""));

    let rendered = net.report_topology().to_string();
    assert!(rendered.contains("0.0.0.2"));
}

#[test]
fn saved_network_reloads_identically_and_keeps_running() {
    let mut net = NetworkBuilder::new(3).line();
    net.tick(10);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("net.json");
    persist::save(&net, &path).unwrap();
    let mut restored = persist::load(&path).unwrap();

    assert_eq!(
        serde_json::to_string(&restored).unwrap(),
        serde_json::to_string(&net).unwrap()
    );

    // The reloaded network keeps simulating from where it left off.
    net.tick(6);
    restored.tick(6);
    assert_eq!(
        serde_json::to_string(&restored).unwrap(),
        serde_json::to_string(&net).unwrap()
    );
}
