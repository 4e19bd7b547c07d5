//! Pre-built simulation scenarios
//!
//! Each scenario wires a topology, narrates the run, and returns the
//! controller so callers (and tests) can inspect the final state.

use tracing::info;

use batmesh_core::Address;

use crate::controller::Controller;
use crate::node::Node;
use crate::topology::{NetworkBuilder, from_links, link_both};

fn addr(n: u8) -> Address {
    Address::from_index(n)
}

/// Two mutual neighbors discovering each other's routes
///
/// The smallest possible mesh: 0.0.0.1 and 0.0.0.2 flood adverts at
/// interval 1; four ticks later each routing table holds the peer at
/// sequence 0 and nothing has been lost.
pub fn run_pair_scenario() -> Controller {
    info!("=== Two-node convergence ===");
    let mut net = from_links(&[("0.0.0.1", "0.0.0.2")]);

    println!("{}", net.report_topology());
    println!("--- Running 4 ticks ---");
    net.tick(4);

    for address in net.addresses() {
        println!("{}", net.report_node(address).unwrap());
    }
    println!("{}", net.report());
    net
}

/// Unicast relay across a three-node line
///
/// 1 - 2 - 3: the ends never hear each other directly, but once 2 has
/// re-flooded their adverts, 1 can unicast to 3 over the learned reverse
/// path. The payload spends exactly one TTL point per hop.
///
/// Transport moves one message per node per unit, so the middle node can
/// only keep up with flooding if adverts arrive slower than it drains,
/// hence the longer broadcast interval here.
pub fn run_chain_scenario() -> Controller {
    info!("=== Chain relay ===");
    let mut net = NetworkBuilder::new(3).interval(3).line();

    println!("{}", net.report_topology());
    println!("--- Letting adverts propagate (16 ticks) ---");
    net.tick(16);

    println!("--- 0.0.0.1 sends a payload to 0.0.0.3 (ttl 10) ---");
    net.send_message(addr(1), addr(3), 10, b"hi".to_vec());
    net.tick(16);

    let report = net.report_node(addr(3)).unwrap();
    println!("{report}");
    for message in &report.inbox {
        println!("delivered: {message}");
        println!("{}", message.describe());
    }
    println!("{}", net.report());
    net
}

/// Route poisoning through a spoofed originator
///
/// Node 3 advertises under the forged address 10.0.0.66. Its neighbors
/// learn a route to an address that is registered nowhere, and unicasts
/// toward it drain into the lost-message sink.
pub fn run_spoof_scenario() -> Controller {
    info!("=== Spoofed originator ===");
    let phantom: Address = "10.0.0.66".parse().expect("valid phantom address");

    let mut net = Controller::new();
    net.add_node(Node::new(addr(1), 3, false));
    net.add_node(Node::new(addr(2), 3, false));
    net.add_node(Node::new(addr(3), 3, false).with_spoof(phantom));
    link_both(&mut net, addr(1), addr(2));
    link_both(&mut net, addr(2), addr(3));

    println!("{}", net.report_topology());
    println!("--- 0.0.0.3 floods adverts claiming to be {phantom} (12 ticks) ---");
    net.tick(12);

    println!("--- 0.0.0.1 unicasts toward the phantom ---");
    net.send_message(addr(1), phantom, 10, b"who are you".to_vec());
    net.tick(12);

    let report = net.report();
    println!("{report}");
    println!(
        "lost messages bound for the phantom: {}",
        report.lost.iter().filter(|m| m.next_hop == phantom).count()
    );
    net
}

/// Topology churn: random link and node add/remove mid-run
///
/// Exercises stale-reference self-healing: removed nodes leave dangling
/// neighbor entries behind, which decay through keep-alive expiry while
/// traffic toward them collects in the lost sink.
pub fn run_churn_scenario(ticks: u64) -> Controller {
    use rand::Rng;

    info!("=== Random churn ({ticks} ticks) ===");
    let mut net = NetworkBuilder::new(8).random(0.4);
    println!("{}", net.report_topology());

    let mut rng = rand::rng();
    for step in 1..=ticks {
        if step.is_multiple_of(5) {
            let a = addr(rng.random_range(1..=8));
            let b = addr(rng.random_range(1..=8));
            if rng.random::<f64>() < 0.5 {
                link_both(&mut net, a, b);
            } else {
                net.remove_link(a, b);
            }
        }
        if step.is_multiple_of(10) {
            let victim = addr(rng.random_range(1..=8));
            if net.contains(victim) {
                println!("tick {step}: removing node {victim}");
                net.remove_node(victim);
            } else {
                println!("tick {step}: restoring node {victim}");
                net.add_node(Node::new(victim, 1, false));
            }
        }
        if step.is_multiple_of(7) {
            let from = addr(rng.random_range(1..=8));
            let to = addr(rng.random_range(1..=8));
            if from != to {
                net.send_message(from, to, 10, format!("probe at {step}").into_bytes());
            }
        }
        net.tick(1);
    }

    println!("{}", net.report());
    net
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_scenario_converges_at_sequence_zero() {
        let net = run_pair_scenario();
        assert_eq!(net.node(addr(1)).unwrap().routes()[&addr(2)].sequence, 0);
        assert_eq!(net.node(addr(2)).unwrap().routes()[&addr(1)].sequence, 0);
        assert!(net.lost().is_empty());
    }

    #[test]
    fn test_chain_scenario_delivers_payload() {
        let net = run_chain_scenario();
        let inbox = net.node(addr(3)).unwrap().inbox();
        let delivered = &inbox[&addr(1)];
        assert_eq!(delivered.payload.as_ref().unwrap().data, b"hi");
    }

    #[test]
    fn test_spoof_scenario_loses_traffic_to_phantom() {
        let phantom: Address = "10.0.0.66".parse().unwrap();
        let net = run_spoof_scenario();
        assert!(net.lost().iter().any(|m| m.next_hop == phantom));
    }

    #[test]
    fn test_churn_scenario_survives() {
        let net = run_churn_scenario(40);
        assert_eq!(net.stats().ticks, 40);
    }
}
