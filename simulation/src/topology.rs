//! Topology builders
//!
//! Construct controllers pre-populated with nodes named `0.0.0.1`,
//! `0.0.0.2`, ... and mutual neighbor links in common shapes: line, ring,
//! star, full mesh, random.

use rand::Rng;

use batmesh_core::Address;

use crate::controller::Controller;
use crate::node::Node;

/// Builder for pre-wired networks
pub struct NetworkBuilder {
    count: usize,
    interval: u64,
}

impl NetworkBuilder {
    /// A network of `count` nodes addressed from the `0.0.0.x` block
    pub fn new(count: usize) -> Self {
        assert!(count >= 1 && count <= 254, "node count must be 1..=254");
        Self { count, interval: 1 }
    }

    /// Broadcast interval applied to every node
    pub fn interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Line: 1 - 2 - 3 - ...
    pub fn line(self) -> Controller {
        let (mut net, addrs) = self.seed();
        for pair in addrs.windows(2) {
            link_both(&mut net, pair[0], pair[1]);
        }
        net
    }

    /// Ring: a line with the ends joined
    pub fn ring(self) -> Controller {
        let count = self.count;
        let (mut net, addrs) = self.seed();
        for i in 0..count {
            link_both(&mut net, addrs[i], addrs[(i + 1) % count]);
        }
        net
    }

    /// Star: the first node links to every other
    pub fn star(self) -> Controller {
        let (mut net, addrs) = self.seed();
        let center = addrs[0];
        for spoke in addrs.iter().skip(1) {
            link_both(&mut net, center, *spoke);
        }
        net
    }

    /// Full mesh: every pair linked
    pub fn full_mesh(self) -> Controller {
        let (mut net, addrs) = self.seed();
        for i in 0..addrs.len() {
            for j in (i + 1)..addrs.len() {
                link_both(&mut net, addrs[i], addrs[j]);
            }
        }
        net
    }

    /// Random mesh with the given link probability; isolated nodes get one
    /// fallback link so the graph has no trivially dead members
    pub fn random(self, probability: f64) -> Controller {
        let (mut net, addrs) = self.seed();
        let mut rng = rand::rng();
        for i in 0..addrs.len() {
            for j in (i + 1)..addrs.len() {
                if rng.random::<f64>() < probability {
                    link_both(&mut net, addrs[i], addrs[j]);
                }
            }
        }
        for address in &addrs {
            let isolated = net
                .node(*address)
                .map(|n| n.neighbors().is_empty())
                .unwrap_or(true);
            if isolated && addrs.len() > 1 {
                let mut other = addrs[rng.random_range(0..addrs.len())];
                while other == *address {
                    other = addrs[rng.random_range(0..addrs.len())];
                }
                link_both(&mut net, *address, other);
            }
        }
        net
    }

    fn seed(self) -> (Controller, Vec<Address>) {
        let mut net = Controller::new();
        let addrs: Vec<Address> = (1..=self.count as u8).map(Address::from_index).collect();
        for address in &addrs {
            net.add_node(Node::new(*address, self.interval, false));
        }
        (net, addrs)
    }
}

/// Mutual link between two registered nodes
pub fn link_both(net: &mut Controller, a: Address, b: Address) {
    net.add_link(a, b);
    net.add_link(b, a);
}

/// Build a network from an explicit edge list of dotted-quad addresses,
/// creating interval-1 nodes as needed
pub fn from_links(links: &[(&str, &str)]) -> Controller {
    let mut net = Controller::new();
    for (a, b) in links {
        let a: Address = a.parse().expect("invalid address in edge list");
        let b: Address = b.parse().expect("invalid address in edge list");
        if !net.contains(a) {
            net.add_node(Node::new(a, 1, false));
        }
        if !net.contains(b) {
            net.add_node(Node::new(b, 1, false));
        }
        link_both(&mut net, a, b);
    }
    net
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_index(n)
    }

    #[test]
    fn test_line_links_consecutive_nodes() {
        let net = NetworkBuilder::new(4).line();
        assert_eq!(net.node_count(), 4);
        assert!(net.node(addr(2)).unwrap().neighbors().contains(&addr(1)));
        assert!(net.node(addr(2)).unwrap().neighbors().contains(&addr(3)));
        assert!(!net.node(addr(1)).unwrap().neighbors().contains(&addr(3)));
    }

    #[test]
    fn test_ring_wraps_around() {
        let net = NetworkBuilder::new(4).ring();
        assert!(net.node(addr(4)).unwrap().neighbors().contains(&addr(1)));
        assert!(net.node(addr(1)).unwrap().neighbors().contains(&addr(4)));
    }

    #[test]
    fn test_star_centers_on_first_node() {
        let net = NetworkBuilder::new(5).star();
        assert_eq!(net.node(addr(1)).unwrap().neighbors().len(), 4);
        assert_eq!(net.node(addr(3)).unwrap().neighbors().len(), 1);
    }

    #[test]
    fn test_full_mesh_links_every_pair() {
        let net = NetworkBuilder::new(4).full_mesh();
        for n in 1..=4 {
            assert_eq!(net.node(addr(n)).unwrap().neighbors().len(), 3);
        }
    }

    #[test]
    fn test_random_leaves_no_isolated_nodes() {
        let net = NetworkBuilder::new(8).random(0.0);
        for address in net.addresses() {
            assert!(
                !net.node(address).unwrap().neighbors().is_empty(),
                "{address} ended up isolated"
            );
        }
    }

    #[test]
    fn test_from_links_creates_missing_nodes() {
        let net = from_links(&[("0.0.0.1", "0.0.0.2"), ("0.0.0.2", "0.0.0.3")]);
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.node(addr(2)).unwrap().neighbors().len(), 2);
    }
}
