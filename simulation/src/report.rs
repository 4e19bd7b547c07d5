//! Plain structured snapshots for the presentation boundary
//!
//! The engine assembles records and ASCII strings only; layout, widgets,
//! and file output belong to whatever consumes these.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use batmesh_core::{Address, Ogm};

use crate::controller::NetStats;

/// One routing-table row: where traffic for `originator` goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub originator: Address,
    pub next_hop: Address,
    pub sequence: u64,
    pub ttl: i64,
}

/// Full snapshot of one node's protocol state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReport {
    pub address: Address,
    pub interval: u64,
    pub directional: bool,
    pub spoof: Option<Address>,
    pub sequence: u64,
    pub neighbors: Vec<Address>,
    pub outbound: Vec<Ogm>,
    pub inbound: Vec<Ogm>,
    pub inbox: Vec<Ogm>,
    pub routes: Vec<RouteSummary>,
    pub overflow_drops: u64,
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node {}:", self.address)?;
        writeln!(f, "  interval: {}", self.interval)?;
        writeln!(f, "  directional: {}", self.directional)?;
        if let Some(spoof) = self.spoof {
            writeln!(f, "  spoofing as: {spoof}")?;
        }
        writeln!(f, "  sequence: {}", self.sequence)?;
        let neighbors: Vec<String> = self.neighbors.iter().map(Address::to_string).collect();
        writeln!(f, "  neighbors: [{}]", neighbors.join(", "))?;
        writeln!(f, "  known topology:")?;
        for route in &self.routes {
            writeln!(
                f,
                "    {} via {} (seq {}, ttl {})",
                route.originator, route.next_hop, route.sequence, route.ttl
            )?;
        }
        writeln!(f, "  outbound ({}):", self.outbound.len())?;
        for message in &self.outbound {
            writeln!(f, "    {message}")?;
        }
        writeln!(f, "  inbound ({}):", self.inbound.len())?;
        for message in &self.inbound {
            writeln!(f, "    {message}")?;
        }
        writeln!(f, "  inbox ({}):", self.inbox.len())?;
        for message in &self.inbox {
            writeln!(f, "    {message}")?;
        }
        if self.overflow_drops > 0 {
            writeln!(f, "  overflow drops: {}", self.overflow_drops)?;
        }
        Ok(())
    }
}

/// Registry-level snapshot: who exists, what got lost, what happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkReport {
    pub tick: u64,
    pub addresses: Vec<Address>,
    pub lost: Vec<Ogm>,
    pub stats: NetStats,
}

impl fmt::Display for NetworkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network at tick {}:", self.tick)?;
        let addresses: Vec<String> = self.addresses.iter().map(Address::to_string).collect();
        writeln!(f, "  nodes ({}): [{}]", addresses.len(), addresses.join(", "))?;
        writeln!(f, "  lost messages ({}):", self.lost.len())?;
        for message in &self.lost {
            writeln!(f, "    {message}")?;
        }
        write!(f, "{}", self.stats)?;
        Ok(())
    }
}

/// Adjacency snapshot of the declared links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyReport {
    pub links: BTreeMap<Address, Vec<Address>>,
}

impl fmt::Display for TopologyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Topology:")?;
        writeln!(f, "  nodes: {}", self.links.len())?;
        for (address, neighbors) in &self.links {
            let neighbors: Vec<String> = neighbors.iter().map(Address::to_string).collect();
            writeln!(f, "  {} -> [{}]", address, neighbors.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_report_renders_adjacency() {
        let mut links = BTreeMap::new();
        links.insert(
            Address::from_index(1),
            vec![Address::from_index(2), Address::from_index(3)],
        );
        links.insert(Address::from_index(2), vec![Address::from_index(1)]);

        let rendered = TopologyReport { links }.to_string();
        assert!(rendered.contains("nodes: 2"));
        assert!(rendered.contains("0.0.0.1 -> [0.0.0.2, 0.0.0.3]"));
    }

    #[test]
    fn test_node_report_mentions_spoof_only_when_set() {
        let report = NodeReport {
            address: Address::from_index(1),
            interval: 1,
            directional: false,
            spoof: None,
            sequence: 0,
            neighbors: vec![],
            outbound: vec![],
            inbound: vec![],
            inbox: vec![],
            routes: vec![],
            overflow_drops: 0,
        };
        assert!(!report.to_string().contains("spoofing"));

        let spoofed = NodeReport {
            spoof: Some(Address::new([10, 0, 0, 66])),
            ..report
        };
        assert!(spoofed.to_string().contains("spoofing as: 10.0.0.66"));
    }
}
