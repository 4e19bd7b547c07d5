//! Network controller: registry, transport, and the tick loop
//!
//! The controller owns every [`Node`], acts as the wire between them, and
//! drives the four tick phases. Nodes never reach into each other; the
//! registry mediates all addressing, and the view handed to a node is
//! computed from the live registry at phase start, so topology changes are
//! visible before the next phase runs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use batmesh_core::{Address, Ogm};

use crate::node::{Node, ReceiveOutcome};
use crate::report::{NetworkReport, NodeReport, TopologyReport};

/// Cumulative simulation counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetStats {
    pub ticks: u64,
    pub adverts_emitted: u64,
    pub adverts_accepted: u64,
    pub messages_transported: u64,
    pub messages_lost: u64,
    pub payloads_delivered: u64,
    pub payloads_relayed: u64,
    pub neighbors_discovered: u64,
    pub routes_purged: u64,
    pub dropped_rejected: u64,
    pub dropped_stale: u64,
    pub dropped_expired: u64,
    pub dropped_superseded: u64,
    pub dropped_no_route: u64,
    pub dropped_overflow: u64,
}

impl std::fmt::Display for NetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  stats:")?;
        writeln!(f, "    ticks: {}", self.ticks)?;
        writeln!(f, "    adverts emitted/accepted: {}/{}", self.adverts_emitted, self.adverts_accepted)?;
        writeln!(f, "    transported: {}", self.messages_transported)?;
        writeln!(f, "    lost: {}", self.messages_lost)?;
        writeln!(f, "    payloads delivered/relayed: {}/{}", self.payloads_delivered, self.payloads_relayed)?;
        writeln!(f, "    neighbors discovered: {}", self.neighbors_discovered)?;
        writeln!(f, "    routes purged: {}", self.routes_purged)?;
        writeln!(
            f,
            "    dropped (rejected/stale/expired/superseded/no-route/overflow): {}/{}/{}/{}/{}/{}",
            self.dropped_rejected,
            self.dropped_stale,
            self.dropped_expired,
            self.dropped_superseded,
            self.dropped_no_route,
            self.dropped_overflow
        )?;
        Ok(())
    }
}

/// Notable happenings, appended in order for inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetEvent {
    NodeAdded { address: Address, tick: u64 },
    NodeRemoved { address: Address, tick: u64 },
    LinkAdded { node: Address, neighbor: Address, tick: u64 },
    LinkRemoved { node: Address, neighbor: Address, tick: u64 },
    NeighborDiscovered { node: Address, neighbor: Address, tick: u64 },
    PayloadDelivered { to: Address, from: Address, tick: u64 },
    MessageLost { next_hop: Address, originator: Address, tick: u64 },
}

/// The simulated network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Controller {
    nodes: BTreeMap<Address, Node>,
    /// Messages whose next hop was not registered at delivery time
    lost: Vec<Ogm>,
    stats: NetStats,
    events: Vec<NetEvent>,
    clock: u64,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node; a duplicate address is rejected without mutation
    pub fn add_node(&mut self, node: Node) -> bool {
        let address = node.address();
        if self.nodes.contains_key(&address) {
            warn!(%address, "duplicate address, node not added");
            return false;
        }
        debug!(%address, "node added");
        self.nodes.insert(address, node);
        self.events.push(NetEvent::NodeAdded {
            address,
            tick: self.clock,
        });
        true
    }

    /// Remove a node; stale references held by other nodes are left to
    /// self-heal through keep-alive expiry
    pub fn remove_node(&mut self, address: Address) -> bool {
        if self.nodes.remove(&address).is_none() {
            return false;
        }
        debug!(%address, "node removed");
        self.events.push(NetEvent::NodeRemoved {
            address,
            tick: self.clock,
        });
        true
    }

    /// Declare `neighbor` a neighbor of `address` (one direction)
    ///
    /// Both addresses must be registered. Idempotent: re-adding an existing
    /// link succeeds without change.
    pub fn add_link(&mut self, address: Address, neighbor: Address) -> bool {
        if !self.nodes.contains_key(&neighbor) {
            return false;
        }
        let Some(node) = self.nodes.get_mut(&address) else {
            return false;
        };
        if node.add_neighbor(neighbor) {
            self.events.push(NetEvent::LinkAdded {
                node: address,
                neighbor,
                tick: self.clock,
            });
        }
        true
    }

    /// Drop `neighbor` from `address`'s neighbor set
    pub fn remove_link(&mut self, address: Address, neighbor: Address) -> bool {
        let Some(node) = self.nodes.get_mut(&address) else {
            return false;
        };
        if !node.remove_neighbor(neighbor) {
            return false;
        }
        self.events.push(NetEvent::LinkRemoved {
            node: address,
            neighbor,
            tick: self.clock,
        });
        true
    }

    /// Queue a unicast from `source`; unknown sources and unreachable
    /// destinations are silent no-ops
    pub fn send_message(
        &mut self,
        source: Address,
        destination: Address,
        ttl: i64,
        data: Vec<u8>,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(&source) else {
            debug!(%source, "unknown source, send ignored");
            return false;
        };
        node.send_message(destination, ttl, data)
    }

    /// Advance the simulation by `steps` whole time units
    ///
    /// Each unit runs four phases to completion across the entire registry
    /// before the next begins: aging, broadcast, receive, transport. The
    /// transport phase moves at most one message per node per unit: a
    /// node flooding N neighbors needs N units to drain the batch.
    pub fn tick(&mut self, steps: u64) {
        for _ in 0..steps {
            self.clock += 1;
            self.phase_age();
            self.phase_broadcast();
            self.phase_receive();
            self.phase_transport();
            self.stats.ticks += 1;
        }
    }

    fn phase_age(&mut self) {
        for node in self.nodes.values_mut() {
            let aged = node.tick(1);
            self.stats.dropped_expired += aged.expired as u64;
            self.stats.dropped_superseded += aged.superseded as u64;
            self.stats.routes_purged += aged.routes_purged as u64;
        }
    }

    fn phase_broadcast(&mut self) {
        for node in self.nodes.values_mut() {
            self.stats.adverts_emitted += node.broadcast(1) as u64;
        }
    }

    fn phase_receive(&mut self) {
        let view: BTreeSet<Address> = self.nodes.keys().copied().collect();
        let addresses: Vec<Address> = view.iter().copied().collect();
        for address in addresses {
            let Some(node) = self.nodes.get_mut(&address) else {
                continue;
            };
            let outcome = node.receive_one(&view);
            self.record_outcome(address, outcome);
        }
    }

    fn record_outcome(&mut self, node: Address, outcome: ReceiveOutcome) {
        match outcome {
            ReceiveOutcome::Idle => {}
            ReceiveOutcome::Rejected(_) => self.stats.dropped_rejected += 1,
            ReceiveOutcome::Delivered { originator } => {
                self.stats.payloads_delivered += 1;
                self.events.push(NetEvent::PayloadDelivered {
                    to: node,
                    from: originator,
                    tick: self.clock,
                });
            }
            ReceiveOutcome::Relayed { .. } => self.stats.payloads_relayed += 1,
            ReceiveOutcome::NoRoute { .. } => self.stats.dropped_no_route += 1,
            ReceiveOutcome::TtlExpired => self.stats.dropped_expired += 1,
            ReceiveOutcome::Stale { .. } => self.stats.dropped_stale += 1,
            ReceiveOutcome::Accepted {
                originator,
                new_neighbor,
                ..
            } => {
                self.stats.adverts_accepted += 1;
                if new_neighbor {
                    self.stats.neighbors_discovered += 1;
                    self.events.push(NetEvent::NeighborDiscovered {
                        node,
                        neighbor: originator,
                        tick: self.clock,
                    });
                }
            }
            ReceiveOutcome::QueueFull => self.stats.dropped_overflow += 1,
        }
    }

    fn phase_transport(&mut self) {
        let mut in_flight: Vec<Ogm> = Vec::new();
        for node in self.nodes.values_mut() {
            if let Some(message) = node.pop_outbound() {
                in_flight.push(message);
            }
        }
        for message in in_flight {
            match self.nodes.get_mut(&message.next_hop) {
                Some(target) => {
                    if target.enqueue_inbound(message) {
                        self.stats.messages_transported += 1;
                    } else {
                        self.stats.dropped_overflow += 1;
                    }
                }
                None => {
                    warn!(next_hop = %message.next_hop, %message, "next hop not registered, message lost");
                    self.stats.messages_lost += 1;
                    self.events.push(NetEvent::MessageLost {
                        next_hop: message.next_hop,
                        originator: message.originator,
                        tick: self.clock,
                    });
                    self.lost.push(message);
                }
            }
        }
    }

    /// Drop every node, lost message, counter, and event
    pub fn clear(&mut self) {
        info!("clearing network");
        *self = Self::default();
    }

    pub fn contains(&self, address: Address) -> bool {
        self.nodes.contains_key(&address)
    }

    pub fn node(&self, address: Address) -> Option<&Node> {
        self.nodes.get(&address)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.nodes.keys().copied().collect()
    }

    pub fn lost(&self) -> &[Ogm] {
        &self.lost
    }

    pub fn stats(&self) -> &NetStats {
        &self.stats
    }

    pub fn events(&self) -> &[NetEvent] {
        &self.events
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Registry-level snapshot
    pub fn report(&self) -> NetworkReport {
        NetworkReport {
            tick: self.clock,
            addresses: self.addresses(),
            lost: self.lost.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Snapshot of one node, if registered
    pub fn report_node(&self, address: Address) -> Option<NodeReport> {
        self.nodes.get(&address).map(Node::report)
    }

    /// Declared adjacency of every registered node
    pub fn report_topology(&self) -> TopologyReport {
        TopologyReport {
            links: self
                .nodes
                .iter()
                .map(|(address, node)| (*address, node.neighbors().iter().copied().collect()))
                .collect(),
        }
    }
}
