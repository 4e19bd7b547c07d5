//! # batmesh
//!
//! A discrete-time simulation of a B.A.T.M.A.N.-style proactive mesh
//! routing protocol. Nodes periodically flood originator messages (OGMs),
//! learn routes from the freshest sequence number seen per originator,
//! discover neighbors from direct single-hop receipts, and relay unicast
//! payloads hop-by-hop over learned reverse paths.
//!
//! ## Architecture
//!
//! - **Core types** (`batmesh-core`): `Address`, `Ogm`, pure values
//! - **Node** (`node.rs`): per-address protocol state machine: queues,
//!   neighbor set, routing table, sequencing, broadcast countdown
//! - **Controller** (`controller.rs`): address registry, lost-message sink,
//!   and the four-phase tick loop (age, broadcast, receive, transport)
//! - **Topology** (`topology.rs`): line/ring/star/full/random builders
//! - **Scenarios** (`scenarios.rs`): pre-built narrated runs
//! - **Persist** (`persist.rs`): JSON save/load of whole networks
//!
//! Everything is single-threaded and deterministic: the tick loop is the
//! only driver, each phase completes across the whole registry before the
//! next begins, and transport moves at most one message per node per time
//! unit.
//!
//! ## Example
//!
//! ```
//! use batmesh_simulation::{Address, Controller, Node};
//!
//! let a: Address = "0.0.0.1".parse().unwrap();
//! let b: Address = "0.0.0.2".parse().unwrap();
//!
//! let mut net = Controller::new();
//! net.add_node(Node::new(a, 1, false));
//! net.add_node(Node::new(b, 1, false));
//! net.add_link(a, b);
//! net.add_link(b, a);
//!
//! net.tick(4);
//!
//! // Each side has learned the other from its direct adverts.
//! assert_eq!(net.node(a).unwrap().routes()[&b].sequence, 0);
//! assert!(net.lost().is_empty());
//! ```

pub mod controller;
pub mod node;
pub mod persist;
pub mod report;
pub mod scenarios;
pub mod topology;

#[cfg(test)]
mod integration_scenarios;

pub use controller::{Controller, NetEvent, NetStats};
pub use node::{AgeStats, DEFAULT_KEEP_ALIVE, DEFAULT_QUEUE_LIMIT, Node, ReceiveOutcome, RejectReason};
pub use persist::{PersistError, load, save};
pub use report::{NetworkReport, NodeReport, RouteSummary, TopologyReport};
pub use topology::{NetworkBuilder, from_links, link_both};

// Re-export the value layer for consumers of this crate.
pub use batmesh_core::{Address, AddressError, Ogm, Payload};
