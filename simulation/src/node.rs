//! Per-node protocol state machine
//!
//! A [`Node`] owns its queues, neighbor set, and routing table; the
//! controller drives it and moves messages between nodes. Neighbors are
//! held as addresses and resolved through the registry view passed in at
//! call time, so a removed node can never leave a dangling live reference.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use batmesh_core::{Address, Ogm};

use crate::report::{NodeReport, RouteSummary};

/// Default advert lifetime; doubles as the keep-alive window for links.
pub const DEFAULT_KEEP_ALIVE: i64 = 10;

/// Default depth bound for the send and receive queues.
pub const DEFAULT_QUEUE_LIMIT: usize = 1000;

/// What a single [`Node::receive_one`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Inbound queue was empty
    Idle,
    /// Message dropped without any state change
    Rejected(RejectReason),
    /// Unicast payload stored in the inbox
    Delivered { originator: Address },
    /// Unicast payload re-enqueued toward the next hop
    Relayed { destination: Address, next_hop: Address },
    /// Unicast payload with no usable route, dropped
    NoRoute { destination: Address },
    /// Hop budget exhausted, message consumed
    TtlExpired,
    /// Advert not fresher than the recorded sequence, dropped
    Stale { originator: Address },
    /// Advert recorded as the freshest for its originator
    Accepted {
        originator: Address,
        new_neighbor: bool,
        forwarded: usize,
    },
    /// Outbound queue full, relay copy rejected
    QueueFull,
}

/// Why a message was rejected outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The node saw its own sender address on the message
    OwnEcho,
    /// One-way advert; the receiving side must not learn or re-flood
    Directional,
}

/// Queue and table attrition from one aging pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeStats {
    /// Queue entries whose TTL ran out
    pub expired: usize,
    /// Queue entries behind the routing table's recorded sequence
    pub superseded: usize,
    /// Routing entries purged by keep-alive expiry
    pub routes_purged: usize,
}

/// A node of the simulated mesh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    address: Address,
    interval: u64,
    countdown: u64,
    directional: bool,
    spoof: Option<Address>,
    neighbors: BTreeSet<Address>,
    /// Originator -> freshest advert seen; the stored sender is the reverse
    /// path used for unicast relay.
    routes: BTreeMap<Address, Ogm>,
    /// Originator -> last delivered unicast message
    inbox: BTreeMap<Address, Ogm>,
    outbound: VecDeque<Ogm>,
    inbound: VecDeque<Ogm>,
    sequence: u64,
    keep_alive: i64,
    queue_limit: usize,
    overflow_drops: u64,
}

impl Node {
    /// Create a node with the given broadcast interval
    pub fn new(address: Address, interval: u64, directional: bool) -> Self {
        Self {
            address,
            interval,
            countdown: 0,
            directional,
            spoof: None,
            neighbors: BTreeSet::new(),
            routes: BTreeMap::new(),
            inbox: BTreeMap::new(),
            outbound: VecDeque::new(),
            inbound: VecDeque::new(),
            sequence: 0,
            keep_alive: DEFAULT_KEEP_ALIVE,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            overflow_drops: 0,
        }
    }

    /// Advertise under a forged address instead of the real one
    pub fn with_spoof(mut self, spoof: Address) -> Self {
        self.spoof = Some(spoof);
        self
    }

    /// Override the advert lifetime / keep-alive window
    pub fn with_keep_alive(mut self, keep_alive: i64) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Override the queue depth bound
    pub fn with_queue_limit(mut self, limit: usize) -> Self {
        self.queue_limit = limit;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn directional(&self) -> bool {
        self.directional
    }

    pub fn spoof(&self) -> Option<Address> {
        self.spoof
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn neighbors(&self) -> &BTreeSet<Address> {
        &self.neighbors
    }

    pub fn routes(&self) -> &BTreeMap<Address, Ogm> {
        &self.routes
    }

    pub fn inbox(&self) -> &BTreeMap<Address, Ogm> {
        &self.inbox
    }

    pub fn outbound(&self) -> &VecDeque<Ogm> {
        &self.outbound
    }

    pub fn inbound(&self) -> &VecDeque<Ogm> {
        &self.inbound
    }

    pub fn overflow_drops(&self) -> u64 {
        self.overflow_drops
    }

    /// The address this node stamps on self-originated traffic
    fn advertised_address(&self) -> Address {
        self.spoof.unwrap_or(self.address)
    }

    /// Accumulate elapsed time and flood one advert per neighbor once the
    /// countdown crosses the broadcast interval.
    ///
    /// Exactly one sequence number is consumed per broadcast event, neighbors
    /// or not; with no neighbors the event still resets the countdown.
    /// Returns the number of adverts emitted.
    pub fn broadcast(&mut self, elapsed: u64) -> usize {
        if elapsed == 0 {
            return 0;
        }
        self.countdown += elapsed;
        if self.countdown <= self.interval {
            return 0;
        }

        let advert = Ogm::advert(
            self.advertised_address(),
            self.sequence,
            self.keep_alive,
            self.directional,
        );
        let targets: Vec<Address> = self.neighbors.iter().copied().collect();
        let mut emitted = 0;
        for neighbor in targets {
            let mut copy = advert.clone();
            copy.next_hop = neighbor;
            if self.enqueue_outbound(copy) {
                emitted += 1;
            }
        }
        trace!(node = %self.address, sequence = self.sequence, emitted, "broadcast");
        self.sequence += 1;
        self.countdown = 0;
        emitted
    }

    /// Pop and process the oldest inbound message, if any
    pub fn receive_one(&mut self, registry: &BTreeSet<Address>) -> ReceiveOutcome {
        let Some(mut message) = self.inbound.pop_front() else {
            return ReceiveOutcome::Idle;
        };

        if message.sender == self.address {
            trace!(node = %self.address, %message, "dropping own echo");
            return ReceiveOutcome::Rejected(RejectReason::OwnEcho);
        }
        if message.directional {
            trace!(node = %self.address, %message, "dropping one-way advert");
            return ReceiveOutcome::Rejected(RejectReason::Directional);
        }

        message.record_hop(self.address);

        match message.payload.as_ref().map(|p| p.destination) {
            Some(destination) => self.receive_unicast(message, destination),
            None => self.receive_advert(message, registry),
        }
    }

    fn receive_unicast(&mut self, mut message: Ogm, destination: Address) -> ReceiveOutcome {
        // One hop consumed by this receipt.
        message.ttl -= 1;

        if destination == self.address {
            let originator = message.originator;
            debug!(node = %self.address, from = %originator, "payload delivered");
            self.inbox.insert(originator, message);
            return ReceiveOutcome::Delivered { originator };
        }

        let Some(route) = self.routes.get(&destination) else {
            debug!(node = %self.address, dest = %destination, "no route for relay, dropping");
            return ReceiveOutcome::NoRoute { destination };
        };
        if message.ttl <= 0 {
            debug!(node = %self.address, dest = %destination, "hop budget spent, dropping");
            return ReceiveOutcome::TtlExpired;
        }

        let next_hop = route.sender;
        message.next_hop = next_hop;
        message.sender = self.address;
        trace!(node = %self.address, dest = %destination, via = %next_hop, "relaying payload");
        if self.enqueue_outbound(message) {
            ReceiveOutcome::Relayed {
                destination,
                next_hop,
            }
        } else {
            ReceiveOutcome::QueueFull
        }
    }

    fn receive_advert(&mut self, mut message: Ogm, registry: &BTreeSet<Address>) -> ReceiveOutcome {
        let originator = message.originator;

        // A direct single-hop advert doubles as neighbor discovery. Only
        // addresses resolvable through the registry become neighbors.
        let mut new_neighbor = false;
        if message.originator == message.sender
            && !self.neighbors.contains(&originator)
            && registry.contains(&originator)
        {
            self.neighbors.insert(originator);
            new_neighbor = true;
            debug!(node = %self.address, neighbor = %originator, "discovered neighbor");
        }

        // Strictly-greater-wins; a tie keeps the existing entry.
        if let Some(known) = self.routes.get(&originator)
            && message.sequence <= known.sequence
        {
            trace!(node = %self.address, %message, known = known.sequence, "stale advert");
            return ReceiveOutcome::Stale { originator };
        }

        message.ttl -= 1;
        if message.ttl <= 0 {
            return ReceiveOutcome::TtlExpired;
        }

        // The stored copy keeps the incoming sender: that is the reverse
        // path unicasts toward this originator will take.
        self.routes.insert(originator, message.clone());

        let targets: Vec<Address> = self
            .neighbors
            .iter()
            .copied()
            .filter(|n| *n != originator)
            .collect();
        let mut forwarded = 0;
        for neighbor in targets {
            let mut copy = message.clone();
            copy.sender = self.address;
            copy.next_hop = neighbor;
            copy.directional = self.directional;
            if self.enqueue_outbound(copy) {
                forwarded += 1;
            }
        }

        ReceiveOutcome::Accepted {
            originator,
            new_neighbor,
            forwarded,
        }
    }

    /// Age queues and the routing table by `elapsed` simulated units
    ///
    /// Adverts expire by TTL or by being behind the recorded sequence for
    /// their originator; unicast messages carry a pure hop budget and do not
    /// age. An expired routing entry drops its originator from the neighbor
    /// set; absence of fresh adverts within the keep-alive window means the
    /// link is down.
    pub fn tick(&mut self, elapsed: u64) -> AgeStats {
        let mut stats = AgeStats::default();
        if elapsed == 0 {
            return stats;
        }
        let elapsed = elapsed as i64;

        age_queue(&mut self.outbound, &self.routes, elapsed, &mut stats);
        age_queue(&mut self.inbound, &self.routes, elapsed, &mut stats);

        let mut purged: Vec<Address> = Vec::new();
        for (originator, entry) in &mut self.routes {
            entry.ttl -= elapsed;
            if entry.ttl <= 0 {
                purged.push(*originator);
            }
        }
        for originator in purged {
            self.routes.remove(&originator);
            stats.routes_purged += 1;
            if self.neighbors.remove(&originator) {
                debug!(node = %self.address, neighbor = %originator, "keep-alive expired, dropping neighbor");
            }
        }
        stats
    }

    /// Idempotent neighbor add; the node never neighbors itself
    pub fn add_neighbor(&mut self, neighbor: Address) -> bool {
        if neighbor == self.address {
            return false;
        }
        self.neighbors.insert(neighbor)
    }

    /// Direct neighbor removal, no table side effects
    pub fn remove_neighbor(&mut self, neighbor: Address) -> bool {
        self.neighbors.remove(&neighbor)
    }

    /// Queue a unicast message toward `destination`
    ///
    /// Direct neighbors are addressed straight; anything else goes to the
    /// reverse path recorded in the routing table. Unreachable destinations
    /// are a silent no-op. Returns whether the message was enqueued.
    pub fn send_message(&mut self, destination: Address, ttl: i64, data: Vec<u8>) -> bool {
        if ttl <= 0 {
            return false;
        }
        let next_hop = if self.neighbors.contains(&destination) {
            destination
        } else if let Some(route) = self.routes.get(&destination) {
            route.sender
        } else {
            debug!(node = %self.address, dest = %destination, "destination unreachable, dropping send");
            return false;
        };

        let mut message = Ogm::unicast(
            self.advertised_address(),
            destination,
            self.sequence,
            ttl,
            data,
        );
        message.next_hop = next_hop;
        debug!(node = %self.address, dest = %destination, via = %next_hop, "queueing unicast");
        self.enqueue_outbound(message)
    }

    /// Push a delivered message onto the inbound queue (reject-new on
    /// overflow). Called by the controller's transport phase.
    pub fn enqueue_inbound(&mut self, message: Ogm) -> bool {
        if self.inbound.len() >= self.queue_limit {
            self.overflow_drops += 1;
            warn!(node = %self.address, "inbound queue full, rejecting message");
            return false;
        }
        self.inbound.push_back(message);
        true
    }

    /// Pop the oldest outbound message for transport
    pub fn pop_outbound(&mut self) -> Option<Ogm> {
        self.outbound.pop_front()
    }

    fn enqueue_outbound(&mut self, message: Ogm) -> bool {
        if self.outbound.len() >= self.queue_limit {
            self.overflow_drops += 1;
            warn!(node = %self.address, "outbound queue full, rejecting message");
            return false;
        }
        self.outbound.push_back(message);
        true
    }

    /// Structured snapshot for the reporting boundary
    pub fn report(&self) -> NodeReport {
        NodeReport {
            address: self.address,
            interval: self.interval,
            directional: self.directional,
            spoof: self.spoof,
            sequence: self.sequence,
            neighbors: self.neighbors.iter().copied().collect(),
            outbound: self.outbound.iter().cloned().collect(),
            inbound: self.inbound.iter().cloned().collect(),
            inbox: self.inbox.values().cloned().collect(),
            routes: self
                .routes
                .iter()
                .map(|(originator, entry)| RouteSummary {
                    originator: *originator,
                    next_hop: entry.sender,
                    sequence: entry.sequence,
                    ttl: entry.ttl,
                })
                .collect(),
            overflow_drops: self.overflow_drops,
        }
    }
}

fn age_queue(
    queue: &mut VecDeque<Ogm>,
    routes: &BTreeMap<Address, Ogm>,
    elapsed: i64,
    stats: &mut AgeStats,
) {
    queue.retain_mut(|message| {
        if message.payload.is_some() {
            return true;
        }
        message.ttl -= elapsed;
        if message.ttl <= 0 {
            stats.expired += 1;
            return false;
        }
        if let Some(known) = routes.get(&message.originator)
            && message.sequence < known.sequence
        {
            stats.superseded += 1;
            return false;
        }
        true
    });
}
