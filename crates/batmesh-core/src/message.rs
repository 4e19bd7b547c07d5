//! Originator messages
//!
//! The OGM is the single wire unit of the simulation. Pure routing adverts
//! carry no payload and are flooded to every neighbor; unicast messages
//! carry a [`Payload`] and travel hop-by-hop along learned reverse paths.
//! A node forwarding one message to several neighbors always works on
//! clones, never on a shared instance, so queued copies age and get dropped
//! independently.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Application data riding on a unicast message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Final destination of the data
    pub destination: Address,
    /// Opaque application bytes
    pub data: Vec<u8>,
}

/// An originator message
///
/// Field updates are performed by node operations; the message itself only
/// knows how to clone and format itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ogm {
    /// Address the message claims to originate from
    pub originator: Address,
    /// Address of the last hop that forwarded the message
    pub sender: Address,
    /// Address the message is currently addressed to
    pub next_hop: Address,
    /// Originator's sequence number at emission time
    pub sequence: u64,
    /// Remaining lifetime; a message at or below zero is dead
    pub ttl: i64,
    /// One-way advert: receivers must not re-broadcast or learn from it
    pub directional: bool,
    /// Addresses the message has visited, in order (append-only)
    pub trace: Vec<Address>,
    /// Present only on unicast application messages
    pub payload: Option<Payload>,
}

impl Ogm {
    /// Construct a routing advert
    ///
    /// `next_hop` starts at the originator; the emitting node overwrites it
    /// on each per-neighbor clone.
    pub fn advert(originator: Address, sequence: u64, ttl: i64, directional: bool) -> Self {
        Self {
            originator,
            sender: originator,
            next_hop: originator,
            sequence,
            ttl,
            directional,
            trace: vec![originator],
            payload: None,
        }
    }

    /// Construct a unicast application message
    pub fn unicast(
        originator: Address,
        destination: Address,
        sequence: u64,
        ttl: i64,
        data: Vec<u8>,
    ) -> Self {
        Self {
            originator,
            sender: originator,
            next_hop: destination,
            sequence,
            ttl,
            directional: false,
            trace: vec![originator],
            payload: Some(Payload { destination, data }),
        }
    }

    /// True for pure routing adverts (no payload)
    pub fn is_advert(&self) -> bool {
        self.payload.is_none()
    }

    /// Append a visited address to the trace route
    pub fn record_hop(&mut self, hop: Address) {
        self.trace.push(hop);
    }

    /// Plain multi-line report of every field, for the reporting boundary
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("originator: {}\n", self.originator));
        out.push_str(&format!("sender:     {}\n", self.sender));
        out.push_str(&format!("next hop:   {}\n", self.next_hop));
        out.push_str(&format!("sequence:   {}\n", self.sequence));
        out.push_str(&format!("ttl:        {}\n", self.ttl));
        out.push_str(&format!("directional: {}\n", self.directional));
        let trace: Vec<String> = self.trace.iter().map(Address::to_string).collect();
        out.push_str(&format!("trace:      [{}]\n", trace.join(" -> ")));
        match &self.payload {
            Some(payload) => out.push_str(&format!(
                "payload:    {} bytes for {}\n",
                payload.data.len(),
                payload.destination
            )),
            None => out.push_str("payload:    none\n"),
        }
        out
    }
}

impl fmt::Display for Ogm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{} via {} -> {} ttl={}",
            self.originator, self.sequence, self.sender, self.next_hop, self.ttl
        )?;
        if self.directional {
            write!(f, " oneway")?;
        }
        if let Some(payload) = &self.payload {
            write!(f, " [{}B for {}]", payload.data.len(), payload.destination)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_index(n)
    }

    #[test]
    fn test_advert_seeds_trace_with_originator() {
        let advert = Ogm::advert(addr(1), 0, 10, false);
        assert_eq!(advert.trace, vec![addr(1)]);
        assert_eq!(advert.sender, addr(1));
        assert!(advert.is_advert());
    }

    #[test]
    fn test_clones_age_independently() {
        let advert = Ogm::advert(addr(1), 3, 10, false);
        let mut copy = advert.clone();
        copy.ttl -= 4;
        copy.record_hop(addr(2));
        assert_eq!(advert.ttl, 10);
        assert_eq!(advert.trace.len(), 1);
        assert_eq!(copy.ttl, 6);
        assert_eq!(copy.trace.len(), 2);
    }

    #[test]
    fn test_describe_lists_every_field() {
        let message = Ogm::unicast(addr(1), addr(3), 7, 10, b"hi".to_vec());
        let report = message.describe();
        assert!(report.contains("originator: 0.0.0.1"));
        assert!(report.contains("sequence:   7"));
        assert!(report.contains("2 bytes for 0.0.0.3"));
    }

    #[test]
    fn test_display_marks_payload_and_direction() {
        let mut advert = Ogm::advert(addr(1), 0, 10, true);
        advert.next_hop = addr(2);
        assert_eq!(advert.to_string(), "0.0.0.1#0 via 0.0.0.1 -> 0.0.0.2 ttl=10 oneway");

        let unicast = Ogm::unicast(addr(1), addr(3), 2, 5, b"abc".to_vec());
        assert!(unicast.to_string().ends_with("[3B for 0.0.0.3]"));
    }
}
