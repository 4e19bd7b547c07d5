//! Protocol value types for the batmesh routing simulator.
//!
//! This crate holds the pure data layer shared by the simulation engine:
//!
//! - [`Address`]: dotted-quad node identifier, the key for every registry,
//!   neighbor set, and routing table in the system
//! - [`Ogm`]: the originator message, the routing advert every node floods
//!   periodically, doubling as the carrier for unicast payloads
//! - [`AddressError`]: parse failures at the address boundary
//!
//! No protocol behavior lives here; queueing, freshness, and forwarding
//! decisions belong to the simulation crate.

pub mod address;
pub mod error;
pub mod message;

pub use address::Address;
pub use error::AddressError;
pub use message::{Ogm, Payload};
