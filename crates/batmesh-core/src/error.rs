//! Error types for the batmesh value layer

use thiserror::Error;

/// Errors raised while parsing node addresses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid address {0:?}: expected four dot-separated octets")]
    InvalidFormat(String),

    #[error("invalid octet {octet:?} in address {address:?}")]
    InvalidOctet { address: String, octet: String },
}
