//! Two-party off-chain state channels.
//!
//! Participants fund a channel at the [custody][crate::custody], exchange
//! signed application states off-chain, and fall back to the custody only to
//! close cooperatively or to dispute. Validity of submitted states is decided
//! by a pluggable, stateless [adjudicator][crate::adjudicator]; three
//! arbiters ship with the crate: a turn-based board game, a simultaneous-move
//! grid game and a monotonic payment voucher.

pub mod codec {
    //! Canonical encoding and hashing of everything that gets signed.

    mod error;
    mod hashing;
    mod ser;

    pub mod types;

    pub use error::{Error, Result};
    pub use hashing::to_hash;
    pub use ser::{to_writer, Serializer, Writer};

    #[cfg(test)]
    mod tests;
}

pub mod sig;

pub mod adjudicator;
pub mod channel;
pub mod custody;
pub mod token;

pub use codec::types::{Address, Hash, Signature, U256};
pub use custody::Custody;
