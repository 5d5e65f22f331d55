//! The adjudication protocol and its concrete arbiters.
//!
//! An adjudicator is a pure function of `(channel, candidate, proofs)`: no
//! internal state, no side effects, so the custody can trust that replaying
//! the same inputs always produces the same verdict. A rejection is always a
//! typed error; an `Ok` outcome implicitly means "valid".

mod board;
mod grid;
mod voucher;

pub use board::{winner_of, BoardGame, BoardState, Mark, SignedBoardState, Winner};
pub use grid::{
    step, Direction, GridConfig, GridGame, GridState, Point, SignedGridConfig, SignedGridState,
    Snake,
};
pub use voucher::{PaymentChannel, SignedVoucher, Voucher};

use crate::channel::{Asset, Channel, State, GUEST, HOST};
use crate::codec::{
    self,
    types::{Address, Hash, Signature, U256},
};
use crate::sig;
use thiserror::Error;

/// Total pool every adjudicator distributes.
///
/// A fixed constant rather than the channel's actual funded total, kept from
/// the reference design.
pub const POOL: u64 = 100;

/// Final split of the pool, host share first.
pub type Outcome = [Asset; 2];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdjudicatorError {
    #[error("signature does not recover to the expected participant")]
    InvalidSignature,
    #[error("turn value is out of range")]
    InvalidTurn,
    #[error("state is not well-formed")]
    InvalidGameState,
    #[error("transition is not a legal move")]
    InvalidMove,
    #[error("candidate version is not higher than the proof version")]
    VersionNotHigher,
    #[error("config signatures do not recover to both participants")]
    InvalidConfigSignatures,
    #[error("previous state is missing a participant signature")]
    InvalidPreviousStateSignatures,
    #[error("tick must advance by exactly one")]
    InvalidTick,
    #[error("unexpected number of proofs")]
    InvalidProofCount,
    #[error("voucher payment exceeds the channel pool")]
    PaymentExceedsPool,
    #[error("canonical encoding failed: {0}")]
    Codec(#[from] codec::Error),
    #[error("malformed application payload: {0}")]
    Payload(String),
}

impl From<serde_json::Error> for AdjudicatorError {
    fn from(err: serde_json::Error) -> Self {
        AdjudicatorError::Payload(err.to_string())
    }
}

/// Stateless validator deciding whether a candidate state is acceptable and
/// what asset split it implies.
pub trait Adjudicator {
    fn adjudicate(
        &self,
        channel: &Channel,
        candidate: &State,
        proofs: &[State],
    ) -> Result<Outcome, AdjudicatorError>;
}

/// Recover a signer, folding malformed signatures into `InvalidSignature`.
pub(crate) fn recover(hash: Hash, signature: Signature) -> Result<Address, AdjudicatorError> {
    sig::recover_signer(hash, signature).map_err(|_| AdjudicatorError::InvalidSignature)
}

/// Build an outcome over the token addresses the candidate declared.
pub(crate) fn payout(candidate: &State, host: U256, guest: U256) -> Outcome {
    [
        Asset {
            token: candidate.outcome[HOST].token,
            amount: host,
        },
        Asset {
            token: candidate.outcome[GUEST].token,
            amount: guest,
        },
    ]
}
