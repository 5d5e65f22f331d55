//! Shared channel data model: the immutable channel descriptor, per-side
//! asset shares and the opaque state envelope exchanged off-chain.

use crate::codec::{
    self,
    types::{Address, Hash, U256},
};
use serde::{Deserialize, Serialize};

/// Index of a participant in the channel.
pub type PartIdx = usize;

/// The participant that proposed and first funded the channel.
pub const HOST: PartIdx = 0;
/// The second participant.
pub const GUEST: PartIdx = 1;

/// Immutable descriptor of a two-party channel.
///
/// The channel id is the canonical hash of this struct: two `open` calls with
/// identical fields address the same channel record, while distinct nonces
/// with the same participants and adjudicator yield distinct channels.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Channel {
    pub participants: [Address; 2],
    pub adjudicator: Address,
    pub nonce: u64,
}

impl Channel {
    pub fn channel_id(&self) -> Result<Hash, codec::Error> {
        codec::to_hash(self)
    }

    /// Index of `addr` among the participants, if it is one of them.
    pub fn part_idx(&self, addr: Address) -> Option<PartIdx> {
        self.participants.iter().position(|p| *p == addr)
    }
}

/// One side's share of the channel funds.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Asset {
    pub token: Address,
    pub amount: U256,
}

/// Application state envelope.
///
/// `data` is opaque at this layer; only the channel's adjudicator knows how
/// to decode it into a signed game state or voucher. The envelope as a whole
/// is what both parties co-sign for a mutual close.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub data: Vec<u8>,
    pub outcome: [Asset; 2],
}

impl State {
    /// Wrap an application payload into an envelope.
    pub fn new<T: Serialize>(payload: &T, outcome: [Asset; 2]) -> serde_json::Result<Self> {
        Ok(Self {
            data: serde_json::to_vec(payload)?,
            outcome,
        })
    }

    /// Canonical hash of the whole envelope, signed by both parties on close.
    pub fn state_hash(&self) -> Result<Hash, codec::Error> {
        codec::to_hash(self)
    }

    /// Decode the opaque payload into an adjudicator-specific structure.
    pub fn decode_data<'a, T: Deserialize<'a>>(&'a self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn channel(rng: &mut StdRng, nonce: u64) -> Channel {
        Channel {
            participants: [rng.gen(), rng.gen()],
            adjudicator: rng.gen(),
            nonce,
        }
    }

    #[test]
    fn channel_id_is_a_pure_function_of_the_descriptor() {
        let mut rng = StdRng::seed_from_u64(7);
        let ch = channel(&mut rng, 1);
        assert_eq!(ch.channel_id().unwrap(), ch.channel_id().unwrap());

        let mut other = ch;
        other.nonce = 2;
        assert_ne!(ch.channel_id().unwrap(), other.channel_id().unwrap());
    }

    #[test]
    fn part_idx_identifies_participants() {
        let mut rng = StdRng::seed_from_u64(8);
        let ch = channel(&mut rng, 1);
        assert_eq!(ch.part_idx(ch.participants[HOST]), Some(HOST));
        assert_eq!(ch.part_idx(ch.participants[GUEST]), Some(GUEST));
        assert_eq!(ch.part_idx(rng.gen()), None);
    }
}
