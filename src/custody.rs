//! Channel custody: the ledger-side arbiter that holds deposits and drives
//! the fund / close / challenge / reclaim lifecycle.
//!
//! This is the only component with mutable shared storage. Each public
//! operation validates against a snapshot of the channel's metadata, performs
//! the token transfers it needs, and only then commits the mutated metadata
//! back; any error leaves the stored record untouched. The registry lock is
//! held for the whole call, so there is exactly one writer per channel at a
//! time and the token collaborator cannot reenter a half-updated record.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info};

use crate::adjudicator::{Adjudicator, AdjudicatorError, Outcome};
use crate::channel::{Asset, Channel, State, GUEST, HOST};
use crate::codec::{
    self,
    types::{Address, Hash, Signature},
};
use crate::sig;
use crate::token::TokenLedger;

/// Dispute window in seconds (3 days). Every accepted challenge restarts it.
pub const CHALLENGE_PERIOD: u64 = 3 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustodyError {
    /// Kept for callers that build channels dynamically; the typed API makes
    /// two participants a compile-time invariant.
    #[error("channels must have exactly two participants")]
    InvalidParticipants,
    #[error("operation not permitted in the channel's current status")]
    InvalidStatus,
    #[error("caller is not a participant of this channel")]
    InvalidCaller,
    #[error("signature does not recover to the expected participant")]
    InvalidSignature,
    #[error("token transfer failed")]
    TransferFailed,
    #[error("challenge period has not elapsed yet")]
    ChallengeNotExpired,
    #[error("no adjudicator registered under this address")]
    UnknownAdjudicator,
    #[error("state rejected by the adjudicator: {0}")]
    InvalidState(#[from] AdjudicatorError),
    #[error("canonical encoding failed: {0}")]
    Codec(#[from] codec::Error),
}

/// Lifecycle of a channel record. The `VOID` status of the reference design
/// is the absence of the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Created, funds not yet complete on the host side.
    Partial,
    /// Funded and live; states are exchanged off-chain.
    Opened,
    /// A unilateral state was submitted; the dispute timer is running.
    Challenged,
    /// Terminal. Funds are paid out; no further transitions.
    Closed,
}

/// Per-channel record owned exclusively by the custody.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub channel: Channel,
    pub outcome: Outcome,
    pub status: Status,
    /// Unix seconds at which an uncontested challenge becomes reclaimable.
    pub challenge_expire: u64,
    /// The state accepted by the latest challenge; handed to the adjudicator
    /// as single-step proof on a counter-challenge.
    pub last_valid_state: Option<State>,
}

/// Time source, abstracted so tests can warp past the challenge window.
pub trait Clock {
    /// Unix seconds.
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

pub struct Custody<T, C> {
    /// The custody's own identity; deposits land on this address.
    address: Address,
    token: T,
    clock: C,
    adjudicators: HashMap<Address, Box<dyn Adjudicator + Send + Sync>>,
    channels: Mutex<HashMap<Hash, Metadata>>,
}

impl<T: TokenLedger, C: Clock> Custody<T, C> {
    pub fn new(address: Address, token: T, clock: C) -> Self {
        Self {
            address,
            token,
            clock,
            adjudicators: HashMap::new(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Make an adjudicator implementation available under `addr`. Channels
    /// reference it by this address in their descriptor.
    pub fn register_adjudicator(
        &mut self,
        addr: Address,
        adjudicator: Box<dyn Adjudicator + Send + Sync>,
    ) {
        self.adjudicators.insert(addr, adjudicator);
    }

    /// Snapshot of a channel's record, if any.
    pub fn metadata(&self, channel_id: Hash) -> Option<Metadata> {
        self.table().get(&channel_id).cloned()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<Hash, Metadata>> {
        // A poisoned lock means a panic during a call; records are only
        // mutated by the final commit, so the map is still consistent.
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn adjudicator_for(
        &self,
        channel: &Channel,
    ) -> Result<&(dyn Adjudicator + Send + Sync), CustodyError> {
        self.adjudicators
            .get(&channel.adjudicator)
            .map(|b| b.as_ref())
            .ok_or(CustodyError::UnknownAdjudicator)
    }

    /// Fund a channel. The first deposit creates the record as `Partial`;
    /// the host's deposit promotes it to `Opened`, the guest's only once the
    /// host has already funded.
    pub fn open(
        &self,
        caller: Address,
        channel: Channel,
        deposit: Asset,
    ) -> Result<Hash, CustodyError> {
        let part_idx = channel.part_idx(caller).ok_or(CustodyError::InvalidCaller)?;
        self.adjudicator_for(&channel)?;
        let channel_id = channel.channel_id()?;

        let mut table = self.table();
        let mut meta = match table.get(&channel_id) {
            None => Metadata {
                channel,
                outcome: [
                    Asset {
                        token: deposit.token,
                        amount: 0.into(),
                    };
                    2
                ],
                status: Status::Partial,
                challenge_expire: 0,
                last_valid_state: None,
            },
            Some(existing) => {
                if existing.status != Status::Partial && existing.status != Status::Opened {
                    return Err(CustodyError::InvalidStatus);
                }
                existing.clone()
            }
        };

        if !self
            .token
            .transfer_from(caller, self.address, deposit.amount)
        {
            return Err(CustodyError::TransferFailed);
        }

        meta.outcome[part_idx].amount = meta.outcome[part_idx].amount + deposit.amount;
        match part_idx {
            HOST => meta.status = Status::Opened,
            _ => {
                if meta.outcome[HOST].amount > 0.into() {
                    meta.status = Status::Opened;
                }
            }
        }

        info!(
            channel = hex::encode(channel_id.0),
            depositor = ?caller,
            status = ?meta.status,
            "deposit recorded"
        );
        table.insert(channel_id, meta);
        Ok(channel_id)
    }

    /// Mutually agreed close: both participants signed the envelope, the
    /// adjudicator validates it standalone (no proofs), funds are paid out
    /// and the channel is terminal.
    pub fn close(
        &self,
        channel_id: Hash,
        state: State,
        sigs: [Signature; 2],
    ) -> Result<(), CustodyError> {
        let mut table = self.table();
        let mut meta = match table.get(&channel_id) {
            Some(meta) if meta.status == Status::Opened || meta.status == Status::Challenged => {
                meta.clone()
            }
            _ => return Err(CustodyError::InvalidStatus),
        };

        let state_hash = state.state_hash()?;
        for (idx, signature) in sigs.iter().enumerate() {
            let signer = sig::recover_signer(state_hash, *signature)
                .map_err(|_| CustodyError::InvalidSignature)?;
            if signer != meta.channel.participants[idx] {
                return Err(CustodyError::InvalidSignature);
            }
        }

        let outcome = self
            .adjudicator_for(&meta.channel)?
            .adjudicate(&meta.channel, &state, &[])?;

        self.distribute(&meta.channel, &outcome)?;
        meta.outcome = outcome;
        meta.status = Status::Closed;

        info!(channel = hex::encode(channel_id.0), "channel closed");
        table.insert(channel_id, meta);
        Ok(())
    }

    /// Unilateral state submission. A first challenge is judged standalone;
    /// a counter-challenge gets the previously accepted state as single-step
    /// proof. Every accepted challenge restarts the dispute timer.
    pub fn challenge(
        &self,
        caller: Address,
        channel_id: Hash,
        state: State,
    ) -> Result<(), CustodyError> {
        let mut table = self.table();
        let mut meta = match table.get(&channel_id) {
            Some(meta) if meta.status == Status::Opened || meta.status == Status::Challenged => {
                meta.clone()
            }
            _ => return Err(CustodyError::InvalidStatus),
        };
        if meta.channel.part_idx(caller).is_none() {
            return Err(CustodyError::InvalidCaller);
        }

        let proofs: Vec<State> = match (&meta.status, &meta.last_valid_state) {
            (Status::Challenged, Some(prev)) => vec![prev.clone()],
            _ => Vec::new(),
        };

        let outcome = self
            .adjudicator_for(&meta.channel)?
            .adjudicate(&meta.channel, &state, &proofs)?;

        let expire = self.clock.now() + CHALLENGE_PERIOD;
        meta.outcome = outcome;
        meta.last_valid_state = Some(state);
        meta.challenge_expire = expire;
        meta.status = Status::Challenged;

        debug!(
            channel = hex::encode(channel_id.0),
            challenger = ?caller,
            expire,
            "challenge accepted"
        );
        table.insert(channel_id, meta);
        Ok(())
    }

    /// Pay out the stored outcome of an uncontested, expired challenge.
    pub fn reclaim(&self, channel_id: Hash) -> Result<(), CustodyError> {
        let mut table = self.table();
        let mut meta = match table.get(&channel_id) {
            Some(meta) if meta.status == Status::Challenged => meta.clone(),
            _ => return Err(CustodyError::InvalidStatus),
        };
        if self.clock.now() < meta.challenge_expire {
            return Err(CustodyError::ChallengeNotExpired);
        }

        self.distribute(&meta.channel, &meta.outcome)?;
        meta.status = Status::Closed;

        info!(channel = hex::encode(channel_id.0), "channel reclaimed");
        table.insert(channel_id, meta);
        Ok(())
    }

    /// Pay participant 0 then participant 1, skipping zero amounts.
    fn distribute(&self, channel: &Channel, outcome: &Outcome) -> Result<(), CustodyError> {
        for idx in [HOST, GUEST] {
            let share = outcome[idx];
            if share.amount == 0.into() {
                continue;
            }
            if !self.token.transfer(channel.participants[idx], share.amount) {
                return Err(CustodyError::TransferFailed);
            }
        }
        Ok(())
    }
}
