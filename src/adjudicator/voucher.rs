//! Payment-voucher arbiter: monotonically versioned, host-signed payment
//! instructions. The guest holds the latest voucher and can always enforce
//! it; only the version ordering matters for disputes.

use serde::{Deserialize, Serialize};

use super::{payout, recover, Adjudicator, AdjudicatorError, Outcome, POOL};
use crate::channel::{Asset, Channel, State, HOST};
use crate::codec::{self, types::Signature, types::U256};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Voucher {
    pub version: u64,
    /// Amount owed to the guest.
    pub payment: Asset,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct SignedVoucher {
    pub voucher: Voucher,
    pub sig: Signature,
}

pub struct PaymentChannel;

impl Adjudicator for PaymentChannel {
    fn adjudicate(
        &self,
        channel: &Channel,
        candidate: &State,
        proofs: &[State],
    ) -> Result<Outcome, AdjudicatorError> {
        let signed: SignedVoucher = candidate.decode_data()?;

        let hash = codec::to_hash(&signed.voucher)?;
        if recover(hash, signed.sig)? != channel.participants[HOST] {
            return Err(AdjudicatorError::InvalidSignature);
        }

        match proofs {
            [] => {}
            [proof] => {
                let prev: SignedVoucher = proof.decode_data()?;
                if signed.voucher.version <= prev.voucher.version {
                    return Err(AdjudicatorError::VersionNotHigher);
                }
            }
            _ => return Err(AdjudicatorError::InvalidProofCount),
        }

        let pool = U256::from(POOL);
        let payment = signed.voucher.payment.amount;
        if payment > pool {
            return Err(AdjudicatorError::PaymentExceedsPool);
        }
        Ok(payout(candidate, pool - payment, payment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::Signer;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    struct Fixture {
        channel: Channel,
        host: Signer,
        guest: Signer,
    }

    fn fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(31);
        let host = Signer::new(&mut rng);
        let guest = Signer::new(&mut rng);
        let channel = Channel {
            participants: [host.address(), guest.address()],
            adjudicator: rng.gen(),
            nonce: 1,
        };
        Fixture {
            channel,
            host,
            guest,
        }
    }

    fn voucher_envelope(signer: &Signer, version: u64, amount: u64) -> State {
        let voucher = Voucher {
            version,
            payment: Asset {
                token: Default::default(),
                amount: amount.into(),
            },
        };
        let sig = signer.sign(codec::to_hash(&voucher).unwrap());
        State::new(&SignedVoucher { voucher, sig }, [Asset::default(); 2]).unwrap()
    }

    #[test]
    fn newer_voucher_supersedes_the_proof() {
        let f = fixture();
        let v1 = voucher_envelope(&f.host, 1, 10);
        let v2 = voucher_envelope(&f.host, 2, 20);

        let outcome = PaymentChannel
            .adjudicate(&f.channel, &v2, &[v1])
            .unwrap();
        assert_eq!(outcome[0].amount, 80.into());
        assert_eq!(outcome[1].amount, 20.into());
    }

    #[test]
    fn stale_voucher_over_newer_proof_is_rejected() {
        let f = fixture();
        let v1 = voucher_envelope(&f.host, 1, 10);
        let v2 = voucher_envelope(&f.host, 2, 20);

        assert_eq!(
            PaymentChannel.adjudicate(&f.channel, &v1, &[v2]),
            Err(AdjudicatorError::VersionNotHigher)
        );
    }

    #[test]
    fn guest_signed_voucher_is_rejected() {
        let f = fixture();
        let v1 = voucher_envelope(&f.guest, 1, 10);
        assert_eq!(
            PaymentChannel.adjudicate(&f.channel, &v1, &[]),
            Err(AdjudicatorError::InvalidSignature)
        );
    }

    #[test]
    fn payment_above_the_pool_is_rejected() {
        let f = fixture();
        let v1 = voucher_envelope(&f.host, 1, 101);
        assert_eq!(
            PaymentChannel.adjudicate(&f.channel, &v1, &[]),
            Err(AdjudicatorError::PaymentExceedsPool)
        );
    }

    #[test]
    fn outcome_amounts_always_sum_to_the_pool() {
        let f = fixture();
        for (version, amount) in [(1u64, 0u64), (2, 50), (3, 100)] {
            let v = voucher_envelope(&f.host, version, amount);
            let outcome = PaymentChannel.adjudicate(&f.channel, &v, &[]).unwrap();
            assert_eq!(outcome[0].amount + outcome[1].amount, POOL.into());
        }
    }
}
