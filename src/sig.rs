//! Creation and verification of recoverable (Ethereum-style) signatures.
//!
//! Participants sign the canonical hash of a state; validators only ever see
//! the hash and the 65-byte signature and recover the signer address from
//! them. Nothing in this crate verifies against a known public key directly,
//! recovery-then-compare is the only verification primitive.

use crate::codec::types::{Address, Hash, Signature};
use k256::{
    ecdsa::{
        recoverable,
        signature::{hazmat::PrehashSigner, Signature as K256Signature},
        SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The recovery byte is not in the `27..=30` range used on the wire.
    #[error("malformed signature")]
    Malformed,
    #[error("signature recovery failed: {0}")]
    Recovery(#[from] k256::ecdsa::Error),
}

/// Add the `\x19Ethereum Signed Message\n<length>` prefix to hash.
///
/// This keeps the signatures compatible with what an on-chain verifier
/// expects from externally signed messages.
fn hash_to_eth_signed_msg_hash(hash: Hash) -> Hash {
    // Packed encoding, so the canonical encoder is not used here.
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.0);
    Hash(hasher.finalize().into())
}

impl From<VerifyingKey> for Address {
    fn from(key: VerifyingKey) -> Self {
        // Convert the key into an EncodedPoint (on the curve), which has the
        // data we need in bytes [1..]. The conversion only panics if the
        // bytes representation of EncodedPoint stops being 65 bytes, which
        // would mean a breaking change of the curve encoding itself.
        let pk_bytes: [u8; 65] = key.to_encoded_point(false).as_bytes().try_into().unwrap();

        // Throw away the first byte, which is not part of the public key. It
        // is added by the uncompressed SEC1 encoding.
        let hash: [u8; 32] = Keccak256::digest(&pk_bytes[1..]).into();

        let mut addr = Address([0; 20]);
        addr.0.copy_from_slice(&hash[32 - 20..]);
        addr
    }
}

/// Holds a private key and signs state hashes with it.
#[derive(Debug)]
pub struct Signer {
    key: SigningKey,
    addr: Address,
}

impl Signer {
    pub fn new(rng: &mut (impl rand::CryptoRng + rand::RngCore)) -> Self {
        let key = SigningKey::random(rng);
        let addr = key.verifying_key().into();
        Self { key, addr }
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    pub fn sign(&self, msg: Hash) -> Signature {
        let hash = hash_to_eth_signed_msg_hash(msg);

        let sig: recoverable::Signature = self
            .key
            .sign_prehash(&hash.0)
            .expect("signing a 32-byte prehash cannot fail");

        // The recoverable signature is already laid out as r || s || v. Only
        // the +27 offset on v is needed for the wire format.
        let mut sig_bytes: [u8; 65] = sig
            .as_bytes()
            .try_into()
            .expect("recoverable signature is 65 bytes");
        debug_assert!(sig_bytes[32] & 0x80 == 0);
        sig_bytes[64] += 27;

        Signature(sig_bytes)
    }
}

/// Recover the address that produced `sig` over `msg`.
///
/// Fails on malformed signatures instead of panicking; adjudicators feed this
/// attacker-controlled bytes.
pub fn recover_signer(msg: Hash, sig: Signature) -> Result<Address, Error> {
    let hash = hash_to_eth_signed_msg_hash(msg);

    // Undo the +27 offset to get back to the raw recovery id.
    let mut sig_bytes: [u8; 65] = sig.0;
    sig_bytes[64] = sig_bytes[64].checked_sub(27).ok_or(Error::Malformed)?;

    let sig = recoverable::Signature::from_bytes(&sig_bytes)?;
    let verifying_key = sig.recover_verifying_key_from_digest_bytes(&hash.0.into())?;
    Ok(verifying_key.into())
}
