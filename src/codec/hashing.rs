use super::{to_writer, types::Hash, Error, Writer};

use serde::Serialize;
use sha3::{
    digest::{core_api::CoreWrapper, Output},
    Digest, Keccak256, Keccak256Core,
};

pub struct Keccak256Writer {
    hasher: CoreWrapper<Keccak256Core>,
}

impl Default for Keccak256Writer {
    fn default() -> Self {
        Self {
            hasher: Keccak256::new(),
        }
    }
}

impl Writer for Keccak256Writer {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}

impl Keccak256Writer {
    pub fn finalize(self) -> Output<Keccak256> {
        self.hasher.finalize()
    }
}

/// Keccak256 over the canonical encoding of `value`.
///
/// This is the only hash ever signed or used as a map key: channel ids, state
/// hashes, voucher hashes and the grid-game config hash all go through here.
/// The hash is always taken over the structure itself, never over another
/// hash.
pub fn to_hash<T>(value: &T) -> Result<Hash, Error>
where
    T: Serialize,
{
    let mut writer = Keccak256Writer::default();
    to_writer(value, &mut writer)?;
    Ok(Hash(writer.finalize().into()))
}
