//! Fixed-size byte newtypes and the unsigned amount type.
//!
//! All of them serialize through [serialize_bytes][serde::Serializer] so the
//! canonical encoder emits them length-prefixed, and all of them carry a
//! hand-written [Deserialize] visitor so the same types can travel inside the
//! JSON application payloads (which represent byte strings as number arrays).

use core::fmt::Debug;

use rand::{distributions::Standard, prelude::Distribution};
use serde::{de, Deserialize, Serialize};
use uint::construct_uint;

macro_rules! impl_hex_debug {
    ($T:ident) => {
        impl Debug for $T {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("0x")?;
                for b in self.0 {
                    f.write_fmt(format_args!("{:02x}", b))?;
                }
                Ok(())
            }
        }
    };
}

macro_rules! bytesN {
    ( $T:ident, $N:literal ) => {
        #[derive(PartialEq, Eq, Copy, Clone, std::hash::Hash)]
        pub struct $T(pub [u8; $N]);

        impl Serialize for $T {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $T {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct BytesVisitor;

                impl<'de> de::Visitor<'de> for BytesVisitor {
                    type Value = $T;

                    fn expecting(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                        f.write_fmt(format_args!("a byte string of length {}", $N))
                    }

                    fn visit_bytes<E>(self, v: &[u8]) -> Result<$T, E>
                    where
                        E: de::Error,
                    {
                        let bytes: [u8; $N] = v
                            .try_into()
                            .map_err(|_| E::invalid_length(v.len(), &self))?;
                        Ok($T(bytes))
                    }

                    fn visit_seq<A>(self, mut seq: A) -> Result<$T, A::Error>
                    where
                        A: de::SeqAccess<'de>,
                    {
                        let mut bytes = [0u8; $N];
                        for (i, b) in bytes.iter_mut().enumerate() {
                            *b = seq
                                .next_element()?
                                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                        }
                        if seq.next_element::<u8>()?.is_some() {
                            return Err(de::Error::invalid_length($N + 1, &self));
                        }
                        Ok($T(bytes))
                    }
                }

                deserializer.deserialize_bytes(BytesVisitor)
            }
        }

        impl Distribution<$T> for Standard {
            fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> $T {
                $T(rng.gen())
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self([0; $N])
            }
        }

        impl_hex_debug!($T);
    };
}

bytesN!(Hash, 32);
bytesN!(Address, 20);
bytesN!(Signature, 65);

impl Signature {
    /// Build a signature from the 64 `r || s` bytes and the recovery byte.
    pub fn new(rs: &[u8; 64], v: u8) -> Self {
        let mut sig: Signature = Signature([0; 65]);
        sig.0[..64].copy_from_slice(rs);
        sig.0[64] = v;
        sig
    }
}

construct_uint! {
    /// Unsigned 256-bit amount, matching the word size of the ledger the
    /// original contracts ran on.
    pub struct U256(4);
}

impl Serialize for U256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct AmountVisitor;

        impl<'de> de::Visitor<'de> for AmountVisitor {
            type Value = U256;

            fn expecting(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                f.write_str("a big-endian byte string of at most 32 bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<U256, E>
            where
                E: de::Error,
            {
                if v.len() > 32 {
                    return Err(E::invalid_length(v.len(), &self));
                }
                let mut bytes = [0u8; 32];
                bytes[32 - v.len()..].copy_from_slice(v);
                Ok(U256::from_big_endian(&bytes))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<U256, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut buf = Vec::with_capacity(32);
                while let Some(b) = seq.next_element::<u8>()? {
                    if buf.len() == 32 {
                        return Err(de::Error::invalid_length(33, &self));
                    }
                    buf.push(b);
                }
                let mut bytes = [0u8; 32];
                bytes[32 - buf.len()..].copy_from_slice(&buf);
                Ok(U256::from_big_endian(&bytes))
            }
        }

        deserializer.deserialize_bytes(AmountVisitor)
    }
}

impl Distribution<U256> for Standard {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> U256 {
        let buf: [u8; 32] = rng.gen();
        U256::from_big_endian(&buf)
    }
}
