//! Boundary to the external fungible-token collaborator.

use crate::codec::types::{Address, U256};

/// Standard transfer capability of the external token.
///
/// Custody treats any `false` return as fatal and aborts the whole call with
/// `TransferFailed`; a token that signals failure by panicking is outside the
/// contract of this trait.
pub trait TokenLedger {
    /// Move `amount` from `from` to `to`, relying on the token's own
    /// allowance rules. Used to collect deposits.
    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> bool;

    /// Move `amount` out of the caller's (custody's) own balance to `to`.
    /// Used to pay out outcomes.
    fn transfer(&self, to: Address, amount: U256) -> bool;
}

impl<T: TokenLedger + ?Sized> TokenLedger for std::sync::Arc<T> {
    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> bool {
        (**self).transfer_from(from, to, amount)
    }

    fn transfer(&self, to: Address, amount: U256) -> bool {
        (**self).transfer(to, amount)
    }
}
