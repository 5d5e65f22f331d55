//! Shared fixtures: an in-memory token ledger and a warpable clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arcade_channels::custody::Clock;
use arcade_channels::token::TokenLedger;
use arcade_channels::{Address, U256};

/// In-memory fungible token. `transfer` spends from the custody account the
/// ledger was built with, mirroring how the real token sees the custody as
/// the caller of payouts.
pub struct TestToken {
    custody: Address,
    balances: Mutex<HashMap<Address, U256>>,
}

impl TestToken {
    pub fn new(custody: Address, initial: &[(Address, u64)]) -> Self {
        let balances = initial
            .iter()
            .map(|(addr, amount)| (*addr, U256::from(*amount)))
            .collect();
        Self {
            custody,
            balances: Mutex::new(balances),
        }
    }

    pub fn balance(&self, addr: Address) -> U256 {
        self.balances
            .lock()
            .unwrap()
            .get(&addr)
            .copied()
            .unwrap_or_default()
    }

    fn move_funds(&self, from: Address, to: Address, amount: U256) -> bool {
        let mut balances = self.balances.lock().unwrap();
        let available = balances.get(&from).copied().unwrap_or_default();
        if available < amount {
            return false;
        }
        balances.insert(from, available - amount);
        let dest = balances.get(&to).copied().unwrap_or_default();
        balances.insert(to, dest + amount);
        true
    }
}

impl TokenLedger for TestToken {
    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> bool {
        self.move_funds(from, to, amount)
    }

    fn transfer(&self, to: Address, amount: U256) -> bool {
        self.move_funds(self.custody, to, amount)
    }
}

/// Clock the test advances by hand.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
