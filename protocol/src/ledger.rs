//! # The Balance Ledger
//!
//! The ledger is the only place balances live. It keeps two books:
//!
//! - the **native book**: `Identity → Amount`
//! - the **asset book**: `(Identity, AssetId) → Amount`
//!
//! It is pure bookkeeping. It never moves real funds and never calls out;
//! the vault decides *when* to credit and debit, the ledger only guarantees
//! that each credit and debit is exact.
//!
//! ## Invariants
//!
//! - Every stored value is a valid `u128`. A debit larger than the stored
//!   value is rejected with [`LedgerError::InsufficientBalance`]; a credit
//!   that would pass `u128::MAX` is rejected with [`LedgerError::Overflow`].
//! - A failed call leaves the ledger untouched. Checks happen before writes.
//! - An unknown key reads as zero. A zero balance is indistinguishable from
//!   a key that was never written.
//! - Entries for one identity are never touched by an operation on another.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::address::{AssetId, Identity};
use crate::units::Amount;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Attempted to debit more than the stored balance.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The current balance.
        available: Amount,
        /// The amount that was requested.
        requested: Amount,
    },

    /// A credit would exceed `u128::MAX`.
    ///
    /// Realistic supplies are nowhere near this. Hitting it means a bug
    /// upstream, and the caller must treat it as fatal for the operation.
    #[error("balance overflow: current {current}, credit {credit}")]
    Overflow {
        /// The balance before the failed credit.
        current: Amount,
        /// The amount that caused the overflow.
        credit: Amount,
    },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Per-depositor balance books for native currency and fungible assets.
///
/// All mutation goes through `&mut self`; the owner (the vault) serializes
/// access.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    native: HashMap<Identity, Amount>,
    assets: HashMap<(Identity, AssetId), Amount>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Native book
    // -----------------------------------------------------------------------

    /// Returns the native balance of `id`, or zero.
    pub fn eth_balance(&self, id: &Identity) -> Amount {
        self.native.get(id).copied().unwrap_or(0)
    }

    /// Credits native currency to `id` and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the credit would exceed `u128::MAX`.
    pub fn credit_eth(&mut self, id: &Identity, amount: Amount) -> Result<Amount, LedgerError> {
        credit_entry(&mut self.native, *id, amount)
    }

    /// Debits native currency from `id` and returns the remaining balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if `amount` exceeds the
    /// stored balance.
    pub fn debit_eth(&mut self, id: &Identity, amount: Amount) -> Result<Amount, LedgerError> {
        debit_entry(&mut self.native, *id, amount)
    }

    /// Sum of the native book. The vault's real native holding must never
    /// be below this.
    pub fn total_eth(&self) -> Amount {
        self.native
            .values()
            .fold(0, |acc: Amount, v| acc.saturating_add(*v))
    }

    // -----------------------------------------------------------------------
    // Asset book
    // -----------------------------------------------------------------------

    /// Returns the balance of `asset` held for `id`, or zero.
    pub fn asset_balance(&self, id: &Identity, asset: &AssetId) -> Amount {
        self.assets.get(&(*id, *asset)).copied().unwrap_or(0)
    }

    /// Credits `amount` of `asset` to `id` and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the credit would exceed `u128::MAX`.
    pub fn credit_asset(
        &mut self,
        id: &Identity,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        credit_entry(&mut self.assets, (*id, *asset), amount)
    }

    /// Debits `amount` of `asset` from `id` and returns the remaining balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if `amount` exceeds the
    /// stored balance.
    pub fn debit_asset(
        &mut self,
        id: &Identity,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        debit_entry(&mut self.assets, (*id, *asset), amount)
    }

    /// Sum of the asset book for one asset.
    pub fn total_asset(&self, asset: &AssetId) -> Amount {
        self.assets
            .iter()
            .filter(|((_, a), _)| a == asset)
            .fold(0, |acc: Amount, (_, v)| acc.saturating_add(*v))
    }

    /// All non-zero asset positions of `id`, sorted by asset.
    pub fn asset_positions(&self, id: &Identity) -> Vec<(AssetId, Amount)> {
        let mut positions: Vec<(AssetId, Amount)> = self
            .assets
            .iter()
            .filter(|((owner, _), v)| owner == id && **v > 0)
            .map(|((_, asset), v)| (*asset, *v))
            .collect();
        positions.sort_by_key(|(asset, _)| *asset);
        positions
    }

    /// Every asset that has ever been credited to anyone.
    pub fn known_assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self
            .assets
            .keys()
            .map(|(_, asset)| *asset)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        assets.sort();
        assets
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Number of identities with a non-zero balance in either book.
    pub fn depositor_count(&self) -> usize {
        let native = self
            .native
            .iter()
            .filter(|(_, v)| **v > 0)
            .map(|(id, _)| *id);
        let assets = self
            .assets
            .iter()
            .filter(|(_, v)| **v > 0)
            .map(|((id, _), _)| *id);
        native.chain(assets).collect::<HashSet<_>>().len()
    }

    /// Returns `true` if no balance has ever been credited.
    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.assets.is_empty()
    }
}

fn credit_entry<K>(book: &mut HashMap<K, Amount>, key: K, amount: Amount) -> Result<Amount, LedgerError>
where
    K: std::hash::Hash + Eq,
{
    let current = book.get(&key).copied().unwrap_or(0);
    let updated = current
        .checked_add(amount)
        .ok_or(LedgerError::Overflow {
            current,
            credit: amount,
        })?;
    // Zero credits never materialize an entry.
    if amount > 0 {
        book.insert(key, updated);
    }
    Ok(updated)
}

fn debit_entry<K>(book: &mut HashMap<K, Amount>, key: K, amount: Amount) -> Result<Amount, LedgerError>
where
    K: std::hash::Hash + Eq,
{
    let current = book.get(&key).copied().unwrap_or(0);
    if current < amount {
        return Err(LedgerError::InsufficientBalance {
            available: current,
            requested: amount,
        });
    }
    let remaining = current - amount;
    if amount > 0 {
        book.insert(key, remaining);
    }
    Ok(remaining)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::derive("alice")
    }

    fn bob() -> Identity {
        Identity::derive("bob")
    }

    fn token() -> AssetId {
        AssetId::derive("token")
    }

    #[test]
    fn credit_creates_new_entry() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.credit_eth(&alice(), 1000).unwrap(), 1000);
        assert_eq!(ledger.eth_balance(&alice()), 1000);
    }

    #[test]
    fn credit_accumulates() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 500).unwrap();
        ledger.credit_eth(&alice(), 300).unwrap();
        assert_eq!(ledger.eth_balance(&alice()), 800);
    }

    #[test]
    fn credit_overflow_rejected_and_entry_unchanged() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), u128::MAX).unwrap();
        let result = ledger.credit_eth(&alice(), 1);
        assert_eq!(
            result,
            Err(LedgerError::Overflow {
                current: u128::MAX,
                credit: 1
            })
        );
        assert_eq!(ledger.eth_balance(&alice()), u128::MAX);
    }

    #[test]
    fn debit_reduces_balance() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 1000).unwrap();
        assert_eq!(ledger.debit_eth(&alice(), 400).unwrap(), 600);
        assert_eq!(ledger.eth_balance(&alice()), 600);
    }

    #[test]
    fn debit_to_zero() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 500).unwrap();
        assert_eq!(ledger.debit_eth(&alice(), 500).unwrap(), 0);
        assert_eq!(ledger.eth_balance(&alice()), 0);
    }

    #[test]
    fn debit_insufficient_balance_leaves_ledger_untouched() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 100).unwrap();
        let before = ledger.clone();

        let result = ledger.debit_eth(&alice(), 200);
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                available: 100,
                requested: 200
            })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn debit_unknown_identity_reports_zero_available() {
        let mut ledger = Ledger::new();
        let result = ledger.debit_asset(&alice(), &token(), 1);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { available: 0, requested: 1 })
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn zero_operations_do_not_create_entries() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 0).unwrap();
        ledger.debit_asset(&alice(), &token(), 0).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn books_are_independent() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 10).unwrap();
        ledger.credit_asset(&alice(), &token(), 20).unwrap();

        assert_eq!(ledger.eth_balance(&alice()), 10);
        assert_eq!(ledger.asset_balance(&alice(), &token()), 20);
        assert_eq!(ledger.asset_balance(&alice(), &AssetId::derive("other")), 0);
    }

    #[test]
    fn identities_are_isolated() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 100).unwrap();
        ledger.credit_asset(&bob(), &token(), 50).unwrap();

        ledger.debit_eth(&alice(), 100).unwrap();
        ledger.credit_asset(&alice(), &token(), 7).unwrap();

        assert_eq!(ledger.eth_balance(&bob()), 0);
        assert_eq!(ledger.asset_balance(&bob(), &token()), 50);
    }

    #[test]
    fn totals_sum_across_identities() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 100).unwrap();
        ledger.credit_eth(&bob(), 250).unwrap();
        ledger.credit_asset(&alice(), &token(), 3).unwrap();
        ledger.credit_asset(&bob(), &token(), 4).unwrap();
        ledger.credit_asset(&bob(), &AssetId::derive("other"), 1000).unwrap();

        assert_eq!(ledger.total_eth(), 350);
        assert_eq!(ledger.total_asset(&token()), 7);
        assert_eq!(ledger.known_assets().len(), 2);
    }

    #[test]
    fn depositor_count_ignores_drained_entries() {
        let mut ledger = Ledger::new();
        ledger.credit_eth(&alice(), 100).unwrap();
        ledger.credit_asset(&alice(), &token(), 5).unwrap();
        ledger.credit_eth(&bob(), 1).unwrap();
        assert_eq!(ledger.depositor_count(), 2);

        ledger.debit_eth(&bob(), 1).unwrap();
        assert_eq!(ledger.depositor_count(), 1);
    }

    #[test]
    fn asset_positions_skip_zero_balances() {
        let mut ledger = Ledger::new();
        let other = AssetId::derive("other");
        ledger.credit_asset(&alice(), &token(), 5).unwrap();
        ledger.credit_asset(&alice(), &other, 9).unwrap();
        ledger.debit_asset(&alice(), &other, 9).unwrap();

        assert_eq!(ledger.asset_positions(&alice()), vec![(token(), 5)]);
    }
}
