//! # Vault
//!
//! The root entity. A vault is constructed once with the [`AssetId`] of the
//! wrapped-native token it bridges into, and from then on it owns the
//! [`Ledger`] outright: the only way to change a balance is through one of
//! the six operations in [`crate::eth_custody`], [`crate::token_custody`]
//! and [`crate::wrap_bridge`].
//!
//! This module holds the struct, its error type, the read-only queries, and
//! the compensating writes the operations use to roll back.

use thiserror::Error;
use tracing::error;

use custody_protocol::{Amount, AssetId, Identity, Ledger, LedgerError};

use crate::external::ExternalError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by vault operations.
///
/// Whatever the variant, the ledger is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The caller asked to move more than their booked balance.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The caller's booked balance.
        available: Amount,
        /// The amount requested.
        requested: Amount,
    },

    /// The one external call of the operation did not complete.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] ExternalError),

    /// A credit would exceed the representable range.
    #[error("arithmetic overflow: current {current}, credit {credit}")]
    ArithmeticOverflow {
        /// The balance before the failed credit.
        current: Amount,
        /// The amount that caused the overflow.
        credit: Amount,
    },

    /// A zero-value request. The vault never returns this itself: its
    /// operations accept zero as a no-op. It is reserved for API frontends
    /// (the node's JSON-RPC surface) that refuse zero-value requests before
    /// reaching the vault.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,
}

impl From<LedgerError> for VaultError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                available,
                requested,
            } => VaultError::InsufficientBalance {
                available,
                requested,
            },
            LedgerError::Overflow { current, credit } => {
                VaultError::ArithmeticOverflow { current, credit }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// A custodial vault for native currency and fungible tokens.
#[derive(Debug, Clone)]
pub struct Vault {
    /// The wrapped-native token service. Fixed at construction.
    wrapped_token: AssetId,
    /// All balances. Exclusively owned.
    pub(crate) ledger: Ledger,
}

impl Vault {
    /// Creates a vault that bridges into `wrapped_token`.
    pub fn new(wrapped_token: AssetId) -> Self {
        Self {
            wrapped_token,
            ledger: Ledger::new(),
        }
    }

    /// The wrapped-native token this vault bridges into.
    pub fn wrapped_token(&self) -> AssetId {
        self.wrapped_token
    }

    /// `getETHBalance`: the caller's booked native balance.
    pub fn eth_balance(&self, caller: &Identity) -> Amount {
        self.ledger.eth_balance(caller)
    }

    /// `getAssetBalance`: the caller's booked balance of `asset`.
    pub fn asset_balance(&self, caller: &Identity, asset: &AssetId) -> Amount {
        self.ledger.asset_balance(caller, asset)
    }

    /// Read-only view of the whole ledger, for solvency checks and operator
    /// tooling.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // -----------------------------------------------------------------------
    // Compensating writes
    // -----------------------------------------------------------------------

    /// Gives back a native debit after the external call it paid for failed.
    pub(crate) fn restore_eth(&mut self, caller: &Identity, amount: Amount) -> Result<(), VaultError> {
        self.ledger.credit_eth(caller, amount).map(|_| ()).map_err(|err| {
            error!(caller = %caller, amount = %amount, error = %err, "native rollback failed");
            VaultError::from(err)
        })
    }

    /// Gives back an asset debit after the external call it paid for failed.
    pub(crate) fn restore_asset(
        &mut self,
        caller: &Identity,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        self.ledger
            .credit_asset(caller, asset, amount)
            .map(|_| ())
            .map_err(|err| {
                error!(caller = %caller, asset = %asset, amount = %amount, error = %err, "asset rollback failed");
                VaultError::from(err)
            })
    }
}
