//! # Wrap Bridge
//!
//! Moves a depositor's value between the native book and the wrapped-token
//! book, converting the vault's real holdings through the [`WrapService`]
//! along the way. Conversion is 1:1, no fee.
//!
//! Both directions follow the same three steps:
//!
//! 1. debit the source book,
//! 2. convert the vault's holding through the wrap service,
//! 3. credit the destination book.
//!
//! A failure in step 2 restores step 1. A failure in step 3 (overflow)
//! converts the holding back and then restores step 1, so that the vault's
//! real holdings and its books stay in step.
//!
//! Because debit and credit are exact and the conversion is 1:1,
//! `unwrap(wrap(x))` leaves the caller's `(native, wrapped)` pair unchanged.

use tracing::{debug, error, warn};

use custody_protocol::{Amount, Identity};

use crate::external::WrapService;
use crate::vault::{Vault, VaultError};

impl Vault {
    /// `wrapETHToWETH`: converts `amount` of the caller's booked native
    /// balance into booked wrapped-token balance.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InsufficientBalance`] if `amount` exceeds the
    /// caller's native balance. Returns [`VaultError::TransferFailed`] if the
    /// wrap service refused; the native debit is rolled back.
    pub fn wrap_eth_to_weth<W>(
        &mut self,
        caller: &Identity,
        amount: Amount,
        wrapper: &mut W,
    ) -> Result<(), VaultError>
    where
        W: WrapService + ?Sized,
    {
        let wrapped = self.wrapped_token();
        self.ledger.debit_eth(caller, amount)?;

        if let Err(err) = wrapper.wrap(self, &wrapped, amount) {
            self.restore_eth(caller, amount)?;
            warn!(caller = %caller, amount = %amount, error = %err, "wrap rolled back");
            return Err(VaultError::TransferFailed(err));
        }

        if let Err(err) = self.ledger.credit_asset(caller, &wrapped, amount) {
            if let Err(undo) = wrapper.unwrap(self, &wrapped, amount) {
                error!(caller = %caller, amount = %amount, error = %undo, "could not undo wrap after overflow");
            }
            self.restore_eth(caller, amount)?;
            warn!(caller = %caller, amount = %amount, "wrap refused: wrapped credit overflow");
            return Err(err.into());
        }

        debug!(caller = %caller, amount = %amount, asset = %wrapped, "native wrapped");
        Ok(())
    }

    /// `unwrapWETHToETH`: converts `amount` of the caller's booked
    /// wrapped-token balance back into booked native balance.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InsufficientBalance`] if `amount` exceeds the
    /// caller's wrapped-token balance. Returns [`VaultError::TransferFailed`]
    /// if the wrap service refused; the wrapped debit is rolled back.
    pub fn unwrap_weth_to_eth<W>(
        &mut self,
        caller: &Identity,
        amount: Amount,
        wrapper: &mut W,
    ) -> Result<(), VaultError>
    where
        W: WrapService + ?Sized,
    {
        let wrapped = self.wrapped_token();
        self.ledger.debit_asset(caller, &wrapped, amount)?;

        if let Err(err) = wrapper.unwrap(self, &wrapped, amount) {
            self.restore_asset(caller, &wrapped, amount)?;
            warn!(caller = %caller, amount = %amount, error = %err, "unwrap rolled back");
            return Err(VaultError::TransferFailed(err));
        }

        if let Err(err) = self.ledger.credit_eth(caller, amount) {
            if let Err(undo) = wrapper.wrap(self, &wrapped, amount) {
                error!(caller = %caller, amount = %amount, error = %undo, "could not undo unwrap after overflow");
            }
            self.restore_asset(caller, &wrapped, amount)?;
            warn!(caller = %caller, amount = %amount, "unwrap refused: native credit overflow");
            return Err(err.into());
        }

        debug!(caller = %caller, amount = %amount, asset = %wrapped, "wrapped unwound to native");
        Ok(())
    }
}
