//! # Token Custody
//!
//! `deposit_erc20` and `withdraw_erc20`.
//!
//! Deposits pull first and book second: until the pull succeeds the vault
//! does not have the tokens, and booking them early would overstate the
//! ledger. Withdrawals book first and push second, for the same re-entrancy
//! reason as native withdrawals.

use tracing::{debug, error, warn};

use custody_protocol::{Amount, AssetId, Identity};

use crate::external::TokenService;
use crate::vault::{Vault, VaultError};

impl Vault {
    /// `depositERC20`: pulls `amount` of `asset` from `caller` and books it.
    ///
    /// The caller must have approved the vault for at least `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::TransferFailed`] if the pull did not complete;
    /// nothing is booked. Returns [`VaultError::ArithmeticOverflow`] if the
    /// credit would overflow, after pushing the pulled tokens back.
    pub fn deposit_erc20<T>(
        &mut self,
        caller: &Identity,
        asset: &AssetId,
        amount: Amount,
        tokens: &mut T,
    ) -> Result<(), VaultError>
    where
        T: TokenService + ?Sized,
    {
        tokens.transfer_from(self, asset, caller, amount)?;

        match self.ledger.credit_asset(caller, asset, amount) {
            Ok(balance) => {
                debug!(caller = %caller, asset = %asset, amount = %amount, balance = %balance, "token deposit booked");
                Ok(())
            }
            Err(err) => {
                if let Err(refund) = tokens.transfer(self, asset, caller, amount) {
                    error!(caller = %caller, asset = %asset, amount = %amount, error = %refund, "token refund failed after overflow");
                }
                warn!(caller = %caller, asset = %asset, amount = %amount, "token deposit refused: credit overflow");
                Err(err.into())
            }
        }
    }

    /// `withdrawERC20`: debits `caller` and pushes them `amount` of `asset`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InsufficientBalance`] if `amount` exceeds the
    /// caller's booked balance of `asset`. Returns
    /// [`VaultError::TransferFailed`] if the push did not complete; the debit
    /// is rolled back first.
    pub fn withdraw_erc20<T>(
        &mut self,
        caller: &Identity,
        asset: &AssetId,
        amount: Amount,
        tokens: &mut T,
    ) -> Result<(), VaultError>
    where
        T: TokenService + ?Sized,
    {
        let remaining = self.ledger.debit_asset(caller, asset, amount)?;

        if let Err(err) = tokens.transfer(self, asset, caller, amount) {
            self.restore_asset(caller, asset, amount)?;
            warn!(caller = %caller, asset = %asset, amount = %amount, error = %err, "token withdrawal rolled back");
            return Err(VaultError::TransferFailed(err));
        }

        debug!(caller = %caller, asset = %asset, amount = %amount, remaining = %remaining, "token withdrawal sent");
        Ok(())
    }
}
