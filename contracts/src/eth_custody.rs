//! # Native Currency Custody
//!
//! `deposit_eth` and `withdraw_eth`.
//!
//! ## Ordering
//!
//! A deposit has no external call: the substrate moved the attached value
//! into the vault atomically with the call, so the vault only books it.
//!
//! A withdrawal debits first and sends second. The send hands control to
//! the recipient, and the recipient can call straight back into the vault
//! (the `&mut Vault` argument of [`NativeTransfer::send_native`]). Because
//! the debit has already landed, a re-entrant withdraw sees the reduced
//! balance and cannot spend the same funds twice. If the send fails, the
//! debit is given back and the call reports `TransferFailed`.

use tracing::{debug, warn};

use custody_protocol::{Amount, Identity};

use crate::external::NativeTransfer;
use crate::vault::{Vault, VaultError};

impl Vault {
    /// `depositETH`: books `amount` of native currency for `caller`.
    ///
    /// `amount` must be the value the substrate actually attached to this
    /// call. The vault trusts the substrate for that, the same way a
    /// contract trusts its `msg.value`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ArithmeticOverflow`] if the credit would
    /// exceed `u128::MAX`. The caller (substrate) must then return the value.
    pub fn deposit_eth(&mut self, caller: &Identity, amount: Amount) -> Result<(), VaultError> {
        let balance = self.ledger.credit_eth(caller, amount)?;
        debug!(caller = %caller, amount = %amount, balance = %balance, "native deposit booked");
        Ok(())
    }

    /// `withdrawETH`: debits `caller` and sends them `amount` of native
    /// currency.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InsufficientBalance`] if `amount` exceeds the
    /// caller's booked balance. Returns [`VaultError::TransferFailed`] if the
    /// send did not complete; the debit is rolled back first.
    pub fn withdraw_eth<N>(
        &mut self,
        caller: &Identity,
        amount: Amount,
        native: &mut N,
    ) -> Result<(), VaultError>
    where
        N: NativeTransfer + ?Sized,
    {
        let remaining = self.ledger.debit_eth(caller, amount)?;

        if let Err(err) = native.send_native(self, caller, amount) {
            self.restore_eth(caller, amount)?;
            warn!(caller = %caller, amount = %amount, error = %err, "native withdrawal rolled back");
            return Err(VaultError::TransferFailed(err));
        }

        debug!(caller = %caller, amount = %amount, remaining = %remaining, "native withdrawal sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ExternalError;
    use custody_protocol::AssetId;

    /// Records sends, optionally refusing them.
    struct RecordingSender {
        sent: Vec<(Identity, Amount)>,
        refuse: bool,
        balance_seen_during_send: Option<Amount>,
    }

    impl RecordingSender {
        fn new(refuse: bool) -> Self {
            Self {
                sent: Vec::new(),
                refuse,
                balance_seen_during_send: None,
            }
        }
    }

    impl NativeTransfer for RecordingSender {
        fn send_native(
            &mut self,
            vault: &mut Vault,
            to: &Identity,
            amount: Amount,
        ) -> Result<(), ExternalError> {
            self.balance_seen_during_send = Some(vault.eth_balance(to));
            if self.refuse {
                return Err(ExternalError::Rejected {
                    target: to.to_string(),
                    reason: "no receive path".into(),
                });
            }
            self.sent.push((*to, amount));
            Ok(())
        }
    }

    fn funded_vault(who: &Identity, amount: Amount) -> Vault {
        let mut vault = Vault::new(AssetId::derive("weth"));
        vault.deposit_eth(who, amount).unwrap();
        vault
    }

    #[test]
    fn deposit_books_attached_value() {
        let alice = Identity::derive("alice");
        let vault = funded_vault(&alice, 1_000);
        assert_eq!(vault.eth_balance(&alice), 1_000);
    }

    #[test]
    fn deposit_overflow_rejected() {
        let alice = Identity::derive("alice");
        let mut vault = funded_vault(&alice, u128::MAX);
        let result = vault.deposit_eth(&alice, 1);
        assert!(matches!(result, Err(VaultError::ArithmeticOverflow { .. })));
        assert_eq!(vault.eth_balance(&alice), u128::MAX);
    }

    #[test]
    fn zero_amounts_are_no_ops() {
        let alice = Identity::derive("alice");
        let mut vault = Vault::new(AssetId::derive("weth"));
        let mut sender = RecordingSender::new(false);

        assert_eq!(vault.deposit_eth(&alice, 0), Ok(()));
        assert_eq!(vault.withdraw_eth(&alice, 0, &mut sender), Ok(()));

        assert!(vault.ledger().is_empty());
        assert_eq!(sender.sent, vec![(alice, 0)]);
    }

    #[test]
    fn withdraw_debits_and_sends() {
        let alice = Identity::derive("alice");
        let mut vault = funded_vault(&alice, 1_000);
        let mut sender = RecordingSender::new(false);

        vault.withdraw_eth(&alice, 400, &mut sender).unwrap();

        assert_eq!(vault.eth_balance(&alice), 600);
        assert_eq!(sender.sent, vec![(alice, 400)]);
    }

    #[test]
    fn withdraw_debits_before_sending() {
        let alice = Identity::derive("alice");
        let mut vault = funded_vault(&alice, 1_000);
        let mut sender = RecordingSender::new(false);

        vault.withdraw_eth(&alice, 1_000, &mut sender).unwrap();

        assert_eq!(sender.balance_seen_during_send, Some(0));
    }

    #[test]
    fn withdraw_more_than_balance_rejected_without_sending() {
        let alice = Identity::derive("alice");
        let mut vault = funded_vault(&alice, 100);
        let before = vault.ledger().clone();
        let mut sender = RecordingSender::new(false);

        let result = vault.withdraw_eth(&alice, 101, &mut sender);

        assert_eq!(
            result,
            Err(VaultError::InsufficientBalance {
                available: 100,
                requested: 101
            })
        );
        assert!(sender.sent.is_empty());
        assert_eq!(sender.balance_seen_during_send, None);
        assert_eq!(vault.ledger(), &before);
    }

    #[test]
    fn refused_send_rolls_back_debit() {
        let alice = Identity::derive("alice");
        let mut vault = funded_vault(&alice, 100);
        let before = vault.ledger().clone();
        let mut sender = RecordingSender::new(true);

        let result = vault.withdraw_eth(&alice, 60, &mut sender);

        assert!(matches!(result, Err(VaultError::TransferFailed(_))));
        assert_eq!(vault.ledger(), &before);
    }
}
