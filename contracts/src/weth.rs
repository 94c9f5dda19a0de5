//! # Wrapped Native Token
//!
//! WETH semantics on top of [`Erc20Token`]: native currency paid in mints
//! the same amount of token, tokens burned pay the same amount of native
//! back out. The native paid in is held in `reserve`, so at every point
//! `native_reserve() == total_supply()`.

use custody_protocol::config::{NATIVE_DECIMALS, WRAPPED_NATIVE_NAME, WRAPPED_NATIVE_SYMBOL};
use custody_protocol::{Amount, AssetId, Identity};

use crate::erc20::{Erc20Token, TokenError};

/// The wrapped-native token service.
#[derive(Debug, Clone)]
pub struct WrappedNative {
    token: Erc20Token,
    reserve: Amount,
}

impl WrappedNative {
    /// Deploys an empty wrapped-native token at `id`.
    pub fn new(id: AssetId) -> Self {
        Self {
            token: Erc20Token::new(id, WRAPPED_NATIVE_NAME, WRAPPED_NATIVE_SYMBOL, NATIVE_DECIMALS),
            reserve: 0,
        }
    }

    pub fn id(&self) -> AssetId {
        self.token.id()
    }

    /// Native currency held against outstanding tokens.
    pub fn native_reserve(&self) -> Amount {
        self.reserve
    }

    pub fn total_supply(&self) -> Amount {
        self.token.total_supply()
    }

    pub fn balance_of(&self, holder: &Identity) -> Amount {
        self.token.balance_of(holder)
    }

    pub fn token(&self) -> &Erc20Token {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut Erc20Token {
        &mut self.token
    }

    /// Takes `value` of native currency into the reserve and mints the same
    /// amount to `owner`. The caller is responsible for having moved `value`
    /// out of the payer's native balance.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Paused`] if the token is paused, or
    /// [`TokenError::SupplyOverflow`] if the reserve would overflow.
    pub fn deposit(&mut self, owner: &Identity, value: Amount) -> Result<(), TokenError> {
        if self.token.is_paused() {
            return Err(TokenError::Paused(WRAPPED_NATIVE_SYMBOL.to_string()));
        }
        let reserve = self
            .reserve
            .checked_add(value)
            .ok_or(TokenError::SupplyOverflow { amount: value })?;
        self.token.mint(owner, value)?;
        self.reserve = reserve;
        Ok(())
    }

    /// Burns `amount` of `owner`'s tokens and releases the same amount of
    /// native currency from the reserve. Returns the released amount; the
    /// caller credits it to the owner's native balance.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Paused`] if the token is paused, or
    /// [`TokenError::InsufficientBalance`] if `owner` holds less than `amount`.
    pub fn withdraw(&mut self, owner: &Identity, amount: Amount) -> Result<Amount, TokenError> {
        if self.token.is_paused() {
            return Err(TokenError::Paused(WRAPPED_NATIVE_SYMBOL.to_string()));
        }
        self.token.burn(owner, amount)?;
        self.reserve -= amount;
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_mints_one_to_one() {
        let mut weth = WrappedNative::new(AssetId::derive("weth"));
        let vault = Identity::derive("vault");

        weth.deposit(&vault, 2_000).unwrap();

        assert_eq!(weth.balance_of(&vault), 2_000);
        assert_eq!(weth.native_reserve(), 2_000);
        assert_eq!(weth.total_supply(), weth.native_reserve());
        assert_eq!(weth.token().info().symbol, "WETH");
    }

    #[test]
    fn withdraw_burns_and_releases() {
        let mut weth = WrappedNative::new(AssetId::derive("weth"));
        let vault = Identity::derive("vault");
        weth.deposit(&vault, 2_000).unwrap();

        let released = weth.withdraw(&vault, 500).unwrap();

        assert_eq!(released, 500);
        assert_eq!(weth.balance_of(&vault), 1_500);
        assert_eq!(weth.native_reserve(), 1_500);
        assert_eq!(weth.total_supply(), 1_500);
    }

    #[test]
    fn withdraw_beyond_balance_rejected() {
        let mut weth = WrappedNative::new(AssetId::derive("weth"));
        let vault = Identity::derive("vault");
        weth.deposit(&vault, 10).unwrap();

        let result = weth.withdraw(&vault, 11);

        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(weth.native_reserve(), 10);
    }

    #[test]
    fn paused_refuses_both_directions() {
        let mut weth = WrappedNative::new(AssetId::derive("weth"));
        let vault = Identity::derive("vault");
        weth.deposit(&vault, 10).unwrap();
        weth.token_mut().set_paused(true);

        assert!(weth.deposit(&vault, 1).is_err());
        assert!(weth.withdraw(&vault, 1).is_err());
        assert_eq!(weth.native_reserve(), 10);
    }
}
