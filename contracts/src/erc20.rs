//! # Reference Fungible Token
//!
//! An in-memory fungible token with the usual balance/allowance model. The
//! vault never depends on this type directly; it only sees the
//! [`TokenService`](crate::external::TokenService) trait. The devnet uses
//! `Erc20Token` to stand in for real token services.
//!
//! ## Security Model
//!
//! - **Allowance-gated pulls**: `transfer_from` spends the allowance the
//!   owner granted the spender and fails if it is short.
//! - **Supply tracking**: total supply and per-holder balances are updated
//!   together. Overflow is checked on every credit.
//! - **Pause switch**: a paused token refuses every movement. The devnet uses
//!   it to model a token service whose calls revert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use custody_protocol::{Amount, AssetId, Identity};

use crate::external::ExternalError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during token operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The holder does not have enough tokens.
    #[error("insufficient balance: {holder} has {balance}, tried to move {amount}")]
    InsufficientBalance {
        /// The holder being debited.
        holder: Identity,
        /// Current balance of the holder.
        balance: Amount,
        /// Amount the caller tried to move.
        amount: Amount,
    },

    /// The spender's allowance does not cover the pull.
    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}'s tokens, tried {amount}")]
    InsufficientAllowance {
        /// The token owner.
        owner: Identity,
        /// The approved spender.
        spender: Identity,
        /// Remaining allowance.
        allowance: Amount,
        /// Amount the spender tried to pull.
        amount: Amount,
    },

    /// A supply or balance overflow would occur.
    #[error("supply overflow: minting {amount} would exceed u128::MAX")]
    SupplyOverflow {
        /// The amount that was attempted.
        amount: Amount,
    },

    /// The token is paused.
    #[error("token {0} is paused")]
    Paused(String),
}

impl From<TokenError> for ExternalError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientBalance {
                holder,
                balance,
                amount,
            } => ExternalError::InsufficientFunds {
                holder,
                available: balance,
                required: amount,
            },
            TokenError::InsufficientAllowance {
                owner,
                allowance,
                amount,
                ..
            } => ExternalError::InsufficientAllowance {
                owner,
                allowed: allowance,
                required: amount,
            },
            TokenError::SupplyOverflow { .. } => ExternalError::Overflow,
            TokenError::Paused(symbol) => ExternalError::Rejected {
                target: symbol,
                reason: "token is paused".into(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata and supply information for a deployed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Where the token service lives.
    pub id: AssetId,
    /// Human-readable token name (e.g., "TestToken").
    pub name: String,
    /// Ticker symbol (e.g., "TTK").
    pub symbol: String,
    /// Number of decimal places. Display only.
    pub decimals: u8,
    /// Current total supply in the smallest denomination.
    pub total_supply: Amount,
    /// Timestamp when the token was deployed.
    pub created_at: DateTime<Utc>,
}

/// An in-memory fungible token.
#[derive(Debug, Clone)]
pub struct Erc20Token {
    info: TokenInfo,
    balances: HashMap<Identity, Amount>,
    /// `(owner, spender) -> remaining allowance`.
    allowances: HashMap<(Identity, Identity), Amount>,
    paused: bool,
}

impl Erc20Token {
    /// Creates a token with zero supply.
    pub fn new(id: AssetId, name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            info: TokenInfo {
                id,
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
                total_supply: 0,
                created_at: Utc::now(),
            },
            balances: HashMap::new(),
            allowances: HashMap::new(),
            paused: false,
        }
    }

    /// Creates a token and mints `initial_balance` to `initial_account`.
    pub fn with_supply(
        id: AssetId,
        name: &str,
        symbol: &str,
        decimals: u8,
        initial_account: &Identity,
        initial_balance: Amount,
    ) -> Self {
        let mut token = Self::new(id, name, symbol, decimals);
        // A fresh token cannot overflow on its first mint.
        token.balances.insert(*initial_account, initial_balance);
        token.info.total_supply = initial_balance;
        token
    }

    /// Returns the token's metadata.
    pub fn info(&self) -> &TokenInfo {
        &self.info
    }

    /// The asset id this token is deployed at.
    pub fn id(&self) -> AssetId {
        self.info.id
    }

    /// Current total supply.
    pub fn total_supply(&self) -> Amount {
        self.info.total_supply
    }

    /// Returns the balance of `holder`, or 0.
    pub fn balance_of(&self, holder: &Identity) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Returns what `spender` may still pull from `owner`.
    pub fn allowance(&self, owner: &Identity, spender: &Identity) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Returns `true` if the token refuses movements.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes the token.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Sets the allowance of `spender` over `owner`'s tokens (replacing any
    /// previous value).
    pub fn approve(&mut self, owner: &Identity, spender: &Identity, amount: Amount) {
        self.allowances.insert((*owner, *spender), amount);
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Paused`] if the token is paused.
    /// Returns [`TokenError::InsufficientBalance`] if `from` is short.
    pub fn transfer(&mut self, from: &Identity, to: &Identity, amount: Amount) -> Result<(), TokenError> {
        self.check_live()?;
        self.move_balance(from, to, amount)
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, spending
    /// the allowance `from` granted `spender`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Paused`] if the token is paused.
    /// Returns [`TokenError::InsufficientAllowance`] if the allowance is short.
    /// Returns [`TokenError::InsufficientBalance`] if `from` is short.
    pub fn transfer_from(
        &mut self,
        spender: &Identity,
        from: &Identity,
        to: &Identity,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.check_live()?;

        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                spender: *spender,
                allowance,
                amount,
            });
        }

        self.move_balance(from, to, amount)?;
        self.allowances.insert((*from, *spender), allowance - amount);
        Ok(())
    }

    /// Creates `amount` new tokens for `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::SupplyOverflow`] if supply or the balance would
    /// overflow.
    pub fn mint(&mut self, to: &Identity, amount: Amount) -> Result<(), TokenError> {
        let new_supply = self
            .info
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;

        self.info.total_supply = new_supply;
        self.balances.insert(*to, new_balance);
        Ok(())
    }

    /// Destroys `amount` of `from`'s tokens.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InsufficientBalance`] if `from` doesn't have enough.
    pub fn burn(&mut self, from: &Identity, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                balance,
                amount,
            });
        }

        self.balances.insert(*from, balance - amount);
        self.info.total_supply = self.info.total_supply.saturating_sub(amount);
        Ok(())
    }

    fn check_live(&self) -> Result<(), TokenError> {
        if self.paused {
            return Err(TokenError::Paused(self.info.symbol.clone()));
        }
        Ok(())
    }

    fn move_balance(&mut self, from: &Identity, to: &Identity, amount: Amount) -> Result<(), TokenError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                balance: from_balance,
                amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;

        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, to_balance);
        Ok(())
    }
}
