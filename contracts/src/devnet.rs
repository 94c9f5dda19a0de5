//! # Devnet
//!
//! An in-memory execution substrate for the vault. It owns everything the
//! vault does not: native balances of every account, deployed fungible
//! tokens, the wrapped-native token, and optional recipient hooks. It
//! implements all three collaborator traits, so a [`Vault`] hosted here
//! behaves like one deployed on a real chain.
//!
//! The devnet is split in two:
//!
//! - [`Chain`] is the world outside the vault. It is what the vault calls
//!   out to.
//! - [`Devnet`] pairs a `Chain` with the deployed `Vault` and exposes the
//!   vault's operations with the caller as first argument, attaching native
//!   value where a real transaction would.
//!
//! ## Recipient hooks
//!
//! A [`RecipientHook`] registered for an identity runs whenever the vault
//! sends that identity native currency. The hook receives both the chain and
//! the vault, so it can call back into the vault (re-entrancy) or refuse
//! the payment (a recipient with no receive path). A refusal reverts
//! everything that happened since the send began: the native movement, token
//! and wrapped-native balances, and the vault's ledger, so vault calls nested
//! inside the hook leave no trace. The send then reports failure.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use custody_protocol::config::{NetworkProfile, WEI_PER_ETHER};
use custody_protocol::{Address, Amount, AssetId, Identity};

use crate::erc20::{Erc20Token, TokenInfo};
use crate::external::{ExternalError, NativeTransfer, TokenService, WrapService};
use crate::vault::{Vault, VaultError};
use crate::weth::WrappedNative;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by devnet entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DevnetError {
    /// The vault refused the operation.
    #[error("vault: {0}")]
    Vault(#[from] VaultError),

    /// The substrate itself could not carry the transaction (for example,
    /// the caller cannot pay the value attached to a deposit).
    #[error("substrate: {0}")]
    External(#[from] ExternalError),

    /// No token is deployed at this asset id.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    /// The vault owes more than it holds.
    #[error("insolvent in {asset}: holds {held}, owes {owed}")]
    Insolvent {
        /// `"native"` or the asset id.
        asset: String,
        /// What the vault actually holds.
        held: Amount,
        /// What its ledger says it owes depositors.
        owed: Amount,
    },
}

// ---------------------------------------------------------------------------
// Recipient hooks
// ---------------------------------------------------------------------------

/// Code that runs when an identity receives native currency from the vault.
pub trait RecipientHook: Send {
    /// Called after `amount` has landed in `recipient`'s native balance.
    /// Returning an error refuses the payment.
    fn on_native_received(
        &mut self,
        chain: &mut Chain,
        vault: &mut Vault,
        recipient: &Identity,
        amount: Amount,
    ) -> Result<(), ExternalError>;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Everything outside the vault.
pub struct Chain {
    vault_address: Identity,
    native: HashMap<Identity, Amount>,
    tokens: HashMap<AssetId, Erc20Token>,
    weth: WrappedNative,
    hooks: HashMap<Identity, Box<dyn RecipientHook>>,
    /// Native currency ever created by the faucet.
    minted: Amount,
}

impl Chain {
    fn new(vault_address: Identity, wrapped: AssetId) -> Self {
        Self {
            vault_address,
            native: HashMap::new(),
            tokens: HashMap::new(),
            weth: WrappedNative::new(wrapped),
            hooks: HashMap::new(),
            minted: 0,
        }
    }

    /// The identity the vault is deployed at.
    pub fn vault_address(&self) -> Identity {
        self.vault_address
    }

    /// Native balance of `who`.
    pub fn native_balance_of(&self, who: &Identity) -> Amount {
        self.native.get(who).copied().unwrap_or(0)
    }

    /// Token balance of `holder` in `asset` (the wrapped-native token
    /// included).
    pub fn token_balance_of(&self, holder: &Identity, asset: &AssetId) -> Option<Amount> {
        if *asset == self.weth.id() {
            return Some(self.weth.balance_of(holder));
        }
        self.tokens.get(asset).map(|token| token.balance_of(holder))
    }

    /// The wrapped-native token contract.
    pub fn weth(&self) -> &WrappedNative {
        &self.weth
    }

    /// Moves native currency between two accounts.
    pub fn move_native(&mut self, from: &Identity, to: &Identity, amount: Amount) -> Result<(), ExternalError> {
        let available = self.native_balance_of(from);
        if available < amount {
            return Err(ExternalError::InsufficientFunds {
                holder: *from,
                available,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .native_balance_of(to)
            .checked_add(amount)
            .ok_or(ExternalError::Overflow)?;
        self.native.insert(*from, available - amount);
        self.native.insert(*to, credited);
        Ok(())
    }

    fn mint_native(&mut self, to: &Identity, amount: Amount) -> Result<(), ExternalError> {
        let minted = self.minted.checked_add(amount).ok_or(ExternalError::Overflow)?;
        let balance = self
            .native_balance_of(to)
            .checked_add(amount)
            .ok_or(ExternalError::Overflow)?;
        self.native.insert(*to, balance);
        self.minted = minted;
        Ok(())
    }

    fn token_mut(&mut self, asset: &AssetId) -> Result<&mut Erc20Token, ExternalError> {
        if *asset == self.weth.id() {
            return Ok(self.weth.token_mut());
        }
        self.tokens
            .get_mut(asset)
            .ok_or(ExternalError::UnknownAsset(*asset))
    }
}

impl NativeTransfer for Chain {
    fn send_native(&mut self, vault: &mut Vault, to: &Identity, amount: Amount) -> Result<(), ExternalError> {
        let from = self.vault_address;
        let Some(mut hook) = self.hooks.remove(to) else {
            return self.move_native(&from, to, amount);
        };

        let checkpoint = Checkpoint::take(self, vault);
        let outcome = self
            .move_native(&from, to, amount)
            .and_then(|()| hook.on_native_received(self, vault, to, amount));
        self.hooks.insert(*to, hook);

        if let Err(err) = outcome {
            // Nothing done inside the refused frame survives, nested vault
            // calls included.
            checkpoint.restore(self, vault);
            warn!(recipient = %to, amount = %amount, error = %err, "recipient refused native payment");
            return Err(err);
        }
        Ok(())
    }
}

/// Chain and vault state captured before foreign code runs, so a refused
/// call can be reverted as a whole.
struct Checkpoint {
    native: HashMap<Identity, Amount>,
    tokens: HashMap<AssetId, Erc20Token>,
    weth: WrappedNative,
    vault: Vault,
}

impl Checkpoint {
    fn take(chain: &Chain, vault: &Vault) -> Self {
        Self {
            native: chain.native.clone(),
            tokens: chain.tokens.clone(),
            weth: chain.weth.clone(),
            vault: vault.clone(),
        }
    }

    fn restore(self, chain: &mut Chain, vault: &mut Vault) {
        chain.native = self.native;
        chain.tokens = self.tokens;
        chain.weth = self.weth;
        *vault = self.vault;
    }
}

impl TokenService for Chain {
    fn transfer_from(
        &mut self,
        _vault: &mut Vault,
        asset: &AssetId,
        from: &Identity,
        amount: Amount,
    ) -> Result<(), ExternalError> {
        let spender = self.vault_address;
        let token = self.token_mut(asset)?;
        token.transfer_from(&spender, from, &spender, amount)?;
        Ok(())
    }

    fn transfer(
        &mut self,
        _vault: &mut Vault,
        asset: &AssetId,
        to: &Identity,
        amount: Amount,
    ) -> Result<(), ExternalError> {
        let holder = self.vault_address;
        let token = self.token_mut(asset)?;
        token.transfer(&holder, to, amount)?;
        Ok(())
    }
}

impl WrapService for Chain {
    fn wrap(&mut self, _vault: &mut Vault, wrapped: &AssetId, amount: Amount) -> Result<(), ExternalError> {
        if *wrapped != self.weth.id() {
            return Err(ExternalError::UnknownAsset(*wrapped));
        }
        let holder = self.vault_address;
        let available = self.native_balance_of(&holder);
        if available < amount {
            return Err(ExternalError::InsufficientFunds {
                holder,
                available,
                required: amount,
            });
        }
        self.weth.deposit(&holder, amount)?;
        self.native.insert(holder, available - amount);
        Ok(())
    }

    fn unwrap(&mut self, _vault: &mut Vault, wrapped: &AssetId, amount: Amount) -> Result<(), ExternalError> {
        if *wrapped != self.weth.id() {
            return Err(ExternalError::UnknownAsset(*wrapped));
        }
        let holder = self.vault_address;
        let credited = self
            .native_balance_of(&holder)
            .checked_add(amount)
            .ok_or(ExternalError::Overflow)?;
        // Released native goes straight to the vault's holding. No hook runs
        // for it; the vault books it itself after the call returns.
        self.weth.withdraw(&holder, amount)?;
        self.native.insert(holder, credited);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Devnet
// ---------------------------------------------------------------------------

/// A chain with one deployed vault.
pub struct Devnet {
    profile: NetworkProfile,
    vault: Vault,
    chain: Chain,
}

impl Devnet {
    /// Creates a devnet with the wrapped-native token at its default address.
    pub fn new(profile: NetworkProfile) -> Self {
        Self::with_wrapped_address(profile, Address::derive("wrapped-native"))
    }

    /// Creates a devnet with the wrapped-native token deployed at `wrapped`.
    pub fn with_wrapped_address(profile: NetworkProfile, wrapped: Address) -> Self {
        let wrapped = AssetId::new(wrapped);
        let vault_address = Identity::derive("custody-vault");
        info!(network = %profile, vault = %vault_address, wrapped = %wrapped, "devnet started");
        Self {
            profile,
            vault: Vault::new(wrapped),
            chain: Chain::new(vault_address, wrapped),
        }
    }

    /// The network this devnet stands in for.
    pub fn profile(&self) -> NetworkProfile {
        self.profile
    }

    /// The deployed vault, read-only.
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Everything outside the vault, read-only.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// The identity the vault is deployed at.
    pub fn vault_address(&self) -> Identity {
        self.chain.vault_address
    }

    /// Asset id of the wrapped-native token the vault bridges into.
    pub fn wrapped_token(&self) -> AssetId {
        self.vault.wrapped_token()
    }

    // -----------------------------------------------------------------------
    // Accounts and tokens
    // -----------------------------------------------------------------------

    /// Creates `amount` of native currency for `who`.
    pub fn faucet(&mut self, who: &Identity, amount: Amount) -> Result<(), DevnetError> {
        self.chain.mint_native(who, amount)?;
        debug!(account = %who, amount = %amount, "faucet drip");
        Ok(())
    }

    /// Funds `who` with `ether` whole units of native currency.
    pub fn faucet_ether(&mut self, who: &Identity, ether: u128) -> Result<(), DevnetError> {
        let amount = ether.checked_mul(WEI_PER_ETHER).ok_or(ExternalError::Overflow)?;
        self.faucet(who, amount)
    }

    /// Deploys a new fungible token, minting `initial_balance` to
    /// `initial_account`. Returns the token's asset id.
    pub fn deploy_token(
        &mut self,
        name: &str,
        symbol: &str,
        initial_account: &Identity,
        initial_balance: Amount,
    ) -> AssetId {
        let label = format!("token:{}:{}", symbol, self.chain.tokens.len());
        let id = AssetId::derive(&label);
        let token = Erc20Token::with_supply(
            id,
            name,
            symbol,
            custody_protocol::config::DEFAULT_TOKEN_DECIMALS,
            initial_account,
            initial_balance,
        );
        self.chain.tokens.insert(id, token);
        info!(asset = %id, symbol = symbol, supply = %initial_balance, "token deployed");
        id
    }

    /// Metadata of a deployed token (or of the wrapped-native token).
    pub fn token_info(&self, asset: &AssetId) -> Option<&TokenInfo> {
        if *asset == self.chain.weth.id() {
            return Some(self.chain.weth.token().info());
        }
        self.chain.tokens.get(asset).map(Erc20Token::info)
    }

    /// Every deployed token, sorted by asset id, wrapped-native first.
    pub fn tokens(&self) -> Vec<&TokenInfo> {
        let mut deployed: Vec<&TokenInfo> = self.chain.tokens.values().map(Erc20Token::info).collect();
        deployed.sort_by_key(|info| info.id);
        let mut all = vec![self.chain.weth.token().info()];
        all.extend(deployed);
        all
    }

    /// Lets the vault pull up to `amount` of `owner`'s `asset`.
    pub fn approve(&mut self, owner: &Identity, asset: &AssetId, amount: Amount) -> Result<(), DevnetError> {
        let spender = self.chain.vault_address;
        let token = self
            .chain
            .token_mut(asset)
            .map_err(|_| DevnetError::UnknownAsset(*asset))?;
        token.approve(owner, &spender, amount);
        Ok(())
    }

    /// Native balance of `who` on the chain (not what the vault owes them).
    pub fn native_balance_of(&self, who: &Identity) -> Amount {
        self.chain.native_balance_of(who)
    }

    /// Token balance of `holder`.
    ///
    /// # Errors
    ///
    /// Returns [`DevnetError::UnknownAsset`] if nothing is deployed at `asset`.
    pub fn token_balance_of(&self, holder: &Identity, asset: &AssetId) -> Result<Amount, DevnetError> {
        self.chain
            .token_balance_of(holder, asset)
            .ok_or(DevnetError::UnknownAsset(*asset))
    }

    /// Direct access to a deployed token, for pausing and minting in tests
    /// and operator tooling.
    pub fn token_mut(&mut self, asset: &AssetId) -> Option<&mut Erc20Token> {
        self.chain.token_mut(asset).ok()
    }

    /// Direct access to the wrapped-native token.
    pub fn weth_mut(&mut self) -> &mut WrappedNative {
        &mut self.chain.weth
    }

    /// Runs `hook` whenever the vault pays `who` native currency. Replaces
    /// any hook already registered for `who`.
    pub fn set_recipient_hook(&mut self, who: &Identity, hook: Box<dyn RecipientHook>) {
        self.chain.hooks.insert(*who, hook);
    }

    /// Removes the hook registered for `who`. Returns whether there was one.
    pub fn clear_recipient_hook(&mut self, who: &Identity) -> bool {
        self.chain.hooks.remove(who).is_some()
    }

    // -----------------------------------------------------------------------
    // Vault entry points
    // -----------------------------------------------------------------------

    /// Sends a `depositETH` transaction carrying `amount` of native value.
    pub fn deposit_eth(&mut self, caller: &Identity, amount: Amount) -> Result<(), DevnetError> {
        let vault_address = self.chain.vault_address;
        self.chain.move_native(caller, &vault_address, amount)?;

        if let Err(err) = self.vault.deposit_eth(caller, amount) {
            // The transaction reverted, value goes back with it.
            self.chain.move_native(&vault_address, caller, amount)?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Sends a `withdrawETH` transaction.
    pub fn withdraw_eth(&mut self, caller: &Identity, amount: Amount) -> Result<(), DevnetError> {
        self.vault.withdraw_eth(caller, amount, &mut self.chain)?;
        Ok(())
    }

    /// Sends a `depositERC20` transaction. `caller` must have approved the vault.
    pub fn deposit_erc20(&mut self, caller: &Identity, asset: &AssetId, amount: Amount) -> Result<(), DevnetError> {
        self.vault.deposit_erc20(caller, asset, amount, &mut self.chain)?;
        Ok(())
    }

    /// Sends a `withdrawERC20` transaction.
    pub fn withdraw_erc20(&mut self, caller: &Identity, asset: &AssetId, amount: Amount) -> Result<(), DevnetError> {
        self.vault.withdraw_erc20(caller, asset, amount, &mut self.chain)?;
        Ok(())
    }

    /// Sends a `wrapETHToWETH` transaction.
    pub fn wrap_eth_to_weth(&mut self, caller: &Identity, amount: Amount) -> Result<(), DevnetError> {
        self.vault.wrap_eth_to_weth(caller, amount, &mut self.chain)?;
        Ok(())
    }

    /// Sends an `unwrapWETHToETH` transaction.
    pub fn unwrap_weth_to_eth(&mut self, caller: &Identity, amount: Amount) -> Result<(), DevnetError> {
        self.vault.unwrap_weth_to_eth(caller, amount, &mut self.chain)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------------

    /// Checks that the vault holds at least what its ledger owes, in native
    /// currency and in every asset it has booked.
    pub fn check_solvency(&self) -> Result<(), DevnetError> {
        let ledger = self.vault.ledger();
        let vault_address = self.chain.vault_address;

        let held = self.chain.native_balance_of(&vault_address);
        let owed = ledger.total_eth();
        if held < owed {
            return Err(DevnetError::Insolvent {
                asset: "native".into(),
                held,
                owed,
            });
        }

        for asset in ledger.known_assets() {
            let held = self
                .chain
                .token_balance_of(&vault_address, &asset)
                .unwrap_or(0);
            let owed = ledger.total_asset(&asset);
            if held < owed {
                return Err(DevnetError::Insolvent {
                    asset: asset.to_string(),
                    held,
                    owed,
                });
            }
        }
        Ok(())
    }

    /// Native currency is neither created nor destroyed outside the faucet:
    /// account balances plus the wrapped-native reserve equal everything ever
    /// minted.
    pub fn native_supply_conserved(&self) -> bool {
        let circulating = self
            .chain
            .native
            .values()
            .fold(0u128, |acc, v| acc.saturating_add(*v));
        circulating.saturating_add(self.chain.weth.native_reserve()) == self.chain.minted
    }
}
