//! # External Collaborators
//!
//! The vault makes exactly one external call per custody or bridge
//! operation, through one of three traits:
//!
//! | Trait              | Capability                                    |
//! |--------------------|-----------------------------------------------|
//! | [`NativeTransfer`] | push native currency from the vault to someone |
//! | [`TokenService`]   | pull tokens into the vault, push tokens out    |
//! | [`WrapService`]    | convert held native into wrapped token and back |
//!
//! Every method receives the calling vault as `&mut Vault`. That is the
//! re-entrancy channel: a recipient or token implementation may call back
//! into the vault while the outer operation is still in flight. The vault
//! orders its ledger writes so that such a callback only ever sees settled
//! books (see [`crate::eth_custody`]).
//!
//! An implementation that hands the vault to foreign code and then reports
//! failure must also undo whatever that code did to the vault. A failed call
//! leaves no effects behind, the ones nested inside it included.
//!
//! Failures come back as [`ExternalError`]. The vault never inspects the
//! variant to decide what to do: any error means "the call did not happen",
//! and the operation rolls back.

use thiserror::Error;

use custody_protocol::{Amount, AssetId, Identity};

use crate::vault::Vault;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an external call did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    /// The callee refused the call outright (a recipient without a receive
    /// path, a paused token, a reverting hook).
    #[error("call rejected by {target}: {reason}")]
    Rejected {
        /// Who rejected it.
        target: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The payer does not hold enough of the asset being moved.
    #[error("insufficient funds: {holder} holds {available}, transfer needs {required}")]
    InsufficientFunds {
        /// The account that was short.
        holder: Identity,
        /// What it holds.
        available: Amount,
        /// What the transfer needed.
        required: Amount,
    },

    /// The vault was not approved to pull this much.
    #[error("insufficient allowance: {owner} approved {allowed}, transfer needs {required}")]
    InsufficientAllowance {
        /// The token owner.
        owner: Identity,
        /// The remaining approval.
        allowed: Amount,
        /// What the transfer needed.
        required: Amount,
    },

    /// No token service is deployed at this asset id.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    /// The callee's own bookkeeping would overflow.
    #[error("arithmetic overflow inside external service")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Pushes native currency out of the vault.
pub trait NativeTransfer {
    /// Sends `amount` of the vault's native holding to `to`.
    fn send_native(
        &mut self,
        vault: &mut Vault,
        to: &Identity,
        amount: Amount,
    ) -> Result<(), ExternalError>;
}

/// A fungible-token service keyed by [`AssetId`].
pub trait TokenService {
    /// Pulls `amount` of `asset` from `from` into the vault, spending the
    /// allowance `from` granted the vault.
    fn transfer_from(
        &mut self,
        vault: &mut Vault,
        asset: &AssetId,
        from: &Identity,
        amount: Amount,
    ) -> Result<(), ExternalError>;

    /// Pushes `amount` of `asset` from the vault to `to`.
    fn transfer(
        &mut self,
        vault: &mut Vault,
        asset: &AssetId,
        to: &Identity,
        amount: Amount,
    ) -> Result<(), ExternalError>;
}

/// Converts between native currency and its wrapped token, 1:1.
pub trait WrapService {
    /// Turns `amount` of the vault's native holding into `amount` of the
    /// `wrapped` token, held by the vault.
    fn wrap(
        &mut self,
        vault: &mut Vault,
        wrapped: &AssetId,
        amount: Amount,
    ) -> Result<(), ExternalError>;

    /// Turns `amount` of the vault's `wrapped` token back into native
    /// currency, held by the vault.
    fn unwrap(
        &mut self,
        vault: &mut Vault,
        wrapped: &AssetId,
        amount: Amount,
    ) -> Result<(), ExternalError>;
}
