//! # Custody Vault Contracts
//!
//! The custodial vault and everything it talks to. The vault holds native
//! currency and fungible tokens for many depositors, books every position in
//! a [`Ledger`](custody_protocol::Ledger), and bridges native balance into
//! its wrapped token and back.
//!
//! - **Vault**: root entity; owns the ledger and the wrapped-token reference.
//! - **ETH Custody**: `deposit_eth` / `withdraw_eth`.
//! - **Token Custody**: `deposit_erc20` / `withdraw_erc20`.
//! - **Wrap Bridge**: `wrap_eth_to_weth` / `unwrap_weth_to_eth`.
//! - **External**: the collaborator traits the vault calls out through.
//! - **Erc20 / Weth / Devnet**: in-memory reference implementations of the
//!   collaborators, and the execution substrate that hosts them.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow: `checked_add` and
//!    checked debits everywhere.
//! 2. Debits happen before the external call; inbound credits happen after
//!    it. A callee that re-enters the vault always sees settled books.
//! 3. Every operation is all-or-nothing. A failed external call is answered
//!    by an explicit compensating ledger write.
//! 4. The caller is always an explicit argument. There is no ambient sender.

pub mod devnet;
pub mod erc20;
pub mod eth_custody;
pub mod external;
pub mod token_custody;
pub mod vault;
pub mod weth;
pub mod wrap_bridge;

pub use devnet::{Chain, Devnet, DevnetError, RecipientHook};
pub use erc20::{Erc20Token, TokenError, TokenInfo};
pub use external::{ExternalError, NativeTransfer, TokenService, WrapService};
pub use vault::{Vault, VaultError};
pub use weth::WrappedNative;
