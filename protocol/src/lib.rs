// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Custody Protocol Core Library
//!
//! The primitives every other crate in the workspace builds on. Nothing in
//! here talks to the outside world: no transfers, no I/O, no clocks. If a
//! function in this crate can fail, it fails because the arithmetic said no.
//!
//! ## Architecture
//!
//! - **address**: `Identity` and `AssetId`, the two opaque 20-byte keys.
//! - **units**: `Amount` and exact decimal parsing/formatting.
//! - **ledger**: the per-depositor balance books. Sole owner of balances.
//! - **config**: protocol constants and network profiles.
//!
//! ## Design Philosophy
//!
//! 1. Amounts are unsigned integers in the smallest unit. No floats, ever.
//! 2. Every credit is `checked_add`, every debit is checked against the
//!    stored balance before it is applied.
//! 3. A failed ledger operation leaves the ledger exactly as it found it.

pub mod address;
pub mod config;
pub mod ledger;
pub mod units;

pub use address::{Address, AddressError, AssetId, Identity};
pub use ledger::{Ledger, LedgerError};
pub use units::{format_ether, format_units, parse_ether, parse_units, Amount, UnitsError};
