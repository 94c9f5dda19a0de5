//! Integration tests for the custody flows.
//!
//! These run the vault on a devnet with real reference services behind it:
//! native deposits and withdrawals, token deposits with approval, and the
//! wrap bridge in both directions.

use custody_contracts::{Devnet, DevnetError, ExternalError, VaultError};
use custody_protocol::config::NetworkProfile;
use custody_protocol::{parse_ether, Amount, AssetId, Identity};

fn ether(s: &str) -> Amount {
    parse_ether(s).unwrap()
}

/// Helper: a devnet with a funded `owner` and a deployed 1000 TTK token.
fn setup() -> (Devnet, Identity, AssetId) {
    let mut devnet = Devnet::new(NetworkProfile::Localhost);
    let owner = Identity::derive("owner");
    devnet.faucet(&owner, ether("100")).unwrap();
    let ttk = devnet.deploy_token("TestToken", "TTK", &owner, ether("1000"));
    (devnet, owner, ttk)
}

// ---------------------------------------------------------------------------
// Native custody
// ---------------------------------------------------------------------------

#[test]
fn deposit_one_ether() {
    let (mut devnet, owner, _) = setup();

    devnet.deposit_eth(&owner, ether("1.0")).unwrap();

    assert_eq!(devnet.vault().eth_balance(&owner), ether("1.0"));
    assert_eq!(devnet.native_balance_of(&owner), ether("99"));
}

#[test]
fn withdraw_ether_returns_funds() {
    let (mut devnet, owner, _) = setup();
    devnet.deposit_eth(&owner, ether("1.0")).unwrap();

    devnet.withdraw_eth(&owner, ether("1.0")).unwrap();

    assert_eq!(devnet.vault().eth_balance(&owner), 0);
    assert_eq!(devnet.native_balance_of(&owner), ether("100"));
    assert_eq!(devnet.native_balance_of(&devnet.vault_address()), 0);
}

#[test]
fn withdraw_more_than_deposited_leaves_everything_unchanged() {
    let (mut devnet, owner, _) = setup();
    devnet.deposit_eth(&owner, ether("1.0")).unwrap();
    let before = devnet.vault().ledger().clone();

    let result = devnet.withdraw_eth(&owner, ether("1.5"));

    assert_eq!(
        result,
        Err(DevnetError::Vault(VaultError::InsufficientBalance {
            available: ether("1.0"),
            requested: ether("1.5"),
        }))
    );
    assert_eq!(devnet.vault().ledger(), &before);
    assert_eq!(devnet.native_balance_of(&owner), ether("99"));
}

#[test]
fn depositors_are_isolated() {
    let (mut devnet, alice, _) = setup();
    let bob = Identity::derive("bob");
    devnet.faucet(&bob, ether("5")).unwrap();

    devnet.deposit_eth(&alice, ether("3")).unwrap();
    devnet.deposit_eth(&bob, ether("2")).unwrap();
    devnet.withdraw_eth(&bob, ether("2")).unwrap();

    assert_eq!(devnet.vault().eth_balance(&alice), ether("3"));
    assert_eq!(devnet.vault().eth_balance(&bob), 0);

    // Bob cannot reach Alice's balance.
    assert!(devnet.withdraw_eth(&bob, 1).is_err());
}

// ---------------------------------------------------------------------------
// Token custody
// ---------------------------------------------------------------------------

#[test]
fn deposit_ten_tokens_with_approval() {
    let (mut devnet, owner, ttk) = setup();

    devnet.approve(&owner, &ttk, ether("10")).unwrap();
    devnet.deposit_erc20(&owner, &ttk, ether("10")).unwrap();

    assert_eq!(devnet.vault().asset_balance(&owner, &ttk), ether("10"));
    assert_eq!(devnet.token_balance_of(&owner, &ttk).unwrap(), ether("990"));
    assert_eq!(
        devnet.token_balance_of(&devnet.vault_address(), &ttk).unwrap(),
        ether("10")
    );
}

#[test]
fn deposit_without_approval_books_nothing() {
    let (mut devnet, owner, ttk) = setup();

    let result = devnet.deposit_erc20(&owner, &ttk, ether("10"));

    assert!(matches!(
        result,
        Err(DevnetError::Vault(VaultError::TransferFailed(
            ExternalError::InsufficientAllowance { .. }
        )))
    ));
    assert!(devnet.vault().ledger().is_empty());
    assert_eq!(devnet.token_balance_of(&owner, &ttk).unwrap(), ether("1000"));
}

#[test]
fn deposit_of_unknown_asset_fails() {
    let (mut devnet, owner, _) = setup();
    let ghost = AssetId::derive("ghost");

    let result = devnet.deposit_erc20(&owner, &ghost, 1);

    assert_eq!(
        result,
        Err(DevnetError::Vault(VaultError::TransferFailed(
            ExternalError::UnknownAsset(ghost)
        )))
    );
}

#[test]
fn withdraw_tokens_returns_them() {
    let (mut devnet, owner, ttk) = setup();
    devnet.approve(&owner, &ttk, ether("10")).unwrap();
    devnet.deposit_erc20(&owner, &ttk, ether("10")).unwrap();

    devnet.withdraw_erc20(&owner, &ttk, ether("4")).unwrap();

    assert_eq!(devnet.vault().asset_balance(&owner, &ttk), ether("6"));
    assert_eq!(devnet.token_balance_of(&owner, &ttk).unwrap(), ether("994"));
}

#[test]
fn paused_token_withdraw_rolls_back() {
    let (mut devnet, owner, ttk) = setup();
    devnet.approve(&owner, &ttk, ether("10")).unwrap();
    devnet.deposit_erc20(&owner, &ttk, ether("10")).unwrap();
    let before = devnet.vault().ledger().clone();

    devnet.token_mut(&ttk).unwrap().set_paused(true);
    let result = devnet.withdraw_erc20(&owner, &ttk, ether("5"));

    assert!(matches!(
        result,
        Err(DevnetError::Vault(VaultError::TransferFailed(
            ExternalError::Rejected { .. }
        )))
    ));
    assert_eq!(devnet.vault().ledger(), &before);
    devnet.check_solvency().unwrap();
}

// ---------------------------------------------------------------------------
// Wrap bridge
// ---------------------------------------------------------------------------

#[test]
fn wrap_two_of_ten() {
    let (mut devnet, owner, _) = setup();
    let weth = devnet.wrapped_token();
    devnet.deposit_eth(&owner, ether("10")).unwrap();

    devnet.wrap_eth_to_weth(&owner, ether("2")).unwrap();

    assert_eq!(devnet.vault().eth_balance(&owner), ether("8"));
    assert_eq!(devnet.vault().asset_balance(&owner, &weth), ether("2"));
}

#[test]
fn wrap_two_then_unwrap_one() {
    let (mut devnet, owner, _) = setup();
    let weth = devnet.wrapped_token();
    devnet.deposit_eth(&owner, ether("10")).unwrap();

    devnet.wrap_eth_to_weth(&owner, ether("2")).unwrap();
    devnet.unwrap_weth_to_eth(&owner, ether("1")).unwrap();

    assert_eq!(devnet.vault().eth_balance(&owner), ether("9"));
    assert_eq!(devnet.vault().asset_balance(&owner, &weth), ether("1"));
    assert_eq!(devnet.chain().weth().native_reserve(), ether("1"));
}

#[test]
fn unwrap_of_wrap_is_identity_on_the_pair() {
    let (mut devnet, owner, _) = setup();
    let weth = devnet.wrapped_token();
    devnet.deposit_eth(&owner, ether("10")).unwrap();

    let pair = |d: &Devnet| (d.vault().eth_balance(&owner), d.vault().asset_balance(&owner, &weth));
    let before = pair(&devnet);

    devnet.wrap_eth_to_weth(&owner, ether("3.25")).unwrap();
    devnet.unwrap_weth_to_eth(&owner, ether("3.25")).unwrap();

    assert_eq!(pair(&devnet), before);
}

#[test]
fn wrapped_balance_can_be_withdrawn_as_token() {
    let (mut devnet, owner, _) = setup();
    let weth = devnet.wrapped_token();
    devnet.deposit_eth(&owner, ether("10")).unwrap();
    devnet.wrap_eth_to_weth(&owner, ether("2")).unwrap();

    devnet.withdraw_erc20(&owner, &weth, ether("2")).unwrap();

    assert_eq!(devnet.token_balance_of(&owner, &weth).unwrap(), ether("2"));
    assert_eq!(devnet.vault().asset_balance(&owner, &weth), 0);
    devnet.check_solvency().unwrap();
}

#[test]
fn paused_wrapper_rolls_back_wrap() {
    let (mut devnet, owner, _) = setup();
    devnet.deposit_eth(&owner, ether("10")).unwrap();
    let before = devnet.vault().ledger().clone();
    devnet.weth_mut().token_mut().set_paused(true);

    let result = devnet.wrap_eth_to_weth(&owner, ether("2"));

    assert!(matches!(
        result,
        Err(DevnetError::Vault(VaultError::TransferFailed(_)))
    ));
    assert_eq!(devnet.vault().ledger(), &before);
    assert_eq!(devnet.native_balance_of(&devnet.vault_address()), ether("10"));
}

#[test]
fn unwrap_beyond_wrapped_balance_rejected() {
    let (mut devnet, owner, _) = setup();
    devnet.deposit_eth(&owner, ether("10")).unwrap();
    devnet.wrap_eth_to_weth(&owner, ether("1")).unwrap();
    let before = devnet.vault().ledger().clone();

    let result = devnet.unwrap_weth_to_eth(&owner, ether("2"));

    assert!(matches!(
        result,
        Err(DevnetError::Vault(VaultError::InsufficientBalance { .. }))
    ));
    assert_eq!(devnet.vault().ledger(), &before);
}
