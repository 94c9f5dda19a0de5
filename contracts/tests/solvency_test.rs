//! Solvency across mixed operation sequences.
//!
//! Whatever mix of successful and failed operations runs, the vault must
//! hold at least what its ledger owes, and native currency must be
//! conserved across accounts and the wrapped-native reserve.

use custody_contracts::Devnet;
use custody_protocol::config::NetworkProfile;
use custody_protocol::{AssetId, Identity};

#[derive(Debug, Clone, Copy)]
enum Step {
    DepositEth(usize, u128),
    WithdrawEth(usize, u128),
    DepositToken(usize, u128),
    WithdrawToken(usize, u128),
    Wrap(usize, u128),
    Unwrap(usize, u128),
    WithdrawWrapped(usize, u128),
}

fn run(steps: &[Step]) -> (Devnet, Vec<Identity>, AssetId) {
    let mut devnet = Devnet::new(NetworkProfile::Devnet);
    let users: Vec<Identity> = ["alice", "bob", "carol"]
        .iter()
        .map(|name| Identity::derive(name))
        .collect();
    let minter = Identity::derive("minter");
    let ttk = devnet.deploy_token("TestToken", "TTK", &minter, 0);

    for user in &users {
        devnet.faucet(user, 1_000).unwrap();
        devnet.token_mut(&ttk).unwrap().mint(user, 1_000).unwrap();
        devnet.approve(user, &ttk, u128::MAX).unwrap();
    }

    let weth = devnet.wrapped_token();
    for step in steps {
        // Failures are expected for some steps; solvency must hold either way.
        let _ = match *step {
            Step::DepositEth(u, a) => devnet.deposit_eth(&users[u], a),
            Step::WithdrawEth(u, a) => devnet.withdraw_eth(&users[u], a),
            Step::DepositToken(u, a) => devnet.deposit_erc20(&users[u], &ttk, a),
            Step::WithdrawToken(u, a) => devnet.withdraw_erc20(&users[u], &ttk, a),
            Step::Wrap(u, a) => devnet.wrap_eth_to_weth(&users[u], a),
            Step::Unwrap(u, a) => devnet.unwrap_weth_to_eth(&users[u], a),
            Step::WithdrawWrapped(u, a) => devnet.withdraw_erc20(&users[u], &weth, a),
        };
        devnet
            .check_solvency()
            .unwrap_or_else(|e| panic!("insolvent after {step:?}: {e}"));
        assert!(devnet.native_supply_conserved(), "native leaked after {step:?}");
    }

    (devnet, users, ttk)
}

#[test]
fn mixed_sequence_stays_solvent() {
    use Step::*;
    let (devnet, users, ttk) = run(&[
        DepositEth(0, 500),
        DepositEth(1, 300),
        DepositToken(2, 700),
        Wrap(0, 200),
        WithdrawEth(1, 400), // too much
        Unwrap(0, 50),
        WithdrawToken(2, 100),
        WithdrawToken(0, 1), // nothing booked
        WithdrawWrapped(0, 100),
        Wrap(1, 300),
        Unwrap(1, 301), // too much
        DepositEth(2, 2_000), // cannot pay
        WithdrawEth(0, 350),
    ]);

    let ledger = devnet.vault().ledger();
    assert_eq!(devnet.vault().eth_balance(&users[0]), 0);
    assert_eq!(devnet.vault().eth_balance(&users[1]), 0);
    assert_eq!(devnet.vault().asset_balance(&users[2], &ttk), 600);
    assert_eq!(ledger.total_asset(&devnet.wrapped_token()), 50 + 300);
}

#[test]
fn full_exit_leaves_vault_empty() {
    use Step::*;
    let (devnet, _, _) = run(&[
        DepositEth(0, 1_000),
        DepositToken(1, 1_000),
        Wrap(0, 400),
        Unwrap(0, 400),
        WithdrawEth(0, 1_000),
        WithdrawToken(1, 1_000),
    ]);

    assert_eq!(devnet.vault().ledger().total_eth(), 0);
    assert_eq!(devnet.native_balance_of(&devnet.vault_address()), 0);
    assert_eq!(devnet.vault().ledger().depositor_count(), 0);
}
