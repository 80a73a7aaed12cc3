// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use epik_actors_runtime::{MessageAccumulator, VestingFunds};
use fvm_ipld_blockstore::Blockstore;
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;

use crate::State;

#[derive(Default)]
pub struct StateSummary {
    pub coinbase_count: u64,
    pub total_locked: TokenAmount,
    pub total_unlocked: TokenAmount,
}

/// Checks every coinbase ledger for ordering and sign, and that the actor holds
/// enough balance to pay out everything it owes.
pub fn check_state_invariants<BS: Blockstore>(
    state: &State,
    store: &BS,
    balance: &TokenAmount,
) -> (StateSummary, MessageAccumulator) {
    let acc = MessageAccumulator::default();
    let mut summary = StateSummary::default();

    match state.load_coinbases(store) {
        Ok(coinbases) => {
            let ret = coinbases.for_each(|key, funds: &VestingFunds| {
                let coinbase = Address::from_bytes(key)?;
                let acc = acc.with_prefix(format!("coinbase {}: ", coinbase));
                acc.require_no_error(funds.check_well_formed(), "malformed vesting funds");

                summary.coinbase_count += 1;
                summary.total_locked += funds.locked_total();
                summary.total_unlocked += &funds.unlocked_balance;
                Ok(())
            });
            acc.require_no_error(ret, "error iterating coinbases");
        }
        Err(e) => acc.add(format!("error loading coinbases: {}", e)),
    }

    let owed = &summary.total_locked + &summary.total_unlocked;
    acc.require(
        &owed <= balance,
        format!("vesting funds owed {} exceed balance {}", owed, balance),
    );

    (summary, acc)
}
