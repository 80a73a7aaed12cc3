// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use epik_actors_runtime::{BalanceTable, MessageAccumulator};
use fvm_ipld_blockstore::Blockstore;
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;

use crate::{ExpertInfo, State};

#[derive(Default)]
pub struct StateSummary {
    pub expert_count: u64,
    pub total_weight: u64,
    pub total_locked: TokenAmount,
    pub total_unlocked: TokenAmount,
}

pub fn check_state_invariants<BS: Blockstore>(
    state: &State,
    store: &BS,
    balance: &TokenAmount,
) -> (StateSummary, MessageAccumulator) {
    let acc = MessageAccumulator::default();
    let mut summary = StateSummary::default();

    match state.load_experts(store) {
        Ok(experts) => {
            let ret = experts.for_each(|key, info: &ExpertInfo| {
                let expert = Address::from_bytes(key)?;
                let acc = acc.with_prefix(format!("expert {}: ", expert));

                acc.require_no_error(
                    info.vesting_funds.check_well_formed(),
                    "malformed vesting funds",
                );
                let vesting = info.vesting_funds.locked_total();
                acc.require(
                    info.locked_funds == vesting,
                    format!(
                        "locked funds {} do not match vesting total {}",
                        info.locked_funds, vesting
                    ),
                );
                acc.require(
                    !info.unlocked_funds.is_negative(),
                    format!("negative unlocked funds {}", info.unlocked_funds),
                );
                acc.require(
                    !info.reward_debt.is_negative(),
                    format!("negative reward debt {}", info.reward_debt),
                );

                summary.expert_count += 1;
                summary.total_weight += info.weight;
                summary.total_locked += &info.locked_funds;
                summary.total_unlocked += &info.unlocked_funds;
                Ok(())
            });
            acc.require_no_error(ret, "error iterating experts");
        }
        Err(e) => acc.add(format!("error loading experts: {}", e)),
    }

    acc.require(
        summary.total_weight == state.total_weight,
        format!(
            "total weight {} does not match sum of expert weights {}",
            state.total_weight, summary.total_weight
        ),
    );
    acc.require(
        &state.last_fund_balance <= balance,
        format!(
            "last fund balance {} exceeds balance {}",
            state.last_fund_balance, balance
        ),
    );
    let owed = &summary.total_locked + &summary.total_unlocked;
    acc.require(
        owed <= state.last_fund_balance,
        format!(
            "expert funds owed {} exceed last fund balance {}",
            owed, state.last_fund_balance
        ),
    );

    match BalanceTable::from_root(store, &state.expert_votes) {
        Ok(votes) => {
            let ret = votes.0.for_each(|key, amount: &TokenAmount| {
                acc.require(
                    !amount.is_negative(),
                    format!("negative votes {} for key {:?}", amount, key),
                );
                Ok(())
            });
            acc.require_no_error(ret, "error iterating expert votes");
        }
        Err(e) => acc.add(format!("error loading expert votes: {}", e)),
    }

    (summary, acc)
}
