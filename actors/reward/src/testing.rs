// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use epik_actors_runtime::MessageAccumulator;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;

use crate::State;

#[derive(Default)]
pub struct StateSummary {
    pub total_distributed: TokenAmount,
}

pub fn check_state_invariants(
    state: &State,
    curr_epoch: ChainEpoch,
) -> (StateSummary, MessageAccumulator) {
    let acc = MessageAccumulator::default();

    acc.require(
        state.epoch <= curr_epoch,
        format!(
            "reward state epoch {} is ahead of current epoch {}",
            state.epoch, curr_epoch
        ),
    );
    acc.require(
        !state.this_epoch_reward.is_negative(),
        format!("negative epoch reward {}", state.this_epoch_reward),
    );

    let totals = [
        ("storage power", &state.total_storage_power_reward),
        ("vote", &state.total_vote_reward),
        ("expert", &state.total_expert_reward),
        ("knowledge", &state.total_knowledge_reward),
        ("retrieval", &state.total_retrieval_reward),
    ];
    let mut total_distributed = TokenAmount::default();
    for (category, total) in totals {
        acc.require(
            !total.is_negative(),
            format!("total {} reward is negative: {}", category, total),
        );
        total_distributed += total;
    }

    (StateSummary { total_distributed }, acc)
}
