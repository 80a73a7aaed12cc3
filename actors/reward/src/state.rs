// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::tuple::*;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::StoragePower;

use crate::logic::compute_reward;
use crate::AwardBlockRewardReturn;

/// Reward actor state
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    /// The reward to be paid in total to block producers of this epoch, divided
    /// among them by share count.
    pub this_epoch_reward: TokenAmount,

    /// Realized power last reported by the power actor.
    #[serde(with = "bigint_ser")]
    pub this_epoch_realized_power: StoragePower,

    /// Epoch `this_epoch_reward` was computed for.
    pub epoch: ChainEpoch,

    // Running totals of rewards successfully delivered, per recipient category.
    // Gas rewards are passed through to miners and not counted here.
    pub total_storage_power_reward: TokenAmount,
    pub total_vote_reward: TokenAmount,
    pub total_expert_reward: TokenAmount,
    pub total_knowledge_reward: TokenAmount,
    pub total_retrieval_reward: TokenAmount,
}

impl State {
    pub fn new() -> Self {
        Self {
            this_epoch_reward: compute_reward(0),
            ..Default::default()
        }
    }

    /// Steps the state forward one epoch at a time until it reaches `curr_epoch`.
    pub(super) fn advance_to(&mut self, curr_epoch: ChainEpoch) {
        while self.epoch < curr_epoch {
            self.epoch += 1;
            self.this_epoch_reward = compute_reward(self.epoch);
        }
    }

    /// Adds the delivered amounts of one award to the running totals.
    pub(super) fn record_distribution(&mut self, delivered: &AwardBlockRewardReturn) {
        self.total_storage_power_reward += &delivered.power_reward;
        self.total_vote_reward += &delivered.vote_reward;
        self.total_expert_reward += &delivered.expert_reward;
        self.total_knowledge_reward += &delivered.knowledge_reward;
        self.total_retrieval_reward += &delivered.bandwidth_reward;
    }
}
