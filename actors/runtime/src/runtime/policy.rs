// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::str::FromStr;

use fvm_shared::econ::TokenAmount;
use serde::{Deserialize, Serialize};

use crate::builtin::network::{EPOCHS_IN_DAY, EPOCHS_IN_HOUR};
use crate::util::VestSpec;

/// A trait for runtime policy configuration
pub trait RuntimePolicy {
    fn policy(&self) -> &Policy;
}

/// Protocol parameters consumed by the reward, vesting and expert fund actors.
///
/// The defaults are the mainnet values. A host may override individual fields
/// from TOML; fields left out keep their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Schedule applied to mining rewards and to expert pool payouts.
    pub reward_vesting_spec: VestSpec,

    /// Shares of each block reward, in units of `reward_share_denominator`.
    pub vote_reward_share: u64,
    pub expert_reward_share: u64,
    /// Knowledge fund share, out of which the bandwidth reward is carved.
    pub knowledge_reward_share: u64,
    pub reward_share_denominator: u64,

    /// Bandwidth reward is `min(pledged * factor, circulating * cap) * block / (circulating * denominator)`.
    pub retrieval_pledge_factor: u64,
    pub retrieval_circulating_cap: u64,
    pub retrieval_reward_denominator: u64,

    /// Multiplier applied to a block penalty before it is forwarded to the miner for burning.
    pub penalty_multiplier: u64,

    /// Fixed-point scale of the expert pool reward-per-share accumulator.
    pub acc_per_share_multiplier: u64,
    /// Votes (in whole tokens) an expert needs to be reported as qualified.
    pub expert_vote_threshold: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            reward_vesting_spec: VestSpec {
                initial_delay: 7 * EPOCHS_IN_DAY,
                vest_period: 7 * EPOCHS_IN_DAY,
                step_duration: EPOCHS_IN_DAY,
                quantization: 12 * EPOCHS_IN_HOUR,
            },
            vote_reward_share: 1,
            expert_reward_share: 9,
            knowledge_reward_share: 15,
            reward_share_denominator: 100,
            retrieval_pledge_factor: 100,
            retrieval_circulating_cap: 75,
            retrieval_reward_denominator: 500,
            penalty_multiplier: 3,
            acc_per_share_multiplier: 1_000_000_000_000,
            expert_vote_threshold: 100_000,
        }
    }
}

impl Policy {
    pub fn expert_vote_threshold(&self) -> TokenAmount {
        TokenAmount::from_whole(self.expert_vote_threshold)
    }
}

impl FromStr for Policy {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}
