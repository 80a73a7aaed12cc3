// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::StoragePower;

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct AwardBlockRewardParams {
    pub miner: Address,
    pub penalty: TokenAmount,
    pub gas_reward: TokenAmount,
    pub win_count: i64,
    pub share_count: i64,
    pub retrieval_pledged: TokenAmount,
}

/// Amounts actually delivered by one block reward award. A component whose send
/// failed is reported as zero and its amount is counted in `send_failed` instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct AwardBlockRewardReturn {
    pub power_reward: TokenAmount,
    pub gas_reward: TokenAmount,
    pub vote_reward: TokenAmount,
    pub expert_reward: TokenAmount,
    pub knowledge_reward: TokenAmount,
    pub bandwidth_reward: TokenAmount,
    pub send_failed: TokenAmount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ThisEpochRewardReturn {
    pub this_epoch_reward: TokenAmount,
    #[serde(with = "bigint_ser")]
    pub this_epoch_realized_power: StoragePower,
    pub epoch: ChainEpoch,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct UpdateNetworkKPIParams {
    #[serde(with = "bigint_ser")]
    pub curr_realized_power: StoragePower,
}
