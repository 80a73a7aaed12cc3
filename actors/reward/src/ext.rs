// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod miner {
    use fvm_ipld_encoding::tuple::*;
    use fvm_shared::econ::TokenAmount;

    pub const APPLY_REWARDS_METHOD: u64 = 14;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct ApplyRewardParams {
        pub reward: TokenAmount,
        pub penalty: TokenAmount,
    }
}

/// The vote, expert, knowledge and retrieval fund actors all accept rewards
/// through a parameterless, payable method with the same number.
pub mod fund {
    pub const APPLY_REWARDS_METHOD: u64 = 2;
}
