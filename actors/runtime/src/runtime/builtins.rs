// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Identifies the builtin actor types for usage with the
/// actor::resolve_builtin_actor_type syscall.
#[derive(
    PartialEq, Eq, Clone, Copy, PartialOrd, Ord, FromPrimitive, Debug, Hash, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum Type {
    System = 1,
    Init = 2,
    Cron = 3,
    Account = 4,
    Power = 5,
    Miner = 6,
    Market = 7,
    PaymentChannel = 8,
    Multisig = 9,
    Reward = 10,
    Vesting = 11,
    Vote = 12,
    Expert = 13,
    ExpertFund = 14,
    Knowledge = 15,
    Retrieval = 16,
    Govern = 17,
}

impl Type {
    pub fn name(&self) -> &'static str {
        match *self {
            Type::System => "system",
            Type::Init => "init",
            Type::Cron => "cron",
            Type::Account => "account",
            Type::Power => "storagepower",
            Type::Miner => "storageminer",
            Type::Market => "storagemarket",
            Type::PaymentChannel => "paymentchannel",
            Type::Multisig => "multisig",
            Type::Reward => "reward",
            Type::Vesting => "vesting",
            Type::Vote => "vote",
            Type::Expert => "expert",
            Type::ExpertFund => "expertfund",
            Type::Knowledge => "knowledge",
            Type::Retrieval => "retrieval",
            Type::Govern => "govern",
        }
    }
}
