// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_shared::address::Address;
use fvm_shared::ActorID;

pub const SYSTEM_ACTOR_ID: ActorID = 0;
pub const SYSTEM_ACTOR_ADDR: Address = Address::new_id(SYSTEM_ACTOR_ID);

pub const REWARD_ACTOR_ID: ActorID = 2;
pub const REWARD_ACTOR_ADDR: Address = Address::new_id(REWARD_ACTOR_ID);

pub const STORAGE_POWER_ACTOR_ID: ActorID = 4;
pub const STORAGE_POWER_ACTOR_ADDR: Address = Address::new_id(STORAGE_POWER_ACTOR_ID);

pub const VESTING_ACTOR_ID: ActorID = 7;
pub const VESTING_ACTOR_ADDR: Address = Address::new_id(VESTING_ACTOR_ID);

pub const VOTE_FUND_ACTOR_ID: ActorID = 8;
pub const VOTE_FUND_ACTOR_ADDR: Address = Address::new_id(VOTE_FUND_ACTOR_ID);

pub const EXPERT_FUND_ACTOR_ID: ActorID = 9;
pub const EXPERT_FUND_ACTOR_ADDR: Address = Address::new_id(EXPERT_FUND_ACTOR_ID);

pub const KNOWLEDGE_FUND_ACTOR_ID: ActorID = 10;
pub const KNOWLEDGE_FUND_ACTOR_ADDR: Address = Address::new_id(KNOWLEDGE_FUND_ACTOR_ID);

pub const RETRIEVAL_FUND_ACTOR_ID: ActorID = 11;
pub const RETRIEVAL_FUND_ACTOR_ADDR: Address = Address::new_id(RETRIEVAL_FUND_ACTOR_ID);

pub const GOVERN_ACTOR_ID: ActorID = 12;
pub const GOVERN_ACTOR_ADDR: Address = Address::new_id(GOVERN_ACTOR_ID);
