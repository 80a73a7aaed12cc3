// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use epik_actors_runtime::runtime::{ActorCode, Runtime};
use epik_actors_runtime::{
    actor_error, cbor, require_non_negative, ActorError, EXPERT_FUND_ACTOR_ADDR,
    KNOWLEDGE_FUND_ACTOR_ADDR, RETRIEVAL_FUND_ACTOR_ADDR, STORAGE_POWER_ACTOR_ADDR,
    SYSTEM_ACTOR_ADDR, VOTE_FUND_ACTOR_ADDR,
};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use fvm_shared::econ::TokenAmount;
use fvm_shared::{MethodNum, METHOD_CONSTRUCTOR};
use log::{debug, error};
use num_derive::FromPrimitive;
use num_traits::{FromPrimitive, Zero};

pub use self::logic::*;
pub use self::state::State;
pub use self::types::*;

#[doc(hidden)]
pub mod ext;
mod logic;
mod state;
pub mod testing;
mod types;

/// Reward actor methods available
#[derive(FromPrimitive)]
#[repr(u64)]
pub enum Method {
    Constructor = METHOD_CONSTRUCTOR,
    AwardBlockReward = 2,
    ThisEpochReward = 3,
    UpdateNetworkKPI = 4,
}

/// Reward Actor
pub struct Actor;
impl Actor {
    /// Constructor for Reward actor
    fn constructor<BS, RT>(rt: &mut RT) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_is(std::iter::once(&SYSTEM_ACTOR_ADDR))?;
        rt.create(&State::new())?;
        Ok(())
    }

    /// Awards a block reward to the winning miner and the reward funds.
    ///
    /// The gas reward is paid in full before the block reward; when the actor cannot
    /// cover both, the block reward absorbs the shortfall. A send that fails is logged and
    /// reported in `send_failed` instead of aborting the award.
    fn award_block_reward<BS, RT>(
        rt: &mut RT,
        params: AwardBlockRewardParams,
    ) -> Result<AwardBlockRewardReturn, ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_is(std::iter::once(&SYSTEM_ACTOR_ADDR))?;
        let prior_balance = rt.current_balance();

        require_non_negative(&params.penalty, "penalty")?;
        require_non_negative(&params.gas_reward, "gas reward")?;
        if params.share_count <= 0 {
            return Err(actor_error!(illegal_argument;
                "invalid share count {}", params.share_count));
        }
        if params.win_count <= 0 {
            return Err(actor_error!(illegal_argument;
                "invalid win count {}", params.win_count));
        }
        if prior_balance < params.gas_reward {
            return Err(actor_error!(illegal_state;
                "actor current balance {} insufficient to pay gas reward {}",
                prior_balance, params.gas_reward));
        }

        // The split is taken from a snapshot; totals are written in a later transaction.
        let st: State = rt.state()?;
        let policy = rt.policy().clone();

        let mut block_reward =
            TokenAmount::from_atto(st.this_epoch_reward.atto() / params.share_count);
        let mut total_reward = &block_reward + &params.gas_reward;
        if total_reward > prior_balance {
            total_reward = prior_balance;
            block_reward = &total_reward - &params.gas_reward;
        }

        let split = split_block_reward(
            &policy,
            &block_reward,
            &rt.total_circ_supply(),
            &params.retrieval_pledged,
        );
        debug!(
            "award block reward to {}: block {} gas {} split {:?}",
            params.miner, block_reward, params.gas_reward, split
        );

        let mut ret = AwardBlockRewardReturn {
            power_reward: split.power,
            gas_reward: params.gas_reward.clone(),
            vote_reward: split.vote,
            expert_reward: split.expert,
            knowledge_reward: split.knowledge,
            bandwidth_reward: split.bandwidth,
            send_failed: TokenAmount::zero(),
        };

        let miner_reward = &ret.power_reward + &ret.gas_reward;
        let penalty = TokenAmount::from_atto(params.penalty.atto() * policy.penalty_multiplier);
        if miner_reward.is_positive() || penalty.is_positive() {
            let miner_params = cbor::serialize(
                &ext::miner::ApplyRewardParams {
                    reward: miner_reward.clone(),
                    penalty,
                },
                "miner apply rewards params",
            )?;
            if let Err(e) = rt.send(
                &params.miner,
                ext::miner::APPLY_REWARDS_METHOD,
                miner_params,
                miner_reward.clone(),
            ) {
                error!(
                    "failed to send ApplyRewards call to the miner actor {} with funds {}, code: {}",
                    params.miner,
                    miner_reward,
                    e.exit_code()
                );
                ret.send_failed += &miner_reward;
                ret.power_reward = TokenAmount::zero();
                ret.gas_reward = TokenAmount::zero();
            }
        }

        let mut send_failed = TokenAmount::zero();
        for (fund, reward) in [
            (VOTE_FUND_ACTOR_ADDR, &mut ret.vote_reward),
            (EXPERT_FUND_ACTOR_ADDR, &mut ret.expert_reward),
            (KNOWLEDGE_FUND_ACTOR_ADDR, &mut ret.knowledge_reward),
            (RETRIEVAL_FUND_ACTOR_ADDR, &mut ret.bandwidth_reward),
        ] {
            if reward.is_zero() {
                continue;
            }
            if let Err(e) = rt.send(
                &fund,
                ext::fund::APPLY_REWARDS_METHOD,
                RawBytes::default(),
                reward.clone(),
            ) {
                error!(
                    "failed to send ApplyRewards call to the fund actor {} with funds {}, code: {}",
                    fund,
                    reward,
                    e.exit_code()
                );
                send_failed += &*reward;
                *reward = TokenAmount::zero();
            }
        }
        ret.send_failed += send_failed;

        rt.transaction(|st: &mut State, _| {
            st.record_distribution(&ret);
            Ok(())
        })?;

        Ok(ret)
    }

    /// The award value used for the current epoch, updated at the end of an epoch
    /// through cron tick.
    fn this_epoch_reward<BS, RT>(rt: &mut RT) -> Result<ThisEpochRewardReturn, ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        Ok(ThisEpochRewardReturn {
            this_epoch_reward: st.this_epoch_reward,
            this_epoch_realized_power: st.this_epoch_realized_power,
            epoch: st.epoch,
        })
    }

    /// Called at the end of each epoch by the power actor. Records the realized power
    /// and brings the epoch reward up to date with the current epoch.
    fn update_network_kpi<BS, RT>(
        rt: &mut RT,
        params: UpdateNetworkKPIParams,
    ) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_is(std::iter::once(&STORAGE_POWER_ACTOR_ADDR))?;
        let curr_epoch = rt.curr_epoch();

        rt.transaction(|st: &mut State, _| {
            st.this_epoch_realized_power = params.curr_realized_power;
            st.advance_to(curr_epoch);
            Ok(())
        })
    }
}

impl ActorCode for Actor {
    fn invoke_method<BS, RT>(
        rt: &mut RT,
        method: MethodNum,
        params: &RawBytes,
    ) -> Result<RawBytes, ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        match FromPrimitive::from_u64(method) {
            Some(Method::Constructor) => {
                Self::constructor(rt)?;
                Ok(RawBytes::default())
            }
            Some(Method::AwardBlockReward) => {
                let res = Self::award_block_reward(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::serialize(res)?)
            }
            Some(Method::ThisEpochReward) => {
                let res = Self::this_epoch_reward(rt)?;
                Ok(RawBytes::serialize(res)?)
            }
            Some(Method::UpdateNetworkKPI) => {
                Self::update_network_kpi(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::default())
            }
            None => Err(actor_error!(unhandled_message; "Invalid method")),
        }
    }
}
