// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use epik_actors_runtime::runtime::builtins::Type;
use epik_actors_runtime::runtime::{ActorCode, Runtime};
use epik_actors_runtime::{
    actor_error, cbor, require_non_negative, ActorContext, ActorError, AsActorError,
    REWARD_ACTOR_ADDR, SYSTEM_ACTOR_ADDR,
};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use fvm_shared::error::ExitCode;
use fvm_shared::{MethodNum, METHOD_CONSTRUCTOR, METHOD_SEND};
use log::{debug, info};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

pub use self::state::{ExpertInfo, PoolInfo, State};
pub use self::types::*;

#[doc(hidden)]
pub mod ext;
mod state;
pub mod testing;
mod types;

/// Expert fund actor methods available
#[derive(FromPrimitive)]
#[repr(u64)]
pub enum Method {
    Constructor = METHOD_CONSTRUCTOR,
    ApplyRewards = 2,
    Deposit = 3,
    Claim = 4,
    Reset = 5,
    NotifyVote = 6,
    CheckExpert = 7,
}

/// Expert Fund Actor
pub struct Actor;
impl Actor {
    fn constructor<BS, RT>(rt: &mut RT) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_is(std::iter::once(&SYSTEM_ACTOR_ADDR))?;
        let st = State::new(rt.store()).context_code(
            ExitCode::USR_ILLEGAL_STATE,
            "failed to construct expert fund state",
        )?;
        rt.create(&st)?;
        Ok(())
    }

    /// Receives the expert share of a block reward. Nothing is recorded here; the
    /// next pool update picks the new balance up.
    fn apply_rewards<BS, RT>(rt: &mut RT) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_is(std::iter::once(&REWARD_ACTOR_ADDR))?;
        debug!(
            "expert fund received {} at epoch {}",
            rt.message().value_received(),
            rt.curr_epoch()
        );
        Ok(())
    }

    fn deposit<BS, RT>(rt: &mut RT, params: DepositParams) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_type(std::iter::once(&Type::Expert))?;
        let expert = rt.message().caller();
        let curr_epoch = rt.curr_epoch();
        let balance = rt.current_balance();
        let policy = rt.policy().clone();

        rt.transaction(|st: &mut State, rt| {
            st.deposit(
                rt.store(),
                &policy,
                curr_epoch,
                &balance,
                &expert,
                params.weight,
            )
        })
    }

    /// Pays `amount` of the expert's unlocked rewards to the expert's owner.
    fn claim<BS, RT>(rt: &mut RT, params: ClaimFundParams) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        require_non_negative(&params.amount, "claim amount")?;

        let ret = rt
            .send(
                &params.expert,
                ext::expert::CONTROL_ADDRESS_METHOD,
                RawBytes::default(),
                Default::default(),
            )
            .with_context(|| format!("failed to query control address of {}", params.expert))?;
        let control: ext::expert::ControlAddressReturn = ret.deserialize()?;
        rt.validate_immediate_caller_is(std::iter::once(&control.owner))?;

        let curr_epoch = rt.curr_epoch();
        let balance = rt.current_balance();
        let policy = rt.policy().clone();

        rt.transaction(|st: &mut State, rt| {
            st.claim(
                rt.store(),
                &policy,
                curr_epoch,
                &balance,
                &params.expert,
                &params.amount,
            )
        })?;

        if params.amount.is_positive() {
            rt.send(
                &control.owner,
                METHOD_SEND,
                RawBytes::default(),
                params.amount.clone(),
            )
            .context("failed to pay claimed expert funds")?;
        }
        Ok(())
    }

    fn reset<BS, RT>(rt: &mut RT, params: ResetExpertParams) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_accept_any()?;
        let caller = rt.message().caller();
        if !rt.is_granted(&caller, Type::ExpertFund, Method::Reset as u64) {
            return Err(actor_error!(forbidden;
                "caller {} not granted to reset experts", caller));
        }

        let curr_epoch = rt.curr_epoch();
        let balance = rt.current_balance();
        let policy = rt.policy().clone();

        let forfeited = rt.transaction(|st: &mut State, rt| {
            st.reset(
                rt.store(),
                &policy,
                curr_epoch,
                &balance,
                &params.expert,
            )
        })?;
        info!(
            "expert {} reset at epoch {}, forfeited {}",
            params.expert, curr_epoch, forfeited
        );
        Ok(())
    }

    fn notify_vote<BS, RT>(rt: &mut RT, params: NotifyVoteParams) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_type(std::iter::once(&Type::Vote))?;
        rt.transaction(|st: &mut State, rt| {
            st.notify_vote(rt.store(), &params.expert, &params.amount)
        })
    }

    fn check_expert<BS, RT>(
        rt: &mut RT,
        params: CheckExpertParams,
    ) -> Result<CheckExpertReturn, ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        let info = st.get_expert(rt.store(), &params.expert)?;
        let votes = st.expert_votes(rt.store(), &params.expert)?;
        Ok(CheckExpertReturn {
            registered: info.is_some(),
            qualified: votes >= rt.policy().expert_vote_threshold(),
            weight: info.map(|i| i.weight).unwrap_or_default(),
            votes,
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
            Some(Method::ApplyRewards) => {
                Self::apply_rewards(rt)?;
                Ok(RawBytes::default())
            }
            Some(Method::Deposit) => {
                Self::deposit(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::default())
            }
            Some(Method::Claim) => {
                Self::claim(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::default())
            }
            Some(Method::Reset) => {
                Self::reset(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::default())
            }
            Some(Method::NotifyVote) => {
                Self::notify_vote(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::default())
            }
            Some(Method::CheckExpert) => {
                let res = Self::check_expert(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::serialize(res)?)
            }
            None => Err(actor_error!(unhandled_message; "Invalid method")),
        }
    }
}
