// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use epik_actors_runtime::runtime::builtins::Type;
use epik_actors_runtime::runtime::{ActorCode, Runtime};
use epik_actors_runtime::{
    actor_error, cbor, require_non_negative, ActorContext, ActorError, AsActorError,
    SYSTEM_ACTOR_ADDR,
};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use fvm_shared::error::ExitCode;
use fvm_shared::{MethodNum, METHOD_CONSTRUCTOR, METHOD_SEND};
use log::debug;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

pub use self::state::State;
pub use self::types::*;

mod state;
pub mod testing;
mod types;

/// Vesting actor methods available
#[derive(FromPrimitive)]
#[repr(u64)]
pub enum Method {
    Constructor = METHOD_CONSTRUCTOR,
    AddVestingFunds = 2,
    WithdrawBalance = 3,
}

/// Vesting Actor
pub struct Actor;
impl Actor {
    pub fn constructor<BS, RT>(rt: &mut RT) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_is(std::iter::once(&SYSTEM_ACTOR_ADDR))?;

        let st = State::new(rt.store())
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to construct state")?;
        rt.create(&st)?;
        Ok(())
    }

    /// Locks the value sent by a miner under the reward vesting schedule of `coinbase`.
    pub fn add_vesting_funds<BS, RT>(
        rt: &mut RT,
        params: AddVestingFundsParams,
    ) -> Result<(), ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_type(std::iter::once(&Type::Miner))?;

        let amount = rt.message().value_received();
        if amount.is_zero() {
            return Ok(());
        }
        let curr_epoch = rt.curr_epoch();

        rt.transaction(|st: &mut State, rt| {
            let spec = rt.policy().reward_vesting_spec;
            st.add_locked_funds(rt.store(), &params.coinbase, curr_epoch, &amount, &spec)
        })
    }

    /// Pays out vested funds to the coinbase that owns them.
    pub fn withdraw_balance<BS, RT>(
        rt: &mut RT,
        params: WithdrawBalanceParams,
    ) -> Result<WithdrawBalanceReturn, ActorError>
    where
        BS: Blockstore,
        RT: Runtime<BS>,
    {
        rt.validate_immediate_caller_is(std::iter::once(&params.coinbase))?;

        require_non_negative(&params.amount_requested, "withdrawal amount")?;
        let curr_epoch = rt.curr_epoch();

        let amount_withdrawn = rt.transaction(|st: &mut State, rt| {
            st.withdraw(
                rt.store(),
                &params.coinbase,
                curr_epoch,
                &params.amount_requested,
            )
        })?;

        if amount_withdrawn.is_positive() {
            debug!(
                "withdrawing {} vested funds to {}",
                amount_withdrawn, params.coinbase
            );
            rt.send(
                &params.coinbase,
                METHOD_SEND,
                RawBytes::default(),
                amount_withdrawn.clone(),
            )
            .with_context(|| format!("failed to pay vested funds to {}", params.coinbase))?;
        }

        Ok(WithdrawBalanceReturn { amount_withdrawn })
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
            Some(Method::AddVestingFunds) => {
                Self::add_vesting_funds(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::default())
            }
            Some(Method::WithdrawBalance) => {
                let res = Self::withdraw_balance(rt, cbor::deserialize_params(params)?)?;
                Ok(RawBytes::serialize(res)?)
            }
            None => Err(actor_error!(unhandled_message; "Invalid method")),
        }
    }
}
