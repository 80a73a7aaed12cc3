// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::anyhow;
use cid::Cid;
use epik_actors_runtime::{
    actor_error, make_empty_map, make_map_with_root_and_bitwidth, ActorError, AsActorError,
    Keyer, Map, VestSpec, VestingFunds, HAMT_BIT_WIDTH,
};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;

/// Vesting actor state
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct State {
    /// Map<Address, VestingFunds>, one ledger per coinbase.
    pub coinbases: Cid,
}

impl State {
    pub fn new<BS: Blockstore>(store: &BS) -> anyhow::Result<Self> {
        let coinbases = make_empty_map::<_, VestingFunds>(store, HAMT_BIT_WIDTH)
            .flush()
            .map_err(|e| anyhow!("failed to create empty coinbase map: {}", e))?;
        Ok(Self { coinbases })
    }

    pub fn load_coinbases<'bs, BS: Blockstore>(
        &self,
        store: &'bs BS,
    ) -> Result<Map<'bs, BS, VestingFunds>, ActorError> {
        make_map_with_root_and_bitwidth(&self.coinbases, store, HAMT_BIT_WIDTH)
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to load coinbases")
    }

    pub fn get_vesting_funds<BS: Blockstore>(
        &self,
        store: &BS,
        coinbase: &Address,
    ) -> Result<Option<VestingFunds>, ActorError> {
        let coinbases = self.load_coinbases(store)?;
        let funds = coinbases
            .get(&coinbase.key())
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to get vesting funds of {}", coinbase)
            })?;
        Ok(funds.cloned())
    }

    fn save_vesting_funds<BS: Blockstore>(
        &mut self,
        mut coinbases: Map<'_, BS, VestingFunds>,
        coinbase: &Address,
        funds: VestingFunds,
    ) -> Result<(), ActorError> {
        coinbases
            .set(coinbase.key(), funds)
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to put vesting funds of {}", coinbase)
            })?;
        self.coinbases = coinbases
            .flush()
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to flush coinbases")?;
        Ok(())
    }

    /// Locks `amount` for `coinbase`, creating its ledger on first use.
    pub fn add_locked_funds<BS: Blockstore>(
        &mut self,
        store: &BS,
        coinbase: &Address,
        curr_epoch: ChainEpoch,
        amount: &TokenAmount,
        spec: &VestSpec,
    ) -> Result<(), ActorError> {
        let coinbases = self.load_coinbases(store)?;
        let mut funds = coinbases
            .get(&coinbase.key())
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to get vesting funds of {}", coinbase)
            })?
            .cloned()
            .unwrap_or_default();

        funds
            .add_locked_funds(curr_epoch, amount, spec)
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to lock {} for {}", amount, coinbase)
            })?;

        self.save_vesting_funds(coinbases, coinbase, funds)
    }

    /// Debits up to `requested` of `coinbase`'s vested funds and returns the amount debited.
    /// Asking for a positive amount while everything left is still locked is forbidden.
    pub fn withdraw<BS: Blockstore>(
        &mut self,
        store: &BS,
        coinbase: &Address,
        curr_epoch: ChainEpoch,
        requested: &TokenAmount,
    ) -> Result<TokenAmount, ActorError> {
        let coinbases = self.load_coinbases(store)?;
        let mut funds = coinbases
            .get(&coinbase.key())
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to get vesting funds of {}", coinbase)
            })?
            .cloned()
            .ok_or_else(|| actor_error!(not_found; "no vesting funds for coinbase {}", coinbase))?;

        let amount = funds.withdraw(curr_epoch, requested);
        if requested.is_positive() && amount.is_zero() && !funds.total().is_zero() {
            return Err(actor_error!(forbidden;
                "no vested funds available for {} at epoch {}", coinbase, curr_epoch));
        }

        self.save_vesting_funds(coinbases, coinbase, funds)?;
        Ok(amount)
    }
}
