// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use log::debug;
use num_traits::Zero;

use crate::{
    actor_error, make_empty_map, make_map_with_root_and_bitwidth, ActorError, AsActorError, Keyer,
    Map,
};

pub const BALANCE_TABLE_BITWIDTH: u32 = 6;

/// Balance table which handles getting and updating token balances specifically
pub struct BalanceTable<'a, BS>(pub Map<'a, BS, TokenAmount>);

impl<'a, BS> BalanceTable<'a, BS>
where
    BS: Blockstore,
{
    /// Initializes a new empty balance table
    pub fn new(bs: &'a BS) -> Self {
        Self(make_empty_map(bs, BALANCE_TABLE_BITWIDTH))
    }

    /// Initializes a balance table from a root Cid
    pub fn from_root(bs: &'a BS, cid: &Cid) -> Result<Self, ActorError> {
        Ok(Self(
            make_map_with_root_and_bitwidth(cid, bs, BALANCE_TABLE_BITWIDTH)
                .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to load balance table")?,
        ))
    }

    /// Retrieve root from balance table
    pub fn root(&mut self) -> Result<Cid, ActorError> {
        self.0
            .flush()
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to flush balance table")
    }

    /// Gets token amount for given address in balance table
    pub fn get(&self, key: &Address) -> Result<TokenAmount, ActorError> {
        let balance = self
            .0
            .get(&key.key())
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to get balance for {}", key)
            })?;
        Ok(balance.cloned().unwrap_or_else(TokenAmount::zero))
    }

    /// Adds token amount to previously initialized account.
    pub fn add(&mut self, key: &Address, value: &TokenAmount) -> Result<(), ActorError> {
        let prev = self.get(key)?;
        let sum = &prev + value;
        if sum.is_negative() {
            return Err(actor_error!(
                illegal_argument,
                "new balance in table cannot be negative: {}",
                sum
            ));
        }
        if sum.is_zero() && !prev.is_zero() {
            debug!("balance of {} reached zero, removing entry", key);
            self.0
                .delete(&key.key())
                .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                    format!("failed to delete zero balance for {}", key)
                })?;
        } else {
            self.0
                .set(key.key(), sum)
                .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                    format!("failed to set balance for {}", key)
                })?;
        }
        Ok(())
    }

    /// Subtracts value from a balance, and errors if full amount was not subtracted.
    pub fn must_subtract(&mut self, key: &Address, req: &TokenAmount) -> Result<(), ActorError> {
        let prev = self.get(key)?;

        if req > &prev {
            return Err(actor_error!(
                illegal_argument,
                "couldn't subtract {} from balance {} of {}",
                req,
                prev,
                key
            ));
        }
        self.add(key, &-req.clone())
    }

    /// Returns total balance held by this balance table
    pub fn total(&self) -> Result<TokenAmount, ActorError> {
        let mut total = TokenAmount::zero();

        self.0
            .for_each(|_, v: &TokenAmount| {
                total += v;
                Ok(())
            })
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to iterate balance table")?;

        Ok(total)
    }
}
