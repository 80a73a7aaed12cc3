// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;

use anyhow::anyhow;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::bigint::BigInt;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use log::debug;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Specification for a linear vesting schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestSpec {
    /// Delay before any amount starts vesting.
    pub initial_delay: ChainEpoch,
    /// Period over which the total should vest, after the initial delay.
    pub vest_period: ChainEpoch,
    /// Duration between successive incremental vests (independent of vesting period).
    pub step_duration: ChainEpoch,
    /// Maximum precision of vesting table (limits cardinality of table).
    pub quantization: ChainEpoch,
}

/// Rounds `e` up to the next multiple of `unit`. Multiples of `unit` are returned unchanged.
pub fn quantize_up(e: ChainEpoch, unit: ChainEpoch) -> ChainEpoch {
    if unit <= 1 {
        return e;
    }
    let remainder = e.rem_euclid(unit);
    if remainder == 0 {
        e
    } else {
        e + (unit - remainder)
    }
}

/// One tranche of locked tokens that becomes spendable once `epoch` has passed.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct VestingFund {
    pub epoch: ChainEpoch,
    pub amount: TokenAmount,
}

/// A beneficiary's vesting ledger.
///
/// `funds` is kept sorted by epoch with at most one entry per epoch.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, Default, PartialEq, Eq)]
pub struct VestingFunds {
    pub funds: Vec<VestingFund>,
    pub unlocked_balance: TokenAmount,
}

impl VestingFunds {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sum of all tranches that have not been swept yet.
    pub fn locked_total(&self) -> TokenAmount {
        self.funds
            .iter()
            .fold(TokenAmount::zero(), |acc, vf| acc + &vf.amount)
    }

    /// Everything this ledger still owes its beneficiary, locked or not.
    pub fn total(&self) -> TokenAmount {
        self.locked_total() + &self.unlocked_balance
    }

    /// Removes every tranche whose epoch is strictly before `current_epoch`
    /// and returns their sum. The caller decides where the released amount goes.
    pub fn unlock_vested_funds(&mut self, current_epoch: ChainEpoch) -> TokenAmount {
        let end = self
            .funds
            .iter()
            .position(|fund| fund.epoch >= current_epoch)
            .unwrap_or(self.funds.len());

        self.funds
            .drain(..end)
            .fold(TokenAmount::zero(), |acc, fund| acc + fund.amount)
    }

    /// Sweeps vested tranches into the unlocked balance, then locks `vesting_sum`
    /// according to `spec`, starting the clock at `current_epoch`.
    pub fn add_locked_funds(
        &mut self,
        current_epoch: ChainEpoch,
        vesting_sum: &TokenAmount,
        spec: &VestSpec,
    ) -> anyhow::Result<()> {
        let vested = self.unlock_vested_funds(current_epoch);
        self.unlocked_balance += vested;
        self.add_tranches(current_epoch, vesting_sum, spec)
    }

    /// Decomposes `vesting_sum` into linear tranches and merges them into the table.
    /// No tranche is released here.
    ///
    /// The final tranche always brings the vested total to exactly `vesting_sum`,
    /// so the tranches sum to it despite the truncating division on the others.
    pub fn add_tranches(
        &mut self,
        current_epoch: ChainEpoch,
        vesting_sum: &TokenAmount,
        spec: &VestSpec,
    ) -> anyhow::Result<()> {
        if vesting_sum.is_negative() {
            return Err(anyhow!("cannot lock negative amount {}", vesting_sum));
        }
        if spec.step_duration <= 0 || spec.vest_period <= 0 {
            return Err(anyhow!(
                "invalid vest spec: step {} period {}",
                spec.step_duration,
                spec.vest_period
            ));
        }

        // Quantization is not aligned with when regular cron will be invoked, but it's
        // fine since the tranches will be unlocked on the next lazy sweep anyway.
        let mut epoch_to_index: HashMap<ChainEpoch, usize> = self
            .funds
            .iter()
            .enumerate()
            .map(|(i, fund)| (fund.epoch, i))
            .collect();

        // Nothing unlocks here, this is just the start of the clock.
        let vest_begin = current_epoch + spec.initial_delay;
        let mut vested_so_far = BigInt::zero();
        let mut e = vest_begin + spec.step_duration;

        while &vested_so_far < vesting_sum.atto() {
            let vest_epoch = quantize_up(e, spec.quantization);
            let elapsed = vest_epoch - vest_begin;

            let target_vest = if elapsed < spec.vest_period {
                // Linear vesting
                (vesting_sum.atto() * elapsed) / spec.vest_period
            } else {
                vesting_sum.atto().clone()
            };

            let vest_this_time = TokenAmount::from_atto(&target_vest - &vested_so_far);
            vested_so_far = target_vest;

            match epoch_to_index.get(&vest_epoch) {
                Some(&index) => self.funds[index].amount += vest_this_time,
                None => {
                    epoch_to_index.insert(vest_epoch, self.funds.len());
                    self.funds.push(VestingFund {
                        epoch: vest_epoch,
                        amount: vest_this_time,
                    });
                }
            }

            e += spec.step_duration;
        }

        self.funds.sort_by_key(|fund| fund.epoch);
        Ok(())
    }

    /// Unlocks up to `target` from tranches that have not vested yet at `current_epoch`,
    /// earliest first, shrinking the last tranche touched instead of removing it.
    /// Already vested tranches are left alone. Returns the amount unlocked.
    pub fn unlock_unvested_funds(
        &mut self,
        current_epoch: ChainEpoch,
        target: &TokenAmount,
    ) -> TokenAmount {
        let mut amount_unlocked = TokenAmount::zero();
        let mut last_index_to_remove = None;
        let start = self
            .funds
            .iter()
            .position(|fund| fund.epoch >= current_epoch)
            .unwrap_or(self.funds.len());

        for (i, fund) in self.funds.iter_mut().enumerate().skip(start) {
            if &amount_unlocked >= target {
                break;
            }

            let unlock_amount = std::cmp::min(target - &amount_unlocked, fund.amount.clone());
            amount_unlocked += &unlock_amount;
            let new_amount = &fund.amount - &unlock_amount;

            if new_amount.is_zero() {
                last_index_to_remove = Some(i);
            } else {
                fund.amount = new_amount;
            }
        }

        if let Some(last) = last_index_to_remove {
            self.funds.drain(start..=last);
        }

        amount_unlocked
    }

    /// Pays out up to `requested` from the unlocked balance after sweeping vested tranches.
    /// Returns the amount debited.
    pub fn withdraw(&mut self, current_epoch: ChainEpoch, requested: &TokenAmount) -> TokenAmount {
        if self.total().is_zero() || !requested.is_positive() {
            return TokenAmount::zero();
        }

        let vested = self.unlock_vested_funds(current_epoch);
        self.unlocked_balance += vested;

        let amount = std::cmp::min(&self.unlocked_balance, requested).clone();
        self.unlocked_balance -= &amount;
        debug!(
            "withdrew {} of {} requested at epoch {}, {} still unlocked",
            amount, requested, current_epoch, self.unlocked_balance
        );
        amount
    }

    /// Checks that epochs strictly increase and no tranche is negative.
    pub fn check_well_formed(&self) -> anyhow::Result<()> {
        for pair in self.funds.windows(2) {
            if pair[0].epoch >= pair[1].epoch {
                return Err(anyhow!(
                    "vesting table out of order: {} before {}",
                    pair[0].epoch,
                    pair[1].epoch
                ));
            }
        }
        if let Some(fund) = self.funds.iter().find(|fund| fund.amount.is_negative()) {
            return Err(anyhow!(
                "negative tranche {} at epoch {}",
                fund.amount,
                fund.epoch
            ));
        }
        if self.unlocked_balance.is_negative() {
            return Err(anyhow!("negative unlocked balance {}", self.unlocked_balance));
        }
        Ok(())
    }
}

/// Returns a copy of `ledger` without the tranches vesting strictly before `epoch`,
/// together with their sum. `ledger` itself is left untouched.
pub fn sweep_vested(ledger: &VestingFunds, epoch: ChainEpoch) -> (VestingFunds, TokenAmount) {
    let mut remaining = ledger.clone();
    let released = remaining.unlock_vested_funds(epoch);
    (remaining, released)
}
