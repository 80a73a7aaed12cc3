// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::anyhow;
use cid::Cid;
use epik_actors_runtime::runtime::Policy;
use epik_actors_runtime::{
    actor_error, make_empty_map, make_map_with_root_and_bitwidth, sweep_vested, ActorError,
    AsActorError, BalanceTable, Keyer, Map, VestingFunds, HAMT_BIT_WIDTH,
};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::bigint::{bigint_ser, BigInt};
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use log::debug;
use num_traits::{Signed, Zero};

/// Expert fund actor state
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct State {
    /// Map<Address, ExpertInfo>
    pub experts: Cid,

    pub pool_info: PoolInfo,

    /// Sum of the weight of every expert.
    pub total_weight: u64,

    /// Actor balance observed by the last pool update, minus what has been claimed since.
    pub last_fund_balance: TokenAmount,

    /// BalanceTable of votes per expert.
    pub expert_votes: Cid,
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolInfo {
    pub last_reward_epoch: ChainEpoch,
    /// Accumulated reward per unit of weight, scaled by the policy's
    /// `acc_per_share_multiplier`. Never decreases.
    #[serde(with = "bigint_ser")]
    pub acc_per_share: BigInt,
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpertInfo {
    pub weight: u64,
    pub reward_debt: TokenAmount,
    /// Settled rewards still vesting. Always equal to the locked total of `vesting_funds`.
    pub locked_funds: TokenAmount,
    pub vesting_funds: VestingFunds,
    pub unlocked_funds: TokenAmount,
}

impl State {
    pub fn new<BS: Blockstore>(store: &BS) -> anyhow::Result<Self> {
        let experts = make_empty_map::<_, ExpertInfo>(store, HAMT_BIT_WIDTH)
            .flush()
            .map_err(|e| anyhow!("failed to create empty experts map: {}", e))?;
        let expert_votes = BalanceTable::new(store)
            .root()
            .map_err(|e| anyhow!("failed to create empty votes table: {}", e))?;
        Ok(Self {
            experts,
            pool_info: PoolInfo::default(),
            total_weight: 0,
            last_fund_balance: TokenAmount::zero(),
            expert_votes,
        })
    }

    pub fn load_experts<'bs, BS: Blockstore>(
        &self,
        store: &'bs BS,
    ) -> Result<Map<'bs, BS, ExpertInfo>, ActorError> {
        make_map_with_root_and_bitwidth(&self.experts, store, HAMT_BIT_WIDTH)
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to load experts")
    }

    pub fn get_expert<BS: Blockstore>(
        &self,
        store: &BS,
        expert: &Address,
    ) -> Result<Option<ExpertInfo>, ActorError> {
        let experts = self.load_experts(store)?;
        let info = experts
            .get(&expert.key())
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to get expert {}", expert)
            })?;
        Ok(info.cloned())
    }

    fn must_get_expert<BS: Blockstore>(
        &self,
        store: &BS,
        expert: &Address,
    ) -> Result<ExpertInfo, ActorError> {
        self.get_expert(store, expert)?
            .ok_or_else(|| actor_error!(not_found; "expert {} not found", expert))
    }

    fn put_expert<BS: Blockstore>(
        &mut self,
        store: &BS,
        expert: &Address,
        info: ExpertInfo,
    ) -> Result<(), ActorError> {
        let mut experts = self.load_experts(store)?;
        experts
            .set(expert.key(), info)
            .with_context_code(ExitCode::USR_ILLEGAL_STATE, || {
                format!("failed to put expert {}", expert)
            })?;
        self.experts = experts
            .flush()
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to flush experts")?;
        Ok(())
    }

    /// Folds everything received since the last update into the accumulator.
    /// With no weight in the pool only the epoch moves; the inflow is kept for later.
    pub fn update_pool(
        &mut self,
        policy: &Policy,
        curr_epoch: ChainEpoch,
        balance: &TokenAmount,
    ) -> Result<(), ActorError> {
        if self.total_weight == 0 {
            debug!("expert pool has no weight at epoch {}", curr_epoch);
            self.pool_info.last_reward_epoch = curr_epoch;
            return Ok(());
        }

        let inflow = balance - &self.last_fund_balance;
        if inflow.is_negative() {
            return Err(actor_error!(illegal_state;
                "balance {} below last recorded fund balance {}",
                balance, self.last_fund_balance));
        }

        self.pool_info.acc_per_share +=
            inflow.atto() * policy.acc_per_share_multiplier / self.total_weight;
        self.pool_info.last_reward_epoch = curr_epoch;
        self.last_fund_balance = balance.clone();
        Ok(())
    }

    /// Weight times the accumulator, in tokens.
    fn accumulated(&self, policy: &Policy, weight: u64) -> BigInt {
        &self.pool_info.acc_per_share * weight / policy.acc_per_share_multiplier
    }

    /// Moves the expert's pending reward into its vesting schedule and releases
    /// tranches that have been vesting for a full vest period.
    fn settle(
        &self,
        policy: &Policy,
        curr_epoch: ChainEpoch,
        info: &mut ExpertInfo,
    ) -> Result<(), ActorError> {
        let pending = self.accumulated(policy, info.weight) - info.reward_debt.atto();
        if pending.is_negative() {
            return Err(actor_error!(illegal_state;
                "negative pending reward {} for weight {} and debt {}",
                pending, info.weight, info.reward_debt));
        }

        let spec = &policy.reward_vesting_spec;
        let pending = TokenAmount::from_atto(pending);
        if pending.is_positive() {
            info.vesting_funds
                .add_tranches(curr_epoch, &pending, spec)
                .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to vest pending reward")?;
            info.locked_funds += &pending;
        }

        let (remaining, released) = sweep_vested(&info.vesting_funds, curr_epoch - spec.vest_period);
        info.vesting_funds = remaining;
        info.locked_funds -= &released;
        info.unlocked_funds += released;
        Ok(())
    }

    /// Settles `expert` and adds `weight` to its stake. The reward debt is re-based so the
    /// new weight earns nothing from rewards accrued before this deposit.
    pub fn deposit<BS: Blockstore>(
        &mut self,
        store: &BS,
        policy: &Policy,
        curr_epoch: ChainEpoch,
        balance: &TokenAmount,
        expert: &Address,
        weight: u64,
    ) -> Result<(), ActorError> {
        self.update_pool(policy, curr_epoch, balance)?;

        let mut info = self.get_expert(store, expert)?.unwrap_or_default();
        self.settle(policy, curr_epoch, &mut info)?;

        info.weight = info.weight.checked_add(weight).ok_or_else(|| {
            actor_error!(illegal_argument; "weight of {} overflows adding {}", expert, weight)
        })?;
        self.total_weight = self.total_weight.checked_add(weight).ok_or_else(|| {
            actor_error!(illegal_argument; "total weight overflows adding {}", weight)
        })?;
        info.reward_debt = TokenAmount::from_atto(self.accumulated(policy, info.weight));

        self.put_expert(store, expert, info)
    }

    /// Settles `expert` and debits `amount` from its unlocked funds.
    pub fn claim<BS: Blockstore>(
        &mut self,
        store: &BS,
        policy: &Policy,
        curr_epoch: ChainEpoch,
        balance: &TokenAmount,
        expert: &Address,
        amount: &TokenAmount,
    ) -> Result<(), ActorError> {
        self.update_pool(policy, curr_epoch, balance)?;

        let mut info = self.must_get_expert(store, expert)?;
        self.settle(policy, curr_epoch, &mut info)?;
        info.reward_debt = TokenAmount::from_atto(self.accumulated(policy, info.weight));

        if &info.unlocked_funds < amount {
            return Err(actor_error!(illegal_state;
                "insufficient unlocked funds: {} < {}", info.unlocked_funds, amount));
        }
        info.unlocked_funds -= amount;
        self.last_fund_balance -= amount;

        self.put_expert(store, expert, info)
    }

    /// Removes `expert`'s weight and forfeits everything it has not yet unlocked.
    /// The weight leaves the pool before the final accrual.
    pub fn reset<BS: Blockstore>(
        &mut self,
        store: &BS,
        policy: &Policy,
        curr_epoch: ChainEpoch,
        balance: &TokenAmount,
        expert: &Address,
    ) -> Result<TokenAmount, ActorError> {
        let mut info = self.must_get_expert(store, expert)?;

        self.total_weight = self.total_weight.checked_sub(info.weight).ok_or_else(|| {
            actor_error!(illegal_state;
                "expert {} weight {} exceeds total weight {}", expert, info.weight, self.total_weight)
        })?;
        self.update_pool(policy, curr_epoch, balance)?;
        self.settle(policy, curr_epoch, &mut info)?;

        let forfeited = std::mem::take(&mut info.locked_funds);
        info.weight = 0;
        info.reward_debt = TokenAmount::zero();
        info.vesting_funds = VestingFunds::new();

        self.put_expert(store, expert, info)?;
        Ok(forfeited)
    }

    /// Adds a signed change to `expert`'s vote tally. A tally never goes negative.
    pub fn notify_vote<BS: Blockstore>(
        &mut self,
        store: &BS,
        expert: &Address,
        delta: &TokenAmount,
    ) -> Result<(), ActorError> {
        let mut votes = BalanceTable::from_root(store, &self.expert_votes)?;
        votes.add(expert, delta)?;
        self.expert_votes = votes.root()?;
        Ok(())
    }

    pub fn expert_votes<BS: Blockstore>(
        &self,
        store: &BS,
        expert: &Address,
    ) -> Result<TokenAmount, ActorError> {
        BalanceTable::from_root(store, &self.expert_votes)?.get(expert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epik_actors_runtime::VestSpec;
    use fvm_ipld_blockstore::MemoryBlockstore;
    use quickcheck_macros::quickcheck;

    fn policy() -> Policy {
        Policy {
            reward_vesting_spec: VestSpec {
                initial_delay: 10,
                vest_period: 10,
                step_duration: 2,
                quantization: 1,
            },
            ..Default::default()
        }
    }

    fn atto(amount: u64) -> TokenAmount {
        TokenAmount::from_atto(amount)
    }

    #[test]
    fn zero_weight_update_only_moves_epoch() {
        let store = MemoryBlockstore::default();
        let mut st = State::new(&store).unwrap();

        st.update_pool(&policy(), 7, &atto(1000)).unwrap();
        assert_eq!(st.pool_info.last_reward_epoch, 7);
        assert!(st.pool_info.acc_per_share.is_zero());
        assert!(st.last_fund_balance.is_zero());
    }

    #[test]
    fn inflow_before_first_stake_goes_to_first_stakers() {
        let store = MemoryBlockstore::default();
        let policy = policy();
        let expert = Address::new_id(1000);
        let mut st = State::new(&store).unwrap();

        st.deposit(&store, &policy, 1, &atto(1000), &expert, 10).unwrap();
        st.claim(&store, &policy, 2, &atto(1000), &expert, &atto(0)).unwrap();

        let info = st.get_expert(&store, &expert).unwrap().unwrap();
        assert_eq!(info.locked_funds, atto(1000));
        assert_eq!(st.last_fund_balance, atto(1000));
    }

    #[test]
    fn pending_reward_is_truncated() {
        let store = MemoryBlockstore::default();
        let policy = policy();
        let (a, b, c) = (Address::new_id(1000), Address::new_id(1001), Address::new_id(1002));
        let mut st = State::new(&store).unwrap();

        for expert in [&a, &b, &c] {
            st.deposit(&store, &policy, 0, &atto(0), expert, 1).unwrap();
        }
        // 100 shared by three: each gets 33 and one atto stays in the pool.
        for expert in [&a, &b, &c] {
            st.claim(&store, &policy, 1, &atto(100), expert, &atto(0)).unwrap();
            let info = st.get_expert(&store, expert).unwrap().unwrap();
            assert_eq!(info.locked_funds, atto(33));
        }
    }

    #[test]
    fn negative_inflow_is_illegal_state() {
        let store = MemoryBlockstore::default();
        let policy = policy();
        let expert = Address::new_id(1000);
        let mut st = State::new(&store).unwrap();

        st.deposit(&store, &policy, 0, &atto(0), &expert, 10).unwrap();
        st.update_pool(&policy, 1, &atto(500)).unwrap();
        let err = st.update_pool(&policy, 2, &atto(400)).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::USR_ILLEGAL_STATE);
    }

    #[test]
    fn settle_releases_after_full_vest_period() {
        let store = MemoryBlockstore::default();
        let policy = policy();
        let expert = Address::new_id(1000);
        let mut st = State::new(&store).unwrap();

        st.deposit(&store, &policy, 0, &atto(0), &expert, 10).unwrap();
        // Tranches land at 17, 19, 21, 23 and 25.
        st.claim(&store, &policy, 5, &atto(1000), &expert, &atto(0)).unwrap();

        // Only tranches older than a full vest period are released.
        st.claim(&store, &policy, 27, &atto(1000), &expert, &atto(0)).unwrap();
        let info = st.get_expert(&store, &expert).unwrap().unwrap();
        assert!(info.unlocked_funds.is_zero());

        st.claim(&store, &policy, 30, &atto(1000), &expert, &atto(0)).unwrap();
        let info = st.get_expert(&store, &expert).unwrap().unwrap();
        assert_eq!(info.unlocked_funds, atto(400));
        assert_eq!(info.locked_funds, atto(600));
        assert_eq!(info.locked_funds, info.vesting_funds.locked_total());
    }

    #[quickcheck]
    fn acc_per_share_never_decreases(steps: Vec<(u8, u16)>) -> bool {
        let store = MemoryBlockstore::default();
        let policy = policy();
        let mut st = State::new(&store).unwrap();
        let mut balance = TokenAmount::zero();

        for (epoch, (weight, inflow)) in steps.into_iter().enumerate() {
            let epoch = epoch as ChainEpoch;
            let expert = Address::new_id(1000 + u64::from(weight % 4));
            balance += atto(u64::from(inflow));

            let before = st.pool_info.clone();
            let weight_before = st.total_weight;
            if st
                .deposit(&store, &policy, epoch, &balance, &expert, u64::from(weight))
                .is_err()
            {
                return false;
            }
            if st.pool_info.acc_per_share < before.acc_per_share {
                return false;
            }
            if weight_before == 0 && st.pool_info.acc_per_share != before.acc_per_share {
                return false;
            }
        }
        true
    }
}
