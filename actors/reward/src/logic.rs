// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ops::Neg;

use epik_actors_runtime::runtime::Policy;
use epik_actors_runtime::{EPOCH_DURATION_SECONDS, SECONDS_IN_YEAR, TOKEN_PRECISION};
use fvm_shared::bigint::BigInt;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use lazy_static::lazy_static;
use num_traits::{Signed, Zero};

/// Fixed-point precision (in bits) used for minting function's input "t"
pub(crate) const MINTING_INPUT_FIXED_POINT: usize = 30;

/// Fixed-point precision (in bits) used internally and for output
const MINTING_OUTPUT_FIXED_POINT: u64 = 97;

lazy_static! {
    pub static ref LAMBDA_NUM: BigInt = BigInt::from(EPOCH_DURATION_SECONDS) * &*LN_TWO_NUM;
    pub static ref LAMBDA_DEN: BigInt = BigInt::from(6 * SECONDS_IN_YEAR) * &*LN_TWO_DEN;

    /// Tokens reserved for block rewards, in attoEPK.
    pub static ref SIMPLE_TOTAL: BigInt = BigInt::from(500_000_000) * TOKEN_PRECISION;

    // The following are the numerator and denominator of -ln(1/2)=ln(2),
    // represented as a rational with sufficient precision.
    pub static ref LN_TWO_NUM: BigInt = BigInt::from(6_931_471_805_599_453_094_172_321_215u128);
    pub static ref LN_TWO_DEN: BigInt = BigInt::from(10_000_000_000_000_000_000_000_000_000u128);
}

/// Computes `1 - e^(-λt)` as a fixed-point number with `MINTING_OUTPUT_FIXED_POINT`
/// fractional bits. `t` carries `MINTING_INPUT_FIXED_POINT` fractional bits.
///
/// This is the fraction of the simple supply that should have been minted by time `t`
/// under exponential decay of the unminted supply with a half-life of 6 years.
fn taylor_series_expansion(lambda_num: &BigInt, lambda_den: &BigInt, t: BigInt) -> BigInt {
    // Numerator and denominator of the rational (-λt).
    let numerator_base = lambda_num.neg() * t;
    let denominator_base = lambda_den << MINTING_INPUT_FIXED_POINT;

    // The (-1) shared by every term is folded into the first numerator.
    let mut numerator = numerator_base.clone().neg();
    let mut denominator = denominator_base.clone();

    // Partial sums, in fixed point.
    let mut ret = BigInt::zero();

    for n in 1..25 {
        // n! in the denominator
        denominator *= n;

        let term = (numerator.clone() << MINTING_OUTPUT_FIXED_POINT) / &denominator;
        ret += term;

        numerator *= &numerator_base;
        denominator *= &denominator_base;

        // Drop precision the next multiply does not need, on both sides of the fraction.
        let denominator_len = denominator.bits();
        let unnecessary_bits = denominator_len.saturating_sub(MINTING_OUTPUT_FIXED_POINT);

        numerator >>= unnecessary_bits;
        denominator >>= unnecessary_bits;
    }

    ret
}

/// Scales the minted fraction at fixed-point time `t` by `factor` and drops the
/// fractional bits.
pub(crate) fn minting_function(factor: &BigInt, t: &BigInt) -> BigInt {
    let value = factor * taylor_series_expansion(&LAMBDA_NUM, &LAMBDA_DEN, t.clone());

    // The minting function is non-negative for non-negative t.
    value >> MINTING_OUTPUT_FIXED_POINT
}

/// Total simple supply that should have been minted by the start of `epoch`.
pub fn minted_by(epoch: ChainEpoch) -> TokenAmount {
    let t = BigInt::from(epoch) << MINTING_INPUT_FIXED_POINT;
    TokenAmount::from_atto(minting_function(&SIMPLE_TOTAL, &t))
}

/// Reward paid out for `epoch`, shared among that epoch's block winners.
pub fn compute_reward(epoch: ChainEpoch) -> TokenAmount {
    minted_by(epoch + 1) - minted_by(epoch)
}

/// Per-category split of one block reward.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardSplit {
    pub power: TokenAmount,
    pub vote: TokenAmount,
    pub expert: TokenAmount,
    pub knowledge: TokenAmount,
    pub bandwidth: TokenAmount,
}

impl RewardSplit {
    pub fn total(&self) -> TokenAmount {
        &self.power + &self.vote + &self.expert + &self.knowledge + &self.bandwidth
    }
}

fn share_of(amount: &BigInt, numerator: u64, denominator: u64) -> BigInt {
    amount * numerator / denominator
}

/// Splits a non-negative block reward between the storage power winner and the vote,
/// expert, knowledge and retrieval funds.
///
/// Each fund share is truncated independently and the power reward takes the remainder,
/// so the parts always add up to `block_reward`. The bandwidth reward is carved out of the
/// knowledge share in proportion to the retrieval pledge, capped by the circulating supply.
pub fn split_block_reward(
    policy: &Policy,
    block_reward: &TokenAmount,
    circulating_supply: &TokenAmount,
    retrieval_pledged: &TokenAmount,
) -> RewardSplit {
    let block = block_reward.atto();
    let denominator = policy.reward_share_denominator;

    let vote = share_of(block, policy.vote_reward_share, denominator);
    let expert = share_of(block, policy.expert_reward_share, denominator);
    let knowledge_and_bandwidth = share_of(block, policy.knowledge_reward_share, denominator);

    let circulating = circulating_supply.atto();
    let bandwidth = if circulating.is_positive() {
        let pledged = std::cmp::max(retrieval_pledged.atto().clone(), BigInt::zero());
        let capped = std::cmp::min(
            pledged * policy.retrieval_pledge_factor,
            circulating * policy.retrieval_circulating_cap,
        );
        capped * block / (circulating * policy.retrieval_reward_denominator)
    } else {
        BigInt::zero()
    };

    let knowledge = &knowledge_and_bandwidth - &bandwidth;
    let power = block - &vote - &expert - &knowledge_and_bandwidth;

    RewardSplit {
        power: TokenAmount::from_atto(power),
        vote: TokenAmount::from_atto(vote),
        expert: TokenAmount::from_atto(expert),
        knowledge: TokenAmount::from_atto(knowledge),
        bandwidth: TokenAmount::from_atto(bandwidth),
    }
}
