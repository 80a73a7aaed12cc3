// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use epik_actor_expertfund::ext::expert::{ControlAddressReturn, CONTROL_ADDRESS_METHOD};
use epik_actor_expertfund::testing::check_state_invariants;
use epik_actor_expertfund::{
    Actor as ExpertFundActor, CheckExpertParams, CheckExpertReturn, ClaimFundParams,
    DepositParams, ExpertInfo, Method, NotifyVoteParams, ResetExpertParams, State,
};
use epik_actors_runtime::runtime::builtins::Type;
use epik_actors_runtime::test_utils::*;
use epik_actors_runtime::{
    ActorError, VestSpec, EXPERT_FUND_ACTOR_ADDR, GOVERN_ACTOR_ADDR, REWARD_ACTOR_ADDR,
    SYSTEM_ACTOR_ADDR,
};
use fvm_ipld_encoding::RawBytes;
use fvm_shared::address::Address;
use fvm_shared::bigint::BigInt;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use fvm_shared::METHOD_SEND;
use num_traits::Zero;

const EXPERT_A: Address = Address::new_id(1000);
const EXPERT_B: Address = Address::new_id(1001);
const OWNER_A: Address = Address::new_id(2000);
const OWNER_B: Address = Address::new_id(2001);
const VOTER: Address = Address::new_id(3000);

const TEST_SPEC: VestSpec = VestSpec {
    initial_delay: 10,
    vest_period: 10,
    step_duration: 2,
    quantization: 1,
};

fn atto(amount: i64) -> TokenAmount {
    TokenAmount::from_atto(amount)
}

fn owner_of(expert: Address) -> Address {
    if expert == EXPERT_A {
        OWNER_A
    } else {
        OWNER_B
    }
}

fn construct_and_verify() -> MockRuntime {
    let mut rt = MockRuntime::new(EXPERT_FUND_ACTOR_ADDR);
    rt.policy.reward_vesting_spec = TEST_SPEC;
    rt.policy.expert_vote_threshold = 10;
    rt.set_caller(Type::System, SYSTEM_ACTOR_ADDR);
    rt.expect_validate_caller_addr(vec![SYSTEM_ACTOR_ADDR]);
    rt.call::<ExpertFundActor>(Method::Constructor as u64, &RawBytes::default())
        .unwrap();
    rt.verify();
    rt
}

fn apply_rewards(rt: &mut MockRuntime, amount: i64) {
    rt.set_caller(Type::Reward, REWARD_ACTOR_ADDR);
    rt.set_value(atto(amount));
    rt.add_balance(atto(amount));
    rt.expect_validate_caller_addr(vec![REWARD_ACTOR_ADDR]);
    rt.call::<ExpertFundActor>(Method::ApplyRewards as u64, &RawBytes::default())
        .unwrap();
    rt.set_value(TokenAmount::zero());
    rt.verify();
}

fn deposit(rt: &mut MockRuntime, expert: Address, weight: u64) -> Result<(), ActorError> {
    rt.set_caller(Type::Expert, expert);
    rt.expect_validate_caller_type(vec![Type::Expert]);
    let ret = rt.call::<ExpertFundActor>(
        Method::Deposit as u64,
        &RawBytes::serialize(DepositParams { weight }).unwrap(),
    );
    rt.verify();
    ret.map(|_| ())
}

fn expect_control_address(rt: &MockRuntime, expert: Address) {
    rt.expect_send(
        expert,
        CONTROL_ADDRESS_METHOD,
        RawBytes::default(),
        TokenAmount::zero(),
        RawBytes::serialize(ControlAddressReturn {
            owner: owner_of(expert),
        })
        .unwrap(),
        ExitCode::OK,
    );
}

fn claim_as(
    rt: &mut MockRuntime,
    caller: Address,
    expert: Address,
    amount: i64,
) -> Result<(), ActorError> {
    rt.set_caller(Type::Account, caller);
    let ret = rt.call::<ExpertFundActor>(
        Method::Claim as u64,
        &RawBytes::serialize(ClaimFundParams {
            expert,
            amount: atto(amount),
        })
        .unwrap(),
    );
    ret.map(|_| ())
}

/// Claims through the expert's owner, expecting the payout to succeed.
fn claim(rt: &mut MockRuntime, expert: Address, amount: i64) {
    let owner = owner_of(expert);
    expect_control_address(rt, expert);
    rt.expect_validate_caller_addr(vec![owner]);
    if amount > 0 {
        rt.expect_send(
            owner,
            METHOD_SEND,
            RawBytes::default(),
            atto(amount),
            RawBytes::default(),
            ExitCode::OK,
        );
    }
    claim_as(rt, owner, expert, amount).unwrap();
    rt.verify();
}

fn reset(rt: &mut MockRuntime, caller: Address, expert: Address) -> Result<(), ActorError> {
    rt.set_caller(Type::Govern, caller);
    rt.expect_validate_caller_any();
    let ret = rt.call::<ExpertFundActor>(
        Method::Reset as u64,
        &RawBytes::serialize(ResetExpertParams { expert }).unwrap(),
    );
    rt.verify();
    ret.map(|_| ())
}

fn notify_vote(rt: &mut MockRuntime, expert: Address, amount: TokenAmount) -> Result<(), ActorError> {
    rt.set_caller(Type::Vote, VOTER);
    rt.expect_validate_caller_type(vec![Type::Vote]);
    let ret = rt.call::<ExpertFundActor>(
        Method::NotifyVote as u64,
        &RawBytes::serialize(NotifyVoteParams { expert, amount }).unwrap(),
    );
    rt.verify();
    ret.map(|_| ())
}

fn check_expert(rt: &mut MockRuntime, expert: Address) -> CheckExpertReturn {
    rt.set_caller(Type::Account, VOTER);
    rt.expect_validate_caller_any();
    let ret = rt
        .call::<ExpertFundActor>(
            Method::CheckExpert as u64,
            &RawBytes::serialize(CheckExpertParams { expert }).unwrap(),
        )
        .unwrap();
    rt.verify();
    ret.deserialize().unwrap()
}

fn expert_info(rt: &MockRuntime, expert: Address) -> ExpertInfo {
    let st: State = rt.get_state();
    st.get_expert(&rt.store, &expert).unwrap().unwrap()
}

fn tranches(info: &ExpertInfo) -> Vec<(ChainEpoch, TokenAmount)> {
    info.vesting_funds
        .funds
        .iter()
        .map(|fund| (fund.epoch, fund.amount.clone()))
        .collect()
}

fn assert_invariants(rt: &MockRuntime) {
    let st: State = rt.get_state();
    let balance = rt.balance.borrow().clone();
    check_state_invariants(&st, &rt.store, &balance).1.assert_empty();
}

fn grant_reset(rt: &mut MockRuntime) {
    rt.grant(GOVERN_ACTOR_ADDR, Type::ExpertFund, Method::Reset as u64);
}

#[test]
fn construct() {
    let rt = construct_and_verify();
    let st: State = rt.get_state();
    assert_eq!(st.total_weight, 0);
    assert!(st.pool_info.acc_per_share.is_zero());
    assert!(st.get_expert(&rt.store, &EXPERT_A).unwrap().is_none());
    assert_invariants(&rt);
}

#[test]
fn only_reward_actor_applies_rewards() {
    let mut rt = construct_and_verify();
    rt.set_caller(Type::Account, OWNER_A);
    rt.expect_validate_caller_addr(vec![REWARD_ACTOR_ADDR]);
    let err = rt
        .call::<ExpertFundActor>(Method::ApplyRewards as u64, &RawBytes::default())
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_FORBIDDEN);
    rt.verify();
}

#[test]
fn rewards_accrue_into_vesting() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();

    rt.set_epoch(1);
    apply_rewards(&mut rt, 1000);

    // Applying rewards records nothing until the pool is next touched.
    let st: State = rt.get_state();
    assert!(st.pool_info.acc_per_share.is_zero());

    rt.set_epoch(5);
    claim(&mut rt, EXPERT_A, 0);

    let st: State = rt.get_state();
    assert_eq!(st.pool_info.acc_per_share, BigInt::from(100_000_000_000_000u64));
    assert_eq!(st.pool_info.last_reward_epoch, 5);
    assert_eq!(st.last_fund_balance, atto(1000));

    let info = expert_info(&rt, EXPERT_A);
    assert_eq!(info.locked_funds, atto(1000));
    assert!(info.unlocked_funds.is_zero());
    assert_eq!(
        tranches(&info),
        vec![
            (17, atto(200)),
            (19, atto(200)),
            (21, atto(200)),
            (23, atto(200)),
            (25, atto(200)),
        ]
    );
    assert_invariants(&rt);
}

#[test]
fn claim_pays_owner_from_unlocked_funds() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();
    apply_rewards(&mut rt, 1000);
    rt.set_epoch(5);
    claim(&mut rt, EXPERT_A, 0);

    rt.set_epoch(30);
    claim(&mut rt, EXPERT_A, 300);

    let info = expert_info(&rt, EXPERT_A);
    assert_eq!(info.unlocked_funds, atto(100));
    assert_eq!(info.locked_funds, atto(600));
    assert_eq!(*rt.balance.borrow(), atto(700));
    let st: State = rt.get_state();
    assert_eq!(st.last_fund_balance, atto(700));
    assert_invariants(&rt);

    // The payout does not count as an outflow on the next accrual.
    rt.set_epoch(31);
    claim(&mut rt, EXPERT_A, 0);
    let st: State = rt.get_state();
    assert_eq!(st.pool_info.acc_per_share, BigInt::from(100_000_000_000_000u64));
}

#[test]
fn claim_more_than_unlocked_fails() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();
    apply_rewards(&mut rt, 1000);
    rt.set_epoch(5);
    claim(&mut rt, EXPERT_A, 0);

    rt.set_epoch(30);
    let before = rt.state;
    expect_control_address(&rt, EXPERT_A);
    rt.expect_validate_caller_addr(vec![OWNER_A]);
    let err = claim_as(&mut rt, OWNER_A, EXPERT_A, 401).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_ILLEGAL_STATE);
    assert_eq!(rt.state, before);
    rt.verify();
}

#[test]
fn claim_rejects_bad_requests() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();

    let err = claim_as(&mut rt, OWNER_A, EXPERT_A, -1).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_ILLEGAL_ARGUMENT);
    rt.verify();

    // Only the owner reported by the expert actor may claim.
    expect_control_address(&rt, EXPERT_A);
    rt.expect_validate_caller_addr(vec![OWNER_A]);
    let err = claim_as(&mut rt, OWNER_B, EXPERT_A, 0).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_FORBIDDEN);
    rt.verify();

    expect_control_address(&rt, EXPERT_B);
    rt.expect_validate_caller_addr(vec![OWNER_B]);
    let err = claim_as(&mut rt, OWNER_B, EXPERT_B, 0).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_NOT_FOUND);
    rt.verify();
}

#[test]
fn failed_payout_rolls_back_claim() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();
    apply_rewards(&mut rt, 1000);
    rt.set_epoch(5);
    claim(&mut rt, EXPERT_A, 0);
    rt.set_epoch(100);

    let before = rt.state;
    expect_control_address(&rt, EXPERT_A);
    rt.expect_validate_caller_addr(vec![OWNER_A]);
    rt.expect_send(
        OWNER_A,
        METHOD_SEND,
        RawBytes::default(),
        atto(100),
        RawBytes::default(),
        ExitCode::SYS_INVALID_RECEIVER,
    );
    let err = claim_as(&mut rt, OWNER_A, EXPERT_A, 100).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::SYS_INVALID_RECEIVER);
    assert_eq!(rt.state, before);
    assert_eq!(*rt.balance.borrow(), atto(1000));
    rt.verify();
}

#[test]
fn deposit_rebases_reward_debt() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();
    apply_rewards(&mut rt, 1000);

    // B joins after the first reward and earns nothing from it.
    rt.set_epoch(5);
    deposit(&mut rt, EXPERT_B, 10).unwrap();
    let info = expert_info(&rt, EXPERT_B);
    assert_eq!(info.reward_debt, atto(1000));
    assert!(info.locked_funds.is_zero());

    // A second deposit with no new inflow adds nothing pending either.
    rt.set_epoch(6);
    deposit(&mut rt, EXPERT_B, 10).unwrap();
    let info = expert_info(&rt, EXPERT_B);
    assert_eq!(info.weight, 20);
    assert_eq!(info.reward_debt, atto(2000));
    assert!(info.locked_funds.is_zero());

    // Later rewards are shared by weight.
    apply_rewards(&mut rt, 900);
    rt.set_epoch(7);
    claim(&mut rt, EXPERT_A, 0);
    claim(&mut rt, EXPERT_B, 0);
    assert_eq!(expert_info(&rt, EXPERT_A).locked_funds, atto(1300));
    assert_eq!(expert_info(&rt, EXPERT_B).locked_funds, atto(600));

    let st: State = rt.get_state();
    assert_eq!(st.total_weight, 30);
    assert_invariants(&rt);
}

#[test]
fn only_experts_deposit() {
    let mut rt = construct_and_verify();
    rt.set_caller(Type::Account, OWNER_A);
    rt.expect_validate_caller_type(vec![Type::Expert]);
    let err = rt
        .call::<ExpertFundActor>(
            Method::Deposit as u64,
            &RawBytes::serialize(DepositParams { weight: 10 }).unwrap(),
        )
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_FORBIDDEN);
    rt.verify();
}

#[test]
fn inflow_below_snapshot_aborts() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();
    apply_rewards(&mut rt, 1000);
    rt.set_epoch(5);
    claim(&mut rt, EXPERT_A, 0);

    rt.set_balance(atto(500));
    let before = rt.state;
    let err = deposit(&mut rt, EXPERT_B, 10).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_ILLEGAL_STATE);
    assert_eq!(rt.state, before);
}

#[test]
fn reset_removes_weight_before_accrual() {
    let mut rt = construct_and_verify();
    grant_reset(&mut rt);
    deposit(&mut rt, EXPERT_A, 10).unwrap();
    deposit(&mut rt, EXPERT_B, 10).unwrap();
    apply_rewards(&mut rt, 1000);

    rt.set_epoch(5);
    reset(&mut rt, GOVERN_ACTOR_ADDR, EXPERT_A).unwrap();

    // The pending inflow is divided by the remaining weight only.
    let st: State = rt.get_state();
    assert_eq!(st.total_weight, 10);
    assert_eq!(st.pool_info.acc_per_share, BigInt::from(100_000_000_000_000u64));

    let info = expert_info(&rt, EXPERT_A);
    assert_eq!(info, ExpertInfo::default());

    rt.set_epoch(6);
    claim(&mut rt, EXPERT_B, 0);
    assert_eq!(expert_info(&rt, EXPERT_B).locked_funds, atto(1000));
    assert_invariants(&rt);
}

#[test]
fn reset_keeps_unlocked_funds() {
    let mut rt = construct_and_verify();
    grant_reset(&mut rt);
    deposit(&mut rt, EXPERT_A, 10).unwrap();
    apply_rewards(&mut rt, 1000);
    rt.set_epoch(5);
    claim(&mut rt, EXPERT_A, 0);

    rt.set_epoch(28);
    reset(&mut rt, GOVERN_ACTOR_ADDR, EXPERT_A).unwrap();

    let info = expert_info(&rt, EXPERT_A);
    assert_eq!(info.weight, 0);
    assert!(info.locked_funds.is_zero());
    assert!(info.reward_debt.is_zero());
    assert!(info.vesting_funds.funds.is_empty());
    assert_eq!(info.unlocked_funds, atto(200));
    assert_invariants(&rt);

    // Already vested funds remain claimable, and the record can stake again.
    claim(&mut rt, EXPERT_A, 200);
    deposit(&mut rt, EXPERT_A, 5).unwrap();
    assert_eq!(check_expert(&mut rt, EXPERT_A).weight, 5);
    assert_invariants(&rt);
}

#[test]
fn reset_requires_grant() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();

    let err = reset(&mut rt, GOVERN_ACTOR_ADDR, EXPERT_A).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_FORBIDDEN);

    grant_reset(&mut rt);
    let err = reset(&mut rt, GOVERN_ACTOR_ADDR, EXPERT_B).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_NOT_FOUND);
}

#[test]
fn votes_decide_qualification() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();

    let ret = check_expert(&mut rt, EXPERT_A);
    assert!(ret.registered);
    assert!(!ret.qualified);
    assert_eq!(ret.weight, 10);

    notify_vote(&mut rt, EXPERT_A, TokenAmount::from_whole(10)).unwrap();
    let ret = check_expert(&mut rt, EXPERT_A);
    assert!(ret.qualified);
    assert_eq!(ret.votes, TokenAmount::from_whole(10));

    notify_vote(&mut rt, EXPERT_A, TokenAmount::from_whole(-4)).unwrap();
    let ret = check_expert(&mut rt, EXPERT_A);
    assert!(!ret.qualified);
    assert_eq!(ret.votes, TokenAmount::from_whole(6));

    let err = notify_vote(&mut rt, EXPERT_A, TokenAmount::from_whole(-7)).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_ILLEGAL_ARGUMENT);
    assert_invariants(&rt);
}

#[test]
fn only_vote_actor_notifies() {
    let mut rt = construct_and_verify();
    rt.set_caller(Type::Account, VOTER);
    rt.expect_validate_caller_type(vec![Type::Vote]);
    let err = rt
        .call::<ExpertFundActor>(
            Method::NotifyVote as u64,
            &RawBytes::serialize(NotifyVoteParams {
                expert: EXPERT_A,
                amount: atto(1),
            })
            .unwrap(),
        )
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_FORBIDDEN);
    rt.verify();
}

#[test]
fn unknown_expert_is_unregistered() {
    let mut rt = construct_and_verify();
    let ret = check_expert(&mut rt, EXPERT_B);
    assert_eq!(
        ret,
        CheckExpertReturn {
            registered: false,
            qualified: false,
            weight: 0,
            votes: TokenAmount::zero(),
        }
    );
}

#[test]
fn invariants_flag_weight_mismatch() {
    let mut rt = construct_and_verify();
    deposit(&mut rt, EXPERT_A, 10).unwrap();

    let mut st: State = rt.get_state();
    st.total_weight = 11;
    rt.replace_state(&st);

    let st: State = rt.get_state();
    let balance = rt.balance.borrow().clone();
    let (_, acc) = check_state_invariants(&st, &rt.store, &balance);
    assert_eq!(acc.len(), 1);
}

#[test]
fn unknown_method_is_unhandled() {
    let mut rt = construct_and_verify();
    let err = rt
        .call::<ExpertFundActor>(42, &RawBytes::default())
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::USR_UNHANDLED_MESSAGE);
}
