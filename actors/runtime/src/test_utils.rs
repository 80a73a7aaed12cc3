// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};

use cid::Cid;
use fvm_ipld_blockstore::MemoryBlockstore;
use fvm_ipld_encoding::{CborStore, RawBytes};
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use fvm_shared::MethodNum;
use multihash_codetable::Code;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::runtime::builtins::Type;
use crate::runtime::{ActorCode, Governance, MessageInfo, Policy, Runtime, RuntimePolicy};
use crate::{actor_error, ActorError};

/// Single-actor runtime driven by expectations. Every caller validation and every send
/// the actor performs must have been announced beforehand, and `verify` fails the test if
/// an announced expectation was not consumed.
pub struct MockRuntime {
    pub epoch: ChainEpoch,
    pub receiver: Address,
    pub caller: Address,
    pub caller_type: Type,
    pub value_received: TokenAmount,
    pub circulating_supply: TokenAmount,
    pub policy: Policy,
    pub grants: HashSet<(Address, Type, MethodNum)>,

    // Actor State
    pub state: Option<Cid>,
    pub balance: RefCell<TokenAmount>,

    // VM Impl
    pub in_call: bool,
    pub in_transaction: bool,
    pub store: MemoryBlockstore,

    // Expectations
    pub expectations: RefCell<Expectations>,
}

#[derive(Default)]
pub struct Expectations {
    pub expect_validate_caller_any: bool,
    pub expect_validate_caller_addr: Option<Vec<Address>>,
    pub expect_validate_caller_type: Option<Vec<Type>>,
    pub expect_sends: VecDeque<ExpectedMessage>,
}

impl Expectations {
    fn reset(&mut self) {
        *self = Default::default();
    }

    fn verify(&mut self) {
        assert!(
            !self.expect_validate_caller_any,
            "expected ValidateCallerAny, not received"
        );
        assert!(
            self.expect_validate_caller_addr.is_none(),
            "expected ValidateCallerAddr {:?}, not received",
            self.expect_validate_caller_addr
        );
        assert!(
            self.expect_validate_caller_type.is_none(),
            "expected ValidateCallerType {:?}, not received",
            self.expect_validate_caller_type
        );
        assert!(
            self.expect_sends.is_empty(),
            "expected all message to be send, unsent messages {:?}",
            self.expect_sends
        );
        self.reset();
    }
}

#[derive(Clone, Debug)]
pub struct ExpectedMessage {
    pub to: Address,
    pub method: MethodNum,
    pub params: RawBytes,
    pub value: TokenAmount,

    // returns from applying expectedMessage
    pub send_return: RawBytes,
    pub exit_code: ExitCode,
}

impl MockRuntime {
    pub fn new(receiver: Address) -> Self {
        Self {
            epoch: 0,
            receiver,
            caller: Address::new_id(0),
            caller_type: Type::Account,
            value_received: TokenAmount::zero(),
            circulating_supply: TokenAmount::zero(),
            policy: Policy::default(),
            grants: HashSet::new(),

            state: None,
            balance: RefCell::new(TokenAmount::zero()),

            in_call: false,
            in_transaction: false,
            store: MemoryBlockstore::default(),

            expectations: Default::default(),
        }
    }

    fn require_in_call(&self) {
        assert!(
            self.in_call,
            "invalid runtime invocation outside of method call"
        );
    }

    pub fn get_state<T: DeserializeOwned>(&self) -> T {
        let cid = self.state.as_ref().expect("state not constructed");
        self.store
            .get_cbor(cid)
            .expect("failed to load state")
            .expect("state missing from store")
    }

    pub fn replace_state<C: Serialize>(&mut self, obj: &C) {
        self.state = Some(self.store.put_cbor(obj, Code::Blake2b256).unwrap());
    }

    pub fn set_caller(&mut self, caller_type: Type, caller: Address) {
        self.caller = caller;
        self.caller_type = caller_type;
    }

    pub fn set_value(&mut self, value: TokenAmount) {
        self.value_received = value;
    }

    pub fn set_balance(&mut self, amount: TokenAmount) {
        *self.balance.get_mut() = amount;
    }

    pub fn add_balance(&mut self, amount: TokenAmount) {
        *self.balance.get_mut() += amount;
    }

    pub fn set_epoch(&mut self, epoch: ChainEpoch) {
        self.epoch = epoch;
    }

    pub fn set_circulating_supply(&mut self, circ: TokenAmount) {
        self.circulating_supply = circ;
    }

    pub fn grant(&mut self, caller: Address, actor: Type, method: MethodNum) {
        self.grants.insert((caller, actor, method));
    }

    pub fn expect_validate_caller_any(&self) {
        self.expectations.borrow_mut().expect_validate_caller_any = true;
    }

    pub fn expect_validate_caller_addr(&self, addr: Vec<Address>) {
        assert!(!addr.is_empty(), "addrs must be non-empty");
        self.expectations.borrow_mut().expect_validate_caller_addr = Some(addr);
    }

    pub fn expect_validate_caller_type(&self, types: Vec<Type>) {
        assert!(!types.is_empty(), "types must be non-empty");
        self.expectations.borrow_mut().expect_validate_caller_type = Some(types);
    }

    pub fn expect_send(
        &self,
        to: Address,
        method: MethodNum,
        params: RawBytes,
        value: TokenAmount,
        send_return: RawBytes,
        exit_code: ExitCode,
    ) {
        self.expectations
            .borrow_mut()
            .expect_sends
            .push_back(ExpectedMessage {
                to,
                method,
                params,
                value,
                send_return,
                exit_code,
            })
    }

    /// Invokes `method` on actor `A` as the configured caller. An aborted call leaves
    /// neither state nor balance changes behind.
    pub fn call<A: ActorCode>(
        &mut self,
        method: MethodNum,
        params: &RawBytes,
    ) -> Result<RawBytes, ActorError> {
        self.in_call = true;
        let prev_state = self.state;
        let prev_balance = self.balance.borrow().clone();
        let res = A::invoke_method::<MemoryBlockstore, Self>(self, method, params);
        if res.is_err() {
            self.state = prev_state;
            *self.balance.get_mut() = prev_balance;
        }
        self.in_call = false;
        res
    }

    #[track_caller]
    pub fn verify(&mut self) {
        self.expectations.borrow_mut().verify();
    }

    pub fn reset(&mut self) {
        self.expectations.borrow_mut().reset();
    }
}

impl MessageInfo for MockRuntime {
    fn caller(&self) -> Address {
        self.caller
    }
    fn receiver(&self) -> Address {
        self.receiver
    }
    fn value_received(&self) -> TokenAmount {
        self.value_received.clone()
    }
}

impl RuntimePolicy for MockRuntime {
    fn policy(&self) -> &Policy {
        &self.policy
    }
}

impl Governance for MockRuntime {
    fn is_granted(&self, caller: &Address, actor: Type, method: MethodNum) -> bool {
        self.grants.contains(&(*caller, actor, method))
    }
}

impl Runtime<MemoryBlockstore> for MockRuntime {
    fn message(&self) -> &dyn MessageInfo {
        self.require_in_call();
        self
    }

    fn curr_epoch(&self) -> ChainEpoch {
        self.require_in_call();
        self.epoch
    }

    fn validate_immediate_caller_accept_any(&mut self) -> Result<(), ActorError> {
        self.require_in_call();
        let mut expectations = self.expectations.borrow_mut();
        assert!(
            expectations.expect_validate_caller_any,
            "unexpected validate-caller-any"
        );
        expectations.expect_validate_caller_any = false;
        Ok(())
    }

    fn validate_immediate_caller_is<'a, I>(&mut self, addresses: I) -> Result<(), ActorError>
    where
        I: IntoIterator<Item = &'a Address>,
    {
        self.require_in_call();

        let addrs: Vec<Address> = addresses.into_iter().cloned().collect();
        let mut expectations = self.expectations.borrow_mut();
        assert!(!addrs.is_empty(), "addrs must be non-empty");
        assert_eq!(
            Some(&addrs),
            expectations.expect_validate_caller_addr.as_ref(),
            "unexpected validate caller addrs"
        );
        expectations.expect_validate_caller_addr = None;

        if addrs.contains(&self.caller) {
            return Ok(());
        }
        Err(actor_error!(forbidden;
            "caller address {} forbidden, allowed: {:?}",
            self.caller, &addrs
        ))
    }

    fn validate_immediate_caller_type<'a, I>(&mut self, types: I) -> Result<(), ActorError>
    where
        I: IntoIterator<Item = &'a Type>,
    {
        self.require_in_call();

        let types: Vec<Type> = types.into_iter().cloned().collect();
        let mut expectations = self.expectations.borrow_mut();
        assert!(!types.is_empty(), "types must be non-empty");
        assert_eq!(
            Some(&types),
            expectations.expect_validate_caller_type.as_ref(),
            "unexpected validate caller code"
        );
        expectations.expect_validate_caller_type = None;

        if types.contains(&self.caller_type) {
            return Ok(());
        }
        Err(actor_error!(forbidden;
            "caller type {} forbidden, allowed: {:?}",
            self.caller_type.name(), types
        ))
    }

    fn current_balance(&self) -> TokenAmount {
        self.require_in_call();
        self.balance.borrow().clone()
    }

    fn total_circ_supply(&self) -> TokenAmount {
        self.circulating_supply.clone()
    }

    fn create<C: Serialize>(&mut self, obj: &C) -> Result<(), ActorError> {
        if self.state.is_some() {
            return Err(actor_error!(illegal_state; "state already constructed"));
        }
        self.state = Some(
            self.store
                .put_cbor(obj, Code::Blake2b256)
                .map_err(|e| actor_error!(illegal_state; e))?,
        );
        Ok(())
    }

    fn state<C: DeserializeOwned>(&self) -> Result<C, ActorError> {
        let cid = self
            .state
            .as_ref()
            .ok_or_else(|| actor_error!(illegal_state; "state not constructed"))?;
        self.store
            .get_cbor(cid)
            .map_err(|e| actor_error!(illegal_state; e))?
            .ok_or_else(|| actor_error!(illegal_state; "state not found"))
    }

    fn transaction<C, RT, F>(&mut self, f: F) -> Result<RT, ActorError>
    where
        C: Serialize + DeserializeOwned,
        F: FnOnce(&mut C, &mut Self) -> Result<RT, ActorError>,
    {
        if self.in_transaction {
            return Err(actor_error!(assertion_failed; "nested transaction"));
        }
        let mut read_only: C = self.state()?;
        self.in_transaction = true;
        let ret = f(&mut read_only, self);
        self.in_transaction = false;

        let ret = ret?;
        self.state = Some(
            self.store
                .put_cbor(&read_only, Code::Blake2b256)
                .map_err(|e| actor_error!(illegal_state; e))?,
        );
        Ok(ret)
    }

    fn store(&self) -> &MemoryBlockstore {
        &self.store
    }

    fn send(
        &self,
        to: &Address,
        method: MethodNum,
        params: RawBytes,
        value: TokenAmount,
    ) -> Result<RawBytes, ActorError> {
        self.require_in_call();
        if self.in_transaction {
            return Err(actor_error!(assertion_failed; "side-effect within transaction"));
        }

        let mut expectations = self.expectations.borrow_mut();
        let expected_msg = expectations.expect_sends.pop_front().unwrap_or_else(|| {
            panic!(
                "unexpected message to: {} method: {}, value: {}, params: {:?}",
                to, method, value, params
            )
        });

        assert!(
            expected_msg.to == *to
                && expected_msg.method == method
                && expected_msg.params == params
                && expected_msg.value == value,
            "message being sent does not match expectation.\nMessage -\t to: {} method: {} value: {} params: {:?}\nExpected -\t {:?}",
            to,
            method,
            value,
            params,
            expected_msg
        );

        if !expected_msg.exit_code.is_success() {
            return Err(ActorError::unchecked(
                expected_msg.exit_code,
                format!("send to {} method {} aborted", to, method),
            ));
        }

        let mut balance = self.balance.borrow_mut();
        if value > *balance {
            return Err(ActorError::unchecked(
                ExitCode::SYS_INSUFFICIENT_FUNDS,
                format!("cannot send value: {} exceeds balance: {}", value, *balance),
            ));
        }
        *balance -= value;

        Ok(expected_msg.send_return)
    }
}
