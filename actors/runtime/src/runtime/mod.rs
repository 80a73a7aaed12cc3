// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::MethodNum;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use self::actor_code::*;
pub use self::policy::*;

use self::builtins::Type;
use crate::ActorError;

mod actor_code;
pub mod builtins;
pub mod policy;

/// Runtime is the VM's internal runtime object.
/// This is everything that is accessible to actors, beyond parameters.
pub trait Runtime<BS: Blockstore>: RuntimePolicy + Governance {
    /// Information related to the current message being executed.
    fn message(&self) -> &dyn MessageInfo;

    /// The current chain epoch number. The genesis block has epoch zero.
    fn curr_epoch(&self) -> ChainEpoch;

    /// Validates the caller against some predicate.
    /// Exported actor methods must invoke at least one caller validation before returning.
    fn validate_immediate_caller_accept_any(&mut self) -> Result<(), ActorError>;
    fn validate_immediate_caller_is<'a, I>(&mut self, addresses: I) -> Result<(), ActorError>
    where
        I: IntoIterator<Item = &'a Address>;
    fn validate_immediate_caller_type<'a, I>(&mut self, types: I) -> Result<(), ActorError>
    where
        I: IntoIterator<Item = &'a Type>;

    /// The balance of the receiver. Includes the value received with the message.
    fn current_balance(&self) -> TokenAmount;

    /// The circulating supply of tokens at the current epoch.
    fn total_circ_supply(&self) -> TokenAmount;

    /// Initializes the state object.
    /// This is only valid when the state has not yet been initialized.
    fn create<C: Serialize>(&mut self, obj: &C) -> Result<(), ActorError>;

    /// Loads a readonly copy of the state of the receiver into the argument.
    fn state<C: DeserializeOwned>(&self) -> Result<C, ActorError>;

    /// Loads the actor state, hands a mutable copy to `f` and persists it only when `f`
    /// returns `Ok`. An error from `f` discards every mutation made inside the closure.
    /// Sending messages is prohibited while the closure runs.
    fn transaction<C, RT, F>(&mut self, f: F) -> Result<RT, ActorError>
    where
        C: Serialize + DeserializeOwned,
        F: FnOnce(&mut C, &mut Self) -> Result<RT, ActorError>;

    /// Returns reference to blockstore
    fn store(&self) -> &BS;

    /// Sends a message to another actor, returning the exit code and return value envelope.
    /// A failed send does not unwind the caller's committed state; the caller decides
    /// whether to abort or to carry on.
    fn send(
        &self,
        to: &Address,
        method: MethodNum,
        params: RawBytes,
        value: TokenAmount,
    ) -> Result<RawBytes, ActorError>;
}

/// Message information available to the actor about executing message.
pub trait MessageInfo {
    /// The address of the immediate calling actor. Always an ID-address.
    fn caller(&self) -> Address;

    /// The address of the actor receiving the message. Always an ID-address.
    fn receiver(&self) -> Address;

    /// The value attached to the message being processed, implicitly
    /// added to current_balance() before method invocation.
    fn value_received(&self) -> TokenAmount;
}

/// Governance authorization, backed by the grant bitfields of the governance actor.
pub trait Governance {
    /// Whether `caller` has been granted the right to invoke `method` on actors of kind `actor`.
    fn is_granted(&self, caller: &Address, actor: Type, method: MethodNum) -> bool;
}
