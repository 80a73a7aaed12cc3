// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_shared::econ::TokenAmount;

use crate::{actor_error, ActorError};

pub const HAMT_BIT_WIDTH: u32 = 5;

/// Rejects a negative token amount supplied as a method parameter.
pub fn require_non_negative(amount: &TokenAmount, what: &str) -> Result<(), ActorError> {
    if amount.is_negative() {
        return Err(actor_error!(illegal_argument; "negative {}: {}", what, amount));
    }
    Ok(())
}
