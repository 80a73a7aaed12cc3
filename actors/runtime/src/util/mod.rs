// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub use self::balance_table::BalanceTable;
pub use self::balance_table::BALANCE_TABLE_BITWIDTH;
pub use self::message_accumulator::MessageAccumulator;
pub use self::vesting::*;

mod balance_table;
pub mod cbor;
mod message_accumulator;
mod vesting;
