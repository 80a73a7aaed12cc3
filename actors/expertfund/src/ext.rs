// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod expert {
    use fvm_ipld_encoding::tuple::*;
    use fvm_shared::address::Address;

    pub const CONTROL_ADDRESS_METHOD: u64 = 2;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct ControlAddressReturn {
        pub owner: Address,
    }
}
