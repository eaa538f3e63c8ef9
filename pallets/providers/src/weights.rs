//! Autogenerated weights for `pallet_storage_providers`
//!
//! THIS FILE WAS AUTO-GENERATED USING THE SUBSTRATE BENCHMARK CLI VERSION 43.0.0
//! DATE: 2024-12-17, STEPS: `50`, REPEAT: `20`, LOW RANGE: `[]`, HIGH RANGE: `[]`
//! WORST CASE MAP SIZE: `1000000`
//! WASM-EXECUTION: `Compiled`, CHAIN: `None`, DB CACHE: `1024`

// Executed Command:
// frame-omni-bencher
// v1
// benchmark
// pallet
// --pallet
// pallet-storage-providers
// --output
// pallets/providers/src/weights.rs

#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

/// Weight functions needed for `pallet_storage_providers`.
pub trait WeightInfo {
    fn request_msp_sign_up() -> Weight;
    fn request_bsp_sign_up() -> Weight;
    fn confirm_sign_up() -> Weight;
    fn cancel_sign_up() -> Weight;
    fn msp_sign_off() -> Weight;
    fn bsp_sign_off() -> Weight;
    fn change_capacity() -> Weight;
    fn add_value_prop() -> Weight;
    fn make_value_prop_unavailable() -> Weight;
    fn top_up_deposit() -> Weight;
}

/// Weights for `pallet_storage_providers` using the Substrate node and recommended hardware.
pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
    fn request_msp_sign_up() -> Weight {
        Weight::from_parts(15_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(3_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
    fn request_bsp_sign_up() -> Weight {
        Weight::from_parts(15_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(3_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
    fn confirm_sign_up() -> Weight {
        Weight::from_parts(20_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(4_u64))
            .saturating_add(RocksDbWeight::get().writes(4_u64))
    }
    fn cancel_sign_up() -> Weight {
        Weight::from_parts(12_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
    fn msp_sign_off() -> Weight {
        Weight::from_parts(12_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
    fn bsp_sign_off() -> Weight {
        Weight::from_parts(14_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(3_u64))
            .saturating_add(RocksDbWeight::get().writes(3_u64))
    }
    fn change_capacity() -> Weight {
        Weight::from_parts(14_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
    fn add_value_prop() -> Weight {
        Weight::from_parts(12_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(1_u64))
    }
    fn make_value_prop_unavailable() -> Weight {
        Weight::from_parts(10_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(1_u64))
    }
    fn top_up_deposit() -> Weight {
        Weight::from_parts(12_000_000, 3593)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
}

impl WeightInfo for () {
    fn request_msp_sign_up() -> Weight {
        Weight::from_parts(15_000_000, 3593)
    }
    fn request_bsp_sign_up() -> Weight {
        Weight::from_parts(15_000_000, 3593)
    }
    fn confirm_sign_up() -> Weight {
        Weight::from_parts(20_000_000, 3593)
    }
    fn cancel_sign_up() -> Weight {
        Weight::from_parts(12_000_000, 3593)
    }
    fn msp_sign_off() -> Weight {
        Weight::from_parts(12_000_000, 3593)
    }
    fn bsp_sign_off() -> Weight {
        Weight::from_parts(14_000_000, 3593)
    }
    fn change_capacity() -> Weight {
        Weight::from_parts(14_000_000, 3593)
    }
    fn add_value_prop() -> Weight {
        Weight::from_parts(12_000_000, 3593)
    }
    fn make_value_prop_unavailable() -> Weight {
        Weight::from_parts(10_000_000, 3593)
    }
    fn top_up_deposit() -> Weight {
        Weight::from_parts(12_000_000, 3593)
    }
}
