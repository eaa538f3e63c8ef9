//! Autogenerated weights for `pallet_payment_streams`
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
// pallet-payment-streams
// --output
// pallets/payment-streams/src/weights.rs

#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

/// Weight functions needed for `pallet_payment_streams`.
pub trait WeightInfo {
    fn update_providers_last_chargeable_info(n: u32) -> Weight;
    fn price_index_update() -> Weight;
    fn tick_update() -> Weight;
}

/// Weights for `pallet_payment_streams` using the Substrate node and recommended hardware.
pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
    fn update_providers_last_chargeable_info(n: u32) -> Weight {
        Weight::from_parts(10_000_000, 2000)
            .saturating_add(Weight::from_parts(3_000_000, 0).saturating_mul(n as u64))
            .saturating_add(RocksDbWeight::get().reads(1_u64))
            .saturating_add(RocksDbWeight::get().writes(1_u64).saturating_mul(n as u64))
    }
    fn price_index_update() -> Weight {
        Weight::from_parts(5_000_000, 1000)
            .saturating_add(RocksDbWeight::get().reads(1_u64))
            .saturating_add(RocksDbWeight::get().writes(1_u64))
    }
    fn tick_update() -> Weight {
        Weight::from_parts(5_000_000, 1000)
            .saturating_add(RocksDbWeight::get().reads(1_u64))
            .saturating_add(RocksDbWeight::get().writes(1_u64))
    }
}

impl WeightInfo for () {
    fn update_providers_last_chargeable_info(_n: u32) -> Weight {
        Weight::from_parts(10_000_000, 2000)
    }
    fn price_index_update() -> Weight {
        Weight::from_parts(5_000_000, 1000)
    }
    fn tick_update() -> Weight {
        Weight::from_parts(5_000_000, 1000)
    }
}
