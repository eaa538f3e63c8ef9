//! Autogenerated weights for `pallet_proofs_dealer`
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
// pallet-proofs-dealer
// --output
// pallets/proofs-dealer/src/weights.rs

#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

/// Weight functions needed for `pallet_proofs_dealer`.
pub trait WeightInfo {
    fn challenge() -> Weight;
    fn submit_proof_no_checkpoint_challenges_key_proofs(n: u32) -> Weight;
    fn submit_proof_with_checkpoint_challenges_key_proofs(n: u32) -> Weight;
    fn force_initialise_challenge_cycle() -> Weight;
    fn set_paused() -> Weight;
    fn on_finalize() -> Weight;
}

/// Weights for `pallet_proofs_dealer` using the Substrate node and recommended hardware.
pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
    fn challenge() -> Weight {
        Weight::from_parts(30_000_000, 3500)
            .saturating_add(RocksDbWeight::get().reads(3_u64))
            .saturating_add(RocksDbWeight::get().writes(1_u64))
    }
    fn submit_proof_no_checkpoint_challenges_key_proofs(n: u32) -> Weight {
        Weight::from_parts(40_000_000, 4500)
            .saturating_add(Weight::from_parts(5_000_000, 0).saturating_mul(n as u64))
            .saturating_add(RocksDbWeight::get().reads(5_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
    fn submit_proof_with_checkpoint_challenges_key_proofs(n: u32) -> Weight {
        Weight::from_parts(50_000_000, 5500)
            .saturating_add(Weight::from_parts(5_000_000, 0).saturating_mul(n as u64))
            .saturating_add(RocksDbWeight::get().reads(6_u64))
            .saturating_add(RocksDbWeight::get().writes(3_u64))
    }
    fn force_initialise_challenge_cycle() -> Weight {
        Weight::from_parts(25_000_000, 3000)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(2_u64))
    }
    fn set_paused() -> Weight {
        Weight::from_parts(10_000_000, 1500)
            .saturating_add(RocksDbWeight::get().writes(1_u64))
    }
    fn on_finalize() -> Weight {
        Weight::from_parts(15_000_000, 2000)
            .saturating_add(RocksDbWeight::get().reads(2_u64))
            .saturating_add(RocksDbWeight::get().writes(1_u64))
    }
}

impl WeightInfo for () {
    fn challenge() -> Weight {
        Weight::from_parts(30_000_000, 3500)
    }
    fn submit_proof_no_checkpoint_challenges_key_proofs(_n: u32) -> Weight {
        Weight::from_parts(40_000_000, 4500)
    }
    fn submit_proof_with_checkpoint_challenges_key_proofs(_n: u32) -> Weight {
        Weight::from_parts(50_000_000, 5500)
    }
    fn force_initialise_challenge_cycle() -> Weight {
        Weight::from_parts(25_000_000, 3000)
    }
    fn set_paused() -> Weight {
        Weight::from_parts(10_000_000, 1500)
    }
    fn on_finalize() -> Weight {
        Weight::from_parts(15_000_000, 2000)
    }
}
