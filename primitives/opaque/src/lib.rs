//! Opaque block types shared between the StorageHub node and its off-chain client.
//!
//! The client crates (`shc-blockchain-service`, `shc-file-transfer-service`, ...) need to
//! name the chain's block type without depending on the concrete runtime crate, which is
//! assembled separately and is out of scope here. `sp_runtime::OpaqueExtrinsic` lets us
//! define a block whose extrinsics are never decoded client-side, only forwarded by hash.
#![cfg_attr(not(feature = "std"), no_std)]

use sp_runtime::{
    generic,
    traits::{BlakeTwo256, Header as HeaderT},
    OpaqueExtrinsic,
};

/// Block number type used throughout the chain.
pub type BlockNumber = u32;

/// Opaque block header type.
pub type Header = generic::Header<BlockNumber, BlakeTwo256>;

/// Opaque block type, matching the concrete runtime's block at the SCALE-encoding level
/// without requiring its type.
pub type Block = generic::Block<Header, OpaqueExtrinsic>;

/// Block hash type, as used by the client to identify blocks.
pub type Hash = <Header as HeaderT>::Hash;

/// Block ID type, as used by the client for block lookups.
pub type BlockId = generic::BlockId<Block>;
