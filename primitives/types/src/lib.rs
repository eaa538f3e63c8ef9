//! Generally-used primitive types shared between the StorageHub runtime and the off-chain
//! provider client.
#![cfg_attr(not(feature = "std"), no_std)]

use sp_runtime::traits::BlakeTwo256;
use sp_trie::LayoutV1;

/// The Merkle Patricia Trie layout used throughout StorageHub: both the per-provider Forest
/// and each file's chunk trie are built with this layout, keyed and hashed with
/// [`BlakeTwo256`].
///
/// Kept as a single alias so that a future change of hash function only touches this file.
pub type StorageProofsMerkleTrieLayout = LayoutV1<BlakeTwo256>;

/// 32-byte hash type used for block hashes, file keys, and trie roots across the protocol.
pub type Hash = sp_core::H256;
