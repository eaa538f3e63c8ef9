//! Cross-pallet interface traits used across StorageHub's runtime.
//!
//! Pallets in this workspace never depend on each other directly. Instead, each pallet
//! exposes the operations other pallets need to call through a trait defined here, and
//! the runtime wires concrete pallets together by implementing these traits. This keeps
//! the pallets independently buildable and testable with mocks.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use codec::{Decode, Encode, FullCodec};
use core::fmt::Debug;
use frame_support::dispatch::DispatchResult;
use frame_support::traits::Get;
use scale_info::TypeInfo;
use sp_core::Hasher;
use sp_runtime::DispatchError;
use sp_trie::TrieLayout;

/// Helper bound for types that should implement `Debug` only when compiled with `std`.
#[cfg(feature = "std")]
pub trait MaybeDebug: Debug {}
#[cfg(feature = "std")]
impl<T: Debug> MaybeDebug for T {}

#[cfg(not(feature = "std"))]
pub trait MaybeDebug {}
#[cfg(not(feature = "std"))]
impl<T> MaybeDebug for T {}

/// A single mutation to be applied to a Merkle Patricia Trie: either the addition of a new
/// leaf or the removal of an existing one.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub enum TrieMutation {
    Add(TrieAddMutation),
    Remove(TrieRemoveMutation),
}

/// Addition of a new leaf to a trie. The value held at the leaf is opaque to the pallets
/// applying the mutation; only the off-chain client interprets its contents.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct TrieAddMutation {
    pub value: Vec<u8>,
}

impl TrieAddMutation {
    pub fn new(value: Vec<u8>) -> Self {
        Self { value }
    }
}

/// Removal of an existing leaf from a trie, optionally restricted to a specific key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct TrieRemoveMutation {
    pub maybe_value: Option<Vec<u8>>,
}

impl TrieRemoveMutation {
    pub fn new() -> Self {
        Self { maybe_value: None }
    }
}

impl From<TrieAddMutation> for TrieMutation {
    fn from(mutation: TrieAddMutation) -> Self {
        TrieMutation::Add(mutation)
    }
}

impl From<TrieRemoveMutation> for TrieMutation {
    fn from(mutation: TrieRemoveMutation) -> Self {
        TrieMutation::Remove(mutation)
    }
}

/// Verifies that a proof is a valid response to a set of challenges made against a
/// previously committed-to root.
///
/// Implementors cover two shapes of commitment used throughout StorageHub: a Merkle
/// Patricia Forest (where a challenge is answered either with the exact leaf or with its
/// neighbouring leaves, proving its absence) and a single file's chunk trie (where a
/// challenge is answered with the exact chunk).
pub trait CommitmentVerifier {
    /// The type of the root that challenges and proofs are checked against.
    type Commitment: Member + FullCodec + TypeInfo + MaxEncodedLen;
    /// The type of an individual challenge.
    type Challenge: Member + FullCodec + TypeInfo + MaxEncodedLen;
    /// The type of the proof submitted in response to a set of challenges.
    type Proof: Member + FullCodec + TypeInfo;

    /// Verify that `proof` is a valid response to `challenges` under `commitment`, returning
    /// the set of keys that were proven to exist (for forest proofs) or the challenges that
    /// were answered (for key proofs).
    fn verify_proof(
        commitment: &Self::Commitment,
        challenges: &[Self::Challenge],
        proof: &Self::Proof,
    ) -> Result<alloc::collections::BTreeSet<Self::Challenge>, DispatchError>;
}

/// Applies a set of [`TrieMutation`]s to a trie, given a proof of the keys being mutated,
/// producing the resulting root and the in-memory representation of the mutated trie.
pub trait TrieProofDeltaApplier<H: Hasher> {
    type Key: Member + FullCodec + TypeInfo + MaxEncodedLen + AsRef<[u8]>;
    type Proof: Member + FullCodec + TypeInfo;

    /// Apply `mutations` to the trie described by `proof`, rooted at `root`.
    ///
    /// Returns the in-memory trie database built from the proof (so the caller can inspect
    /// or further mutate it), the new root after all mutations are applied, and, for each
    /// mutated key, the value it now holds (`None` if it was removed).
    fn apply_delta(
        root: &H::Out,
        mutations: &[(Self::Key, TrieMutation)],
        proof: &Self::Proof,
    ) -> Result<(sp_trie::MemoryDB<H>, H::Out, Vec<(Self::Key, Option<Vec<u8>>)>), DispatchError>;
}

/// Read-only access to the set of registered Storage Providers (MSPs and BSPs alike),
/// independent of their Merkle Patricia Forest.
pub trait ReadProvidersInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type MerkleHash: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type AccountId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord;
    type ProviderIdHashing: sp_runtime::traits::Hash<Output = Self::ProviderId>;

    /// Whether `who` is a registered Storage Provider, of either kind.
    fn is_provider(who: Self::ProviderId) -> bool;

    /// The Provider ID registered to `who`, if there is one (as either an MSP or a BSP).
    fn get_provider_id(who: &Self::AccountId) -> Option<Self::ProviderId>;

    /// The current Merkle Patricia Forest root of `who`.
    fn get_root(who: Self::ProviderId) -> Option<Self::MerkleHash>;

    /// The tick at which `who` registered as a Provider.
    fn get_tick_when_registered(who: Self::ProviderId) -> Option<u32>;

    /// Whether `who` is insolvent, i.e. has failed to keep its payment streams funded and
    /// should not be able to receive new storage requests or submit proofs.
    fn is_provider_insolvent(who: Self::ProviderId) -> bool;
}

/// Mutating access to a Provider's Merkle Patricia Forest root, used once an off-chain
/// mutation (file addition/removal) has been applied and proven.
pub trait MutateProvidersInterface: ReadProvidersInterface {
    type Balance: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;

    /// Overwrite the Merkle Patricia Forest root of `who`.
    fn update_root(who: Self::ProviderId, new_root: Self::MerkleHash) -> DispatchResult;

    /// Increase the amount of data `who` is recorded to be storing.
    fn increase_capacity_used(who: Self::ProviderId, delta: u64) -> DispatchResult;

    /// Decrease the amount of data `who` is recorded to be storing.
    fn decrease_capacity_used(who: Self::ProviderId, delta: u64) -> DispatchResult;
}

/// Read-only access to the Storage-Data-specific fields of a Provider (MSPs and BSPs),
/// such as capacity, value propositions and multiaddresses.
pub trait ReadStorageProvidersInterface: ReadProvidersInterface {
    type StorageDataUnit: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen + Into<u64> + From<u64>;
    type ValuePropId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type MultiAddress: Parameter + Member + MaybeSerializeDeserialize + Debug;
    type MaxNumberOfMultiAddresses: Get<u32>;

    /// Total capacity (in storage data units) that `who` has committed to providing.
    fn get_capacity(who: &Self::ProviderId) -> Self::StorageDataUnit;

    /// Amount of capacity currently in use by `who`.
    fn get_used_capacity(who: &Self::ProviderId) -> Self::StorageDataUnit;

    /// Available (unused) capacity of `who`.
    fn available_capacity(who: &Self::ProviderId) -> Self::StorageDataUnit;

    /// Whether `who` is registered as an MSP.
    fn is_msp(who: &Self::ProviderId) -> bool;

    /// Whether `who` is registered as a BSP.
    fn is_bsp(who: &Self::ProviderId) -> bool;

    /// The MultiAddresses `who` advertises to be reachable at, if it is a Provider.
    fn get_multiaddresses(who: &Self::ProviderId) -> Option<Vec<Self::MultiAddress>>;
}

/// Mutating access to a Storage Provider's capacity and value propositions.
pub trait MutateStorageProvidersInterface: ReadStorageProvidersInterface {
    /// Increase `who`'s used capacity by `delta`, failing if it would exceed its total capacity.
    fn increase_capacity_used(who: &Self::ProviderId, delta: Self::StorageDataUnit) -> DispatchResult;

    /// Decrease `who`'s used capacity by `delta`, saturating at zero.
    fn decrease_capacity_used(who: &Self::ProviderId, delta: Self::StorageDataUnit) -> DispatchResult;
}

/// Read-only access to the subset of a Provider's state relevant to the challenge/proof
/// protocol: its stake (determining challenge frequency) and its Merkle Patricia Forest root.
pub trait ReadChallengeableProvidersInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type AccountId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord;
    type Balance: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;
    type MerkleHash: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;

    /// Whether `who` is a registered, challengeable Storage Provider.
    fn is_provider(who: Self::ProviderId) -> bool;

    /// The account controlling Provider `who`.
    fn get_provider_id(who: &Self::AccountId) -> Option<Self::ProviderId>;

    /// The current Merkle Patricia Forest root of `who`.
    fn get_root(who: Self::ProviderId) -> Option<Self::MerkleHash>;

    /// The amount `who` has staked as a Provider, determining its proof submission period.
    fn get_stake(who: Self::ProviderId) -> Option<Self::Balance>;
}

/// Mutating access used by the proofs-dealer pallet to slash misbehaving Providers and to
/// apply Merkle Patricia Forest mutations once a proof has been verified.
pub trait MutateChallengeableProvidersInterface: ReadChallengeableProvidersInterface {
    /// Slash `provider_id` for having missed `accrued_failed_proof_submissions` proof
    /// submissions in a row.
    fn slash(provider_id: &Self::ProviderId, accrued_failed_proof_submissions: u32) -> DispatchResult;

    /// Overwrite the Merkle Patricia Forest root of `provider_id`.
    fn update_root(provider_id: Self::ProviderId, new_root: Self::MerkleHash) -> DispatchResult;

    /// Mark `provider_id` as having stopped storing everything (e.g. on exit), resetting
    /// its root to the default (empty trie) root.
    fn top_up_deposit(provider_id: &Self::ProviderId) -> DispatchResult;
}

/// Read-only access to Buckets (logical partitions of an MSP-hosted namespace).
pub trait ReadBucketsInterface {
    type AccountId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord;
    type BucketId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type MerkleHash: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type ReadAccessGroupId: Parameter + Member + MaybeSerializeDeserialize + Debug;
    type StorageDataUnit: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;
    type BucketNameLimit: Get<u32>;

    /// Whether `bucket_id` is a registered bucket.
    fn bucket_exists(bucket_id: &Self::BucketId) -> bool;

    /// The owner of `bucket_id`.
    fn get_bucket_owner(bucket_id: &Self::BucketId) -> Result<Self::AccountId, DispatchError>;

    /// The size (in storage data units) of the content currently stored in `bucket_id`.
    fn get_bucket_size(bucket_id: &Self::BucketId) -> Result<Self::StorageDataUnit, DispatchError>;

    /// Whether `bucket_id` is privately readable (vs. publicly readable).
    fn is_bucket_private(bucket_id: &Self::BucketId) -> Result<bool, DispatchError>;

    /// The Merkle Patricia Forest root of `bucket_id`.
    fn get_root_bucket(bucket_id: &Self::BucketId) -> Option<Self::MerkleHash>;

    /// The MSP currently assigned to host `bucket_id`, if any.
    fn get_msp_of_bucket(bucket_id: &Self::BucketId) -> Option<Self::ProviderId>;

    /// The NFT collection ID gating read access to `bucket_id`, if access is restricted.
    fn get_read_access_group_id_of_bucket(
        bucket_id: &Self::BucketId,
    ) -> Result<Option<Self::ReadAccessGroupId>, DispatchError>;
}

/// Mutating access to Buckets, used by the file-system pallet to create, move and resize
/// buckets as storage requests and deletions are processed.
pub trait MutateBucketsInterface: ReadBucketsInterface {
    /// Register a new bucket owned by `user`, hosted by `msp_id`, with root set to the
    /// empty trie root.
    fn add_bucket(
        msp_id: Self::ProviderId,
        user: Self::AccountId,
        bucket_id: Self::BucketId,
        private: bool,
        maybe_read_access_group_id: Option<Self::ReadAccessGroupId>,
    ) -> DispatchResult;

    /// Overwrite the Merkle Patricia Forest root of `bucket_id`.
    fn change_root_bucket(bucket_id: Self::BucketId, new_root: Self::MerkleHash) -> DispatchResult;

    /// Remove a bucket entirely. Fails if it still has content.
    fn remove_root_bucket(bucket_id: Self::BucketId) -> DispatchResult;

    /// Assign `msp_id` as the new host of `bucket_id`.
    fn assign_msp_to_bucket(
        bucket_id: &Self::BucketId,
        msp_id: Self::ProviderId,
    ) -> DispatchResult;

    /// Clear the MSP currently hosting `bucket_id`.
    fn unassign_msp_from_bucket(bucket_id: &Self::BucketId) -> DispatchResult;

    /// Change whether `bucket_id` is privately readable, and its read access group.
    fn update_bucket_privacy(
        bucket_id: Self::BucketId,
        private: bool,
        maybe_read_access_group_id: Option<Self::ReadAccessGroupId>,
    ) -> DispatchResult;

    /// Increase the recorded size of `bucket_id` by `delta`.
    fn increase_bucket_size(bucket_id: &Self::BucketId, delta: Self::StorageDataUnit) -> DispatchResult;

    /// Decrease the recorded size of `bucket_id` by `delta`, saturating at zero.
    fn decrease_bucket_size(bucket_id: &Self::BucketId, delta: Self::StorageDataUnit) -> DispatchResult;
}

/// Common interface combining the read capabilities every pallet that just needs "is this
/// account a Provider, and what is its root" cares about. Implemented by the Providers
/// pallet for payment-streams.
pub trait ProvidersInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type AccountId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord;
    type MerkleHash: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type Balance: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;

    fn is_provider(who: Self::ProviderId) -> bool;
    fn get_provider_id(who: &Self::AccountId) -> Option<Self::ProviderId>;
    fn get_root(who: Self::ProviderId) -> Option<Self::MerkleHash>;
    fn get_default_root() -> Self::MerkleHash;
}

/// Notifies interested pallets of Provider lifecycle events (sign-up and sign-off), so
/// they can set up or tear down ancillary state such as payment streams.
pub trait SubscribeProvidersInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;

    /// Called when `who` registers as a Provider.
    fn subscribe_provider_sign_up(who: &Self::ProviderId) -> DispatchResult;

    /// Called when `who` deregisters as a Provider.
    fn subscribe_provider_sign_off(who: &Self::ProviderId) -> DispatchResult;
}

/// Aggregate, network-wide metrics exposed by the Providers pallet, used by pricing and
/// treasury calculations.
pub trait SystemMetricsInterface {
    type ProvidedUnit: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen + Into<u64>;

    /// Total storage data capacity currently committed by BSPs across the network.
    fn get_total_capacity() -> Self::ProvidedUnit;

    /// Total storage data capacity currently used by BSPs across the network.
    fn get_total_used_capacity() -> Self::ProvidedUnit;
}

/// Allows a pallet to react to changes in the network-wide price of storage, e.g. to
/// recompute payment stream rates.
pub trait UpdateStoragePrice {
    type Price: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;
    type StorageDataUnit: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;

    /// Recompute the current price per storage data unit per tick, given the current price
    /// and the system's used and total capacity.
    fn update_storage_price(
        current_price: Self::Price,
        used_capacity: Self::StorageDataUnit,
        total_capacity: Self::StorageDataUnit,
    ) -> Self::Price;
}

/// Read access to the current network price of storage, charged by payment streams.
pub trait PricePerGigaUnitPerTickInterface {
    type PricePerGigaUnitPerTick: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;

    fn get_price_per_giga_unit_per_tick() -> Self::PricePerGigaUnitPerTick;
}

/// Mutating access to the current network price of storage.
pub trait MutatePricePerGigaUnitPerTickInterface: PricePerGigaUnitPerTickInterface {
    fn set_price_per_giga_unit_per_tick(new_price: Self::PricePerGigaUnitPerTick);
}

/// The Commit-Reveal randomness cycle used to derive per-tick randomness seeds for the
/// challenge protocol.
pub trait CommitRevealRandomnessInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;

    /// Register `who` in the commit-reveal cycle, e.g. on sign-up.
    fn initialise_randomness_cycle(who: &Self::ProviderId) -> DispatchResult;

    /// Deregister `who` from the commit-reveal cycle, e.g. on sign-off.
    fn stop_randomness_cycle(who: &Self::ProviderId) -> DispatchResult;
}

/// Read-only access to the on-chain record of which Providers submitted a valid proof in
/// a given tick, used by payment-streams to only charge BSPs for ticks they actually
/// proved storage in.
pub trait ProofSubmittersInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type TickNumber: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen + Into<u32> + From<u32>;

    /// The set of Providers who submitted a valid proof in `tick`, if still in the
    /// retention window.
    fn get_proof_submitters_for_tick(
        tick: &Self::TickNumber,
    ) -> Option<alloc::collections::BTreeSet<Self::ProviderId>>;

    /// The current challenge tick.
    fn get_current_tick() -> Self::TickNumber;

    /// Whether `who` submitted a valid proof for `tick`.
    fn is_proof_submitter(tick: &Self::TickNumber, who: &Self::ProviderId) -> bool;
}

/// The proofs-dealer pallet's interface, used by file-system to enqueue challenges for
/// newly added or removed files, and by the off-chain client to query challenge state.
pub trait ProofsDealerInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type ForestProof: Parameter + Member + MaybeSerializeDeserialize + Debug;
    type KeyProof: Parameter + Member + MaybeSerializeDeserialize + Debug;
    type MerkleHash: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen + AsRef<[u8]>;
    type MerkleHashing: sp_runtime::traits::Hash<Output = Self::MerkleHash>;
    type TickNumber: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen + Into<u32> + From<u32>;
    type RandomnessOutput: Parameter + Member + MaybeSerializeDeserialize + Debug;

    /// Verify `proof` is a valid response to the challenges issued against `root`, returning
    /// the keys the proof proves membership (or non-membership) for.
    fn verify_forest_proof(
        who: &Self::ProviderId,
        challenges: &[Self::MerkleHash],
        proof: &Self::ForestProof,
    ) -> Result<alloc::collections::BTreeSet<Self::MerkleHash>, DispatchError>;

    /// Verify `proof` is a valid response for the challenges made against a single key.
    fn verify_key_proof(
        key: &Self::MerkleHash,
        challenges: &[Self::MerkleHash],
        proof: &Self::KeyProof,
    ) -> Result<alloc::collections::BTreeSet<Self::MerkleHash>, DispatchError>;

    /// Enqueue a regular challenge for `key_challenged`, to be answered at the next
    /// checkpoint challenge round by all Providers.
    fn challenge(key_challenged: &Self::MerkleHash) -> DispatchResult;

    /// Enqueue a priority challenge for `key_challenged` (e.g. a file deletion), to be
    /// answered by all Providers ahead of regular challenges.
    fn challenge_with_priority(
        key_challenged: &Self::MerkleHash,
        mutation: Option<TrieMutation>,
    ) -> DispatchResult;

    /// The current challenges tick.
    fn get_current_tick() -> Self::TickNumber;

    /// Derive the set of challenges a Provider would be given for `tick`, from the random
    /// seed generated for that tick.
    fn generate_challenges_from_seed(
        seed: Self::RandomnessOutput,
        provider_id: &Self::ProviderId,
        count: u32,
    ) -> Vec<Self::MerkleHash>;

    /// Verify a forest proof without it being tied to a specific registered Provider,
    /// given the root to check it against directly. Used by the off-chain client to
    /// validate proofs before submitting them on-chain.
    fn verify_generic_forest_proof(
        root: &Self::MerkleHash,
        challenges: &[Self::MerkleHash],
        proof: &Self::ForestProof,
    ) -> Result<alloc::collections::BTreeSet<Self::MerkleHash>, DispatchError>;

    /// Apply a set of mutations to a Merkle Patricia Forest given a proof of the keys
    /// being mutated, without requiring the forest to belong to a registered Provider.
    fn generic_apply_delta(
        root: &Self::MerkleHash,
        mutations: &[(Self::MerkleHash, TrieMutation)],
        proof: &Self::ForestProof,
    ) -> Result<Self::MerkleHash, DispatchError>;
}

/// The payment-streams pallet's interface, used by file-system to create, update and
/// delete payment streams as storage requests are accepted, resized or cancelled.
pub trait PaymentStreamsInterface {
    type ProviderId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord + Copy + MaxEncodedLen;
    type AccountId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord;
    type Balance: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;
    type Units: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen + Into<u64> + From<u64>;

    /// Create a fixed-rate payment stream from `user_account` to `provider_id`, charging
    /// `rate` per tick.
    fn create_fixed_rate_payment_stream(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
        rate: Self::Balance,
    ) -> DispatchResult;

    /// Update the rate of an existing fixed-rate payment stream.
    fn update_fixed_rate_payment_stream(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
        new_rate: Self::Balance,
    ) -> DispatchResult;

    /// Remove a fixed-rate payment stream entirely.
    fn delete_fixed_rate_payment_stream(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
    ) -> DispatchResult;

    /// Create a dynamic-rate payment stream, charging for `amount_provided` units at the
    /// network's current price per unit per tick.
    fn create_dynamic_rate_payment_stream(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
        amount_provided: Self::Units,
    ) -> DispatchResult;

    /// Update the amount provided backing an existing dynamic-rate payment stream.
    fn update_dynamic_rate_payment_stream(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
        delta: Self::Units,
    ) -> DispatchResult;

    /// Remove a dynamic-rate payment stream entirely.
    fn delete_dynamic_rate_payment_stream(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
    ) -> DispatchResult;

    /// Whether a payment stream already exists between `user_account` and `provider_id`.
    fn get_inner_fixed_rate_payment_stream_value(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
    ) -> Option<Self::Balance>;

    /// Whether a dynamic-rate payment stream already exists between `user_account` and
    /// `provider_id`, and if so, the amount it currently provides for.
    fn get_inner_dynamic_rate_payment_stream_amount_provided(
        provider_id: &Self::ProviderId,
        user_account: &Self::AccountId,
    ) -> Option<Self::Units>;
}

/// Read-only access to whether a user has fallen behind on their payment streams, used by
/// file-system to block new storage requests from insolvent users and by proofs-dealer to
/// exempt insolvent users' Providers from being slashed for data belonging to them.
pub trait ReadUserSolvencyInterface {
    type AccountId: Parameter + Member + MaybeSerializeDeserialize + Debug + Ord;

    /// Whether `who` is currently without funds, i.e. has an outstanding debt it failed to
    /// pay off within the grace period.
    fn is_user_without_funds(who: &Self::AccountId) -> bool;
}

/// Computes how much of a charged amount is diverted to the treasury, as a function of
/// network utilisation. Implementations live in `shp-treasury-funding`.
pub trait TreasuryCutCalculator {
    type Balance: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;
    type ProvidedUnit: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen;

    /// Compute the portion of `amount_to_charge` that should be diverted to the treasury,
    /// given that `used_amount` out of `provided_amount` total provided units are in use.
    fn calculate_treasury_cut(
        provided_amount: Self::ProvidedUnit,
        used_amount: Self::ProvidedUnit,
        amount_to_charge: Self::Balance,
    ) -> Self::Balance;
}

/// Access to a file's metadata encoding, kept generic over the concrete metadata type so
/// that pallets needing only to store and retrieve opaque metadata blobs (payment-streams,
/// in particular, when settling dynamic-rate streams) don't need to depend on
/// `shp-file-metadata` directly.
pub trait FileMetadataInterface {
    type Metadata: Member + FullCodec + TypeInfo + MaxEncodedLen;
    type StorageDataUnit: Parameter + Member + MaybeSerializeDeserialize + Debug + Default + Copy + MaxEncodedLen + Into<u64> + From<u64>;

    fn encode(metadata: &Self::Metadata) -> Vec<u8>;

    fn decode(data: &[u8]) -> Result<Self::Metadata, codec::Error>;

    /// The size, in storage data units, that `metadata` declares for its file.
    fn get_file_size(metadata: &Self::Metadata) -> Self::StorageDataUnit;

    /// The owner identifier (opaque bytes) that `metadata` declares for its file.
    fn owner(metadata: &Self::Metadata) -> &Vec<u8>;
}

// Re-exported for convenience so downstream crates only need to depend on `sp_trie`'s
// layout machinery, not re-derive it.
pub use sp_runtime::traits::{Member, Parameter};
pub use sp_runtime::traits::MaybeSerializeDeserialize;
pub use codec::MaxEncodedLen;

/// A `TrieLayout` whose hasher output matches `H` and whose maximum inline value length
/// is not bounded, used throughout StorageHub's Merkle Patricia Forests and file chunk
/// tries.
pub trait StorageHubTrieLayout: TrieLayout {}
impl<T: TrieLayout> StorageHubTrieLayout for T {}
