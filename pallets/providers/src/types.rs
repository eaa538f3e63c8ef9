use crate::Config;
use codec::{Decode, Encode, MaxEncodedLen};
use frame_support::{traits::fungible::Inspect, BoundedVec};
use frame_system::pallet_prelude::BlockNumberFor;
use scale_info::TypeInfo;
use sp_runtime::traits::Hash;

/// Syntactic sugar for the Balance type used by the Providers pallet's native currency.
pub type BalanceOf<T> =
    <<T as Config>::NativeBalance as Inspect<<T as frame_system::Config>::AccountId>>::Balance;

/// Syntactic sugar for the amount of storage data a Provider can commit to.
pub type StorageDataUnit<T> = <T as Config>::StorageDataUnit;

/// Syntactic sugar for the Merkle Patricia root of a Provider's or Bucket's Forest.
pub type MerklePatriciaRoot<T> = <T as Config>::MerklePatriciaRoot;

/// A Provider (MSP or BSP) is identified by the hash of its registering account, salted with
/// on-chain randomness so the ID cannot be front-run.
pub type ProviderIdFor<T> = <T as Config>::ProviderId;

/// Buckets live in the same ID space as Providers (both are content-addressed by a hash).
pub type BucketId<T> = <T as Config>::ProviderId;

/// Syntactic sugar for the identifier of a value proposition offered by a MSP.
pub type ValuePropId<T> = <T as Config>::ValuePropId;

/// Syntactic sugar for the maximum amount of multiaddresses a Provider may register.
pub type MaxMultiAddressAmount<T> = <T as Config>::MaxMultiAddressAmount;

/// A multiaddress is stored as an opaque, bounded byte string; the off-chain client is
/// responsible for interpreting it (e.g. as a libp2p multiaddr).
pub type MultiAddress<T> = BoundedVec<u8, <T as Config>::MaxMultiAddressSize>;

/// A value proposition offered by a MSP: the price and bucket-level terms under which it will
/// host data, plus an opaque commitment blob (e.g. a signed SLA) the MSP publishes off-chain.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, PartialEq, Eq, MaxEncodedLen)]
#[scale_info(skip_type_params(T))]
pub struct ValueProposition<T: Config> {
    pub price_per_giga_unit_per_tick: BalanceOf<T>,
    pub commitment: BoundedVec<u8, T::MaxCommitmentSize>,
    pub bucket_data_limit: StorageDataUnit<T>,
    pub available: bool,
}

impl<T: Config> ValueProposition<T> {
    pub fn new(
        price_per_giga_unit_per_tick: BalanceOf<T>,
        commitment: BoundedVec<u8, T::MaxCommitmentSize>,
        bucket_data_limit: StorageDataUnit<T>,
    ) -> Self {
        Self {
            price_per_giga_unit_per_tick,
            commitment,
            bucket_data_limit,
            available: true,
        }
    }

    /// Content-address this value proposition so its id is reproducible off-chain from the
    /// same inputs the MSP advertised.
    pub fn derive_id(&self) -> ValuePropId<T> {
        T::ValuePropIdHashing::hash(&self.encode())
    }
}

/// Together with its derived identifier, for events and RPC responses.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, PartialEq, Eq, MaxEncodedLen)]
#[scale_info(skip_type_params(T))]
pub struct ValuePropositionWithId<T: Config> {
    pub id: ValuePropId<T>,
    pub value_prop: ValueProposition<T>,
}

/// On-chain record of a registered Main Storage Provider.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, PartialEq, Eq, MaxEncodedLen)]
#[scale_info(skip_type_params(T))]
pub struct MainStorageProvider<T: Config> {
    pub owner_account: T::AccountId,
    pub payment_account: T::AccountId,
    pub capacity: StorageDataUnit<T>,
    pub capacity_used: StorageDataUnit<T>,
    pub multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
    pub amount_of_buckets: T::BucketCount,
    pub last_capacity_change: BlockNumberFor<T>,
    pub sign_up_block: BlockNumberFor<T>,
}

/// On-chain record of a registered Backup Storage Provider.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, PartialEq, Eq, MaxEncodedLen)]
#[scale_info(skip_type_params(T))]
pub struct BackupStorageProvider<T: Config> {
    pub owner_account: T::AccountId,
    pub payment_account: T::AccountId,
    pub capacity: StorageDataUnit<T>,
    pub capacity_used: StorageDataUnit<T>,
    pub multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
    pub root: MerklePatriciaRoot<T>,
    pub last_capacity_change: BlockNumberFor<T>,
    pub sign_up_block: BlockNumberFor<T>,
    pub reputation_weight: T::ReputationWeightType,
}

/// On-chain record of a Bucket: a logical, independently-rooted partition of a user's data,
/// optionally hosted by a MSP.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, PartialEq, Eq, MaxEncodedLen)]
#[scale_info(skip_type_params(T))]
pub struct Bucket<T: Config> {
    pub root: MerklePatriciaRoot<T>,
    pub user_id: T::AccountId,
    pub msp_id: Option<ProviderIdFor<T>>,
    pub private: bool,
    pub read_access_group_id: Option<T::ReadAccessGroupId>,
    pub size: StorageDataUnit<T>,
    pub value_prop_id: Option<ValuePropId<T>>,
}

/// Distinguishes which Provider kind an ID refers to, since MSPs and BSPs share one ID space
/// but live in different storage maps and are subject to different rules.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, Copy, PartialEq, Eq)]
#[scale_info(skip_type_params(T))]
pub enum StorageProviderId<T: Config> {
    MainStorageProvider(ProviderIdFor<T>),
    BackupStorageProvider(ProviderIdFor<T>),
}

/// The sign-up request parameters specific to the kind of Provider being requested, carried
/// inside [`SignUpRequest`] until the randomness used to derive the Provider ID becomes valid.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, PartialEq, Eq)]
#[scale_info(skip_type_params(T))]
pub enum SignUpRequestSpParams<T: Config> {
    MainStorageProvider(MainStorageProvider<T>, ValueProposition<T>),
    BackupStorageProvider(BackupStorageProvider<T>),
}

/// A pending sign-up: the deposit has already been held, but the Provider ID (derived from
/// randomness that must be a few blocks old to prevent grinding) is not yet known.
#[derive(Encode, Decode, TypeInfo, Debug, Clone, PartialEq, Eq)]
#[scale_info(skip_type_params(T))]
pub struct SignUpRequest<T: Config> {
    pub sp_sign_up_request: SignUpRequestSpParams<T>,
    pub at: BlockNumberFor<T>,
}
