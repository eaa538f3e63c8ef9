#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;
pub use types::*;

mod types;
pub mod utils;
pub mod weights;

#[cfg(test)]
mod mock;

#[cfg(test)]
mod tests;

#[frame_support::pallet]
pub mod pallet {
    use super::types::*;
    use super::weights::WeightInfo as WeightInfoT;
    use codec::FullCodec;
    use frame_support::{
        dispatch::DispatchResultWithPostInfo,
        pallet_prelude::*,
        sp_runtime::traits::{CheckEqual, Hash, MaybeDisplay, SimpleBitOps},
        traits::{fungible, Randomness},
        Blake2_128Concat,
    };
    use frame_system::pallet_prelude::*;
    use scale_info::prelude::fmt::Debug;
    use shp_traits::{
        CommitRevealRandomnessInterface, FileMetadataInterface, PaymentStreamsInterface,
        ProofSubmittersInterface, ProofsDealerInterface,
    };
    use sp_runtime::traits::Convert;

    /// Configure the pallet by specifying the parameters and types on which it depends.
    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// Because this pallet emits events, it depends on the runtime's definition of an event.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfoT;

        /// Source of randomness used to salt a registering account's ID, so the resulting
        /// Provider ID cannot be predicted (and therefore front-run) before confirmation.
        type ProvidersRandomness: Randomness<<Self as frame_system::Config>::Hash, BlockNumberFor<Self>>;

        /// The off-chain client's file metadata codec, used to validate file sizes declared
        /// when a bucket's size is changed.
        type FileMetadataManager: FileMetadataInterface<StorageDataUnit = Self::StorageDataUnit>;

        /// Type to access the Balances pallet (using the fungible trait from frame_support).
        type NativeBalance: fungible::Inspect<Self::AccountId>
            + fungible::Mutate<Self::AccountId>
            + fungible::hold::Inspect<Self::AccountId, Reason = Self::RuntimeHoldReason>
            + fungible::hold::Mutate<Self::AccountId, Reason = Self::RuntimeHoldReason>;

        /// The commit-reveal randomness cycle a Provider is enrolled into on sign-up and
        /// removed from on sign-off.
        type CrRandomness: CommitRevealRandomnessInterface<ProviderId = Self::ProviderId>;

        /// The overarching hold reason.
        type RuntimeHoldReason: From<HoldReason>;

        /// Data type for the measurement of storage size.
        type StorageDataUnit: Parameter
            + Member
            + MaybeSerializeDeserialize
            + Debug
            + Default
            + MaybeDisplay
            + AtLeast32BitUnsigned
            + Copy
            + MaxEncodedLen
            + codec::HasCompact
            + Into<u64>
            + From<u64>
            + Into<BalanceOf<Self>>;

        /// The payment-streams pallet, used to create/update/remove the fixed-rate stream
        /// backing a bucket as it is assigned to a MSP or resized.
        type PaymentStreams: PaymentStreamsInterface<
                ProviderId = Self::ProviderId,
                AccountId = Self::AccountId,
                Balance = BalanceOf<Self>,
                Units = Self::StorageDataUnit,
            > + shp_traits::MutatePricePerGigaUnitPerTickInterface<PricePerGigaUnitPerTick = BalanceOf<Self>>;

        /// The proofs-dealer pallet, used to read the current tick when registering a new
        /// Provider's sign-up block.
        type ProofDealer: ProofsDealerInterface<ProviderId = Self::ProviderId>;

        /// Type that represents the total number of registered Storage Providers.
        type SpCount: Parameter
            + Member
            + MaybeSerializeDeserialize
            + Ord
            + AtLeast32BitUnsigned
            + FullCodec
            + Copy
            + Default
            + Debug
            + TypeInfo
            + MaxEncodedLen;

        /// Type that represents the total number of registered Buckets.
        type BucketCount: Parameter
            + Member
            + MaybeSerializeDeserialize
            + Ord
            + AtLeast32BitUnsigned
            + FullCodec
            + Copy
            + Default
            + Debug
            + TypeInfo
            + MaxEncodedLen;

        /// The type of the Merkle Patricia root of the storage trie for BSPs and buckets.
        type MerklePatriciaRoot: Parameter
            + Member
            + MaybeSerializeDeserialize
            + Debug
            + MaybeDisplay
            + SimpleBitOps
            + Ord
            + Default
            + Copy
            + CheckEqual
            + AsRef<[u8]>
            + AsMut<[u8]>
            + MaxEncodedLen
            + FullCodec;

        /// The hashing algorithm used to derive Merkle Patricia roots.
        type MerkleTrieHashing: Hash<Output = Self::MerklePatriciaRoot> + TypeInfo;

        /// The type of ID that uniquely identifies a Storage Provider (MSP or BSP). Also used
        /// to identify a Bucket, since Buckets and Providers share one content-addressed ID
        /// space.
        type ProviderId: Parameter
            + Member
            + MaybeSerializeDeserialize
            + Debug
            + MaybeDisplay
            + SimpleBitOps
            + Ord
            + Default
            + Copy
            + CheckEqual
            + core::hash::Hash
            + AsRef<[u8]>
            + AsMut<[u8]>
            + MaxEncodedLen;

        /// The hashing algorithm used to derive a registering account's Provider ID.
        type ProviderIdHashing: Hash<Output = Self::ProviderId> + TypeInfo;

        /// The type of the identifier of a value proposition offered by a MSP (a hash of its
        /// contents).
        type ValuePropId: Parameter
            + Member
            + MaybeSerializeDeserialize
            + Debug
            + MaybeDisplay
            + SimpleBitOps
            + Ord
            + Default
            + Copy
            + CheckEqual
            + AsRef<[u8]>
            + AsMut<[u8]>
            + MaxEncodedLen
            + FullCodec;

        /// The hashing algorithm used to derive a value proposition's identifier.
        type ValuePropIdHashing: Hash<Output = Self::ValuePropId> + TypeInfo;

        /// The NFT collection type gating read access to a private Bucket.
        type ReadAccessGroupId: Parameter + Member + MaybeSerializeDeserialize + Debug + MaxEncodedLen;

        /// Read access to which Providers submitted a valid proof in a given tick, used to
        /// decide whether a BSP's reputation weight should grow on sign-up-adjacent checks.
        type ProvidersProofSubmitters: ProofSubmittersInterface<
            ProviderId = Self::ProviderId,
            TickNumber = BlockNumberFor<Self>,
        >;

        /// Type used for a BSP's reputation weight, which scales how often it is selected to
        /// volunteer for new storage requests.
        type ReputationWeightType: Parameter
            + Member
            + MaybeSerializeDeserialize
            + Debug
            + Default
            + Copy
            + MaxEncodedLen
            + AtLeast32BitUnsigned;

        /// The current tick, used to timestamp a Provider's sign-up.
        type StorageHubTickGetter: ProofSubmittersInterface<
            ProviderId = Self::ProviderId,
            TickNumber = BlockNumberFor<Self>,
        >;

        /// Converts between [`Config::StorageDataUnit`] and the native balance, used to price
        /// a zero-size bucket's fixed-rate stream.
        type StorageDataUnitAndBalanceConvert: Convert<Self::StorageDataUnit, BalanceOf<Self>>
            + sp_runtime::traits::ConvertBack<Self::StorageDataUnit, BalanceOf<Self>>;

        /// The account that receives slashed funds and unclaimed deposits.
        type Treasury: Get<Self::AccountId>;

        /// The minimum amount that an account has to deposit to become a Storage Provider.
        #[pallet::constant]
        type SpMinDeposit: Get<BalanceOf<Self>>;

        /// The amount of storage capacity a Storage Provider is allocated per `SpMinDeposit`.
        #[pallet::constant]
        type SpMinCapacity: Get<Self::StorageDataUnit>;

        /// The slope of the collateral-vs-capacity curve: how much collateral a Storage
        /// Provider must add to increase its capacity by one [`Config::StorageDataUnit`].
        #[pallet::constant]
        type DepositPerData: Get<BalanceOf<Self>>;

        /// The maximum size, in storage data units, of a single file. Used to bound the
        /// per-failed-proof slash amount.
        #[pallet::constant]
        type MaxFileSize: Get<Self::StorageDataUnit>;

        /// The maximum size of a multiaddress.
        #[pallet::constant]
        type MaxMultiAddressSize: Get<u32>;

        /// The maximum amount of multiaddresses that a Storage Provider can register.
        #[pallet::constant]
        type MaxMultiAddressAmount: Get<u32>;

        /// The maximum number of protocols a MSP's value proposition commitment can name.
        #[pallet::constant]
        type MaxProtocols: Get<u32>;

        /// The deposit a user pays to register a new Bucket.
        #[pallet::constant]
        type BucketDeposit: Get<BalanceOf<Self>>;

        /// The maximum length of a Bucket's name, as hashed client-side into its ID.
        #[pallet::constant]
        type BucketNameLimit: Get<u32>;

        /// How many blocks must pass before the randomness used to derive a Provider ID
        /// becomes valid for confirmation, preventing grinding of favourable IDs.
        #[pallet::constant]
        type MaxBlocksForRandomness: Get<BlockNumberFor<Self>>;

        /// The minimum number of blocks that must pass between two capacity changes by the
        /// same Storage Provider.
        #[pallet::constant]
        type MinBlocksBetweenCapacityChanges: Get<BlockNumberFor<Self>>;

        /// The root of an empty Merkle Patricia Forest, assigned to newly registered BSPs and
        /// Buckets.
        #[pallet::constant]
        type DefaultMerkleRoot: Get<Self::MerklePatriciaRoot>;

        /// The amount slashed from a Provider's deposit per `MaxFileSize` of data it failed to
        /// prove possession of.
        #[pallet::constant]
        type SlashAmountPerMaxFileSize: Get<BalanceOf<Self>>;

        /// The reputation weight a new BSP starts with.
        #[pallet::constant]
        type StartingReputationWeight: Get<Self::ReputationWeightType>;

        /// The minimum number of blocks a BSP must wait, after confirming sign-up, before it
        /// is allowed to sign off.
        #[pallet::constant]
        type BspSignUpLockPeriod: Get<BlockNumberFor<Self>>;

        /// The maximum size, in bytes, of a value proposition's commitment blob.
        #[pallet::constant]
        type MaxCommitmentSize: Get<u32>;

        /// The fixed rate charged for a bucket that currently holds no data.
        #[pallet::constant]
        type ZeroSizeBucketFixedRate: Get<BalanceOf<Self>>;

        /// How long, in blocks, an insolvent Provider has to top up its deposit before it is
        /// forcibly signed off.
        #[pallet::constant]
        type ProviderTopUpTtl: Get<BlockNumberFor<Self>>;

        /// The maximum number of sign-up requests whose randomness expires in a single block,
        /// bounding the weight of the `on_idle` sweep that expires them.
        #[pallet::constant]
        type MaxExpiredItemsInBlock: Get<u32>;

        /// Benchmark-only helpers to construct values that can't be derived from `Default`.
        #[cfg(feature = "runtime-benchmarks")]
        type BenchmarkHelpers: crate::utils::benchmarking::BenchmarkHelpers<Self>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // Storage:

    /// The mapping from an AccountId to the MSP ID it registered (or requested to register).
    #[pallet::storage]
    pub type AccountIdToMainStorageProviderId<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, ProviderIdFor<T>>;

    /// The mapping from a MSP ID to its on-chain record.
    #[pallet::storage]
    pub type MainStorageProviders<T: Config> =
        StorageMap<_, Blake2_128Concat, ProviderIdFor<T>, MainStorageProvider<T>>;

    /// The value propositions a MSP currently offers, keyed by the proposition's own ID.
    #[pallet::storage]
    pub type MainStorageProviderIdsToValuePropositions<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        ProviderIdFor<T>,
        Blake2_128Concat,
        ValuePropId<T>,
        ValueProposition<T>,
    >;

    /// The mapping from an AccountId to the BSP ID it registered (or requested to register).
    #[pallet::storage]
    pub type AccountIdToBackupStorageProviderId<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, ProviderIdFor<T>>;

    /// The mapping from a BSP ID to its on-chain record.
    #[pallet::storage]
    pub type BackupStorageProviders<T: Config> =
        StorageMap<_, Blake2_128Concat, ProviderIdFor<T>, BackupStorageProvider<T>>;

    /// A sign-up request awaiting its randomness to mature before it can be confirmed. The
    /// deposit has already been held when this is inserted.
    #[pallet::storage]
    pub type SignUpRequests<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, SignUpRequest<T>>;

    /// The mapping from a Bucket ID to its on-chain record.
    #[pallet::storage]
    pub type Buckets<T: Config> = StorageMap<_, Blake2_128Concat, BucketId<T>, Bucket<T>>;

    /// Providers that have been flagged as unable to cover their current deposit (e.g. after
    /// being slashed), and the block by which they must top it up or be forcibly signed off.
    #[pallet::storage]
    pub type ProviderTopUpExpirations<T: Config> =
        StorageMap<_, Blake2_128Concat, ProviderIdFor<T>, BlockNumberFor<T>>;

    /// The amount of Main Storage Providers that are currently registered.
    #[pallet::storage]
    pub type MspCount<T: Config> = StorageValue<_, T::SpCount, ValueQuery>;

    /// The amount of Backup Storage Providers that are currently registered.
    #[pallet::storage]
    pub type BspCount<T: Config> = StorageValue<_, T::SpCount, ValueQuery>;

    /// The amount of Buckets currently registered.
    #[pallet::storage]
    pub type BucketsCount<T: Config> = StorageValue<_, T::BucketCount, ValueQuery>;

    /// The total storage capacity committed by all BSPs.
    #[pallet::storage]
    pub type TotalBspsCapacity<T: Config> = StorageValue<_, T::StorageDataUnit, ValueQuery>;

    /// The total storage capacity currently used across all BSPs.
    #[pallet::storage]
    pub type UsedBspsCapacity<T: Config> = StorageValue<_, T::StorageDataUnit, ValueQuery>;

    // Events & Errors:

    /// The events that can be emitted by this pallet.
    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A user requested to sign up as a Main Storage Provider; its deposit has been held
        /// but its Provider ID is not assigned until [`Pallet::confirm_sign_up`] is called.
        MspRequestSignUpSuccess {
            who: T::AccountId,
            multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
            capacity: T::StorageDataUnit,
        },
        /// A user requested to sign up as a Backup Storage Provider.
        BspRequestSignUpSuccess {
            who: T::AccountId,
            multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
            capacity: T::StorageDataUnit,
        },
        /// A Main Storage Provider's sign-up has been confirmed.
        MspSignUpSuccess {
            who: T::AccountId,
            msp_id: ProviderIdFor<T>,
            multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
            capacity: T::StorageDataUnit,
            value_prop: ValuePropositionWithId<T>,
        },
        /// A Backup Storage Provider's sign-up has been confirmed.
        BspSignUpSuccess {
            who: T::AccountId,
            bsp_id: ProviderIdFor<T>,
            multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
            capacity: T::StorageDataUnit,
        },
        /// A pending sign-up request was cancelled and its deposit returned in full.
        SignUpRequestCanceled { who: T::AccountId },
        /// A Main Storage Provider has signed off.
        MspSignOffSuccess {
            who: T::AccountId,
            msp_id: ProviderIdFor<T>,
        },
        /// A Backup Storage Provider has signed off.
        BspSignOffSuccess {
            who: T::AccountId,
            bsp_id: ProviderIdFor<T>,
        },
        /// A Storage Provider changed its capacity.
        CapacityChanged {
            who: T::AccountId,
            provider_id: StorageProviderId<T>,
            old_capacity: T::StorageDataUnit,
            new_capacity: T::StorageDataUnit,
            next_block_when_change_allowed: BlockNumberFor<T>,
        },
        /// A MSP added a new value proposition to its offering.
        ValuePropAdded {
            msp_id: ProviderIdFor<T>,
            value_prop_id: ValuePropId<T>,
            value_prop: ValueProposition<T>,
        },
        /// A MSP marked one of its value propositions as unavailable to new buckets.
        ValuePropUnavailable {
            msp_id: ProviderIdFor<T>,
            value_prop_id: ValuePropId<T>,
        },
        /// A Provider was slashed for failing to respond to a challenge.
        ProviderSlashed {
            provider_id: ProviderIdFor<T>,
            amount: BalanceOf<T>,
        },
        /// A Provider was flagged as insolvent and must top up its deposit or be removed.
        ProviderInsolvent { provider_id: ProviderIdFor<T> },
        /// An insolvent Provider topped up its deposit and is no longer at risk of removal.
        ProviderToppedUp { provider_id: ProviderIdFor<T> },
    }

    /// The errors that can be thrown by this pallet to inform users about what went wrong.
    #[pallet::error]
    pub enum Error<T> {
        /// The account is already registered, or has a sign-up request pending, as a MSP or
        /// BSP.
        AlreadyRegistered,
        /// The requested storage capacity is below `SpMinCapacity`.
        StorageTooLow,
        /// The account does not have enough free balance to pay the required deposit.
        NotEnoughBalance,
        /// The account is not registered, and has no pending sign-up request, as a MSP or BSP.
        NotRegistered,
        /// The Provider still has Buckets or used capacity assigned to it.
        StorageStillInUse,
        /// Not enough blocks have passed since the Provider's last capacity change.
        NotEnoughTimePassed,
        /// The Provider tried to change capacity below its currently used capacity.
        NewCapacityLessThanUsedStorage,
        /// The new capacity is equal to the current capacity.
        NewCapacityEqualsCurrentCapacity,
        /// There is no sign-up request pending for this account.
        SignUpRequestNotFound,
        /// The randomness used to derive the Provider ID is not old enough yet.
        RandomnessNotValidYet,
        /// The sign-up request's randomness expired before it was confirmed; the request has
        /// been discarded, the deposit returned, and it must be re-submitted.
        SignUpRequestExpired,
        /// The BSP is still within its `BspSignUpLockPeriod` and cannot sign off yet.
        SignOffPeriodNotPassed,
        /// The Bucket ID is not recognised as a registered Bucket.
        BucketNotFound,
        /// The signer does not own the Bucket it is trying to operate on.
        NotBucketOwner,
        /// The MSP ID does not match a registered, available value proposition.
        ValuePropositionNotFound,
        /// The value proposition has already been marked unavailable.
        ValuePropositionAlreadyUnavailable,
        /// The Provider is not flagged as insolvent, so it cannot be topped up.
        ProviderNotInsolvent,
        /// Arithmetic overflowed while computing a deposit or capacity delta.
        Overflow,
    }

    /// Hold reasons for this pallet, letting the runtime distinguish deposits held because a
    /// Storage Provider registered from deposits held because a user created a Bucket.
    #[pallet::composite_enum]
    pub enum HoldReason {
        /// Deposit held while an account is, or is requesting to become, a Storage Provider.
        StorageProviderDeposit,
        /// Deposit held for a user-owned Bucket.
        BucketDeposit,
    }

    #[pallet::hooks]
    impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
        fn on_idle(_n: BlockNumberFor<T>, mut remaining_weight: Weight) -> Weight {
            let db_weight = T::DbWeight::get();
            let mut processed: u32 = 0;
            let max_items = T::MaxExpiredItemsInBlock::get();
            if remaining_weight.any_lt(db_weight.reads_writes(1, 1)) {
                return remaining_weight;
            }
            for (who, request) in SignUpRequests::<T>::iter() {
                if processed >= max_items || remaining_weight.any_lt(db_weight.reads_writes(2, 2)) {
                    break;
                }
                processed += 1;
                remaining_weight = remaining_weight.saturating_sub(db_weight.reads_writes(2, 2));
                if crate::utils::sign_up_request_expired::<T>(&request) {
                    let _ = crate::utils::do_cancel_sign_up::<T>(&who);
                    Self::deposit_event(Event::<T>::SignUpRequestCanceled { who });
                }
            }
            remaining_weight
        }
    }

    /// Dispatchables (extrinsics) exposed by this pallet.
    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Request to sign up as a Main Storage Provider. Holds the deposit and records a
        /// pending [`SignUpRequests`] entry; the Provider ID is only assigned once
        /// [`Pallet::confirm_sign_up`] is called with a mature enough random seed.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::request_msp_sign_up())]
        pub fn request_msp_sign_up(
            origin: OriginFor<T>,
            capacity: T::StorageDataUnit,
            multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
            price_per_giga_unit_per_tick: BalanceOf<T>,
            commitment: BoundedVec<u8, T::MaxCommitmentSize>,
            bucket_data_limit: T::StorageDataUnit,
            payment_account: T::AccountId,
        ) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            let value_prop =
                ValueProposition::<T>::new(price_per_giga_unit_per_tick, commitment, bucket_data_limit);
            crate::utils::do_request_msp_sign_up::<T>(
                &who,
                capacity,
                multiaddresses.clone(),
                value_prop,
                payment_account,
            )?;

            Self::deposit_event(Event::<T>::MspRequestSignUpSuccess {
                who,
                multiaddresses,
                capacity,
            });
            Ok(().into())
        }

        /// Request to sign up as a Backup Storage Provider.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::request_bsp_sign_up())]
        pub fn request_bsp_sign_up(
            origin: OriginFor<T>,
            capacity: T::StorageDataUnit,
            multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
            payment_account: T::AccountId,
        ) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            crate::utils::do_request_bsp_sign_up::<T>(
                &who,
                capacity,
                multiaddresses.clone(),
                payment_account,
            )?;

            Self::deposit_event(Event::<T>::BspRequestSignUpSuccess {
                who,
                multiaddresses,
                capacity,
            });
            Ok(().into())
        }

        /// Confirm a pending sign-up request, deriving the Provider ID from randomness that is
        /// now old enough to be trusted, and moving the request into the live Provider storage.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::confirm_sign_up())]
        pub fn confirm_sign_up(
            origin: OriginFor<T>,
            provider_account: Option<T::AccountId>,
        ) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            let target = provider_account.unwrap_or_else(|| who.clone());
            crate::utils::do_confirm_sign_up::<T, _>(&target, |event| Self::deposit_event(event))?;
            Ok(().into())
        }

        /// Cancel a pending sign-up request and return the held deposit in full.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::cancel_sign_up())]
        pub fn cancel_sign_up(origin: OriginFor<T>) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            crate::utils::do_cancel_sign_up::<T>(&who)?;
            Self::deposit_event(Event::<T>::SignUpRequestCanceled { who });
            Ok(().into())
        }

        /// Sign off as a Main Storage Provider. Fails if it still hosts any Bucket.
        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::msp_sign_off())]
        pub fn msp_sign_off(origin: OriginFor<T>) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            let msp_id = crate::utils::do_msp_sign_off::<T>(&who)?;
            Self::deposit_event(Event::<T>::MspSignOffSuccess { who, msp_id });
            Ok(().into())
        }

        /// Sign off as a Backup Storage Provider. Fails if it still has used capacity or has
        /// not yet passed its `BspSignUpLockPeriod`.
        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::bsp_sign_off())]
        pub fn bsp_sign_off(origin: OriginFor<T>) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            let bsp_id = crate::utils::do_bsp_sign_off::<T>(&who)?;
            Self::deposit_event(Event::<T>::BspSignOffSuccess { who, bsp_id });
            Ok(().into())
        }

        /// Change a Storage Provider's capacity, holding or releasing the delta in deposit.
        #[pallet::call_index(6)]
        #[pallet::weight(T::WeightInfo::change_capacity())]
        pub fn change_capacity(
            origin: OriginFor<T>,
            new_capacity: T::StorageDataUnit,
        ) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            let (provider_id, old_capacity, next_block_when_change_allowed) =
                crate::utils::do_change_capacity::<T>(&who, new_capacity)?;
            Self::deposit_event(Event::<T>::CapacityChanged {
                who,
                provider_id,
                old_capacity,
                new_capacity,
                next_block_when_change_allowed,
            });
            Ok(().into())
        }

        /// Add a new value proposition to a MSP's offering.
        #[pallet::call_index(7)]
        #[pallet::weight(T::WeightInfo::add_value_prop())]
        pub fn add_value_prop(
            origin: OriginFor<T>,
            price_per_giga_unit_per_tick: BalanceOf<T>,
            commitment: BoundedVec<u8, T::MaxCommitmentSize>,
            bucket_data_limit: T::StorageDataUnit,
        ) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            let value_prop =
                ValueProposition::<T>::new(price_per_giga_unit_per_tick, commitment, bucket_data_limit);
            let (msp_id, value_prop_id) = crate::utils::do_add_value_prop::<T>(&who, value_prop.clone())?;
            Self::deposit_event(Event::<T>::ValuePropAdded {
                msp_id,
                value_prop_id,
                value_prop,
            });
            Ok(().into())
        }

        /// Mark one of a MSP's value propositions as unavailable to new buckets. Buckets
        /// already using it are unaffected.
        #[pallet::call_index(8)]
        #[pallet::weight(T::WeightInfo::make_value_prop_unavailable())]
        pub fn make_value_prop_unavailable(
            origin: OriginFor<T>,
            value_prop_id: ValuePropId<T>,
        ) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            let msp_id = crate::utils::do_make_value_prop_unavailable::<T>(&who, value_prop_id)?;
            Self::deposit_event(Event::<T>::ValuePropUnavailable {
                msp_id,
                value_prop_id,
            });
            Ok(().into())
        }

        /// Top up an insolvent Provider's deposit back to the minimum its current capacity
        /// requires, clearing the pending forced sign-off.
        #[pallet::call_index(9)]
        #[pallet::weight(T::WeightInfo::top_up_deposit())]
        pub fn top_up_deposit(origin: OriginFor<T>) -> DispatchResultWithPostInfo {
            let who = ensure_signed(origin)?;
            crate::utils::do_top_up_deposit::<T>(&who, |event| Self::deposit_event(event))?;
            Ok(().into())
        }
    }
}
