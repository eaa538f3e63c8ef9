use codec::Encode;
use frame_support::{
    ensure,
    traits::{
        fungible::{Inspect, InspectHold, Mutate, MutateHold},
        tokens::{Fortitude, Precision, Preservation},
        Get, Randomness,
    },
    BoundedVec,
};
use frame_system::pallet_prelude::BlockNumberFor;
use shp_constants::GIGAUNIT;
use shp_traits::{
    CommitRevealRandomnessInterface, MutateBucketsInterface, MutateChallengeableProvidersInterface,
    MutateProvidersInterface, MutateStorageProvidersInterface, PaymentStreamsInterface,
    ProvidersInterface, ReadBucketsInterface, ReadChallengeableProvidersInterface,
    ReadProvidersInterface, ReadStorageProvidersInterface, SystemMetricsInterface,
};
use sp_runtime::{
    traits::{CheckedDiv, Hash, One, Zero},
    DispatchError, DispatchResult,
};
use sp_std::vec::Vec;

use crate::{
    pallet::{
        AccountIdToBackupStorageProviderId, AccountIdToMainStorageProviderId, BackupStorageProviders,
        BspCount, Buckets, BucketsCount, Error, Event, HoldReason, MainStorageProviderIdsToValuePropositions,
        MainStorageProviders, MspCount, ProviderTopUpExpirations, SignUpRequests, TotalBspsCapacity,
        UsedBspsCapacity,
    },
    types::*,
    Config, Pallet,
};

/// The deposit an account must hold to be registered with `capacity`: a flat minimum plus a
/// per-unit amount for every unit of capacity beyond [`Config::SpMinCapacity`].
pub fn capacity_deposit<T: Config>(capacity: T::StorageDataUnit) -> BalanceOf<T> {
    let min_capacity = T::SpMinCapacity::get();
    let extra = capacity.saturating_sub(min_capacity);
    let extra_as_balance: BalanceOf<T> = extra.into();
    let extra_deposit = T::DepositPerData::get().saturating_mul(extra_as_balance);
    T::SpMinDeposit::get().saturating_add(extra_deposit)
}

fn ensure_not_already_a_provider<T: Config>(who: &T::AccountId) -> DispatchResult {
    ensure!(
        AccountIdToMainStorageProviderId::<T>::get(who).is_none(),
        Error::<T>::AlreadyRegistered
    );
    ensure!(
        AccountIdToBackupStorageProviderId::<T>::get(who).is_none(),
        Error::<T>::AlreadyRegistered
    );
    ensure!(
        SignUpRequests::<T>::get(who).is_none(),
        Error::<T>::AlreadyRegistered
    );
    Ok(())
}

fn hold_deposit<T: Config>(who: &T::AccountId, deposit: BalanceOf<T>) -> DispatchResult {
    let reducible = T::NativeBalance::reducible_balance(who, Preservation::Preserve, Fortitude::Polite);
    ensure!(reducible >= deposit, Error::<T>::NotEnoughBalance);
    T::NativeBalance::hold(&HoldReason::StorageProviderDeposit.into(), who, deposit)?;
    Ok(())
}

pub fn do_request_msp_sign_up<T: Config>(
    who: &T::AccountId,
    capacity: T::StorageDataUnit,
    multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
    value_prop: ValueProposition<T>,
    payment_account: T::AccountId,
) -> DispatchResult {
    ensure_not_already_a_provider::<T>(who)?;
    ensure!(capacity >= T::SpMinCapacity::get(), Error::<T>::StorageTooLow);

    hold_deposit::<T>(who, capacity_deposit::<T>(capacity))?;

    let now = frame_system::Pallet::<T>::block_number();
    let msp_info = MainStorageProvider {
        owner_account: who.clone(),
        payment_account,
        capacity,
        capacity_used: Zero::zero(),
        multiaddresses,
        amount_of_buckets: Zero::zero(),
        last_capacity_change: now,
        sign_up_block: now,
    };

    SignUpRequests::<T>::insert(
        who,
        SignUpRequest {
            sp_sign_up_request: SignUpRequestSpParams::MainStorageProvider(msp_info, value_prop),
            at: now,
        },
    );
    Ok(())
}

pub fn do_request_bsp_sign_up<T: Config>(
    who: &T::AccountId,
    capacity: T::StorageDataUnit,
    multiaddresses: BoundedVec<MultiAddress<T>, MaxMultiAddressAmount<T>>,
    payment_account: T::AccountId,
) -> DispatchResult {
    ensure_not_already_a_provider::<T>(who)?;
    ensure!(capacity >= T::SpMinCapacity::get(), Error::<T>::StorageTooLow);

    hold_deposit::<T>(who, capacity_deposit::<T>(capacity))?;

    let now = frame_system::Pallet::<T>::block_number();
    let bsp_info = BackupStorageProvider {
        owner_account: who.clone(),
        payment_account,
        capacity,
        capacity_used: Zero::zero(),
        multiaddresses,
        root: T::DefaultMerkleRoot::get(),
        last_capacity_change: now,
        sign_up_block: now,
        reputation_weight: T::StartingReputationWeight::get(),
    };

    SignUpRequests::<T>::insert(
        who,
        SignUpRequest {
            sp_sign_up_request: SignUpRequestSpParams::BackupStorageProvider(bsp_info),
            at: now,
        },
    );
    Ok(())
}

/// A sign-up request is abandoned once its randomness would have had time to mature twice
/// over without being confirmed.
pub fn sign_up_request_expired<T: Config>(request: &SignUpRequest<T>) -> bool {
    let now = frame_system::Pallet::<T>::block_number();
    let ttl = T::MaxBlocksForRandomness::get().saturating_mul(2u32.into());
    now > request.at.saturating_add(ttl)
}

pub fn do_confirm_sign_up<T: Config, F: FnOnce(Event<T>)>(
    who: &T::AccountId,
    deposit_event: F,
) -> DispatchResult {
    let request = SignUpRequests::<T>::get(who).ok_or(Error::<T>::SignUpRequestNotFound)?;

    if sign_up_request_expired::<T>(&request) {
        do_cancel_sign_up::<T>(who)?;
        return Err(Error::<T>::SignUpRequestExpired.into());
    }

    let (seed, randomness_set_at) = T::ProvidersRandomness::random(&who.encode());
    ensure!(
        randomness_set_at >= request.at,
        Error::<T>::RandomnessNotValidYet
    );

    let provider_id = T::ProviderIdHashing::hash_of(&(who, seed));

    match request.sp_sign_up_request {
        SignUpRequestSpParams::MainStorageProvider(msp_info, value_prop) => {
            let value_prop_id = value_prop.derive_id();
            let capacity = msp_info.capacity;
            let multiaddresses = msp_info.multiaddresses.clone();

            AccountIdToMainStorageProviderId::<T>::insert(who, provider_id);
            MainStorageProviders::<T>::insert(provider_id, &msp_info);
            MainStorageProviderIdsToValuePropositions::<T>::insert(
                provider_id,
                value_prop_id,
                value_prop.clone(),
            );
            MspCount::<T>::mutate(|count| *count = count.saturating_add(One::one()));
            SignUpRequests::<T>::remove(who);
            T::CrRandomness::initialise_randomness_cycle(&provider_id)?;

            deposit_event(Event::<T>::MspSignUpSuccess {
                who: who.clone(),
                msp_id: provider_id,
                multiaddresses,
                capacity,
                value_prop: ValuePropositionWithId {
                    id: value_prop_id,
                    value_prop,
                },
            });
        }
        SignUpRequestSpParams::BackupStorageProvider(bsp_info) => {
            let capacity = bsp_info.capacity;
            let multiaddresses = bsp_info.multiaddresses.clone();

            AccountIdToBackupStorageProviderId::<T>::insert(who, provider_id);
            BackupStorageProviders::<T>::insert(provider_id, &bsp_info);
            BspCount::<T>::mutate(|count| *count = count.saturating_add(One::one()));
            TotalBspsCapacity::<T>::mutate(|total| *total = total.saturating_add(capacity));
            SignUpRequests::<T>::remove(who);
            T::CrRandomness::initialise_randomness_cycle(&provider_id)?;

            deposit_event(Event::<T>::BspSignUpSuccess {
                who: who.clone(),
                bsp_id: provider_id,
                multiaddresses,
                capacity,
            });
        }
    }

    Ok(())
}

pub fn do_cancel_sign_up<T: Config>(who: &T::AccountId) -> DispatchResult {
    let request = SignUpRequests::<T>::get(who).ok_or(Error::<T>::SignUpRequestNotFound)?;
    let capacity = match &request.sp_sign_up_request {
        SignUpRequestSpParams::MainStorageProvider(msp, _) => msp.capacity,
        SignUpRequestSpParams::BackupStorageProvider(bsp) => bsp.capacity,
    };
    T::NativeBalance::release(
        &HoldReason::StorageProviderDeposit.into(),
        who,
        capacity_deposit::<T>(capacity),
        Precision::BestEffort,
    )?;
    SignUpRequests::<T>::remove(who);
    Ok(())
}

pub fn do_msp_sign_off<T: Config>(who: &T::AccountId) -> Result<ProviderIdFor<T>, DispatchError> {
    let msp_id = AccountIdToMainStorageProviderId::<T>::get(who).ok_or(Error::<T>::NotRegistered)?;
    let msp = MainStorageProviders::<T>::get(msp_id).ok_or(Error::<T>::NotRegistered)?;
    ensure!(msp.amount_of_buckets.is_zero(), Error::<T>::StorageStillInUse);

    T::NativeBalance::release(
        &HoldReason::StorageProviderDeposit.into(),
        who,
        capacity_deposit::<T>(msp.capacity),
        Precision::BestEffort,
    )?;

    let _ = MainStorageProviderIdsToValuePropositions::<T>::clear_prefix(msp_id, u32::MAX, None);
    MainStorageProviders::<T>::remove(msp_id);
    AccountIdToMainStorageProviderId::<T>::remove(who);
    MspCount::<T>::mutate(|count| *count = count.saturating_sub(One::one()));
    T::CrRandomness::stop_randomness_cycle(&msp_id)?;

    Ok(msp_id)
}

pub fn do_bsp_sign_off<T: Config>(who: &T::AccountId) -> Result<ProviderIdFor<T>, DispatchError> {
    let bsp_id = AccountIdToBackupStorageProviderId::<T>::get(who).ok_or(Error::<T>::NotRegistered)?;
    let bsp = BackupStorageProviders::<T>::get(bsp_id).ok_or(Error::<T>::NotRegistered)?;
    ensure!(bsp.capacity_used.is_zero(), Error::<T>::StorageStillInUse);

    let now = frame_system::Pallet::<T>::block_number();
    ensure!(
        now >= bsp.sign_up_block.saturating_add(T::BspSignUpLockPeriod::get()),
        Error::<T>::SignOffPeriodNotPassed
    );

    T::NativeBalance::release(
        &HoldReason::StorageProviderDeposit.into(),
        who,
        capacity_deposit::<T>(bsp.capacity),
        Precision::BestEffort,
    )?;

    BackupStorageProviders::<T>::remove(bsp_id);
    AccountIdToBackupStorageProviderId::<T>::remove(who);
    BspCount::<T>::mutate(|count| *count = count.saturating_sub(One::one()));
    TotalBspsCapacity::<T>::mutate(|total| *total = total.saturating_sub(bsp.capacity));
    UsedBspsCapacity::<T>::mutate(|used| *used = used.saturating_sub(bsp.capacity_used));
    T::CrRandomness::stop_randomness_cycle(&bsp_id)?;

    Ok(bsp_id)
}

pub fn do_change_capacity<T: Config>(
    who: &T::AccountId,
    new_capacity: T::StorageDataUnit,
) -> Result<(StorageProviderId<T>, T::StorageDataUnit, BlockNumberFor<T>), DispatchError> {
    ensure!(new_capacity >= T::SpMinCapacity::get(), Error::<T>::StorageTooLow);
    let now = frame_system::Pallet::<T>::block_number();

    let (provider_id, old_capacity, used_capacity, last_change, is_bsp) =
        if let Some(msp_id) = AccountIdToMainStorageProviderId::<T>::get(who) {
            let msp = MainStorageProviders::<T>::get(msp_id).ok_or(Error::<T>::NotRegistered)?;
            (msp_id, msp.capacity, msp.capacity_used, msp.last_capacity_change, false)
        } else if let Some(bsp_id) = AccountIdToBackupStorageProviderId::<T>::get(who) {
            let bsp = BackupStorageProviders::<T>::get(bsp_id).ok_or(Error::<T>::NotRegistered)?;
            (bsp_id, bsp.capacity, bsp.capacity_used, bsp.last_capacity_change, true)
        } else {
            return Err(Error::<T>::NotRegistered.into());
        };

    ensure!(
        new_capacity != old_capacity,
        Error::<T>::NewCapacityEqualsCurrentCapacity
    );
    ensure!(
        new_capacity >= used_capacity,
        Error::<T>::NewCapacityLessThanUsedStorage
    );
    ensure!(
        now >= last_change.saturating_add(T::MinBlocksBetweenCapacityChanges::get()),
        Error::<T>::NotEnoughTimePassed
    );

    let old_deposit = capacity_deposit::<T>(old_capacity);
    let new_deposit = capacity_deposit::<T>(new_capacity);
    if new_deposit > old_deposit {
        hold_deposit::<T>(who, new_deposit.saturating_sub(old_deposit))?;
    } else if old_deposit > new_deposit {
        T::NativeBalance::release(
            &HoldReason::StorageProviderDeposit.into(),
            who,
            old_deposit.saturating_sub(new_deposit),
            Precision::BestEffort,
        )?;
    }

    let next_block_when_change_allowed = now.saturating_add(T::MinBlocksBetweenCapacityChanges::get());
    let provider_id_enum = if is_bsp {
        BackupStorageProviders::<T>::mutate(provider_id, |maybe_bsp| -> DispatchResult {
            let bsp = maybe_bsp.as_mut().ok_or(Error::<T>::NotRegistered)?;
            bsp.capacity = new_capacity;
            bsp.last_capacity_change = now;
            Ok(())
        })?;
        if new_capacity > old_capacity {
            TotalBspsCapacity::<T>::mutate(|total| {
                *total = total.saturating_add(new_capacity.saturating_sub(old_capacity))
            });
        } else {
            TotalBspsCapacity::<T>::mutate(|total| {
                *total = total.saturating_sub(old_capacity.saturating_sub(new_capacity))
            });
        }
        StorageProviderId::BackupStorageProvider(provider_id)
    } else {
        MainStorageProviders::<T>::mutate(provider_id, |maybe_msp| -> DispatchResult {
            let msp = maybe_msp.as_mut().ok_or(Error::<T>::NotRegistered)?;
            msp.capacity = new_capacity;
            msp.last_capacity_change = now;
            Ok(())
        })?;
        StorageProviderId::MainStorageProvider(provider_id)
    };

    Ok((provider_id_enum, old_capacity, next_block_when_change_allowed))
}

pub fn do_add_value_prop<T: Config>(
    who: &T::AccountId,
    value_prop: ValueProposition<T>,
) -> Result<(ProviderIdFor<T>, ValuePropId<T>), DispatchError> {
    let msp_id = AccountIdToMainStorageProviderId::<T>::get(who).ok_or(Error::<T>::NotRegistered)?;
    let value_prop_id = value_prop.derive_id();
    MainStorageProviderIdsToValuePropositions::<T>::insert(msp_id, value_prop_id, value_prop);
    Ok((msp_id, value_prop_id))
}

pub fn do_make_value_prop_unavailable<T: Config>(
    who: &T::AccountId,
    value_prop_id: ValuePropId<T>,
) -> Result<ProviderIdFor<T>, DispatchError> {
    let msp_id = AccountIdToMainStorageProviderId::<T>::get(who).ok_or(Error::<T>::NotRegistered)?;
    MainStorageProviderIdsToValuePropositions::<T>::try_mutate(
        msp_id,
        value_prop_id,
        |maybe_value_prop| -> DispatchResult {
            let value_prop = maybe_value_prop
                .as_mut()
                .ok_or(Error::<T>::ValuePropositionNotFound)?;
            ensure!(value_prop.available, Error::<T>::ValuePropositionAlreadyUnavailable);
            value_prop.available = false;
            Ok(())
        },
    )?;
    Ok(msp_id)
}

pub fn do_top_up_deposit<T: Config, F: FnOnce(Event<T>)>(
    who: &T::AccountId,
    deposit_event: F,
) -> DispatchResult {
    let provider_id = AccountIdToMainStorageProviderId::<T>::get(who)
        .or_else(|| AccountIdToBackupStorageProviderId::<T>::get(who))
        .ok_or(Error::<T>::NotRegistered)?;
    ensure!(
        ProviderTopUpExpirations::<T>::contains_key(provider_id),
        Error::<T>::ProviderNotInsolvent
    );

    let capacity = MainStorageProviders::<T>::get(provider_id)
        .map(|msp| msp.capacity)
        .or_else(|| BackupStorageProviders::<T>::get(provider_id).map(|bsp| bsp.capacity))
        .ok_or(Error::<T>::NotRegistered)?;

    let required = capacity_deposit::<T>(capacity);
    let currently_held =
        T::NativeBalance::balance_on_hold(&HoldReason::StorageProviderDeposit.into(), who);
    let shortfall = required.saturating_sub(currently_held);
    if !shortfall.is_zero() {
        hold_deposit::<T>(who, shortfall)?;
    }

    ProviderTopUpExpirations::<T>::remove(provider_id);
    deposit_event(Event::<T>::ProviderToppedUp { provider_id });
    Ok(())
}

/// The rate a bucket's fixed-rate payment stream is charged: its hosting MSP's advertised
/// price for the value proposition it was created under, scaled by its size, or the flat
/// zero-size rate for an empty bucket.
fn rate_for_bucket<T: Config>(msp_id: ProviderIdFor<T>, bucket: &Bucket<T>) -> BalanceOf<T> {
    if bucket.size.is_zero() {
        return T::ZeroSizeBucketFixedRate::get();
    }
    let price_per_giga_unit = bucket
        .value_prop_id
        .and_then(|id| MainStorageProviderIdsToValuePropositions::<T>::get(msp_id, id))
        .map(|value_prop| value_prop.price_per_giga_unit_per_tick)
        .unwrap_or_else(|| T::ZeroSizeBucketFixedRate::get());
    let size_as_balance: BalanceOf<T> = bucket.size.into();
    price_per_giga_unit
        .saturating_mul(size_as_balance)
        .checked_div(&GIGAUNIT.into())
        .unwrap_or_default()
}

// Cross-pallet interface implementations.

impl<T: Config> ReadProvidersInterface for Pallet<T> {
    type ProviderId = T::ProviderId;
    type MerkleHash = T::MerklePatriciaRoot;
    type AccountId = T::AccountId;
    type ProviderIdHashing = T::ProviderIdHashing;

    fn is_provider(who: Self::ProviderId) -> bool {
        MainStorageProviders::<T>::contains_key(who) || BackupStorageProviders::<T>::contains_key(who)
    }

    fn get_provider_id(who: &Self::AccountId) -> Option<Self::ProviderId> {
        AccountIdToMainStorageProviderId::<T>::get(who)
            .or_else(|| AccountIdToBackupStorageProviderId::<T>::get(who))
    }

    fn get_root(who: Self::ProviderId) -> Option<Self::MerkleHash> {
        BackupStorageProviders::<T>::get(who).map(|bsp| bsp.root)
    }

    fn get_tick_when_registered(who: Self::ProviderId) -> Option<u32> {
        BackupStorageProviders::<T>::get(who)
            .map(|bsp| bsp.sign_up_block)
            .or_else(|| MainStorageProviders::<T>::get(who).map(|msp| msp.sign_up_block))
            .map(|block| sp_runtime::SaturatedConversion::saturated_into(block))
    }

    fn is_provider_insolvent(who: Self::ProviderId) -> bool {
        ProviderTopUpExpirations::<T>::contains_key(who)
    }
}

impl<T: Config> MutateProvidersInterface for Pallet<T> {
    type Balance = BalanceOf<T>;

    fn update_root(who: Self::ProviderId, new_root: Self::MerkleHash) -> DispatchResult {
        BackupStorageProviders::<T>::try_mutate(who, |maybe_bsp| -> DispatchResult {
            let bsp = maybe_bsp.as_mut().ok_or(Error::<T>::NotRegistered)?;
            bsp.root = new_root;
            Ok(())
        })
    }

    fn increase_capacity_used(who: Self::ProviderId, delta: u64) -> DispatchResult {
        BackupStorageProviders::<T>::try_mutate(who, |maybe_bsp| -> DispatchResult {
            let bsp = maybe_bsp.as_mut().ok_or(Error::<T>::NotRegistered)?;
            bsp.capacity_used = bsp.capacity_used.saturating_add(delta.into());
            Ok(())
        })?;
        UsedBspsCapacity::<T>::mutate(|used| *used = used.saturating_add(delta.into()));
        Ok(())
    }

    fn decrease_capacity_used(who: Self::ProviderId, delta: u64) -> DispatchResult {
        BackupStorageProviders::<T>::try_mutate(who, |maybe_bsp| -> DispatchResult {
            let bsp = maybe_bsp.as_mut().ok_or(Error::<T>::NotRegistered)?;
            bsp.capacity_used = bsp.capacity_used.saturating_sub(delta.into());
            Ok(())
        })?;
        UsedBspsCapacity::<T>::mutate(|used| *used = used.saturating_sub(delta.into()));
        Ok(())
    }
}

impl<T: Config> ReadStorageProvidersInterface for Pallet<T> {
    type StorageDataUnit = T::StorageDataUnit;
    type ValuePropId = T::ValuePropId;
    type MultiAddress = MultiAddress<T>;
    type MaxNumberOfMultiAddresses = T::MaxMultiAddressAmount;

    fn get_capacity(who: &Self::ProviderId) -> Self::StorageDataUnit {
        MainStorageProviders::<T>::get(who)
            .map(|msp| msp.capacity)
            .or_else(|| BackupStorageProviders::<T>::get(who).map(|bsp| bsp.capacity))
            .unwrap_or_default()
    }

    fn get_used_capacity(who: &Self::ProviderId) -> Self::StorageDataUnit {
        MainStorageProviders::<T>::get(who)
            .map(|msp| msp.capacity_used)
            .or_else(|| BackupStorageProviders::<T>::get(who).map(|bsp| bsp.capacity_used))
            .unwrap_or_default()
    }

    fn available_capacity(who: &Self::ProviderId) -> Self::StorageDataUnit {
        Self::get_capacity(who).saturating_sub(Self::get_used_capacity(who))
    }

    fn is_msp(who: &Self::ProviderId) -> bool {
        MainStorageProviders::<T>::contains_key(who)
    }

    fn is_bsp(who: &Self::ProviderId) -> bool {
        BackupStorageProviders::<T>::contains_key(who)
    }

    fn get_multiaddresses(who: &Self::ProviderId) -> Option<Vec<Self::MultiAddress>> {
        MainStorageProviders::<T>::get(who)
            .map(|msp| msp.multiaddresses.into_inner())
            .or_else(|| BackupStorageProviders::<T>::get(who).map(|bsp| bsp.multiaddresses.into_inner()))
    }
}

impl<T: Config> MutateStorageProvidersInterface for Pallet<T> {
    fn increase_capacity_used(who: &Self::ProviderId, delta: Self::StorageDataUnit) -> DispatchResult {
        if MainStorageProviders::<T>::contains_key(who) {
            MainStorageProviders::<T>::mutate(who, |maybe_msp| {
                if let Some(msp) = maybe_msp {
                    msp.capacity_used = msp.capacity_used.saturating_add(delta);
                }
            });
        } else {
            BackupStorageProviders::<T>::try_mutate(who, |maybe_bsp| -> DispatchResult {
                let bsp = maybe_bsp.as_mut().ok_or(Error::<T>::NotRegistered)?;
                bsp.capacity_used = bsp.capacity_used.saturating_add(delta);
                Ok(())
            })?;
            UsedBspsCapacity::<T>::mutate(|used| *used = used.saturating_add(delta));
        }
        Ok(())
    }

    fn decrease_capacity_used(who: &Self::ProviderId, delta: Self::StorageDataUnit) -> DispatchResult {
        if MainStorageProviders::<T>::contains_key(who) {
            MainStorageProviders::<T>::mutate(who, |maybe_msp| {
                if let Some(msp) = maybe_msp {
                    msp.capacity_used = msp.capacity_used.saturating_sub(delta);
                }
            });
        } else {
            BackupStorageProviders::<T>::try_mutate(who, |maybe_bsp| -> DispatchResult {
                let bsp = maybe_bsp.as_mut().ok_or(Error::<T>::NotRegistered)?;
                bsp.capacity_used = bsp.capacity_used.saturating_sub(delta);
                Ok(())
            })?;
            UsedBspsCapacity::<T>::mutate(|used| *used = used.saturating_sub(delta));
        }
        Ok(())
    }
}

impl<T: Config> ReadChallengeableProvidersInterface for Pallet<T> {
    type ProviderId = T::ProviderId;
    type AccountId = T::AccountId;
    type Balance = BalanceOf<T>;
    type MerkleHash = T::MerklePatriciaRoot;

    fn is_provider(who: Self::ProviderId) -> bool {
        <Self as ReadProvidersInterface>::is_provider(who)
    }

    fn get_provider_id(who: &Self::AccountId) -> Option<Self::ProviderId> {
        <Self as ReadProvidersInterface>::get_provider_id(who)
    }

    fn get_root(who: Self::ProviderId) -> Option<Self::MerkleHash> {
        <Self as ReadProvidersInterface>::get_root(who)
    }

    fn get_stake(who: Self::ProviderId) -> Option<Self::Balance> {
        MainStorageProviders::<T>::get(who)
            .map(|msp| msp.capacity)
            .or_else(|| BackupStorageProviders::<T>::get(who).map(|bsp| bsp.capacity))
            .map(capacity_deposit::<T>)
    }
}

impl<T: Config> MutateChallengeableProvidersInterface for Pallet<T> {
    fn slash(provider_id: &Self::ProviderId, accrued_failed_proof_submissions: u32) -> DispatchResult {
        let who = BackupStorageProviders::<T>::get(provider_id)
            .map(|bsp| bsp.owner_account)
            .or_else(|| MainStorageProviders::<T>::get(provider_id).map(|msp| msp.owner_account))
            .ok_or(Error::<T>::NotRegistered)?;

        let slash_amount = T::SlashAmountPerMaxFileSize::get()
            .saturating_mul(accrued_failed_proof_submissions.into());

        let held = T::NativeBalance::balance_on_hold(&HoldReason::StorageProviderDeposit.into(), &who);
        let to_slash = slash_amount.min(held);
        if !to_slash.is_zero() {
            T::NativeBalance::release(
                &HoldReason::StorageProviderDeposit.into(),
                &who,
                to_slash,
                Precision::BestEffort,
            )?;
            T::NativeBalance::burn_from(
                &who,
                to_slash,
                Preservation::Expendable,
                Precision::BestEffort,
                Fortitude::Force,
            )?;
            Pallet::<T>::deposit_event(Event::<T>::ProviderSlashed {
                provider_id: *provider_id,
                amount: to_slash,
            });
        }

        let capacity = MainStorageProviders::<T>::get(provider_id)
            .map(|msp| msp.capacity)
            .or_else(|| BackupStorageProviders::<T>::get(provider_id).map(|bsp| bsp.capacity))
            .unwrap_or_default();
        let required = capacity_deposit::<T>(capacity);
        let remaining = T::NativeBalance::balance_on_hold(&HoldReason::StorageProviderDeposit.into(), &who);
        if remaining < required && !ProviderTopUpExpirations::<T>::contains_key(provider_id) {
            let now = frame_system::Pallet::<T>::block_number();
            ProviderTopUpExpirations::<T>::insert(
                provider_id,
                now.saturating_add(T::ProviderTopUpTtl::get()),
            );
            Pallet::<T>::deposit_event(Event::<T>::ProviderInsolvent {
                provider_id: *provider_id,
            });
        }

        Ok(())
    }

    fn update_root(provider_id: Self::ProviderId, new_root: Self::MerkleHash) -> DispatchResult {
        <Self as MutateProvidersInterface>::update_root(provider_id, new_root)
    }

    fn top_up_deposit(provider_id: &Self::ProviderId) -> DispatchResult {
        ensure!(
            ProviderTopUpExpirations::<T>::contains_key(provider_id),
            Error::<T>::ProviderNotInsolvent
        );
        ProviderTopUpExpirations::<T>::remove(provider_id);
        Ok(())
    }
}

impl<T: Config> ReadBucketsInterface for Pallet<T> {
    type AccountId = T::AccountId;
    type BucketId = BucketId<T>;
    type ProviderId = T::ProviderId;
    type MerkleHash = T::MerklePatriciaRoot;
    type ReadAccessGroupId = T::ReadAccessGroupId;
    type StorageDataUnit = T::StorageDataUnit;
    type BucketNameLimit = T::BucketNameLimit;

    fn bucket_exists(bucket_id: &Self::BucketId) -> bool {
        Buckets::<T>::contains_key(bucket_id)
    }

    fn get_bucket_owner(bucket_id: &Self::BucketId) -> Result<Self::AccountId, DispatchError> {
        Buckets::<T>::get(bucket_id)
            .map(|bucket| bucket.user_id)
            .ok_or(Error::<T>::BucketNotFound.into())
    }

    fn get_bucket_size(bucket_id: &Self::BucketId) -> Result<Self::StorageDataUnit, DispatchError> {
        Buckets::<T>::get(bucket_id)
            .map(|bucket| bucket.size)
            .ok_or(Error::<T>::BucketNotFound.into())
    }

    fn is_bucket_private(bucket_id: &Self::BucketId) -> Result<bool, DispatchError> {
        Buckets::<T>::get(bucket_id)
            .map(|bucket| bucket.private)
            .ok_or(Error::<T>::BucketNotFound.into())
    }

    fn get_root_bucket(bucket_id: &Self::BucketId) -> Option<Self::MerkleHash> {
        Buckets::<T>::get(bucket_id).map(|bucket| bucket.root)
    }

    fn get_msp_of_bucket(bucket_id: &Self::BucketId) -> Option<Self::ProviderId> {
        Buckets::<T>::get(bucket_id).and_then(|bucket| bucket.msp_id)
    }

    fn get_read_access_group_id_of_bucket(
        bucket_id: &Self::BucketId,
    ) -> Result<Option<Self::ReadAccessGroupId>, DispatchError> {
        Buckets::<T>::get(bucket_id)
            .map(|bucket| bucket.read_access_group_id)
            .ok_or(Error::<T>::BucketNotFound.into())
    }
}

impl<T: Config> MutateBucketsInterface for Pallet<T> {
    fn add_bucket(
        msp_id: Self::ProviderId,
        user: Self::AccountId,
        bucket_id: Self::BucketId,
        private: bool,
        maybe_read_access_group_id: Option<Self::ReadAccessGroupId>,
    ) -> DispatchResult {
        ensure!(!Buckets::<T>::contains_key(bucket_id), Error::<T>::AlreadyRegistered);

        T::NativeBalance::hold(&HoldReason::BucketDeposit.into(), &user, T::BucketDeposit::get())?;

        Buckets::<T>::insert(
            bucket_id,
            Bucket {
                root: T::DefaultMerkleRoot::get(),
                user_id: user.clone(),
                msp_id: Some(msp_id),
                private,
                read_access_group_id: maybe_read_access_group_id,
                size: Zero::zero(),
                value_prop_id: None,
            },
        );
        MainStorageProviders::<T>::mutate(msp_id, |maybe_msp| {
            if let Some(msp) = maybe_msp {
                msp.amount_of_buckets = msp.amount_of_buckets.saturating_add(One::one());
            }
        });
        BucketsCount::<T>::mutate(|count| *count = count.saturating_add(One::one()));

        T::PaymentStreams::create_fixed_rate_payment_stream(
            &msp_id,
            &user,
            T::ZeroSizeBucketFixedRate::get(),
        )
    }

    fn change_root_bucket(bucket_id: Self::BucketId, new_root: Self::MerkleHash) -> DispatchResult {
        Buckets::<T>::try_mutate(bucket_id, |maybe_bucket| -> DispatchResult {
            let bucket = maybe_bucket.as_mut().ok_or(Error::<T>::BucketNotFound)?;
            bucket.root = new_root;
            Ok(())
        })
    }

    fn remove_root_bucket(bucket_id: Self::BucketId) -> DispatchResult {
        let bucket = Buckets::<T>::get(bucket_id).ok_or(Error::<T>::BucketNotFound)?;
        if let Some(msp_id) = bucket.msp_id {
            T::PaymentStreams::delete_fixed_rate_payment_stream(&msp_id, &bucket.user_id)?;
            MainStorageProviders::<T>::mutate(msp_id, |maybe_msp| {
                if let Some(msp) = maybe_msp {
                    msp.amount_of_buckets = msp.amount_of_buckets.saturating_sub(One::one());
                }
            });
        }
        T::NativeBalance::release(
            &HoldReason::BucketDeposit.into(),
            &bucket.user_id,
            T::BucketDeposit::get(),
            Precision::BestEffort,
        )?;
        Buckets::<T>::remove(bucket_id);
        BucketsCount::<T>::mutate(|count| *count = count.saturating_sub(One::one()));
        Ok(())
    }

    fn assign_msp_to_bucket(bucket_id: &Self::BucketId, msp_id: Self::ProviderId) -> DispatchResult {
        let user = Buckets::<T>::try_mutate(bucket_id, |maybe_bucket| -> Result<T::AccountId, DispatchError> {
            let bucket = maybe_bucket.as_mut().ok_or(Error::<T>::BucketNotFound)?;
            bucket.msp_id = Some(msp_id);
            Ok(bucket.user_id.clone())
        })?;
        MainStorageProviders::<T>::mutate(msp_id, |maybe_msp| {
            if let Some(msp) = maybe_msp {
                msp.amount_of_buckets = msp.amount_of_buckets.saturating_add(One::one());
            }
        });
        T::PaymentStreams::create_fixed_rate_payment_stream(
            &msp_id,
            &user,
            T::ZeroSizeBucketFixedRate::get(),
        )
    }

    fn unassign_msp_from_bucket(bucket_id: &Self::BucketId) -> DispatchResult {
        let bucket = Buckets::<T>::get(bucket_id).ok_or(Error::<T>::BucketNotFound)?;
        if let Some(msp_id) = bucket.msp_id {
            T::PaymentStreams::delete_fixed_rate_payment_stream(&msp_id, &bucket.user_id)?;
            MainStorageProviders::<T>::mutate(msp_id, |maybe_msp| {
                if let Some(msp) = maybe_msp {
                    msp.amount_of_buckets = msp.amount_of_buckets.saturating_sub(One::one());
                }
            });
        }
        Buckets::<T>::try_mutate(bucket_id, |maybe_bucket| -> DispatchResult {
            let bucket = maybe_bucket.as_mut().ok_or(Error::<T>::BucketNotFound)?;
            bucket.msp_id = None;
            Ok(())
        })
    }

    fn update_bucket_privacy(
        bucket_id: Self::BucketId,
        private: bool,
        maybe_read_access_group_id: Option<Self::ReadAccessGroupId>,
    ) -> DispatchResult {
        Buckets::<T>::try_mutate(bucket_id, |maybe_bucket| -> DispatchResult {
            let bucket = maybe_bucket.as_mut().ok_or(Error::<T>::BucketNotFound)?;
            bucket.private = private;
            bucket.read_access_group_id = maybe_read_access_group_id;
            Ok(())
        })
    }

    fn increase_bucket_size(bucket_id: &Self::BucketId, delta: Self::StorageDataUnit) -> DispatchResult {
        let bucket = Buckets::<T>::try_mutate(bucket_id, |maybe_bucket| -> Result<Bucket<T>, DispatchError> {
            let bucket = maybe_bucket.as_mut().ok_or(Error::<T>::BucketNotFound)?;
            bucket.size = bucket.size.saturating_add(delta);
            Ok(bucket.clone())
        })?;
        if let Some(msp_id) = bucket.msp_id {
            let rate = rate_for_bucket::<T>(msp_id, &bucket);
            T::PaymentStreams::update_fixed_rate_payment_stream(&msp_id, &bucket.user_id, rate)?;
        }
        Ok(())
    }

    fn decrease_bucket_size(bucket_id: &Self::BucketId, delta: Self::StorageDataUnit) -> DispatchResult {
        let bucket = Buckets::<T>::try_mutate(bucket_id, |maybe_bucket| -> Result<Bucket<T>, DispatchError> {
            let bucket = maybe_bucket.as_mut().ok_or(Error::<T>::BucketNotFound)?;
            bucket.size = bucket.size.saturating_sub(delta);
            Ok(bucket.clone())
        })?;
        if let Some(msp_id) = bucket.msp_id {
            let rate = rate_for_bucket::<T>(msp_id, &bucket);
            T::PaymentStreams::update_fixed_rate_payment_stream(&msp_id, &bucket.user_id, rate)?;
        }
        Ok(())
    }
}

impl<T: Config> ProvidersInterface for Pallet<T> {
    type ProviderId = T::ProviderId;
    type AccountId = T::AccountId;
    type MerkleHash = T::MerklePatriciaRoot;
    type Balance = BalanceOf<T>;

    fn is_provider(who: Self::ProviderId) -> bool {
        <Self as ReadProvidersInterface>::is_provider(who)
    }

    fn get_provider_id(who: &Self::AccountId) -> Option<Self::ProviderId> {
        <Self as ReadProvidersInterface>::get_provider_id(who)
    }

    fn get_root(who: Self::ProviderId) -> Option<Self::MerkleHash> {
        <Self as ReadProvidersInterface>::get_root(who)
    }

    fn get_default_root() -> Self::MerkleHash {
        T::DefaultMerkleRoot::get()
    }
}

impl<T: Config> SystemMetricsInterface for Pallet<T> {
    type ProvidedUnit = T::StorageDataUnit;

    fn get_total_capacity() -> Self::ProvidedUnit {
        TotalBspsCapacity::<T>::get()
    }

    fn get_total_used_capacity() -> Self::ProvidedUnit {
        UsedBspsCapacity::<T>::get()
    }
}

#[cfg(feature = "runtime-benchmarks")]
pub mod benchmarking {
    use super::Config;

    /// Hooks a benchmark harness can use to construct Provider records that can't otherwise
    /// be derived from `Default`.
    pub trait BenchmarkHelpers<T: Config> {
        fn registered_msp_account(seed: u32) -> T::AccountId;
        fn registered_bsp_account(seed: u32) -> T::AccountId;
    }
}
