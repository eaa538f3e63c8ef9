use crate::mock::*;
use crate::pallet::Event;
use crate::types::ValueProposition;
use crate::{
    AccountIdToBackupStorageProviderId, AccountIdToMainStorageProviderId, BackupStorageProviders,
    Error, MainStorageProviderIdsToValuePropositions, MainStorageProviders, ProviderTopUpExpirations,
    SignUpRequests, TotalBspsCapacity,
};
use frame_support::{
    assert_noop, assert_ok,
    traits::fungible::{Inspect, InspectHold},
    BoundedVec,
};
use shp_traits::MutateChallengeableProvidersInterface;

fn run_to_block(n: u64) {
    while System::block_number() < n {
        System::set_block_number(System::block_number() + 1);
    }
}

fn default_value_prop() -> ValueProposition<Test> {
    ValueProposition::<Test>::new(
        1_000,
        BoundedVec::try_from(b"commitment".to_vec()).unwrap(),
        1024,
    )
}

fn request_and_confirm_msp(who: u64, capacity: u64) -> sp_core::H256 {
    assert_ok!(StorageProviders::request_msp_sign_up(
        RuntimeOrigin::signed(who),
        capacity,
        BoundedVec::new(),
        default_value_prop().price_per_giga_unit_per_tick,
        default_value_prop().commitment,
        default_value_prop().bucket_data_limit,
        who,
    ));
    run_to_block(System::block_number() + 5);
    assert_ok!(StorageProviders::confirm_sign_up(
        RuntimeOrigin::signed(who),
        None
    ));
    AccountIdToMainStorageProviderId::<Test>::get(who).expect("msp just confirmed")
}

fn request_and_confirm_bsp(who: u64, capacity: u64) -> sp_core::H256 {
    assert_ok!(StorageProviders::request_bsp_sign_up(
        RuntimeOrigin::signed(who),
        capacity,
        BoundedVec::new(),
        who,
    ));
    run_to_block(System::block_number() + 5);
    assert_ok!(StorageProviders::confirm_sign_up(
        RuntimeOrigin::signed(who),
        None
    ));
    AccountIdToBackupStorageProviderId::<Test>::get(who).expect("bsp just confirmed")
}

#[test]
fn request_msp_sign_up_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        let capacity = 100u64;
        assert_ok!(StorageProviders::request_msp_sign_up(
            RuntimeOrigin::signed(who),
            capacity,
            BoundedVec::new(),
            default_value_prop().price_per_giga_unit_per_tick,
            default_value_prop().commitment,
            default_value_prop().bucket_data_limit,
            who,
        ));

        System::assert_last_event(
            Event::MspRequestSignUpSuccess {
                who,
                multiaddresses: BoundedVec::new(),
                capacity,
            }
            .into(),
        );
        assert!(SignUpRequests::<Test>::get(who).is_some());
        assert!(
            <Test as crate::Config>::NativeBalance::balance_on_hold(
                &crate::HoldReason::StorageProviderDeposit.into(),
                &who
            ) > 0
        );
    });
}

#[test]
fn request_msp_sign_up_capacity_too_low_fails() {
    ExtBuilder::build().execute_with(|| {
        assert_noop!(
            StorageProviders::request_msp_sign_up(
                RuntimeOrigin::signed(accounts::ALICE),
                1,
                BoundedVec::new(),
                default_value_prop().price_per_giga_unit_per_tick,
                default_value_prop().commitment,
                default_value_prop().bucket_data_limit,
                accounts::ALICE,
            ),
            Error::<Test>::StorageTooLow
        );
    });
}

#[test]
fn request_msp_sign_up_twice_fails() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        assert_ok!(StorageProviders::request_msp_sign_up(
            RuntimeOrigin::signed(who),
            100,
            BoundedVec::new(),
            default_value_prop().price_per_giga_unit_per_tick,
            default_value_prop().commitment,
            default_value_prop().bucket_data_limit,
            who,
        ));
        assert_noop!(
            StorageProviders::request_msp_sign_up(
                RuntimeOrigin::signed(who),
                100,
                BoundedVec::new(),
                default_value_prop().price_per_giga_unit_per_tick,
                default_value_prop().commitment,
                default_value_prop().bucket_data_limit,
                who,
            ),
            Error::<Test>::AlreadyRegistered
        );
    });
}

#[test]
fn confirm_sign_up_too_early_fails() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        assert_ok!(StorageProviders::request_msp_sign_up(
            RuntimeOrigin::signed(who),
            100,
            BoundedVec::new(),
            default_value_prop().price_per_giga_unit_per_tick,
            default_value_prop().commitment,
            default_value_prop().bucket_data_limit,
            who,
        ));
        // Randomness is only valid `BLOCKS_BEFORE_RANDOMNESS_VALID` blocks after it was queried.
        assert_noop!(
            StorageProviders::confirm_sign_up(RuntimeOrigin::signed(who), None),
            Error::<Test>::RandomnessNotValidYet
        );
    });
}

#[test]
fn confirm_sign_up_msp_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        let msp_id = request_and_confirm_msp(who, 100);

        assert!(MainStorageProviders::<Test>::get(msp_id).is_some());
        assert_eq!(
            AccountIdToMainStorageProviderId::<Test>::get(who),
            Some(msp_id)
        );
        assert!(SignUpRequests::<Test>::get(who).is_none());
    });
}

#[test]
fn confirm_sign_up_bsp_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::BOB;
        let bsp_id = request_and_confirm_bsp(who, 100);

        assert!(BackupStorageProviders::<Test>::get(bsp_id).is_some());
        assert_eq!(TotalBspsCapacity::<Test>::get(), 100);
    });
}

#[test]
fn confirm_sign_up_without_request_fails() {
    ExtBuilder::build().execute_with(|| {
        assert_noop!(
            StorageProviders::confirm_sign_up(RuntimeOrigin::signed(accounts::ALICE), None),
            Error::<Test>::SignUpRequestNotFound
        );
    });
}

#[test]
fn cancel_sign_up_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        let balance_before = <Test as crate::Config>::NativeBalance::balance(&who);
        assert_ok!(StorageProviders::request_msp_sign_up(
            RuntimeOrigin::signed(who),
            100,
            BoundedVec::new(),
            default_value_prop().price_per_giga_unit_per_tick,
            default_value_prop().commitment,
            default_value_prop().bucket_data_limit,
            who,
        ));

        assert_ok!(StorageProviders::cancel_sign_up(RuntimeOrigin::signed(
            who
        )));

        assert!(SignUpRequests::<Test>::get(who).is_none());
        assert_eq!(
            <Test as crate::Config>::NativeBalance::balance(&who),
            balance_before
        );
        System::assert_last_event(Event::SignUpRequestCanceled { who }.into());
    });
}

#[test]
fn msp_sign_off_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        let msp_id = request_and_confirm_msp(who, 100);

        assert_ok!(StorageProviders::msp_sign_off(RuntimeOrigin::signed(who)));

        assert!(MainStorageProviders::<Test>::get(msp_id).is_none());
        assert!(AccountIdToMainStorageProviderId::<Test>::get(who).is_none());
        System::assert_last_event(Event::MspSignOffSuccess { who, msp_id }.into());
    });
}

#[test]
fn msp_sign_off_not_registered_fails() {
    ExtBuilder::build().execute_with(|| {
        assert_noop!(
            StorageProviders::msp_sign_off(RuntimeOrigin::signed(accounts::ALICE)),
            Error::<Test>::NotRegistered
        );
    });
}

#[test]
fn bsp_sign_off_before_lock_period_fails() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::BOB;
        request_and_confirm_bsp(who, 100);

        assert_noop!(
            StorageProviders::bsp_sign_off(RuntimeOrigin::signed(who)),
            Error::<Test>::SignOffPeriodNotPassed
        );
    });
}

#[test]
fn bsp_sign_off_works_after_lock_period() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::BOB;
        let bsp_id = request_and_confirm_bsp(who, 100);

        run_to_block(System::block_number() + 10);

        assert_ok!(StorageProviders::bsp_sign_off(RuntimeOrigin::signed(who)));
        assert!(BackupStorageProviders::<Test>::get(bsp_id).is_none());
        assert_eq!(TotalBspsCapacity::<Test>::get(), 0);
    });
}

#[test]
fn change_capacity_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::BOB;
        let bsp_id = request_and_confirm_bsp(who, 100);
        let held_before = <Test as crate::Config>::NativeBalance::balance_on_hold(
            &crate::HoldReason::StorageProviderDeposit.into(),
            &who,
        );

        run_to_block(System::block_number() + 10);
        assert_ok!(StorageProviders::change_capacity(
            RuntimeOrigin::signed(who),
            200
        ));

        let bsp = BackupStorageProviders::<Test>::get(bsp_id).unwrap();
        assert_eq!(bsp.capacity, 200);
        let held_after = <Test as crate::Config>::NativeBalance::balance_on_hold(
            &crate::HoldReason::StorageProviderDeposit.into(),
            &who,
        );
        assert!(held_after > held_before);
    });
}

#[test]
fn change_capacity_same_capacity_fails() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::BOB;
        request_and_confirm_bsp(who, 100);

        run_to_block(System::block_number() + 10);
        assert_noop!(
            StorageProviders::change_capacity(RuntimeOrigin::signed(who), 100),
            Error::<Test>::NewCapacityEqualsCurrentCapacity
        );
    });
}

#[test]
fn change_capacity_too_soon_fails() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::BOB;
        request_and_confirm_bsp(who, 100);

        assert_noop!(
            StorageProviders::change_capacity(RuntimeOrigin::signed(who), 200),
            Error::<Test>::NotEnoughTimePassed
        );
    });
}

#[test]
fn add_value_prop_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        let msp_id = request_and_confirm_msp(who, 100);

        let new_prop = ValueProposition::<Test>::new(
            2_000,
            BoundedVec::try_from(b"other".to_vec()).unwrap(),
            2048,
        );
        let value_prop_id = new_prop.derive_id();

        assert_ok!(StorageProviders::add_value_prop(
            RuntimeOrigin::signed(who),
            new_prop.price_per_giga_unit_per_tick,
            new_prop.commitment.clone(),
            new_prop.bucket_data_limit,
        ));

        assert!(
            MainStorageProviderIdsToValuePropositions::<Test>::get(msp_id, value_prop_id).is_some()
        );
    });
}

#[test]
fn make_value_prop_unavailable_works() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        let msp_id = request_and_confirm_msp(who, 100);
        let value_prop_id = default_value_prop().derive_id();

        assert_ok!(StorageProviders::add_value_prop(
            RuntimeOrigin::signed(who),
            default_value_prop().price_per_giga_unit_per_tick,
            default_value_prop().commitment,
            default_value_prop().bucket_data_limit,
        ));

        assert_ok!(StorageProviders::make_value_prop_unavailable(
            RuntimeOrigin::signed(who),
            value_prop_id,
        ));

        let value_prop =
            MainStorageProviderIdsToValuePropositions::<Test>::get(msp_id, value_prop_id).unwrap();
        assert!(!value_prop.available);

        assert_noop!(
            StorageProviders::make_value_prop_unavailable(RuntimeOrigin::signed(who), value_prop_id),
            Error::<Test>::ValuePropositionAlreadyUnavailable
        );
    });
}

#[test]
fn top_up_deposit_when_not_insolvent_fails() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        request_and_confirm_msp(who, 100);

        assert_noop!(
            StorageProviders::top_up_deposit(RuntimeOrigin::signed(who)),
            Error::<Test>::ProviderNotInsolvent
        );
    });
}

#[test]
fn slash_flags_insolvent_provider_and_top_up_clears_it() {
    ExtBuilder::build().execute_with(|| {
        let who = accounts::ALICE;
        let msp_id = request_and_confirm_msp(who, 100);

        assert_ok!(
            <StorageProviders as MutateChallengeableProvidersInterface>::slash(&msp_id, 1_000_000)
        );
        assert!(ProviderTopUpExpirations::<Test>::contains_key(msp_id));
        System::assert_last_event(Event::ProviderInsolvent { provider_id: msp_id }.into());

        assert_ok!(StorageProviders::top_up_deposit(RuntimeOrigin::signed(
            who
        )));
        assert!(!ProviderTopUpExpirations::<Test>::contains_key(msp_id));
        System::assert_last_event(Event::ProviderToppedUp { provider_id: msp_id }.into());
    });
}
