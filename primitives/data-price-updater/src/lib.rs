//! An implementation of [`UpdateStoragePrice`] driven by network-wide capacity utilisation.
#![cfg_attr(not(feature = "std"), no_std)]

use sp_arithmetic::{
    traits::{One, Saturating, Zero},
    FixedPointNumber, FixedU128,
};
use shp_traits::UpdateStoragePrice;

const LOG_TARGET: &str = "data-price-updater";

/// Utilisation, as a percentage of total capacity, below which the price is only ever the
/// floor price.
const LOW_UTILISATION_THRESHOLD_PERCENT: u32 = 50;

/// Utilisation threshold above which the price update switches from linear to steep,
/// penalising providers for letting the network approach saturation.
const HIGH_UTILISATION_THRESHOLD_PERCENT: u32 = 90;

/// Updates the price per storage data unit per tick based on how full the network is.
///
/// Below [`LOW_UTILISATION_THRESHOLD_PERCENT`] utilisation the price decays back towards the
/// floor price. Between the low and high thresholds it grows linearly with utilisation. Above
/// [`HIGH_UTILISATION_THRESHOLD_PERCENT`] it grows steeply, so that a nearly-full network
/// prices out further demand rather than accepting storage requests it cannot service.
pub struct MostlyStablePriceUpdater<Price, StorageDataUnit> {
    _phantom: core::marker::PhantomData<(Price, StorageDataUnit)>,
}

impl UpdateStoragePrice for MostlyStablePriceUpdater<FixedU128, u64> {
    type Price = FixedU128;
    type StorageDataUnit = u64;

    fn update_storage_price(
        current_price: Self::Price,
        used_capacity: Self::StorageDataUnit,
        total_capacity: Self::StorageDataUnit,
    ) -> Self::Price {
        if total_capacity.is_zero() {
            return current_price;
        }

        let utilisation_percent = FixedU128::saturating_from_rational(used_capacity, total_capacity)
            .saturating_mul(FixedU128::saturating_from_integer(100u32));

        let low = FixedU128::saturating_from_integer(LOW_UTILISATION_THRESHOLD_PERCENT);
        let high = FixedU128::saturating_from_integer(HIGH_UTILISATION_THRESHOLD_PERCENT);

        let new_price = if utilisation_percent <= low {
            // Decay 1% per tick towards the floor, but never reach zero.
            let decay = FixedU128::saturating_from_rational(99u32, 100u32);
            current_price.saturating_mul(decay).max(Self::floor_price())
        } else if utilisation_percent <= high {
            let step = FixedU128::saturating_from_rational(1u32, 1000u32);
            current_price.saturating_add(current_price.saturating_mul(step))
        } else {
            let step = FixedU128::saturating_from_rational(1u32, 100u32);
            current_price.saturating_add(current_price.saturating_mul(step))
        };

        log::trace!(
            target: LOG_TARGET,
            "price update: utilisation={}% current={:?} new={:?}",
            utilisation_percent,
            current_price,
            new_price,
        );

        new_price
    }
}

impl MostlyStablePriceUpdater<FixedU128, u64> {
    /// Minimum price per storage data unit per tick; the price updater never goes below this.
    fn floor_price() -> FixedU128 {
        FixedU128::one() / FixedU128::saturating_from_integer(1_000_000u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Updater = MostlyStablePriceUpdater<FixedU128, u64>;

    #[test]
    fn low_utilisation_decays_price() {
        let price = FixedU128::saturating_from_integer(10u32);
        let new_price = Updater::update_storage_price(price, 10, 1000);
        assert!(new_price < price);
    }

    #[test]
    fn mid_utilisation_grows_slowly() {
        let price = FixedU128::saturating_from_integer(10u32);
        let new_price = Updater::update_storage_price(price, 700, 1000);
        assert!(new_price > price);
        assert!(new_price < price.saturating_mul(FixedU128::saturating_from_rational(11u32, 10u32)));
    }

    #[test]
    fn high_utilisation_grows_faster_than_mid() {
        let price = FixedU128::saturating_from_integer(10u32);
        let mid = Updater::update_storage_price(price, 700, 1000);
        let high = Updater::update_storage_price(price, 950, 1000);
        assert!(high - price > mid - price);
    }

    #[test]
    fn zero_total_capacity_is_a_noop() {
        let price = FixedU128::saturating_from_integer(10u32);
        assert_eq!(Updater::update_storage_price(price, 0, 0), price);
    }
}
