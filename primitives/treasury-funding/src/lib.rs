//! Computes how much of what Providers charge for storage is diverted to the treasury,
//! as a function of how utilised the network's total storage capacity currently is.
//!
//! The cut grows linearly from a minimum while utilisation is below the ideal target, and
//! then decays with a power-of-two curve past it, so that the network is pushed back
//! towards the ideal utilisation rate from either side.
#![cfg_attr(not(feature = "std"), no_std)]

use core::marker::PhantomData;

use shp_traits::TreasuryCutCalculator;
use sp_arithmetic::{
    traits::{Saturating, Zero},
    FixedPointNumber, FixedU128, PerThing,
};
use sp_core::Get;
use sp_runtime::traits::AtLeast32BitUnsigned;
use sp_runtime::SaturatedConversion;

/// No cut at all is diverted to the treasury. Useful for test networks, or for a runtime
/// that funds its treasury entirely through other means.
pub struct NoCutTreasuryCutCalculator<Balance, ProvidedUnit>(
    PhantomData<(Balance, ProvidedUnit)>,
);

impl<Balance, ProvidedUnit> TreasuryCutCalculator for NoCutTreasuryCutCalculator<Balance, ProvidedUnit>
where
    Balance: sp_runtime::traits::Member
        + sp_runtime::traits::Parameter
        + sp_runtime::traits::MaybeSerializeDeserialize
        + core::fmt::Debug
        + Default
        + Copy
        + codec::MaxEncodedLen
        + Zero,
    ProvidedUnit: sp_runtime::traits::Member
        + sp_runtime::traits::Parameter
        + sp_runtime::traits::MaybeSerializeDeserialize
        + core::fmt::Debug
        + Default
        + Copy
        + codec::MaxEncodedLen,
{
    type Balance = Balance;
    type ProvidedUnit = ProvidedUnit;

    fn calculate_treasury_cut(
        _provided_amount: Self::ProvidedUnit,
        _used_amount: Self::ProvidedUnit,
        _amount_to_charge: Self::Balance,
    ) -> Self::Balance {
        Balance::zero()
    }
}

/// Configuration for [`LinearThenPowerOfTwoTreasuryCutCalculator`].
pub trait LinearThenPowerOfTwoTreasuryCutCalculatorConfig<P: PerThing> {
    type Balance: sp_runtime::traits::Member
        + sp_runtime::traits::Parameter
        + sp_runtime::traits::MaybeSerializeDeserialize
        + core::fmt::Debug
        + Default
        + Copy
        + codec::MaxEncodedLen;
    type ProvidedUnit: sp_runtime::traits::Member
        + sp_runtime::traits::Parameter
        + sp_runtime::traits::MaybeSerializeDeserialize
        + core::fmt::Debug
        + Default
        + Copy
        + codec::MaxEncodedLen
        + Into<u64>;

    /// The system utilisation rate (used / provided) at which the treasury cut is at its
    /// lowest, and past which it starts to climb with a power-of-two curve.
    type IdealUtilisationRate: Get<P>;
    /// How quickly the treasury cut grows once utilisation climbs past the ideal rate.
    /// A smaller decay rate makes the cut grow faster.
    type DecayRate: Get<P>;
    /// The treasury cut at zero utilisation.
    type MinimumCut: Get<P>;
    /// The treasury cut at the ideal utilisation rate (and the asymptote the power-of-two
    /// curve is scaled against past it).
    type MaximumCut: Get<P>;
}

/// Treasury cut calculator that grows the cut linearly from [`Config::MinimumCut`] at zero
/// utilisation to [`Config::MaximumCut`] at [`Config::IdealUtilisationRate`], and decays it
/// with a power-of-two curve, scaled by [`Config::DecayRate`], for utilisation past that
/// point.
pub struct LinearThenPowerOfTwoTreasuryCutCalculator<Config, P>(PhantomData<(Config, P)>);

impl<Config, P> TreasuryCutCalculator for LinearThenPowerOfTwoTreasuryCutCalculator<Config, P>
where
    P: PerThing,
    FixedU128: From<P>,
    Config: LinearThenPowerOfTwoTreasuryCutCalculatorConfig<P>,
    Config::Balance: AtLeast32BitUnsigned,
{
    type Balance = Config::Balance;
    type ProvidedUnit = Config::ProvidedUnit;

    fn calculate_treasury_cut(
        provided_amount: Self::ProvidedUnit,
        used_amount: Self::ProvidedUnit,
        amount_to_charge: Self::Balance,
    ) -> Self::Balance {
        let provided: u64 = provided_amount.into();
        let used: u64 = used_amount.into();

        if provided == 0 {
            return amount_to_charge;
        }

        let system_utilisation = P::from_rational(used as u128, provided as u128);
        let ideal_system_utilisation = Config::IdealUtilisationRate::get();
        let falloff = Config::DecayRate::get();

        let adjustment =
            compute_adjustment_over_minimum_cut(system_utilisation, ideal_system_utilisation, falloff);

        let minimum_cut: FixedU128 = Config::MinimumCut::get().into();
        let maximum_cut: FixedU128 = Config::MaximumCut::get().into();
        let delta_cut = maximum_cut.saturating_sub(minimum_cut);
        let adjustment: FixedU128 = adjustment.into();

        let treasury_cut = minimum_cut.saturating_add(delta_cut.saturating_mul(adjustment));

        let amount_to_charge_u128: u128 = amount_to_charge.saturated_into();
        let cut = treasury_cut
            .saturating_mul_int(amount_to_charge_u128)
            .min(amount_to_charge_u128);

        cut.saturated_into()
    }
}

/// Computes, as a value of `P`, how far below the maximum cut the treasury cut should sit
/// for a given system utilisation.
///
/// Below the ideal utilisation rate, this decreases linearly from `1` (at zero
/// utilisation) to `0` (at the ideal rate). Above it, it falls off following a
/// power-of-two curve scaled by `falloff`, asymptotically approaching `0` as utilisation
/// grows, without ever reaching it, so the treasury cut never drops below its minimum
/// nor exceeds its maximum.
pub fn compute_adjustment_over_minimum_cut<P: PerThing>(
    system_utilisation: P,
    ideal_system_utilisation: P,
    falloff: P,
) -> P
where
    FixedU128: From<P>,
{
    if system_utilisation < ideal_system_utilisation {
        // 1 - x / x_ideal
        let ratio = system_utilisation / ideal_system_utilisation;
        ratio.left_from_one()
    } else {
        // 1 - 2^((x_ideal - x) / d)
        let x: FixedU128 = system_utilisation.into();
        let x_ideal: FixedU128 = ideal_system_utilisation.into();
        let d: FixedU128 = falloff.into();

        if d.is_zero() {
            return P::zero();
        }

        let exponent = x_ideal.saturating_sub(x) / d;
        let power_of_two = fixed_exp2(exponent);

        P::from_rational(
            power_of_two.into_inner().min(FixedU128::DIV),
            FixedU128::DIV,
        )
    }
}

/// Computes `2^x` for `x <= 0`, in fixed point, via `2^x = 2^floor(x) * 2^fract(x)`: the
/// integer part is a right bit-shift, and the fractional part (always in `[0, 1)`) is
/// approximated with a degree-5 minimax polynomial.
fn fixed_exp2(x: FixedU128) -> FixedU128 {
    // `x` is always non-positive here (exponent of a falloff past the ideal point).
    let x = x.min(FixedU128::zero());
    let neg_x = x.saturating_abs();

    let whole = neg_x.trunc().into_inner() / FixedU128::DIV;
    let fract = neg_x.frac();

    // 2^(-fract), fract in [0, 1), via a minimax polynomial for 2^(-f) on [0, 1).
    const C0: u128 = 1_000_000_000_000_000_000;
    const C1: u128 = 693_147_180_559_945_309;
    const C2: u128 = 240_226_506_959_100_712;
    const C3: u128 = 55_504_108_664_821_579;
    const C4: u128 = 9_618_129_107_628_477;
    const C5: u128 = 1_333_355_814_642_844;

    let f = fract.into_inner();
    let f2 = f.saturating_mul(f) / FixedU128::DIV;
    let f3 = f2.saturating_mul(f) / FixedU128::DIV;
    let f4 = f3.saturating_mul(f) / FixedU128::DIV;
    let f5 = f4.saturating_mul(f) / FixedU128::DIV;

    let poly = C0
        .saturating_sub(C1.saturating_mul(f) / FixedU128::DIV)
        .saturating_add(C2.saturating_mul(f2) / FixedU128::DIV)
        .saturating_sub(C3.saturating_mul(f3) / FixedU128::DIV)
        .saturating_add(C4.saturating_mul(f4) / FixedU128::DIV)
        .saturating_sub(C5.saturating_mul(f5) / FixedU128::DIV);

    let two_pow_neg_fract = FixedU128::from_inner(poly);

    if whole >= 128 {
        FixedU128::zero()
    } else {
        // Divide by 2^whole.
        FixedU128::from_inner(two_pow_neg_fract.into_inner() >> whole)
    }
}
