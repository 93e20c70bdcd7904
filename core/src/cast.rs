//! Cast policies: map a finished accumulator to the output element type.
//!
//! A cast never fails. Out-of-range values are resolved by the policy
//! (saturation for [`Requant`], the format's overflow mode for
//! [`FixedFormat`]).

use crate::fixed::{Fixed, FixedFormat};

/// Cast policy from accumulator type `A`.
pub trait Cast<A> {
    type Output;

    fn cast(&self, acc: A) -> Self::Output;
}

/// Store the accumulator unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl<A> Cast<A> for Identity {
    type Output = A;

    #[inline(always)]
    fn cast(&self, acc: A) -> A {
        acc
    }
}

/// TFLite-style requantization of an integer accumulator to `i8`:
/// `clamp((acc * multiplier) >> shift, -128, 127)`.
///
/// The multiply is done in `i64` so it cannot overflow; `>>` is arithmetic,
/// i.e. it rounds toward negative infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requant {
    pub multiplier: i32,
    pub shift: u32,
}

impl Requant {
    pub const fn new(multiplier: i32, shift: u32) -> Self {
        Self { multiplier, shift }
    }

    /// Plain saturation to `i8`, no rescaling.
    pub const fn saturate() -> Self {
        Self::new(1, 0)
    }

    /// Unit multiplier with the shift chosen from the number of taps summed
    /// per output, see [`compute_requant_shift`].
    pub fn adaptive(taps: usize) -> Self {
        Self::new(1, compute_requant_shift(taps))
    }

    #[inline(always)]
    fn apply(&self, acc: i64) -> i8 {
        let scaled = acc.saturating_mul(self.multiplier as i64) >> self.shift.min(63);
        scaled.clamp(i8::MIN as i64, i8::MAX as i64) as i8
    }
}

impl Cast<i32> for Requant {
    type Output = i8;

    #[inline(always)]
    fn cast(&self, acc: i32) -> i8 {
        self.apply(acc as i64)
    }
}

impl Cast<i64> for Requant {
    type Output = i8;

    #[inline(always)]
    fn cast(&self, acc: i64) -> i8 {
        self.apply(acc)
    }
}

/// Quantize a fixed-point accumulator into the result format.
impl Cast<Fixed> for FixedFormat {
    type Output = Fixed;

    #[inline(always)]
    fn cast(&self, acc: Fixed) -> Fixed {
        self.quantize(acc)
    }
}

/// Optimal requantization shift for `k` summed i8×i8 products.
///
/// The accumulator peaks near `k × 127 × 127`; shifting right by
/// `ceil(log2(k)) + 7` brings it back to roughly the i8 range with a single
/// arithmetic shift.
///
/// - k=9  (3×3 depthwise): shift=11
/// - k=25 (5×5 depthwise): shift=12
#[inline]
pub fn compute_requant_shift(k: usize) -> u32 {
    if k == 0 {
        return 7;
    }
    let log2_k = if k <= 1 {
        0u32
    } else {
        usize::BITS - (k - 1).leading_zeros()
    };
    log2_k + 7
}
