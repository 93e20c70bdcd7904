//! Multiply strategies: how one input sample and one weight form a product.
//!
//! Each strategy is a zero-sized policy object. Besides the plain product the
//! binary, ternary and power-of-two weight encodings used by compressed
//! networks are supported; they never need a real multiplier in hardware.
//!
//! Integer products widen (`i8 * i8 -> i32`) so the multiply itself can never
//! overflow; `Fixed` products are exact.

use crate::fixed::Fixed;

/// Multiply policy: `product(data, weight) -> Product`.
pub trait Multiply<D, W> {
    type Product;

    fn product(&self, data: D, weight: W) -> Self::Product;
}

/// Plain product `data * weight`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mult;

/// Binary weights: `true` encodes +1 and `false` encodes -1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightBinary;

/// Binary data: `true` encodes +1 and `false` encodes -1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataBinary;

/// Ternary weights: only the sign of the weight is used (-1, 0 or +1).
/// Outside {-1, 0, 1} any negative weight acts as -1, not as +1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightTernary;

/// Both operands binary: the product is XNOR, 1 when they agree and 0 otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BothBinary;

/// Power-of-two weights: the product is a shift of the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightExponential;

/// A weight of value `±2^exponent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpWeight {
    pub negative: bool,
    pub exponent: i8,
}

impl ExpWeight {
    pub const fn new(negative: bool, exponent: i8) -> Self {
        Self { negative, exponent }
    }
}

macro_rules! widening_mult {
    ($($d:ty, $w:ty => $p:ty);* $(;)?) => {$(
        impl Multiply<$d, $w> for Mult {
            type Product = $p;

            #[inline(always)]
            fn product(&self, data: $d, weight: $w) -> $p {
                <$p>::from(data) * <$p>::from(weight)
            }
        }
    )*};
}

widening_mult! {
    f32, f32 => f32;
    f64, f64 => f64;
    i8, i8 => i32;
    u8, i8 => i32;
    i16, i16 => i32;
    i32, i32 => i64;
}

impl Multiply<Fixed, Fixed> for Mult {
    type Product = Fixed;

    #[inline(always)]
    fn product(&self, data: Fixed, weight: Fixed) -> Fixed {
        data * weight
    }
}

macro_rules! signed_select {
    ($($d:ty => $p:ty),* $(,)?) => {$(
        impl Multiply<$d, bool> for WeightBinary {
            type Product = $p;

            #[inline(always)]
            fn product(&self, data: $d, weight: bool) -> $p {
                let data = <$p>::from(data);
                if weight { data } else { -data }
            }
        }

        impl Multiply<bool, $d> for DataBinary {
            type Product = $p;

            #[inline(always)]
            fn product(&self, data: bool, weight: $d) -> $p {
                let weight = <$p>::from(weight);
                if data { weight } else { -weight }
            }
        }

        impl Multiply<$d, i8> for WeightTernary {
            type Product = $p;

            #[inline(always)]
            fn product(&self, data: $d, weight: i8) -> $p {
                let data = <$p>::from(data);
                match weight.signum() {
                    0 => <$p>::from(0i8),
                    -1 => -data,
                    _ => data,
                }
            }
        }
    )*};
}

signed_select! {
    f32 => f32,
    f64 => f64,
    i8 => i32,
    i16 => i32,
    Fixed => Fixed,
}

impl Multiply<bool, bool> for BothBinary {
    type Product = i32;

    #[inline(always)]
    fn product(&self, data: bool, weight: bool) -> i32 {
        i32::from(data == weight)
    }
}

impl Multiply<f32, ExpWeight> for WeightExponential {
    type Product = f32;

    #[inline(always)]
    fn product(&self, data: f32, weight: ExpWeight) -> f32 {
        let shifted = libm::ldexpf(data, i32::from(weight.exponent));
        if weight.negative { -shifted } else { shifted }
    }
}

impl Multiply<f64, ExpWeight> for WeightExponential {
    type Product = f64;

    #[inline(always)]
    fn product(&self, data: f64, weight: ExpWeight) -> f64 {
        let shifted = libm::ldexp(data, i32::from(weight.exponent));
        if weight.negative { -shifted } else { shifted }
    }
}

impl Multiply<Fixed, ExpWeight> for WeightExponential {
    type Product = Fixed;

    #[inline(always)]
    fn product(&self, data: Fixed, weight: ExpWeight) -> Fixed {
        let shifted = data.scale_pow2(i32::from(weight.exponent));
        if weight.negative { -shifted } else { shifted }
    }
}
