//! Accumulator policies: how a bias seeds an output slot and how products are
//! summed into it.

use core::marker::PhantomData;

use crate::fixed::{Fixed, FixedFormat};

/// Whether the result of a reduction depends on the order of its terms.
///
/// Downstream synthesis may build an adder tree for order-insensitive
/// accumulators; order-sensitive ones must be reduced bias first, then taps
/// in row-major filter order.
pub trait ReductionOrder {
    fn order_sensitive(&self) -> bool;
}

/// Accumulator policy over bias type `B` and product type `P`.
pub trait Accumulator<B, P>: ReductionOrder {
    type Acc: Copy;

    /// Initial slot value, converted from the bias.
    fn seed(&self, bias: B) -> Self::Acc;

    /// `acc + product`, stored back in the accumulator type.
    fn accumulate(&self, acc: Self::Acc, product: P) -> Self::Acc;
}

/// Accumulate in a primitive numeric type.
///
/// Integer accumulators wrap on overflow like a two's complement hardware
/// adder; wrapping addition is associative, so their reduction order is free.
/// Float addition is not associative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Native<T>(PhantomData<T>);

impl<T> Native<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

macro_rules! native_float {
    ($($t:ty),*) => {$(
        impl ReductionOrder for Native<$t> {
            fn order_sensitive(&self) -> bool {
                true
            }
        }

        impl<B: Into<$t>, P: Into<$t>> Accumulator<B, P> for Native<$t> {
            type Acc = $t;

            #[inline(always)]
            fn seed(&self, bias: B) -> $t {
                bias.into()
            }

            #[inline(always)]
            fn accumulate(&self, acc: $t, product: P) -> $t {
                acc + product.into()
            }
        }
    )*};
}

macro_rules! native_int {
    ($($t:ty),*) => {$(
        impl ReductionOrder for Native<$t> {
            fn order_sensitive(&self) -> bool {
                false
            }
        }

        impl<B: Into<$t>, P: Into<$t>> Accumulator<B, P> for Native<$t> {
            type Acc = $t;

            #[inline(always)]
            fn seed(&self, bias: B) -> $t {
                bias.into()
            }

            #[inline(always)]
            fn accumulate(&self, acc: $t, product: P) -> $t {
                acc.wrapping_add(product.into())
            }
        }
    )*};
}

native_float!(f32, f64);
native_int!(i32, i64);

/// A fixed-point format used as the accumulator type: every partial sum is
/// computed exactly and then quantized into the format, so rounding and
/// saturation happen once per tap.
impl ReductionOrder for FixedFormat {
    fn order_sensitive(&self) -> bool {
        true
    }
}

impl Accumulator<Fixed, Fixed> for FixedFormat {
    type Acc = Fixed;

    #[inline(always)]
    fn seed(&self, bias: Fixed) -> Fixed {
        self.quantize(bias)
    }

    #[inline(always)]
    fn accumulate(&self, acc: Fixed, product: Fixed) -> Fixed {
        self.quantize(acc + product)
    }
}
