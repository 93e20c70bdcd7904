//! # depthwise-core: bit-accurate depthwise convolution
//!
//! A `no_std` Rust library computing the depthwise 2D convolution used by
//! spatially-unrolled neural-network firmware. Each input channel is
//! convolved with its own filters (times a depth multiplier); channels never
//! mix.
//!
//! ## Architecture
//!
//! - **Kernel**: [`depthwise_conv_2d`] with implicit zero-padding
//! - **Numeric policies**: multiply ([`mult`]), accumulate ([`accum`]) and
//!   cast ([`cast`]) are injected through [`DepthwiseConv2DConfig`]
//! - **Fixed point**: `ap_fixed`-style formats with every rounding and
//!   overflow mode ([`fixed`])
//! - **Unroll plan**: which loops are independent replicas and how taps
//!   must be reduced ([`schedule`])
//!
//! ## Usage
//!
//! ```
//! use depthwise_core::*;
//!
//! let shape = ConvShape::with_padding(3, 3, 1, 1, 3, 3, 1, 1, Padding::Same)?;
//! let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<f32>::new(), Identity)?;
//!
//! let input = [1.0f32; 9];
//! let weights = [1.0f32; 9];
//! let biases = [0.0f32];
//! let mut output = [0.0f32; 9];
//! config.compute(&input, &weights, &biases, &mut output)?;
//! assert_eq!(output, [4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]);
//! # Ok::<(), ConvError>(())
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod accum;
pub mod cast;
pub mod config;
pub mod error;
pub mod fixed;
pub mod layer;
pub mod math;
pub mod mult;
pub mod schedule;
pub mod tensor;

// Re-export primary types
pub use accum::{Accumulator, Native, ReductionOrder};
pub use cast::{compute_requant_shift, Cast, Identity, Requant};
pub use config::{ConvShape, DepthwiseConv2DConfig, Padding};
pub use error::{Axis, ConvError, ConvResult, Operand};
pub use fixed::{Fixed, FixedFormat, Overflow, Rounding};
pub use layer::FrozenDepthwiseConv2D;
pub use math::{conv_output_size, depthwise_conv_2d, padded_extent};
pub use mult::{
    BothBinary, DataBinary, ExpWeight, Mult, Multiply, WeightBinary, WeightExponential,
    WeightTernary,
};
pub use schedule::{LoopDim, Reduction, UnrollPlan};
pub use tensor::{FeatureMap, FilterBank};
