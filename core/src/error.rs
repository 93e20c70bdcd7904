//! Error types for the depthwise-core library.
//!
//! The kernel itself never fails on numeric grounds: overflow and rounding are
//! policy. Everything here is a configuration or caller fault caught at the
//! boundary, before any tensor is indexed.

use core::fmt;

use thiserror::Error;

/// Which tensor argument a length check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Input,
    Weights,
    Biases,
    Output,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operand::Input => "input",
            Operand::Weights => "weights",
            Operand::Biases => "biases",
            Operand::Output => "output",
        })
    }
}

/// Spatial axis of a feature map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Height,
    Width,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::Height => "height",
            Axis::Width => "width",
        })
    }
}

/// All possible error conditions in the depthwise-core library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConvError {
    #[error("{operand} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        operand: Operand,
        expected: usize,
        actual: usize,
    },

    #[error("n_filt ({n_filt}) is not a multiple of n_chan ({n_chan})")]
    DepthMultiplier { n_chan: usize, n_filt: usize },

    #[error("{0} must be non-zero")]
    ZeroDimension(&'static str),

    #[error("stride must be non-zero")]
    ZeroStride,

    #[error("filter {axis} {filter} exceeds padded input {axis} {padded}")]
    FilterExceedsInput {
        axis: Axis,
        filter: usize,
        padded: usize,
    },

    #[error("output {axis} mismatch: geometry gives {expected}, config declares {actual}")]
    OutputExtent {
        axis: Axis,
        expected: usize,
        actual: usize,
    },

    #[error("{0} overflows usize")]
    ShapeOverflow(&'static str),

    #[error("padding must be `valid` or `same`")]
    InvalidPadding,

    #[error("invalid fixed-point precision: {reason}")]
    InvalidPrecision { reason: &'static str },
}

pub type ConvResult<T> = Result<T, ConvError>;
