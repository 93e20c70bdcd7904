//! Static layer configuration: geometry plus numeric policies.
//!
//! [`ConvShape`] carries the same fields the layer-config structs of the HLS
//! firmware carry, so a configuration emitted by the conversion tooling can be
//! deserialized directly. It is checked once in
//! [`DepthwiseConv2DConfig::new`]; the kernel afterwards only verifies buffer
//! lengths.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::accum::{Accumulator, ReductionOrder};
use crate::cast::Cast;
use crate::error::{Axis, ConvError, ConvResult, Operand};
use crate::math;
use crate::mult::Multiply;
use crate::schedule::UnrollPlan;
use crate::tensor::{FeatureMap, FilterBank};

/// Keras-style padding selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// No padding; only windows fully inside the input.
    #[default]
    Valid,
    /// Pad so that `out = ceil(in / stride)`; the odd pixel goes to the
    /// bottom/right.
    Same,
}

impl FromStr for Padding {
    type Err = ConvError;

    fn from_str(s: &str) -> ConvResult<Self> {
        match s.trim() {
            "valid" | "VALID" => Ok(Padding::Valid),
            "same" | "SAME" => Ok(Padding::Same),
            _ => Err(ConvError::InvalidPadding),
        }
    }
}

/// Geometry of one depthwise convolution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvShape {
    pub in_height: usize,
    pub in_width: usize,
    pub n_chan: usize,
    pub out_height: usize,
    pub out_width: usize,
    pub n_filt: usize,
    pub filt_height: usize,
    pub filt_width: usize,
    pub stride_height: usize,
    pub stride_width: usize,
    #[serde(default)]
    pub pad_top: usize,
    /// Trailing pads are optional: the kernel only indexes with `pad_top` and
    /// `pad_left`. When present they pin the output extents exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_bottom: Option<usize>,
    #[serde(default)]
    pub pad_left: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_right: Option<usize>,
}

impl ConvShape {
    /// Derive output extents and pads from Keras-style layer arguments.
    #[allow(clippy::too_many_arguments)]
    pub fn with_padding(
        in_height: usize,
        in_width: usize,
        n_chan: usize,
        depth_multiplier: usize,
        filt_height: usize,
        filt_width: usize,
        stride_height: usize,
        stride_width: usize,
        padding: Padding,
    ) -> ConvResult<Self> {
        if stride_height == 0 || stride_width == 0 {
            return Err(ConvError::ZeroStride);
        }
        let (out_height, pad_top, pad_bottom) =
            math::padded_extent(Axis::Height, in_height, filt_height, stride_height, padding)?;
        let (out_width, pad_left, pad_right) =
            math::padded_extent(Axis::Width, in_width, filt_width, stride_width, padding)?;

        let n_filt = n_chan
            .checked_mul(depth_multiplier)
            .ok_or(ConvError::ShapeOverflow("n_filt"))?;

        let shape = Self {
            in_height,
            in_width,
            n_chan,
            out_height,
            out_width,
            n_filt,
            filt_height,
            filt_width,
            stride_height,
            stride_width,
            pad_top,
            pad_bottom: Some(pad_bottom),
            pad_left,
            pad_right: Some(pad_right),
        };
        shape.validate()?;
        log::debug!(
            "depthwise shape {:?} padding: in={}x{}x{} out={}x{}x{} pads(t,b,l,r)=({},{},{},{})",
            padding,
            in_height,
            in_width,
            n_chan,
            out_height,
            out_width,
            shape.n_filt,
            pad_top,
            pad_bottom,
            pad_left,
            pad_right,
        );
        Ok(shape)
    }

    /// Check every static invariant the kernel relies on.
    pub fn validate(&self) -> ConvResult<()> {
        let extents = [
            ("in_height", self.in_height),
            ("in_width", self.in_width),
            ("n_chan", self.n_chan),
            ("n_filt", self.n_filt),
            ("filt_height", self.filt_height),
            ("filt_width", self.filt_width),
            ("out_height", self.out_height),
            ("out_width", self.out_width),
        ];
        if let Some((name, _)) = extents.into_iter().find(|&(_, v)| v == 0) {
            return Err(ConvError::ZeroDimension(name));
        }
        if self.stride_height == 0 || self.stride_width == 0 {
            return Err(ConvError::ZeroStride);
        }
        if self.n_filt % self.n_chan != 0 {
            return Err(ConvError::DepthMultiplier { n_chan: self.n_chan, n_filt: self.n_filt });
        }

        check_extent(
            Axis::Height,
            self.in_height,
            self.pad_top,
            self.pad_bottom,
            self.filt_height,
            self.stride_height,
            self.out_height,
        )?;
        check_extent(
            Axis::Width,
            self.in_width,
            self.pad_left,
            self.pad_right,
            self.filt_width,
            self.stride_width,
            self.out_width,
        )?;

        let lengths = [
            ("input length", self.input_map().checked_len()),
            ("weight length", self.filter_bank().checked_len()),
            ("output length", self.output_map().checked_len()),
        ];
        if let Some((name, _)) = lengths.into_iter().find(|(_, len)| len.is_none()) {
            return Err(ConvError::ShapeOverflow(name));
        }
        Ok(())
    }

    /// Output channels generated per input channel.
    #[inline(always)]
    pub const fn depth_multiplier(&self) -> usize {
        match self.n_filt.checked_div(self.n_chan) {
            Some(dm) => dm,
            None => 0,
        }
    }

    pub const fn input_map(&self) -> FeatureMap {
        FeatureMap::new(self.in_height, self.in_width, self.n_chan)
    }

    pub const fn output_map(&self) -> FeatureMap {
        FeatureMap::new(self.out_height, self.out_width, self.n_filt)
    }

    pub const fn filter_bank(&self) -> FilterBank {
        FilterBank::new(self.depth_multiplier(), self.filt_height, self.filt_width, self.n_chan)
    }

    /// Input row read by filter row `kh` of output row `h`, or `None` when the
    /// tap falls into the padding.
    #[inline(always)]
    pub fn input_row(&self, h: usize, kh: usize) -> Option<usize> {
        (h * self.stride_height + kh)
            .checked_sub(self.pad_top)
            .filter(|&row| row < self.in_height)
    }

    /// Input column read by filter column `kw` of output column `w`, or `None`
    /// when the tap falls into the padding.
    #[inline(always)]
    pub fn input_col(&self, w: usize, kw: usize) -> Option<usize> {
        (w * self.stride_width + kw)
            .checked_sub(self.pad_left)
            .filter(|&col| col < self.in_width)
    }

    /// Verify caller buffer lengths against this geometry.
    pub fn check_operands(
        &self,
        input: usize,
        weights: usize,
        biases: usize,
        output: usize,
    ) -> ConvResult<()> {
        let checks = [
            (Operand::Input, self.input_map().len(), input),
            (Operand::Weights, self.filter_bank().len(), weights),
            (Operand::Biases, self.n_filt, biases),
            (Operand::Output, self.output_map().len(), output),
        ];
        for (operand, expected, actual) in checks {
            if expected != actual {
                return Err(ConvError::LengthMismatch { operand, expected, actual });
            }
        }
        Ok(())
    }
}

/// Check the declared output extent along one axis.
///
/// With a trailing pad the extent must equal
/// `(input + before + after - filt) / stride + 1`. Without one, windows may
/// run past the input into implicit zero padding, but each must start inside
/// the leading-padded input.
fn check_extent(
    axis: Axis,
    input: usize,
    before: usize,
    after: Option<usize>,
    filt: usize,
    stride: usize,
    out: usize,
) -> ConvResult<()> {
    let overflow = ConvError::ShapeOverflow(match axis {
        Axis::Height => "padded height",
        Axis::Width => "padded width",
    });
    let front = input.checked_add(before).ok_or(overflow)?;

    let (expected, matches) = match after {
        Some(after) => {
            let padded = front.checked_add(after).ok_or(overflow)?;
            let rows = math::conv_output_size(axis, padded, filt, stride)?;
            (rows, rows == out)
        }
        None => {
            let rows = (front - 1) / stride + 1;
            // furthest input coordinate a tap can address
            (out - 1)
                .checked_mul(stride)
                .and_then(|start| start.checked_add(filt))
                .ok_or(overflow)?;
            (rows, out <= rows)
        }
    };
    if !matches {
        return Err(ConvError::OutputExtent { axis, expected, actual: out });
    }
    Ok(())
}

/// A validated shape bundled with its numeric policies: the multiply
/// strategy `M`, the accumulator `A` and the cast `C`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthwiseConv2DConfig<M, A, C> {
    shape: ConvShape,
    multiply: M,
    accum: A,
    cast: C,
}

impl<M, A, C> DepthwiseConv2DConfig<M, A, C> {
    pub fn new(shape: ConvShape, multiply: M, accum: A, cast: C) -> ConvResult<Self> {
        shape.validate()?;
        Ok(Self { shape, multiply, accum, cast })
    }

    pub const fn shape(&self) -> &ConvShape {
        &self.shape
    }

    pub const fn multiply(&self) -> &M {
        &self.multiply
    }

    pub const fn accumulator(&self) -> &A {
        &self.accum
    }

    pub const fn cast(&self) -> &C {
        &self.cast
    }

    /// Run the kernel into a caller-provided output buffer.
    pub fn compute<D, W, B>(
        &self,
        input: &[D],
        weights: &[W],
        biases: &[B],
        output: &mut [C::Output],
    ) -> ConvResult<()>
    where
        D: Copy,
        W: Copy,
        B: Copy,
        M: Multiply<D, W>,
        A: Accumulator<B, M::Product>,
        C: Cast<A::Acc>,
    {
        math::depthwise_conv_2d(self, input, weights, biases, output)
    }

    /// Which loops the hardware should replicate and how taps must be reduced.
    pub fn unroll_plan(&self) -> UnrollPlan
    where
        A: ReductionOrder,
    {
        UnrollPlan::new(&self.shape, &self.accum)
    }
}
