//! Depthwise 2D convolution kernel and output-geometry helpers.
//!
//! Layouts (all row-major, see [`crate::tensor`]):
//!
//! ```text
//! input   [in_height][in_width][n_chan]
//! weights [depth_multiplier][filt_height][filt_width][n_chan]
//! biases  [n_chan * depth_multiplier]          index c*dm_count + dm
//! output  [out_height][out_width][n_filt]      channel c*dm_count + dm
//! ```
//!
//! Padding is implicit: a tap whose input coordinate falls outside the feature
//! map is skipped, so it contributes exactly zero. No padded copy of the input
//! is ever built.

use alloc::vec::Vec;

use crate::accum::Accumulator;
use crate::cast::Cast;
use crate::config::{DepthwiseConv2DConfig, Padding};
use crate::error::{Axis, ConvError, ConvResult};
use crate::mult::Multiply;

/// Depthwise 2D convolution.
///
/// Every `(dm, h, w, c)` tuple is independent and owns exactly one accumulator
/// slot. A slot is seeded with `biases[c*dm_count + dm]`, then the in-bounds
/// taps are added with `kh` outer and `kw` inner. Once all slots are reduced
/// they are cast into `output`, which is fully overwritten.
///
/// Only buffer lengths are checked here; the geometry was validated when
/// `config` was built.
pub fn depthwise_conv_2d<D, W, B, M, A, C>(
    config: &DepthwiseConv2DConfig<M, A, C>,
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
    let shape = config.shape();
    shape.check_operands(input.len(), weights.len(), biases.len(), output.len())?;

    let in_map = shape.input_map();
    let out_map = shape.output_map();
    let filters = shape.filter_bank();
    let multiply = config.multiply();
    let accum = config.accumulator();

    log::trace!(
        "depthwise_conv_2d: in={}x{}x{} filt={}x{} stride={}x{} out={}x{}x{}",
        shape.in_height,
        shape.in_width,
        shape.n_chan,
        shape.filt_height,
        shape.filt_width,
        shape.stride_height,
        shape.stride_width,
        shape.out_height,
        shape.out_width,
        shape.n_filt,
    );

    // Visiting (h, w, c, dm) walks the output slots in flat order, so slots
    // are pushed instead of indexed.
    let mut acc: Vec<A::Acc> = Vec::with_capacity(out_map.len());
    for h in 0..shape.out_height {
        for w in 0..shape.out_width {
            for c in 0..shape.n_chan {
                for dm in 0..filters.depth_multiplier {
                    let channel = filters.filter_channel(c, dm);
                    debug_assert_eq!(out_map.index(h, w, channel), acc.len());

                    let mut slot = accum.seed(biases[channel]);
                    for kh in 0..shape.filt_height {
                        let Some(h_in) = shape.input_row(h, kh) else {
                            continue;
                        };
                        for kw in 0..shape.filt_width {
                            let Some(w_in) = shape.input_col(w, kw) else {
                                continue;
                            };
                            let product = multiply.product(
                                input[in_map.index(h_in, w_in, c)],
                                weights[filters.index(dm, kh, kw, c)],
                            );
                            slot = accum.accumulate(slot, product);
                        }
                    }
                    acc.push(slot);
                }
            }
        }
    }

    let cast = config.cast();
    for (res, slot) in output.iter_mut().zip(acc) {
        *res = cast.cast(slot);
    }
    Ok(())
}

/// Number of window positions along one axis of an already padded extent.
pub fn conv_output_size(
    axis: Axis,
    padded: usize,
    filt: usize,
    stride: usize,
) -> ConvResult<usize> {
    if stride == 0 {
        return Err(ConvError::ZeroStride);
    }
    if filt > padded {
        return Err(ConvError::FilterExceedsInput { axis, filter: filt, padded });
    }
    Ok((padded - filt) / stride + 1)
}

/// Output extent and `(before, after)` padding along one axis.
///
/// `Same` follows Keras: `out = ceil(in / stride)` and the total padding
/// `max((out - 1) * stride + filt - in, 0)` is split with the extra pixel
/// after.
pub fn padded_extent(
    axis: Axis,
    input: usize,
    filt: usize,
    stride: usize,
    padding: Padding,
) -> ConvResult<(usize, usize, usize)> {
    if input == 0 {
        return Err(ConvError::ZeroDimension(match axis {
            Axis::Height => "in_height",
            Axis::Width => "in_width",
        }));
    }
    match padding {
        Padding::Valid => Ok((conv_output_size(axis, input, filt, stride)?, 0, 0)),
        Padding::Same => {
            if stride == 0 {
                return Err(ConvError::ZeroStride);
            }
            let out = input.div_ceil(stride);
            let reach = ((out - 1) * stride).checked_add(filt).ok_or(ConvError::ShapeOverflow(
                match axis {
                    Axis::Height => "padded height",
                    Axis::Width => "padded width",
                },
            ))?;
            let total = reach.saturating_sub(input);
            let before = total / 2;
            Ok((out, before, total - before))
        }
    }
}
