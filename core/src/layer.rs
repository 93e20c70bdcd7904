//! Depthwise conv layer with frozen (borrowed) weights.

use alloc::vec;
use alloc::vec::Vec;

use crate::accum::Accumulator;
use crate::cast::Cast;
use crate::config::{ConvShape, DepthwiseConv2DConfig};
use crate::error::{ConvError, ConvResult, Operand};
use crate::mult::Multiply;

/// A depthwise layer whose weights and biases live outside it, typically
/// in a `static` table emitted by the weight exporter.
pub struct FrozenDepthwiseConv2D<'w, W, B, M, A, C> {
    config: DepthwiseConv2DConfig<M, A, C>,
    weights: &'w [W],
    biases: &'w [B],
}

impl<'w, W, B, M, A, C> FrozenDepthwiseConv2D<'w, W, B, M, A, C> {
    pub fn new(
        config: DepthwiseConv2DConfig<M, A, C>,
        weights: &'w [W],
        biases: &'w [B],
    ) -> ConvResult<Self> {
        let shape = config.shape();
        let expected_weights = shape.filter_bank().len();
        if weights.len() != expected_weights {
            return Err(ConvError::LengthMismatch {
                operand: Operand::Weights,
                expected: expected_weights,
                actual: weights.len(),
            });
        }
        if biases.len() != shape.n_filt {
            return Err(ConvError::LengthMismatch {
                operand: Operand::Biases,
                expected: shape.n_filt,
                actual: biases.len(),
            });
        }
        log::debug!(
            "FrozenDepthwiseConv2D: {}x{}x{} -> {}x{}x{} (depth_multiplier={})",
            shape.in_height,
            shape.in_width,
            shape.n_chan,
            shape.out_height,
            shape.out_width,
            shape.n_filt,
            shape.depth_multiplier(),
        );
        Ok(Self { config, weights, biases })
    }

    pub fn name(&self) -> &'static str {
        "DepthwiseConv2D"
    }

    pub fn config(&self) -> &DepthwiseConv2DConfig<M, A, C> {
        &self.config
    }

    pub fn shape(&self) -> &ConvShape {
        self.config.shape()
    }

    pub fn weights(&self) -> &[W] {
        self.weights
    }

    pub fn biases(&self) -> &[B] {
        self.biases
    }

    /// Elements produced per forward pass.
    pub fn output_len(&self) -> usize {
        self.shape().output_map().len()
    }

    /// Run the layer into a caller-provided buffer.
    pub fn forward_into<D>(&self, input: &[D], output: &mut [C::Output]) -> ConvResult<()>
    where
        D: Copy,
        W: Copy,
        B: Copy,
        M: Multiply<D, W>,
        A: Accumulator<B, M::Product>,
        C: Cast<A::Acc>,
    {
        self.config.compute(input, self.weights, self.biases, output)
    }

    /// Run the layer into a freshly allocated buffer.
    pub fn forward<D>(&self, input: &[D]) -> ConvResult<Vec<C::Output>>
    where
        D: Copy,
        W: Copy,
        B: Copy,
        M: Multiply<D, W>,
        A: Accumulator<B, M::Product>,
        C: Cast<A::Acc>,
        C::Output: Clone + Default,
    {
        let mut output = vec![C::Output::default(); self.output_len()];
        self.forward_into(input, &mut output)?;
        Ok(output)
    }
}
