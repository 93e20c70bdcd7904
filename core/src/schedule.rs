//! Parallelism statement for hardware synthesis.
//!
//! In the generated firmware every loop of the kernel is fully unrolled. The
//! four output dimensions become independent replicas with no shared state;
//! the two filter dimensions form one reduction per replica. [`UnrollPlan`]
//! makes that explicit and sizes it for a given layer.

use crate::accum::ReductionOrder;
use crate::config::ConvShape;

/// One loop of the depthwise kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDim {
    DepthMultiplier,
    OutRow,
    OutCol,
    Channel,
    FilterRow,
    FilterCol,
}

/// How the taps of one replica may be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Bias first, then taps with `kh` outer and `kw` inner.
    Ordered,
    /// Any association, e.g. a balanced adder tree.
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnrollPlan {
    /// Independent accumulator slots, `out_height * out_width * n_filt`.
    pub replicas: usize,
    /// Multiply instances over the whole layer; padding taps are pruned.
    /// Saturates at `usize::MAX`.
    pub taps: usize,
    /// Largest number of in-bounds taps feeding a single replica.
    pub max_taps_per_replica: usize,
    pub reduction: Reduction,
}

impl UnrollPlan {
    /// Loops with no cross-iteration dependency.
    pub const PARALLEL: [LoopDim; 4] =
        [LoopDim::DepthMultiplier, LoopDim::OutRow, LoopDim::OutCol, LoopDim::Channel];

    /// Loops reduced into one slot, outer first.
    pub const REDUCTION: [LoopDim; 2] = [LoopDim::FilterRow, LoopDim::FilterCol];

    pub fn new<A: ReductionOrder + ?Sized>(shape: &ConvShape, accum: &A) -> Self {
        let row_taps =
            |h: usize| (0..shape.filt_height).filter_map(|kh| shape.input_row(h, kh)).count();
        let col_taps =
            |w: usize| (0..shape.filt_width).filter_map(|kw| shape.input_col(w, kw)).count();

        let rows: usize = (0..shape.out_height).map(row_taps).sum();
        let cols: usize = (0..shape.out_width).map(col_taps).sum();
        let max_rows = (0..shape.out_height).map(row_taps).max().unwrap_or(0);
        let max_cols = (0..shape.out_width).map(col_taps).max().unwrap_or(0);

        let reduction = if accum.order_sensitive() {
            Reduction::Ordered
        } else {
            Reduction::Tree
        };

        Self {
            replicas: shape.output_map().len(),
            taps: rows.saturating_mul(cols).saturating_mul(shape.n_filt),
            max_taps_per_replica: max_rows.saturating_mul(max_cols),
            reduction,
        }
    }
}
