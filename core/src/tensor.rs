//! Flat-buffer layout views for depthwise convolution tensors.
//!
//! Tensors are plain caller-owned slices; these views only own the extents and
//! turn logical coordinates into flat offsets. Downstream consumers (HLS
//! firmware, weight exporters) depend on this exact flattening order, so the
//! offset formulas are the contract and must not be reordered.

/// Row-major `[height][width][channels]` layout, used for both the input and
/// the output feature map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureMap {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl FeatureMap {
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self { height, width, channels }
    }

    /// Total number of elements, saturating at `usize::MAX`.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.height.saturating_mul(self.width).saturating_mul(self.channels)
    }

    /// Total number of elements, or `None` if it does not fit in `usize`.
    pub const fn checked_len(&self) -> Option<usize> {
        match self.height.checked_mul(self.width) {
            Some(plane) => plane.checked_mul(self.channels),
            None => None,
        }
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat offset of `[h][w][c]`: `h*width*channels + w*channels + c`.
    #[inline(always)]
    pub const fn index(&self, h: usize, w: usize, c: usize) -> usize {
        h * self.width * self.channels + w * self.channels + c
    }
}

/// Depthwise filter bank laid out `[depth_multiplier][height][width][channels]`.
///
/// Filter `(c, dm)` produces output channel `c * depth_multiplier + dm`; the
/// bias vector is indexed the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterBank {
    pub depth_multiplier: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl FilterBank {
    pub const fn new(depth_multiplier: usize, height: usize, width: usize, channels: usize) -> Self {
        Self { depth_multiplier, height, width, channels }
    }

    /// Total number of weights, saturating at `usize::MAX`.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.depth_multiplier
            .saturating_mul(self.height)
            .saturating_mul(self.width)
            .saturating_mul(self.channels)
    }

    /// Total number of weights, or `None` if it does not fit in `usize`.
    pub const fn checked_len(&self) -> Option<usize> {
        let window = match self.height.checked_mul(self.width) {
            Some(window) => window,
            None => return None,
        };
        match window.checked_mul(self.channels) {
            Some(slice) => slice.checked_mul(self.depth_multiplier),
            None => None,
        }
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of filters, `n_chan * depth_multiplier`.
    #[inline(always)]
    pub const fn n_filt(&self) -> usize {
        self.channels.saturating_mul(self.depth_multiplier)
    }

    /// Flat offset of weight `[dm][kh][kw][c]`.
    #[inline(always)]
    pub const fn index(&self, dm: usize, kh: usize, kw: usize, c: usize) -> usize {
        dm * self.height * self.width * self.channels
            + kh * self.width * self.channels
            + kw * self.channels
            + c
    }

    /// Output channel (and bias index) owned by filter `(c, dm)`.
    #[inline(always)]
    pub const fn filter_channel(&self, c: usize, dm: usize) -> usize {
        c * self.depth_multiplier + dm
    }
}
