//! Python bindings for depthwise-core via PyO3.
//!
//! The conversion toolchain uses these as the bit-accurate reference for a
//! depthwise layer: the same geometry and precision strings that go into the
//! generated firmware config run through the Rust kernel.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use depthwise_core::{
    ConvError, ConvShape, DepthwiseConv2DConfig, Fixed, FixedFormat, FrozenDepthwiseConv2D,
    Identity, Mult, Native, Padding, Requant,
};

fn to_py_err(e: ConvError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_format(precision: &str) -> PyResult<FixedFormat> {
    precision.parse::<FixedFormat>().map_err(to_py_err)
}

fn quantize_all(values: &[f64], format: &FixedFormat) -> Vec<Fixed> {
    values.iter().map(|&v| format.from_f64(v)).collect()
}

/// A depthwise 2D convolution layer geometry.
#[pyclass(name = "DepthwiseConv2D")]
pub struct PyDepthwiseConv2D {
    shape: ConvShape,
}

#[pymethods]
impl PyDepthwiseConv2D {
    /// `input_shape` is `(height, width, channels)`.
    #[new]
    #[pyo3(signature = (input_shape, kernel_size, depth_multiplier=1, strides=(1, 1), padding="valid"))]
    fn new(
        input_shape: (usize, usize, usize),
        kernel_size: (usize, usize),
        depth_multiplier: usize,
        strides: (usize, usize),
        padding: &str,
    ) -> PyResult<Self> {
        let padding = padding.parse::<Padding>().map_err(to_py_err)?;
        let (in_height, in_width, n_chan) = input_shape;
        let shape = ConvShape::with_padding(
            in_height,
            in_width,
            n_chan,
            depth_multiplier,
            kernel_size.0,
            kernel_size.1,
            strides.0,
            strides.1,
            padding,
        )
        .map_err(to_py_err)?;
        Ok(Self { shape })
    }

    /// Build from a JSON layer config with the firmware field names
    /// (`in_height`, `n_chan`, `n_filt`, `pad_top`, ...).
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let shape: ConvShape = serde_json::from_str(json)
            .map_err(|e| PyValueError::new_err(format!("invalid layer config: {e}")))?;
        shape.validate().map_err(to_py_err)?;
        Ok(Self { shape })
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.shape).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// `(out_height, out_width, n_filt)`
    fn output_shape(&self) -> (usize, usize, usize) {
        (self.shape.out_height, self.shape.out_width, self.shape.n_filt)
    }

    /// `(pad_top, pad_bottom, pad_left, pad_right)`; trailing pads are `None`
    /// when the JSON config left them out.
    fn padding(&self) -> (usize, Option<usize>, usize, Option<usize>) {
        (self.shape.pad_top, self.shape.pad_bottom, self.shape.pad_left, self.shape.pad_right)
    }

    fn depth_multiplier(&self) -> usize {
        self.shape.depth_multiplier()
    }

    /// Multipliers needed when the layer is fully unrolled (padding taps pruned).
    fn multiplier_count(&self) -> PyResult<usize> {
        let config =
            DepthwiseConv2DConfig::new(self.shape, Mult, Native::<f32>::new(), Identity)
                .map_err(to_py_err)?;
        Ok(config.unroll_plan().taps)
    }

    fn forward_f32(&self, input: Vec<f32>, weights: Vec<f32>, biases: Vec<f32>) -> PyResult<Vec<f32>> {
        let config =
            DepthwiseConv2DConfig::new(self.shape, Mult, Native::<f32>::new(), Identity)
                .map_err(to_py_err)?;
        let layer = FrozenDepthwiseConv2D::new(config, &weights, &biases).map_err(to_py_err)?;
        layer.forward(&input).map_err(to_py_err)
    }

    /// i8 data and weights, i32 biases and accumulator, requantized to i8.
    /// Without `requant_shift` the shift adapts to the filter size.
    #[pyo3(signature = (input, weights, biases, requant_m=1, requant_shift=None))]
    fn forward_i8(
        &self,
        input: Vec<i8>,
        weights: Vec<i8>,
        biases: Vec<i32>,
        requant_m: i32,
        requant_shift: Option<u32>,
    ) -> PyResult<Vec<i8>> {
        let cast = match requant_shift {
            Some(shift) => Requant::new(requant_m, shift),
            None => {
                let taps = self.shape.filt_height.saturating_mul(self.shape.filt_width);
                Requant::new(requant_m, depthwise_core::compute_requant_shift(taps))
            }
        };
        let config = DepthwiseConv2DConfig::new(self.shape, Mult, Native::<i32>::new(), cast)
            .map_err(to_py_err)?;
        let layer = FrozenDepthwiseConv2D::new(config, &weights, &biases).map_err(to_py_err)?;
        layer.forward(&input).map_err(to_py_err)
    }

    /// Fixed-point forward pass. Inputs are quantized into their precision
    /// (e.g. `"fixed<16,6>"`, `"ap_fixed<8,3,AP_RND,AP_SAT>"`) and the result
    /// is returned as the real values of the result format.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (input, weights, biases, data_t, weight_t, bias_t, accum_t, result_t))]
    fn forward_fixed(
        &self,
        input: Vec<f64>,
        weights: Vec<f64>,
        biases: Vec<f64>,
        data_t: &str,
        weight_t: &str,
        bias_t: &str,
        accum_t: &str,
        result_t: &str,
    ) -> PyResult<Vec<f64>> {
        let input = quantize_all(&input, &parse_format(data_t)?);
        let weights = quantize_all(&weights, &parse_format(weight_t)?);
        let biases = quantize_all(&biases, &parse_format(bias_t)?);
        let accum = parse_format(accum_t)?;
        let result = parse_format(result_t)?;

        let config =
            DepthwiseConv2DConfig::new(self.shape, Mult, accum, result).map_err(to_py_err)?;
        let layer = FrozenDepthwiseConv2D::new(config, &weights, &biases).map_err(to_py_err)?;
        let output = layer.forward(&input).map_err(to_py_err)?;
        Ok(output.iter().map(Fixed::to_f64).collect())
    }

    fn __repr__(&self) -> String {
        let s = &self.shape;
        format!(
            "DepthwiseConv2D(in={}x{}x{}, filt={}x{}, stride={}x{}, out={}x{}x{})",
            s.in_height,
            s.in_width,
            s.n_chan,
            s.filt_height,
            s.filt_width,
            s.stride_height,
            s.stride_width,
            s.out_height,
            s.out_width,
            s.n_filt,
        )
    }
}

#[pymodule]
fn depthwise_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDepthwiseConv2D>()?;
    Ok(())
}
