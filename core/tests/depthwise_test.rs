//! Integration tests for the depthwise convolution kernel.
//!
//! Covers shape derivation and validation, layout formulas, the kernel over
//! float, quantized and fixed-point policies, the unroll plan and the frozen
//! layer wrapper.

use depthwise_core::*;

fn same_3x3() -> ConvShape {
    ConvShape::with_padding(3, 3, 1, 1, 3, 3, 1, 1, Padding::Same).unwrap()
}

// =============================================================================
// Shape Tests
// =============================================================================

#[test]
fn test_same_padding_shape() {
    let shape = same_3x3();
    assert_eq!((shape.out_height, shape.out_width, shape.n_filt), (3, 3, 1));
    assert_eq!(
        (shape.pad_top, shape.pad_bottom, shape.pad_left, shape.pad_right),
        (1, Some(1), 1, Some(1))
    );
    assert_eq!(shape.depth_multiplier(), 1);
}

#[test]
fn test_valid_padding_shape_with_depth_multiplier() {
    let shape = ConvShape::with_padding(5, 7, 2, 3, 3, 3, 1, 2, Padding::Valid).unwrap();
    assert_eq!(shape.out_height, 3);
    assert_eq!(shape.out_width, 3);
    assert_eq!(shape.n_filt, 6);
    assert_eq!(shape.depth_multiplier(), 3);
    assert_eq!(
        (shape.pad_top, shape.pad_bottom, shape.pad_left, shape.pad_right),
        (0, Some(0), 0, Some(0))
    );
}

#[test]
fn test_same_padding_odd_pixel_goes_after() {
    assert_eq!(padded_extent(Axis::Height, 4, 3, 2, Padding::Same), Ok((2, 0, 1)));
    assert_eq!(padded_extent(Axis::Width, 5, 3, 2, Padding::Same), Ok((3, 1, 1)));
    assert_eq!(padded_extent(Axis::Width, 5, 1, 2, Padding::Same), Ok((3, 0, 0)));

    let shape = ConvShape::with_padding(4, 4, 1, 1, 3, 3, 2, 2, Padding::Same).unwrap();
    assert_eq!((shape.pad_top, shape.pad_bottom), (0, Some(1)));
    assert!(shape.validate().is_ok());
}

#[test]
fn test_conv_output_size() {
    assert_eq!(conv_output_size(Axis::Height, 5, 3, 1), Ok(3));
    assert_eq!(conv_output_size(Axis::Width, 7, 3, 2), Ok(3));
    assert_eq!(conv_output_size(Axis::Width, 3, 3, 1), Ok(1));
    assert_eq!(conv_output_size(Axis::Height, 5, 3, 0), Err(ConvError::ZeroStride));
}

#[test]
fn test_padding_from_str() {
    assert_eq!("same".parse::<Padding>(), Ok(Padding::Same));
    assert_eq!("VALID".parse::<Padding>(), Ok(Padding::Valid));
    assert_eq!("full".parse::<Padding>(), Err(ConvError::InvalidPadding));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_zero_stride_rejected() {
    let err = ConvShape::with_padding(3, 3, 1, 1, 3, 3, 0, 1, Padding::Valid).unwrap_err();
    assert_eq!(err, ConvError::ZeroStride);
}

#[test]
fn test_filter_larger_than_input_rejected() {
    let err = ConvShape::with_padding(2, 4, 1, 1, 3, 3, 1, 1, Padding::Valid).unwrap_err();
    assert_eq!(
        err,
        ConvError::FilterExceedsInput { axis: Axis::Height, filter: 3, padded: 2 }
    );
}

#[test]
fn test_zero_extents_rejected() {
    let err = ConvShape::with_padding(0, 3, 1, 1, 1, 1, 1, 1, Padding::Valid).unwrap_err();
    assert_eq!(err, ConvError::ZeroDimension("in_height"));

    let err = ConvShape::with_padding(3, 3, 0, 1, 1, 1, 1, 1, Padding::Valid).unwrap_err();
    assert_eq!(err, ConvError::ZeroDimension("n_chan"));

    let err = ConvShape::with_padding(3, 3, 2, 0, 1, 1, 1, 1, Padding::Valid).unwrap_err();
    assert_eq!(err, ConvError::ZeroDimension("n_filt"));
}

#[test]
fn test_depth_multiplier_must_divide() {
    let shape = ConvShape { n_chan: 2, n_filt: 5, ..same_3x3() };
    assert_eq!(
        shape.validate(),
        Err(ConvError::DepthMultiplier { n_chan: 2, n_filt: 5 })
    );
}

#[test]
fn test_declared_output_extent_checked() {
    let shape = ConvShape { out_width: 2, ..same_3x3() };
    assert_eq!(
        shape.validate(),
        Err(ConvError::OutputExtent { axis: Axis::Width, expected: 3, actual: 2 })
    );

    let result = DepthwiseConv2DConfig::new(shape, Mult, Native::<f32>::new(), Identity);
    assert!(result.is_err());
}

#[test]
fn test_error_messages() {
    let err = ConvError::LengthMismatch { operand: Operand::Biases, expected: 4, actual: 3 };
    assert_eq!(err.to_string(), "biases length mismatch: expected 4, got 3");
    assert_eq!(
        ConvError::ZeroDimension("filt_width").to_string(),
        "filt_width must be non-zero"
    );
}

// =============================================================================
// Config Serialization Tests
// =============================================================================

#[test]
fn test_shape_from_json() {
    let json = r#"{
        "in_height": 3, "in_width": 3, "n_chan": 1,
        "out_height": 3, "out_width": 3, "n_filt": 1,
        "filt_height": 3, "filt_width": 3,
        "stride_height": 1, "stride_width": 1,
        "pad_top": 1, "pad_bottom": 1, "pad_left": 1, "pad_right": 1
    }"#;
    let shape: ConvShape = serde_json::from_str(json).unwrap();
    assert_eq!(shape, same_3x3());
}

#[test]
fn test_shape_json_without_pads() {
    let json = r#"{
        "in_height": 5, "in_width": 5, "n_chan": 2,
        "out_height": 3, "out_width": 3, "n_filt": 4,
        "filt_height": 3, "filt_width": 3,
        "stride_height": 1, "stride_width": 1
    }"#;
    let shape: ConvShape = serde_json::from_str(json).unwrap();
    assert_eq!((shape.pad_top, shape.pad_bottom), (0, None));
    assert_eq!(shape.depth_multiplier(), 2);
    assert!(shape.validate().is_ok());

    let text = serde_json::to_string(&shape).unwrap();
    assert_eq!(serde_json::from_str::<ConvShape>(&text).unwrap(), shape);
}

#[test]
fn test_shape_json_leading_pads_only() {
    let json = r#"{
        "in_height": 3, "in_width": 3, "n_chan": 1,
        "out_height": 3, "out_width": 3, "n_filt": 1,
        "filt_height": 3, "filt_width": 3,
        "stride_height": 1, "stride_width": 1,
        "pad_top": 1, "pad_left": 1
    }"#;
    let shape: ConvShape = serde_json::from_str(json).unwrap();
    assert_eq!((shape.pad_bottom, shape.pad_right), (None, None));

    let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<f32>::new(), Identity).unwrap();
    let mut output = [0.0f32; 9];
    config.compute(&[1.0f32; 9], &[1.0f32; 9], &[0.0f32], &mut output).unwrap();
    assert_eq!(output, [4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]);

    let plan = config.unroll_plan();
    assert_eq!(plan.taps, 49);
}

#[test]
fn test_leading_pads_only_window_must_start_inside() {
    // rows start at 0, 1, 2, 3; a fourth window starts past the 3-row input
    let shape = ConvShape { out_height: 4, pad_top: 0, pad_bottom: None, ..same_3x3() };
    assert_eq!(
        shape.validate(),
        Err(ConvError::OutputExtent { axis: Axis::Height, expected: 3, actual: 4 })
    );

    let shape = ConvShape { out_height: 4, pad_bottom: None, ..same_3x3() };
    assert!(shape.validate().is_ok());
}

#[test]
fn test_overflowing_extents_rejected() {
    let shape = ConvShape { in_height: usize::MAX, pad_bottom: Some(1), ..same_3x3() };
    assert_eq!(shape.validate(), Err(ConvError::ShapeOverflow("padded height")));

    let shape = ConvShape { in_width: usize::MAX, pad_right: None, ..same_3x3() };
    assert_eq!(shape.validate(), Err(ConvError::ShapeOverflow("padded width")));

    let huge = usize::MAX / 2;
    let shape = ConvShape { n_chan: huge, n_filt: huge, ..same_3x3() };
    assert_eq!(shape.validate(), Err(ConvError::ShapeOverflow("input length")));
    assert_eq!(shape.input_map().len(), usize::MAX);
    assert_eq!(shape.input_map().checked_len(), None);

    let err = ConvShape::with_padding(3, 3, usize::MAX, 2, 3, 3, 1, 1, Padding::Same);
    assert_eq!(err, Err(ConvError::ShapeOverflow("n_filt")));

    let err = padded_extent(Axis::Height, 3, usize::MAX, 1, Padding::Same);
    assert_eq!(err, Err(ConvError::ShapeOverflow("padded height")));
}

#[test]
fn test_overflowing_json_config_is_an_error() {
    let json = r#"{
        "in_height": 18446744073709551615, "in_width": 3, "n_chan": 1,
        "out_height": 3, "out_width": 3, "n_filt": 1,
        "filt_height": 3, "filt_width": 3,
        "stride_height": 1, "stride_width": 1,
        "pad_top": 1, "pad_bottom": 1, "pad_left": 1, "pad_right": 1
    }"#;
    let shape: ConvShape = serde_json::from_str(json).unwrap();
    assert_eq!(shape.validate(), Err(ConvError::ShapeOverflow("padded height")));
    assert_eq!(
        ConvError::ShapeOverflow("padded height").to_string(),
        "padded height overflows usize"
    );

    // unvalidated shapes still answer length queries without panicking
    let shape = ConvShape { n_chan: 0, ..shape };
    assert_eq!(shape.depth_multiplier(), 0);
    assert!(shape.check_operands(9, 9, 1, 9).is_err());
}

#[test]
fn test_padding_serde_lowercase() {
    assert_eq!(serde_json::to_string(&Padding::Same).unwrap(), r#""same""#);
    assert_eq!(serde_json::from_str::<Padding>(r#""valid""#).unwrap(), Padding::Valid);
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_feature_map_index() {
    let map = FeatureMap::new(4, 5, 3);
    assert_eq!(map.len(), 60);
    assert_eq!(map.index(0, 0, 0), 0);
    assert_eq!(map.index(2, 1, 2), 2 * 15 + 3 + 2);
    assert_eq!(map.index(3, 4, 2), 59);
}

#[test]
fn test_filter_bank_index() {
    let bank = FilterBank::new(2, 3, 3, 4);
    assert_eq!(bank.len(), 72);
    assert_eq!(bank.n_filt(), 8);
    assert_eq!(bank.index(1, 2, 0, 3), 36 + 24 + 3);
    assert_eq!(bank.index(1, 2, 2, 3), 71);
    assert_eq!(bank.filter_channel(3, 1), 7);
    assert_eq!(bank.filter_channel(0, 1), 1);
}

#[test]
fn test_tap_mapping_skips_padding() {
    let shape = same_3x3();
    assert_eq!(shape.input_row(0, 0), None);
    assert_eq!(shape.input_row(0, 1), Some(0));
    assert_eq!(shape.input_row(2, 2), None);
    assert_eq!(shape.input_col(1, 2), Some(2));
}

// =============================================================================
// Kernel Tests (f32)
// =============================================================================

#[test]
fn test_all_ones_same_padding() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<f32>::new(), Identity).unwrap();
    let mut output = [0.0f32; 9];
    config.compute(&[1.0f32; 9], &[1.0f32; 9], &[0.0f32], &mut output).unwrap();
    assert_eq!(output, [4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]);
}

#[test]
fn test_output_fully_overwritten() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<f32>::new(), Identity).unwrap();
    let mut output = [f32::NAN; 9];
    config.compute(&[0.0f32; 9], &[1.0f32; 9], &[0.5f32], &mut output).unwrap();
    assert!(output.iter().all(|&v| v == 0.5));
}

#[test]
fn test_stride_two_valid() {
    let shape = ConvShape::with_padding(4, 4, 1, 1, 2, 2, 2, 2, Padding::Valid).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<f32>::new(), Identity).unwrap();
    let input: Vec<f32> = (0..16).map(|v| v as f32).collect();
    let mut output = [0.0f32; 4];
    config.compute(&input, &[1.0f32; 4], &[0.0f32], &mut output).unwrap();
    assert_eq!(output, [10.0, 18.0, 42.0, 50.0]);
}

#[test]
fn test_depth_multiplier_bias_and_channel_order() {
    let shape = ConvShape::with_padding(1, 1, 2, 2, 1, 1, 1, 1, Padding::Valid).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<f32>::new(), Identity).unwrap();

    let input = [3.0f32, 5.0];
    // [dm][kh][kw][c]
    let weights = [2.0f32, 10.0, -1.0, 4.0];
    // [c * dm_count + dm]
    let biases = [100.0f32, 200.0, 300.0, 400.0];
    let mut output = [0.0f32; 4];
    config.compute(&input, &weights, &biases, &mut output).unwrap();

    assert_eq!(output, [106.0, 197.0, 350.0, 420.0]);
}

#[test]
fn test_multi_channel_same_padding() {
    let shape = ConvShape::with_padding(2, 2, 2, 1, 3, 3, 1, 1, Padding::Same).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<f32>::new(), Identity).unwrap();

    // channel 0 all ones, channel 1 all twos
    let input = [1.0f32, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0];
    let mut weights = [0.0f32; 18];
    // centre tap of channel 0, full window of channel 1
    weights[shape.filter_bank().index(0, 1, 1, 0)] = 3.0;
    for kh in 0..3 {
        for kw in 0..3 {
            weights[shape.filter_bank().index(0, kh, kw, 1)] = 1.0;
        }
    }
    let mut output = [0.0f32; 8];
    config.compute(&input, &weights, &[0.0, 1.0], &mut output).unwrap();

    // every output sees the whole 2x2 map of channel 1
    assert_eq!(output, [3.0, 9.0, 3.0, 9.0, 3.0, 9.0, 3.0, 9.0]);
}

#[test]
fn test_length_mismatch_reported() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<f32>::new(), Identity).unwrap();
    let mut output = [0.0f32; 9];

    let err = config.compute(&[1.0f32; 8], &[1.0f32; 9], &[0.0f32], &mut output);
    assert_eq!(
        err,
        Err(ConvError::LengthMismatch { operand: Operand::Input, expected: 9, actual: 8 })
    );

    let err = config.compute(&[1.0f32; 9], &[1.0f32; 9], &[0.0f32; 2], &mut output);
    assert_eq!(
        err,
        Err(ConvError::LengthMismatch { operand: Operand::Biases, expected: 1, actual: 2 })
    );

    let mut short = [0.0f32; 4];
    let err = config.compute(&[1.0f32; 9], &[1.0f32; 9], &[0.0f32], &mut short);
    assert_eq!(
        err,
        Err(ConvError::LengthMismatch { operand: Operand::Output, expected: 9, actual: 4 })
    );
}

#[test]
fn test_deterministic_bit_identical() {
    let shape = ConvShape::with_padding(5, 5, 3, 2, 3, 3, 2, 1, Padding::Same).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<f32>::new(), Identity).unwrap();
    let input: Vec<f32> = (0..75).map(|v| (v as f32 * 0.37).sin()).collect();
    let weights: Vec<f32> = (0..54).map(|v| (v as f32 * 1.3).cos() / 7.0).collect();
    let biases: Vec<f32> = (0..6).map(|v| v as f32 * 0.1).collect();

    let mut first = vec![0.0f32; shape.output_map().len()];
    let mut second = vec![0.0f32; shape.output_map().len()];
    config.compute(&input, &weights, &biases, &mut first).unwrap();
    config.compute(&input, &weights, &biases, &mut second).unwrap();

    let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

// =============================================================================
// Quantized Tests (i8 -> i32 -> i8)
// =============================================================================

#[test]
fn test_compute_requant_shift() {
    assert_eq!(compute_requant_shift(0), 7);
    assert_eq!(compute_requant_shift(1), 7);
    assert_eq!(compute_requant_shift(9), 11);
    assert_eq!(compute_requant_shift(25), 12);
    assert_eq!(Requant::adaptive(9), Requant::new(1, 11));
}

#[test]
fn test_requant_cast() {
    assert_eq!(Requant::new(3, 2).cast(100i32), 75);
    assert_eq!(Requant::saturate().cast(1000i32), 127);
    assert_eq!(Requant::saturate().cast(-1000i64), -128);
    // arithmetic shift floors
    assert_eq!(Requant::new(1, 1).cast(-3i32), -2);
}

#[test]
fn test_i8_requant_same_padding() {
    let cast = Requant::adaptive(9);
    let config = DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<i32>::new(), cast).unwrap();
    let mut output = [0i8; 9];
    config.compute(&[100i8; 9], &[100i8; 9], &[0i32], &mut output).unwrap();
    // 40000 >> 11, 60000 >> 11, 90000 >> 11
    assert_eq!(output, [19, 29, 19, 29, 43, 29, 19, 29, 19]);

    config.compute(&[100i8; 9], &[-100i8; 9], &[0i32], &mut output).unwrap();
    assert_eq!(output, [-20, -30, -20, -30, -44, -30, -20, -30, -20]);
}

#[test]
fn test_i8_saturates() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<i32>::new(), Requant::saturate())
            .unwrap();
    let mut output = [0i8; 9];
    config.compute(&[i8::MIN; 9], &[i8::MIN; 9], &[0i32], &mut output).unwrap();
    assert!(output.iter().all(|&v| v == 127));
}

#[test]
fn test_u8_data_widening() {
    let shape = ConvShape::with_padding(1, 2, 1, 1, 1, 2, 1, 1, Padding::Valid).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<i32>::new(), Identity).unwrap();
    let mut output = [0i32; 1];
    config.compute(&[255u8, 200], &[127i8, -128], &[10i32], &mut output).unwrap();
    assert_eq!(output, [10 + 255 * 127 - 200 * 128]);
}

// =============================================================================
// Fixed-Point Kernel Tests
// =============================================================================

#[test]
fn test_fixed_accumulator_saturates_per_tap() {
    // bias 7, then +5 (saturates to 7), then -5
    let shape = ConvShape::with_padding(1, 2, 1, 1, 1, 2, 1, 1, Padding::Valid).unwrap();
    let accum: FixedFormat = "fixed<4,4,TRN,SAT>".parse().unwrap();
    let result = FixedFormat::new(8, 8).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, accum, result).unwrap();

    let data = FixedFormat::new(8, 8).unwrap();
    let input = [data.from_int(5), data.from_int(5)];
    let weights = [data.from_int(1), data.from_int(-1)];
    let biases = [data.from_int(7)];
    let mut output = [Fixed::ZERO; 1];
    config.compute(&input, &weights, &biases, &mut output).unwrap();

    assert_eq!(output[0], Fixed::from(2i8));
}

#[test]
fn test_fixed_accumulator_row_major_taps() {
    // taps (kh, kw): (0,0)=5 (0,1)=6 (1,0)=-6 (1,1)=0
    // row-major: 5, 11 -> 7, 1, 1; column-major would give 5, -1, 5, 5
    let shape = ConvShape::with_padding(2, 2, 1, 1, 2, 2, 1, 1, Padding::Valid).unwrap();
    let accum: FixedFormat = "fixed<4,4,TRN,SAT>".parse().unwrap();
    let data = FixedFormat::new(8, 8).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, accum, data).unwrap();

    let input = [data.from_int(1); 4];
    let weights = [data.from_int(5), data.from_int(6), data.from_int(-6), data.from_int(0)];
    let mut output = [Fixed::ZERO; 1];
    config.compute(&input, &weights, &[Fixed::ZERO], &mut output).unwrap();

    assert_eq!(output[0], Fixed::from(1i8));
}

#[test]
fn test_fixed_result_rounding() {
    let shape = ConvShape::with_padding(1, 1, 1, 1, 1, 1, 1, 1, Padding::Valid).unwrap();
    let accum: FixedFormat = "fixed<32,16>".parse().unwrap();
    let result: FixedFormat = "ap_fixed<8,4,AP_RND,AP_SAT>".parse().unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, accum, result).unwrap();

    let data: FixedFormat = "fixed<16,6>".parse().unwrap();
    // 1.5 * 0.6875 = 1.03125, halfway between 1.0 and 1.0625
    let input = [data.from_f64(1.5)];
    let weights = [data.from_f64(0.6875)];
    let biases = [Fixed::ZERO];
    let mut output = [Fixed::ZERO; 1];
    config.compute(&input, &weights, &biases, &mut output).unwrap();
    assert_eq!(output[0].to_f64(), 1.0625);

    // far out of range saturates to the largest fixed<8,4>
    let input = [data.from_f64(20.0)];
    let weights = [data.from_f64(3.0)];
    config.compute(&input, &weights, &biases, &mut output).unwrap();
    assert_eq!(output[0].to_f64(), 7.9375);
}

#[test]
fn test_fixed_matches_float_when_exact() {
    let shape = same_3x3();
    let format = FixedFormat::new(16, 8).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, format, format).unwrap();

    let values = [0.5, -1.25, 2.0, 0.75, -0.5, 1.0, 0.25, -2.0, 1.5];
    let input: Vec<Fixed> = values.iter().map(|&v| format.from_f64(v)).collect();
    let weights: Vec<Fixed> = values.iter().rev().map(|&v| format.from_f64(v)).collect();
    let mut output = [Fixed::ZERO; 9];
    config.compute(&input, &weights, &[format.from_f64(0.125)], &mut output).unwrap();

    let float = DepthwiseConv2DConfig::new(shape, Mult, Native::<f64>::new(), Identity).unwrap();
    let rev: Vec<f64> = values.iter().rev().copied().collect();
    let mut expected = [0.0f64; 9];
    float.compute(&values, &rev, &[0.125], &mut expected).unwrap();

    let got: Vec<f64> = output.iter().map(Fixed::to_f64).collect();
    assert_eq!(got, expected);
}

// =============================================================================
// Multiply Strategy Tests
// =============================================================================

#[test]
fn test_binary_and_ternary_products() {
    assert_eq!(WeightBinary.product(2.0f32, true), 2.0);
    assert_eq!(WeightBinary.product(2.0f32, false), -2.0);
    assert_eq!(DataBinary.product(false, 3i8), -3i32);
    assert_eq!(DataBinary.product(true, -3i16), -3i32);
    assert_eq!(WeightTernary.product(5i8, -2i8), -5i32);
    assert_eq!(WeightTernary.product(5i8, 0i8), 0i32);
    assert_eq!(WeightTernary.product(5.0f64, 7i8), 5.0);
    assert_eq!(BothBinary.product(true, true), 1);
    assert_eq!(BothBinary.product(false, false), 1);
    assert_eq!(BothBinary.product(true, false), 0);
}

#[test]
fn test_exponential_products() {
    assert_eq!(WeightExponential.product(3.0f32, ExpWeight::new(true, 2)), -12.0);
    assert_eq!(WeightExponential.product(3.0f64, ExpWeight::new(false, -1)), 1.5);

    let p = WeightExponential.product(Fixed::from(3i8), ExpWeight::new(false, -2));
    assert_eq!(p.to_f64(), 0.75);
}

#[test]
fn test_binary_weight_kernel() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), WeightBinary, Native::<f32>::new(), Identity)
            .unwrap();
    let weights = [true, false, true, false, true, false, true, false, true];
    let mut output = [0.0f32; 9];
    config.compute(&[1.0f32; 9], &weights, &[0.0f32], &mut output).unwrap();
    // centre sees 5 positive and 4 negative taps
    assert_eq!(output[4], 1.0);
    // top-left sees taps (1,1) +, (1,2) -, (2,1) -, (2,2) +
    assert_eq!(output[0], 0.0);
}

#[test]
fn test_xnor_kernel() {
    let shape = ConvShape::with_padding(1, 4, 1, 1, 1, 4, 1, 1, Padding::Valid).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, BothBinary, Native::<i32>::new(), Identity)
        .unwrap();
    let mut output = [0i32; 1];
    config
        .compute(&[true, false, true, true], &[true, true, false, true], &[0i32], &mut output)
        .unwrap();
    assert_eq!(output, [2]);
}

// =============================================================================
// Unroll Plan Tests
// =============================================================================

#[test]
fn test_unroll_plan_prunes_padding_taps() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<f32>::new(), Identity).unwrap();
    let plan = config.unroll_plan();
    assert_eq!(plan.replicas, 9);
    assert_eq!(plan.taps, 4 * 4 + 4 * 6 + 9);
    assert_eq!(plan.max_taps_per_replica, 9);
    assert_eq!(plan.reduction, Reduction::Ordered);
}

#[test]
fn test_unroll_plan_valid_multi_filter() {
    let shape = ConvShape::with_padding(5, 5, 2, 3, 3, 3, 1, 1, Padding::Valid).unwrap();
    let config = DepthwiseConv2DConfig::new(shape, Mult, Native::<i32>::new(), Identity).unwrap();
    let plan = config.unroll_plan();
    assert_eq!(plan.replicas, 54);
    assert_eq!(plan.taps, 54 * 9);
    assert_eq!(plan.reduction, Reduction::Tree);
}

#[test]
fn test_unroll_plan_fixed_is_ordered() {
    let format = FixedFormat::new(16, 6).unwrap();
    let config = DepthwiseConv2DConfig::new(same_3x3(), Mult, format, format).unwrap();
    assert_eq!(config.unroll_plan().reduction, Reduction::Ordered);
    assert_eq!(UnrollPlan::PARALLEL.len() + UnrollPlan::REDUCTION.len(), 6);
    assert_eq!(UnrollPlan::REDUCTION, [LoopDim::FilterRow, LoopDim::FilterCol]);
}

// =============================================================================
// Layer Tests
// =============================================================================

#[test]
fn test_frozen_layer_forward() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<f32>::new(), Identity).unwrap();
    let weights = [1.0f32; 9];
    let biases = [1.0f32];
    let layer = FrozenDepthwiseConv2D::new(config, &weights, &biases).unwrap();

    assert_eq!(layer.name(), "DepthwiseConv2D");
    assert_eq!(layer.output_len(), 9);
    let output = layer.forward(&[1.0f32; 9]).unwrap();
    assert_eq!(output, vec![5.0, 7.0, 5.0, 7.0, 10.0, 7.0, 5.0, 7.0, 5.0]);

    let mut buf = [0.0f32; 9];
    layer.forward_into(&[2.0f32; 9], &mut buf).unwrap();
    assert_eq!(buf[4], 19.0);
}

#[test]
fn test_frozen_layer_validates_parameters() {
    let config =
        DepthwiseConv2DConfig::new(same_3x3(), Mult, Native::<f32>::new(), Identity).unwrap();
    let weights = [1.0f32; 8];
    let biases = [0.0f32];
    let err = FrozenDepthwiseConv2D::new(config, &weights, &biases).err();
    assert_eq!(
        err,
        Some(ConvError::LengthMismatch { operand: Operand::Weights, expected: 9, actual: 8 })
    );

    let weights = [1.0f32; 9];
    let biases: [f32; 0] = [];
    let err = FrozenDepthwiseConv2D::new(config, &weights, &biases).err();
    assert_eq!(
        err,
        Some(ConvError::LengthMismatch { operand: Operand::Biases, expected: 1, actual: 0 })
    );
}

#[test]
fn test_frozen_layer_i8() {
    let shape = ConvShape::with_padding(4, 4, 2, 1, 3, 3, 1, 1, Padding::Valid).unwrap();
    let config =
        DepthwiseConv2DConfig::new(shape, Mult, Native::<i32>::new(), Requant::saturate())
            .unwrap();
    let weights = [1i8; 18];
    let biases = [0i32, -50];
    let layer = FrozenDepthwiseConv2D::new(config, &weights, &biases).unwrap();
    let input = [10i8; 32];
    let output = layer.forward(&input).unwrap();
    assert_eq!(output, vec![90, 40, 90, 40, 90, 40, 90, 40]);
}
