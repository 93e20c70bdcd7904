//! Fixed-point arithmetic in the style of HLS `ap_fixed<W, I, Q, O>`.
//!
//! A [`FixedFormat`] is a storage type: bit width, integer bits, signedness,
//! and the quantization and overflow rules applied whenever a value is stored
//! into it. A [`Fixed`] is an exact value `raw * 2^-frac`. Products and sums of
//! `Fixed` values are computed without loss, exactly as HLS widens
//! intermediate results, and only rounded when re-stored with
//! [`FixedFormat::quantize`].
//!
//! Formats are limited to 32 bits with at most 32 fractional (or negative
//! fractional) bits, so a product of two stored values and the accumulation
//! of such products stay exact inside an `i128`.

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, Mul, Neg, Sub};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConvError, ConvResult};

/// Widest storage format accepted.
pub const MAX_WIDTH: u32 = 32;

/// Largest magnitude of `width - integer`.
pub const MAX_FRAC_BITS: i32 = 32;

/// Guard bits kept below the target LSB when quantizing an `f64`.
const F64_GUARD_BITS: i32 = 32;

/// Quantization mode applied when low-order bits are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rounding {
    /// Toward negative infinity.
    #[default]
    Trn,
    /// Toward zero.
    TrnZero,
    /// To nearest, ties toward positive infinity.
    Rnd,
    /// To nearest, ties toward zero.
    RndZero,
    /// To nearest, ties away from zero.
    RndInf,
    /// To nearest, ties toward negative infinity.
    RndMinInf,
    /// To nearest, ties to even (convergent).
    RndConv,
}

impl Rounding {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Rounding::Trn => "TRN",
            Rounding::TrnZero => "TRN_ZERO",
            Rounding::Rnd => "RND",
            Rounding::RndZero => "RND_ZERO",
            Rounding::RndInf => "RND_INF",
            Rounding::RndMinInf => "RND_MIN_INF",
            Rounding::RndConv => "RND_CONV",
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rounding {
    type Err = ConvError;

    fn from_str(s: &str) -> ConvResult<Self> {
        Ok(match strip_vendor_prefix(s) {
            "TRN" => Rounding::Trn,
            "TRN_ZERO" => Rounding::TrnZero,
            "RND" => Rounding::Rnd,
            "RND_ZERO" => Rounding::RndZero,
            "RND_INF" => Rounding::RndInf,
            "RND_MIN_INF" => Rounding::RndMinInf,
            "RND_CONV" => Rounding::RndConv,
            _ => return Err(ConvError::InvalidPrecision { reason: "unknown rounding mode" }),
        })
    }
}

/// Overflow mode applied when a value falls outside the storable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Overflow {
    /// Two's complement wrap-around (keep the low `width` bits).
    #[default]
    Wrap,
    /// Clamp to the nearest representable bound.
    Sat,
    /// Replace any overflowing value by zero.
    SatZero,
    /// Clamp to a symmetric range `[-max, max]` (signed formats).
    SatSym,
}

impl Overflow {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Overflow::Wrap => "WRAP",
            Overflow::Sat => "SAT",
            Overflow::SatZero => "SAT_ZERO",
            Overflow::SatSym => "SAT_SYM",
        }
    }
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Overflow {
    type Err = ConvError;

    fn from_str(s: &str) -> ConvResult<Self> {
        Ok(match strip_vendor_prefix(s) {
            "WRAP" => Overflow::Wrap,
            "SAT" => Overflow::Sat,
            "SAT_ZERO" => Overflow::SatZero,
            "SAT_SYM" => Overflow::SatSym,
            _ => return Err(ConvError::InvalidPrecision { reason: "unknown overflow mode" }),
        })
    }
}

fn strip_vendor_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("AP_").or_else(|| s.strip_prefix("AC_")).unwrap_or(s)
}

/// A fixed-point storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FormatFields")]
pub struct FixedFormat {
    width: u32,
    integer: i32,
    signed: bool,
    rounding: Rounding,
    overflow: Overflow,
}

#[derive(Deserialize)]
struct FormatFields {
    width: u32,
    integer: i32,
    #[serde(default = "default_signed")]
    signed: bool,
    #[serde(default)]
    rounding: Rounding,
    #[serde(default)]
    overflow: Overflow,
}

fn default_signed() -> bool {
    true
}

impl TryFrom<FormatFields> for FixedFormat {
    type Error = ConvError;

    fn try_from(f: FormatFields) -> ConvResult<Self> {
        FixedFormat::with_modes(f.width, f.integer, f.signed, f.rounding, f.overflow)
    }
}

impl FixedFormat {
    /// Signed format with truncation and wrap-around, like a bare `ap_fixed<W, I>`.
    pub fn new(width: u32, integer: i32) -> ConvResult<Self> {
        Self::with_modes(width, integer, true, Rounding::Trn, Overflow::Wrap)
    }

    /// Unsigned format with truncation and wrap-around, like `ap_ufixed<W, I>`.
    pub fn unsigned(width: u32, integer: i32) -> ConvResult<Self> {
        Self::with_modes(width, integer, false, Rounding::Trn, Overflow::Wrap)
    }

    pub fn with_modes(
        width: u32,
        integer: i32,
        signed: bool,
        rounding: Rounding,
        overflow: Overflow,
    ) -> ConvResult<Self> {
        if width == 0 || width > MAX_WIDTH {
            return Err(ConvError::InvalidPrecision { reason: "width must be in 1..=32" });
        }
        let frac = width as i32 - integer;
        if frac.abs() > MAX_FRAC_BITS {
            return Err(ConvError::InvalidPrecision {
                reason: "fractional bits must be within -32..=32",
            });
        }
        Ok(Self { width, integer, signed, rounding, overflow })
    }

    /// Same format with a different quantization mode.
    pub const fn rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Same format with a different overflow mode.
    pub const fn overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn integer_bits(&self) -> i32 {
        self.integer
    }

    pub const fn is_signed(&self) -> bool {
        self.signed
    }

    pub const fn rounding_mode(&self) -> Rounding {
        self.rounding
    }

    pub const fn overflow_mode(&self) -> Overflow {
        self.overflow
    }

    /// Number of bits below the binary point (may be negative).
    #[inline(always)]
    pub const fn frac_bits(&self) -> i32 {
        self.width as i32 - self.integer
    }

    /// Smallest storable raw value.
    pub const fn min_raw(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.width - 1))
        } else {
            0
        }
    }

    /// Largest storable raw value.
    pub const fn max_raw(&self) -> i128 {
        if self.signed {
            (1i128 << (self.width - 1)) - 1
        } else {
            (1i128 << self.width) - 1
        }
    }

    /// Value of one LSB.
    pub fn epsilon(&self) -> f64 {
        libm::ldexp(1.0, -self.frac_bits())
    }

    /// Store `value` into this format: drop low bits with the rounding mode,
    /// then resolve out-of-range results with the overflow mode.
    pub fn quantize(&self, value: Fixed) -> Fixed {
        let frac = self.frac_bits();
        let shift = value.frac - frac;
        let raw = match shift.cmp(&0) {
            Ordering::Greater => round_shift(value.raw, shift as u32, self.rounding),
            Ordering::Less => shl_saturating(value.raw, shift.unsigned_abs()),
            Ordering::Equal => value.raw,
        };
        Fixed { raw: self.resolve_overflow(raw), frac }
    }

    /// Quantize a real number. Bits beyond 32 guard bits under the target
    /// LSB are floored before the rounding mode is applied; NaN maps to zero.
    pub fn from_f64(&self, value: f64) -> Fixed {
        let frac = self.frac_bits() + F64_GUARD_BITS;
        let scaled = libm::floor(libm::ldexp(value, frac));
        self.quantize(Fixed { raw: scaled as i128, frac })
    }

    /// Interpret `raw` as a stored bit pattern of this format. Out-of-range
    /// patterns are resolved with the overflow mode.
    pub fn from_raw(&self, raw: i64) -> Fixed {
        Fixed { raw: self.resolve_overflow(raw as i128), frac: self.frac_bits() }
    }

    /// Quantize an integer.
    pub fn from_int(&self, value: i64) -> Fixed {
        self.quantize(Fixed { raw: value as i128, frac: 0 })
    }

    fn resolve_overflow(&self, raw: i128) -> i128 {
        let (min, max) = (self.min_raw(), self.max_raw());
        if (min..=max).contains(&raw) {
            return raw;
        }
        match self.overflow {
            Overflow::Wrap => {
                let modulus = 1i128 << self.width;
                let low = raw.rem_euclid(modulus);
                if low > max {
                    low - modulus
                } else {
                    low
                }
            }
            Overflow::Sat => {
                if raw < min {
                    min
                } else {
                    max
                }
            }
            Overflow::SatZero => 0,
            Overflow::SatSym => match (raw < min, self.signed) {
                (true, true) => -max,
                (true, false) => min,
                (false, _) => max,
            },
        }
    }
}

impl fmt::Display for FixedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.signed { "fixed" } else { "ufixed" };
        write!(f, "{kind}<{},{},{},{}>", self.width, self.integer, self.rounding, self.overflow)
    }
}

/// Parses `fixed<W,I[,Q[,O]]>`, `ufixed<...>`, and the `ap_fixed` /
/// `ap_ufixed` spellings with optional `AP_`-prefixed modes.
impl FromStr for FixedFormat {
    type Err = ConvError;

    fn from_str(s: &str) -> ConvResult<Self> {
        let (head, rest) = s
            .trim()
            .split_once('<')
            .ok_or(ConvError::InvalidPrecision { reason: "expected `fixed<W,I>`" })?;
        let body = rest
            .trim_end()
            .strip_suffix('>')
            .ok_or(ConvError::InvalidPrecision { reason: "missing closing `>`" })?;
        let signed = match head.trim() {
            "fixed" | "ap_fixed" => true,
            "ufixed" | "ap_ufixed" => false,
            _ => return Err(ConvError::InvalidPrecision { reason: "unknown fixed-point kind" }),
        };

        let mut parts = body.split(',').map(str::trim);
        let width = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or(ConvError::InvalidPrecision { reason: "bad width" })?;
        let integer = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or(ConvError::InvalidPrecision { reason: "bad integer bits" })?;
        let rounding = parts.next().map_or(Ok(Rounding::Trn), str::parse)?;
        let overflow = parts.next().map_or(Ok(Overflow::Wrap), str::parse)?;
        if parts.next().is_some() {
            return Err(ConvError::InvalidPrecision { reason: "too many parameters" });
        }
        Self::with_modes(width, integer, signed, rounding, overflow)
    }
}

/// An exact fixed-point value `raw * 2^-frac`.
///
/// Arithmetic never rounds. Equality compares numeric values, so `0.5` with
/// one fractional bit equals `0.5` with eight.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed {
    raw: i128,
    frac: i32,
}

impl Fixed {
    pub const ZERO: Fixed = Fixed { raw: 0, frac: 0 };

    pub const fn from_parts(raw: i128, frac: i32) -> Self {
        Self { raw, frac }
    }

    pub const fn raw(&self) -> i128 {
        self.raw
    }

    pub const fn frac_bits(&self) -> i32 {
        self.frac
    }

    pub fn to_f64(&self) -> f64 {
        libm::ldexp(self.raw as f64, -self.frac)
    }

    /// Exact multiplication by `2^exp`.
    pub const fn scale_pow2(self, exp: i32) -> Self {
        Self { raw: self.raw, frac: self.frac - exp }
    }

    fn aligned(self, frac: i32) -> i128 {
        shl_saturating(self.raw, (frac - self.frac) as u32)
    }
}

impl From<i8> for Fixed {
    fn from(value: i8) -> Fixed {
        Fixed { raw: value as i128, frac: 0 }
    }
}

impl PartialEq for Fixed {
    fn eq(&self, other: &Self) -> bool {
        let frac = self.frac.max(other.frac);
        self.aligned(frac) == other.aligned(frac)
    }
}

impl Eq for Fixed {}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Fixed) -> Fixed {
        let frac = self.frac.max(rhs.frac);
        Fixed { raw: self.aligned(frac).saturating_add(rhs.aligned(frac)), frac }
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Fixed) -> Fixed {
        self + (-rhs)
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed { raw: self.raw.saturating_mul(rhs.raw), frac: self.frac + rhs.frac }
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Fixed {
        Fixed { raw: self.raw.saturating_neg(), frac: self.frac }
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// `raw / 2^shift` rounded with `mode`.
fn round_shift(raw: i128, shift: u32, mode: Rounding) -> i128 {
    let shift = shift.min(126);
    let floor = raw >> shift;
    let rem = raw - (floor << shift);
    if rem == 0 {
        return floor;
    }
    let half = 1i128 << (shift - 1);
    let negative = raw < 0;
    let up = match mode {
        Rounding::Trn => false,
        Rounding::TrnZero => negative,
        Rounding::Rnd => rem >= half,
        Rounding::RndZero => rem > half || (rem == half && negative),
        Rounding::RndInf => rem > half || (rem == half && !negative),
        Rounding::RndMinInf => rem > half,
        Rounding::RndConv => rem > half || (rem == half && floor & 1 == 1),
    };
    if up {
        floor + 1
    } else {
        floor
    }
}

/// `raw * 2^shift`, saturating at the `i128` bounds.
fn shl_saturating(raw: i128, shift: u32) -> i128 {
    if raw == 0 {
        return 0;
    }
    let saturated = if raw < 0 { i128::MIN } else { i128::MAX };
    if shift > 126 {
        return saturated;
    }
    raw.checked_mul(1i128 << shift).unwrap_or(saturated)
}
