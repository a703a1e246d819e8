use crate::types::{BrowseError, BrowseResult};
use ndarray::{Array, ArrayBase, Data, Dimension};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Physical bounds mapped onto the full 8-bit range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub vmin: f64,
    pub vmax: f64,
}

impl CalibrationRange {
    /// Create a calibration range, rejecting empty or inverted bounds
    pub fn new(vmin: f64, vmax: f64) -> BrowseResult<Self> {
        if !vmin.is_finite() || !vmax.is_finite() {
            return Err(BrowseError::Config(format!(
                "Calibration bounds must be finite, got [{}, {}]",
                vmin, vmax
            )));
        }
        if vmax <= vmin {
            return Err(BrowseError::Config(format!(
                "Calibration range requires vmax > vmin, got [{}, {}]",
                vmin, vmax
            )));
        }
        Ok(Self { vmin, vmax })
    }

    /// Create a range without validation.
    ///
    /// A degenerate range (`vmax == vmin`) is accepted; see [`normalize`] for
    /// what it produces.
    pub const fn new_unchecked(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    pub fn width(&self) -> f64 {
        self.vmax - self.vmin
    }

    pub fn is_degenerate(&self) -> bool {
        self.vmax == self.vmin
    }
}

/// Normalize a backscatter array to bytes using fixed bounds.
///
/// Each sample goes through the same fixed sequence:
/// 1. `scaled = (x - vmin) / (vmax - vmin)`
/// 2. NaN source samples are forced to `0`
/// 3. `scaled` is clipped to `[0, 1]`
/// 4. `round(scaled * 255)` with ties to even, cast to `u8`
///
/// Arithmetic is done in `f64` whatever the input precision, so the output
/// is bit-reproducible for identical inputs.
///
/// With `vmax == vmin` the caller has supplied a degenerate range: samples
/// above `vmin` scale to `+inf` and map to 255, samples below scale to
/// `-inf` and map to 0, and samples equal to `vmin` scale to NaN and map
/// to 0. NaN sources still map to 0.
pub fn normalize<A, S, D>(array: &ArrayBase<S, D>, vmin: f64, vmax: f64) -> Array<u8, D>
where
    A: Float,
    S: Data<Elem = A>,
    D: Dimension,
{
    let width = vmax - vmin;
    array.mapv(|value| {
        let x = value.to_f64().unwrap_or(f64::NAN);
        let scaled = (x - vmin) / width;
        let scaled = if x.is_nan() { 0.0 } else { scaled };
        to_byte(scaled)
    })
}

/// Normalize with a [`CalibrationRange`]
pub fn normalize_with_range<A, S, D>(array: &ArrayBase<S, D>, range: &CalibrationRange) -> Array<u8, D>
where
    A: Float,
    S: Data<Elem = A>,
    D: Dimension,
{
    normalize(array, range.vmin, range.vmax)
}

/// Clip a unit-scaled value and convert it to a byte.
///
/// NaN can only reach here from a degenerate range (0/0) and maps to 0.
fn to_byte(scaled: f64) -> u8 {
    if scaled.is_nan() {
        return 0;
    }
    let clipped = scaled.clamp(0.0, 1.0);
    (clipped * 255.0).round_ties_even() as u8
}
