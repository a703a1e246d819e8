use crate::core::normalize::CalibrationRange;
use crate::types::{BrowseError, BrowseResult};
use ndarray::{Array, ArrayBase, Data, Dimension};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Value domain a band is normalized in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueTransform {
    /// Normalize linear backscatter power directly
    Power,
    /// Convert power to amplitude (square root) before normalizing
    Amplitude,
}

impl ValueTransform {
    pub fn apply<A, S, D>(&self, array: &ArrayBase<S, D>) -> Array<A, D>
    where
        A: Float,
        S: Data<Elem = A>,
        D: Dimension,
    {
        match self {
            ValueTransform::Power => array.to_owned(),
            ValueTransform::Amplitude => array.mapv(|v| v.sqrt()),
        }
    }
}

/// Where the normalization bounds of a band come from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RangeSource {
    /// Fixed physical bounds
    Fixed(CalibrationRange),
    /// Bounds taken from percentiles of the valid samples of the band
    Percentile { low: f64, high: f64 },
}

impl RangeSource {
    /// Resolve the bounds for a band (already in the transformed domain)
    pub fn resolve<A, S, D>(&self, band: &ArrayBase<S, D>) -> BrowseResult<CalibrationRange>
    where
        A: Float,
        S: Data<Elem = A>,
        D: Dimension,
    {
        match *self {
            RangeSource::Fixed(range) => Ok(range),
            RangeSource::Percentile { low, high } => {
                let mut valid: Vec<f64> = band
                    .iter()
                    .filter_map(|v| v.to_f64())
                    .filter(|v| !v.is_nan())
                    .collect();
                if valid.is_empty() {
                    return Err(BrowseError::Processing(
                        "Cannot derive percentile range from an all-NaN band".to_string(),
                    ));
                }
                valid.sort_by(|a, b| a.total_cmp(b));

                let vmin = percentile_sorted(&valid, low);
                let vmax = percentile_sorted(&valid, high);
                log::debug!("Percentile range p{}={} p{}={}", low, vmin, high, vmax);
                // Constant bands give vmin == vmax; let normalization handle it
                Ok(CalibrationRange::new_unchecked(vmin, vmax))
            }
        }
    }
}

/// Percentile of sorted data with linear interpolation between order statistics
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// A named calibration convention for one deployment target.
///
/// Profiles are never chosen implicitly; every entry point takes one by
/// name or value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseProfile {
    pub name: String,
    pub transform: ValueTransform,
    pub co_pol: RangeSource,
    pub cross_pol: RangeSource,
}

/// Amplitude bounds of the OPERA RTC-S1 browse product
pub const OPERA_CO_POL_AMPLITUDE: CalibrationRange = CalibrationRange::new_unchecked(0.14, 0.52);
pub const OPERA_CROSS_POL_AMPLITUDE: CalibrationRange = CalibrationRange::new_unchecked(0.05, 0.259);

/// Power bounds of the earlier linear-power browse convention
pub const LINEAR_CO_POL_POWER: CalibrationRange = CalibrationRange::new_unchecked(0.02, 0.30);
pub const LINEAR_CROSS_POL_POWER: CalibrationRange = CalibrationRange::new_unchecked(0.003, 0.08);

impl BrowseProfile {
    pub const OPERA_AMPLITUDE: &'static str = "opera-amplitude";
    pub const LINEAR_POWER: &'static str = "linear-power";
    pub const PERCENTILE: &'static str = "percentile";

    /// Square root to amplitude, then fixed OPERA amplitude bounds
    pub fn opera_amplitude() -> Self {
        Self {
            name: Self::OPERA_AMPLITUDE.to_string(),
            transform: ValueTransform::Amplitude,
            co_pol: RangeSource::Fixed(OPERA_CO_POL_AMPLITUDE),
            cross_pol: RangeSource::Fixed(OPERA_CROSS_POL_AMPLITUDE),
        }
    }

    /// Linear power with fixed bounds
    pub fn linear_power() -> Self {
        Self {
            name: Self::LINEAR_POWER.to_string(),
            transform: ValueTransform::Power,
            co_pol: RangeSource::Fixed(LINEAR_CO_POL_POWER),
            cross_pol: RangeSource::Fixed(LINEAR_CROSS_POL_POWER),
        }
    }

    /// Linear power with 3rd/97th percentile bounds per band
    pub fn percentile() -> Self {
        let source = RangeSource::Percentile { low: 3.0, high: 97.0 };
        Self {
            name: Self::PERCENTILE.to_string(),
            transform: ValueTransform::Power,
            co_pol: source,
            cross_pol: source,
        }
    }

    pub fn names() -> [&'static str; 3] {
        [Self::OPERA_AMPLITUDE, Self::LINEAR_POWER, Self::PERCENTILE]
    }

    pub fn by_name(name: &str) -> BrowseResult<Self> {
        match name {
            Self::OPERA_AMPLITUDE => Ok(Self::opera_amplitude()),
            Self::LINEAR_POWER => Ok(Self::linear_power()),
            Self::PERCENTILE => Ok(Self::percentile()),
            other => Err(BrowseError::Config(format!(
                "Unknown browse profile '{}', expected one of {:?}",
                other,
                Self::names()
            ))),
        }
    }
}

impl std::fmt::Display for BrowseProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
