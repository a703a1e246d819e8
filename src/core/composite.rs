use crate::core::calibration::BrowseProfile;
use crate::core::normalize::{normalize_with_range, CalibrationRange};
use crate::types::{BrowseError, BrowseImage, BrowseResult, ByteImage};
use ndarray::{stack, ArrayBase, Axis, Data, Ix2, Zip};
use num_traits::Float;

/// Coverage value for pixels where both bands hold data
pub const COVERAGE_VALID: u8 = 255;
/// Coverage value for pixels missing data in at least one band
pub const COVERAGE_NODATA: u8 = 0;

fn check_shapes<A, S1, S2>(co_pol: &ArrayBase<S1, Ix2>, cross_pol: &ArrayBase<S2, Ix2>) -> BrowseResult<()>
where
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    if co_pol.dim() != cross_pol.dim() {
        return Err(BrowseError::ShapeMismatch {
            co_pol: co_pol.dim(),
            cross_pol: cross_pol.dim(),
        });
    }
    Ok(())
}

/// Coverage mask: 255 where both bands are non-NaN, 0 elsewhere
pub fn coverage_mask<A, S1, S2>(
    co_pol: &ArrayBase<S1, Ix2>,
    cross_pol: &ArrayBase<S2, Ix2>,
) -> BrowseResult<ByteImage>
where
    A: Float,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    check_shapes(co_pol, cross_pol)?;
    Ok(Zip::from(co_pol).and(cross_pol).map_collect(|co, cross| {
        if co.is_nan() || cross.is_nan() {
            COVERAGE_NODATA
        } else {
            COVERAGE_VALID
        }
    }))
}

/// Compose the 4-band browse image from two pixel-aligned bands.
///
/// Channels are `[co-pol, cross-pol, co-pol, coverage]` along the trailing
/// axis. Inputs are normalized as given; any power to amplitude conversion
/// must already have been applied.
pub fn compose<A, S1, S2>(
    co_pol: &ArrayBase<S1, Ix2>,
    cross_pol: &ArrayBase<S2, Ix2>,
    co_pol_range: &CalibrationRange,
    cross_pol_range: &CalibrationRange,
) -> BrowseResult<BrowseImage>
where
    A: Float,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    let coverage = coverage_mask(co_pol, cross_pol)?;
    let co = normalize_with_range(co_pol, co_pol_range);
    let cross = normalize_with_range(cross_pol, cross_pol_range);

    stack(
        Axis(2),
        &[co.view(), cross.view(), co.view(), coverage.view()],
    )
    .map_err(|e| BrowseError::Processing(format!("Failed to stack browse bands: {}", e)))
}

/// Compositor bound to a calibration profile
#[derive(Debug, Clone)]
pub struct BrowseCompositor {
    profile: BrowseProfile,
}

impl BrowseCompositor {
    pub fn new(profile: BrowseProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &BrowseProfile {
        &self.profile
    }

    /// Apply the profile's value transform and bounds, then compose
    pub fn composite<A, S1, S2>(
        &self,
        co_pol: &ArrayBase<S1, Ix2>,
        cross_pol: &ArrayBase<S2, Ix2>,
    ) -> BrowseResult<BrowseImage>
    where
        A: Float,
        S1: Data<Elem = A>,
        S2: Data<Elem = A>,
    {
        check_shapes(co_pol, cross_pol)?;
        log::info!("Compositing browse image with profile '{}'", self.profile);
        log::debug!("Input shape: {:?}", co_pol.dim());

        let co = self.profile.transform.apply(co_pol);
        let cross = self.profile.transform.apply(cross_pol);

        let co_range = self.profile.co_pol.resolve(&co)?;
        let cross_range = self.profile.cross_pol.resolve(&cross)?;
        log::debug!("Co-pol range: {:?}, cross-pol range: {:?}", co_range, cross_range);

        compose(&co, &cross, &co_range, &cross_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calibration::{OPERA_CO_POL_AMPLITUDE, OPERA_CROSS_POL_AMPLITUDE};
    use ndarray::{arr2, s, Array2};

    #[test]
    fn test_opera_amplitude_composite() {
        let (vv_min, vv_max) = (0.14f64, 0.52f64);
        let (vh_min, vh_max) = (0.05f64, 0.259f64);
        let vv_mid = ((vv_min + vv_max - 0.001) / 2.0).powi(2);
        let vh_mid = ((vh_min + vh_max - 0.001) / 2.0).powi(2);

        let vv = arr2(&[[0.0, vv_min.powi(2), vv_mid, vv_max.powi(2), f64::NAN]]);
        let vh = arr2(&[[f64::NAN, 0.0, vh_min.powi(2), vh_mid, vh_max.powi(2)]]);

        let compositor = BrowseCompositor::new(BrowseProfile::opera_amplitude());
        let browse = compositor.composite(&vv, &vh).unwrap();

        assert_eq!(browse.dim(), (1, 5, 4));
        assert_eq!(browse.slice(s![.., .., 0]), arr2(&[[0u8, 0, 127, 255, 0]]));
        assert_eq!(browse.slice(s![.., .., 1]), arr2(&[[0u8, 0, 0, 127, 255]]));
        assert_eq!(browse.slice(s![.., .., 2]), arr2(&[[0u8, 0, 127, 255, 0]]));
        assert_eq!(browse.slice(s![.., .., 3]), arr2(&[[0u8, 255, 255, 255, 0]]));
    }

    #[test]
    fn test_compose_without_transform() {
        let co = arr2(&[[0.0f32, 1.0], [2.0, f32::NAN]]);
        let cross = arr2(&[[2.0f32, f32::NAN], [1.0, 0.0]]);
        let range = CalibrationRange::new(0.0, 2.0).unwrap();

        let browse = compose(&co, &cross, &range, &range).unwrap();
        assert_eq!(browse.dim(), (2, 2, 4));
        assert_eq!(browse.slice(s![.., .., 0]), arr2(&[[0u8, 128], [255, 0]]));
        assert_eq!(browse.slice(s![.., .., 1]), arr2(&[[255u8, 0], [128, 0]]));
        assert_eq!(browse.slice(s![.., .., 3]), arr2(&[[255u8, 0], [255, 0]]));
    }

    #[test]
    fn test_co_pol_channels_identical() {
        let co = Array2::from_shape_fn((16, 9), |(r, c)| (r * 9 + c) as f32 * 0.002);
        let cross = Array2::from_shape_fn((16, 9), |(r, c)| (r + c) as f32 * 0.001);
        let browse = compose(&co, &cross, &OPERA_CO_POL_AMPLITUDE, &OPERA_CROSS_POL_AMPLITUDE).unwrap();
        assert_eq!(browse.slice(s![.., .., 0]), browse.slice(s![.., .., 2]));
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let co = Array2::<f32>::zeros((4, 5));
        let cross = Array2::<f32>::zeros((5, 4));
        let range = CalibrationRange::new(0.0, 1.0).unwrap();

        match compose(&co, &cross, &range, &range) {
            Err(BrowseError::ShapeMismatch { co_pol, cross_pol }) => {
                assert_eq!(co_pol, (4, 5));
                assert_eq!(cross_pol, (5, 4));
            }
            other => panic!("Expected shape mismatch, got {:?}", other),
        }

        let compositor = BrowseCompositor::new(BrowseProfile::percentile());
        assert!(matches!(
            compositor.composite(&co, &cross),
            Err(BrowseError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_coverage_independent_of_values() {
        // Values far outside the range still count as coverage
        let co = arr2(&[[-1.0f64, 1e6, f64::NAN]]);
        let cross = arr2(&[[-1.0f64, 1e6, 0.1]]);
        let mask = coverage_mask(&co, &cross).unwrap();
        assert_eq!(mask, arr2(&[[255u8, 255, 0]]));
    }

    #[test]
    fn test_linear_power_profile() {
        let co = arr2(&[[0.02f64, 0.30]]);
        let cross = arr2(&[[0.003f64, 0.08]]);
        let compositor = BrowseCompositor::new(BrowseProfile::linear_power());
        let browse = compositor.composite(&co, &cross).unwrap();
        assert_eq!(browse.slice(s![0, .., 0]).to_vec(), vec![0u8, 255]);
        assert_eq!(browse.slice(s![0, .., 1]).to_vec(), vec![0u8, 255]);
    }
}
