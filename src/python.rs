//! Python bindings (feature `python`)

use crate::core::{compose, normalize, BrowseCompositor, BrowseProfile, CalibrationRange};
use numpy::{IntoPyArray, PyArray2, PyArray3, PyReadonlyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: crate::types::BrowseError) -> PyErr {
    match err {
        crate::types::BrowseError::ShapeMismatch { .. } | crate::types::BrowseError::Config(_) => {
            PyValueError::new_err(err.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Normalize a 2D array to bytes using fixed bounds
#[pyfunction]
fn normalize_image_array<'py>(
    py: Python<'py>,
    array: PyReadonlyArray2<'py, f64>,
    vmin: f64,
    vmax: f64,
) -> &'py PyArray2<u8> {
    normalize(&array.as_array(), vmin, vmax).into_pyarray(py)
}

/// Compose a browse array with a named profile or explicit ranges
#[pyfunction]
#[pyo3(signature = (co_pol, cross_pol, profile = "opera-amplitude", co_pol_range = None, cross_pol_range = None))]
fn create_browse_array<'py>(
    py: Python<'py>,
    co_pol: PyReadonlyArray2<'py, f64>,
    cross_pol: PyReadonlyArray2<'py, f64>,
    profile: &str,
    co_pol_range: Option<(f64, f64)>,
    cross_pol_range: Option<(f64, f64)>,
) -> PyResult<&'py PyArray3<u8>> {
    let browse = match (co_pol_range, cross_pol_range) {
        (Some((co_min, co_max)), Some((cross_min, cross_max))) => compose(
            &co_pol.as_array(),
            &cross_pol.as_array(),
            &CalibrationRange::new(co_min, co_max).map_err(to_py_err)?,
            &CalibrationRange::new(cross_min, cross_max).map_err(to_py_err)?,
        ),
        (None, None) => {
            let profile = BrowseProfile::by_name(profile).map_err(to_py_err)?;
            BrowseCompositor::new(profile).composite(&co_pol.as_array(), &cross_pol.as_array())
        }
        _ => {
            return Err(PyValueError::new_err(
                "co_pol_range and cross_pol_range must be given together",
            ))
        }
    }
    .map_err(to_py_err)?;

    Ok(browse.into_pyarray(py))
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize_image_array, m)?)?;
    m.add_function(wrap_pyfunction!(create_browse_array, m)?)?;
    Ok(())
}
