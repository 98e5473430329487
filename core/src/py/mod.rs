// Python bindings: JSON strings in, JSON strings out.
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

#[pyfunction]
#[pyo3(signature = (kind, samples_json, params_json = None))]
fn refine_json(kind: &str, samples_json: &str, params_json: Option<&str>) -> PyResult<String> {
    crate::refine_json(kind, samples_json, params_json).map_err(PyValueError::new_err)
}

#[pyfunction]
#[pyo3(signature = (track_json, profile_json = None))]
fn wind_estimate_json(track_json: &str, profile_json: Option<&str>) -> PyResult<String> {
    crate::wind_estimate_json(track_json, profile_json).map_err(PyValueError::new_err)
}

#[pyfunction]
#[pyo3(signature = (raw_text, config_json = None))]
fn analyze_raw_json(py: Python<'_>, raw_text: &str, config_json: Option<&str>) -> PyResult<String> {
    py.allow_threads(|| crate::analyze_raw_json(raw_text, config_json))
        .map_err(PyValueError::new_err)
}

#[pymodule]
fn cansat_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(refine_json, m)?)?;
    m.add_function(wrap_pyfunction!(wind_estimate_json, m)?)?;
    m.add_function(wrap_pyfunction!(analyze_raw_json, m)?)?;
    Ok(())
}
