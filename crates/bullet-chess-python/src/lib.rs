use pyo3::prelude::*;

/// Python extension: the bullet chess environment under `bullet_chess._core.env`.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let env_module = PyModule::new(m.py(), "env")?;
    bullet_chess::bindings::register_env_module(&env_module)?;
    m.add_submodule(&env_module)?;

    Ok(())
}
