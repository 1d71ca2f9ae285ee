//! PyO3 bindings exposing the environment with a gymnasium-shaped API.

use numpy::{PyArray1, PyArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::action::{Action, ACTION_SPACE_SIZE};
use crate::config::{EpisodeConfig, ResetOptions};
use crate::encoder::{Observation, BOARD_SHAPE};
use crate::env::{BulletChessEnv, StepInfo};
use crate::error::EnvError;
use crate::types::Color;

fn to_py_err(e: EnvError) -> PyErr {
    match e {
        EnvError::InvalidAction(_) | EnvError::InvalidConfig(_) => {
            PyValueError::new_err(e.to_string())
        }
        EnvError::EpisodeTerminated | EnvError::Rules(_) => PyRuntimeError::new_err(e.to_string()),
    }
}

/// `{"board": float32[8, 8, 12], "state": float32[8]}`
fn observation_dict<'py>(py: Python<'py>, obs: &Observation) -> PyResult<Bound<'py, PyDict>> {
    let board = PyArray1::from_vec(py, obs.board_flat()).reshape(BOARD_SHAPE)?;
    let state = PyArray1::from_slice(py, &obs.state);
    let dict = PyDict::new(py);
    dict.set_item("board", board)?;
    dict.set_item("state", state)?;
    Ok(dict)
}

fn info_dict<'py>(py: Python<'py>, info: &StepInfo) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    for (key, value) in info.to_map() {
        dict.set_item(key, value)?;
    }
    Ok(dict)
}

/// Accepts `int`, `(int, float)` or `[int, float]`.
fn extract_action(action: &Bound<'_, PyAny>) -> PyResult<Action> {
    if let Ok(index) = action.extract::<i64>() {
        return Ok(Action::Move(index));
    }
    if action.len()? != 2 {
        return Err(PyValueError::new_err(
            "action must be an int or a (move_index, elapsed_seconds) pair",
        ));
    }
    let index = action.get_item(0)?.extract::<i64>()?;
    let elapsed = action.get_item(1)?.extract::<f64>()?;
    Ok(Action::Timed(index, elapsed))
}

// ---------------------------------------------------------------------------
// PyBulletChessEnv
// ---------------------------------------------------------------------------

#[pyclass(name = "BulletChessEnv")]
pub struct PyBulletChessEnv {
    inner: BulletChessEnv,
}

#[pymethods]
impl PyBulletChessEnv {
    #[new]
    #[pyo3(signature = (self_play=false, initial_allotment=60.0))]
    fn new(self_play: bool, initial_allotment: f64) -> PyResult<Self> {
        let config = EpisodeConfig::default()
            .with_self_play(self_play)
            .with_initial_allotment(initial_allotment);
        let inner = BulletChessEnv::new(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Returns `(observation, info)`.
    #[pyo3(signature = (seed=None, self_play=None))]
    fn reset<'py>(
        &mut self,
        py: Python<'py>,
        seed: Option<u64>,
        self_play: Option<bool>,
    ) -> PyResult<(Bound<'py, PyDict>, Bound<'py, PyDict>)> {
        let obs = self.inner.reset(ResetOptions { seed, self_play });
        Ok((observation_dict(py, &obs)?, PyDict::new(py)))
    }

    /// Returns `(observation, reward, terminated, truncated, info)`.
    #[allow(clippy::type_complexity)]
    fn step<'py>(
        &mut self,
        py: Python<'py>,
        action: &Bound<'py, PyAny>,
    ) -> PyResult<(Bound<'py, PyDict>, f64, bool, bool, Bound<'py, PyDict>)> {
        let action = extract_action(action)?;
        let out = self.inner.step(action).map_err(to_py_err)?;
        Ok((
            observation_dict(py, &out.observation)?,
            out.reward,
            out.terminated,
            out.truncated,
            info_dict(py, &out.info)?,
        ))
    }

    fn legal_actions(&self) -> Vec<usize> {
        self.inner.legal_actions()
    }

    fn render(&self) -> String {
        self.inner.render()
    }

    #[getter]
    fn self_play(&self) -> bool {
        self.inner.config().self_play
    }

    #[getter]
    fn white_remaining(&self) -> f64 {
        self.inner.clock().remaining(Color::White)
    }

    #[getter]
    fn black_remaining(&self) -> f64 {
        self.inner.clock().remaining(Color::Black)
    }

    #[classattr]
    fn action_space_size() -> usize {
        ACTION_SPACE_SIZE
    }

    fn __repr__(&self) -> String {
        format!(
            "BulletChessEnv(self_play={}, white={:.2}s, black={:.2}s)",
            self.inner.config().self_play,
            self.inner.clock().remaining(Color::White),
            self.inner.clock().remaining(Color::Black),
        )
    }
}

pub fn register_env_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBulletChessEnv>()?;
    m.add("ACTION_SPACE_SIZE", ACTION_SPACE_SIZE)?;
    Ok(())
}
