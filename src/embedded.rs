use anyhow::{Result, anyhow};
use pyo3::ffi;
use pyo3::prelude::*;
use std::ffi::CStr;
use std::sync::OnceLock;

use crate::error::LaunchError;

/// What the launcher knows about the running application
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub app_name: &'static str,
    pub argv: Vec<String>,
}

/// Set once, when the interpreter comes up
static LAUNCH_CONTEXT: OnceLock<LaunchContext> = OnceLock::new();

/// Store the launch context; returns false if one was already stored
pub(crate) fn set_launch_context(context: LaunchContext) -> bool {
    LAUNCH_CONTEXT.set(context).is_ok()
}

fn launch_context() -> Result<&'static LaunchContext> {
    LAUNCH_CONTEXT
        .get()
        .ok_or_else(|| anyhow!("launcher context is not available before the interpreter starts"))
}

/// Name of the application this launcher was built for
#[pyfunction]
pub fn app_name() -> Result<&'static str> {
    Ok(launch_context()?.app_name)
}

/// Process arguments as the launcher received them
#[pyfunction]
pub fn argv() -> Result<Vec<String>> {
    Ok(launch_context()?.argv.clone())
}

/// Version of the native launcher
#[pyfunction]
pub fn launcher_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Native module of the Angelos server launcher
#[pymodule]
pub mod angelos {
    #[pymodule_export]
    use super::app_name;
    #[pymodule_export]
    use super::argv;
    #[pymodule_export]
    use super::launcher_version;
}

/// Native module of the Logo client launcher
#[pymodule]
pub mod logo {
    #[pymodule_export]
    use super::app_name;
    #[pymodule_export]
    use super::argv;
    #[pymodule_export]
    use super::launcher_version;
}

/// Init-table entry point generated by `#[pymodule]`
type ModuleInit = unsafe extern "C" fn() -> *mut ffi::PyObject;

/// Add a module to the init table, surfacing the status `append_to_inittab!` discards
fn append_to_inittab(name: &'static CStr, init: ModuleInit) -> Result<(), LaunchError> {
    let status = unsafe { ffi::PyImport_AppendInittab(name.as_ptr(), Some(init)) };
    if status < 0 {
        return Err(LaunchError::Registration(name.to_string_lossy().into_owned()));
    }
    Ok(())
}

pub(crate) fn append_angelos() -> Result<(), LaunchError> {
    append_to_inittab(angelos::__PYO3_NAME, angelos::__pyo3_init)
}

pub(crate) fn append_logo() -> Result<(), LaunchError> {
    append_to_inittab(logo::__PYO3_NAME, logo::__pyo3_init)
}
