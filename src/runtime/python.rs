use nix::sys::signal::Signal;
use pyo3::exceptions::{PyKeyboardInterrupt, PySystemExit};
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::PyList;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use super::{Embedder, Lifecycle, RuntimeSettings};
use crate::descriptor::{EmbeddedModule, EntryPoint};
use crate::embedded::{self, LaunchContext};
use crate::error::{AppFailure, LaunchError};
use crate::signals::{self, TerminationWatch};

/// Set once a PythonEmbedder has been handed out; CPython allows one lifecycle per process
static CLAIMED: AtomicBool = AtomicBool::new(false);

fn interpreter_running() -> bool {
    unsafe { ffi::Py_IsInitialized() != 0 }
}

/// CPython embedded through pyo3
pub struct PythonEmbedder {
    /// Thread that initialized the interpreter; finalization must happen there too
    owner: Option<ThreadId>,
    watch: Option<TerminationWatch>,
}

impl PythonEmbedder {
    /// Claim the process-wide interpreter
    pub fn new() -> Result<Self, LaunchError> {
        if CLAIMED.swap(true, Ordering::SeqCst) {
            return Err(LaunchError::Initialization(
                "the embedded interpreter has already been claimed by this process".to_string(),
            ));
        }
        Ok(Self {
            owner: None,
            watch: None,
        })
    }

    fn stop_watch(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.stop();
        }
    }
}

impl Embedder for PythonEmbedder {
    fn register(&mut self, module: &EmbeddedModule) -> Result<(), LaunchError> {
        // The init table is only read while the interpreter starts
        if interpreter_running() {
            return Err(LaunchError::RegistrationClosed(module.name.to_string()));
        }
        (module.append)()
    }

    fn initialize(&mut self, settings: &RuntimeSettings) -> Result<(), LaunchError> {
        if interpreter_running() {
            return Err(LaunchError::InvalidState(Lifecycle::Running));
        }

        Python::initialize();
        if !interpreter_running() {
            return Err(LaunchError::Initialization(
                "CPython did not report itself initialized".to_string(),
            ));
        }
        self.owner = Some(thread::current().id());

        if !embedded::set_launch_context(LaunchContext {
            app_name: settings.app_name,
            argv: settings.argv.clone(),
        }) {
            tracing::warn!("launch context was already set; keeping the first one");
        }

        let configured = Python::attach(|py| {
            tracing::debug!(version = py.version(), "embedded interpreter is up");
            configure(py, settings).map_err(|e| e.to_string())
        });
        if let Err(message) = configured {
            if let Err(e) = self.finalize() {
                tracing::warn!(error = %e, "teardown after failed configuration");
            }
            return Err(LaunchError::Initialization(message));
        }

        // Interrupt the start hook on termination so it unwinds and we get to finalize
        match TerminationWatch::spawn(|_| unsafe { ffi::PyErr_SetInterrupt() }) {
            Ok(watch) => self.watch = Some(watch),
            Err(e) => tracing::warn!(error = %e, "termination signals will not be forwarded"),
        }

        Ok(())
    }

    fn start(&mut self, entry: &EntryPoint) -> Result<(), LaunchError> {
        Python::attach(|py| match call_entry(py, entry) {
            Ok(()) => Ok(()),
            Err(err) => match classify(py, err) {
                None => Ok(()),
                Some(failure) => Err(LaunchError::Application(failure)),
            },
        })
    }

    fn finalize(&mut self) -> Result<(), LaunchError> {
        self.stop_watch();

        if self.owner != Some(thread::current().id()) {
            tracing::error!("interpreter must be finalized on the thread that initialized it");
            return Err(LaunchError::Finalization);
        }

        // Python::initialize released the GIL; take it back for good
        let status = unsafe {
            ffi::PyGILState_Ensure();
            ffi::Py_FinalizeEx()
        };
        if status < 0 {
            return Err(LaunchError::Finalization);
        }
        Ok(())
    }
}

/// Apply launcher settings to a freshly initialized interpreter
fn configure(py: Python<'_>, settings: &RuntimeSettings) -> PyResult<()> {
    let sys = py.import("sys")?;
    sys.setattr("argv", PyList::new(py, &settings.argv)?)?;

    let path = sys.getattr("path")?;
    for (index, entry) in settings.python_path.iter().enumerate() {
        path.call_method1("insert", (index, entry.to_string_lossy().into_owned()))?;
    }

    // The interpreter comes up without signal handlers; restore KeyboardInterrupt
    let signal = py.import("signal")?;
    signal.call_method1(
        "signal",
        (
            signal.getattr("SIGINT")?,
            signal.getattr("default_int_handler")?,
        ),
    )?;

    Ok(())
}

/// Import the entry module, resolve the attribute path and call it
fn call_entry(py: Python<'_>, entry: &EntryPoint) -> PyResult<()> {
    let mut target = py.import(entry.module())?.into_any();
    for attr in entry.attr_path() {
        target = target.getattr(attr)?;
    }
    target.call0()?;
    Ok(())
}

/// Turn an exception escaping the start hook into a launch outcome
/// Returns None when the exception still means success (`sys.exit(0)`)
fn classify(py: Python<'_>, err: PyErr) -> Option<AppFailure> {
    if err.is_instance_of::<PySystemExit>(py) {
        return system_exit_status(py, &err).map(AppFailure::Exit);
    }

    if err.is_instance_of::<PyKeyboardInterrupt>(py) {
        let signo = signals::last_termination_signal().unwrap_or(Signal::SIGINT as i32);
        return Some(AppFailure::Interrupted(signo));
    }

    let message = err.to_string();
    err.print(py);
    Some(AppFailure::Raised(message))
}

/// Exit status carried by SystemExit, following the interpreter's own rules
fn system_exit_status(py: Python<'_>, err: &PyErr) -> Option<i32> {
    let code = match err.value(py).getattr("code") {
        Ok(code) => code,
        Err(_) => return Some(1),
    };
    if code.is_none() {
        return None;
    }

    match code.extract::<i32>() {
        Ok(0) => None,
        Ok(status) => Some(status),
        Err(_) => {
            // Non-integer codes are printed and count as failure
            match code.str() {
                Ok(text) => eprintln!("{}", text),
                Err(_) => eprintln!("SystemExit"),
            }
            Some(1)
        }
    }
}
