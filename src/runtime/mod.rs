//! Interpreter lifecycle.
//!
//! [`Runtime`] owns an [`Embedder`] and walks it through
//! `Uninitialized -> Running -> Finalized` exactly once. Initializing hands
//! back a [`RuntimeGuard`]; the interpreter is finalized when the guard is
//! consumed or dropped, whichever comes first.

pub mod python;

use std::fmt;
use std::path::PathBuf;

use crate::descriptor::{EmbeddedModule, EntryPoint};
use crate::error::LaunchError;

pub use python::PythonEmbedder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Running,
    Finalized,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Running => "already running",
            Lifecycle::Finalized => "already finalized",
        };
        f.write_str(name)
    }
}

/// Settings applied to the interpreter while it comes up
#[derive(Debug, Clone, Default)]
pub struct RuntimeSettings {
    pub app_name: &'static str,
    pub argv: Vec<String>,
    pub python_path: Vec<PathBuf>,
}

/// A concrete interpreter the launcher can drive
///
/// Implementations may assume the calls arrive in lifecycle order;
/// [`Runtime`] enforces it.
pub trait Embedder {
    /// Add a native module to the interpreter's init table
    fn register(&mut self, module: &EmbeddedModule) -> Result<(), LaunchError>;

    /// Bring the interpreter up. On error nothing is left to tear down.
    fn initialize(&mut self, settings: &RuntimeSettings) -> Result<(), LaunchError>;

    /// Call the start hook once, synchronously
    fn start(&mut self, entry: &EntryPoint) -> Result<(), LaunchError>;

    /// Tear the interpreter down
    fn finalize(&mut self) -> Result<(), LaunchError>;
}

/// Lifecycle owner for one embedded interpreter
pub struct Runtime<E: Embedder> {
    embedder: E,
    state: Lifecycle,
    registered: Vec<&'static str>,
}

impl<E: Embedder> Runtime<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            state: Lifecycle::Uninitialized,
            registered: Vec::new(),
        }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Register an embedded module; only allowed before initialization
    pub fn register(&mut self, module: &EmbeddedModule) -> Result<(), LaunchError> {
        if self.state != Lifecycle::Uninitialized {
            return Err(LaunchError::RegistrationClosed(module.name.to_string()));
        }
        if self.registered.contains(&module.name) {
            return Err(LaunchError::DuplicateModule(module.name.to_string()));
        }

        self.embedder.register(module)?;
        self.registered.push(module.name);
        tracing::debug!(module = module.name, "registered embedded module");
        Ok(())
    }

    /// Bring the interpreter up and return the handle that tears it down
    pub fn initialize(
        &mut self,
        settings: &RuntimeSettings,
    ) -> Result<RuntimeGuard<'_, E>, LaunchError> {
        if self.state != Lifecycle::Uninitialized {
            return Err(LaunchError::InvalidState(self.state));
        }

        self.embedder.initialize(settings)?;
        self.state = Lifecycle::Running;
        tracing::debug!(app = settings.app_name, "interpreter initialized");

        Ok(RuntimeGuard {
            runtime: self,
            started: false,
        })
    }

    fn finalize(&mut self) -> Result<(), LaunchError> {
        if self.state != Lifecycle::Running {
            return Err(LaunchError::InvalidState(self.state));
        }

        // The runtime is unusable afterwards even if teardown reports an error
        self.state = Lifecycle::Finalized;
        let result = self.embedder.finalize();
        tracing::debug!(ok = result.is_ok(), "interpreter finalized");
        result
    }
}

/// Handle to a running interpreter
///
/// Dropping the guard finalizes the interpreter, so every path out of the
/// start hook (including a panic) tears it down.
pub struct RuntimeGuard<'a, E: Embedder> {
    runtime: &'a mut Runtime<E>,
    started: bool,
}

impl<E: Embedder> RuntimeGuard<'_, E> {
    /// Invoke the start hook. A second call is rejected without invoking it.
    pub fn start(&mut self, entry: &EntryPoint) -> Result<(), LaunchError> {
        if self.started {
            return Err(LaunchError::InvalidState(Lifecycle::Running));
        }
        self.started = true;

        tracing::info!(entry = %entry, "starting application");
        self.runtime.embedder.start(entry)
    }

    /// Finalize the interpreter now, reporting any teardown error
    pub fn finalize(mut self) -> Result<(), LaunchError> {
        self.runtime.finalize()
    }
}

impl<E: Embedder> Drop for RuntimeGuard<'_, E> {
    fn drop(&mut self) {
        if self.runtime.state == Lifecycle::Running
            && let Err(e) = self.runtime.finalize()
        {
            tracing::warn!(error = %e, "interpreter finalization failed during unwind");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::AppFailure;
    use std::sync::{Arc, Mutex};

    /// One call observed by [`RecordingEmbedder`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Register(&'static str),
        Initialize(Vec<String>),
        Start(String),
        Finalize,
    }

    /// How the fake start hook behaves
    #[derive(Debug, Clone)]
    pub enum StartBehavior {
        Return,
        Fail(AppFailure),
        Panic,
    }

    /// Embedder that records every call and can inject faults
    #[derive(Clone)]
    pub struct RecordingEmbedder {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub start: StartBehavior,
        pub fail_register: bool,
        pub fail_initialize: bool,
        pub fail_finalize: bool,
    }

    impl RecordingEmbedder {
        pub fn new(start: StartBehavior) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                start,
                fail_register: false,
                fail_initialize: false,
                fail_finalize: false,
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Embedder for RecordingEmbedder {
        fn register(&mut self, module: &EmbeddedModule) -> Result<(), LaunchError> {
            self.record(Call::Register(module.name));
            if self.fail_register {
                return Err(LaunchError::Registration(module.name.to_string()));
            }
            Ok(())
        }

        fn initialize(&mut self, settings: &RuntimeSettings) -> Result<(), LaunchError> {
            self.record(Call::Initialize(settings.argv.clone()));
            if self.fail_initialize {
                return Err(LaunchError::Initialization("injected".to_string()));
            }
            Ok(())
        }

        fn start(&mut self, entry: &EntryPoint) -> Result<(), LaunchError> {
            self.record(Call::Start(entry.to_string()));
            match &self.start {
                StartBehavior::Return => Ok(()),
                StartBehavior::Fail(failure) => Err(LaunchError::Application(failure.clone())),
                StartBehavior::Panic => panic!("start hook panicked"),
            }
        }

        fn finalize(&mut self) -> Result<(), LaunchError> {
            self.record(Call::Finalize);
            if self.fail_finalize {
                return Err(LaunchError::Finalization);
            }
            Ok(())
        }
    }
}
