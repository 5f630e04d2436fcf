//! The bootstrap launcher.
//!
//! [`launch`] is the whole lifecycle: register the application's native
//! module, bring the interpreter up, hand control to the start hook and
//! tear the interpreter down again. [`run`] wires it to the process.

use std::process::ExitCode;

use crate::config::LauncherConfig;
use crate::descriptor::AppDescriptor;
use crate::error::LaunchError;
use crate::logging;
use crate::runtime::{Embedder, PythonEmbedder, Runtime, RuntimeSettings};

/// Run one application lifecycle on the given embedder
///
/// The interpreter is finalized on every path out of the start hook. If
/// both the hook and the teardown fail, the hook's failure is returned.
pub fn launch<E: Embedder>(
    embedder: E,
    app: &AppDescriptor,
    config: &LauncherConfig,
    argv: Vec<String>,
) -> Result<(), LaunchError> {
    let mut runtime = Runtime::new(embedder);
    runtime.register(&app.module)?;

    let settings = RuntimeSettings {
        app_name: app.name(),
        argv,
        python_path: config.python_path.clone(),
    };
    let mut guard = runtime.initialize(&settings)?;

    let started = guard.start(config.entry(app));
    let finalized = guard.finalize();

    started?;
    finalized
}

/// Process arguments, passed through untouched apart from lossy UTF-8 decoding
fn process_args() -> Vec<String> {
    std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Launch `app` in this process and report the outcome as an exit status
pub fn run(app: &AppDescriptor) -> ExitCode {
    let config = LauncherConfig::from_parent(app);
    logging::init(
        config
            .as_ref()
            .ok()
            .and_then(|config| config.log_filter.as_deref()),
    );

    let outcome = config.and_then(|config| {
        let embedder = PythonEmbedder::new()?;
        launch(embedder, app, &config, process_args())
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_pre_initialization() {
                tracing::error!(app = app.name(), error = %e, "aborting before interpreter start");
            } else {
                tracing::error!(app = app.name(), error = %e, "launch failed");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
