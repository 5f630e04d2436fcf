//! Native launchers for the Angelos and Logo Python applications.
//!
//! Each launcher embeds CPython, registers its own native module before
//! the interpreter starts, calls the application's `start()` hook and
//! finalizes the interpreter whatever the hook does.

pub mod config;
pub mod descriptor;
pub mod embedded;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod runtime;
pub mod signals;

pub use config::LauncherConfig;
pub use descriptor::{ANGELOS, AppDescriptor, EntryPoint, LOGO};
pub use error::{AppFailure, LaunchError};
pub use launcher::{launch, run};
pub use runtime::{Embedder, Lifecycle, PythonEmbedder, Runtime, RuntimeGuard, RuntimeSettings};
