use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::descriptor::{AppDescriptor, EntryPoint};
use crate::error::LaunchError;

/// Launcher settings read from the environment
///
/// Every variable is prefixed with the upper-cased module name, so the
/// Angelos launcher reads `ANGELOS_ENTRY`, `ANGELOS_PATH` and `ANGELOS_LOG`.
#[derive(Debug, Clone, Default)]
pub struct LauncherConfig {
    /// Start hook overriding the descriptor's
    pub entry: Option<EntryPoint>,
    /// Directories prepended to `sys.path`, in order
    pub python_path: Vec<PathBuf>,
    /// `tracing` filter directive
    pub log_filter: Option<String>,
}

impl LauncherConfig {
    /// Read the configuration from the parent process environment
    pub fn from_parent(app: &AppDescriptor) -> Result<Self, LaunchError> {
        Self::from_vars_os(app, std::env::vars_os())
    }

    /// Read the configuration from raw environment entries
    ///
    /// Entries that are not valid UTF-8 are skipped, unless they are one of
    /// this application's own variables.
    pub fn from_vars_os<I>(app: &AppDescriptor, vars: I) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let own_prefix = format!("{}_", app.env_prefix());
        let mut decoded = Vec::new();

        for (key, value) in vars {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => decoded.push((key, value)),
                (Ok(key), Err(_)) if key.starts_with(&own_prefix) => {
                    return Err(LaunchError::Config(format!("{} is not valid UTF-8", key)));
                }
                _ => {}
            }
        }

        Self::from_vars(app, decoded)
    }

    /// Read the configuration from an explicit set of variables
    pub fn from_vars<I>(app: &AppDescriptor, vars: I) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        let prefix = app.env_prefix();
        let lookup = |suffix: &str| vars.get(&format!("{}_{}", prefix, suffix));

        let entry = match lookup("ENTRY") {
            Some(spec) => Some(
                EntryPoint::parse(spec)
                    .map_err(|e| LaunchError::Config(format!("{}_ENTRY: {}", prefix, e)))?,
            ),
            None => None,
        };

        let python_path = lookup("PATH")
            .map(|value| parse_search_path(value))
            .unwrap_or_default();

        let log_filter = lookup("LOG").or_else(|| vars.get("RUST_LOG")).cloned();

        Ok(Self {
            entry,
            python_path,
            log_filter,
        })
    }

    /// The start hook to call for this application
    pub fn entry<'a>(&'a self, app: &'a AppDescriptor) -> &'a EntryPoint {
        self.entry.as_ref().unwrap_or(&app.entry)
    }
}

/// Split a `:`-separated search path, skipping empty entries
fn parse_search_path(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(expand_home)
        .collect()
}

/// Expand `~` and `~/...`; `~user` is kept literally
fn expand_home(entry: &str) -> PathBuf {
    let home = match home::home_dir() {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => return PathBuf::from(entry),
    };

    if entry == "~" {
        home
    } else if let Some(rest) = entry.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(entry)
    }
}
