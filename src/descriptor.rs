//! Application descriptors.
//!
//! A descriptor pairs the native module a launcher registers with the
//! Python callable it hands control to. Each launcher binary is one
//! descriptor; everything else is shared.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::embedded;
use crate::error::LaunchError;

/// Attribute used when an entry point names only a module
pub const DEFAULT_START_ATTR: &str = "start";

/// A native module registered in the interpreter's init table
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedModule {
    pub name: &'static str,
    /// Appends the module to the init table; must run before the interpreter starts
    pub append: fn() -> Result<(), LaunchError>,
}

/// A Python callable addressed as `package.module:attr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    module: Cow<'static, str>,
    attr: Cow<'static, str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryPointError {
    #[error("`{module}` is not a valid module path in entry point `{spec}`")]
    InvalidModule { module: String, spec: String },

    #[error("`{attr}` is not a valid attribute path in entry point `{spec}`")]
    InvalidAttr { attr: String, spec: String },
}

impl EntryPoint {
    pub const fn new(module: &'static str, attr: &'static str) -> Self {
        Self {
            module: Cow::Borrowed(module),
            attr: Cow::Borrowed(attr),
        }
    }

    /// Parse `module:attr`, defaulting the attribute to `start`
    pub fn parse(spec: &str) -> Result<Self, EntryPointError> {
        let spec = spec.trim();
        let (module, attr) = match spec.split_once(':') {
            Some((module, attr)) => (module.trim(), attr.trim()),
            None => (spec, DEFAULT_START_ATTR),
        };

        if !is_dotted_path(module) {
            return Err(EntryPointError::InvalidModule {
                module: module.to_string(),
                spec: spec.to_string(),
            });
        }
        if !is_dotted_path(attr) {
            return Err(EntryPointError::InvalidAttr {
                attr: attr.to_string(),
                spec: spec.to_string(),
            });
        }

        Ok(Self {
            module: Cow::Owned(module.to_string()),
            attr: Cow::Owned(attr.to_string()),
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// Attribute path split into its components
    pub fn attr_path(&self) -> impl Iterator<Item = &str> {
        self.attr.split('.')
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.attr)
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn is_dotted_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_identifier)
}

/// Compile-time pairing of an embedded module and its start hook
#[derive(Debug, Clone)]
pub struct AppDescriptor {
    pub module: EmbeddedModule,
    pub entry: EntryPoint,
}

impl AppDescriptor {
    pub fn name(&self) -> &'static str {
        self.module.name
    }

    /// Prefix for the environment variables that configure this application
    pub fn env_prefix(&self) -> String {
        self.module.name.to_ascii_uppercase()
    }
}

/// The Angelos server launcher
pub static ANGELOS: AppDescriptor = AppDescriptor {
    module: EmbeddedModule {
        name: "angelos",
        append: embedded::append_angelos,
    },
    entry: EntryPoint::new("angelos_entrypoint", DEFAULT_START_ATTR),
};

/// The Logo client launcher
pub static LOGO: AppDescriptor = AppDescriptor {
    module: EmbeddedModule {
        name: "logo",
        append: embedded::append_logo,
    },
    entry: EntryPoint::new("logo_entrypoint", DEFAULT_START_ATTR),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_module_and_attribute() {
        let entry = EntryPoint::parse("angelos.server.main:start").unwrap();
        assert_eq!(entry.module(), "angelos.server.main");
        assert_eq!(entry.attr(), "start");
        assert_eq!(entry.to_string(), "angelos.server.main:start");
    }

    #[test]
    fn bare_module_defaults_to_start() {
        let entry = EntryPoint::parse("  logo_entrypoint ").unwrap();
        assert_eq!(entry, EntryPoint::new("logo_entrypoint", "start"));
    }

    #[test]
    fn dotted_attribute_is_split() {
        let entry = EntryPoint::parse("app.main:Client.start").unwrap();
        assert_eq!(entry.attr_path().collect::<Vec<_>>(), vec!["Client", "start"]);
    }

    #[test]
    fn rejects_malformed_entry_points() {
        for spec in [
            "",
            ":start",
            "module:",
            "a..b:start",
            "1module:start",
            "mod-ule:start",
            "module:st art",
            "a:b:c",
        ] {
            assert!(EntryPoint::parse(spec).is_err(), "accepted {:?}", spec);
        }
    }

    #[test]
    fn errors_name_the_offending_part() {
        assert_eq!(
            EntryPoint::parse("mod-ule:start").unwrap_err().to_string(),
            "`mod-ule` is not a valid module path in entry point `mod-ule:start`"
        );
        assert!(matches!(
            EntryPoint::parse("module:st art"),
            Err(EntryPointError::InvalidAttr { ref attr, .. }) if attr == "st art"
        ));
    }

    #[test]
    fn descriptors_differ_only_by_module_and_entry() {
        assert_eq!(ANGELOS.name(), "angelos");
        assert_eq!(LOGO.name(), "logo");
        assert_eq!(ANGELOS.entry.to_string(), "angelos_entrypoint:start");
        assert_eq!(LOGO.entry.to_string(), "logo_entrypoint:start");
        assert_eq!(LOGO.env_prefix(), "LOGO");
    }
}
