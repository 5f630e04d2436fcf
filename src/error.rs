use thiserror::Error;

use crate::runtime::Lifecycle;
use crate::signals::signal_name;

/// Exit status for a module that could not be registered
pub const EXIT_REGISTRATION: u8 = 70;
/// Exit status when the interpreter could not be brought up
pub const EXIT_INITIALIZATION: u8 = 71;
/// Exit status for an unusable launcher configuration
pub const EXIT_CONFIG: u8 = 78;
/// Exit status when interpreter teardown reports an error, as CPython itself uses
pub const EXIT_FINALIZATION: u8 = 120;

/// How an application's start hook failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppFailure {
    /// The application asked to exit with a non-zero status
    #[error("exited with status {0}")]
    Exit(i32),
    /// The application was interrupted by a signal
    #[error("interrupted by {}", display_signal(.0))]
    Interrupted(i32),
    /// The application raised an exception that nothing handled
    #[error("raised {0}")]
    Raised(String),
}

fn display_signal(signo: &i32) -> String {
    signal_name(*signo)
}

/// Errors that can end a launch
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to register embedded module `{0}`")]
    Registration(String),

    #[error("embedded module `{0}` is already registered")]
    DuplicateModule(String),

    #[error("cannot register embedded module `{0}` after the interpreter has started")]
    RegistrationClosed(String),

    #[error("interpreter runtime is {0}")]
    InvalidState(Lifecycle),

    #[error("interpreter failed to initialize: {0}")]
    Initialization(String),

    #[error("application {0}")]
    Application(AppFailure),

    #[error("interpreter finalization reported an error")]
    Finalization,
}

impl LaunchError {
    /// Get the process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Config(_) => EXIT_CONFIG,
            LaunchError::Registration(_)
            | LaunchError::DuplicateModule(_)
            | LaunchError::RegistrationClosed(_) => EXIT_REGISTRATION,
            LaunchError::InvalidState(_) | LaunchError::Initialization(_) => EXIT_INITIALIZATION,
            LaunchError::Application(AppFailure::Exit(code)) => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            LaunchError::Application(AppFailure::Interrupted(signo)) => {
                128u8.saturating_add(u8::try_from(*signo).unwrap_or(0))
            }
            LaunchError::Application(AppFailure::Raised(_)) => 1,
            LaunchError::Finalization => EXIT_FINALIZATION,
        }
    }

    /// Whether the interpreter was never brought up when this error happened
    pub fn is_pre_initialization(&self) -> bool {
        matches!(
            self,
            LaunchError::Config(_)
                | LaunchError::Registration(_)
                | LaunchError::DuplicateModule(_)
                | LaunchError::RegistrationClosed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    #[test]
    fn registration_and_initialization_have_distinct_statuses() {
        let registration = LaunchError::DuplicateModule("angelos".to_string());
        let initialization = LaunchError::Initialization("no runtime".to_string());
        assert_eq!(registration.exit_code(), EXIT_REGISTRATION);
        assert_eq!(initialization.exit_code(), EXIT_INITIALIZATION);
        assert_ne!(registration.exit_code(), initialization.exit_code());
    }

    #[test]
    fn failed_registration_aborts_before_initialization() {
        let err = LaunchError::Registration("angelos".to_string());
        assert_eq!(err.exit_code(), EXIT_REGISTRATION);
        assert!(err.is_pre_initialization());
    }

    #[test]
    fn unknown_signal_is_named_by_number() {
        let failure = AppFailure::Interrupted(4096);
        assert_eq!(failure.to_string(), "interrupted by signal 4096");
    }

    #[test]
    fn application_exit_status_is_preserved() {
        let err = LaunchError::Application(AppFailure::Exit(3));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn out_of_range_exit_status_is_clamped_to_failure() {
        assert_eq!(LaunchError::Application(AppFailure::Exit(-2)).exit_code(), 1);
        assert_eq!(LaunchError::Application(AppFailure::Exit(256)).exit_code(), 1);
        assert_eq!(LaunchError::Application(AppFailure::Exit(0)).exit_code(), 1);
    }

    #[test]
    fn interrupted_application_reports_shell_style_status() {
        let sigterm = Signal::SIGTERM as i32;
        let err = LaunchError::Application(AppFailure::Interrupted(sigterm));
        assert_eq!(err.exit_code(), 128 + sigterm as u8);
        assert_eq!(err.to_string(), "application interrupted by SIGTERM");
    }

    #[test]
    fn raised_exception_is_a_plain_failure() {
        let err = LaunchError::Application(AppFailure::Raised("RuntimeError: boom".to_string()));
        assert_eq!(err.exit_code(), 1);
        assert!(!err.is_pre_initialization());
    }
}
