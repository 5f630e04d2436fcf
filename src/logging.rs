use tracing_subscriber::EnvFilter;

/// Filter used when the environment does not set one
pub const DEFAULT_FILTER: &str = "warn";

/// A directive that could not be parsed, kept for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFilter {
    pub directive: String,
    pub reason: String,
}

/// Parse the configured directive, falling back to [`DEFAULT_FILTER`]
fn build_filter(filter: Option<&str>) -> (EnvFilter, Option<RejectedFilter>) {
    let Some(directive) = filter else {
        return (EnvFilter::new(DEFAULT_FILTER), None);
    };

    match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, None),
        Err(e) => (
            EnvFilter::new(DEFAULT_FILTER),
            Some(RejectedFilter {
                directive: directive.to_string(),
                reason: e.to_string(),
            }),
        ),
    }
}

/// Install the stderr subscriber; a no-op if one is already installed
///
/// An unparseable directive is reported once the subscriber is up and
/// returned to the caller.
pub fn init(filter: Option<&str>) -> Option<RejectedFilter> {
    let (filter, rejected) = build_filter(filter);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Some(rejected) = &rejected {
        tracing::warn!(
            directive = %rejected.directive,
            error = %rejected.reason,
            "invalid log filter, using {}",
            DEFAULT_FILTER
        );
    }
    rejected
}
