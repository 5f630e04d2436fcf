use nix::sys::signal::Signal;
use signal_hook::consts::{SIGHUP, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

/// Last termination signal received while a watch was running (0 = none)
static LAST_TERMINATION: AtomicI32 = AtomicI32::new(0);

/// Signals that ask the application to shut down
pub const TERMINATION_SIGNALS: [i32; 2] = [SIGTERM, SIGHUP];

/// The termination signal that interrupted the application, if any
pub fn last_termination_signal() -> Option<i32> {
    match LAST_TERMINATION.load(Ordering::SeqCst) {
        0 => None,
        signo => Some(signo),
    }
}

/// Set while no watch is running, so termination signals take their default action
static DEFAULT_ACTION: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Install the fallback handlers once per process
///
/// signal-hook never uninstalls the handlers behind [`Signals`], so a closed
/// watch would otherwise swallow every later SIGTERM and SIGHUP.
fn default_action() -> std::io::Result<&'static Arc<AtomicBool>> {
    if let Some(flag) = DEFAULT_ACTION.get() {
        return Ok(flag);
    }
    let flag = Arc::new(AtomicBool::new(false));
    for signo in TERMINATION_SIGNALS {
        signal_hook::flag::register_conditional_default(signo, Arc::clone(&flag))?;
    }
    Ok(DEFAULT_ACTION.get_or_init(|| flag))
}

/// Whether termination signals currently take their default action
pub fn default_action_restored() -> bool {
    DEFAULT_ACTION
        .get()
        .is_some_and(|flag| flag.load(Ordering::SeqCst))
}

/// Human readable name for a signal number
pub fn signal_name(signo: i32) -> String {
    match Signal::try_from(signo) {
        Ok(signal) => signal.as_str().to_string(),
        Err(_) => format!("signal {}", signo),
    }
}

/// Background thread forwarding termination signals to a callback
///
/// The watch is stopped and joined on drop, so once it is gone the
/// callback is guaranteed not to run again. From then on SIGTERM and SIGHUP
/// terminate the process as if no handler had ever been installed. Only one
/// watch may run at a time.
pub struct TerminationWatch {
    handle: Handle,
    default_action: &'static Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TerminationWatch {
    pub fn spawn<F>(on_signal: F) -> std::io::Result<Self>
    where
        F: Fn(i32) + Send + 'static,
    {
        let default_action = default_action()?;
        let mut signals = Signals::new(TERMINATION_SIGNALS)?;
        let handle = signals.handle();

        let thread = std::thread::Builder::new()
            .name("termination-watch".to_string())
            .spawn(move || {
                for signo in signals.forever() {
                    LAST_TERMINATION.store(signo, Ordering::SeqCst);
                    tracing::warn!(signal = %signal_name(signo), "termination requested");
                    on_signal(signo);
                }
            })?;
        default_action.store(false, Ordering::SeqCst);

        Ok(Self {
            handle,
            default_action,
            thread: Some(thread),
        })
    }

    /// Stop listening and wait for the watch thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("termination watch thread panicked");
        }
        self.default_action.store(true, Ordering::SeqCst);
    }
}

impl Drop for TerminationWatch {
    fn drop(&mut self) {
        self.shutdown();
    }
}
