use angelos_launcher::{
    ANGELOS, AppFailure, EntryPoint, LaunchError, LauncherConfig, PythonEmbedder, launch,
};
use std::fs;

#[test]
fn system_exit_message_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("broken_app.py"),
        r#"
import sys


def start():
    sys.exit("fatal: storage directory is missing")
"#,
    )
    .unwrap();

    let config = LauncherConfig {
        entry: Some(EntryPoint::parse("broken_app:start").unwrap()),
        python_path: vec![dir.path().to_path_buf()],
        log_filter: None,
    };

    let embedder = PythonEmbedder::new().unwrap();
    let err = launch(embedder, &ANGELOS, &config, vec!["angelos".to_string()]).unwrap_err();

    assert!(matches!(err, LaunchError::Application(AppFailure::Exit(1))));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(unsafe { pyo3::ffi::Py_IsInitialized() }, 0);
}
