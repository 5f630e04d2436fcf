use angelos_launcher::{EntryPoint, LOGO, LauncherConfig, PythonEmbedder, launch};
use std::fs;

#[test]
fn zero_system_exit_is_success() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("done_client.py"),
        r#"
import sys


def start():
    sys.exit(0)
"#,
    )
    .unwrap();

    let config = LauncherConfig {
        entry: Some(EntryPoint::parse("done_client:start").unwrap()),
        python_path: vec![dir.path().to_path_buf()],
        log_filter: None,
    };

    let embedder = PythonEmbedder::new().unwrap();
    launch(embedder, &LOGO, &config, vec!["logo".to_string()]).unwrap();
    assert_eq!(unsafe { pyo3::ffi::Py_IsInitialized() }, 0);
}
