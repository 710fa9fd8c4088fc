//! Integration tests for the `example build` command.
use temoatools::cli::example::handle_example_build_command;
use temoatools::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example build` command.
#[test]
fn test_handle_example_build_command() {
    unsafe { std::env::set_var("TEMOATOOLS_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    for scenario in ["A", "B"] {
        handle_example_build_command(
            "simple",
            scenario,
            Some(tempdir.path().to_path_buf()),
            Some(Settings::default()),
        )
        .unwrap();
        assert!(tempdir.path().join(format!("simple_{scenario}.sqlite")).is_file());
    }
}
