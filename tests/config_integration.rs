//! Integration tests for configuration loading
//!
//! Tests that verify config loading from files and environment variables.

use marionette::config::AppConfig;
use serial_test::serial;

#[test]
#[serial]
fn test_env_override() {
    std::env::set_var("MRN_WINDOW__TITLE", "Test From Env");
    let config = AppConfig::load().unwrap();
    assert_eq!(config.window.title, "Test From Env");
    std::env::remove_var("MRN_WINDOW__TITLE");
}

#[test]
#[serial]
fn test_env_override_nested_number() {
    std::env::set_var("MRN_SIMULATION__FRAMES", "7");
    let config = AppConfig::load().unwrap();
    assert_eq!(config.simulation.frames, 7);
    std::env::remove_var("MRN_SIMULATION__FRAMES");
}

#[test]
#[serial]
fn test_default_file_loading() {
    std::env::remove_var("MRN_WINDOW__TITLE");
    std::env::remove_var("MRN_SIMULATION__FRAMES");

    let cwd = std::env::current_dir().unwrap();
    assert!(cwd.join("config/default.toml").exists());

    let config = AppConfig::load().unwrap();
    assert_eq!(config.simulation.max_delta, 0.25);
    assert_eq!(config.debug.log_level, "info");
}
