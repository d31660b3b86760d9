//! Unit tests for configuration handling
//!
//! Environment-variable tests run serially because they mutate process
//! state.

use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
fn default_configuration_is_valid() {
    let config = BackendConfig::default();
    assert!(!config.disable_decorations);
    assert!(!config.title.is_empty());
    assert_eq!(config.color_depth, ColorDepth::Depth32);
    assert!(config.cursor_size > 0);
}

#[test]
fn configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("waybridge.toml");

    fs::write(
        &file_path,
        r#"
runtime_dir = "/run/user/1000"
disable_decorations = true
title = "demo"
color_depth = "depth16"
cursor_size = 24
"#,
    )?;

    let config = BackendConfig::load(&file_path)?;
    assert_eq!(config.runtime_dir, Some(PathBuf::from("/run/user/1000")));
    assert!(config.disable_decorations);
    assert_eq!(config.title, "demo");
    assert_eq!(config.color_depth, ColorDepth::Depth16);
    assert_eq!(config.cursor_size, 24);
    Ok(())
}

#[test]
fn partial_file_uses_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("waybridge.toml");
    fs::write(&file_path, "title = \"partial\"\n")?;

    let config = BackendConfig::load(&file_path)?;
    assert_eq!(config.title, "partial");
    assert_eq!(config.color_depth, ColorDepth::Depth32);
    assert!(!config.disable_decorations);
    Ok(())
}

#[test]
fn invalid_file_is_an_error() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("broken.toml");
    fs::write(&file_path, "color_depth = 32").unwrap();
    assert!(BackendConfig::load(&file_path).is_err());
}

#[test]
#[serial]
fn env_decoration_flag() {
    env::set_var(ENV_NO_DECORATIONS, "1");
    let config = BackendConfig::from_env();
    assert!(config.disable_decorations);

    // "0" is the documented way to keep decorations on.
    env::set_var(ENV_NO_DECORATIONS, "0");
    let config = BackendConfig::from_env();
    assert!(!config.disable_decorations);

    env::remove_var(ENV_NO_DECORATIONS);
}

#[test]
#[serial]
fn env_title_override() {
    env::set_var(ENV_TITLE, "from-env");
    let config = BackendConfig::from_env();
    assert_eq!(config.title, "from-env");
    env::remove_var(ENV_TITLE);
}

#[test]
#[serial]
fn runtime_dir_resolution() {
    let configured = BackendConfig {
        runtime_dir: Some(PathBuf::from("/tmp/rt")),
        ..Default::default()
    };
    assert_eq!(
        configured.resolve_runtime_dir().unwrap(),
        PathBuf::from("/tmp/rt")
    );

    let previous = env::var_os("XDG_RUNTIME_DIR");
    env::set_var("XDG_RUNTIME_DIR", "/run/user/42");
    let config = BackendConfig::default();
    assert_eq!(
        config.resolve_runtime_dir().unwrap(),
        PathBuf::from("/run/user/42")
    );

    env::remove_var("XDG_RUNTIME_DIR");
    assert!(matches!(
        config.resolve_runtime_dir(),
        Err(BackendError::NoRuntimeDir)
    ));

    match previous {
        Some(v) => env::set_var("XDG_RUNTIME_DIR", v),
        None => env::remove_var("XDG_RUNTIME_DIR"),
    }
}
