use super::*;
use crate::schema::LogLevel;
use peercall_common::ConfigError;

fn write(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn missing_file_is_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        r#"
[identity]
name = "alice"

[relay]
url = "wss://relay.example.com/ws"
"#,
    );

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.identity.name, "alice");
    assert_eq!(config.relay.url, "wss://relay.example.com/ws");
    assert_eq!(config.relay.connect_timeout, 15);
    assert_eq!(config.server.port, 3000);
}

#[test]
fn garbage_is_a_parse_error() {
    assert!(matches!(
        parse("this is not valid toml {{{"),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn parse_reads_log_level() {
    let config = parse("[logging]\nlevel = \"debug\"\n").unwrap();
    assert_eq!(config.logging.level, LogLevel::Debug);
}

#[test]
fn out_of_range_values_still_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "[call]\nanswer_timeout = 9000\n");

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.call.answer_timeout, 9000);
}

#[test]
fn starter_file_loads_as_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peercall").join("config.toml");

    create_default_config(&path).unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.relay.url, "ws://127.0.0.1:3000");
    assert_eq!(config.call.answer_timeout, 30);
}

#[test]
fn starter_file_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "[identity]\nname = \"bob\"\n");

    create_default_config(&path).unwrap();
    assert_eq!(load_from_path(&path).unwrap().identity.name, "bob");
}

#[test]
fn starter_template_passes_validation() {
    let config = parse(&super::template::default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_path_ends_in_app_dir() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("peercall/config.toml"));
    }
}
