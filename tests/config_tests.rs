use dailies_scribe::Config;
use std::io::Write;

#[test]
fn test_load_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scribe.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
[stream]
url = "ws://localhost:18056/ws"
connect_timeout_secs = 5
backoff_base_ms = 500
backoff_max_delay_ms = 10000
max_reconnect_attempts = 3

[bot]
base_url = "http://localhost:18056"
api_key = "secret"
bot_name = "Scribe"

[display]
show_speakers = false
max_chunk_chars = 256
"#
    )
    .unwrap();

    let cfg = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.stream.url, "ws://localhost:18056/ws");
    assert_eq!(cfg.stream.connect_timeout_secs, 5);
    assert_eq!(cfg.stream.max_reconnect_attempts, 3);
    assert_eq!(cfg.bot.api_key.as_deref(), Some("secret"));
    assert!(!cfg.display.show_speakers);
    assert_eq!(cfg.display.max_chunk_chars, 256);
}

#[test]
fn test_defaults_fill_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scribe.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
[stream]
url = "ws://example/ws"

[bot]
base_url = "http://example"
"#
    )
    .unwrap();

    let cfg = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.stream.connect_timeout_secs, 10);
    assert_eq!(cfg.stream.backoff_base_ms, 800);
    assert_eq!(cfg.stream.max_reconnect_attempts, 6);
    assert!(cfg.display.show_speakers);
    assert_eq!(cfg.display.max_chunk_chars, 512);
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(Config::load("/definitely/not/here/scribe").is_err());
}
