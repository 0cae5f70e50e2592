use std::io::Write;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.cache.backend, CacheBackend::Redis);
    assert_eq!(settings.cache.key_prefix, "agora:");
    assert_eq!(settings.cache.operation_timeout, Duration::from_millis(250));
    assert_eq!(settings.cache.ttl.events, Duration::from_secs(3600));
    assert_eq!(settings.cache.ttl.analytics, Duration::from_secs(600));
    assert_eq!(settings.realtime.session_buffer.get(), 64);
    assert_eq!(
        settings.database.statement_timeout,
        Duration::from_millis(DEFAULT_DB_STATEMENT_TIMEOUT_MS)
    );
    assert!(settings.auth.tokens.is_empty());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.backend = Some("redis".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_backend: Some("memory".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.backend, CacheBackend::Memory);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn unknown_cache_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("memcached".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid backend");
    assert!(matches!(err, LoadError::Invalid { key: "cache.backend", .. }));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.ttl.analytics_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.ttl.analytics_seconds",
            ..
        }
    ));
}

#[test]
fn redis_backend_requires_redis_url() {
    let mut raw = RawSettings::default();
    raw.cache.redis_url = Some("http://localhost:6379".to_string());

    let err = Settings::from_raw(raw).expect_err("bad url");
    assert!(matches!(err, LoadError::Invalid { key: "cache.redis_url", .. }));
}

#[test]
fn tokens_accept_comma_separated_string() {
    let mut raw = RawSettings::default();
    raw.auth.tokens = Some(RawTokens::Joined(" alpha, ,beta ".to_string()));

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.auth.tokens, ["alpha", "beta"]);
}

#[test]
fn config_file_sections_are_loaded() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        r#"
[server]
port = 8080

[cache]
backend = "disabled"

[cache.ttl]
events_seconds = 30

[auth]
tokens = ["operator-secret"]
"#
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "agora",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "serve",
        "--server-port",
        "9090",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.server.addr.port(), 9090);
    assert_eq!(settings.cache.backend, CacheBackend::Disabled);
    assert_eq!(settings.cache.ttl.events, Duration::from_secs(30));
    assert_eq!(settings.cache.ttl.locations, Duration::from_secs(3600));
    assert_eq!(settings.auth.tokens, ["operator-secret"]);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["agora"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from(["agora", "migrate", "--database-url", "postgres://example"]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
