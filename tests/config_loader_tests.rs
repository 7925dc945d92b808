use erp_bridge::config::{ConfigError, ConfigLoader};
use secrecy::ExposeSecret;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
    time::Duration,
};
use tempfile::TempDir;

const VALID_KEY: &str = "YWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWE=";

const MANAGED_VARS: &[&str] = &[
    "BRIDGE_PROFILE",
    "BRIDGE_API_BIND_ADDR",
    "BRIDGE_LOG_LEVEL",
    "BRIDGE_LOG_FORMAT",
    "BRIDGE_CRYPTO_KEY",
    "BRIDGE_NUVEMSHOP_CLIENT_ID",
    "BRIDGE_NUVEMSHOP_CLIENT_SECRET",
    "BRIDGE_NUVEMSHOP_TOKEN_URL",
    "BRIDGE_TOKEN_EXCHANGE_TIMEOUT_MS",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for var in MANAGED_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader_for(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_only_key_present() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("BRIDGE_CRYPTO_KEY", VALID_KEY);
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_format, "json");
    assert_eq!(
        cfg.nuvemshop_token_url,
        "https://www.tiendanube.com/apps/authorize/token"
    );
    assert_eq!(cfg.token_exchange_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.crypto_key.as_ref().map(Vec::len), Some(32));
    assert!(cfg.credentials().is_err());
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "BRIDGE_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "BRIDGE_API_BIND_ADDR=192.168.0.10:5000\nBRIDGE_NUVEMSHOP_CLIENT_ID=19190\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "BRIDGE_API_BIND_ADDR=10.0.0.5:6000\nBRIDGE_NUVEMSHOP_CLIENT_SECRET=layered-secret\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        &format!(
            "BRIDGE_PROFILE=test\nBRIDGE_API_BIND_ADDR=127.0.0.1:4000\nBRIDGE_CRYPTO_KEY={VALID_KEY}\n"
        ),
    );

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    let credentials = cfg.credentials().expect("credentials from layered files");
    assert_eq!(credentials.client_id, "19190");
    assert_eq!(credentials.client_secret.expose_secret(), "layered-secret");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "BRIDGE_API_BIND_ADDR=127.0.0.1:3000\nBRIDGE_LOG_LEVEL=warn\n",
    );

    unsafe {
        env::set_var("BRIDGE_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("BRIDGE_CRYPTO_KEY", VALID_KEY);
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.log_level, "warn");

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("BRIDGE_API_BIND_ADDR", "not-an-address");
        env::set_var("BRIDGE_CRYPTO_KEY", VALID_KEY);
    }

    let err = loader_for(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    clear_env();
}

#[test]
fn missing_crypto_key_is_rejected() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let err = loader_for(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::MissingCryptoKey));

    unsafe {
        env::set_var("BRIDGE_CRYPTO_KEY", "%%not-base64%%");
    }
    let err = loader_for(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidCryptoKeyBase64 { .. }));
    clear_env();
}

#[test]
fn production_profile_requires_client_credentials() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("BRIDGE_PROFILE", "prod");
        env::set_var("BRIDGE_CRYPTO_KEY", VALID_KEY);
    }

    let err = loader_for(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::MissingClientId));

    unsafe {
        env::set_var("BRIDGE_NUVEMSHOP_CLIENT_ID", "19190");
    }
    let err = loader_for(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::MissingClientSecret));

    unsafe {
        env::set_var("BRIDGE_NUVEMSHOP_CLIENT_SECRET", "prod-secret");
    }
    let cfg = loader_for(&temp_dir).load().expect("prod config loads");
    assert_eq!(cfg.profile, "prod");
    clear_env();
}

#[test]
fn token_exchange_settings_are_validated() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("BRIDGE_CRYPTO_KEY", VALID_KEY);
        env::set_var("BRIDGE_TOKEN_EXCHANGE_TIMEOUT_MS", "soon");
    }
    let err = loader_for(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTokenExchangeTimeout { .. }));

    unsafe {
        env::set_var("BRIDGE_TOKEN_EXCHANGE_TIMEOUT_MS", "2500");
        env::set_var("BRIDGE_NUVEMSHOP_TOKEN_URL", "ftp://tokens.example.com");
    }
    let err = loader_for(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTokenUrl { .. }));

    unsafe {
        env::set_var("BRIDGE_NUVEMSHOP_TOKEN_URL", "http://127.0.0.1:4010/token");
    }
    let cfg = loader_for(&temp_dir).load().expect("config loads");
    assert_eq!(cfg.token_exchange_timeout(), Duration::from_millis(2500));
    clear_env();
}

#[test]
fn redacted_json_hides_secrets() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("BRIDGE_CRYPTO_KEY", VALID_KEY);
        env::set_var("BRIDGE_NUVEMSHOP_CLIENT_ID", "19190");
        env::set_var("BRIDGE_NUVEMSHOP_CLIENT_SECRET", "very-secret-value");
    }

    let cfg = loader_for(&temp_dir).load().expect("config loads");
    let json = cfg.redacted_json().expect("serializes");
    assert!(!json.contains("very-secret-value"));
    assert!(json.contains("19190"));
    clear_env();
}
