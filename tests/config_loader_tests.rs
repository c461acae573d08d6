use metricly::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const ENV_KEYS: [&str; 10] = [
    "METRICLY_PROFILE",
    "METRICLY_API_BIND_ADDR",
    "METRICLY_LOG_LEVEL",
    "METRICLY_JWT_SECRET",
    "METRICLY_STRIPE_PRICE_STARTER",
    "METRICLY_SCHEDULER_ENABLED",
    "METRICLY_SCHEDULER_TICK_INTERVAL_SECONDS",
    "METRICLY_OAUTH_META_ADS_CLIENT_ID",
    "METRICLY_OAUTH_META_ADS_CLIENT_SECRET",
    "METRICLY_FRONTEND_URL",
];

const JWT_SECRET: &str = "0123456789abcdef0123456789abcdef";

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
    for key in ENV_KEYS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_from_empty_directory() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let cfg = loader(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.scheduler.enabled);
    assert!(cfg.oauth_clients.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "METRICLY_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "METRICLY_API_BIND_ADDR=192.168.0.10:5000\nMETRICLY_LOG_LEVEL=debug\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "METRICLY_API_BIND_ADDR=10.0.0.5:6000\n",
    );
    // Profile chosen in .env.local before profile files load
    write_env_file(
        &temp_dir,
        ".env.local",
        "METRICLY_PROFILE=test\nMETRICLY_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let cfg = loader(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "METRICLY_API_BIND_ADDR=127.0.0.1:3000\nMETRICLY_SCHEDULER_ENABLED=true\n",
    );

    unsafe {
        env::set_var("METRICLY_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("METRICLY_SCHEDULER_ENABLED", "off");
    }

    let cfg = loader(&temp_dir).load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert!(!cfg.scheduler.enabled);

    clear_env();
}

#[test]
fn oauth_clients_and_prices_are_collected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "METRICLY_OAUTH_META_ADS_CLIENT_ID=meta-id\nMETRICLY_OAUTH_GOOGLE_ADS_CLIENT_ID=google-id\nMETRICLY_STRIPE_PRICE_STARTER=price_s\n",
    );
    unsafe {
        env::set_var("METRICLY_OAUTH_META_ADS_CLIENT_SECRET", "meta-secret");
    }

    let cfg = loader(&temp_dir).load().expect("config loads");
    assert_eq!(cfg.stripe.price_for_plan("starter"), Some("price_s"));

    let meta = cfg.oauth_client("meta_ads").expect("meta client is complete");
    assert_eq!(meta.client_id.as_deref(), Some("meta-id"));
    // Only half of the Google credentials is present
    assert!(cfg.oauth_clients.contains_key("google_ads"));
    assert!(cfg.oauth_client("google_ads").is_none());

    clear_env();
}

#[test]
fn production_profile_requires_strong_jwt_secret() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("METRICLY_PROFILE", "prod");
    }

    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::MissingJwtSecret));

    unsafe {
        env::set_var("METRICLY_JWT_SECRET", "short");
    }
    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::JwtSecretTooShort { length: 5 }));

    unsafe {
        env::set_var("METRICLY_JWT_SECRET", JWT_SECRET);
    }
    let cfg = loader(&temp_dir).load().expect("prod config loads");
    assert!(!cfg.is_development());

    clear_env();
}

#[test]
fn invalid_values_return_errors() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("METRICLY_API_BIND_ADDR", "not-an-addr");
    }
    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    clear_env();

    unsafe {
        env::set_var("METRICLY_SCHEDULER_TICK_INTERVAL_SECONDS", "5");
    }
    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidSchedulerTickInterval { value: 5 }
    ));
    clear_env();

    unsafe {
        env::set_var("METRICLY_FRONTEND_URL", "not a url");
    }
    let err = loader(&temp_dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFrontendUrl { .. }));

    clear_env();
}
