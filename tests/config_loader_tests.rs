use databundle::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const SECRET: &str = "config-loader-tests-secret-0123456789";

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
    for (key, _) in env::vars() {
        if key.starts_with("DATABUNDLE_") {
            unsafe {
                env::remove_var(key);
            }
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
fn loads_defaults_when_only_secret_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("DATABUNDLE_JWT_SECRET", SECRET);
    }

    let cfg = loader_for(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.token_ttl_seconds, 3600);
    assert_eq!(cfg.vendor_commission_bps, 1000);
    assert_eq!(cfg.top_vendors_limit, 5);
    assert!(cfg.admin_email.is_none());
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn missing_jwt_secret_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("secret is required");
    assert!(matches!(err, ConfigError::MissingJwtSecret));
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!("DATABUNDLE_API_BIND_ADDR=127.0.0.1:3000\nDATABUNDLE_JWT_SECRET={SECRET}\n"),
    );
    write_env_file(
        &temp_dir,
        ".env.test",
        "DATABUNDLE_API_BIND_ADDR=192.168.0.10:5000\nDATABUNDLE_VENDOR_COMMISSION_BPS=1500\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "DATABUNDLE_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "DATABUNDLE_PROFILE=test\nDATABUNDLE_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.vendor_commission_bps, 1500);
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
        &format!("DATABUNDLE_API_BIND_ADDR=127.0.0.1:3000\nDATABUNDLE_JWT_SECRET={SECRET}\n"),
    );

    unsafe {
        env::set_var("DATABUNDLE_API_BIND_ADDR", "0.0.0.0:9090");
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("DATABUNDLE_API_BIND_ADDR", "not-an-addr");
        env::set_var("DATABUNDLE_JWT_SECRET", SECRET);
    }

    let err = loader_for(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}

#[test]
fn unparsable_number_names_the_key() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("DATABUNDLE_JWT_SECRET", SECRET);
        env::set_var("DATABUNDLE_VENDOR_COMMISSION_BPS", "ten percent");
    }

    let err = loader_for(&temp_dir).load().expect_err("bps must be numeric");
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            key: "VENDOR_COMMISSION_BPS",
            ..
        }
    ));

    clear_env();
}

#[test]
fn admin_credentials_must_come_in_pairs() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("DATABUNDLE_JWT_SECRET", SECRET);
        env::set_var("DATABUNDLE_ADMIN_EMAIL", "Admin@Example.com");
    }

    let err = loader_for(&temp_dir)
        .load()
        .expect_err("email without hash should fail");
    assert!(matches!(err, ConfigError::IncompleteAdminCredentials));

    let hash = databundle::password::hash_password("admin-password").unwrap();
    unsafe {
        env::set_var("DATABUNDLE_ADMIN_PASSWORD_HASH", &hash);
    }

    let cfg = loader_for(&temp_dir).load().expect("paired credentials load");
    assert_eq!(cfg.admin_email.as_deref(), Some("admin@example.com"));
    assert!(!cfg.redacted_json().unwrap().contains(&hash));

    clear_env();
}
