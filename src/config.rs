use crate::error::AppError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SERVICE_NAME: &str = "costscope";
pub const API_TOKEN_ENV: &str = "COSTSCOPE_API_TOKEN";

fn app_home_dir() -> Result<PathBuf, AppError> {
    if let Ok(custom) = std::env::var("COSTSCOPE_HOME") {
        return Ok(PathBuf::from(custom));
    }

    if let Some(dirs) = ProjectDirs::from("io", "costscope", SERVICE_NAME) {
        let candidate = dirs.data_local_dir().to_path_buf();
        if fs::create_dir_all(&candidate).is_ok() {
            return Ok(candidate);
        }
    }

    let cwd = std::env::current_dir()?;
    Ok(cwd.join(".costscope"))
}

/// One configured billing account. The optional base URL overrides the
/// global backend root for accounts served by a different deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    pub id: u32,
    pub name: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub refresh_seconds: u64,
    pub default_range: String,
    pub base_url: String,
    pub source_timeout_seconds: u64,
    pub summary_months: u32,
    pub accounts: Vec<AccountSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_seconds: 300,
            default_range: "30days".to_string(),
            base_url: "http://localhost:8000".to_string(),
            source_timeout_seconds: 30,
            summary_months: 6,
            accounts: vec![],
        }
    }
}

impl AppConfig {
    pub fn account(&self, id: u32) -> Option<&AccountSettings> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// The account a cycle targets when the caller names none: the first
    /// configured one.
    pub fn default_account(&self) -> Option<&AccountSettings> {
        self.accounts.first()
    }

    pub fn account_base_url(&self, account: &AccountSettings) -> String {
        account.base_url.clone().unwrap_or_else(|| self.base_url.clone())
    }
}

pub fn config_dir() -> Result<PathBuf, AppError> {
    Ok(app_home_dir()?.join("config"))
}

pub fn config_path() -> Result<PathBuf, AppError> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn ensure_dirs() -> Result<(), AppError> {
    fs::create_dir_all(config_dir()?)?;
    Ok(())
}

fn normalize_config(config: &mut AppConfig) -> bool {
    let mut changed = false;

    let mut accounts: Vec<AccountSettings> = Vec::new();
    for account in std::mem::take(&mut config.accounts) {
        let trimmed = account.name.trim().to_string();
        if trimmed != account.name {
            changed = true;
        }
        if accounts.iter().any(|a: &AccountSettings| a.id == account.id) {
            changed = true;
            continue;
        }
        accounts.push(AccountSettings {
            id: account.id,
            name: trimmed,
            base_url: account.base_url,
        });
    }
    config.accounts = accounts;

    if config.summary_months == 0 {
        config.summary_months = AppConfig::default().summary_months;
        changed = true;
    }

    if crate::window::parse_range_token(&config.default_range).is_err() {
        config.default_range = AppConfig::default().default_range;
        changed = true;
    }

    changed
}

pub fn load_config() -> Result<AppConfig, AppError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(&path)?;
    let mut parsed: AppConfig = toml::from_str(&raw)?;
    if normalize_config(&mut parsed) {
        save_config(&parsed)?;
    }
    Ok(parsed)
}

pub fn save_config(config: &AppConfig) -> Result<(), AppError> {
    ensure_dirs()?;
    let path = config_path()?;
    let raw = toml::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}

pub fn ensure_initialized() -> Result<(), AppError> {
    ensure_dirs()?;
    let cfg_path = config_path()?;
    if !Path::new(&cfg_path).exists() {
        save_config(&AppConfig::default())?;
    }
    Ok(())
}

pub fn set_api_token(account_id: u32, token: &str) -> Result<(), AppError> {
    let entry = keyring::Entry::new(SERVICE_NAME, &format!("account:{account_id}"))?;
    entry.set_password(token)?;
    Ok(())
}

/// Removing an account must succeed even without a credential store, so
/// a missing entry (or no store at all) is not an error.
pub fn delete_api_token(account_id: u32) -> Result<(), AppError> {
    let Ok(entry) = keyring::Entry::new(SERVICE_NAME, &format!("account:{account_id}")) else {
        return Ok(());
    };
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(AppError::Keyring(e)),
    }
}

/// Keyring first, then the environment, so headless runs can inject a
/// token without a credential store.
pub fn get_api_token(account_id: u32) -> Result<String, AppError> {
    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, &format!("account:{account_id}")) {
        if let Ok(value) = entry.get_password() {
            if !value.is_empty() {
                return Ok(value);
            }
        }
    }

    if let Ok(value) = std::env::var(API_TOKEN_ENV) {
        if !value.is_empty() {
            return Ok(value);
        }
    }

    Err(AppError::Config(format!(
        "No API token found for account {account_id}. Run 'costscope add-account' or set {API_TOKEN_ENV}."
    )))
}
