use crate::core::window::DEFAULT_GRACE_HOURS;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{JobError, Result};
use crate::utils::validation::{self, Validate};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobInfo,
    #[serde(default)]
    pub settings: SettingsConfig,
    pub window: Option<WindowConfig>,
    pub store: StoreConfig,
    pub execution: Option<ExecutionConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Left unset, the run is refused at the config gate.
    pub accounts_distributor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub grace_period_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub concurrent_accounts: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(JobError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| JobError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ACCOUNTS_DISTRIBUTOR_ID})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| JobError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("job.name", &self.job.name)?;
        validation::validate_path("store.path", &self.store.path)?;

        if let Some(raw) = self.raw_distributor_id() {
            validation::validate_uuid("settings.accounts_distributor_id", raw)?;
        }

        if let Some(hours) = self.window.as_ref().and_then(|w| w.grace_period_hours) {
            validation::validate_range("window.grace_period_hours", hours, 0, 72)?;
        }

        if let Some(concurrent) = self.execution.as_ref().and_then(|e| e.concurrent_accounts) {
            validation::validate_range("execution.concurrent_accounts", concurrent, 1, 64)?;
        }

        Ok(())
    }

    /// 未替換的 `${VAR}` 視為未設定，交由 ConfigGate 回報
    fn raw_distributor_id(&self) -> Option<&str> {
        self.settings
            .accounts_distributor_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !is_unresolved_env_ref(s))
    }

    pub fn store_path(&self) -> &str {
        &self.store.path
    }

    pub fn grace_period_hours(&self) -> i64 {
        self.window
            .as_ref()
            .and_then(|w| w.grace_period_hours)
            .unwrap_or(DEFAULT_GRACE_HOURS)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }
}

fn is_unresolved_env_ref(value: &str) -> bool {
    value.starts_with("${") && value.ends_with('}')
}

impl ConfigProvider for TomlConfig {
    fn accounts_distributor_id(&self) -> Option<Uuid> {
        self.raw_distributor_id()
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    fn grace_period(&self) -> Duration {
        Duration::hours(self.grace_period_hours())
    }

    fn concurrent_accounts(&self) -> usize {
        self.execution
            .as_ref()
            .and_then(|e| e.concurrent_accounts)
            .unwrap_or(1)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
