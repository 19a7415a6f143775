pub mod cli;

use crate::http::schema::SchemaClass;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_socket_addr,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub use cli::{Cli, Command};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub schema: SchemaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 未設定時資料只存在記憶體
    pub data_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub default_schema_class: String,
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            default_schema_class: "openapi".to_string(),
            title: "Recipe API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some("Recipe, tag and ingredient management API".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| AppError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 容器以環境變數注入設定
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(bind) = lookup("RECIPE_API_BIND") {
            self.server.bind = bind;
        }
        if let Some(path) = lookup("RECIPE_API_DATA_PATH") {
            self.storage.data_path = Some(path).filter(|p| !p.is_empty());
        }
        if let Some(json) = lookup("RECIPE_API_LOG_JSON") {
            self.logging.json = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(class) = lookup("RECIPE_API_SCHEMA_CLASS") {
            self.schema.default_schema_class = class;
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        validate_socket_addr("server.bind", &self.server.bind)
    }

    pub fn schema_class(&self) -> Result<SchemaClass> {
        self.schema.default_schema_class.parse()
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        if let Some(path) = &self.storage.data_path {
            validate_path("storage.data_path", path)?;
        }

        validate_positive_number("auth.min_password_length", self.auth.min_password_length, 1)?;

        self.schema_class()?;
        validate_non_empty_string("schema.title", &self.schema.title)?;
        validate_non_empty_string("schema.version", &self.schema.version)?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(AppError::InvalidConfigValueError {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: format!("Valid levels: {}", valid_levels.join(", ")),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[server]
bind = "127.0.0.1:9000"

[storage]
data_path = "/vol/data/store.json"

[auth]
min_password_length = 8

[schema]
default_schema_class = "openapi"
title = "Kitchen API"
version = "2.0.0"

[logging]
level = "debug"
json = true
"#;
        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(settings.server.bind, "127.0.0.1:9000");
        assert_eq!(
            settings.storage.data_path.as_deref(),
            Some("/vol/data/store.json")
        );
        assert_eq!(settings.auth.min_password_length, 8);
        assert_eq!(settings.schema.title, "Kitchen API");
        assert!(settings.logging.json);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings = Settings::from_toml_str("[server]\nbind = \"0.0.0.0:8080\"\n").unwrap();
        assert_eq!(settings.auth.min_password_length, 5);
        assert_eq!(settings.schema.default_schema_class, "openapi");
        assert_eq!(settings.storage.data_path, None);
        assert_eq!(settings.schema_class().unwrap(), SchemaClass::OpenApi);
    }

    #[test]
    fn test_env_placeholders_are_substituted() {
        std::env::set_var("RECIPE_API_TEST_DATA_DIR", "/tmp/recipes");
        let settings = Settings::from_toml_str(
            "[storage]\ndata_path = \"${RECIPE_API_TEST_DATA_DIR}/store.json\"\n",
        )
        .unwrap();
        assert_eq!(
            settings.storage.data_path.as_deref(),
            Some("/tmp/recipes/store.json")
        );

        let untouched =
            Settings::from_toml_str("[schema]\ntitle = \"${RECIPE_API_TEST_UNSET_VAR}\"\n").unwrap();
        assert_eq!(untouched.schema.title, "${RECIPE_API_TEST_UNSET_VAR}");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            ("RECIPE_API_BIND", "127.0.0.1:7000"),
            ("RECIPE_API_DATA_PATH", ""),
            ("RECIPE_API_LOG_JSON", "true"),
            ("RECIPE_API_SCHEMA_CLASS", "none"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings {
            storage: StorageConfig {
                data_path: Some("/data/store.json".to_string()),
            },
            ..Default::default()
        };
        settings.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.server.bind, "127.0.0.1:7000");
        assert_eq!(settings.storage.data_path, None);
        assert!(settings.logging.json);
        assert_eq!(settings.schema_class().unwrap(), SchemaClass::Disabled);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut settings = Settings::default();
        settings.server.bind = "not-an-address".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.schema.default_schema_class = "coreapi".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.auth.min_password_length = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"warn\"").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.logging.level, "warn");
        assert!(Settings::from_file("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn test_shipped_container_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/deploy/recipe-api.toml");
        let settings = Settings::from_file(path).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.storage.data_path.as_deref(),
            Some("/vol/data/store.json")
        );
    }
}
