//! 统一配置管理系统
//!
//! lnauthd 所有配置项的定义、默认值和校验都在这里统一管理。
//! 配置文件使用 TOML 格式。

pub mod bind;
pub mod lnauth;

pub use crate::config::bind::{BindConfig, HttpBindConfig};
pub use crate::config::lnauth::{LnAuthConfig, RateLimitConfig, StorageBackend};
use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// lnauthd 主配置结构体
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LnAuthdConfig {
    /// 服务器实例名称
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境，允许 http 回调地址
    /// - "prod": 生产环境，回调地址必须是 https（钱包会拒绝明文回调）
    /// - "test": 测试环境
    pub env: String,

    /// 网络绑定配置
    #[serde(default)]
    pub bind: BindConfig,

    /// SQLite 数据库文件存储目录路径
    ///
    /// 主数据库文件将存储为 `{sqlite_path}/lnauth.db`，
    /// 包括挑战表、校验记录表和账户映射表。
    #[serde(
        serialize_with = "serialize_pathbuf",
        deserialize_with = "deserialize_pathbuf"
    )]
    pub sqlite_path: PathBuf,

    /// 可观测性配置
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// LNURL-auth 服务配置
    #[serde(default)]
    pub lnauth: LnAuthConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,sqlx=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关
    ///
    /// 当 output = "file" 时有效：true 按天轮转，false 追加到单个文件
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件路径
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

fn serialize_pathbuf<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    path.display().to_string().serialize(serializer)
}

fn deserialize_pathbuf<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(PathBuf::from(s))
}

impl Default for LnAuthdConfig {
    fn default() -> Self {
        Self {
            name: "lnauthd-default".to_string(),
            env: "dev".to_string(),
            bind: BindConfig::default(),
            sqlite_path: PathBuf::from("database"),
            observability: ObservabilityConfig::default(),
            lnauth: LnAuthConfig::default(),
        }
    }
}

impl LnAuthdConfig {
    /// 返回可观测性配置引用
    pub fn observability_config(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// 返回日志配置引用
    pub fn log_config(&self) -> &LogConfig {
        &self.observability.log
    }

    /// 钱包回调与轮询使用的对外基础 URL
    pub fn public_base_url(&self) -> String {
        self.bind.http.base_url()
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound {
                path: path_ref.display().to_string(),
            });
        }

        if !path_ref.is_file() {
            return Err(ConfigError::NotAFile {
                path: path_ref.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path_ref)?;
        Ok(toml::from_str(&content)?)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 验证配置有效性
    ///
    /// 返回全部问题；以 "Warning:" 开头的条目不阻止启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        if !["dev", "prod", "test"].contains(&self.env.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid environment '{}'. Must be one of: dev, prod, test",
                self.env
            ));
        }

        if self.bind.http.port == 0 {
            errors.push("HTTP bind port cannot be 0".to_string());
        }

        let base_url = self.public_base_url();
        match url::Url::parse(&base_url) {
            Ok(parsed) => {
                if self.env.eq_ignore_ascii_case("prod") && parsed.scheme() != "https" {
                    errors.push(format!(
                        "Public URL must use https in prod environment, got '{base_url}'"
                    ));
                } else if parsed.scheme() != "https" {
                    errors.push(format!(
                        "Warning: public URL '{base_url}' is not https, most wallets will refuse the callback"
                    ));
                }
            }
            Err(e) => errors.push(format!("Invalid public URL '{base_url}': {e}")),
        }

        if self.sqlite_path.as_os_str().is_empty() {
            errors.push("sqlite_path cannot be empty".to_string());
        }

        let log = &self.observability.log;
        if !["console", "file"].contains(&log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}'. Must be 'console' or 'file'",
                log.output
            ));
        }

        errors.extend(self.lnauth.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LnAuthdConfig::default();
        assert_eq!(config.name, "lnauthd-default");
        assert_eq!(config.env, "dev");
        assert_eq!(config.sqlite_path, PathBuf::from("database"));
        assert_eq!(config.lnauth.expiration, 3600);
        assert_eq!(config.public_base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_toml_serialization() {
        let config = LnAuthdConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("name = \"lnauthd-default\""));
        assert!(toml_str.contains("sqlite_path = \"database\""));

        let parsed = LnAuthdConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.lnauth.frequency, config.lnauth.frequency);
    }

    #[test]
    fn test_minimal_toml() {
        let config = LnAuthdConfig::from_toml(
            r#"
            name = "lnauthd-01"
            env = "prod"
            sqlite_path = "/var/lib/lnauthd"

            [bind.http]
            domain_name = "auth.example.com"
            ip = "127.0.0.1"
            port = 8443
            public_url = "https://auth.example.com"

            [lnauth]
            expiration = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.lnauth.expiration, 600);
        assert_eq!(config.lnauth.frequency, 5000);
        assert_eq!(config.public_base_url(), "https://auth.example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dev_http_is_warning_only() {
        let config = LnAuthdConfig::default();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().all(|e| e.starts_with("Warning:")));
    }

    #[test]
    fn test_prod_requires_https() {
        let config = LnAuthdConfig {
            env: "prod".to_string(),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| !e.starts_with("Warning:") && e.contains("https"))
        );
    }

    #[test]
    fn test_example_config_is_valid() {
        let config =
            LnAuthdConfig::from_toml(include_str!("../../../../config.example.toml")).unwrap();
        assert_eq!(config.name, "lnauthd-01");
        assert_eq!(config.lnauth.storage, StorageBackend::Sqlite);
        assert!(config.log_config().rotate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_missing() {
        let result = LnAuthdConfig::from_file("/nonexistent/lnauthd.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, LnAuthdConfig::default().to_toml().unwrap()).unwrap();

        let config = LnAuthdConfig::from_file(&path).unwrap();
        assert_eq!(config.name, "lnauthd-default");

        let result = LnAuthdConfig::from_file(dir.path());
        assert!(matches!(result, Err(ConfigError::NotAFile { .. })));
    }
}
