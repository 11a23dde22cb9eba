//! lnauthd 通用基础设施库
//!
//! 配置模型、Prometheus 指标和 SQLite 连接池

pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;

pub use config::LnAuthdConfig;
pub use error::{ConfigError, DatabaseError};
pub use storage::connect_sqlite;
