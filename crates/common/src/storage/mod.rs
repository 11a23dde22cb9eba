//! 存储基础设施
//!
//! 提供共享的 SQLite 连接池构建

pub mod db;

pub use db::{DB_FILE_NAME, connect_sqlite};
