//! # lnauthd
//!
//! LNURL-auth 登录服务：HTTP 服务器组装、定时清理和请求追踪

pub mod scheduler;
pub mod server;
pub mod trace;

// Re-export commonly used types
pub use lnauth_common::config::LnAuthdConfig;
pub use scheduler::spawn_prune_task;
pub use server::{build_app, start_http_server};
