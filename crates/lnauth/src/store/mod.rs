//! 挑战存储模块
//!
//! # 设计
//!
//! - `ChallengeStore` trait 定义统一的异步接口
//! - `SqliteChallengeStore` 持久化存储，`MemoryChallengeStore` 进程内存储
//! - NEW → USED 迁移通过条件更新完成，同一挑战最多一次成功迁移

pub mod backend;
pub mod memory;
pub mod sqlite;

pub use backend::ChallengeStore;
pub use memory::MemoryChallengeStore;
pub use sqlite::SqliteChallengeStore;
