//! lnauthd 主程序
//!
//! 加载配置，启动 LNURL-auth HTTP 服务和定时清理任务，Ctrl-C 时优雅关闭

mod cli;
mod error;
mod observability;

use anyhow::Context;
use clap::Parser;
use lnauth_common::LnAuthdConfig;
use lnauthd::{build_app, spawn_prune_task, start_http_server};
use observability::init_observability;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Test { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        None => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(ApplicationLauncher::run_application(&config_path))
        }
    }
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(provided_path.clone());
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = [
            // 1. Current working directory
            PathBuf::from("config.toml"),
            // 2. System config directory
            PathBuf::from("/etc/lnauth/config.toml"),
        ];

        bootstrap_info!("Searching for config file in default locations...");

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(path.clone());
            } else {
                bootstrap_info!("Config not found at: {:?}", path);
            }
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in fallback_paths.iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: lnauthd --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();

        match LnAuthdConfig::from_file(config_path) {
            Ok(config) => {
                info!("✅ 配置文件解析成功: {:?}", config_path);

                if let Err(errors) = config.validate() {
                    let has_errors = Self::report_validation(&errors, |line, warning| {
                        if warning {
                            info!("{}", line);
                        } else {
                            error!("{}", line);
                        }
                    });
                    if has_errors {
                        return Err(Error::service_validation("配置验证失败"));
                    }
                }

                info!("✅ 完整配置验证通过");
                Ok(())
            }
            Err(e) => {
                error!("❌ 配置文件解析失败: {}", e);
                Err(Error::service_validation(format!("配置解析失败: {e}")))
            }
        }
    }

    /// 逐条输出校验结果，返回是否存在非警告错误
    fn report_validation(errors: &[String], emit: impl Fn(String, bool)) -> bool {
        let mut has_errors = false;
        for (i, err) in errors.iter().enumerate() {
            if err.starts_with("Warning:") {
                emit(format!("  {}. ⚠️  {}", i + 1, err), true);
            } else {
                emit(format!("  {}. ❌ {}", i + 1, err), false);
                has_errors = true;
            }
        }
        has_errors
    }

    /// 运行应用程序的主入口
    async fn run_application(config_path: &Path) -> Result<()> {
        bootstrap_info!("📄 加载配置文件: {:?}", config_path);

        let config = match LnAuthdConfig::from_file(config_path) {
            Ok(config) => {
                bootstrap_info!("✅ 配置加载成功");

                if let Err(errors) = config.validate() {
                    let has_errors = Self::report_validation(&errors, |line, warning| {
                        if warning {
                            bootstrap_info!("{}", line);
                        } else {
                            bootstrap_error!("{}", line);
                        }
                    });
                    if has_errors {
                        return Err(Error::custom("配置验证失败，请修复上述错误"));
                    }
                }

                config
            }
            Err(e) => {
                bootstrap_error!("❌ 配置加载失败: {}", e);
                return Err(e.into());
            }
        };

        // ensure sqlite_path directory exists
        if !config.sqlite_path.exists() {
            std::fs::create_dir_all(&config.sqlite_path).with_context(|| {
                format!(
                    "Failed to create SQLite data directory: {}",
                    config.sqlite_path.display()
                )
            })?;
        }

        let _observability_guard = init_observability(&config)?;

        Self::run_services(config).await
    }

    /// 启动 HTTP 服务和清理任务，等待关闭
    async fn run_services(config: LnAuthdConfig) -> Result<()> {
        info!("🚀 启动 LNURL-auth 服务 ({}, env: {})", config.name, config.env);

        Self::register_metrics();

        let state = lnauth::create_lnauth_state(&config).await?;
        let service = state.service.clone();
        info!("✅ 存储初始化完成 (backend: {:?})", config.lnauth.storage);

        // 初始化全局关闭通道（供所有任务共享）
        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(10);
        setup_ctrl_c_handler(shutdown_tx.clone()).await;

        let app = build_app(&config, state)?;
        let (local_addr, server_handle) = start_http_server(&config, app, shutdown_tx.clone())
            .await
            .map_err(|e| Error::service_startup(format!("{e:#}")))?;

        let mut handles = vec![server_handle];
        if config.lnauth.prune || config.lnauth.prune_responses {
            handles.push(spawn_prune_task(
                Arc::clone(&service),
                Duration::from_secs(config.lnauth.prune_interval_secs),
                &shutdown_tx,
            ));
        } else {
            warn!("Pruning disabled, stale challenges and responses will accumulate");
        }

        Self::display_service_info(&config, local_addr);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Service task terminated unexpectedly: {}", e);
                let _ = shutdown_tx.send(());
            }
        }

        info!("🛑 所有服务已安全关闭");
        Ok(())
    }

    fn register_metrics() {
        let registry = &lnauth_common::metrics::REGISTRY;
        if let Err(e) = lnauth_common::metrics::register_metrics() {
            warn!(
                "Prometheus metrics registration warning (may already be registered): {}",
                e
            );
        }
        if let Err(e) = lnauth::register_lnauth_metrics(registry) {
            warn!(
                "LNURL-auth metrics registration warning (may already be registered): {}",
                e
            );
        }
        info!("✅ Prometheus metrics registry 初始化成功");
    }

    /// 显示服务信息
    fn display_service_info(config: &LnAuthdConfig, local_addr: std::net::SocketAddr) {
        let base_url = config.public_base_url();
        let prefix = config.lnauth.route_prefix.trim_end_matches('/');

        info!("✅ 所有服务已启动");
        info!("📡 HTTP 服务器监听在: {}", local_addr);
        info!("🔧 可用的API端点:");
        info!("  - {}{}/login", base_url, prefix);
        info!("  - {}{}/callback (wallet)", base_url, prefix);
        info!("  - {}{}/check?k1=<k1>", base_url, prefix);
        info!("  - {}{}/health", base_url, prefix);
        info!("  - {}/metrics", base_url);
    }
}

/// 设置Ctrl-C信号处理程序
async fn setup_ctrl_c_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听Ctrl-C信号: {}", e);
            return;
        }
        info!("收到Ctrl-C信号，开始优雅关闭...");
        let _ = shutdown_tx.send(());
    });
}
