//! 命令行界面定义
//!
//! 定义了主程序的命令行参数和选项
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lnauthd")]
#[command(version)]
#[command(about = "LNURL-auth login server: challenge issuance, wallet signature verification and status polling")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Configuration file path (defaults to searching standard locations)
    #[arg(short, long, default_value = "config.toml")]
    pub(crate) config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Test configuration file
    Test {
        /// Configuration file path (optional, defaults to config.toml)
        #[arg(index = 1)]
        config_file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = Cli::parse_from(["lnauthd", "--config", "/tmp/lnauthd.toml"]);
        assert_eq!(cli.config, PathBuf::from("/tmp/lnauthd.toml"));
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["lnauthd", "test", "custom.toml"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Test { config_file: Some(ref p) }) if p == &PathBuf::from("custom.toml")
        ));
    }
}
