//! Scanned PDF OCR matching tools.
//!
//! 四个命令行工具共用的入口：加载配置、初始化日志句柄、运行工具。

pub mod config;
pub mod tools;

pub use config::{AppConfig, ConfigError};

use log::LevelFilter;
use scanmatch_core::logging::setup_logger;
use scanmatch_core::Logger;
use std::path::Path;

/// 工具函数签名
pub type Tool = fn(&AppConfig, &Logger) -> anyhow::Result<()>;

/// 加载配置并运行工具
///
/// 配置加载失败时只打印错误并返回，不会 panic。
pub fn launch(config_path: &Path, default_log_file: &str, tool: Tool) {
    let config = match AppConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("无法加载配置文件: {}", e);
            return;
        }
    };

    let log_file = config.log_file_or(default_log_file);
    let logger = match setup_logger(LevelFilter::Debug, &log_file) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("无法初始化日志文件 {}: {}", log_file.display(), e);
            return;
        }
    };

    log::info!(logger: logger, "[Main] 配置文件: {}", config_path.display());
    if let Err(e) = tool(&config, &logger) {
        log::error!(logger: logger, "[Main] {:#}", e);
    }
    logger.flush();
}
