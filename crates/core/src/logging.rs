//! 运行期日志句柄
//!
//! 日志后端不注册为全局 logger：`setup_logger` 返回一个句柄，
//! 由调用方显式传给各组件，生命周期限定在一次运行内。
//! 组件通过 `log::info!(logger: handle, ...)` 写日志。

use log::LevelFilter;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// 显式传递的日志句柄
pub type Logger = Arc<dyn log::Log>;

/// 控制台 + 文件日志，格式：`时间 - 级别 - 模块 - 消息`
pub fn setup_logger(level: LevelFilter, log_file: &Path) -> io::Result<Logger> {
    if let Some(dir) = log_file.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let (max_level, logger) = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.module_path().unwrap_or_else(|| record.target()),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .chain(fern::log_file(log_file)?)
        .into_log();

    // 宏在分发前会检查全局级别
    log::set_max_level(max_level);

    Ok(Arc::from(logger))
}

/// 丢弃所有记录的句柄
pub fn discard() -> Logger {
    let (_, logger) = fern::Dispatch::new().into_log();
    Arc::from(logger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logger_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");

        let logger = setup_logger(LevelFilter::Debug, &path).unwrap();
        log::info!(logger: logger, "[Test] 写入日志");
        log::debug!(logger: logger, "[Test] 调试信息");
        logger.flush();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("INFO"));
        assert!(content.contains("[Test] 写入日志"));
        assert!(content.contains("[Test] 调试信息"));
    }

    #[test]
    fn test_discard_accepts_records() {
        let logger = discard();
        log::error!(logger: logger, "ignored");
        logger.flush();
    }
}
