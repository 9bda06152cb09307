//! copy-by-name：复制文件名包含清单字符串的 PDF

use anyhow::Context;
use scanmatch_core::{walk_documents, Logger};
use scanmatch_rename::{copy_matching, load_lookup_strings};

use crate::config::AppConfig;

pub const DEFAULT_LOG_FILE: &str = "./logs/copy_by_name.log";

pub fn run(config: &AppConfig, logger: &Logger) -> anyhow::Result<()> {
    let Some(file_txt) = config.file_txt.as_deref() else {
        log::error!(logger: logger, "[Copy] 配置文件中未指定 file_txt");
        return Ok(());
    };

    let lookup = load_lookup_strings(file_txt).context("无法读取匹配字符串清单")?;
    log::info!(logger: logger, "[Copy] 已加载 {} 个匹配字符串", lookup.len());

    let documents = walk_documents(&config.target_directories, logger);
    let report = copy_matching(&documents, &lookup, &config.output_directory, logger)?;

    log::info!(
        logger: logger,
        "[Copy] 处理完成！共复制了 {} 个文件，失败 {} 个",
        report.copied,
        report.failed
    );

    if report.unmatched.is_empty() {
        log::info!(logger: logger, "[Copy] 所有字符串都已找到匹配的PDF文件");
    } else {
        log::warn!(logger: logger, "[Copy] 以下字符串未找到匹配的PDF文件：");
        for s in &report.unmatched {
            log::warn!(logger: logger, "[Copy]   - {}", s);
        }
    }
    Ok(())
}
