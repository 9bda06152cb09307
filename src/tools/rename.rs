//! rename-by-ocr：按每份文档结果表中的标识重命名 PDF

use scanmatch_core::Logger;
use scanmatch_rename::{rename_all, RenameError};

use crate::config::AppConfig;

pub const DEFAULT_LOG_FILE: &str = "./logs/rename_by_ocr.log";

pub fn run(config: &AppConfig, logger: &Logger) -> anyhow::Result<()> {
    let Some(pdf_dir) = config.pdf_directory.as_deref() else {
        log::error!(logger: logger, "[Rename] 配置文件中未指定 pdf_directory");
        return Ok(());
    };
    let patterns = config.content_regex.compile()?;
    if patterns.is_empty() {
        log::warn!(logger: logger, "[Rename] 未配置 content_regex，所有文档都将被跳过");
    }

    log::info!(logger: logger, "[Rename] PDF 目录: {}", pdf_dir.display());
    log::info!(logger: logger, "[Rename] 结果表目录: {}", config.output_directory.display());

    match rename_all(pdf_dir, &config.output_directory, &patterns, logger) {
        Ok(_) => Ok(()),
        Err(RenameError::MissingDirectory(dir)) => {
            log::error!(logger: logger, "[Rename] 目录不存在: {}", dir.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
