//! verify-filename：核对文件名中的标识是否出现在 OCR 结果中

use anyhow::Context;
use scanmatch_core::{list_documents, worker_count, CoreError, Extractor, Logger, TaskError, WorkerPool};
use scanmatch_rules::compile_pattern;
use scanmatch_verify::{run_verification, VerifyLedgers, VerifyWorker, DEFAULT_START_PAGE};

use crate::config::AppConfig;

pub const DEFAULT_LOG_FILE: &str = "./logs/verify_filename.log";

pub fn run(config: &AppConfig, logger: &Logger) -> anyhow::Result<()> {
    let Some(pdf_dir) = config.pdf_directory.as_deref() else {
        log::error!(logger: logger, "[Verify] 配置文件中未指定 pdf_directory");
        return Ok(());
    };
    let Some(filename_regex) = config.filename_regex.as_deref() else {
        log::error!(logger: logger, "[Verify] 配置文件中未指定 filename_regex");
        return Ok(());
    };
    let pattern = compile_pattern(filename_regex)?;

    let documents = match list_documents(pdf_dir) {
        Ok(documents) => documents,
        Err(CoreError::MissingDirectory(dir)) => {
            log::error!(logger: logger, "[Verify] PDF 目录不存在: {}", dir.display());
            return Ok(());
        }
        Err(e) => return Err(e).context("列出 PDF 文件失败"),
    };

    let extract = config.extract_config(DEFAULT_START_PAGE);
    let ledgers = VerifyLedgers::create(&extract.output_directory).context("无法创建台账")?;

    log::info!(logger: logger, "[Verify] 开始验证目录 {} 中的 PDF 文件...", pdf_dir.display());
    log::info!(logger: logger, "[Verify] 使用的正则表达式: {}", filename_regex);

    let pool = WorkerPool::new(worker_count(config.workers), logger.clone())
        .context("无法创建 worker 线程池")?;
    let report = run_verification(
        &pool,
        &documents,
        || {
            Extractor::from_config(extract.clone(), logger.clone())
                .map(|extractor| VerifyWorker::new(extractor, pattern.clone()))
                .map_err(|e| TaskError::Failed(e.to_string()))
        },
        &ledgers,
    );

    log::info!(
        logger: logger,
        "[Verify] 台账: {}，{}（共处理 {} 个文件）",
        ledgers.unmatches().path().display(),
        ledgers.skipped().path().display(),
        report.processed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanmatch_core::logging;

    #[test]
    fn test_missing_filename_regex_returns_early() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            pdf_directory: Some(dir.path().to_path_buf()),
            output_directory: dir.path().join("out"),
            ..AppConfig::default()
        };
        run(&config, &logging::discard()).unwrap();
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_invalid_filename_regex_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            pdf_directory: Some(dir.path().to_path_buf()),
            filename_regex: Some("CR-(".to_string()),
            ..AppConfig::default()
        };
        assert!(run(&config, &logging::discard()).is_err());
    }
}
