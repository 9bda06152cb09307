//! run-ocr：并发标记提取，写入每份文档的结果表和汇总表

use anyhow::Context;
use scanmatch_core::{
    append_matches, distinct_ids, list_documents, run_extraction, worker_count, CoreError,
    Extractor, Logger, TaskError, WorkerPool,
};

use crate::config::AppConfig;

pub const DEFAULT_LOG_FILE: &str = "./logs/run_ocr.log";

pub fn run(config: &AppConfig, logger: &Logger) -> anyhow::Result<()> {
    let Some(pdf_dir) = config.pdf_directory.as_deref() else {
        log::error!(logger: logger, "[Extract] 配置文件中未指定 pdf_directory");
        return Ok(());
    };

    let documents = match list_documents(pdf_dir) {
        Ok(documents) => distinct_ids(documents, logger),
        Err(CoreError::MissingDirectory(dir)) => {
            log::error!(logger: logger, "[Extract] PDF 目录不存在: {}", dir.display());
            return Ok(());
        }
        Err(e) => return Err(e).context("列出 PDF 文件失败"),
    };

    let extract = config.extract_config(1);
    std::fs::create_dir_all(&extract.output_directory)
        .with_context(|| format!("无法创建输出目录 {}", extract.output_directory.display()))?;

    log::info!(
        logger: logger,
        "[Extract] 开始处理 {}，标记: {}，语言: {}，DPI: {}",
        pdf_dir.display(),
        extract.marker,
        extract.ocr_language,
        extract.dpi
    );

    let pool = WorkerPool::new(worker_count(config.workers), logger.clone())
        .context("无法创建 worker 线程池")?;
    let report = run_extraction(&pool, &documents, || {
        Extractor::from_config(extract.clone(), logger.clone())
            .map_err(|e| TaskError::Failed(e.to_string()))
    });

    if report.matches.is_empty() {
        log::info!(logger: logger, "[Extract] 未找到任何匹配");
    } else {
        let path = config.matches_csv();
        append_matches(&path, &report.matches)
            .with_context(|| format!("写入汇总表 {} 失败", path.display()))?;
        log::info!(
            logger: logger,
            "[Extract] {} 条匹配已写入 {}",
            report.matches.len(),
            path.display()
        );
    }

    for (name, reason) in &report.skipped {
        log::warn!(logger: logger, "[Extract] 已跳过: {} ({})", name, reason);
    }
    for (name, message) in &report.errors {
        log::error!(logger: logger, "[Extract] 处理失败: {} ({})", name, message);
    }

    Ok(())
}
