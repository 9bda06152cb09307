//! Filename verification against OCR results.
//!
//! 从第 2 页起对文档做正则提取，再用同一正则从文件名中取出期望标识，
//! 检查该标识是否出现在 OCR 结果中。不匹配与跳过的文档写入台账，
//! 验证通过的只记录日志。

use regex::Regex;
use scanmatch_core::{
    Document, ExtractError, Extractor, Ledger, Logger, TableError, TaskError, Worker, WorkerPool,
};
use scanmatch_ocr::OcrEngine;
use scanmatch_render::Rasterizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

pub const UNMATCHES_FILE: &str = "unmatches.csv";
pub const SKIPPED_FILE: &str = "skipped_errors.csv";
pub const UNMATCHES_HEADER: [&str; 3] = ["file_name", "filename_match", "ocr_matches"];
pub const SKIPPED_HEADER: [&str; 2] = ["file_name", "error_type"];

/// 资源保护拒绝在跳过台账中的类型
pub const IMAGE_TOO_LARGE: &str = "image_too_large";
/// OCR 未找到任何匹配
pub const NO_OCR_MATCHES: &str = "no_ocr_matches";

/// 首页版式不同，默认从第 2 页开始
pub const DEFAULT_START_PAGE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchReason {
    PatternAbsentFromFilename,
    IdentifierAbsentFromOcr,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::PatternAbsentFromFilename => write!(f, "pattern absent from filename"),
            MismatchReason::IdentifierAbsentFromOcr => write!(f, "identifier absent from OCR results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    Verified {
        identifier: String,
    },
    Mismatched {
        reason: MismatchReason,
        /// 文件名中提取到的标识
        filename_match: Option<String>,
        /// 全部 OCR 匹配（已排序）
        ocr_matches: Vec<String>,
    },
    Skipped {
        reason: String,
    },
}

/// 用文件名中的标识核对 OCR 匹配集合
pub fn verify_filename(file_name: &str, pattern: &Regex, ocr_matches: &BTreeSet<String>) -> VerificationOutcome {
    if ocr_matches.is_empty() {
        return VerificationOutcome::Skipped {
            reason: NO_OCR_MATCHES.to_string(),
        };
    }

    let evidence = || ocr_matches.iter().cloned().collect::<Vec<_>>();

    let Some(identifier) = pattern.find(file_name).map(|m| m.as_str().trim()) else {
        return VerificationOutcome::Mismatched {
            reason: MismatchReason::PatternAbsentFromFilename,
            filename_match: None,
            ocr_matches: evidence(),
        };
    };

    if ocr_matches.contains(identifier) {
        VerificationOutcome::Verified {
            identifier: identifier.to_string(),
        }
    } else {
        VerificationOutcome::Mismatched {
            reason: MismatchReason::IdentifierAbsentFromOcr,
            filename_match: Some(identifier.to_string()),
            ocr_matches: evidence(),
        }
    }
}

/// 正则模式提取 + 文件名核对的 worker
pub struct VerifyWorker<R, E> {
    extractor: Extractor<R, E>,
    pattern: Regex,
}

impl<R: Rasterizer, E: OcrEngine> VerifyWorker<R, E> {
    pub fn new(extractor: Extractor<R, E>, pattern: Regex) -> Self {
        Self { extractor, pattern }
    }

    pub fn verify(&mut self, document: &Document) -> Result<VerificationOutcome, ExtractError> {
        let start_page = self.extractor.config().start_page;
        let matches = self
            .extractor
            .extract_regex_matches(document, &self.pattern, start_page)?;
        Ok(verify_filename(&document.file_name(), &self.pattern, &matches))
    }
}

impl<R: Rasterizer, E: OcrEngine> Worker for VerifyWorker<R, E> {
    type Output = VerificationOutcome;

    fn process(&mut self, document: &Document) -> Result<Self::Output, TaskError> {
        Ok(self.verify(document)?)
    }
}

/// 不匹配台账与跳过台账
pub struct VerifyLedgers {
    unmatches: Ledger,
    skipped: Ledger,
}

impl VerifyLedgers {
    /// 在输出目录中重建两个台账
    pub fn create(output_dir: &Path) -> Result<Self, TableError> {
        Ok(Self {
            unmatches: Ledger::create(output_dir.join(UNMATCHES_FILE), &UNMATCHES_HEADER)?,
            skipped: Ledger::create(output_dir.join(SKIPPED_FILE), &SKIPPED_HEADER)?,
        })
    }

    pub fn unmatches(&self) -> &Ledger {
        &self.unmatches
    }

    pub fn skipped(&self) -> &Ledger {
        &self.skipped
    }

    fn record_mismatch(&self, file_name: &str, filename_match: Option<&str>, ocr_matches: &[String]) -> Result<(), TableError> {
        let joined = ocr_matches.join(";");
        self.unmatches
            .append(&[file_name, filename_match.unwrap_or(""), joined.as_str()])
    }

    fn record_skip(&self, file_name: &str, error_type: &str) -> Result<(), TableError> {
        self.skipped.append(&[file_name, error_type])
    }

    /// 结束时按文件名排序，便于跨次比对
    pub fn finish(&self) -> Result<(), TableError> {
        self.unmatches.sort_by_first_column()?;
        self.skipped.sort_by_first_column()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub total: usize,
    pub verified: usize,
    pub mismatched: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl VerifyReport {
    pub fn processed(&self) -> usize {
        self.verified + self.mismatched + self.skipped + self.errors
    }
}

/// 并发验证，结果在调度线程上写入台账
pub fn run_verification<W, F>(
    pool: &WorkerPool,
    documents: &[Document],
    factory: F,
    ledgers: &VerifyLedgers,
) -> VerifyReport
where
    W: Worker<Output = VerificationOutcome>,
    F: Fn() -> Result<W, TaskError> + Sync,
{
    let logger: Logger = pool.logger().clone();
    let mut report = VerifyReport {
        total: documents.len(),
        ..VerifyReport::default()
    };

    pool.run(documents, factory, |completion| {
        let name = completion.document.file_name();
        let written = match completion.result {
            Ok(VerificationOutcome::Verified { identifier }) => {
                report.verified += 1;
                log::info!(logger: logger, "[Verify] 验证通过: 文件名 '{}' 包含 '{}'", name, identifier);
                Ok(())
            }
            Ok(VerificationOutcome::Mismatched {
                reason,
                filename_match,
                ocr_matches,
            }) => {
                report.mismatched += 1;
                log::warn!(
                    logger: logger,
                    "[Verify] 验证失败: {} ({})，OCR 结果: {:?}",
                    name,
                    reason,
                    ocr_matches
                );
                ledgers.record_mismatch(&name, filename_match.as_deref(), &ocr_matches)
            }
            Ok(VerificationOutcome::Skipped { reason }) => {
                report.skipped += 1;
                log::warn!(logger: logger, "[Verify] 文件 {} 中未找到符合正则的内容", name);
                ledgers.record_skip(&name, &reason)
            }
            Err(TaskError::ResourceGuard(reason)) => {
                report.skipped += 1;
                log::warn!(logger: logger, "[Verify] 跳过 {}: {}", name, reason);
                ledgers.record_skip(&name, IMAGE_TOO_LARGE)
            }
            Err(TaskError::Failed(message)) => {
                report.errors += 1;
                log::error!(logger: logger, "[Verify] 处理文件 {} 时出错: {}", name, message);
                ledgers.record_skip(&name, &message)
            }
        };
        if let Err(e) = written {
            log::error!(logger: logger, "[Verify] 写入台账失败: {}", e);
        }
    });

    if let Err(e) = ledgers.finish() {
        log::error!(logger: logger, "[Verify] 台账排序失败: {}", e);
    }

    log::info!(
        logger: logger,
        "[Verify] 验证完成：共 {} 个文件，通过 {} 个，不匹配 {} 个，跳过 {} 个，失败 {} 个",
        report.total,
        report.verified,
        report.mismatched,
        report.skipped,
        report.errors
    );
    report
}
