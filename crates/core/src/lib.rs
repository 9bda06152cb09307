//! Core orchestration for OCR matching runs.
//!
//! 文档列表、逐文档提取、并发调度以及结果表/台账的读写。

pub mod config;
pub mod document;
pub mod driver;
pub mod extractor;
pub mod logging;
pub mod table;
pub mod threading;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::ExtractConfig;
pub use document::{distinct_ids, list_documents, walk_documents, Document};
pub use driver::{run_extraction, Completion, RunReport, TaskError, Worker, WorkerPool};
pub use extractor::{ExtractError, Extracted, Extractor};
pub use logging::Logger;
pub use table::{
    append_matches, per_document_table, read_matches, Ledger, MatchRecord, TableError, TableRead,
    MATCH_HEADER,
};
pub use threading::worker_count;

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("目录不存在: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Render(#[from] scanmatch_render::RenderError),
    #[error(transparent)]
    Ocr(#[from] scanmatch_ocr::OcrError),
    #[error(transparent)]
    Rules(#[from] scanmatch_rules::RulesError),
}
