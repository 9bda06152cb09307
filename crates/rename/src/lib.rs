//! Renaming and copying documents by extracted or listed identifiers.
//!
//! - 重命名：读取每份文档结果表的第一条记录，按候选正则截取标识作为新文件名
//! - 按名称复制：文件名包含清单中任一字符串时复制到目标目录
//!
//! 两者都不会覆盖本次运行之前已存在的其他文件。

mod copy;
mod rename;

pub use copy::{copy_matching, load_lookup_strings, unique_destination, CopyReport};
pub use rename::{
    rename_all, rename_document, rename_from_table, table_source, RenameOutcome, RenameReport,
};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("目录不存在: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("IO 错误 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenameError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenameError::Io {
            path: path.into(),
            source,
        }
    }
}
