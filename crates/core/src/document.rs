//! 待处理文档

use crate::logging::Logger;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 一份源文档；列出后在本次运行中不再改变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    /// 文件名去掉扩展名
    pub id: String,
    pub path: PathBuf,
}

impl Document {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { id, path }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// 列出目录下（不递归）的 PDF 文件，按文件名排序
pub fn list_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(CoreError::MissingDirectory(dir.to_path_buf()));
    }

    let mut documents: Vec<Document> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_pdf(path))
        .map(Document::from_path)
        .collect();

    documents.sort_by_key(|doc| doc.file_name());
    Ok(documents)
}

/// 同一标识只保留第一份文档（按列出顺序），其余记录警告后剔除
///
/// 每份文档独占 `<id>_matches.csv`，`a.pdf` 与 `a.PDF` 不能同时处理。
pub fn distinct_ids(documents: Vec<Document>, logger: &Logger) -> Vec<Document> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|doc| {
            let first = seen.insert(doc.id.clone());
            if !first {
                log::warn!(
                    logger: logger,
                    "[Documents] {} 与已列出的文档标识相同 ({})，已跳过",
                    doc.path.display(),
                    doc.id
                );
            }
            first
        })
        .collect()
}

/// 递归列出多个目录下的 PDF 文件；不存在的目录记录警告后跳过
pub fn walk_documents(dirs: &[PathBuf], logger: &Logger) -> Vec<Document> {
    let mut documents = Vec::new();
    for dir in dirs {
        log::info!(logger: logger, "[Documents] 正在处理目录：{}", dir.display());
        if !dir.is_dir() {
            log::warn!(logger: logger, "[Documents] 目录不存在：{}", dir.display());
            continue;
        }
        walk_into(dir, logger, &mut documents);
    }
    documents
}

fn walk_into(dir: &Path, logger: &Logger, documents: &mut Vec<Document>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(logger: logger, "[Documents] 无法读取目录 {}: {}", dir.display(), e);
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            walk_into(&path, logger, documents);
        } else if is_pdf(&path) {
            documents.push(Document::from_path(path));
        }
    }
}
