//! 结果表与台账
//!
//! 每份文档的结果表 `<id>_matches.csv` 和汇总表 `matches.csv` 共用表头
//! `pdf_path,page,text`，均为追加写入（文件不存在时先写表头）。
//! 读取时容忍中断写入留下的残缺行。

use crate::document::Document;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

pub const MATCH_HEADER: [&str; 3] = ["pdf_path", "page", "text"];

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("IO 错误 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV 错误 {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl TableError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        TableError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        TableError::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

/// 一条匹配记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub pdf_path: String,
    pub page: u32,
    pub text: String,
}

impl MatchRecord {
    pub fn new(document: &Document, page: u32, text: impl Into<String>) -> Self {
        Self {
            pdf_path: document.path.display().to_string(),
            page,
            text: text.into(),
        }
    }

    /// 由 `pdf_path` 推出的文档标识
    pub fn document_id(&self) -> String {
        Document::from_path(&self.pdf_path).id
    }
}

/// 文档对应的结果表路径
pub fn per_document_table(output_dir: &Path, document: &Document) -> PathBuf {
    output_dir.join(format!("{}_matches.csv", document.id))
}

fn open_append(path: &Path) -> Result<(File, bool), TableError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| TableError::io(dir, e))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TableError::io(path, e))?;
    let is_empty = file.metadata().map_err(|e| TableError::io(path, e))?.len() == 0;
    Ok((file, is_empty))
}

/// 追加匹配记录；新文件先写表头
pub fn append_matches(path: &Path, records: &[MatchRecord]) -> Result<(), TableError> {
    let (file, is_empty) = open_append(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if is_empty {
        writer
            .write_record(MATCH_HEADER)
            .map_err(|e| TableError::csv(path, e))?;
    }
    for record in records {
        writer.serialize(record).map_err(|e| TableError::csv(path, e))?;
    }
    writer.flush().map_err(|e| TableError::io(path, e))
}

/// 读取结果
#[derive(Debug, Default)]
pub struct TableRead {
    pub records: Vec<MatchRecord>,
    /// 被跳过的残缺行数
    pub malformed: usize,
}

/// 读取结果表，跳过无法解析的行
pub fn read_matches(path: &Path) -> Result<TableRead, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| TableError::csv(path, e))?;

    let mut read = TableRead::default();
    for row in reader.deserialize::<MatchRecord>() {
        match row {
            Ok(record) => read.records.push(record),
            Err(e) if e.is_io_error() => return Err(TableError::csv(path, e)),
            Err(_) => read.malformed += 1,
        }
    }
    Ok(read)
}

/// 需要人工跟进的台账（不匹配、跳过、错误）
///
/// 运行开始时重建，运行中逐行追加，结束时按首列排序。
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// 截断重建并写入表头
    pub fn create(path: impl Into<PathBuf>, header: &[&str]) -> Result<Self, TableError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| TableError::io(dir, e))?;
            }
        }
        let mut writer = csv::Writer::from_path(&path).map_err(|e| TableError::csv(&path, e))?;
        writer
            .write_record(header)
            .map_err(|e| TableError::csv(&path, e))?;
        writer.flush().map_err(|e| TableError::io(&path, e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append<S: AsRef<[u8]>>(&self, row: &[S]) -> Result<(), TableError> {
        let (file, _) = open_append(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(row)
            .map_err(|e| TableError::csv(&self.path, e))?;
        writer.flush().map_err(|e| TableError::io(&self.path, e))
    }

    /// 按首列重新排序（表头保持在第一行）
    pub fn sort_by_first_column(&self) -> Result<(), TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| TableError::csv(&self.path, e))?;
        let header = reader
            .headers()
            .map_err(|e| TableError::csv(&self.path, e))?
            .clone();

        let mut rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TableError::csv(&self.path, e))?;
        rows.sort_by(|a, b| a.get(0).cmp(&b.get(0)));

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| TableError::csv(&self.path, e))?;
        writer
            .write_record(&header)
            .map_err(|e| TableError::csv(&self.path, e))?;
        for row in &rows {
            writer
                .write_record(row)
                .map_err(|e| TableError::csv(&self.path, e))?;
        }
        writer.flush().map_err(|e| TableError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, page: u32, text: &str) -> MatchRecord {
        MatchRecord {
            pdf_path: path.to_string(),
            page,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("a_matches.csv");

        append_matches(&path, &[record("/x/a.pdf", 1, "设计变更通知单 A-1")]).unwrap();
        append_matches(&path, &[record("/x/a.pdf", 2, "text, with comma")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("pdf_path,page,text").count(), 1);

        let read = read_matches(&path).unwrap();
        assert_eq!(read.malformed, 0);
        assert_eq!(read.records.len(), 2);
        assert_eq!(read.records[1].text, "text, with comma");
    }

    #[test]
    fn test_read_skips_truncated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b_matches.csv");
        fs::write(
            &path,
            "pdf_path,page,text\n/x/b.pdf,1,first\n/x/b.pdf,notanumber,bad\n/x/b.pdf\n/x/b.pdf,3,third\n",
        )
        .unwrap();

        let read = read_matches(&path).unwrap();
        assert_eq!(read.malformed, 2);
        let pages: Vec<u32> = read.records.iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![1, 3]);
    }

    #[test]
    fn test_document_id_from_record() {
        let doc = Document::from_path("/scans/DOC-7.pdf");
        let rec = MatchRecord::new(&doc, 4, "line");
        assert_eq!(rec.document_id(), "DOC-7");
        assert_eq!(
            per_document_table(Path::new("/out"), &doc),
            PathBuf::from("/out/DOC-7_matches.csv")
        );
    }

    #[test]
    fn test_ledger_recreated_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unmatches.csv");
        fs::write(&path, "stale\n").unwrap();

        let ledger = Ledger::create(&path, &["file_name", "error_type"]).unwrap();
        ledger.append(&["c.pdf", "failed"]).unwrap();
        ledger.append(&["a.pdf", "image_too_large"]).unwrap();
        ledger.append(&["b.pdf", "x"]).unwrap();
        ledger.sort_by_first_column().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "file_name,error_type\na.pdf,image_too_large\nb.pdf,x\nc.pdf,failed\n"
        );
    }
}
