use crate::RenameError;
use regex::Regex;
use scanmatch_core::{read_matches, Logger};
use scanmatch_rules::identifier_from_text;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TABLE_SUFFIX: &str = "_matches.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    /// 目标就是源文件本身
    AlreadyNamed { path: PathBuf },
    Skipped { reason: String },
    Failed { reason: String },
}

/// 将文档重命名为同目录下的 `<stem>.<原扩展名>`，从不覆盖其他文件
pub fn rename_document(source: &Path, stem: &str) -> RenameOutcome {
    if !source.is_file() {
        return RenameOutcome::Skipped {
            reason: format!("源文件不存在: {}", source.display()),
        };
    }

    let file_name = match source.extension() {
        Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
        None => stem.to_string(),
    };
    let target = source.with_file_name(file_name);

    if target.exists() {
        let same_file = match (fs::canonicalize(source), fs::canonicalize(&target)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        return if same_file {
            RenameOutcome::AlreadyNamed { path: target }
        } else {
            collision(&target)
        };
    }

    match move_no_clobber(source, &target) {
        Ok(()) => RenameOutcome::Renamed {
            from: source.to_path_buf(),
            to: target,
        },
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => collision(&target),
        Err(e) => RenameOutcome::Failed {
            reason: format!("重命名 {} 失败: {}", source.display(), e),
        },
    }
}

fn collision(target: &Path) -> RenameOutcome {
    RenameOutcome::Failed {
        reason: format!("目标文件名已存在: {}", target.display()),
    }
}

/// 先建硬链接再删除源文件；目标已存在时返回 `AlreadyExists`，不会替换
fn move_no_clobber(source: &Path, target: &Path) -> io::Result<()> {
    fs::hard_link(source, target)?;
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(target);
        return Err(e);
    }
    Ok(())
}

fn table_id(table_path: &Path) -> Option<&str> {
    let id = table_path.file_name()?.to_str()?.strip_suffix(TABLE_SUFFIX)?;
    (!id.is_empty()).then_some(id)
}

fn is_pdf_named(path: &Path, id: &str) -> bool {
    let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(id);
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    stem_matches && ext_matches
}

/// 结果表对应的源 PDF
///
/// 优先用记录里 `pdf_path` 的文件名在 `pdf_dir` 中定位；否则按 `<id>.pdf`
/// 查找，扩展名不区分大小写。
pub fn table_source(pdf_dir: &Path, table_path: &Path, recorded: Option<&str>) -> Option<PathBuf> {
    let id = table_id(table_path)?;

    if let Some(name) = recorded.and_then(|p| Path::new(p).file_name()) {
        let candidate = pdf_dir.join(name);
        if is_pdf_named(&candidate, id) && candidate.is_file() {
            return Some(candidate);
        }
    }

    let exact = pdf_dir.join(format!("{}.pdf", id));
    if exact.is_file() {
        return Some(exact);
    }
    let mut found: Vec<PathBuf> = fs::read_dir(pdf_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_pdf_named(path, id))
        .collect();
    found.sort();
    found.into_iter().next()
}

/// 取结果表第一条记录的文本，按候选正则得到新文件名后重命名
pub fn rename_from_table(pdf_dir: &Path, table_path: &Path, patterns: &[Regex], logger: &Logger) -> RenameOutcome {
    let Some(id) = table_id(table_path) else {
        return RenameOutcome::Skipped {
            reason: format!("无法识别的结果表: {}", table_path.display()),
        };
    };

    let table = match read_matches(table_path) {
        Ok(table) => table,
        Err(e) => {
            return RenameOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    if table.malformed > 0 {
        log::warn!(
            logger: logger,
            "[Rename] {} 中有 {} 行无法解析，已跳过",
            table_path.display(),
            table.malformed
        );
    }

    let recorded = table.records.first().map(|r| r.pdf_path.as_str());
    let Some(source) = table_source(pdf_dir, table_path, recorded) else {
        return RenameOutcome::Skipped {
            reason: format!("未找到对应的 PDF 文件: {}", pdf_dir.join(format!("{}.pdf", id)).display()),
        };
    };

    let Some(first) = table.records.first() else {
        let reason = if table.malformed > 0 {
            "malformed table"
        } else {
            "empty table"
        };
        return RenameOutcome::Skipped {
            reason: reason.to_string(),
        };
    };

    let text = first.text.trim();
    match identifier_from_text(text, patterns) {
        Some(stem) => rename_document(&source, &stem),
        None => RenameOutcome::Skipped {
            reason: format!("no identifier extracted: {}", text),
        },
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameReport {
    pub renamed: usize,
    pub already_named: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// 处理输出目录下的全部结果表
pub fn rename_all(
    pdf_dir: &Path,
    output_dir: &Path,
    patterns: &[Regex],
    logger: &Logger,
) -> Result<RenameReport, RenameError> {
    for dir in [pdf_dir, output_dir] {
        if !dir.is_dir() {
            return Err(RenameError::MissingDirectory(dir.to_path_buf()));
        }
    }

    let mut tables: Vec<PathBuf> = fs::read_dir(output_dir)
        .map_err(|e| RenameError::io(output_dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && table_id(path).is_some())
        .collect();
    tables.sort();

    let mut report = RenameReport::default();
    if tables.is_empty() {
        log::warn!(
            logger: logger,
            "[Rename] 在 {} 下未找到 *{} 文件",
            output_dir.display(),
            TABLE_SUFFIX
        );
        return Ok(report);
    }
    log::info!(logger: logger, "[Rename] 找到 {} 个结果表", tables.len());

    for table in &tables {
        match rename_from_table(pdf_dir, table, patterns, logger) {
            RenameOutcome::Renamed { from, to } => {
                report.renamed += 1;
                log::info!(logger: logger, "[Rename] 成功重命名: {} -> {}", from.display(), to.display());
            }
            RenameOutcome::AlreadyNamed { path } => {
                report.already_named += 1;
                log::info!(logger: logger, "[Rename] 文件名已符合: {}", path.display());
            }
            RenameOutcome::Skipped { reason } => {
                report.skipped += 1;
                log::warn!(logger: logger, "[Rename] 跳过 {}: {}", table.display(), reason);
            }
            RenameOutcome::Failed { reason } => {
                report.failed += 1;
                log::error!(logger: logger, "[Rename] 处理 {} 失败: {}", table.display(), reason);
            }
        }
    }

    log::info!(
        logger: logger,
        "[Rename] 任务完成! 成功: {}, 已符合: {}, 失败: {}, 跳过: {}",
        report.renamed,
        report.already_named,
        report.failed,
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanmatch_core::logging;

    fn write_table(dir: &Path, id: &str, body: &str) -> PathBuf {
        let path = dir.join(format!("{}_matches.csv", id));
        fs::write(&path, format!("pdf_path,page,text\n{}", body)).unwrap();
        path
    }

    #[test]
    fn test_rename_with_sanitized_identifier() {
        let pdfs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(pdfs.path().join("scan01.pdf"), b"pdf").unwrap();
        let table = write_table(out.path(), "scan01", "/x/scan01.pdf,2,设计变更通知单 编号：ABC/123\n");

        let patterns = vec![Regex::new(r"XYZ-\d+").unwrap(), Regex::new(r"ABC/\d+").unwrap()];
        let outcome = rename_from_table(pdfs.path(), &table, &patterns, &logging::discard());

        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                from: pdfs.path().join("scan01.pdf"),
                to: pdfs.path().join("ABC_123.pdf"),
            }
        );
        assert!(pdfs.path().join("ABC_123.pdf").exists());
    }

    #[test]
    fn test_collision_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan02.pdf");
        let existing = dir.path().join("ABC_123.pdf");
        fs::write(&source, b"new").unwrap();
        fs::write(&existing, b"old").unwrap();

        let outcome = rename_document(&source, "ABC_123");
        assert!(matches!(outcome, RenameOutcome::Failed { .. }));
        assert_eq!(fs::read(&existing).unwrap(), b"old");
        assert!(source.exists());
    }

    #[test]
    fn test_target_is_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ABC_123.pdf");
        fs::write(&source, b"pdf").unwrap();

        assert_eq!(
            rename_document(&source, "ABC_123"),
            RenameOutcome::AlreadyNamed { path: source.clone() }
        );
    }

    #[test]
    fn test_no_identifier_is_skipped() {
        let pdfs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(pdfs.path().join("scan03.pdf"), b"pdf").unwrap();
        let table = write_table(out.path(), "scan03", "/x/scan03.pdf,1,no identifier here\n");

        let patterns = vec![Regex::new(r"ABC/\d+").unwrap()];
        let outcome = rename_from_table(pdfs.path(), &table, &patterns, &logging::discard());
        assert!(matches!(outcome, RenameOutcome::Skipped { reason } if reason.starts_with("no identifier extracted")));
        assert!(pdfs.path().join("scan03.pdf").exists());
    }

    #[test]
    fn test_malformed_table_is_skipped() {
        let pdfs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(pdfs.path().join("scan04.pdf"), b"pdf").unwrap();
        let table = write_table(out.path(), "scan04", "/x/scan04.pdf,oops\n");

        let outcome = rename_from_table(pdfs.path(), &table, &[], &logging::discard());
        assert_eq!(
            outcome,
            RenameOutcome::Skipped {
                reason: "malformed table".to_string()
            }
        );
    }

    #[test]
    fn test_table_source_mapping() {
        let pdfs = tempfile::tempdir().unwrap();
        fs::write(pdfs.path().join("A-1.pdf"), b"pdf").unwrap();
        let dir = pdfs.path();

        assert_eq!(
            table_source(dir, Path::new("/out/A-1_matches.csv"), None),
            Some(dir.join("A-1.pdf"))
        );
        assert_eq!(table_source(dir, Path::new("/out/B-2_matches.csv"), None), None);
        assert_eq!(table_source(dir, Path::new("/out/matches.csv"), None), None);
        assert_eq!(table_source(dir, Path::new("/out/unmatches.csv"), None), None);
    }

    #[test]
    fn test_uppercase_extension_source_is_renamed() {
        let pdfs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let scan = pdfs.path().join("Scan.PDF");
        fs::write(&scan, b"pdf").unwrap();

        let documents = scanmatch_core::list_documents(pdfs.path()).unwrap();
        assert_eq!(documents.len(), 1);
        let record = scanmatch_core::MatchRecord::new(&documents[0], 1, "编号：ABC/123");
        let table = scanmatch_core::per_document_table(out.path(), &documents[0]);
        scanmatch_core::append_matches(&table, &[record]).unwrap();

        let patterns = vec![Regex::new(r"ABC/\d+").unwrap()];
        let outcome = rename_from_table(pdfs.path(), &table, &patterns, &logging::discard());
        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                from: scan,
                to: pdfs.path().join("ABC_123.PDF"),
            }
        );
    }

    #[test]
    fn test_source_found_without_recorded_path() {
        let pdfs = tempfile::tempdir().unwrap();
        fs::write(pdfs.path().join("scan05.Pdf"), b"pdf").unwrap();

        assert_eq!(
            table_source(pdfs.path(), Path::new("/out/scan05_matches.csv"), Some("/elsewhere/other.pdf")),
            Some(pdfs.path().join("scan05.Pdf"))
        );
    }

    #[test]
    fn test_move_refuses_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan06.pdf");
        let target = dir.path().join("ABC_6.pdf");
        fs::write(&source, b"new").unwrap();
        fs::write(&target, b"old").unwrap();

        let err = move_no_clobber(&source, &target).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert_eq!(fs::read(&source).unwrap(), b"new");

        let fresh = dir.path().join("ABC_7.pdf");
        move_no_clobber(&source, &fresh).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&fresh).unwrap(), b"new");
    }

    #[test]
    fn test_rename_all_counts_outcomes() {
        let pdfs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(pdfs.path().join("a.pdf"), b"a").unwrap();
        fs::write(pdfs.path().join("b.pdf"), b"b").unwrap();
        write_table(out.path(), "a", "/x/a.pdf,1,编号 ABC/1\n");
        write_table(out.path(), "b", "/x/b.pdf,1,编号 ABC/1\n");
        write_table(out.path(), "missing", "/x/missing.pdf,1,编号 ABC/9\n");
        fs::write(out.path().join("matches.csv"), "pdf_path,page,text\n").unwrap();

        let patterns = vec![Regex::new(r"ABC/\d+").unwrap()];
        let report = rename_all(pdfs.path(), out.path(), &patterns, &logging::discard()).unwrap();

        assert_eq!(
            report,
            RenameReport {
                renamed: 1,
                already_named: 0,
                failed: 1,
                skipped: 1,
            }
        );
        assert!(pdfs.path().join("ABC_1.pdf").exists());
    }

    #[test]
    fn test_rename_all_missing_output_directory() {
        let pdfs = tempfile::tempdir().unwrap();
        let err = rename_all(pdfs.path(), &pdfs.path().join("nope"), &[], &logging::discard()).unwrap_err();
        assert!(matches!(err, RenameError::MissingDirectory(_)));
    }
}
