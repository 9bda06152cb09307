use crate::RenameError;
use scanmatch_core::{Document, Logger};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// 读取匹配字符串清单：每行一个，去首尾空白，忽略空行
pub fn load_lookup_strings(path: &Path) -> Result<Vec<String>, RenameError> {
    let content = fs::read_to_string(path).map_err(|e| RenameError::io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// 目标目录中第一个空闲的文件名：`name.pdf`、`name_1.pdf`、`name_2.pdf` ...
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|counter| match &ext {
            Some(ext) => dir.join(format!("{}_{}.{}", stem, counter, ext)),
            None => dir.join(format!("{}_{}", stem, counter)),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(file_name))
}

/// 复制到目标目录，不覆盖已有文件；保留修改时间
fn copy_no_clobber(source: &Path, dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    let metadata = fs::metadata(source)?;
    let mut input = File::open(source)?;

    loop {
        let target = unique_destination(dir, file_name);
        let mut output = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            // 并发创建了同名文件，换下一个
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };

        let copied = io::copy(&mut input, &mut output).and_then(|_| {
            if let Ok(modified) = metadata.modified() {
                output.set_modified(modified)?;
            }
            output.set_permissions(metadata.permissions())
        });

        return match copied {
            Ok(()) => Ok(target),
            Err(e) => {
                drop(output);
                let _ = fs::remove_file(&target);
                Err(e)
            }
        };
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    pub failed: usize,
    /// 没有复制出任何文件的匹配字符串
    pub unmatched: BTreeSet<String>,
}

/// 文件名包含任一匹配字符串的文档复制到目标目录
///
/// 每个文档只取第一个命中的字符串，最多复制一次。
pub fn copy_matching(
    documents: &[Document],
    lookup: &[String],
    destination: &Path,
    logger: &Logger,
) -> Result<CopyReport, RenameError> {
    fs::create_dir_all(destination).map_err(|e| RenameError::io(destination, e))?;

    let mut report = CopyReport {
        unmatched: lookup.iter().cloned().collect(),
        ..CopyReport::default()
    };

    for document in documents {
        let file_name = document.file_name();
        let Some(hit) = lookup.iter().find(|s| file_name.contains(s.as_str())) else {
            continue;
        };

        match copy_no_clobber(&document.path, destination, &file_name) {
            Ok(target) => {
                report.copied += 1;
                report.unmatched.remove(hit);
                log::info!(
                    logger: logger,
                    "[Copy] 已复制文件：{} -> {}",
                    document.path.display(),
                    target.display()
                );
            }
            Err(e) => {
                report.failed += 1;
                log::error!(
                    logger: logger,
                    "[Copy] 复制文件时出错 {}: {}",
                    document.path.display(),
                    e
                );
            }
        }
    }

    Ok(report)
}
