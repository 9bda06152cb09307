//! 单文档提取流程：光栅化 → （可选）方向校正 → 逐页识别 → 搜索
//!
//! 光栅化或任一页识别失败都会使整份文档失败，不处理部分页面。
//! 方向检测失败只记录警告，继续使用未旋转的图像。

use crate::config::ExtractConfig;
use crate::document::Document;
use crate::driver::{TaskError, Worker};
use crate::logging::Logger;
use crate::table::{append_matches, per_document_table, MatchRecord};
use crate::Result;
use regex::Regex;
use scanmatch_ocr::{missing_languages, OcrEngine, OcrError, TesseractEngine};
use scanmatch_render::{PdfiumRasterizer, Rasterizer, RenderError};
use scanmatch_rules::{find_marker_lines, find_regex_matches, Search};
use std::collections::BTreeSet;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Rasterize(#[from] RenderError),
    #[error("第 {page} 页识别失败: {source}")]
    Recognize {
        page: u32,
        #[source]
        source: OcrError,
    },
}

impl ExtractError {
    pub fn is_resource_guard(&self) -> bool {
        matches!(self, ExtractError::Rasterize(e) if e.is_resource_guard())
    }
}

/// 提取结果：标记模式按行保留页码，正则模式为去重集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Lines(Vec<MatchRecord>),
    Set(BTreeSet<String>),
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        match self {
            Extracted::Lines(lines) => lines.is_empty(),
            Extracted::Set(set) => set.is_empty(),
        }
    }
}

pub struct Extractor<R = PdfiumRasterizer, E = TesseractEngine> {
    rasterizer: R,
    engine: E,
    config: ExtractConfig,
    logger: Logger,
}

impl Extractor<PdfiumRasterizer, TesseractEngine> {
    /// 按配置绑定 pdfium 并初始化 Tesseract
    pub fn from_config(config: ExtractConfig, logger: Logger) -> Result<Self> {
        let rasterizer = PdfiumRasterizer::new(logger.clone())?;
        let engine = TesseractEngine::new(config.tesseract.clone(), logger.clone())?;

        match engine.available_languages() {
            Ok(available) => {
                let missing = missing_languages(&config.ocr_language, &available);
                if !missing.is_empty() {
                    log::warn!(
                        logger: logger,
                        "[Extract] Tesseract 未安装语言包: {}",
                        missing.join(", ")
                    );
                }
            }
            Err(e) => log::warn!(logger: logger, "[Extract] 无法获取 Tesseract 语言列表: {}", e),
        }

        Ok(Self::new(rasterizer, engine, config, logger))
    }
}

impl<R: Rasterizer, E: OcrEngine> Extractor<R, E> {
    pub fn new(rasterizer: R, engine: E, config: ExtractConfig, logger: Logger) -> Self {
        Self {
            rasterizer,
            engine,
            config,
            logger,
        }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    fn recognize_pages(&mut self, document: &Document, start_page: u32) -> std::result::Result<Vec<String>, ExtractError> {
        let options = self.config.render_options(start_page);
        let pages = self.rasterizer.rasterize(&document.path, &options)?;

        let mut texts = Vec::with_capacity(pages.len());
        for page in pages {
            let image = if self.config.auto_orient {
                match self.engine.detect_orientation(&page.image) {
                    Ok(orientation) => {
                        log::debug!(
                            logger: self.logger,
                            "[Extract] {} 第 {} 页方向: {}",
                            document.file_name(),
                            page.page,
                            orientation
                        );
                        orientation.apply(page.image)
                    }
                    Err(e) => {
                        log::warn!(
                            logger: self.logger,
                            "[Extract] {} 第 {} 页方向检测失败，使用原图: {}",
                            document.file_name(),
                            page.page,
                            e
                        );
                        page.image
                    }
                }
            } else {
                page.image
            };

            let text = self
                .engine
                .recognize_image(&image, &self.config.ocr_language)
                .map_err(|source| ExtractError::Recognize {
                    page: page.page,
                    source,
                })?;
            texts.push(text);
        }
        Ok(texts)
    }

    /// 标记模式；有匹配时追加写入该文档的结果表
    pub fn extract_marker_lines(
        &mut self,
        document: &Document,
        marker: &str,
        start_page: u32,
    ) -> std::result::Result<Vec<MatchRecord>, ExtractError> {
        let start = Instant::now();
        let texts = self.recognize_pages(document, start_page)?;

        let records: Vec<MatchRecord> = find_marker_lines(&texts, marker, start_page)
            .into_iter()
            .map(|hit| MatchRecord::new(document, hit.page, hit.text))
            .collect();

        if !records.is_empty() {
            let table = per_document_table(&self.config.output_directory, document);
            match append_matches(&table, &records) {
                Ok(()) => log::debug!(
                    logger: self.logger,
                    "[Extract] 写入 {} 条记录到 {}",
                    records.len(),
                    table.display()
                ),
                Err(e) => log::error!(logger: self.logger, "[Extract] 写入结果表失败: {}", e),
            }
        }

        log::debug!(
            logger: self.logger,
            "[Extract] {} 标记搜索完成，{} 条匹配，耗时 {} ms",
            document.file_name(),
            records.len(),
            start.elapsed().as_millis()
        );
        Ok(records)
    }

    /// 正则模式；不写结果表，由调用方决定如何保存
    pub fn extract_regex_matches(
        &mut self,
        document: &Document,
        regex: &Regex,
        start_page: u32,
    ) -> std::result::Result<BTreeSet<String>, ExtractError> {
        let texts = self.recognize_pages(document, start_page)?;
        let matches = find_regex_matches(&texts, regex);
        log::debug!(
            logger: self.logger,
            "[Extract] {} 正则搜索完成，{} 个不同匹配",
            document.file_name(),
            matches.len()
        );
        Ok(matches)
    }

    pub fn extract(
        &mut self,
        document: &Document,
        search: &Search,
        start_page: u32,
    ) -> std::result::Result<Extracted, ExtractError> {
        match search {
            Search::Marker(marker) => self
                .extract_marker_lines(document, marker, start_page)
                .map(Extracted::Lines),
            Search::Regex(regex) => self
                .extract_regex_matches(document, regex, start_page)
                .map(Extracted::Set),
        }
    }
}

/// 标记模式的 worker
impl<R: Rasterizer, E: OcrEngine> Worker for Extractor<R, E> {
    type Output = Vec<MatchRecord>;

    fn process(&mut self, document: &Document) -> std::result::Result<Self::Output, TaskError> {
        let marker = self.config.marker.clone();
        let start_page = self.config.start_page;
        Ok(self.extract_marker_lines(document, &marker, start_page)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;
    use crate::table::read_matches;
    use crate::testing::{FakeEngine, FakeRasterizer};
    use scanmatch_ocr::Orientation;
    use scanmatch_rules::SearchMode;

    fn config(dir: &std::path::Path) -> ExtractConfig {
        ExtractConfig {
            output_directory: dir.to_path_buf(),
            ..ExtractConfig::default()
        }
    }

    #[test]
    fn test_marker_mode_records_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::with_texts([
            "封面",
            "设计变更通知单 编号：ABC/123\n正文",
            "  设计变更通知单 附页  ",
        ]);
        let mut extractor = Extractor::new(FakeRasterizer::pages(3), engine, config(dir.path()), logging::discard());
        let doc = Document::from_path("/scans/A1.pdf");

        let records = extractor.extract_marker_lines(&doc, "设计变更通知单", 1).unwrap();
        let pages: Vec<u32> = records.iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![2, 3]);
        assert_eq!(records[1].text, "设计变更通知单 附页");

        let read = read_matches(&dir.path().join("A1_matches.csv")).unwrap();
        assert_eq!(read.records, records);
    }

    #[test]
    fn test_marker_mode_without_matches_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::with_texts(["nothing", "here"]);
        let mut extractor = Extractor::new(FakeRasterizer::pages(2), engine, config(dir.path()), logging::discard());
        let doc = Document::from_path("/scans/B2.pdf");

        let records = extractor.extract_marker_lines(&doc, "设计变更通知单", 1).unwrap();
        assert!(records.is_empty());
        assert!(!dir.path().join("B2_matches.csv").exists());
    }

    #[test]
    fn test_marker_pages_respect_start_offset() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::with_texts(["marker on second page", "marker again"]);
        let mut extractor = Extractor::new(FakeRasterizer::pages(3), engine, config(dir.path()), logging::discard());
        let doc = Document::from_path("/scans/C3.pdf");

        let records = extractor.extract_marker_lines(&doc, "marker", 2).unwrap();
        assert!(records.iter().all(|r| r.page >= 2));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_regex_mode_deduplicates_and_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::with_texts(["CR-0042 and CR-0099", "again CR-0042"]);
        let mut extractor = Extractor::new(FakeRasterizer::pages(2), engine, config(dir.path()), logging::discard());
        let doc = Document::from_path("/scans/CR-0042.pdf");
        let regex = Regex::new(r"CR-\d+").unwrap();

        let matches = extractor.extract_regex_matches(&doc, &regex, 1).unwrap();
        let expected: BTreeSet<String> = ["CR-0042", "CR-0099"].iter().map(|s| s.to_string()).collect();
        assert_eq!(matches, expected);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_recognition_failure_fails_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::with_texts(["设计变更通知单"]);
        engine.texts.push_back(Err("engine crashed".to_string()));
        let mut extractor = Extractor::new(FakeRasterizer::pages(2), engine, config(dir.path()), logging::discard());
        let doc = Document::from_path("/scans/D4.pdf");

        let err = extractor.extract_marker_lines(&doc, "设计变更通知单", 1).unwrap_err();
        assert!(matches!(err, ExtractError::Recognize { page: 2, .. }));
        assert!(!dir.path().join("D4_matches.csv").exists());
    }

    #[test]
    fn test_oversized_page_is_resource_guard() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.max_image_pixels = 100;
        let mut extractor = Extractor::new(FakeRasterizer::pages(1), FakeEngine::default(), cfg, logging::discard());

        let err = extractor
            .extract_marker_lines(&Document::from_path("/scans/E5.pdf"), "x", 1)
            .unwrap_err();
        assert!(err.is_resource_guard());
        assert!(matches!(TaskError::from(err), TaskError::ResourceGuard(_)));
    }

    #[test]
    fn test_auto_orient_rotates_and_tolerates_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.auto_orient = true;

        let mut engine = FakeEngine::with_texts(["a"]);
        engine.orientation = Some(Orientation::Deg90);
        let mut extractor = Extractor::new(FakeRasterizer::pages(1), engine, cfg.clone(), logging::discard());
        extractor
            .extract_regex_matches(&Document::from_path("/scans/F.pdf"), &Regex::new("a").unwrap(), 1)
            .unwrap();
        assert_eq!(extractor.engine.seen, vec![(10, 40)]);

        // 检测失败时使用原图
        let mut extractor = Extractor::new(FakeRasterizer::pages(1), FakeEngine::with_texts(["a"]), cfg, logging::discard());
        let matches = extractor
            .extract_regex_matches(&Document::from_path("/scans/G.pdf"), &Regex::new("a").unwrap(), 1)
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(extractor.engine.seen, vec![(40, 10)]);
    }

    #[test]
    fn test_extract_dispatches_on_search_mode() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::from_path("/scans/M.pdf");

        let search = SearchMode::Regex(r"CR-\d+".to_string()).compile().unwrap();
        let engine = FakeEngine::with_texts(["CR-1 CR-1", "CR-2"]);
        let mut extractor = Extractor::new(FakeRasterizer::pages(2), engine, config(dir.path()), logging::discard());
        let extracted = extractor.extract(&doc, &search, 1).unwrap();
        assert_eq!(
            extracted,
            Extracted::Set(["CR-1", "CR-2"].iter().map(|s| s.to_string()).collect())
        );

        let search = SearchMode::Marker("CR".to_string()).compile().unwrap();
        let engine = FakeEngine::with_texts(["none", "CR-2"]);
        let mut extractor = Extractor::new(FakeRasterizer::pages(2), engine, config(dir.path()), logging::discard());
        match extractor.extract(&doc, &search, 1).unwrap() {
            Extracted::Lines(lines) => assert_eq!(lines, vec![MatchRecord::new(&doc, 2, "CR-2")]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rasterize_failure_fails_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut rasterizer = FakeRasterizer::pages(2);
        rasterizer.fail = true;
        let mut extractor = Extractor::new(rasterizer, FakeEngine::default(), config(dir.path()), logging::discard());

        let err = extractor
            .extract_marker_lines(&Document::from_path("/scans/R.pdf"), "x", 1)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Rasterize(_)));
        assert!(!err.is_resource_guard());
        assert!(matches!(TaskError::from(err), TaskError::Failed(_)));
    }

    #[test]
    fn test_worker_uses_configured_marker() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::with_texts(["设计变更通知单 X"]);
        let mut extractor = Extractor::new(FakeRasterizer::pages(1), engine, config(dir.path()), logging::discard());
        let output = extractor.process(&Document::from_path("/scans/H.pdf")).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].text, "设计变更通知单 X");
    }
}
