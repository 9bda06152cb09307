//! 工具配置
//!
//! 一份键值配置文件（YAML/JSON/TOML，按扩展名识别）供四个工具共用，
//! 每个工具只读取自己需要的键。

use scanmatch_core::ExtractConfig;
use scanmatch_ocr::TesseractConfig;
use scanmatch_render::DEFAULT_MAX_PIXELS;
use scanmatch_rules::PatternList;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("配置文件未找到: {}", .0.display())]
    NotFound(PathBuf),
    #[error("配置文件格式错误: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pdf_directory: Option<PathBuf>,
    pub output_directory: PathBuf,
    pub ocr_language: String,
    pub dpi: u32,
    pub marker: String,
    /// 重命名用的候选正则（单个或列表），按顺序尝试
    pub content_regex: PatternList,
    pub filename_regex: Option<String>,
    /// 未设置时使用各工具自己的默认值
    pub start_page: Option<u32>,
    pub auto_orient: bool,
    pub log_file: Option<PathBuf>,
    pub matches_csv: Option<PathBuf>,
    pub max_image_pixels: u64,
    pub workers: Option<usize>,
    /// 按名称复制的匹配字符串清单
    pub file_txt: Option<PathBuf>,
    pub target_directories: Vec<PathBuf>,
    pub tesseract: TesseractConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let extract = ExtractConfig::default();
        Self {
            pdf_directory: None,
            output_directory: extract.output_directory,
            ocr_language: extract.ocr_language,
            dpi: extract.dpi,
            marker: extract.marker,
            content_regex: PatternList::default(),
            filename_regex: None,
            start_page: None,
            auto_orient: false,
            log_file: None,
            matches_csv: None,
            max_image_pixels: DEFAULT_MAX_PIXELS,
            workers: None,
            file_txt: None,
            target_directories: Vec::new(),
            tesseract: TesseractConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// 提取器配置快照
    pub fn extract_config(&self, default_start_page: u32) -> ExtractConfig {
        ExtractConfig {
            dpi: self.dpi,
            ocr_language: self.ocr_language.clone(),
            output_directory: self.output_directory.clone(),
            marker: self.marker.clone(),
            start_page: self.start_page.unwrap_or(default_start_page),
            auto_orient: self.auto_orient,
            max_image_pixels: self.max_image_pixels,
            tesseract: self.tesseract.clone(),
        }
    }

    pub fn log_file_or(&self, default: &str) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(default))
    }

    /// 汇总结果表路径，默认 `<output_directory>/matches.csv`
    pub fn matches_csv(&self) -> PathBuf {
        self.matches_csv
            .clone()
            .unwrap_or_else(|| self.output_directory.join("matches.csv"))
    }
}
