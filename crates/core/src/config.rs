//! 提取配置
//!
//! 每个 worker 都从这份可序列化的配置快照重新构建自己的提取器。

use scanmatch_ocr::TesseractConfig;
use scanmatch_render::{RenderOptions, DEFAULT_MAX_PIXELS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MARKER: &str = "设计变更通知单";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub dpi: u32,
    pub ocr_language: String,
    /// 每份文档结果表的输出目录
    pub output_directory: PathBuf,
    pub marker: String,
    /// 1-based
    pub start_page: u32,
    /// 识别前先做方向检测
    pub auto_orient: bool,
    pub max_image_pixels: u64,
    pub tesseract: TesseractConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            ocr_language: "chi_sim".to_string(),
            output_directory: PathBuf::from("./output"),
            marker: DEFAULT_MARKER.to_string(),
            start_page: 1,
            auto_orient: false,
            max_image_pixels: DEFAULT_MAX_PIXELS,
            tesseract: TesseractConfig::default(),
        }
    }
}

impl ExtractConfig {
    pub fn render_options(&self, start_page: u32) -> RenderOptions {
        RenderOptions {
            dpi: self.dpi,
            start_page,
            max_pixels: self.max_image_pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_follow_config() {
        let config = ExtractConfig {
            dpi: 200,
            max_image_pixels: 1_000,
            ..ExtractConfig::default()
        };
        let options = config.render_options(2);
        assert_eq!(options.dpi, 200);
        assert_eq!(options.start_page, 2);
        assert_eq!(options.max_pixels, 1_000);
    }
}
