//! OCR 共享类型定义

use serde::{Deserialize, Serialize};

/// Tesseract 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TesseractConfig {
    /// Tesseract 可执行文件路径
    pub binary_path: Option<String>,
    /// tessdata 目录路径
    pub tessdata_path: Option<String>,
    /// 页面分割模式 (0-13)，未设置时使用 tesseract 默认值
    pub psm: Option<u8>,
    /// OCR 引擎模式 (0-3)，未设置时使用 tesseract 默认值
    pub oem: Option<u8>,
}

impl TesseractConfig {
    pub fn binary_or_default(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("tesseract")
    }
}
