//! PDF rasterization for OCR.

mod error;
mod pdfium;

pub use error::RenderError;
pub use pdfium::PdfiumRasterizer;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 单页像素面积上限（与常见图像库的解压炸弹阈值一致）
pub const DEFAULT_MAX_PIXELS: u64 = 178_956_970;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub dpi: u32,
    /// 1-based
    pub start_page: u32,
    pub max_pixels: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: 300,
            start_page: 1,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// 渲染后的单页图像，识别完成后即丢弃
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 页码，从 1 开始
    pub page: u32,
    pub image: DynamicImage,
}

/// 将文档转换为按页排列的图像
///
/// 要么返回起始页之后的全部页面，要么返回错误；不会返回部分页面。
pub trait Rasterizer {
    fn rasterize(&self, path: &Path, options: &RenderOptions) -> Result<Vec<PageImage>, RenderError>;
}

/// PDF 默认 72 DPI，按目标 DPI 计算像素尺寸
pub fn target_size(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / 72.0;
    (
        (width_pt * scale).round().max(1.0) as u32,
        (height_pt * scale).round().max(1.0) as u32,
    )
}

/// 资源保护：拒绝像素面积超过上限的页面
pub fn check_pixel_area(page: u32, width: u32, height: u32, limit: u64) -> Result<(), RenderError> {
    if width as u64 * height as u64 > limit {
        return Err(RenderError::ImageTooLarge {
            page,
            width,
            height,
            limit,
        });
    }
    Ok(())
}
