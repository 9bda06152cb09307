//! OCR 引擎 trait 定义

use crate::error::OcrError;
use crate::orientation::Orientation;
use image::DynamicImage;

/// OCR 引擎统一 trait
///
/// 每个 worker 持有自己的引擎实例，因此方法使用 `&mut self`。
pub trait OcrEngine: Send {
    /// 识别整页图片，返回纯文本（可能为空）
    fn recognize_image(&mut self, img: &DynamicImage, lang: &str) -> Result<String, OcrError>;

    /// 检测页面方向（返回需要顺时针旋转的角度）
    fn detect_orientation(&mut self, img: &DynamicImage) -> Result<Orientation, OcrError>;
}
