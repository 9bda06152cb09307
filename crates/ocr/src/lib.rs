//! 页面文字识别
//!
//! 将整页图片识别为纯文本。默认实现包装 Tesseract CLI，
//! 可选地先做一次 OSD 方向检测并旋转校正。

mod engine;
mod error;
mod orientation;
mod tesseract;
mod types;

pub use engine::OcrEngine;
pub use error::OcrError;
pub use orientation::{parse_osd, Orientation};
pub use tesseract::{get_tesseract_langs, get_tesseract_version, missing_languages, TesseractEngine};
pub use types::TesseractConfig;
