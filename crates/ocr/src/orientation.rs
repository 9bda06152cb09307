//! 页面方向检测结果与旋转校正

use crate::error::OcrError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// 页面需要顺时针旋转的角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Orientation::Deg0),
            90 => Some(Orientation::Deg90),
            180 => Some(Orientation::Deg180),
            270 => Some(Orientation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    /// 按检测结果顺时针旋转图片
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Deg0 => img,
            Orientation::Deg90 => img.rotate90(),
            Orientation::Deg180 => img.rotate180(),
            Orientation::Deg270 => img.rotate270(),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// 解析 `tesseract --psm 0` 的 OSD 输出
///
/// 输出格式：
/// ```text
/// Page number: 0
/// Orientation in degrees: 270
/// Rotate: 90
/// Orientation confidence: 1.23
/// ```
pub fn parse_osd(output: &str) -> Result<Orientation, OcrError> {
    let rotate = output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Rotate:"))
        .ok_or_else(|| OcrError::Orientation("OSD 输出中没有 Rotate 字段".to_string()))?;

    let degrees: i32 = rotate
        .trim()
        .parse()
        .map_err(|_| OcrError::Orientation(format!("无法解析旋转角度: {}", rotate.trim())))?;

    Orientation::from_degrees(degrees)
        .ok_or_else(|| OcrError::Orientation(format!("不支持的旋转角度: {}", degrees)))
}
