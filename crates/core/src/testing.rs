//! 测试用的假光栅化器与假 OCR 引擎

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use scanmatch_ocr::{OcrEngine, OcrError, Orientation};
use scanmatch_render::{check_pixel_area, PageImage, Rasterizer, RenderError, RenderOptions};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

/// 每份文档固定页数的光栅化器
///
/// 页码写在每页左上角像素的红色通道里，供 [`FakeEngine::by_page`] 读取。
pub struct FakeRasterizer {
    pub page_count: u32,
    pub width: u32,
    pub height: u32,
    pub fail: bool,
}

impl FakeRasterizer {
    pub fn pages(page_count: u32) -> Self {
        Self {
            page_count,
            width: 40,
            height: 10,
            fail: false,
        }
    }
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, path: &Path, options: &RenderOptions) -> Result<Vec<PageImage>, RenderError> {
        if self.fail {
            return Err(RenderError::Load {
                path: path.display().to_string(),
                message: "broken".to_string(),
            });
        }
        let mut pages = Vec::new();
        for page in options.start_page..=self.page_count {
            check_pixel_area(page, self.width, self.height, options.max_pixels)?;
            let mut image = RgbImage::new(self.width, self.height);
            if self.width > 0 && self.height > 0 {
                image.put_pixel(0, 0, Rgb([page as u8, 0, 0]));
            }
            pages.push(PageImage {
                page,
                image: DynamicImage::ImageRgb8(image),
            });
        }
        Ok(pages)
    }
}

/// 依次返回预设文本的引擎；设置了 `page_texts` 时按页码取文本
#[derive(Default)]
pub struct FakeEngine {
    pub texts: VecDeque<Result<String, String>>,
    pub page_texts: BTreeMap<u32, String>,
    pub orientation: Option<Orientation>,
    /// 每次识别时收到的图片尺寸
    pub seen: Vec<(u32, u32)>,
}

impl FakeEngine {
    pub fn with_texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self {
            texts: texts.into_iter().map(|t| Ok(t.into())).collect(),
            ..Self::default()
        }
    }

    pub fn by_page<S: Into<String>>(pages: impl IntoIterator<Item = (u32, S)>) -> Self {
        Self {
            page_texts: pages.into_iter().map(|(page, t)| (page, t.into())).collect(),
            ..Self::default()
        }
    }
}

fn stamped_page(img: &DynamicImage) -> u32 {
    if img.width() == 0 || img.height() == 0 {
        return 0;
    }
    img.get_pixel(0, 0).0[0] as u32
}

impl OcrEngine for FakeEngine {
    fn recognize_image(&mut self, img: &DynamicImage, _lang: &str) -> Result<String, OcrError> {
        self.seen.push(img.dimensions());
        if !self.page_texts.is_empty() {
            return Ok(self.page_texts.get(&stamped_page(img)).cloned().unwrap_or_default());
        }
        match self.texts.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(OcrError::Failed(message)),
            None => Ok(String::new()),
        }
    }

    fn detect_orientation(&mut self, _img: &DynamicImage) -> Result<Orientation, OcrError> {
        self.orientation
            .ok_or_else(|| OcrError::Orientation("Too few characters".to_string()))
    }
}
