//! 基于 pdfium-render 的光栅化实现

use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::{check_pixel_area, target_size, PageImage, Rasterizer, RenderError, RenderOptions};

/// 获取 pdfium 库的搜索路径
fn get_pdfium_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            // 可执行文件同级的 libs 目录
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());
        }
    }

    // 本地开发
    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));

    paths
}

/// 尝试绑定 pdfium 库
fn bind_pdfium(logger: &Arc<dyn log::Log>) -> Result<Pdfium, RenderError> {
    for path in &get_pdfium_search_paths() {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(path);
        log::debug!(logger: logger, "[Render] 尝试加载 pdfium: {:?}", lib_path);

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            log::debug!(logger: logger, "[Render] 成功从 {:?} 加载 pdfium", path);
            return Ok(Pdfium::new(bindings));
        }
    }

    log::debug!(logger: logger, "[Render] 尝试加载系统 pdfium 库");
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| RenderError::Library(e.to_string()))
}

/// 进程内只绑定一次；`Pdfium` 析构时会关闭整个库，因此从不释放
static PDFIUM: OnceLock<Result<Pdfium, String>> = OnceLock::new();

fn shared_pdfium(logger: &Arc<dyn log::Log>) -> Result<&'static Pdfium, RenderError> {
    match PDFIUM.get_or_init(|| bind_pdfium(logger).map_err(|e| e.to_string())) {
        Ok(pdfium) => Ok(pdfium),
        Err(message) => Err(RenderError::Library(message.clone())),
    }
}

/// pdfium 光栅化器；各 worker 共享同一个库绑定，调用由 pdfium-render 串行化
pub struct PdfiumRasterizer {
    pdfium: &'static Pdfium,
    logger: Arc<dyn log::Log>,
}

impl PdfiumRasterizer {
    pub fn new(logger: Arc<dyn log::Log>) -> Result<Self, RenderError> {
        let pdfium = shared_pdfium(&logger)?;
        Ok(Self { pdfium, logger })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, path: &Path, options: &RenderOptions) -> Result<Vec<PageImage>, RenderError> {
        if options.start_page == 0 {
            return Err(RenderError::InvalidStartPage(0));
        }

        log::info!(
            logger: self.logger,
            "[Render] 开始将 PDF 文件 {} 转换为图像（从第 {} 页开始）...",
            path.display(),
            options.start_page
        );
        let start = Instant::now();

        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| RenderError::Load {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let page_count = document.pages().len() as u32;
        let first_index = options.start_page - 1;

        // 先检查所有页面的尺寸，超限则整份文档拒绝处理
        let mut targets = Vec::new();
        for index in first_index..page_count {
            let page_number = index + 1;
            let page = document
                .pages()
                .get(index as PdfPageIndex)
                .map_err(|e| RenderError::Page {
                    page: page_number,
                    message: e.to_string(),
                })?;

            let (width, height) = target_size(page.width().value, page.height().value, options.dpi);
            check_pixel_area(page_number, width, height, options.max_pixels)?;
            targets.push((index, width, height));
        }

        let mut images = Vec::with_capacity(targets.len());
        for (index, width, height) in targets {
            let page_number = index + 1;
            let page_error = |e: PdfiumError| RenderError::Page {
                page: page_number,
                message: e.to_string(),
            };

            let page = document.pages().get(index as PdfPageIndex).map_err(page_error)?;

            let render_config = PdfRenderConfig::new()
                .set_target_width(width as Pixels)
                .set_target_height(height as Pixels);

            let bitmap = page.render_with_config(&render_config).map_err(page_error)?;

            images.push(PageImage {
                page: page_number,
                image: DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8()),
            });
        }

        log::info!(
            logger: self.logger,
            "[Render] PDF 文件 {} 成功转换为 {} 张图像，耗时 {} ms",
            path.display(),
            images.len(),
            start.elapsed().as_millis()
        );

        Ok(images)
    }
}
