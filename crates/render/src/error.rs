//! 渲染错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Pdfium 库不可用: {0}")]
    Library(String),

    #[error("加载 PDF 失败 {path}: {message}")]
    Load { path: String, message: String },

    #[error("渲染第 {page} 页失败: {message}")]
    Page { page: u32, message: String },

    #[error("第 {page} 页图像过大: {width}x{height} 像素超过上限 {limit}")]
    ImageTooLarge {
        page: u32,
        width: u32,
        height: u32,
        limit: u64,
    },

    #[error("起始页必须从 1 开始，收到 {0}")]
    InvalidStartPage(u32),
}

impl RenderError {
    /// 是否为资源保护拒绝（而非一般错误）
    pub fn is_resource_guard(&self) -> bool {
        matches!(self, RenderError::ImageTooLarge { .. })
    }
}
