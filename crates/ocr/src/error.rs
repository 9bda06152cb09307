//! OCR 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("无法执行 tesseract ({binary}): {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tesseract 执行失败: {0}")]
    Failed(String),

    #[error("图像处理失败: {0}")]
    ImageProcess(String),

    #[error("方向检测失败: {0}")]
    Orientation(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
