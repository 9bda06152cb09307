//! Tesseract OCR 引擎实现（CLI 包装）

use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::orientation::{parse_osd, Orientation};
use crate::types::TesseractConfig;

/// Tesseract OCR 引擎
pub struct TesseractEngine {
    config: TesseractConfig,
    version: String,
    logger: Arc<dyn log::Log>,
}

impl TesseractEngine {
    /// 创建 Tesseract 引擎（会先验证可执行文件可用）
    pub fn new(config: TesseractConfig, logger: Arc<dyn log::Log>) -> Result<Self, OcrError> {
        let version = get_tesseract_version(config.binary_or_default())?;

        log::debug!(logger: logger, "[Tesseract] 初始化成功，版本: {}", version);

        Ok(Self {
            config,
            version,
            logger,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// 已安装的语言列表
    pub fn available_languages(&self) -> Result<Vec<String>, OcrError> {
        get_tesseract_langs(
            self.config.binary_or_default(),
            self.config.tessdata_path.as_deref(),
        )
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.config.binary_or_default());
        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }
        cmd
    }

    /// 保存图片到独立的临时文件后执行 tesseract，返回 stdout
    fn run_on_image(&self, img: &DynamicImage, args: &[String]) -> Result<String, OcrError> {
        let temp_input = tempfile::Builder::new()
            .prefix("scanmatch_page_")
            .suffix(".png")
            .tempfile()?;

        img.save_with_format(temp_input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::ImageProcess(format!("保存临时图片失败: {}", e)))?;

        self.run(temp_input.path(), args)
    }

    fn run(&self, image_path: &Path, args: &[String]) -> Result<String, OcrError> {
        let mut cmd = self.command();
        cmd.arg(image_path).arg("stdout").args(args);

        log::debug!(
            logger: self.logger,
            "[Tesseract] 执行: {} {} stdout {}",
            self.config.binary_or_default(),
            image_path.display(),
            args.join(" ")
        );

        let output = cmd.output().map_err(|source| OcrError::Spawn {
            binary: self.config.binary_or_default().to_string(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }
        if !stderr.trim().is_empty() {
            log::debug!(logger: self.logger, "[Tesseract] stderr: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn recognition_args(&self, lang: &str) -> Vec<String> {
        let mut args = vec!["-l".to_string(), lang.to_string()];
        if let Some(psm) = self.config.psm {
            args.push("--psm".to_string());
            args.push(psm.to_string());
        }
        if let Some(oem) = self.config.oem {
            args.push("--oem".to_string());
            args.push(oem.to_string());
        }
        args
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize_image(&mut self, img: &DynamicImage, lang: &str) -> Result<String, OcrError> {
        let start = Instant::now();
        let text = self.run_on_image(img, &self.recognition_args(lang))?;

        log::debug!(
            logger: self.logger,
            "[Tesseract] 识别完成，耗时: {} ms，字符数: {}",
            start.elapsed().as_millis(),
            text.chars().count()
        );

        Ok(text)
    }

    fn detect_orientation(&mut self, img: &DynamicImage) -> Result<Orientation, OcrError> {
        // 低阈值 OSD：少量文字也尝试判断方向
        let args = ["--psm", "0", "-c", "min_characters_to_try=5"].map(String::from);
        let output = self.run_on_image(img, &args)?;
        parse_osd(&output)
    }
}

/// 获取 Tesseract 版本
pub fn get_tesseract_version(binary_path: &str) -> Result<String, OcrError> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|source| OcrError::Spawn {
            binary: binary_path.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(OcrError::Failed("tesseract --version 执行失败".to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(parse_version(&format!("{}{}", stdout, stderr)))
}

/// 解析版本号（通常在第一行，格式 "tesseract 5.3.0" 或 "tesseract v5.3.0"）
fn parse_version(output: &str) -> String {
    output
        .lines()
        .filter(|line| line.contains("tesseract"))
        .find_map(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 获取 Tesseract 可用语言列表
pub fn get_tesseract_langs(
    binary_path: &str,
    tessdata_path: Option<&str>,
) -> Result<Vec<String>, OcrError> {
    let mut cmd = Command::new(binary_path);
    cmd.arg("--list-langs");

    if let Some(path) = tessdata_path {
        cmd.env("TESSDATA_PREFIX", path);
    }

    let output = cmd.output().map_err(|source| OcrError::Spawn {
        binary: binary_path.to_string(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(parse_language_list(&format!("{}{}", stdout, stderr)))
}

fn parse_language_list(output: &str) -> Vec<String> {
    let mut langs = Vec::new();
    let mut found_list = false;

    for line in output.lines() {
        let line = line.trim();
        if line.contains("List of available languages") || line.contains("traineddata") {
            found_list = true;
            continue;
        }
        if found_list && !line.is_empty() && !line.contains(':') {
            langs.push(line.to_string());
        }
    }

    langs
}

/// 检查组合语言（如 "chi_sim+eng"）中缺失的语言
pub fn missing_languages(requested: &str, available: &[String]) -> Vec<String> {
    requested
        .split('+')
        .map(str::trim)
        .filter(|lang| !lang.is_empty() && !available.iter().any(|a| a == lang))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_variants() {
        assert_eq!(parse_version("tesseract 5.3.0\n leptonica-1.82.0"), "5.3.0");
        assert_eq!(parse_version("tesseract v4.1.1\n"), "4.1.1");
        assert_eq!(parse_version("garbage"), "unknown");
    }

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\nchi_sim\neng\nosd\n";
        assert_eq!(parse_language_list(output), vec!["chi_sim", "eng", "osd"]);
    }

    #[test]
    fn test_missing_languages() {
        let available = vec!["chi_sim".to_string(), "osd".to_string()];
        assert!(missing_languages("chi_sim", &available).is_empty());
        assert_eq!(missing_languages("chi_sim+eng", &available), vec!["eng"]);
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let err = get_tesseract_version("/nonexistent/tesseract-binary").unwrap_err();
        assert!(matches!(err, OcrError::Spawn { .. }));
    }
}
