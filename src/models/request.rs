//! 提取请求
//!
//! 一次运行需要的全部输入。路径和区间都在这里显式传入，
//! 不依赖任何模块级默认值。

use crate::config::Config;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::path::Path;

/// 一次提取运行的请求
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRequest {
    /// 试卷 PDF 路径
    pub exam_pdf_path: String,
    /// 答案 PDF 路径（可选；不存在不算错误）
    #[serde(default)]
    pub answer_key_pdf_path: Option<String>,
    /// 试卷起始页（含，基于 0）
    #[serde(default)]
    pub exam_start_page: Option<i64>,
    /// 试卷结束页（不含）
    #[serde(default)]
    pub exam_end_page: Option<i64>,
    /// 图片输出目录（缺省使用配置里的约定名）
    #[serde(default)]
    pub image_output_dir: Option<String>,
}

impl ExtractionRequest {
    /// 用配置里的默认输入构建请求
    pub fn from_config(config: &Config) -> Self {
        Self {
            exam_pdf_path: config.exam_pdf_path.clone(),
            answer_key_pdf_path: Some(config.answer_key_pdf_path.clone()),
            exam_start_page: None,
            exam_end_page: None,
            image_output_dir: Some(config.image_output_dir.clone()),
        }
    }

    /// 从 TOML 请求文件加载
    pub fn load_toml(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::read_failed(path.to_string_lossy(), e))?;
        let request: Self = toml::from_str(&content)?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_toml_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.toml");
        std::fs::write(
            &path,
            r#"
exam_pdf_path = "pdfs/exam.pdf"
answer_key_pdf_path = "pdfs/answer_key.pdf"
exam_start_page = 0
exam_end_page = 3
"#,
        )
        .unwrap();

        let request = ExtractionRequest::load_toml(&path).unwrap();
        assert_eq!(request.exam_pdf_path, "pdfs/exam.pdf");
        assert_eq!(request.exam_start_page, Some(0));
        assert_eq!(request.exam_end_page, Some(3));
        assert!(request.image_output_dir.is_none());
    }

    #[test]
    fn test_load_toml_missing_file() {
        let result = ExtractionRequest::load_toml("no_such_request.toml");
        assert!(result.is_err());
    }
}
