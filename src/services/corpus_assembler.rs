//! 语料组装服务 - 业务能力层
//!
//! 把试卷文本和（可选的）答案文本拼成一份语料并落盘。

use crate::error::{AppError, AppResult};
use crate::infrastructure::PdfDocument;
use crate::models::PageRange;
use crate::services::text_extractor::extract_text;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 试卷内容与答案内容之间的分隔标记
pub const ANSWER_KEY_SEPARATOR: &str = "\n\n--- Answer Key ---\n\n";

/// 语料组装器
///
/// 职责：
/// - 对试卷按请求区间提取文本
/// - 答案文件存在时整本提取并追加在分隔标记之后；不存在不算错误
/// - 落盘到工作目录下按试卷文件名确定性命名的文本文件
pub struct CorpusAssembler {
    work_dir: PathBuf,
}

impl CorpusAssembler {
    /// 创建语料组装器
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// 组装语料文本
    ///
    /// 文档句柄在本调用内打开并在返回前释放，包括出错路径。
    pub fn assemble(
        &self,
        exam_path: &Path,
        answer_key_path: Option<&Path>,
        exam_start_page: Option<i64>,
        exam_end_page: Option<i64>,
    ) -> AppResult<String> {
        let exam_document = PdfDocument::open(exam_path)?;
        let exam_range = PageRange::resolve(
            exam_start_page,
            exam_end_page,
            exam_document.page_count(),
        );
        let mut corpus = extract_text(&exam_document, exam_range).render();
        drop(exam_document);

        match answer_key_path {
            Some(key_path) if key_path.exists() => {
                let key_document = PdfDocument::open(key_path)?;
                // 答案整本提取，不受试卷区间限制
                let key_range = PageRange::resolve(None, None, key_document.page_count());
                let key_text = extract_text(&key_document, key_range).render();
                corpus.push_str(ANSWER_KEY_SEPARATOR);
                corpus.push_str(&key_text);
            }
            Some(key_path) => {
                warn!("答案文件不存在，语料只含试卷内容: {}", key_path.display());
            }
            None => {
                debug!("未提供答案文件，语料只含试卷内容");
            }
        }

        Ok(corpus)
    }

    /// 组装语料并落盘，返回语料文件路径
    ///
    /// 文件名由试卷文件名确定性派生，相同输入重复运行覆盖同一文件。
    pub fn assemble_to_file(
        &self,
        exam_path: &Path,
        answer_key_path: Option<&Path>,
        exam_start_page: Option<i64>,
        exam_end_page: Option<i64>,
    ) -> AppResult<PathBuf> {
        let corpus = self.assemble(exam_path, answer_key_path, exam_start_page, exam_end_page)?;

        fs::create_dir_all(&self.work_dir)
            .map_err(|e| AppError::write_failed(self.work_dir.to_string_lossy(), e))?;

        let exam_stem = exam_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "exam".to_string());
        let corpus_path = self.work_dir.join(format!("{}_corpus.txt", exam_stem));

        fs::write(&corpus_path, &corpus)
            .map_err(|e| AppError::write_failed(corpus_path.to_string_lossy(), e))?;

        info!(
            "语料已写出: {} ({} 字符)",
            corpus_path.display(),
            corpus.chars().count()
        );

        Ok(corpus_path)
    }
}
