//! 文本提取服务 - 业务能力层
//!
//! 只负责"按页取文本"能力，不关心流程。

use crate::infrastructure::PdfDocument;
use crate::models::PageRange;
use tracing::debug;

/// 按页提取的文本
///
/// 有序的 `(物理页号, 文本)` 序列，页号基于 1，与请求区间的偏移无关。
/// 一经产出即不可变。
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pages: Vec<(u32, String)>,
}

impl ExtractedText {
    /// 页序列
    pub fn pages(&self) -> &[(u32, String)] {
        &self.pages
    }

    /// 是否为空结果（空区间或零页）
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// 拼接为带页标记的文本
    ///
    /// 每页前插入 `--- Page N ---` 分隔标记。
    pub fn render(&self) -> String {
        let mut text = String::new();
        for (page_number, page_text) in &self.pages {
            text.push_str(&format!("\n\n--- Page {} ---\n\n", page_number));
            text.push_str(page_text);
        }
        text
    }
}

/// 按区间提取文本
///
/// 空区间（`None`）产出空结果，不报错。单页提取失败记为空字符串，
/// 页号仍然保留，保证序列与物理分页一致。
pub fn extract_text(document: &PdfDocument, range: Option<PageRange>) -> ExtractedText {
    let range = match range {
        Some(range) => range,
        None => {
            debug!("空页码区间，返回空文本结果: {}", document.path().display());
            return ExtractedText { pages: Vec::new() };
        }
    };

    let mut pages = Vec::with_capacity(range.len());
    for page_number in range.page_numbers() {
        let text = document.page_text(page_number);
        pages.push((page_number, text));
    }

    debug!(
        "文本提取完成: {} 页 ({})",
        pages.len(),
        document.path().display()
    );

    ExtractedText { pages }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_interleaves_page_markers() {
        let extracted = ExtractedText {
            pages: vec![
                (3, "第三页".to_string()),
                (4, "第四页".to_string()),
            ],
        };
        let rendered = extracted.render();
        assert!(rendered.contains("--- Page 3 ---"));
        assert!(rendered.contains("--- Page 4 ---"));
        let pos3 = rendered.find("--- Page 3 ---").unwrap();
        let pos4 = rendered.find("--- Page 4 ---").unwrap();
        assert!(pos3 < pos4);
    }

    #[test]
    fn test_render_empty_result_is_empty_string() {
        let extracted = ExtractedText { pages: Vec::new() };
        assert!(extracted.is_empty());
        assert_eq!(extracted.render(), "");
    }
}
