//! 图片提取服务 - 业务能力层
//!
//! 只负责"把内嵌 JPEG 落盘"能力，不关心流程。

use crate::infrastructure::PdfDocument;
use crate::models::PageRange;
use crate::error::{AppError, AppResult};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// 图片提取结果
///
/// 空区间和"区间有效但没有匹配图片"是两种不同的结果，
/// 对外报告时必须区分。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// 请求区间归一化后为空
    EmptyRange,
    /// 区间有效，写出了 n 张图片（n 可以为 0）
    Saved(usize),
}

impl HarvestOutcome {
    /// 面向对话的状态描述
    pub fn status_message(&self, output_dir: &Path) -> String {
        match self {
            HarvestOutcome::EmptyRange => "页码区间为空，没有可提取的页面".to_string(),
            HarvestOutcome::Saved(0) => format!(
                "区间内没有找到 JPEG 图片 (目录: {})",
                output_dir.display()
            ),
            HarvestOutcome::Saved(count) => format!(
                "已提取 {} 张图片到 {}",
                count,
                output_dir.display()
            ),
        }
    }
}

/// 按区间提取内嵌 JPEG 图片
///
/// - 输出目录（含父目录）不存在则创建，已存在不算错误
/// - 只挑选派生名带 `.jpg` 标记的图片
/// - 文件名为 `page_{页号}_{原名}`，跨页同名不冲突；相同输入重复运行
///   会覆盖同名文件，结果集不变（幂等）
pub fn extract_images(
    document: &PdfDocument,
    range: Option<PageRange>,
    output_dir: impl AsRef<Path>,
) -> AppResult<HarvestOutcome> {
    let output_dir = output_dir.as_ref();

    let range = match range {
        Some(range) => range,
        None => {
            debug!("空页码区间，跳过图片提取: {}", document.path().display());
            return Ok(HarvestOutcome::EmptyRange);
        }
    };

    fs::create_dir_all(output_dir)
        .map_err(|e| AppError::write_failed(output_dir.to_string_lossy(), e))?;

    let mut saved = 0usize;
    for page_number in range.page_numbers() {
        for image in document.page_images(page_number) {
            if !image.name.contains(".jpg") {
                continue;
            }

            let file_name = format!("page_{}_{}", page_number, image.name);
            let out_path = output_dir.join(&file_name);
            fs::write(&out_path, &image.data)
                .map_err(|e| AppError::write_failed(out_path.to_string_lossy(), e))?;

            debug!("已写出图片: {}", out_path.display());
            saved += 1;
        }
    }

    info!(
        "图片提取完成: {} 张 ({} → {})",
        saved,
        document.path().display(),
        output_dir.display()
    );

    Ok(HarvestOutcome::Saved(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages_are_distinct() {
        let dir = Path::new("media_images");
        let empty = HarvestOutcome::EmptyRange.status_message(dir);
        let zero = HarvestOutcome::Saved(0).status_message(dir);
        let some = HarvestOutcome::Saved(3).status_message(dir);
        assert_ne!(empty, zero);
        assert_ne!(zero, some);
        assert!(some.contains('3'));
    }
}
