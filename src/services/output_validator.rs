//! 输出校验服务 - 业务能力层
//!
//! 把控制循环的最终回复解析成题目记录数组并落盘。
//! 解析失败时绝不丢弃原始文本：写出诊断文件并把原文带在错误里，
//! 供人工排查推理服务到底返回了什么。

use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AppError, AppResult, OutputError};
use crate::models::QuestionRecord;

/// 输出校验器
pub struct OutputValidator {
    output_path: PathBuf,
}

impl OutputValidator {
    /// 创建输出校验器
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// 最终产物路径
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// 校验最终回复并持久化
    ///
    /// 接受单对象（历史单题变体）和数组两种形态。成功时写出
    /// 缩进稳定、非 ASCII 字符原样保留的 UTF-8 JSON；失败时写出
    /// 原始文本诊断文件并返回 `OutputError`。
    pub fn validate_and_persist(&self, raw_text: &str) -> AppResult<Vec<QuestionRecord>> {
        let records = match self.parse(raw_text) {
            Ok(records) => records,
            Err(err) => {
                self.persist_diagnostic(raw_text);
                return Err(err);
            }
        };

        let json = serde_json::to_string_pretty(&records).map_err(|e| {
            AppError::Output(OutputError::ParseFailed {
                raw_text: raw_text.to_string(),
                source: Box::new(e),
            })
        })?;

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::write_failed(parent.to_string_lossy(), e))?;
            }
        }
        fs::write(&self.output_path, json + "\n")
            .map_err(|e| AppError::write_failed(self.output_path.to_string_lossy(), e))?;

        info!(
            "✓ 结构化产物已写出: {} ({} 道题)",
            self.output_path.display(),
            records.len()
        );

        Ok(records)
    }

    /// 解析并校验，不落盘
    fn parse(&self, raw_text: &str) -> AppResult<Vec<QuestionRecord>> {
        let normalized = strip_code_fences(raw_text);

        let value: Value = serde_json::from_str(normalized.trim()).map_err(|e| {
            AppError::Output(OutputError::ParseFailed {
                raw_text: raw_text.to_string(),
                source: Box::new(e),
            })
        })?;

        // 单对象视作单元素数组（历史单题变体）
        let array = match value {
            Value::Array(items) => items,
            Value::Object(_) => vec![value],
            _ => {
                return Err(AppError::Output(OutputError::SchemaMismatch {
                    raw_text: raw_text.to_string(),
                    reason: "顶层既不是数组也不是对象".to_string(),
                }));
            }
        };

        let mut records = Vec::with_capacity(array.len());
        for item in array {
            let record: QuestionRecord = serde_json::from_value(item).map_err(|e| {
                AppError::Output(OutputError::ParseFailed {
                    raw_text: raw_text.to_string(),
                    source: Box::new(e),
                })
            })?;

            if let Err(reason) = record.validate() {
                return Err(AppError::Output(OutputError::SchemaMismatch {
                    raw_text: raw_text.to_string(),
                    reason,
                }));
            }

            records.push(record);
        }

        Ok(records)
    }

    /// 写出解析失败的原始文本
    fn persist_diagnostic(&self, raw_text: &str) {
        let diagnostic_path = self.output_path.with_extension("raw.txt");
        match fs::write(&diagnostic_path, raw_text) {
            Ok(_) => warn!(
                "⚠️ 最终输出校验失败，原始文本已保存: {}",
                diagnostic_path.display()
            ),
            Err(e) => warn!(
                "⚠️ 最终输出校验失败，且诊断文件写入失败 ({}): {}",
                diagnostic_path.display(),
                e
            ),
        }
    }
}

/// 去掉回复首尾的意外代码围栏
///
/// 指令已要求不输出围栏，这里只兜底处理明显的 ```json ... ``` 包裹。
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let fence = Regex::new(r"^```(?:json)?\s*([\s\S]*?)\s*```$").ok();
    match fence.and_then(|re| {
        re.captures(trimmed)
            .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
    }) {
        Some(inner) => inner,
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array_payload() -> &'static str {
        r#"[{
            "question": "第 1 题",
            "image": false,
            "passage_text": "",
            "sources": ["课本 P12"],
            "statement": "中国的首都是哪里？",
            "options": {"A": "北京", "B": "上海", "C": "广州", "D": "深圳"},
            "correct_option": "A"
        }]"#
    }

    #[test]
    fn test_accepts_array_payload_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("final_output.json");
        let validator = OutputValidator::new(&output);

        let records = validator.validate_and_persist(array_payload()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].correct_option, "A");

        let written = fs::read_to_string(&output).unwrap();
        // 非 ASCII 字符原样保留
        assert!(written.contains("北京"));
        assert!(!written.contains("\\u"));
    }

    #[test]
    fn test_accepts_single_object_payload() {
        let dir = tempfile::tempdir().unwrap();
        let validator = OutputValidator::new(dir.path().join("out.json"));

        let single = r#"{
            "question": "第 1 题",
            "image": true,
            "statement": "看图回答",
            "options": {"A": "1", "B": "2", "C": "3", "D": "4"},
            "correct_option": "D"
        }"#;
        let records = validator.validate_and_persist(single).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_accepts_fenced_payload() {
        let dir = tempfile::tempdir().unwrap();
        let validator = OutputValidator::new(dir.path().join("out.json"));

        let fenced = format!("```json\n{}\n```", array_payload());
        let records = validator.validate_and_persist(&fenced).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_rejects_missing_correct_option_and_keeps_raw() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("final_output.json");
        let validator = OutputValidator::new(&output);

        let raw = r#"[{
            "question": "第 1 题",
            "image": false,
            "statement": "残缺记录",
            "options": {"A": "1", "B": "2", "C": "3", "D": "4"}
        }]"#;
        let err = validator.validate_and_persist(raw).unwrap_err();

        match err {
            AppError::Output(output_err) => {
                assert!(output_err.raw_text().contains("残缺记录"));
            }
            other => panic!("期望输出错误，得到: {}", other),
        }

        // 没有有效产物，只有诊断文件
        assert!(!output.exists());
        assert!(output.with_extension("raw.txt").exists());
    }

    #[test]
    fn test_rejects_correct_option_absent_from_options() {
        let dir = tempfile::tempdir().unwrap();
        let validator = OutputValidator::new(dir.path().join("out.json"));

        let raw = r#"[{
            "question": "第 2 题",
            "image": false,
            "statement": "五选一",
            "options": {"A": "1", "B": "2", "C": "3", "D": "4"},
            "correct_option": "E"
        }]"#;
        let err = validator.validate_and_persist(raw).unwrap_err();
        assert!(matches!(
            err,
            AppError::Output(OutputError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_non_array_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let validator = OutputValidator::new(dir.path().join("out.json"));

        let err = validator.validate_and_persist("\"não é um array\"").unwrap_err();
        assert!(matches!(
            err,
            AppError::Output(OutputError::SchemaMismatch { .. })
        ));
    }
}
