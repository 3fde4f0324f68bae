//! 题目记录模型
//!
//! 最终结构化产物的 schema 单元：每道选择题一条记录。

use serde::{Deserialize, Serialize};

/// 选项集合
///
/// A-D 必填，E 为五选一题型预留。序列化时缺失的 E 不输出。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
    #[serde(rename = "E", skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl QuestionOptions {
    /// 字母对应的选项是否存在
    pub fn has(&self, letter: &str) -> bool {
        match letter {
            "A" | "B" | "C" | "D" => true,
            "E" => self.e.is_some(),
            _ => false,
        }
    }
}

/// 单道题目的结构化记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// 题目编号/标识（如 "Questão 12" / "第 3 题"）
    pub question: String,
    /// 题目是否引用图片
    pub image: bool,
    /// 题目所附的阅读材料（没有则为空字符串）
    #[serde(default)]
    pub passage_text: String,
    /// 引用来源列表（没有则为空列表，绝不为 null）
    #[serde(default)]
    pub sources: Vec<String>,
    /// 题干
    pub statement: String,
    /// 选项
    pub options: QuestionOptions,
    /// 正确选项字母
    pub correct_option: String,
}

impl QuestionRecord {
    /// 校验单条记录是否满足 schema 不变量
    ///
    /// - `correct_option` 必须是 A-E 之一
    /// - 对应选项必须实际存在
    pub fn validate(&self) -> Result<(), String> {
        let letter = self.correct_option.trim();
        if !matches!(letter, "A" | "B" | "C" | "D" | "E") {
            return Err(format!(
                "题目 {} 的 correct_option 非法: {:?}",
                self.question, self.correct_option
            ));
        }
        if !self.options.has(letter) {
            return Err(format!(
                "题目 {} 的 correct_option {} 不在选项中",
                self.question, letter
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> QuestionRecord {
        QuestionRecord {
            question: "第 1 题".to_string(),
            image: false,
            passage_text: String::new(),
            sources: Vec::new(),
            statement: "中国的首都是哪里？".to_string(),
            options: QuestionOptions {
                a: "北京".to_string(),
                b: "上海".to_string(),
                c: "广州".to_string(),
                d: "深圳".to_string(),
                e: None,
            },
            correct_option: "A".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_record() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_letter() {
        let mut record = sample_record();
        record.correct_option = "F".to_string();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_absent_option_e() {
        let mut record = sample_record();
        record.correct_option = "E".to_string();
        assert!(record.validate().is_err());

        record.options.e = Some("香港".to_string());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_sources_default_to_empty_list() {
        let json = r#"{
            "question": "第 2 题",
            "image": false,
            "statement": "1+1=?",
            "options": {"A": "1", "B": "2", "C": "3", "D": "4"},
            "correct_option": "B"
        }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert!(record.sources.is_empty());
        assert!(record.passage_text.is_empty());
        assert!(record.validate().is_ok());
    }
}
