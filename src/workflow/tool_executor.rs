//! 操作执行器 - 流程层
//!
//! 持有外部决策方可以调用的操作表，并在一轮内执行它请求的调用。
//!
//! 执行失败不往外抛：错误描述作为结果消息写回对话，让决策方自行
//! 调整。同一轮内的多个调用相互没有数据依赖，可以并发执行，但结果
//! 必须按请求顺序追加，保证重放和排查时的可复现性。

use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, OperationError};
use crate::infrastructure::PdfDocument;
use crate::models::conversation::{OperationDefinition, ToolInvocation};
use crate::models::PageRange;
use crate::services::corpus_assembler::CorpusAssembler;
use crate::services::image_harvester::extract_images;
use crate::services::structurer::QuestionStructurer;
use crate::services::text_extractor::extract_text;

/// `extract_images` 的参数
#[derive(Debug, Deserialize)]
struct ExtractImagesArgs {
    pdf_path: String,
    #[serde(default)]
    output_dir: Option<String>,
    #[serde(default)]
    start_page: Option<i64>,
    #[serde(default)]
    end_page: Option<i64>,
}

/// `pdf_extract_text` 的参数
#[derive(Debug, Deserialize)]
struct ExtractTextArgs {
    pdf_path: String,
    #[serde(default)]
    start_page: Option<i64>,
    #[serde(default)]
    end_page: Option<i64>,
}

/// `extract_exam_text` 的参数
#[derive(Debug, Deserialize)]
struct ExtractExamTextArgs {
    exam_pdf_path: String,
    #[serde(default)]
    answer_key_pdf_path: Option<String>,
    #[serde(default)]
    exam_start_page: Option<i64>,
    #[serde(default)]
    exam_end_page: Option<i64>,
}

/// `structure_questions` 的参数
#[derive(Debug, Deserialize)]
struct StructureQuestionsArgs {
    extracted_text_path: String,
}

/// 操作执行器
pub struct ToolExecutor {
    default_image_dir: PathBuf,
    assembler: CorpusAssembler,
    structurer: QuestionStructurer,
}

impl ToolExecutor {
    /// 创建操作执行器
    pub fn new(config: &Config, structurer: QuestionStructurer) -> Self {
        Self {
            default_image_dir: PathBuf::from(&config.image_output_dir),
            assembler: CorpusAssembler::new(&config.work_dir),
            structurer,
        }
    }

    /// 暴露给外部决策方的操作表
    pub fn operation_definitions() -> Vec<OperationDefinition> {
        vec![
            OperationDefinition {
                name: "extract_images",
                description: "从 PDF 指定页码区间提取内嵌 JPEG 图片并保存到目录，返回提取数量和位置的状态描述",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "pdf_path": { "type": "string", "description": "PDF 文件路径" },
                        "output_dir": { "type": "string", "description": "图片输出目录，缺省使用约定目录" },
                        "start_page": { "type": "integer", "description": "起始页（含，基于 0）" },
                        "end_page": { "type": "integer", "description": "结束页（不含）" }
                    },
                    "required": ["pdf_path"]
                }),
            },
            OperationDefinition {
                name: "pdf_extract_text",
                description: "从 PDF 指定页码区间提取文本，按物理页号加 '--- Page N ---' 标记拼接后返回",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "pdf_path": { "type": "string", "description": "PDF 文件路径" },
                        "start_page": { "type": "integer", "description": "起始页（含，基于 0）" },
                        "end_page": { "type": "integer", "description": "结束页（不含）" }
                    },
                    "required": ["pdf_path"]
                }),
            },
            OperationDefinition {
                name: "extract_exam_text",
                description: "提取试卷 PDF 文本并在答案 PDF 存在时拼上整本答案文本，落盘为语料文件，返回语料文件路径",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "exam_pdf_path": { "type": "string", "description": "试卷 PDF 路径" },
                        "answer_key_pdf_path": { "type": "string", "description": "答案 PDF 路径（可选）" },
                        "exam_start_page": { "type": "integer", "description": "试卷起始页（含，基于 0）" },
                        "exam_end_page": { "type": "integer", "description": "试卷结束页（不含）" }
                    },
                    "required": ["exam_pdf_path"]
                }),
            },
            OperationDefinition {
                name: "structure_questions",
                description: "读取语料文件并把其中的选择题结构化，返回原始 JSON 数组文本",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "extracted_text_path": { "type": "string", "description": "语料文件路径（extract_exam_text 的返回值）" }
                    },
                    "required": ["extracted_text_path"]
                }),
            },
        ]
    }

    /// 执行一轮内请求的全部调用
    ///
    /// 调用之间并发执行；返回值按请求顺序排列 `(调用标识, 操作名, 结果)`。
    pub async fn execute_turn(
        &self,
        invocations: &[ToolInvocation],
    ) -> Vec<(String, String, String)> {
        let futures: Vec<_> = invocations
            .iter()
            .map(|invocation| self.execute(invocation))
            .collect();
        let contents = join_all(futures).await;

        invocations
            .iter()
            .zip(contents)
            .map(|(invocation, content)| {
                (invocation.id.clone(), invocation.name.clone(), content)
            })
            .collect()
    }

    /// 执行单个调用，失败折叠为错误描述
    async fn execute(&self, invocation: &ToolInvocation) -> String {
        info!("🔧 执行操作: {} ({})", invocation.name, invocation.id);

        match self.dispatch(&invocation.name, &invocation.arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!("⚠️ 操作 {} 执行失败: {}", invocation.name, e);
                format!("操作执行失败: {}", e)
            }
        }
    }

    /// 按操作名分发
    async fn dispatch(&self, name: &str, arguments: &str) -> AppResult<String> {
        match name {
            "extract_images" => {
                let args: ExtractImagesArgs = parse_args(name, arguments)?;
                self.op_extract_images(args)
            }
            "pdf_extract_text" => {
                let args: ExtractTextArgs = parse_args(name, arguments)?;
                self.op_extract_text(args)
            }
            "extract_exam_text" => {
                let args: ExtractExamTextArgs = parse_args(name, arguments)?;
                self.op_extract_exam_text(args)
            }
            "structure_questions" => {
                let args: StructureQuestionsArgs = parse_args(name, arguments)?;
                self.op_structure_questions(args).await
            }
            other => Err(AppError::Operation(OperationError::UnknownOperation {
                name: other.to_string(),
            })),
        }
    }

    fn op_extract_images(&self, args: ExtractImagesArgs) -> AppResult<String> {
        let document = PdfDocument::open(&args.pdf_path)?;
        let range = PageRange::resolve(args.start_page, args.end_page, document.page_count());

        let output_dir = args
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_image_dir.clone());

        let outcome = extract_images(&document, range, &output_dir)?;
        Ok(outcome.status_message(&output_dir))
    }

    fn op_extract_text(&self, args: ExtractTextArgs) -> AppResult<String> {
        let document = PdfDocument::open(&args.pdf_path)?;
        let range = PageRange::resolve(args.start_page, args.end_page, document.page_count());
        Ok(extract_text(&document, range).render())
    }

    fn op_extract_exam_text(&self, args: ExtractExamTextArgs) -> AppResult<String> {
        let answer_key = args.answer_key_pdf_path.map(PathBuf::from);
        let corpus_path = self.assembler.assemble_to_file(
            Path::new(&args.exam_pdf_path),
            answer_key.as_deref(),
            args.exam_start_page,
            args.exam_end_page,
        )?;
        Ok(corpus_path.to_string_lossy().to_string())
    }

    async fn op_structure_questions(&self, args: StructureQuestionsArgs) -> AppResult<String> {
        let corpus = std::fs::read_to_string(&args.extracted_text_path)
            .map_err(|e| AppError::read_failed(&args.extracted_text_path, e))?;
        self.structurer.structure(&corpus).await
    }
}

/// 解析操作参数
fn parse_args<'a, T: Deserialize<'a>>(operation: &str, arguments: &'a str) -> AppResult<T> {
    serde_json::from_str(arguments).map_err(|e| {
        AppError::Operation(OperationError::BadArguments {
            operation: operation.to_string(),
            source: Box::new(e),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use crate::services::structurer::StructuringBackend;
    use async_trait::async_trait;

    struct NoopBackend;

    #[async_trait]
    impl StructuringBackend for NoopBackend {
        async fn complete(&self, _system: &str, _user: &str) -> AppResult<String> {
            Ok("[]".to_string())
        }
    }

    fn executor() -> ToolExecutor {
        let config = Config::default();
        ToolExecutor::new(&config, QuestionStructurer::new(Box::new(NoopBackend)))
    }

    #[tokio::test]
    async fn test_unknown_operation_is_absorbed_as_result_text() {
        let executor = executor();
        let invocation = ToolInvocation {
            id: "call_1".to_string(),
            name: "no_such_operation".to_string(),
            arguments: "{}".to_string(),
        };

        let results = executor.execute_turn(&[invocation]).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].2.contains("操作执行失败"));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_absorbed_as_result_text() {
        let executor = executor();
        let invocation = ToolInvocation {
            id: "call_1".to_string(),
            name: "extract_images".to_string(),
            arguments: "不是 JSON".to_string(),
        };

        let results = executor.execute_turn(&[invocation]).await;
        assert!(results[0].2.contains("操作执行失败"));
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        let executor = executor();
        let invocations = vec![
            ToolInvocation {
                id: "call_a".to_string(),
                name: "pdf_extract_text".to_string(),
                arguments: r#"{"pdf_path": "missing_a.pdf"}"#.to_string(),
            },
            ToolInvocation {
                id: "call_b".to_string(),
                name: "pdf_extract_text".to_string(),
                arguments: r#"{"pdf_path": "missing_b.pdf"}"#.to_string(),
            },
        ];

        let results = executor.execute_turn(&invocations).await;
        assert_eq!(results[0].0, "call_a");
        assert_eq!(results[1].0, "call_b");
    }

    #[test]
    fn test_operation_table_covers_call_surface() {
        let names: Vec<&str> = ToolExecutor::operation_definitions()
            .iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "extract_images",
                "pdf_extract_text",
                "extract_exam_text",
                "structure_questions"
            ]
        );
    }
}
