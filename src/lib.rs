//! # Exam Question Extract
//!
//! 一个把 PDF 试卷（和答案）提取为结构化题目记录的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（已打开的 PDF 文档），只暴露能力
//! - `PdfDocument` - 唯一的文档 owner，提供页数/页文本/页内图片能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `text_extractor` / `image_harvester` / `corpus_assembler` - PDF 提取能力
//! - `LlmService` - 推理服务调用能力
//! - `QuestionStructurer` - 语料 → JSON 结构化能力（独家持有 schema 契约）
//! - `OutputValidator` - 最终产物校验与落盘能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次提取运行"的回合制对话流程
//! - `DecisionSource` - 外部决策方抽象（测试可整体替换）
//! - `ToolExecutor` - 操作表与调用执行
//! - `ExtractionFlow` - 循环编排（等待回复 → 执行操作 → 收尾）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/run_processor` - 运行处理器，播种对话、驱动循环、
//!   校验产物、输出统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::PdfDocument;
pub use models::{Conversation, ExtractionRequest, PageRange, QuestionRecord};
pub use orchestrator::{App, RunReport};
pub use services::{CorpusAssembler, LlmService, OutputValidator, QuestionStructurer};
pub use workflow::{DecisionSource, ExtractionFlow, ToolExecutor};
