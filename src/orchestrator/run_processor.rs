//! 运行处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次提取运行的全生命周期。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、组装决策源和操作执行器
//! 2. **播种对话**：系统指令 + 按请求拼出的用户消息
//! 3. **驱动循环**：委托 `ExtractionFlow` 跑到终态
//! 4. **产物校验**：委托 `OutputValidator` 校验并落盘
//! 5. **失败分类**：对外报告失败发生在文档访问、服务调用还是输出校验
//! 6. **运行统计**：输出题目数量和耗时

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::conversation::Conversation;
use crate::models::{ExtractionRequest, QuestionRecord};
use crate::services::{LlmService, OutputValidator, QuestionStructurer};
use crate::utils::logging::init_log_file;
use crate::workflow::{DecisionSource, ExtractionFlow, LlmDecisionSource, ToolExecutor};

/// 一次运行的结果报告
#[derive(Debug)]
pub struct RunReport {
    /// 提取出的题目数量
    pub question_count: usize,
    /// 结构化产物路径
    pub output_path: PathBuf,
    /// 运行耗时（秒）
    pub duration_secs: f64,
}

/// 应用主结构
///
/// 唯一持有决策源和操作执行器的模块。
pub struct App {
    config: Config,
    decision: Box<dyn DecisionSource>,
    executor: ToolExecutor,
}

impl App {
    /// 初始化应用（生产配置：决策和结构化都走推理服务）
    pub fn initialize(config: Config) -> AppResult<Self> {
        init_log_file(&config.output_log_file)
            .map_err(|e| crate::error::AppError::Other(format!("日志文件初始化失败: {}", e)))?;

        log_startup(&config);

        let decision = LlmDecisionSource::new(
            LlmService::new(&config),
            ToolExecutor::operation_definitions(),
        );
        let structurer = QuestionStructurer::new(Box::new(LlmService::new(&config)));
        let executor = ToolExecutor::new(&config, structurer);

        Ok(Self {
            config,
            decision: Box::new(decision),
            executor,
        })
    }

    /// 用自定义决策源和结构化器组装应用
    ///
    /// 测试用脚本化桩整体替换推理服务时走这里。
    pub fn with_parts(
        config: Config,
        decision: Box<dyn DecisionSource>,
        structurer: QuestionStructurer,
    ) -> Self {
        let executor = ToolExecutor::new(&config, structurer);
        Self {
            config,
            decision,
            executor,
        }
    }

    /// 执行一次提取运行
    ///
    /// # 参数
    /// - `request`: 提取请求（路径、区间、图片目录）
    ///
    /// # 返回
    /// 成功时返回运行报告；失败时错误里带失败阶段
    pub async fn run(&self, request: &ExtractionRequest) -> AppResult<RunReport> {
        let started = Instant::now();

        // 试卷文件缺失属于文档访问失败，立刻出局，不进入对话
        if !Path::new(&request.exam_pdf_path).exists() {
            let err = crate::error::AppError::document_not_found(&request.exam_pdf_path);
            error!("❌ 运行失败 (阶段: {}): {}", err.stage(), err);
            return Err(err);
        }

        let run_label = run_label_for(&request.exam_pdf_path);
        log_run_start(&run_label, request);

        let mut conversation = Conversation::seeded(
            &run_label,
            build_system_instruction(),
            build_user_request(request, &self.config),
        );

        let flow = ExtractionFlow::new(
            self.decision.as_ref(),
            &self.executor,
            self.config.max_turns,
        );

        let final_answer = match flow.run(&mut conversation).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("❌ 运行失败 (阶段: {}): {}", e.stage(), e);
                return Err(e);
            }
        };

        let validator = OutputValidator::new(&self.config.output_json_file);
        let records = match validator.validate_and_persist(&final_answer) {
            Ok(records) => records,
            Err(e) => {
                // 软失败：没有有效产物，但原始文本已保留，等人工跟进
                error!("❌ 运行失败 (阶段: {}): {}", e.stage(), e);
                return Err(e);
            }
        };

        let report = RunReport {
            question_count: records.len(),
            output_path: validator.output_path().to_path_buf(),
            duration_secs: started.elapsed().as_secs_f64(),
        };

        log_run_complete(&run_label, &report, &records);

        Ok(report)
    }
}

/// 从试卷文件名派生运行标识
fn run_label_for(exam_pdf_path: &str) -> String {
    Path::new(exam_pdf_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "run".to_string())
}

/// 控制循环的系统指令
///
/// 只约束操作顺序；输出 schema 由结构化操作自己持有。
fn build_system_instruction() -> String {
    r#"你是从 PDF 试卷中提取结构化题目数据的专家。你可以调用给定的操作来完成任务。

必须按以下四个步骤行事：

步骤 1) 提取文本：使用 extract_exam_text 从试卷 PDF（和答案 PDF）提取文本。如果用户同时要求图片，使用 extract_images。

步骤 2) 等待结果：你会收到操作的输出，其中包括语料文件的路径，以及（如果请求了图片）图片提取的状态描述。收到这些输出之前不要进入下一步。

步骤 3) 结构化：现在对操作输出采取行动。
- 忽略 extract_images 的输出（图片状态）。
- 把 extract_exam_text 返回的完整语料文件路径作为 structure_questions 的输入。

步骤 4) 最终输出：把 structure_questions 返回的 JSON 原样作为你的最终回复，不做任何修改。

---
【最重要的规则】
收到 structure_questions 的结果（一个 JSON 字符串）后，你唯一也是最后的动作就是把这个 JSON 字符串直接作为回复内容返回给用户。
不要再调用任何操作。不要返回空消息。只把 structure_questions 给你的 JSON 作为最终回复的内容。
---

重要：四个步骤必须按顺序执行，不得跳过。绝不允许在未用 extract_exam_text 提取文本之前调用 structure_questions。"#
        .to_string()
}

/// 按请求拼出用户消息
fn build_user_request(request: &ExtractionRequest, config: &Config) -> String {
    let mut message = format!("请提取试卷 '{}' 的内容", request.exam_pdf_path);

    match (request.exam_start_page, request.exam_end_page) {
        (Some(start), Some(end)) => {
            message.push_str(&format!("（第 {} 到 {} 页，半开区间）", start, end));
        }
        (Some(start), None) => {
            message.push_str(&format!("（从第 {} 页开始）", start));
        }
        (None, Some(end)) => {
            message.push_str(&format!("（到第 {} 页为止，不含）", end));
        }
        (None, None) => {}
    }

    if let Some(key_path) = &request.answer_key_pdf_path {
        message.push_str(&format!("，并结合答案 '{}'", key_path));
    }
    message.push_str("，返回结构化 JSON。\n");

    let image_dir = request
        .image_output_dir
        .as_deref()
        .unwrap_or(&config.image_output_dir);
    message.push_str(&format!(
        "另外，请把试卷中的所有 JPEG 图片提取并保存到 '{}' 目录。",
        image_dir
    ));

    message
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 试卷结构化提取");
    info!("📊 最大轮次: {}", config.max_turns);
    info!("🧠 模型: {} ({})", config.llm_model_name, config.llm_api_base_url);
    info!("{}", "=".repeat(60));
}

fn log_run_start(run_label: &str, request: &ExtractionRequest) {
    info!("[{}] 开始处理", run_label);
    info!("[{}] 试卷: {}", run_label, request.exam_pdf_path);
    if let Some(key) = &request.answer_key_pdf_path {
        info!("[{}] 答案: {}", run_label, key);
    }
}

fn log_run_complete(run_label: &str, report: &RunReport, records: &[QuestionRecord]) {
    info!("\n{}", "=".repeat(60));
    info!("[{}] ✅ 运行完成", run_label);
    info!("[{}] 题目数量: {}", run_label, report.question_count);
    info!(
        "[{}] 含图题目: {}",
        run_label,
        records.iter().filter(|r| r.image).count()
    );
    info!("[{}] 产物: {}", run_label, report.output_path.display());
    info!("[{}] 耗时: {:.2} 秒", run_label, report.duration_secs);
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_request_mentions_all_inputs() {
        let request = ExtractionRequest {
            exam_pdf_path: "pdfs/exam.pdf".to_string(),
            answer_key_pdf_path: Some("pdfs/answer_key.pdf".to_string()),
            exam_start_page: Some(0),
            exam_end_page: Some(3),
            image_output_dir: Some("media_images".to_string()),
        };
        let message = build_user_request(&request, &Config::default());

        assert!(message.contains("pdfs/exam.pdf"));
        assert!(message.contains("pdfs/answer_key.pdf"));
        assert!(message.contains("media_images"));
        assert!(message.contains("0"));
        assert!(message.contains("3"));
    }

    #[test]
    fn test_system_instruction_orders_operations() {
        let instruction = build_system_instruction();
        let extract = instruction.find("extract_exam_text").unwrap();
        let structure = instruction.find("structure_questions").unwrap();
        assert!(extract < structure);
    }
}
