//! 流程层（Workflow）
//!
//! 定义"一次提取运行"的完整对话流程：
//! 决策源提出操作 → 执行器执行 → 结果写回对话 → 循环到终态。

pub mod decision;
pub mod extraction_flow;
pub mod tool_executor;

pub use decision::{DecisionSource, LlmDecisionSource};
pub use extraction_flow::ExtractionFlow;
pub use tool_executor::ToolExecutor;
