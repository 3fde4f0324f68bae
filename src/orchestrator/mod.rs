//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的全生命周期，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! run_processor (一次提取运行)
//!     ↓
//! workflow::ExtractionFlow (回合制对话循环)
//!     ↓
//! services (能力层：text / image / corpus / llm / structure / validate)
//!     ↓
//! infrastructure (基础设施：PdfDocument)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：只做调度、校验和统计，不做具体提取
//! 2. **资源隔离**：决策源和执行器只在本层组装
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod run_processor;

pub use run_processor::{App, RunReport};
