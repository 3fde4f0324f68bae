//! 决策源 - 流程层
//!
//! 把"谁来决定下一步操作"抽象成一个能力：给定对话状态，提出下一轮
//! 回复。生产环境由推理服务实现；测试用脚本化桩整体替换。

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::conversation::{Conversation, OperationDefinition, ServiceReply};
use crate::services::LlmService;

/// 外部决策方
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// 基于当前对话状态提出下一轮回复（可能携带操作调用）
    async fn propose(&self, conversation: &Conversation) -> AppResult<ServiceReply>;
}

// 共享决策源（测试里常见：运行后还要读桩的记录）
#[async_trait]
impl<T: DecisionSource + ?Sized> DecisionSource for std::sync::Arc<T> {
    async fn propose(&self, conversation: &Conversation) -> AppResult<ServiceReply> {
        self.as_ref().propose(conversation).await
    }
}

/// 由推理服务驱动的决策源
pub struct LlmDecisionSource {
    service: LlmService,
    operations: Vec<OperationDefinition>,
}

impl LlmDecisionSource {
    /// 创建决策源
    ///
    /// `operations` 是暴露给推理服务的操作表，每轮请求都会带上。
    pub fn new(service: LlmService, operations: Vec<OperationDefinition>) -> Self {
        Self {
            service,
            operations,
        }
    }
}

#[async_trait]
impl DecisionSource for LlmDecisionSource {
    async fn propose(&self, conversation: &Conversation) -> AppResult<ServiceReply> {
        self.service
            .propose_turn(conversation.messages(), &self.operations)
            .await
    }
}
