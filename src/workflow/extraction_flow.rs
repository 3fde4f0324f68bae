//! 提取控制循环 - 流程层
//!
//! 驱动外部决策方和操作执行器之间的回合制对话：
//!
//! ```text
//! AWAITING_SERVICE_TURN ──零调用──▶ DONE（回复内容即最终答案）
//!        │ ▲
//!   有调用│ │本轮全部结果已追加
//!        ▼ │
//! EXECUTING_OPERATIONS
//! ```
//!
//! 循环本身不校验操作顺序：它忠实执行决策方请求的任何调用。
//! "先取文本再结构化"由系统指令约束；决策方乱序时的后果是空洞的
//! 结构化结果，而不是循环故障。唯一的硬约束是最大轮次，用来保证
//! 在失控的外部服务面前依然能终止。

use tracing::{debug, info};

use crate::error::{AppError, AppResult, LoopError};
use crate::models::conversation::{Conversation, ToolInvocation};
use crate::workflow::decision::DecisionSource;
use crate::workflow::tool_executor::ToolExecutor;

/// 循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    /// 等待推理服务回复
    AwaitingServiceTurn,
    /// 执行本轮请求的操作
    ExecutingOperations,
    /// 终态
    Done,
}

/// 提取控制循环
///
/// - 严格回合制：一轮只有一个在途服务调用，全部等完再执行操作；
///   本轮操作全部完成并追加后才提交下一轮
/// - 不持有任何资源（文档句柄由各操作内部自取自放）
pub struct ExtractionFlow<'a> {
    decision: &'a dyn DecisionSource,
    executor: &'a ToolExecutor,
    max_turns: usize,
}

impl<'a> ExtractionFlow<'a> {
    /// 创建控制循环
    pub fn new(
        decision: &'a dyn DecisionSource,
        executor: &'a ToolExecutor,
        max_turns: usize,
    ) -> Self {
        Self {
            decision,
            executor,
            max_turns,
        }
    }

    /// 驱动对话直到终态，返回最终答案文本
    ///
    /// 对话在轮与轮之间可以被取消（直接丢弃 Conversation 即可）；
    /// 循环不在操作中途让出取消点。
    pub async fn run(&self, conversation: &mut Conversation) -> AppResult<String> {
        let mut state = LoopState::AwaitingServiceTurn;
        let mut pending: Vec<ToolInvocation> = Vec::new();
        let mut final_answer = String::new();
        let mut turns = 0usize;

        loop {
            match state {
                LoopState::AwaitingServiceTurn => {
                    if turns >= self.max_turns {
                        return Err(AppError::Loop(LoopError::BudgetExceeded {
                            max_turns: self.max_turns,
                        }));
                    }
                    turns += 1;

                    info!(
                        "[{}] 🤖 第 {}/{} 轮，提交对话（{} 条消息）",
                        conversation.run_label(),
                        turns,
                        self.max_turns,
                        conversation.messages().len()
                    );

                    let reply = self.decision.propose(conversation).await?;

                    if reply.is_final() {
                        info!(
                            "[{}] ✓ 决策方给出最终答案（{} 字符）",
                            conversation.run_label(),
                            reply.content.chars().count()
                        );
                        final_answer = reply.content;
                        state = LoopState::Done;
                    } else {
                        debug!(
                            "[{}] 决策方请求 {} 个操作调用",
                            conversation.run_label(),
                            reply.invocations.len()
                        );
                        conversation.push_reply(&reply);
                        pending = reply.invocations;
                        state = LoopState::ExecutingOperations;
                    }
                }
                LoopState::ExecutingOperations => {
                    // 并发执行，按请求顺序追加结果
                    let results = self.executor.execute_turn(&pending).await;
                    for (invocation_id, operation, content) in results {
                        conversation.push_operation_result(invocation_id, operation, content);
                    }
                    pending.clear();
                    state = LoopState::AwaitingServiceTurn;
                }
                LoopState::Done => {
                    break;
                }
            }
        }

        Ok(final_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::conversation::ServiceReply;
    use crate::services::structurer::{QuestionStructurer, StructuringBackend};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct NoopBackend;

    #[async_trait]
    impl StructuringBackend for NoopBackend {
        async fn complete(&self, _system: &str, _user: &str) -> AppResult<String> {
            Ok("[]".to_string())
        }
    }

    /// 按脚本出牌的决策源
    struct ScriptedSource {
        replies: Mutex<Vec<ServiceReply>>,
    }

    impl ScriptedSource {
        fn new(mut replies: Vec<ServiceReply>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl DecisionSource for ScriptedSource {
        async fn propose(&self, _conversation: &Conversation) -> AppResult<ServiceReply> {
            let mut replies = self.replies.lock().unwrap();
            Ok(replies.pop().unwrap_or_else(|| ServiceReply {
                content: "脚本耗尽".to_string(),
                invocations: Vec::new(),
            }))
        }
    }

    fn invocation(id: &str, name: &str, arguments: &str) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new(
            &Config::default(),
            QuestionStructurer::new(Box::new(NoopBackend)),
        )
    }

    #[tokio::test]
    async fn test_final_reply_terminates_loop() {
        let source = ScriptedSource::new(vec![ServiceReply {
            content: "[]".to_string(),
            invocations: Vec::new(),
        }]);
        let executor = executor();
        let flow = ExtractionFlow::new(&source, &executor, 5);

        let mut conversation = Conversation::seeded("test", "系统指令", "用户请求");
        let answer = flow.run(&mut conversation).await.unwrap();

        assert_eq!(answer, "[]");
        // 终轮回复不追加，日志保持播种时的两条
        assert_eq!(conversation.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_operation_failure_is_folded_into_conversation() {
        let source = ScriptedSource::new(vec![
            ServiceReply {
                content: String::new(),
                invocations: vec![invocation(
                    "call_1",
                    "pdf_extract_text",
                    r#"{"pdf_path": "missing.pdf"}"#,
                )],
            },
            ServiceReply {
                content: "[]".to_string(),
                invocations: Vec::new(),
            },
        ]);
        let executor = executor();
        let flow = ExtractionFlow::new(&source, &executor, 5);

        let mut conversation = Conversation::seeded("test", "系统指令", "用户请求");
        let answer = flow.run(&mut conversation).await.unwrap();

        assert_eq!(answer, "[]");
        let index = conversation.first_result_index("pdf_extract_text").unwrap();
        match &conversation.messages()[index] {
            crate::models::conversation::Message::OperationResult { content, .. } => {
                assert!(content.contains("操作执行失败"));
            }
            other => panic!("期望操作结果消息，得到: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_runaway_source_hits_turn_budget() {
        // 永远请求操作、从不收尾的决策方
        struct RunawaySource;

        #[async_trait]
        impl DecisionSource for RunawaySource {
            async fn propose(&self, _conversation: &Conversation) -> AppResult<ServiceReply> {
                Ok(ServiceReply {
                    content: String::new(),
                    invocations: vec![ToolInvocation {
                        id: "call_x".to_string(),
                        name: "pdf_extract_text".to_string(),
                        arguments: r#"{"pdf_path": "missing.pdf"}"#.to_string(),
                    }],
                })
            }
        }

        let executor = executor();
        let flow = ExtractionFlow::new(&RunawaySource, &executor, 3);

        let mut conversation = Conversation::seeded("test", "系统指令", "用户请求");
        let err = flow.run(&mut conversation).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Loop(LoopError::BudgetExceeded { max_turns: 3 })
        ));
    }
}
