//! 对话状态模型
//!
//! 一次提取运行对应一条只追加的消息日志：系统指令、用户请求、
//! 助手回复（可能携带操作调用）、操作结果。运行结束即销毁，
//! 除了可选的运行标识不做任何跨运行持久化。

use serde::{Deserialize, Serialize};

/// 外部决策方请求的一次操作调用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// 调用标识，用于把结果和请求对应起来
    pub id: String,
    /// 操作名
    pub name: String,
    /// JSON 编码的参数
    pub arguments: String,
}

/// 推理服务一轮的回复
#[derive(Debug, Clone, Default)]
pub struct ServiceReply {
    /// 文本内容（终轮即最终答案）
    pub content: String,
    /// 请求的操作调用，按请求顺序排列
    pub invocations: Vec<ToolInvocation>,
}

impl ServiceReply {
    /// 零操作调用即终轮
    pub fn is_final(&self) -> bool {
        self.invocations.is_empty()
    }
}

/// 对话中的一条消息
#[derive(Debug, Clone)]
pub enum Message {
    /// 系统指令
    System(String),
    /// 用户请求
    User(String),
    /// 助手回复（可能携带操作调用）
    Assistant {
        content: String,
        invocations: Vec<ToolInvocation>,
    },
    /// 操作结果
    OperationResult {
        invocation_id: String,
        operation: String,
        content: String,
    },
}

/// 暴露给外部决策方的操作定义
#[derive(Debug, Clone)]
pub struct OperationDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// 参数的 JSON Schema
    pub parameters: serde_json::Value,
}

/// 一次运行的对话状态
///
/// 只追加；只有控制循环会修改它。
#[derive(Debug)]
pub struct Conversation {
    /// 可选的运行标识（仅用于日志和产物命名）
    run_label: String,
    messages: Vec<Message>,
}

impl Conversation {
    /// 用系统指令和用户请求播种对话
    pub fn seeded(
        run_label: impl Into<String>,
        system_instruction: impl Into<String>,
        user_request: impl Into<String>,
    ) -> Self {
        Self {
            run_label: run_label.into(),
            messages: vec![
                Message::System(system_instruction.into()),
                Message::User(user_request.into()),
            ],
        }
    }

    /// 运行标识
    pub fn run_label(&self) -> &str {
        &self.run_label
    }

    /// 消息日志
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 追加助手回复
    pub fn push_reply(&mut self, reply: &ServiceReply) {
        self.messages.push(Message::Assistant {
            content: reply.content.clone(),
            invocations: reply.invocations.clone(),
        });
    }

    /// 追加操作结果
    pub fn push_operation_result(
        &mut self,
        invocation_id: impl Into<String>,
        operation: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.messages.push(Message::OperationResult {
            invocation_id: invocation_id.into(),
            operation: operation.into(),
            content: content.into(),
        });
    }

    /// 首个指定操作结果在日志中的位置（测试与排查用）
    pub fn first_result_index(&self, operation: &str) -> Option<usize> {
        self.messages.iter().position(|m| {
            matches!(m, Message::OperationResult { operation: op, .. } if op == operation)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_conversation_layout() {
        let conversation = Conversation::seeded("run-1", "系统指令", "用户请求");
        assert_eq!(conversation.messages().len(), 2);
        assert!(matches!(conversation.messages()[0], Message::System(_)));
        assert!(matches!(conversation.messages()[1], Message::User(_)));
    }

    #[test]
    fn test_first_result_index_tracks_operation_order() {
        let mut conversation = Conversation::seeded("run-1", "s", "u");
        conversation.push_operation_result("call_1", "extract_images", "ok");
        conversation.push_operation_result("call_2", "extract_exam_text", "path");

        assert_eq!(conversation.first_result_index("extract_images"), Some(2));
        assert_eq!(conversation.first_result_index("extract_exam_text"), Some(3));
        assert_eq!(conversation.first_result_index("structure_questions"), None);
    }

    #[test]
    fn test_reply_finality() {
        let reply = ServiceReply {
            content: "[]".to_string(),
            invocations: Vec::new(),
        };
        assert!(reply.is_final());

        let reply = ServiceReply {
            content: String::new(),
            invocations: vec![ToolInvocation {
                id: "call_1".to_string(),
                name: "extract_exam_text".to_string(),
                arguments: "{}".to_string(),
            }],
        };
        assert!(!reply.is_final());
    }
}
