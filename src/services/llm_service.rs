//! LLM 服务 - 业务能力层
//!
//! 只负责"和推理服务对话"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionTools,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
    },
    Client,
};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::conversation::{
    Message, OperationDefinition, ServiceReply, ToolInvocation,
};

/// LLM 服务
///
/// 职责：
/// - 提供通用的 LLM 调用接口
/// - 提供带操作定义的整轮对话提交
/// - 每次调用都套超时；超时即失败，不做静默重试
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    timeout_secs: u64,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            timeout_secs: config.llm_timeout_secs,
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// 这是最基础的 LLM 调用接口，结构化等单发调用都基于此函数。
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        // 添加系统消息（如果提供）
        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        // 添加用户消息
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.1)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        // 调用 API（带超时）
        let response = self.call_with_timeout(request).await?;

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyResponse {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }

    /// 提交整个对话并取回一轮回复
    ///
    /// 把对话日志和操作定义一起发给推理服务；回复里携带的操作调用
    /// 原样映射回对话模型，顺序保持请求顺序。
    ///
    /// # 参数
    /// - `messages`: 完整的对话日志
    /// - `operations`: 可供请求的操作定义
    pub async fn propose_turn(
        &self,
        messages: &[Message],
        operations: &[OperationDefinition],
    ) -> AppResult<ServiceReply> {
        debug!(
            "提交对话，消息数: {}, 操作数: {}, 模型: {}",
            messages.len(),
            operations.len(),
            self.model_name
        );

        let wire_messages = self.build_wire_messages(messages)?;
        let tools = self.build_tools(operations)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(wire_messages)
            .tools(tools)
            .temperature(0.1)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = self.call_with_timeout(request).await?;

        let message = response
            .choices
            .first()
            .map(|choice| choice.message.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyResponse {
                    model: self.model_name.clone(),
                })
            })?;

        let invocations = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|call| match call {
                ChatCompletionMessageToolCalls::Function(call) => Some(ToolInvocation {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                }),
                _ => None,
            })
            .collect();

        Ok(ServiceReply {
            content: message.content.unwrap_or_default(),
            invocations,
        })
    }

    /// 发起请求并套超时
    async fn call_with_timeout(
        &self,
        request: async_openai::types::chat::CreateChatCompletionRequest,
    ) -> AppResult<async_openai::types::chat::CreateChatCompletionResponse> {
        let chat = self.client.chat();
        let call = chat.create(request);

        match timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(Ok(response)) => {
                debug!("LLM API 调用成功");
                Ok(response)
            }
            Ok(Err(e)) => {
                warn!("LLM API 调用失败: {}", e);
                Err(AppError::llm_api_failed(&self.model_name, e))
            }
            Err(_) => {
                warn!(
                    "LLM API 调用超时 ({}秒)，本次运行终止",
                    self.timeout_secs
                );
                Err(AppError::Llm(LlmError::Timeout {
                    model: self.model_name.clone(),
                    timeout_secs: self.timeout_secs,
                }))
            }
        }
    }

    /// 把对话模型映射为线上消息
    fn build_wire_messages(
        &self,
        messages: &[Message],
    ) -> AppResult<Vec<ChatCompletionRequestMessage>> {
        let mut wire = Vec::with_capacity(messages.len());

        for message in messages {
            match message {
                Message::System(content) => {
                    let msg = ChatCompletionRequestSystemMessageArgs::default()
                        .content(content.as_str())
                        .build()
                        .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
                    wire.push(ChatCompletionRequestMessage::System(msg));
                }
                Message::User(content) => {
                    let msg = ChatCompletionRequestUserMessageArgs::default()
                        .content(content.as_str())
                        .build()
                        .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
                    wire.push(ChatCompletionRequestMessage::User(msg));
                }
                Message::Assistant {
                    content,
                    invocations,
                } => {
                    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                    if !content.is_empty() {
                        builder.content(content.as_str());
                    }
                    if !invocations.is_empty() {
                        let tool_calls: Vec<ChatCompletionMessageToolCalls> = invocations
                            .iter()
                            .map(|invocation| {
                                ChatCompletionMessageToolCalls::Function(
                                    ChatCompletionMessageToolCall {
                                        id: invocation.id.clone(),
                                        function: FunctionCall {
                                            name: invocation.name.clone(),
                                            arguments: invocation.arguments.clone(),
                                        },
                                    },
                                )
                            })
                            .collect();
                        builder.tool_calls(tool_calls);
                    }
                    let msg = builder
                        .build()
                        .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
                    wire.push(ChatCompletionRequestMessage::Assistant(msg));
                }
                Message::OperationResult {
                    invocation_id,
                    content,
                    ..
                } => {
                    let msg = ChatCompletionRequestToolMessageArgs::default()
                        .content(content.as_str())
                        .tool_call_id(invocation_id.as_str())
                        .build()
                        .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
                    wire.push(ChatCompletionRequestMessage::Tool(msg));
                }
            }
        }

        Ok(wire)
    }

    /// 把操作定义映射为线上工具定义
    fn build_tools(
        &self,
        operations: &[OperationDefinition],
    ) -> AppResult<Vec<ChatCompletionTools>> {
        let mut tools = Vec::with_capacity(operations.len());

        for operation in operations {
            let function = FunctionObjectArgs::default()
                .name(operation.name)
                .description(operation.description)
                .parameters(operation.parameters.clone())
                .build()
                .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

            tools.push(ChatCompletionTools::Function(ChatCompletionTool { function }));
        }

        Ok(tools)
    }
}
