use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 文档访问错误
    Document(DocumentError),
    /// 操作执行错误
    Operation(OperationError),
    /// 推理服务错误
    Llm(LlmError),
    /// 对话循环错误
    Loop(LoopError),
    /// 输出校验错误
    Output(OutputError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Document(e) => write!(f, "文档错误: {}", e),
            AppError::Operation(e) => write!(f, "操作错误: {}", e),
            AppError::Llm(e) => write!(f, "推理服务错误: {}", e),
            AppError::Loop(e) => write!(f, "循环错误: {}", e),
            AppError::Output(e) => write!(f, "输出错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Document(e) => Some(e),
            AppError::Operation(e) => Some(e),
            AppError::Llm(e) => Some(e),
            AppError::Loop(e) => Some(e),
            AppError::Output(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 文档访问错误
///
/// 源 PDF 缺失或损坏属于致命错误：不重试，立即终止本次运行。
#[derive(Debug)]
pub enum DocumentError {
    /// 打开文档失败
    OpenFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 文档不存在
    NotFound {
        path: String,
    },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::OpenFailed { path, source } => {
                write!(f, "无法打开文档 ({}): {}", path, source)
            }
            DocumentError::NotFound { path } => write!(f, "文档不存在: {}", path),
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::OpenFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            DocumentError::NotFound { .. } => None,
        }
    }
}

/// 操作执行错误
///
/// 单个操作在运行期失败（如图片目录无写权限）。这类错误会以结果消息的
/// 形式写回对话，让外部决策方自行调整，而不是中断整次运行。
#[derive(Debug)]
pub enum OperationError {
    /// 未知操作
    UnknownOperation {
        name: String,
    },
    /// 参数解析失败
    BadArguments {
        operation: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入输出失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 读取输入失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::UnknownOperation { name } => {
                write!(f, "未知操作: {}", name)
            }
            OperationError::BadArguments { operation, source } => {
                write!(f, "操作 {} 参数解析失败: {}", operation, source)
            }
            OperationError::WriteFailed { path, source } => {
                write!(f, "写入失败 ({}): {}", path, source)
            }
            OperationError::ReadFailed { path, source } => {
                write!(f, "读取失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OperationError::BadArguments { source, .. }
            | OperationError::WriteFailed { source, .. }
            | OperationError::ReadFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            OperationError::UnknownOperation { .. } => None,
        }
    }
}

/// 推理服务错误
///
/// 外部调用失败对当前运行是致命的；重试策略由调用方决定，核心不做
/// 静默重试（生成式调用不具备确定性，重试会改变内容）。
#[derive(Debug)]
pub enum LlmError {
    /// API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 调用超时
    Timeout {
        model: String,
        timeout_secs: u64,
    },
    /// 返回结果为空
    EmptyResponse {
        model: String,
    },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ApiCallFailed { model, source } => {
                write!(f, "LLM API调用失败 (模型: {}): {}", model, source)
            }
            LlmError::Timeout {
                model,
                timeout_secs,
            } => {
                write!(f, "LLM 调用超时 (模型: {}, {}秒)", model, timeout_secs)
            }
            LlmError::EmptyResponse { model } => {
                write!(f, "LLM返回结果为空 (模型: {})", model)
            }
        }
    }
}

impl std::error::Error for LlmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LlmError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 对话循环错误
#[derive(Debug)]
pub enum LoopError {
    /// 超过最大轮次仍未终止
    BudgetExceeded {
        max_turns: usize,
    },
}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopError::BudgetExceeded { max_turns } => {
                write!(f, "对话超过最大轮次 {} 仍未结束", max_turns)
            }
        }
    }
}

impl std::error::Error for LoopError {}

/// 输出校验错误
///
/// 最终回复不符合目标 schema。运行结束但没有有效的结构化产物；
/// 原始文本必须保留，供人工排查。
#[derive(Debug)]
pub enum OutputError {
    /// JSON 解析失败
    ParseFailed {
        raw_text: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// schema 不匹配
    SchemaMismatch {
        raw_text: String,
        reason: String,
    },
}

impl OutputError {
    /// 取出导致失败的原始文本
    pub fn raw_text(&self) -> &str {
        match self {
            OutputError::ParseFailed { raw_text, .. }
            | OutputError::SchemaMismatch { raw_text, .. } => raw_text,
        }
    }
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::ParseFailed { source, .. } => {
                write!(f, "最终输出 JSON 解析失败: {}", source)
            }
            OutputError::SchemaMismatch { reason, .. } => {
                write!(f, "最终输出不符合 schema: {}", reason)
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::ParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            OutputError::SchemaMismatch { .. } => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Output(OutputError::ParseFailed {
            raw_text: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Operation(OperationError::WriteFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Other(format!("TOML解析失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文档打开错误
    pub fn document_open_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Document(DocumentError::OpenFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文档不存在错误
    pub fn document_not_found(path: impl Into<String>) -> Self {
        AppError::Document(DocumentError::NotFound { path: path.into() })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建写入失败错误
    pub fn write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Operation(OperationError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建读取失败错误
    pub fn read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Operation(OperationError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 失败发生在哪个阶段（用于对外报告）
    pub fn stage(&self) -> &'static str {
        match self {
            AppError::Document(_) => "document",
            AppError::Operation(_) => "operation",
            AppError::Llm(_) => "reasoning-service",
            AppError::Loop(_) => "loop",
            AppError::Output(_) => "output-validation",
            AppError::Other(_) => "other",
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
