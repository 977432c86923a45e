use std::fmt;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 考核服务调用错误
    Service(ServiceError),
    /// 表单校验错误
    Validation(ValidationError),
    /// 文件操作错误
    File(FileError),
    /// 业务逻辑错误
    Business(BusinessError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Service(e) => write!(f, "服务错误: {}", e),
            AppError::Validation(e) => write!(f, "校验错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Business(e) => write!(f, "业务错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Service(e) => Some(e),
            AppError::Validation(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Business(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 考核服务边界错误
///
/// 所有服务实现（HTTP / 内存）统一返回这一套错误，
/// 流程层据此决定展示与重试策略。
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 网络请求失败（连接 / 超时）
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 响应体解析失败
    #[error("响应解析失败 ({endpoint}): {source}")]
    DecodeFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务端返回了未归类的错误状态
    #[error("服务端错误响应 ({endpoint}): status={status}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// 目标资源不存在
    #[error("资源不存在: {resource}")]
    NotFound { resource: String },
    /// 服务端校验拒绝
    #[error("服务端校验未通过: {message}")]
    Rejected { message: String },
    /// 状态冲突（例如重复提交）
    #[error("状态冲突: {message}")]
    Conflict { message: String },
}

impl ServiceError {
    /// 该错误是否未造成任何服务端变更、可以安全重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::RequestFailed { .. }
                | ServiceError::DecodeFailed { .. }
                | ServiceError::BadResponse { .. }
        )
    }
}

/// 表单字段校验错误
///
/// 只在本地拦截动作，不会进入传输层。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// 出错的字段名
    pub field: String,
    /// 面向用户的错误说明
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "字段 {} 校验失败: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 业务逻辑错误
#[derive(Debug)]
pub enum BusinessError {
    /// 题目不在当前考核中
    QuestionMissing {
        question_id: i64,
    },
    /// 答案类型与题目类型不匹配
    AnswerTypeMismatch {
        question_id: i64,
    },
    /// 选项索引超出范围
    OptionIndexOutOfRange {
        index: usize,
        option_count: usize,
    },
    /// 题目序号超出范围
    QuestionIndexOutOfRange {
        index: usize,
        question_count: usize,
    },
    /// 本次作答已经提交，不能再修改
    AttemptAlreadySubmitted,
    /// 当前状态不允许该操作
    AttemptNotReady {
        state: String,
    },
    /// 服务端返回的考核与请求的不一致
    AssessmentMismatch {
        expected: i64,
        actual: i64,
    },
    /// 没有打开的题目表单
    NoFormOpen,
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::QuestionMissing { question_id } => {
                write!(f, "题目 {} 不在当前考核中", question_id)
            }
            BusinessError::AnswerTypeMismatch { question_id } => {
                write!(f, "答案类型与题目 {} 的类型不匹配", question_id)
            }
            BusinessError::OptionIndexOutOfRange {
                index,
                option_count,
            } => {
                write!(f, "选项索引 {} 超出范围，共 {} 个选项", index, option_count)
            }
            BusinessError::QuestionIndexOutOfRange {
                index,
                question_count,
            } => {
                write!(f, "题目序号 {} 超出范围，共 {} 题", index, question_count)
            }
            BusinessError::AttemptAlreadySubmitted => {
                write!(f, "本次作答已经提交")
            }
            BusinessError::AttemptNotReady { state } => {
                write!(f, "当前状态 {} 不允许该操作", state)
            }
            BusinessError::AssessmentMismatch { expected, actual } => {
                write!(f, "服务端返回的考核 {} 与请求的 {} 不一致", actual, expected)
            }
            BusinessError::NoFormOpen => {
                write!(f, "没有打开的题目表单")
            }
        }
    }
}

impl std::error::Error for BusinessError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    EnvVarNotFound {
        var_name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::EnvVarNotFound { var_name } => {
                write!(f, "环境变量 {} 不存在", var_name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<BusinessError> for AppError {
    fn from(err: BusinessError) -> Self {
        AppError::Business(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Service(ServiceError::DecodeFailed {
            endpoint: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建字段校验错误
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(ValidationError::new(field, message))
    }

    /// 创建资源不存在错误
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::Service(ServiceError::NotFound {
            resource: resource.into(),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 该错误对应的动作是否可以安全重试
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Service(e) => e.is_retryable(),
            _ => false,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = std::result::Result<T, AppError>;
