//! 索引构建与主机缓存的统一错误类型。
//!
//! 配置错误在 `create_index` 调用时同步返回；资源耗尽与阶段失败发生在
//! 流（stream）上的异步任务中，由 `wait_to_be_ready` / `finish_copying` 报告。

use thiserror::Error;

/// 索引相关操作的错误
///
/// 需要 `Clone`：同一个失败结果可能被多个等待者读取。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// 构建参数非法（k、w、read 区间、过滤参数）
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// 分配器无法满足缓冲区请求
    #[error("device allocator exhausted: requested {requested} bytes, {available} bytes available")]
    ResourceExhausted { requested: usize, available: usize },

    /// 索引数组不满足排序 / 首次出现表的不变式（如损坏的快照）
    #[error("inconsistent index data: {message}")]
    InvalidIndexData { message: String },

    /// 流上的任务异常终止
    #[error("asynchronous stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },
}

/// 本 crate 的 Result 别名
pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidIndexData { message: message.into() }
    }

    pub fn stage_failed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageFailed { stage: stage.into(), message: message.into() }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
