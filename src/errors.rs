use thiserror::Error;

use crate::WindowId;

/// 多窗口管理错误类型
#[derive(Error, Debug)]
pub enum MultiWindowError {
    #[error("窗口创建失败: {0}")]
    CreationFailed(String),

    #[error("目标窗口不存在: {0}")]
    WindowNotFound(WindowId),

    #[error("参数无效: {0}")]
    InvalidArgument(String),

    #[error("透明度设置失败: {0}")]
    TransparencyFailed(String),

    #[error("管理器已关闭")]
    ManagerShutDown,
}

impl MultiWindowError {
    /// 获取对应的RPC错误码
    pub fn rpc_code(&self) -> &'static str {
        match self {
            MultiWindowError::CreationFailed(_) => "CREATION_FAILED",
            MultiWindowError::WindowNotFound(_) => "WINDOW_NOT_FOUND",
            MultiWindowError::InvalidArgument(_) => "INVALID_ARGUMENT",
            MultiWindowError::TransparencyFailed(_) => "TRANSPARENCY_FAILED",
            MultiWindowError::ManagerShutDown => "MANAGER_SHUT_DOWN",
        }
    }

    /// 检查错误是否属于"尽力而为"类别
    ///
    /// 这类错误在句柄操作边界被记录日志后丢弃，不会上报给调用方。
    pub fn is_best_effort(&self) -> bool {
        matches!(self, MultiWindowError::TransparencyFailed(_))
    }
}

/// 多窗口管理结果类型
pub type MultiWindowResult<T> = Result<T, MultiWindowError>;
