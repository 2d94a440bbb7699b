// ==========================================
// 水库泵站自动化系统 - 自动化层错误类型
// ==========================================
// 职责: 遥测/执行/叙述三类外设错误, 各自映射到失败类别
// 红线: 落库的 error_kind 必须来自 failure_kind(), 禁止笼统字符串
// ==========================================

use crate::domain::types::FailureKind;
use thiserror::Error;

// ==========================================
// 遥测错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// 遥测源未连接 (现场设备离线或尚未建立会话)
    #[error("遥测源未连接: {0}")]
    NotConnected(String),

    /// 单次读取超时
    #[error("遥测读取超时")]
    Timeout,
}

impl TelemetryError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TelemetryError::NotConnected(_) => FailureKind::NotConnected,
            TelemetryError::Timeout => FailureKind::FetchTimeout,
        }
    }
}

// ==========================================
// 执行错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActuationError {
    /// 单次泵控调用超时
    #[error("泵控调用超时")]
    Timeout,

    /// 硬件断开, 该泵进入降级模式, 后续节拍只发探测
    #[error("泵控硬件断开")]
    HardwareDisconnected,

    /// 硬件拒绝或执行失败
    #[error("泵控执行失败: {0}")]
    Failure(String),
}

impl ActuationError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ActuationError::Timeout => FailureKind::ActuationTimeout,
            ActuationError::HardwareDisconnected => FailureKind::HardwareDisconnected,
            ActuationError::Failure(_) => FailureKind::ActuationFailure,
        }
    }
}

// ==========================================
// 叙述服务错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrationError {
    /// 服务不可用或超时, 不影响决策落库
    #[error("叙述服务不可用: {0}")]
    Unavailable(String),
}

impl NarrationError {
    pub fn failure_kind(&self) -> FailureKind {
        FailureKind::NarrationUnavailable
    }
}
