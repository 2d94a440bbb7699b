// ==========================================
// 水库泵站自动化系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// 输入数据不足, 本节拍跳过该项计算即可恢复
    #[error("数据不足: {context} (需要 {needed} 条, 实际 {got} 条)")]
    InsufficientData {
        context: String,
        needed: usize,
        got: usize,
    },

    /// 调用参数非法 (如时域为零或负数)
    #[error("参数非法: {0}")]
    InvalidArgument(String),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
