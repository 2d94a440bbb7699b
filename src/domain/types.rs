// ==========================================
// 水库泵站自动化系统 - 领域类型定义
// ==========================================
// 职责: 定义全系统共享的枚举类型
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 泵动作 (Pump Action)
// ==========================================
// 泵只有两个稳定状态, 命令也只有两种动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PumpAction {
    On,  // 启泵 (注水)
    Off, // 停泵
}

impl PumpAction {
    pub fn as_str(&self) -> &str {
        match self {
            PumpAction::On => "ON",
            PumpAction::Off => "OFF",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ON" => Some(PumpAction::On),
            "OFF" => Some(PumpAction::Off),
            _ => None,
        }
    }
}

impl fmt::Display for PumpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 趋势方向 (Trend Direction)
// ==========================================
// 由混合斜率对照死区阈值得出, 避免把噪声标成趋势
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Rising,  // 上升
    Falling, // 下降
    Stable,  // 稳定
}

impl TrendDirection {
    pub fn as_str(&self) -> &str {
        match self {
            TrendDirection::Rising => "RISING",
            TrendDirection::Falling => "FALLING",
            TrendDirection::Stable => "STABLE",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 决策结果 (Decision Outcome)
// ==========================================
// 红线: 每条决策必须带 outcome, 失败必须带具体错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Applied, // 已执行 (含无需动作的 NO_OP)
    Failed,  // 执行失败 (重试耗尽)
    Skipped, // 被跳过 (冷却期/数据问题/硬件降级)
}

impl DecisionOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            DecisionOutcome::Applied => "APPLIED",
            DecisionOutcome::Failed => "FAILED",
            DecisionOutcome::Skipped => "SKIPPED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "APPLIED" => Some(DecisionOutcome::Applied),
            "FAILED" => Some(DecisionOutcome::Failed),
            "SKIPPED" => Some(DecisionOutcome::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 失败类别 (Failure Kind)
// ==========================================
// 决策失败/跳过时记录的具体错误类别
// 红线: 禁止落库笼统的 "error" 字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    InsufficientData,     // 预测/趋势输入数据不足
    StaleReading,         // 读数过期, 视为缺失
    NotConnected,         // 遥测源未连接
    FetchTimeout,         // 遥测读取超时
    ActuationTimeout,     // 执行超时 (重试耗尽)
    ActuationFailure,     // 执行失败 (重试耗尽)
    HardwareDisconnected, // 硬件断开, 泵进入降级模式
    PolicyViolation,      // 冷却期阻止了需要的切换
    NarrationUnavailable, // 叙述服务不可用 (不影响决策落库)
}

impl FailureKind {
    pub fn as_str(&self) -> &str {
        match self {
            FailureKind::InsufficientData => "INSUFFICIENT_DATA",
            FailureKind::StaleReading => "STALE_READING",
            FailureKind::NotConnected => "NOT_CONNECTED",
            FailureKind::FetchTimeout => "FETCH_TIMEOUT",
            FailureKind::ActuationTimeout => "ACTUATION_TIMEOUT",
            FailureKind::ActuationFailure => "ACTUATION_FAILURE",
            FailureKind::HardwareDisconnected => "HARDWARE_DISCONNECTED",
            FailureKind::PolicyViolation => "POLICY_VIOLATION",
            FailureKind::NarrationUnavailable => "NARRATION_UNAVAILABLE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INSUFFICIENT_DATA" => Some(FailureKind::InsufficientData),
            "STALE_READING" => Some(FailureKind::StaleReading),
            "NOT_CONNECTED" => Some(FailureKind::NotConnected),
            "FETCH_TIMEOUT" => Some(FailureKind::FetchTimeout),
            "ACTUATION_TIMEOUT" => Some(FailureKind::ActuationTimeout),
            "ACTUATION_FAILURE" => Some(FailureKind::ActuationFailure),
            "HARDWARE_DISCONNECTED" => Some(FailureKind::HardwareDisconnected),
            "POLICY_VIOLATION" => Some(FailureKind::PolicyViolation),
            "NARRATION_UNAVAILABLE" => Some(FailureKind::NarrationUnavailable),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 策略规则 (Policy Rule)
// ==========================================
// 红线: 所有规则必须输出 reason, 决策记录必须注明触发规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyRule {
    LowThresholdOn,   // 低于下限, 反应式启泵
    HighThresholdOff, // 高于上限, 反应式停泵
    AnticipatoryOff,  // 预测越上限, 前瞻性停泵 (独立代码路径)
    HysteresisHold,   // 滞回带内, 保持现状
    CooldownBlocked,  // 需要切换但冷却期未满
}

impl PolicyRule {
    pub fn as_str(&self) -> &str {
        match self {
            PolicyRule::LowThresholdOn => "LOW_THRESHOLD_ON",
            PolicyRule::HighThresholdOff => "HIGH_THRESHOLD_OFF",
            PolicyRule::AnticipatoryOff => "ANTICIPATORY_OFF",
            PolicyRule::HysteresisHold => "HYSTERESIS_HOLD",
            PolicyRule::CooldownBlocked => "COOLDOWN_BLOCKED",
        }
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
