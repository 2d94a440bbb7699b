// ==========================================
// 水库泵站自动化系统 - 决策审计领域模型
// ==========================================
// 对齐: decision_log 表
// 红线: 决策记录只增不改, 核心层不存在更新/删除操作
// ==========================================

use crate::domain::types::{DecisionOutcome, FailureKind, PumpAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ==========================================
// PumpCommand - 泵控命令
// ==========================================
// 约定: 同一泵同一时刻至多一条在途命令 (由 DecisionLoop 串行化保证)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpCommand {
    pub pump_id: String,                  // 泵ID
    pub action: PumpAction,               // ON / OFF
    pub duration_seconds: Option<u64>,    // 限时运行 (None = 持续到下次命令)
    pub issued_at: DateTime<Utc>,         // 下发时间
}

// ==========================================
// Decision - 决策记录
// ==========================================
// 用途: 审计追踪, 每次 (水库, 泵或无操作) 评估各产出一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    // ===== 主键 =====
    pub decision_id: String,              // UUID
    pub reservoir_id: String,             // 水库ID
    pub pump_id: Option<String>,          // 泵ID (整库级跳过记录为 None)
    pub decision_ts: DateTime<Utc>,       // 决策时间

    // ===== 输入快照 =====
    pub input_snapshot: Option<JsonValue>, // 当次使用的读数/预测 (JSON)

    // ===== 决策内容 =====
    pub chosen_action: String,            // "PUMP_ON" / "PUMP_OFF" / "NO_OP"
    pub rule: Option<String>,             // 触发规则 (PolicyRule::as_str)
    pub rationale: String,                // 决策理由 (含阈值与预测值)

    // ===== 结果 =====
    pub outcome: DecisionOutcome,         // APPLIED / FAILED / SKIPPED
    pub error_kind: Option<FailureKind>,  // 非 APPLIED 时的具体错误类别
}

impl Decision {
    /// 构造一条待填充结果的决策记录
    pub fn new(reservoir_id: &str, pump_id: Option<&str>, decision_ts: DateTime<Utc>) -> Self {
        Self {
            decision_id: Uuid::new_v4().to_string(),
            reservoir_id: reservoir_id.to_string(),
            pump_id: pump_id.map(|s| s.to_string()),
            decision_ts,
            input_snapshot: None,
            chosen_action: "NO_OP".to_string(),
            rule: None,
            rationale: String::new(),
            outcome: DecisionOutcome::Skipped,
            error_kind: None,
        }
    }
}

// ==========================================
// DecisionFilter - 决策查询过滤条件
// ==========================================
// 用途: DecisionLogRepository::query, 结果按时间倒序
#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    pub reservoir_id: Option<String>,     // 按水库过滤
    pub outcome: Option<DecisionOutcome>, // 按结果过滤
    pub since: Option<DateTime<Utc>>,     // 起始时间 (含)
    pub limit: Option<u32>,               // 条数上限 (默认 100)
}

impl DecisionFilter {
    /// 默认上限, 防止无界查询拖垮调用方
    pub const DEFAULT_LIMIT: u32 = 100;
}
