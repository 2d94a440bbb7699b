// ==========================================
// 水库泵站自动化系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod decision;
pub mod forecast;
pub mod reading;
pub mod types;

// 重导出核心类型
pub use decision::{Decision, DecisionFilter, PumpCommand};
pub use forecast::{AlertPrediction, ForecastResult, PeriodComparison, TrendMetrics};
pub use reading::{normalize_readings, Reading};
pub use types::{DecisionOutcome, FailureKind, PolicyRule, PumpAction, TrendDirection};
