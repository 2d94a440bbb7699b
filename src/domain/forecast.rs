// ==========================================
// 水库泵站自动化系统 - 预测结果领域模型
// ==========================================
// 约定: ForecastResult 产出后不可变
// ==========================================

use crate::domain::types::TrendDirection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ForecastResult - 单水库单时域预测结果
// ==========================================
// 产出: ForecastEngine::predict
// 确定性: 相同输入 (读数 + as_of + horizon) 必然产出相同结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub reservoir_id: String,          // 水库ID
    pub as_of: DateTime<Utc>,          // 预测基准时间
    pub horizon_minutes: i64,          // 预测时域 (分钟)
    pub predicted_level_m: f64,        // 预测水位 (米)
    pub confidence: f64,               // 置信度 [0, 1]
    pub trend: TrendDirection,         // 趋势标签
}

// ==========================================
// TrendMetrics - 趋势指标
// ==========================================
// 产出: TrendAnalyzer::analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMetrics {
    pub rate_m_per_hour: f64,          // 变化率 (米/小时)
    pub acceleration_m_per_hour2: f64, // 加速度 (米/小时²), 相邻等长子窗口变化率之差
    pub window_hours: f64,             // 实际覆盖窗口 (小时)
    pub sample_count: usize,           // 参与计算的读数条数
}

// ==========================================
// AlertPrediction - 告警到达预测
// ==========================================
// 产出: TrendAnalyzer::predict_alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPrediction {
    pub threshold_m: f64,                  // 告警阈值 (米)
    pub eta: Option<DateTime<Utc>>,        // 预计到达时间, 不可达为 None
    pub hours_until: Option<f64>,          // 距到达的小时数
    pub will_reach: bool,                  // max_horizon 内是否会到达
}

// ==========================================
// PeriodComparison - 时段对比
// ==========================================
// 产出: TrendAnalyzer::compare_periods
// 时段边界为已解析好的 (start, end) 时间戳对, 自然语言解析不在本层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub mean_a: f64,      // 时段A平均水位
    pub mean_b: f64,      // 时段B平均水位
    pub delta: f64,       // mean_b - mean_a
    pub count_a: usize,   // 时段A读数条数
    pub count_b: usize,   // 时段B读数条数
}
