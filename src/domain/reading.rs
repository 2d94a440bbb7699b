// ==========================================
// 水库泵站自动化系统 - 水位读数领域模型
// ==========================================
// 对齐: water_reading 表
// 约定: 单水库内按时间戳排序, 重复时间戳取水位均值
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// Reading - 单次水位读数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub reservoir_id: String,                // 水库ID
    pub timestamp: DateTime<Utc>,            // 测量时间 (UTC)
    pub level_m: f64,                        // 水位 (米)
    pub pump_states: HashMap<String, bool>,  // 测量时各泵状态 (pump_id -> 开启)
}

impl Reading {
    /// 构造不带泵状态的读数 (遥测源只报水位时使用)
    pub fn new(reservoir_id: &str, timestamp: DateTime<Utc>, level_m: f64) -> Self {
        Self {
            reservoir_id: reservoir_id.to_string(),
            timestamp,
            level_m,
            pump_states: HashMap::new(),
        }
    }

    /// 读数相对 now 的年龄 (分钟)
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.timestamp).num_minutes()
    }
}

// ==========================================
// 读数序列规范化
// ==========================================

/// 将读数序列规范化为按时间升序、时间戳唯一的序列
///
/// 规则:
/// - 按时间戳升序排序
/// - 重复时间戳合并为一条, 水位取算术平均
/// - 合并时泵状态取最后一条 (泵状态不参与平均)
///
/// 预测与趋势分析均以规范化序列为输入, 保证确定性。
pub fn normalize_readings(readings: &[Reading]) -> Vec<Reading> {
    let mut sorted: Vec<Reading> = readings.to_vec();
    sorted.sort_by_key(|r| r.timestamp);

    let mut result: Vec<Reading> = Vec::with_capacity(sorted.len());
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j].timestamp == sorted[i].timestamp {
            j += 1;
        }
        if j == i + 1 {
            result.push(sorted[i].clone());
        } else {
            // 重复时间戳: 水位取均值, 其余字段取最后一条
            let span = &sorted[i..j];
            let mean = span.iter().map(|r| r.level_m).sum::<f64>() / span.len() as f64;
            let mut merged = span[span.len() - 1].clone();
            merged.level_m = mean;
            result.push(merged);
        }
        i = j;
    }
    result
}
