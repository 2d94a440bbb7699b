// ==========================================
// 水库泵站自动化系统 - 趋势分析器
// ==========================================
// 职责: 变化率/加速度计算, 告警到达预测, 时段对比
// 红线: 与预测引擎同样确定性, 不读时钟不引入随机性
// ==========================================

use crate::domain::reading::{normalize_readings, Reading};
use crate::domain::{AlertPrediction, PeriodComparison, TrendMetrics};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::forecast::linear_fit;
use chrono::{DateTime, Duration, Utc};

/// 可判定趋势的最小变化率 (米/小时)
/// 低于此值视为持平, 告警到达预测返回"不可达"而非荒谬的超长 ETA
pub const MIN_DETECTABLE_RATE_M_PER_HOUR: f64 = 0.06;

// ==========================================
// TrendAnalyzer - 趋势分析器
// ==========================================
pub struct TrendAnalyzer {
    // 无状态引擎, 不需要注入依赖
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendAnalyzer {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算窗口内的变化率与加速度
    ///
    /// # 返回
    /// - `Ok(TrendMetrics)`: rate 为整窗回归斜率 (米/小时);
    ///   acceleration 为前后两个等分子窗口的回归斜率之差除以子窗口中心间隔,
    ///   子窗口各自不足 2 条读数时加速度取 0
    /// - `Err(InsufficientData)`: 互异时间戳不足 2 个
    pub fn analyze(&self, readings: &[Reading]) -> EngineResult<TrendMetrics> {
        let points = to_hour_points(readings)?;
        let n = points.len();

        let fit = linear_fit(&points);
        let window_hours = points[n - 1].0 - points[0].0;

        // 前后等分子窗口的斜率差 → 加速度
        let acceleration = if n >= 4 {
            let mid = n / 2;
            let first = &points[..mid];
            let second = &points[mid..];
            let rate1 = linear_fit(first).slope;
            let rate2 = linear_fit(second).slope;
            let center1 = first.iter().map(|p| p.0).sum::<f64>() / first.len() as f64;
            let center2 = second.iter().map(|p| p.0).sum::<f64>() / second.len() as f64;
            let dt = center2 - center1;
            if dt > 0.0 {
                (rate2 - rate1) / dt
            } else {
                0.0
            }
        } else {
            0.0
        };

        Ok(TrendMetrics {
            rate_m_per_hour: fit.slope,
            acceleration_m_per_hour2: acceleration,
            window_hours,
            sample_count: n,
        })
    }

    /// 预测水位到达告警阈值的时间
    ///
    /// # 参数
    /// - `threshold_m`: 告警阈值 (米)
    /// - `max_horizon_hours`: 置信上限 (小时); 解超出此值视为不可达,
    ///   eta/hours_until 均为 None
    /// - `as_of`: 计算基准时间 (eta = as_of + hours_until)
    ///
    /// # 算法
    /// 以最新水位为起点, 按 level(t) = L₀ + r·t + a/2·t² 外推,
    /// 求最小非负根。变化率与加速度都小到不可判定时视为不可达。
    pub fn predict_alert(
        &self,
        readings: &[Reading],
        threshold_m: f64,
        max_horizon_hours: f64,
        as_of: DateTime<Utc>,
    ) -> EngineResult<AlertPrediction> {
        let metrics = self.analyze(readings)?;
        let normalized = normalize_readings(readings);
        let current_level = normalized[normalized.len() - 1].level_m;

        // 已在阈值之上: 立即到达
        if current_level >= threshold_m {
            return Ok(AlertPrediction {
                threshold_m,
                eta: Some(as_of),
                hours_until: Some(0.0),
                will_reach: true,
            });
        }

        let hours = solve_time_to_threshold(
            current_level,
            metrics.rate_m_per_hour,
            metrics.acceleration_m_per_hour2,
            threshold_m,
        );

        match hours {
            Some(t) if t <= max_horizon_hours => Ok(AlertPrediction {
                threshold_m,
                eta: Some(as_of + Duration::seconds((t * 3600.0).round() as i64)),
                hours_until: Some(t),
                will_reach: true,
            }),
            // 无解或解超出置信上限: 一律按不可达处理
            _ => Ok(AlertPrediction {
                threshold_m,
                eta: None,
                hours_until: None,
                will_reach: false,
            }),
        }
    }

    /// 对比两个时段的平均水位 (边界含端点)
    ///
    /// # 返回
    /// - `Err(InsufficientData)`: 任一时段内无读数
    pub fn compare_periods(
        &self,
        readings: &[Reading],
        period_a: (DateTime<Utc>, DateTime<Utc>),
        period_b: (DateTime<Utc>, DateTime<Utc>),
    ) -> EngineResult<PeriodComparison> {
        let normalized = normalize_readings(readings);

        let in_period = |r: &&Reading, p: (DateTime<Utc>, DateTime<Utc>)| {
            r.timestamp >= p.0 && r.timestamp <= p.1
        };
        let levels_a: Vec<f64> = normalized
            .iter()
            .filter(|r| in_period(r, period_a))
            .map(|r| r.level_m)
            .collect();
        let levels_b: Vec<f64> = normalized
            .iter()
            .filter(|r| in_period(r, period_b))
            .map(|r| r.level_m)
            .collect();

        if levels_a.is_empty() || levels_b.is_empty() {
            return Err(EngineError::InsufficientData {
                context: "时段对比".to_string(),
                needed: 1,
                got: levels_a.len().min(levels_b.len()),
            });
        }

        let mean_a = levels_a.iter().sum::<f64>() / levels_a.len() as f64;
        let mean_b = levels_b.iter().sum::<f64>() / levels_b.len() as f64;

        Ok(PeriodComparison {
            mean_a,
            mean_b,
            delta: mean_b - mean_a,
            count_a: levels_a.len(),
            count_b: levels_b.len(),
        })
    }
}

// ==========================================
// 求解工具
// ==========================================

/// 求 level(t) = L₀ + r·t + a/2·t² 到达 threshold 的最小非负根 (小时)
///
/// 规则:
/// - |a| 可忽略时退化为线性: 变化率低于 MIN_DETECTABLE_RATE_M_PER_HOUR
///   或方向背离阈值则不可达
/// - 二次情形取判别式非负时的最小非负根; 判别式为负说明
///   外推曲线在到达阈值前折返, 同样不可达
pub fn solve_time_to_threshold(
    level_now: f64,
    rate_m_per_hour: f64,
    accel_m_per_hour2: f64,
    threshold_m: f64,
) -> Option<f64> {
    let delta = threshold_m - level_now;
    if delta <= 0.0 {
        return Some(0.0);
    }

    const ACCEL_EPS: f64 = 1e-9;
    if accel_m_per_hour2.abs() < ACCEL_EPS {
        // 线性情形
        if rate_m_per_hour < MIN_DETECTABLE_RATE_M_PER_HOUR {
            return None;
        }
        return Some(delta / rate_m_per_hour);
    }

    // a/2·t² + r·t - delta = 0
    let a = accel_m_per_hour2 / 2.0;
    let r = rate_m_per_hour;
    let disc = r * r + 4.0 * a * delta;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (-r - sqrt_disc) / (2.0 * a);
    let t2 = (-r + sqrt_disc) / (2.0 * a);

    let mut best: Option<f64> = None;
    for t in [t1, t2] {
        if t >= 0.0 && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    }

    // 慢速接近的线性保护: 根存在但当前变化趋势实质持平时不报 ETA
    if let Some(t) = best {
        let rate_at_reach = r + accel_m_per_hour2 * t;
        if rate_at_reach < MIN_DETECTABLE_RATE_M_PER_HOUR && r < MIN_DETECTABLE_RATE_M_PER_HOUR {
            return None;
        }
    }
    best
}

/// 读数 → (距首条读数的小时数, 水位) 点列
fn to_hour_points(readings: &[Reading]) -> EngineResult<Vec<(f64, f64)>> {
    let normalized = normalize_readings(readings);
    if normalized.len() < 2 {
        return Err(EngineError::InsufficientData {
            context: "趋势分析输入".to_string(),
            needed: 2,
            got: normalized.len(),
        });
    }
    let t0 = normalized[0].timestamp;
    Ok(normalized
        .iter()
        .map(|r| {
            let hours = r.timestamp.signed_duration_since(t0).num_seconds() as f64 / 3600.0;
            (hours, r.level_m)
        })
        .collect())
}
