// ==========================================
// 水库泵站自动化系统 - 水位预测引擎
// ==========================================
// 职责: 由历史读数产出单点预测 + 置信度 + 趋势标签
// 输入: 规范化读数序列 (时间升序, 时间戳唯一)
// 输出: ForecastResult (产出后不可变)
// 红线: 确定性 —— 除入参 as_of 外不读时钟, 不引入随机性
// ==========================================

use crate::domain::reading::{normalize_readings, Reading};
use crate::domain::types::TrendDirection;
use crate::domain::ForecastResult;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};

// ==========================================
// 算法常量
// ==========================================

/// 移动平均估计器的窗口长度 (读数条数)
pub const MA_WINDOW: usize = 10;

/// 趋势死区 (米/分钟): 混合斜率绝对值低于此值时标为 STABLE
/// 避免把测量噪声标成趋势
pub const TREND_DEAD_BAND_M_PER_MIN: f64 = 0.01;

// ==========================================
// 基础估计器
// ==========================================

/// 最小二乘拟合结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,     // 米/分钟
    pub intercept: f64, // x=0 处的水位
    pub r_squared: f64, // 决定系数 [0, 1]
}

/// 对 (x=分钟, y=水位) 点列做最小二乘线性拟合
///
/// 要求: 至少 2 个 x 互异的点 (由调用方保证)。
/// 水位序列完全平坦时 SS_tot 为 0, 此时常数线即完美拟合, R² 取 1。
pub fn linear_fit(points: &[(f64, f64)]) -> LinearFit {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    for (x, y) in points {
        ss_xx += (x - mean_x) * (x - mean_x);
        ss_xy += (x - mean_x) * (y - mean_y);
    }

    let slope = if ss_xx > 0.0 { ss_xy / ss_xx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for (x, y) in points {
        let fitted = intercept + slope * x;
        ss_tot += (y - mean_y) * (y - mean_y);
        ss_res += (y - fitted) * (y - fitted);
    }
    let r_squared = if ss_tot <= f64::EPSILON {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    LinearFit {
        slope,
        intercept,
        r_squared,
    }
}

/// 移动平均趋势估计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaTrend {
    pub slope: f64,        // 米/分钟 (两个相邻窗口均值之间的斜率)
    pub anchor_level: f64, // 最近窗口的水位均值
    pub anchor_t: f64,     // 最近窗口的时间中心 (分钟)
}

/// 短窗口移动平均斜率 (二级估计器)
///
/// 取末尾 w=min(window, n) 个点为"最近窗口", 其前 w 个点为"前一窗口",
/// 斜率 = 两窗口水位均值之差 / 两窗口时间中心之差。
/// 点数不足以构成前一窗口时斜率取 0 (只能外推为持平)。
pub fn moving_average_trend(points: &[(f64, f64)], window: usize) -> MaTrend {
    let n = points.len();
    let w = window.min(n).max(1);

    let recent = &points[n - w..];
    let recent_level = recent.iter().map(|p| p.1).sum::<f64>() / w as f64;
    let recent_t = recent.iter().map(|p| p.0).sum::<f64>() / w as f64;

    let prev_start = n.saturating_sub(2 * w);
    let prev = &points[prev_start..n - w];
    if prev.is_empty() {
        return MaTrend {
            slope: 0.0,
            anchor_level: recent_level,
            anchor_t: recent_t,
        };
    }

    let prev_level = prev.iter().map(|p| p.1).sum::<f64>() / prev.len() as f64;
    let prev_t = prev.iter().map(|p| p.0).sum::<f64>() / prev.len() as f64;
    let dt = recent_t - prev_t;
    let slope = if dt > 0.0 {
        (recent_level - prev_level) / dt
    } else {
        0.0
    };

    MaTrend {
        slope,
        anchor_level: recent_level,
        anchor_t: recent_t,
    }
}

// ==========================================
// 混合权重与置信度
// ==========================================

/// 回归/移动平均的混合权重 w ∈ [0, 1]
///
/// 公式: w = R² · n/(n+4) · span/(span+horizon)
///
/// 单调性 (属性测试验证的契约):
/// - 对 R² 单调不减: 拟合越好越信回归外推
/// - 对样本数 n 单调不减: 采样越密越信回归外推
/// - 对 horizon/span 单调不增: 时域相对回看窗口越长,
///   越偏向更平滑的移动平均估计, 避免回归外推过冲
pub fn blend_weight(r_squared: f64, sample_count: usize, horizon_minutes: f64, span_minutes: f64) -> f64 {
    let n = sample_count as f64;
    let density = n / (n + 4.0);
    let horizon_factor = if span_minutes > 0.0 {
        span_minutes / (span_minutes + horizon_minutes.max(0.0))
    } else {
        0.0
    };
    (r_squared.clamp(0.0, 1.0) * density * horizon_factor).clamp(0.0, 1.0)
}

/// 预测置信度 ∈ [0, 1]
///
/// 基值 = R² · n/(n+4); 时域超出回看窗口跨度时按 span/horizon 衰减。
pub fn confidence(r_squared: f64, sample_count: usize, horizon_minutes: f64, span_minutes: f64) -> f64 {
    let n = sample_count as f64;
    let mut value = r_squared.clamp(0.0, 1.0) * n / (n + 4.0);
    if horizon_minutes > span_minutes && horizon_minutes > 0.0 {
        value *= (span_minutes / horizon_minutes).max(0.0);
    }
    value.clamp(0.0, 1.0)
}

// ==========================================
// ForecastEngine - 预测引擎
// ==========================================
pub struct ForecastEngine {
    // 无状态引擎, 不需要注入依赖
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 产出单点预测
    ///
    /// # 参数
    /// - `reservoir_id`: 水库ID
    /// - `readings`: 历史读数 (无需预排序, 内部规范化)
    /// - `horizon_minutes`: 预测时域 (分钟), 必须大于 0
    /// - `as_of`: 预测基准时间; 预测点为 as_of + horizon
    ///
    /// # 返回
    /// - `Ok(ForecastResult)`: 预测水位有限, 置信度已钳位到 [0,1]
    /// - `Err(InsufficientData)`: 互异时间戳不足 2 个
    ///
    /// # 算法
    /// 1. 对规范化点列做最小二乘回归, 得斜率与 R²
    /// 2. 短窗口移动平均斜率作为二级估计器
    /// 3. 两种外推按 blend_weight 混合 (权重对 R² 单调)
    /// 4. 趋势标签由混合斜率对照死区 TREND_DEAD_BAND_M_PER_MIN 得出
    pub fn predict(
        &self,
        reservoir_id: &str,
        readings: &[Reading],
        horizon_minutes: i64,
        as_of: DateTime<Utc>,
    ) -> EngineResult<ForecastResult> {
        if horizon_minutes <= 0 {
            return Err(EngineError::InvalidArgument(format!(
                "horizon_minutes 必须大于 0, 实际 {}",
                horizon_minutes
            )));
        }

        let normalized = normalize_readings(readings);
        if normalized.len() < 2 {
            return Err(EngineError::InsufficientData {
                context: format!("水库 {} 预测输入", reservoir_id),
                needed: 2,
                got: normalized.len(),
            });
        }

        // x 轴: 距首条读数的分钟数
        let t0 = normalized[0].timestamp;
        let points: Vec<(f64, f64)> = normalized
            .iter()
            .map(|r| {
                let minutes = r.timestamp.signed_duration_since(t0).num_seconds() as f64 / 60.0;
                (minutes, r.level_m)
            })
            .collect();

        let span_minutes = points[points.len() - 1].0 - points[0].0;
        let fit = linear_fit(&points);
        let ma = moving_average_trend(&points, MA_WINDOW);

        // 预测点的 x 坐标: as_of + horizon 距 t0 的分钟数
        let t_pred = as_of.signed_duration_since(t0).num_seconds() as f64 / 60.0
            + horizon_minutes as f64;

        let regression_pred = fit.intercept + fit.slope * t_pred;
        let ma_pred = ma.anchor_level + ma.slope * (t_pred - ma.anchor_t);

        let weight = blend_weight(fit.r_squared, points.len(), horizon_minutes as f64, span_minutes);
        let predicted_level_m = weight * regression_pred + (1.0 - weight) * ma_pred;

        let blended_slope = weight * fit.slope + (1.0 - weight) * ma.slope;
        let trend = classify_trend(blended_slope);

        let confidence = confidence(fit.r_squared, points.len(), horizon_minutes as f64, span_minutes);

        Ok(ForecastResult {
            reservoir_id: reservoir_id.to_string(),
            as_of,
            horizon_minutes,
            predicted_level_m,
            confidence,
            trend,
        })
    }
}

/// 混合斜率 (米/分钟) 对照死区得出趋势标签
pub fn classify_trend(slope_m_per_min: f64) -> TrendDirection {
    if slope_m_per_min.abs() < TREND_DEAD_BAND_M_PER_MIN {
        TrendDirection::Stable
    } else if slope_m_per_min > 0.0 {
        TrendDirection::Rising
    } else {
        TrendDirection::Falling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_fit_exact_line() {
        // y = 2x + 1 完美拟合
        let points = vec![(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        let fit = linear_fit(&points);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_flat_series_has_full_r_squared() {
        let points = vec![(0.0, 5.0), (10.0, 5.0), (20.0, 5.0)];
        let fit = linear_fit(&points);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 1.0, "平坦序列由常数线完美拟合");
    }

    #[test]
    fn test_moving_average_trend_flat_without_prev_window() {
        // 点数等于窗口长度时没有前一窗口, 斜率为 0
        let points = vec![(0.0, 4.0), (1.0, 5.0), (2.0, 6.0)];
        let ma = moving_average_trend(&points, 3);
        assert_eq!(ma.slope, 0.0);
        assert!((ma.anchor_level - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_classify_trend_dead_band() {
        assert_eq!(classify_trend(0.005), TrendDirection::Stable);
        assert_eq!(classify_trend(-0.005), TrendDirection::Stable);
        assert_eq!(classify_trend(0.02), TrendDirection::Rising);
        assert_eq!(classify_trend(-0.02), TrendDirection::Falling);
    }
}
