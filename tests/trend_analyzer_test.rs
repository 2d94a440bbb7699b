// ==========================================
// TrendAnalyzer 单元测试
// ==========================================

use chrono::{DateTime, Duration, TimeZone, Utc};
use reservoir_automation::domain::Reading;
use reservoir_automation::engine::trend::solve_time_to_threshold;
use reservoir_automation::engine::{EngineError, TrendAnalyzer};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap()
}

/// 每 30 分钟一条、按 rate (米/小时) 线性上升的读数序列
fn linear_series(start_level: f64, rate_m_per_hour: f64, count: usize) -> Vec<Reading> {
    (0..count)
        .map(|i| {
            let hours = i as f64 * 0.5;
            Reading::new(
                "gagok",
                base_time() + Duration::minutes(30 * i as i64),
                start_level + rate_m_per_hour * hours,
            )
        })
        .collect()
}

#[test]
fn test_analyze_linear_series() {
    let analyzer = TrendAnalyzer::new();
    let data = linear_series(70.0, 1.5, 8);

    let metrics = analyzer.analyze(&data).unwrap();
    assert!((metrics.rate_m_per_hour - 1.5).abs() < 1e-9);
    assert!(metrics.acceleration_m_per_hour2.abs() < 1e-9, "线性序列加速度为 0");
    assert!((metrics.window_hours - 3.5).abs() < 1e-9);
    assert_eq!(metrics.sample_count, 8);
}

#[test]
fn test_analyze_accelerating_series() {
    let analyzer = TrendAnalyzer::new();
    // 前半段持平, 后半段上升 → 加速度为正
    let levels = [50.0, 50.0, 50.0, 50.0, 50.5, 51.5, 53.0, 55.0];
    let data: Vec<Reading> = levels
        .iter()
        .enumerate()
        .map(|(i, level)| {
            Reading::new("gagok", base_time() + Duration::minutes(30 * i as i64), *level)
        })
        .collect();

    let metrics = analyzer.analyze(&data).unwrap();
    assert!(metrics.rate_m_per_hour > 0.0);
    assert!(metrics.acceleration_m_per_hour2 > 0.0, "后半段更陡, 加速度应为正");
}

#[test]
fn test_analyze_insufficient_data() {
    let analyzer = TrendAnalyzer::new();
    let err = analyzer.analyze(&linear_series(70.0, 1.0, 1)).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientData { .. }));
}

// ==========================================
// 告警到达预测
// ==========================================

#[test]
fn test_predict_alert_linear_eta() {
    let analyzer = TrendAnalyzer::new();
    // 从 70.0 以 1.5 米/小时上升, 3.5 小时后当前水位 75.25
    let data = linear_series(70.0, 1.5, 8);
    let as_of = base_time() + Duration::minutes(210);

    let alert = analyzer.predict_alert(&data, 100.0, 24.0, as_of).unwrap();
    assert!(alert.will_reach);
    let hours = alert.hours_until.unwrap();
    // (100 - 75.25) / 1.5 = 16.5 小时
    assert!((hours - 16.5).abs() < 0.01, "ETA 偏差过大: {}", hours);
    let eta = alert.eta.unwrap();
    let expected_eta = as_of + Duration::minutes(16 * 60 + 30);
    assert!((eta - expected_eta).num_seconds().abs() < 60);
}

#[test]
fn test_predict_alert_beyond_horizon_is_unreachable() {
    let analyzer = TrendAnalyzer::new();
    let data = linear_series(70.0, 1.5, 8);
    let as_of = base_time() + Duration::minutes(210);

    // ETA 16.5 小时 > 置信上限 10 小时 → 与无解同等对待
    let alert = analyzer.predict_alert(&data, 100.0, 10.0, as_of).unwrap();
    assert!(!alert.will_reach);
    assert_eq!(alert.eta, None);
    assert_eq!(alert.hours_until, None);

    // 上限放宽后同一输入重新可达
    let alert = analyzer.predict_alert(&data, 100.0, 24.0, as_of).unwrap();
    assert!(alert.will_reach);
    assert!(alert.eta.is_some());
}

#[test]
fn test_predict_alert_wrong_direction() {
    let analyzer = TrendAnalyzer::new();
    let data = linear_series(80.0, -2.0, 8);
    let as_of = base_time() + Duration::minutes(210);

    let alert = analyzer.predict_alert(&data, 100.0, 24.0, as_of).unwrap();
    assert!(!alert.will_reach);
    assert_eq!(alert.eta, None);
    assert_eq!(alert.hours_until, None);
}

#[test]
fn test_predict_alert_already_above_threshold() {
    let analyzer = TrendAnalyzer::new();
    let data = linear_series(95.0, 1.0, 8);
    let as_of = base_time() + Duration::minutes(210);

    let alert = analyzer.predict_alert(&data, 90.0, 24.0, as_of).unwrap();
    assert!(alert.will_reach);
    assert_eq!(alert.hours_until, Some(0.0));
    assert_eq!(alert.eta, Some(as_of));
}

#[test]
fn test_solve_quadratic_reversal() {
    // 上升但强减速, 外推曲线在到达阈值前折返 → 不可达
    assert_eq!(solve_time_to_threshold(75.0, 1.0, -2.0, 100.0), None);
    // 减速不足以折返 → 仍可达
    let t = solve_time_to_threshold(90.0, 5.0, -0.1, 100.0).unwrap();
    assert!(t > 2.0 && t < 3.0, "减速下 ETA 应晚于线性解 2.0: {}", t);
}

#[test]
fn test_solve_rate_below_floor() {
    // 变化率低于可判定下限, 不给出荒谬的超长 ETA
    assert_eq!(solve_time_to_threshold(75.0, 0.01, 0.0, 100.0), None);
}

// ==========================================
// 时段对比
// ==========================================

#[test]
fn test_compare_periods() {
    let analyzer = TrendAnalyzer::new();
    let data = linear_series(70.0, 2.0, 8); // 0h:70 .. 3.5h:77

    let period_a = (base_time(), base_time() + Duration::minutes(90)); // 70,71,72,73
    let period_b = (
        base_time() + Duration::minutes(120),
        base_time() + Duration::minutes(210),
    ); // 74,75,76,77

    let cmp = analyzer.compare_periods(&data, period_a, period_b).unwrap();
    assert!((cmp.mean_a - 71.5).abs() < 1e-9);
    assert!((cmp.mean_b - 75.5).abs() < 1e-9);
    assert!((cmp.delta - 4.0).abs() < 1e-9);
    assert_eq!(cmp.count_a, 4);
    assert_eq!(cmp.count_b, 4);
}

#[test]
fn test_compare_periods_empty_period_rejected() {
    let analyzer = TrendAnalyzer::new();
    let data = linear_series(70.0, 2.0, 4);

    let period_a = (base_time(), base_time() + Duration::minutes(90));
    let empty = (
        base_time() + Duration::hours(10),
        base_time() + Duration::hours(12),
    );
    let err = analyzer.compare_periods(&data, period_a, empty).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientData { .. }));
}
