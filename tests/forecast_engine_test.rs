// ==========================================
// ForecastEngine 单元测试
// ==========================================

use chrono::{DateTime, Duration, TimeZone, Utc};
use reservoir_automation::domain::{Reading, TrendDirection};
use reservoir_automation::engine::forecast::{blend_weight, confidence};
use reservoir_automation::engine::{EngineError, ForecastEngine};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

fn readings(interval_minutes: i64, levels: &[f64]) -> Vec<Reading> {
    levels
        .iter()
        .enumerate()
        .map(|(i, level)| {
            Reading::new(
                "gagok",
                base_time() + Duration::minutes(interval_minutes * i as i64),
                *level,
            )
        })
        .collect()
}

#[test]
fn test_predict_is_deterministic() {
    let engine = ForecastEngine::new();
    let data = readings(15, &[70.5, 71.2, 72.1, 70.8]);
    let as_of = base_time() + Duration::minutes(45);

    let a = engine.predict("gagok", &data, 180, as_of).unwrap();
    let b = engine.predict("gagok", &data, 180, as_of).unwrap();
    assert_eq!(a, b, "相同输入必须产出相同预测");
}

#[test]
fn test_predict_output_bounds() {
    let engine = ForecastEngine::new();
    let shapes: Vec<Vec<f64>> = vec![
        vec![70.5, 71.2, 72.1, 70.8],
        vec![50.0, 50.0, 50.0, 50.0, 50.0],
        vec![40.0, 45.0, 50.0, 55.0, 60.0, 65.0],
        vec![80.0, 78.0, 75.0, 71.0],
    ];
    let as_of = base_time() + Duration::hours(2);

    for levels in shapes {
        let data = readings(15, &levels);
        let result = engine.predict("gagok", &data, 30, as_of).unwrap();
        assert!(result.predicted_level_m.is_finite(), "预测水位必须有限");
        assert!(
            (0.0..=1.0).contains(&result.confidence),
            "置信度必须在 [0,1]: {}",
            result.confidence
        );
    }
}

#[test]
fn test_linear_rising_series_predicts_rising() {
    let engine = ForecastEngine::new();
    // 每 15 分钟上升 1 米, 21 条读数 → 回归与移动平均两个估计器斜率一致
    let levels: Vec<f64> = (0..21).map(|i| 40.0 + i as f64).collect();
    let data = readings(15, &levels);
    let as_of = base_time() + Duration::minutes(300);

    let result = engine.predict("gagok", &data, 30, as_of).unwrap();
    assert_eq!(result.trend, TrendDirection::Rising);
    // 两个估计器一致时混合权重不影响外推结果: 60 + 30/15 = 62
    assert!(
        (result.predicted_level_m - 62.0).abs() < 1e-9,
        "线性序列外推应为 62.0: 实际 {}",
        result.predicted_level_m
    );
}

#[test]
fn test_flat_series_predicts_stable() {
    let engine = ForecastEngine::new();
    let data = readings(10, &[55.0, 55.0, 55.0, 55.0]);
    let as_of = base_time() + Duration::minutes(30);

    let result = engine.predict("gagok", &data, 60, as_of).unwrap();
    assert_eq!(result.trend, TrendDirection::Stable);
    assert!((result.predicted_level_m - 55.0).abs() < 1e-9);
}

#[test]
fn test_horizon_beyond_span_degrades_confidence() {
    let engine = ForecastEngine::new();
    // 跨度 45 分钟, 时域 180 分钟 → 置信度按 span/horizon 衰减
    let data = readings(15, &[70.5, 71.2, 72.1, 70.8]);
    let as_of = base_time() + Duration::minutes(45);

    let near = engine.predict("gagok", &data, 30, as_of).unwrap();
    let far = engine.predict("gagok", &data, 180, as_of).unwrap();
    assert!(
        far.confidence < near.confidence,
        "时域越过回看跨度后置信度必须下降: near={} far={}",
        near.confidence,
        far.confidence
    );
    assert!(far.confidence <= near.confidence * (45.0 / 180.0) + 1e-9);
}

#[test]
fn test_predict_matches_documented_blend_formula() {
    // 用公开的底层构件按文档公式重算, 与 predict 输出对照,
    // 不硬编码预测常数
    let engine = ForecastEngine::new();
    let levels = [70.5, 71.2, 72.1, 70.8];
    let data = readings(15, &levels);
    let as_of = base_time() + Duration::minutes(45);
    let horizon = 180i64;

    let points: Vec<(f64, f64)> = levels
        .iter()
        .enumerate()
        .map(|(i, level)| (15.0 * i as f64, *level))
        .collect();
    let span = 45.0;
    let fit = reservoir_automation::engine::forecast::linear_fit(&points);
    let ma = reservoir_automation::engine::forecast::moving_average_trend(
        &points,
        reservoir_automation::engine::forecast::MA_WINDOW,
    );
    let t_pred = 45.0 + horizon as f64;
    let w = blend_weight(fit.r_squared, points.len(), horizon as f64, span);
    let expected = w * (fit.intercept + fit.slope * t_pred)
        + (1.0 - w) * (ma.anchor_level + ma.slope * (t_pred - ma.anchor_t));

    let result = engine.predict("gagok", &data, horizon, as_of).unwrap();
    assert!(
        (result.predicted_level_m - expected).abs() < 1e-9,
        "预测值 {} 与文档公式重算值 {} 不一致",
        result.predicted_level_m,
        expected
    );
    let expected_confidence = confidence(fit.r_squared, points.len(), horizon as f64, span);
    assert!((result.confidence - expected_confidence).abs() < 1e-9);
}

#[test]
fn test_insufficient_data_rejected() {
    let engine = ForecastEngine::new();
    let as_of = base_time();

    let err = engine.predict("gagok", &[], 30, as_of).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientData { .. }));

    // 重复时间戳合并后只剩一条, 同样不足
    let dup = vec![
        Reading::new("gagok", base_time(), 50.0),
        Reading::new("gagok", base_time(), 52.0),
    ];
    let err = engine.predict("gagok", &dup, 30, as_of).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientData { needed: 2, got: 1, .. }
    ));
}

#[test]
fn test_invalid_horizon_rejected() {
    let engine = ForecastEngine::new();
    let data = readings(15, &[50.0, 51.0, 52.0]);
    let err = engine.predict("gagok", &data, 0, base_time()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
}

// ==========================================
// 混合权重属性
// ==========================================

#[test]
fn test_blend_weight_monotonic_in_r_squared() {
    let mut prev = -1.0;
    for step in 0..=10 {
        let r2 = step as f64 / 10.0;
        let w = blend_weight(r2, 20, 30.0, 240.0);
        assert!(w >= prev, "权重必须对 R² 单调不减");
        assert!((0.0..=1.0).contains(&w));
        prev = w;
    }
}

#[test]
fn test_blend_weight_monotonic_in_sample_count() {
    let mut prev = -1.0;
    for n in [2usize, 4, 8, 16, 64, 256] {
        let w = blend_weight(0.9, n, 30.0, 240.0);
        assert!(w >= prev, "权重必须对样本数单调不减");
        prev = w;
    }
}

#[test]
fn test_blend_weight_nonincreasing_in_horizon() {
    let mut prev = 2.0;
    for horizon in [5.0, 15.0, 30.0, 60.0, 180.0, 720.0] {
        let w = blend_weight(0.9, 20, horizon, 240.0);
        assert!(w <= prev, "权重必须对时域单调不增");
        prev = w;
    }
}

#[test]
fn test_confidence_bounds_over_grid() {
    for r2 in [0.0, 0.3, 0.7, 1.0] {
        for n in [2usize, 5, 50] {
            for horizon in [10.0, 240.0, 2000.0] {
                let c = confidence(r2, n, horizon, 240.0);
                assert!((0.0..=1.0).contains(&c), "置信度越界: {}", c);
            }
        }
    }
}
