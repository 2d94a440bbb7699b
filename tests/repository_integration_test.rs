// ==========================================
// 仓储层集成测试 (真实 SQLite 文件)
// ==========================================

use chrono::{DateTime, Duration, TimeZone, Utc};
use reservoir_automation::db;
use reservoir_automation::domain::{Decision, DecisionFilter, DecisionOutcome, FailureKind, Reading};
use reservoir_automation::repository::{DecisionLogRepository, ReadingRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Arc<Mutex<Connection>>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let conn = db::open_sqlite_connection(path.to_str().unwrap()).unwrap();
    (dir, Arc::new(Mutex::new(conn)))
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

// ==========================================
// 读数仓储
// ==========================================

#[test]
fn test_reading_roundtrip_and_ordering() {
    let (_dir, conn) = create_test_db();
    let repo = ReadingRepository::new(conn).unwrap();

    // 乱序插入
    for (offset, level) in [(30, 52.0), (0, 50.0), (15, 51.0)] {
        let mut reading = Reading::new("gagok", base_time() + Duration::minutes(offset), level);
        reading.pump_states.insert("pump1".to_string(), level > 51.0);
        repo.insert(&reading).unwrap();
    }
    // 其他水库的读数不得混入
    repo.insert(&Reading::new("haeryong", base_time(), 70.0)).unwrap();

    let history = repo.query_history("gagok", base_time()).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].level_m, 50.0);
    assert_eq!(history[1].level_m, 51.0);
    assert_eq!(history[2].level_m, 52.0);
    assert_eq!(history[2].pump_states.get("pump1"), Some(&true));
}

#[test]
fn test_reading_since_filter_and_latest() {
    let (_dir, conn) = create_test_db();
    let repo = ReadingRepository::new(conn).unwrap();

    for offset in [0, 60, 120, 180] {
        repo.insert(&Reading::new(
            "gagok",
            base_time() + Duration::minutes(offset),
            50.0 + offset as f64 / 60.0,
        ))
        .unwrap();
    }

    let recent = repo
        .query_history("gagok", base_time() + Duration::minutes(60))
        .unwrap();
    assert_eq!(recent.len(), 3, "since 为闭区间下界");

    let latest = repo.latest("gagok").unwrap().unwrap();
    assert_eq!(latest.timestamp, base_time() + Duration::minutes(180));
    assert_eq!(latest.level_m, 53.0);

    assert!(repo.latest("unknown").unwrap().is_none());
}

// ==========================================
// 决策日志仓储
// ==========================================

fn decision(
    reservoir_id: &str,
    minute_offset: i64,
    outcome: DecisionOutcome,
    error_kind: Option<FailureKind>,
) -> Decision {
    let mut d = Decision::new(
        reservoir_id,
        Some("pump1"),
        base_time() + Duration::minutes(minute_offset),
    );
    d.chosen_action = "PUMP_ON".to_string();
    d.rule = Some("LOW_THRESHOLD_ON".to_string());
    d.rationale = format!("第 {} 分钟的测试决策", minute_offset);
    d.outcome = outcome;
    d.error_kind = error_kind;
    d.input_snapshot = Some(serde_json::json!({"level_m": 38.5}));
    d
}

#[test]
fn test_decision_append_and_roundtrip() {
    let (_dir, conn) = create_test_db();
    let repo = DecisionLogRepository::new(conn).unwrap();

    let original = decision("gagok", 0, DecisionOutcome::Applied, None);
    let id = repo.append(&original).unwrap();
    assert_eq!(id, original.decision_id);

    let rows = repo.query(&DecisionFilter::default()).unwrap();
    assert_eq!(rows.len(), 1);
    let loaded = &rows[0];
    assert_eq!(loaded.decision_id, original.decision_id);
    assert_eq!(loaded.decision_ts, original.decision_ts);
    assert_eq!(loaded.chosen_action, "PUMP_ON");
    assert_eq!(loaded.rule.as_deref(), Some("LOW_THRESHOLD_ON"));
    assert_eq!(loaded.outcome, DecisionOutcome::Applied);
    assert_eq!(loaded.error_kind, None);
    assert_eq!(
        loaded.input_snapshot,
        Some(serde_json::json!({"level_m": 38.5}))
    );
}

#[test]
fn test_decision_query_is_newest_first() {
    let (_dir, conn) = create_test_db();
    let repo = DecisionLogRepository::new(conn).unwrap();

    for offset in [0, 30, 15] {
        repo.append(&decision("gagok", offset, DecisionOutcome::Applied, None))
            .unwrap();
    }

    let rows = repo.query(&DecisionFilter::default()).unwrap();
    let offsets: Vec<i64> = rows
        .iter()
        .map(|d| (d.decision_ts - base_time()).num_minutes())
        .collect();
    assert_eq!(offsets, vec![30, 15, 0], "必须按时间倒序返回");
}

#[test]
fn test_decision_query_filters() {
    let (_dir, conn) = create_test_db();
    let repo = DecisionLogRepository::new(conn).unwrap();

    repo.append(&decision("gagok", 0, DecisionOutcome::Applied, None)).unwrap();
    repo.append(&decision(
        "gagok",
        10,
        DecisionOutcome::Skipped,
        Some(FailureKind::PolicyViolation),
    ))
    .unwrap();
    repo.append(&decision(
        "haeryong",
        20,
        DecisionOutcome::Failed,
        Some(FailureKind::ActuationTimeout),
    ))
    .unwrap();

    // 按水库
    let rows = repo
        .query(&DecisionFilter {
            reservoir_id: Some("gagok".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 2);

    // 按结果
    let rows = repo
        .query(&DecisionFilter {
            outcome: Some(DecisionOutcome::Failed),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].error_kind, Some(FailureKind::ActuationTimeout));

    // 按起始时间 (含边界)
    let rows = repo
        .query(&DecisionFilter {
            since: Some(base_time() + Duration::minutes(10)),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 2);

    // 条数上限
    let rows = repo
        .query(&DecisionFilter {
            limit: Some(1),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reservoir_id, "haeryong", "上限裁剪后保留最新记录");
}
