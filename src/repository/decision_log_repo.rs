// ==========================================
// 水库泵站自动化系统 - 决策日志仓储
// ==========================================
// 对齐: decision_log 表
// 红线: 只增不改, 本仓储不提供 UPDATE/DELETE
// ==========================================

use crate::domain::types::{DecisionOutcome, FailureKind};
use crate::domain::{Decision, DecisionFilter};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// DecisionLogRepository - 决策日志仓储
// ==========================================
pub struct DecisionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DecisionLogRepository {
    /// 创建仓储并确保表存在 (幂等)
    pub fn new(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS decision_log (
                decision_id TEXT PRIMARY KEY,
                reservoir_id TEXT NOT NULL,
                pump_id TEXT,
                decision_ts TEXT NOT NULL,
                input_snapshot_json TEXT,
                chosen_action TEXT NOT NULL,
                rule TEXT,
                rationale TEXT NOT NULL,
                outcome TEXT NOT NULL,
                error_kind TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_decision_log_res_ts
                ON decision_log (reservoir_id, decision_ts);
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // 写入操作 (仅追加)
    // ==========================================

    /// 追加一条决策记录
    ///
    /// # 返回
    /// - `Ok(decision_id)`: 成功追加
    pub fn append(&self, decision: &Decision) -> RepositoryResult<String> {
        let snapshot_json = decision.input_snapshot.as_ref().map(|v| v.to_string());

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO decision_log (
                decision_id, reservoir_id, pump_id, decision_ts,
                input_snapshot_json, chosen_action, rule, rationale,
                outcome, error_kind
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                decision.decision_id,
                decision.reservoir_id,
                decision.pump_id,
                decision.decision_ts,
                snapshot_json,
                decision.chosen_action,
                decision.rule,
                decision.rationale,
                decision.outcome.as_str(),
                decision.error_kind.map(|k| k.as_str().to_string()),
            ],
        )?;
        Ok(decision.decision_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按过滤条件查询决策记录, 时间倒序 (最新在前)
    pub fn query(&self, filter: &DecisionFilter) -> RepositoryResult<Vec<Decision>> {
        let mut sql = String::from(
            r#"
            SELECT decision_id, reservoir_id, pump_id, decision_ts,
                   input_snapshot_json, chosen_action, rule, rationale,
                   outcome, error_kind
            FROM decision_log
            WHERE 1=1
            "#,
        );
        let mut bound: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(reservoir_id) = &filter.reservoir_id {
            sql.push_str(" AND reservoir_id = ?");
            bound.push(Box::new(reservoir_id.clone()));
        }
        if let Some(outcome) = filter.outcome {
            sql.push_str(" AND outcome = ?");
            bound.push(Box::new(outcome.as_str().to_string()));
        }
        if let Some(since) = filter.since {
            sql.push_str(" AND decision_ts >= ?");
            bound.push(Box::new(since));
        }
        sql.push_str(" ORDER BY decision_ts DESC, decision_id DESC LIMIT ?");
        bound.push(Box::new(
            i64::from(filter.limit.unwrap_or(DecisionFilter::DEFAULT_LIMIT)),
        ));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            Self::row_to_parts,
        )?;

        let mut decisions = Vec::new();
        for row in rows {
            decisions.push(Self::parts_to_decision(row?)?);
        }
        Ok(decisions)
    }

    // ===== 行映射 =====

    #[allow(clippy::type_complexity)]
    fn row_to_parts(
        row: &Row<'_>,
    ) -> rusqlite::Result<(
        String,
        String,
        Option<String>,
        DateTime<Utc>,
        Option<String>,
        String,
        Option<String>,
        String,
        String,
        Option<String>,
    )> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
        ))
    }

    #[allow(clippy::type_complexity)]
    fn parts_to_decision(
        parts: (
            String,
            String,
            Option<String>,
            DateTime<Utc>,
            Option<String>,
            String,
            Option<String>,
            String,
            String,
            Option<String>,
        ),
    ) -> RepositoryResult<Decision> {
        let (
            decision_id,
            reservoir_id,
            pump_id,
            decision_ts,
            snapshot_json,
            chosen_action,
            rule,
            rationale,
            outcome_str,
            error_kind_str,
        ) = parts;

        let input_snapshot = match snapshot_json {
            Some(text) => Some(
                serde_json::from_str(&text)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
            ),
            None => None,
        };
        let outcome = DecisionOutcome::from_str(&outcome_str).ok_or_else(|| {
            RepositoryError::ValidationError(format!("未知的 outcome 值: {}", outcome_str))
        })?;
        let error_kind = error_kind_str.as_deref().and_then(FailureKind::from_str);

        Ok(Decision {
            decision_id,
            reservoir_id,
            pump_id,
            decision_ts,
            input_snapshot,
            chosen_action,
            rule,
            rationale,
            outcome,
            error_kind,
        })
    }
}
