// ==========================================
// 水库泵站自动化系统 - 水位读数仓储
// ==========================================
// 对齐: water_reading 表
// 红线: Repository 不做业务逻辑, 只做数据映射
// ==========================================

use crate::domain::Reading;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// ReadingRepository - 水位读数仓储
// ==========================================
pub struct ReadingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReadingRepository {
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
            CREATE TABLE IF NOT EXISTS water_reading (
                reading_id TEXT PRIMARY KEY,
                reservoir_id TEXT NOT NULL,
                measured_at TEXT NOT NULL,
                level_m REAL NOT NULL,
                pump_states_json TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_water_reading_res_ts
                ON water_reading (reservoir_id, measured_at);
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入一条读数
    pub fn insert(&self, reading: &Reading) -> RepositoryResult<()> {
        let pump_states_json = serde_json::to_string(&reading.pump_states)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO water_reading (
                reading_id, reservoir_id, measured_at, level_m, pump_states_json
            ) VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                Uuid::new_v4().to_string(),
                reading.reservoir_id,
                reading.timestamp,
                reading.level_m,
                pump_states_json,
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询某水库自 since 起的历史读数, 按时间升序
    pub fn query_history(
        &self,
        reservoir_id: &str,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Reading>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reservoir_id, measured_at, level_m, pump_states_json
            FROM water_reading
            WHERE reservoir_id = ?1 AND measured_at >= ?2
            ORDER BY measured_at ASC
            "#,
        )?;

        let rows = stmt.query_map(params![reservoir_id, since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, DateTime<Utc>>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut readings = Vec::new();
        for row in rows {
            let (reservoir_id, timestamp, level_m, pump_states_json) = row?;
            let pump_states: HashMap<String, bool> = match pump_states_json {
                Some(text) => serde_json::from_str(&text)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                None => HashMap::new(),
            };
            readings.push(Reading {
                reservoir_id,
                timestamp,
                level_m,
                pump_states,
            });
        }
        Ok(readings)
    }

    /// 查询某水库的最新一条读数
    pub fn latest(&self, reservoir_id: &str) -> RepositoryResult<Option<Reading>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reservoir_id, measured_at, level_m, pump_states_json
            FROM water_reading
            WHERE reservoir_id = ?1
            ORDER BY measured_at DESC
            LIMIT 1
            "#,
        )?;

        let mut rows = stmt.query_map(params![reservoir_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, DateTime<Utc>>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        match rows.next() {
            Some(row) => {
                let (reservoir_id, timestamp, level_m, pump_states_json) = row?;
                let pump_states: HashMap<String, bool> = match pump_states_json {
                    Some(text) => serde_json::from_str(&text)
                        .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                    None => HashMap::new(),
                };
                Ok(Some(Reading {
                    reservoir_id,
                    timestamp,
                    level_m,
                    pump_states,
                }))
            }
            None => Ok(None),
        }
    }
}
