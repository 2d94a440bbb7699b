// ==========================================
// 水库泵站自动化系统 - 外设抽象接口
// ==========================================
// 职责: 决策循环对遥测/泵控/叙述/存储的依赖倒置
// 用途: 生产环境接现场硬件, 仿真与测试接内存实现
// ==========================================

use crate::automation::error::{ActuationError, NarrationError, TelemetryError};
use crate::domain::{Decision, DecisionFilter, PumpCommand, Reading};
use crate::repository::{DecisionLogRepository, ReadingRepository, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// ==========================================
// TelemetrySource - 遥测源
// ==========================================
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// 读取某水库的当前水位与泵状态
    async fn fetch_current(&self, reservoir_id: &str) -> Result<Reading, TelemetryError>;
}

// ==========================================
// Actuator - 泵控执行器
// ==========================================
#[async_trait]
pub trait Actuator: Send + Sync {
    /// 下发一条泵控命令
    async fn apply(&self, reservoir_id: &str, command: &PumpCommand)
        -> Result<(), ActuationError>;

    /// 降级模式下的连通性探测, 不改变泵状态
    async fn probe(&self, reservoir_id: &str, pump_id: &str) -> Result<(), ActuationError>;
}

// ==========================================
// NarrationService - 决策叙述服务
// ==========================================
// 约定: 仅用于日志可读性, 结果不写入决策记录
#[async_trait]
pub trait NarrationService: Send + Sync {
    /// 为一条决策生成人读摘要
    async fn narrate(&self, decision: &Decision) -> Result<String, NarrationError>;
}

// ==========================================
// ReadingHistory - 读数存取
// ==========================================
pub trait ReadingHistory: Send + Sync {
    /// 落库一条读数
    fn record(&self, reading: &Reading) -> RepositoryResult<()>;

    /// 查询某水库自 since 起的历史读数, 按时间升序
    fn history(&self, reservoir_id: &str, since: DateTime<Utc>)
        -> RepositoryResult<Vec<Reading>>;
}

impl ReadingHistory for ReadingRepository {
    fn record(&self, reading: &Reading) -> RepositoryResult<()> {
        self.insert(reading)
    }

    fn history(
        &self,
        reservoir_id: &str,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Reading>> {
        self.query_history(reservoir_id, since)
    }
}

// ==========================================
// DecisionStore - 决策日志存取 (仅追加)
// ==========================================
pub trait DecisionStore: Send + Sync {
    /// 追加一条决策记录
    fn append(&self, decision: &Decision) -> RepositoryResult<String>;

    /// 按过滤条件查询, 时间倒序
    fn query(&self, filter: &DecisionFilter) -> RepositoryResult<Vec<Decision>>;
}

impl DecisionStore for DecisionLogRepository {
    fn append(&self, decision: &Decision) -> RepositoryResult<String> {
        DecisionLogRepository::append(self, decision)
    }

    fn query(&self, filter: &DecisionFilter) -> RepositoryResult<Vec<Decision>> {
        DecisionLogRepository::query(self, filter)
    }
}
