// ==========================================
// 水库泵站自动化系统 - 数据仓储层
// ==========================================
// 职责: 读数与决策日志的持久化访问
// 红线: Repository 不做业务逻辑, 只做数据映射
// ==========================================

pub mod decision_log_repo;
pub mod error;
pub mod reading_repo;

pub use decision_log_repo::DecisionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use reading_repo::ReadingRepository;
