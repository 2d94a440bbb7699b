// ==========================================
// 水库泵站自动化系统
// ==========================================
// 分层:
// - domain:     领域模型 (读数/预测/决策/共享枚举)
// - config:     自动化配置加载与校验
// - repository: SQLite 仓储 (读数 + 决策日志)
// - engine:     预测/趋势/策略, 确定性纯计算
// - automation: 决策循环 + 外设抽象 + 仿真
// ==========================================

pub mod automation;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod logging;
pub mod repository;

// 重导出高频类型
pub use automation::{DecisionLoop, DecisionLoopDeps, LoopStatus};
pub use config::AutomationConfig;
pub use domain::{Decision, DecisionFilter, ForecastResult, Reading};
pub use engine::{ControlPolicy, ForecastEngine, TrendAnalyzer};

/// 应用名称 (数据目录等处使用)
pub const APP_NAME: &str = "reservoir-automation";

/// 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "reservoir-automation");
    }
}
