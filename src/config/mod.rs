// ==========================================
// 水库泵站自动化系统 - 配置层
// ==========================================
// 职责: 自动化运行参数的定义、加载与校验
// ==========================================

pub mod automation_config;

pub use automation_config::{AutomationConfig, ConfigError, PumpConfig, ReservoirConfig};
