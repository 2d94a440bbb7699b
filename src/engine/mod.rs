// ==========================================
// 水库泵站自动化系统 - 引擎层
// ==========================================
// 职责: 预测 / 趋势分析 / 泵控策略, 全部为确定性纯计算
// 红线: 引擎层不做 I/O, 不持有连接, 不读系统时钟
// ==========================================

pub mod error;
pub mod forecast;
pub mod policy;
pub mod trend;

pub use error::{EngineError, EngineResult};
pub use forecast::ForecastEngine;
pub use policy::{ControlPolicy, PolicyDecision};
pub use trend::TrendAnalyzer;
