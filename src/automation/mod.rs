// ==========================================
// 水库泵站自动化系统 - 自动化层
// ==========================================
// 职责: 决策循环编排 + 外设抽象 + 仿真实现
// 红线: 引擎层纯计算, I/O 与并发编排全部收在本层
// ==========================================

pub mod decision_loop;
pub mod error;
pub mod simulation;
pub mod state;
pub mod traits;

pub use decision_loop::{DecisionLoop, DecisionLoopDeps, LoopStatus};
pub use error::{ActuationError, NarrationError, TelemetryError};
pub use simulation::{SimulatedActuator, SimulatedTelemetrySource, SimulationHub, TemplateNarration};
pub use state::{AutomationState, PumpRuntime};
pub use traits::{Actuator, DecisionStore, NarrationService, ReadingHistory, TelemetrySource};
