// ==========================================
// 水库泵站自动化系统 - 仿真外设
// ==========================================
// 职责: 无现场硬件时跑通整条决策链路的内存外设
// 模型: 水位自然消落, 泵开启时注水; 简单线性动力学
// ==========================================

use crate::automation::error::{ActuationError, NarrationError, TelemetryError};
use crate::automation::traits::{Actuator, NarrationService, TelemetrySource};
use crate::config::AutomationConfig;
use crate::domain::types::PumpAction;
use crate::domain::{Decision, PumpCommand, Reading};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 自然消落速率 (米/分钟)
const DRAIN_M_PER_MIN: f64 = 0.05;

/// 单泵注水速率 (米/分钟)
const PUMP_FILL_M_PER_MIN: f64 = 0.25;

/// 仿真初始水位 (米), 落在滞回带内
const INITIAL_LEVEL_M: f64 = 55.0;

// ==========================================
// SimulationHub - 仿真世界状态
// ==========================================
struct SimReservoir {
    level_m: f64,
    pumps: HashMap<String, bool>,
    last_advance: DateTime<Utc>,
}

pub struct SimulationHub {
    reservoirs: Mutex<HashMap<String, SimReservoir>>,
}

impl SimulationHub {
    /// 按配置初始化仿真世界, 所有泵关闭, 水位取初始值
    pub fn from_config(config: &AutomationConfig, now: DateTime<Utc>) -> Arc<Self> {
        let mut reservoirs = HashMap::new();
        for rc in &config.reservoirs {
            let pumps = rc
                .pumps
                .iter()
                .map(|pc| (pc.pump_id.clone(), false))
                .collect();
            reservoirs.insert(
                rc.reservoir_id.clone(),
                SimReservoir {
                    level_m: INITIAL_LEVEL_M,
                    pumps,
                    last_advance: now,
                },
            );
        }
        Arc::new(Self {
            reservoirs: Mutex::new(reservoirs),
        })
    }

    // 按经过时间推进水位: 消落 + 各开启泵注水
    fn advance(&self, reservoir_id: &str, now: DateTime<Utc>) -> Option<Reading> {
        let mut guard = self.reservoirs.lock().ok()?;
        let sim = guard.get_mut(reservoir_id)?;

        let elapsed_min =
            now.signed_duration_since(sim.last_advance).num_seconds() as f64 / 60.0;
        if elapsed_min > 0.0 {
            let pumps_on = sim.pumps.values().filter(|on| **on).count() as f64;
            let delta = (pumps_on * PUMP_FILL_M_PER_MIN - DRAIN_M_PER_MIN) * elapsed_min;
            sim.level_m = (sim.level_m + delta).max(0.0);
            sim.last_advance = now;
        }

        Some(Reading {
            reservoir_id: reservoir_id.to_string(),
            timestamp: now,
            level_m: sim.level_m,
            pump_states: sim.pumps.clone(),
        })
    }

    fn set_pump(&self, reservoir_id: &str, pump_id: &str, on: bool) -> Result<(), ActuationError> {
        let mut guard = self
            .reservoirs
            .lock()
            .map_err(|e| ActuationError::Failure(e.to_string()))?;
        let sim = guard
            .get_mut(reservoir_id)
            .ok_or_else(|| ActuationError::Failure(format!("未知水库: {}", reservoir_id)))?;
        match sim.pumps.get_mut(pump_id) {
            Some(state) => {
                *state = on;
                Ok(())
            }
            None => Err(ActuationError::Failure(format!("未知泵: {}", pump_id))),
        }
    }
}

// ==========================================
// SimulatedTelemetrySource - 仿真遥测源
// ==========================================
pub struct SimulatedTelemetrySource {
    hub: Arc<SimulationHub>,
}

impl SimulatedTelemetrySource {
    pub fn new(hub: Arc<SimulationHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl TelemetrySource for SimulatedTelemetrySource {
    async fn fetch_current(&self, reservoir_id: &str) -> Result<Reading, TelemetryError> {
        self.hub
            .advance(reservoir_id, Utc::now())
            .ok_or_else(|| TelemetryError::NotConnected(format!("未知水库: {}", reservoir_id)))
    }
}

// ==========================================
// SimulatedActuator - 仿真泵控
// ==========================================
pub struct SimulatedActuator {
    hub: Arc<SimulationHub>,
}

impl SimulatedActuator {
    pub fn new(hub: Arc<SimulationHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Actuator for SimulatedActuator {
    async fn apply(
        &self,
        reservoir_id: &str,
        command: &PumpCommand,
    ) -> Result<(), ActuationError> {
        let on = command.action == PumpAction::On;
        self.hub.set_pump(reservoir_id, &command.pump_id, on)?;
        debug!(
            reservoir_id,
            pump_id = %command.pump_id,
            action = %command.action,
            "仿真泵控已执行"
        );
        Ok(())
    }

    async fn probe(&self, reservoir_id: &str, pump_id: &str) -> Result<(), ActuationError> {
        // 仿真硬件永远在线, 探测只校验标识符
        let guard = self
            .hub
            .reservoirs
            .lock()
            .map_err(|e| ActuationError::Failure(e.to_string()))?;
        let known = guard
            .get(reservoir_id)
            .map(|sim| sim.pumps.contains_key(pump_id))
            .unwrap_or(false);
        if known {
            Ok(())
        } else {
            Err(ActuationError::Failure(format!(
                "未知泵: {}/{}",
                reservoir_id, pump_id
            )))
        }
    }
}

// ==========================================
// TemplateNarration - 模板叙述服务
// ==========================================
// 外部叙述服务缺席时的本地回退, 按决策字段拼接人读摘要
pub struct TemplateNarration;

#[async_trait]
impl NarrationService for TemplateNarration {
    async fn narrate(&self, decision: &Decision) -> Result<String, NarrationError> {
        let rule = decision.rule.as_deref().unwrap_or("-");
        Ok(format!(
            "[{}] 水库 {} 动作 {} ({}): {}",
            decision.outcome, decision.reservoir_id, decision.chosen_action, rule,
            decision.rationale
        ))
    }
}
