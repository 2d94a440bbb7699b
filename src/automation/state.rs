// ==========================================
// 水库泵站自动化系统 - 运行时状态
// ==========================================
// 职责: 跨节拍的泵运行时状态 (冷却/降级/已知开关)
// 约定: 状态只在节拍内同步访问, 锁不跨 await 持有
// ==========================================

use crate::config::AutomationConfig;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

// ==========================================
// PumpRuntime - 单泵运行时状态
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PumpRuntime {
    /// 最近一次成功切换后的已知开关状态
    pub is_on: bool,

    /// 最近一次成功切换的时间 (冷却期计算基准)
    pub last_transition: Option<DateTime<Utc>>,

    /// 降级模式: 硬件断开后置位, 探测成功后清除
    pub degraded: bool,
}

// ==========================================
// AutomationState - 全局运行时状态
// ==========================================
#[derive(Debug, Default)]
pub struct AutomationState {
    pumps: HashMap<String, PumpRuntime>,
}

impl AutomationState {
    /// 按配置初始化: 每台泵一条缺省运行时记录
    pub fn from_config(config: &AutomationConfig) -> Self {
        let mut pumps = HashMap::new();
        for rc in &config.reservoirs {
            for pc in &rc.pumps {
                pumps.insert(pc.pump_id.clone(), PumpRuntime::default());
            }
        }
        Self { pumps }
    }

    pub fn pump(&self, pump_id: &str) -> PumpRuntime {
        self.pumps.get(pump_id).cloned().unwrap_or_default()
    }

    /// 记录一次成功切换
    pub fn record_transition(&mut self, pump_id: &str, is_on: bool, at: DateTime<Utc>) {
        let entry = self.pumps.entry(pump_id.to_string()).or_default();
        entry.is_on = is_on;
        entry.last_transition = Some(at);
        entry.degraded = false;
    }

    /// 标记降级模式
    pub fn mark_degraded(&mut self, pump_id: &str) {
        self.pumps.entry(pump_id.to_string()).or_default().degraded = true;
    }

    /// 探测成功, 解除降级
    pub fn clear_degraded(&mut self, pump_id: &str) {
        self.pumps.entry(pump_id.to_string()).or_default().degraded = false;
    }
}
