// ==========================================
// 水库泵站自动化系统 - 泵控策略引擎
// ==========================================
// 职责: 滞回阈值 + 冷却期 + 前瞻性停泵的纯函数评估
// 红线: 每个分支必须给出 rule + reason, 供决策记录落库
// ==========================================

use crate::config::PumpConfig;
use crate::domain::types::{PumpAction, PolicyRule};
use crate::domain::ForecastResult;
use chrono::{DateTime, Utc};

// ==========================================
// PolicyDecision - 策略评估结论
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    /// 需要切换泵状态
    Actuate {
        action: PumpAction,
        rule: PolicyRule,
        reason: String,
    },
    /// 保持现状 (滞回带内, 或已处于目标状态)
    Hold {
        rule: PolicyRule,
        reason: String,
    },
    /// 需要切换但被冷却期阻止
    Blocked {
        wanted: PumpAction,
        rule: PolicyRule,
        reason: String,
    },
}

impl PolicyDecision {
    pub fn rule(&self) -> PolicyRule {
        match self {
            PolicyDecision::Actuate { rule, .. } => *rule,
            PolicyDecision::Hold { rule, .. } => *rule,
            PolicyDecision::Blocked { rule, .. } => *rule,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            PolicyDecision::Actuate { reason, .. } => reason,
            PolicyDecision::Hold { reason, .. } => reason,
            PolicyDecision::Blocked { reason, .. } => reason,
        }
    }
}

// ==========================================
// ControlPolicy - 泵控策略引擎
// ==========================================
pub struct ControlPolicy {
    // 无状态引擎, 冷却状态由调用方传入
}

impl Default for ControlPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPolicy {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 评估单台泵在当前水位与预测下应采取的动作
    ///
    /// # 参数
    /// - `pump`: 泵配置 (阈值/冷却期/是否启用前瞻停泵)
    /// - `pump_is_on`: 泵当前状态
    /// - `level_m`: 当前水位 (米)
    /// - `forecast`: 本节拍预测; 数据不足时为 None, 仅反应式规则生效
    /// - `last_transition`: 上一次成功切换的时间; None 表示无冷却限制
    /// - `now`: 评估时间
    ///
    /// # 规则优先级
    /// 1. 水位低于下限 → 启泵 (LOW_THRESHOLD_ON)
    /// 2. 水位高于上限 → 停泵 (HIGH_THRESHOLD_OFF)
    /// 3. 泵在运行且预测越上限 → 停泵 (ANTICIPATORY_OFF, 独立代码路径)
    /// 4. 滞回带内 (含两端阈值) → 保持现状 (HYSTERESIS_HOLD)
    ///
    /// 已处于目标状态则为 Hold; 需要切换但冷却期未满则为 Blocked。
    pub fn evaluate(
        &self,
        pump: &PumpConfig,
        pump_is_on: bool,
        level_m: f64,
        forecast: Option<&ForecastResult>,
        last_transition: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> PolicyDecision {
        // 反应式规则 (阈值本身属于滞回带, 只在严格越界时动作)
        if level_m < pump.low_threshold_m {
            let reason = format!(
                "水位 {:.2}m 低于下限 {:.2}m, 需要启泵",
                level_m, pump.low_threshold_m
            );
            return self.resolve(pump, pump_is_on, PumpAction::On, PolicyRule::LowThresholdOn, reason, last_transition, now);
        }
        if level_m > pump.high_threshold_m {
            let reason = format!(
                "水位 {:.2}m 高于上限 {:.2}m, 需要停泵",
                level_m, pump.high_threshold_m
            );
            return self.resolve(pump, pump_is_on, PumpAction::Off, PolicyRule::HighThresholdOff, reason, last_transition, now);
        }

        // 前瞻性停泵 (独立于反应式路径, 可单独禁用)
        if pump_is_on {
            if let Some(fc) = forecast {
                if self.anticipatory_off_needed(pump, fc) {
                    let reason = format!(
                        "预测 {}分钟后水位 {:.2}m 将越过上限 {:.2}m, 提前停泵",
                        fc.horizon_minutes, fc.predicted_level_m, pump.high_threshold_m
                    );
                    return self.resolve(pump, pump_is_on, PumpAction::Off, PolicyRule::AnticipatoryOff, reason, last_transition, now);
                }
            }
        }

        PolicyDecision::Hold {
            rule: PolicyRule::HysteresisHold,
            reason: format!(
                "水位 {:.2}m 在滞回带 [{:.2}m, {:.2}m] 内, 保持现状",
                level_m, pump.low_threshold_m, pump.high_threshold_m
            ),
        }
    }

    /// 前瞻性停泵判定 (独立可测)
    ///
    /// 条件: 该泵启用了前瞻停泵, 且预测水位越过上限。
    /// 只判定预测本身, 泵状态与冷却由 evaluate 把关。
    pub fn anticipatory_off_needed(&self, pump: &PumpConfig, forecast: &ForecastResult) -> bool {
        pump.anticipatory && forecast.predicted_level_m > pump.high_threshold_m
    }

    // 目标动作与当前状态/冷却期对账
    fn resolve(
        &self,
        pump: &PumpConfig,
        pump_is_on: bool,
        wanted: PumpAction,
        rule: PolicyRule,
        reason: String,
        last_transition: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> PolicyDecision {
        let currently = if pump_is_on {
            PumpAction::On
        } else {
            PumpAction::Off
        };
        if wanted == currently {
            return PolicyDecision::Hold {
                rule,
                reason: format!("{} (已处于 {} 状态, 无需动作)", reason, currently),
            };
        }

        if let Some(ts) = last_transition {
            let elapsed = now.signed_duration_since(ts).num_seconds();
            let cooldown = pump.cooldown_seconds as i64;
            if elapsed < cooldown {
                return PolicyDecision::Blocked {
                    wanted,
                    rule: PolicyRule::CooldownBlocked,
                    reason: format!(
                        "{}; 但距上次切换仅 {}秒 (冷却期 {}秒), 本节拍不动作",
                        reason, elapsed, cooldown
                    ),
                };
            }
        }

        PolicyDecision::Actuate {
            action: wanted,
            rule,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pump() -> PumpConfig {
        PumpConfig {
            pump_id: "pump1".to_string(),
            low_threshold_m: 40.0,
            high_threshold_m: 80.0,
            cooldown_seconds: 300,
            anticipatory: true,
        }
    }

    fn at(minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, minute, 0).unwrap()
    }

    #[test]
    fn test_low_level_turns_pump_on() {
        let policy = ControlPolicy::new();
        let d = policy.evaluate(&pump(), false, 35.0, None, None, at(0));
        match d {
            PolicyDecision::Actuate { action, rule, .. } => {
                assert_eq!(action, PumpAction::On);
                assert_eq!(rule, PolicyRule::LowThresholdOn);
            }
            other => panic!("期望启泵, 实际 {:?}", other),
        }
    }

    #[test]
    fn test_band_holds_current_state() {
        let policy = ControlPolicy::new();
        for on in [true, false] {
            let d = policy.evaluate(&pump(), on, 60.0, None, None, at(0));
            assert!(matches!(d, PolicyDecision::Hold { rule: PolicyRule::HysteresisHold, .. }));
        }
    }

    #[test]
    fn test_cooldown_blocks_transition() {
        let policy = ControlPolicy::new();
        let d = policy.evaluate(&pump(), true, 85.0, None, Some(at(0)), at(2));
        assert!(matches!(
            d,
            PolicyDecision::Blocked { wanted: PumpAction::Off, rule: PolicyRule::CooldownBlocked, .. }
        ));
    }
}
