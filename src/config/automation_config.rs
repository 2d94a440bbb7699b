// ==========================================
// 水库泵站自动化系统 - 自动化配置
// ==========================================
// 职责: 决策循环与策略的全部可调参数
// 存储: JSON 配置文件 (serde), 缺省值对齐现场运行经验
// 校验: 加载即校验, 拒绝 low >= high 等非法配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

// ==========================================
// 配置层错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置校验失败: {0}")]
    Validation(String),
}

// ==========================================
// PumpConfig - 单泵滞回控制配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpConfig {
    pub pump_id: String,

    /// 下限阈值 (米): 水位低于此值时启泵
    #[serde(default = "default_low_threshold")]
    pub low_threshold_m: f64,

    /// 上限阈值 (米): 水位高于此值时停泵, 必须大于下限
    #[serde(default = "default_high_threshold")]
    pub high_threshold_m: f64,

    /// 冷却期 (秒): 同一泵两次切换之间的最小间隔
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,

    /// 前瞻性停泵: 预测水位将越上限时提前停泵 (独立于反应式规则)
    #[serde(default)]
    pub anticipatory: bool,
}

// ==========================================
// ReservoirConfig - 单水库配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservoirConfig {
    pub reservoir_id: String,
    pub name: String,

    /// 预测时域 (分钟)
    #[serde(default = "default_horizon_minutes")]
    pub horizon_minutes: i64,

    /// 告警阈值 (米), None 表示不做到达预测
    #[serde(default)]
    pub alert_threshold_m: Option<f64>,

    /// 告警到达预测的最大时域 (小时)
    #[serde(default = "default_max_alert_horizon_hours")]
    pub max_alert_horizon_hours: f64,

    #[serde(default)]
    pub pumps: Vec<PumpConfig>,
}

// ==========================================
// AutomationConfig - 全局自动化配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// 决策节拍间隔 (秒)
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,

    /// 单节拍内并行拉取遥测的上限 (保护遥测源与数据库)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// 单水库遥测拉取超时 (秒)
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,

    /// 单次泵控调用超时 (秒)
    #[serde(default = "default_actuation_timeout_seconds")]
    pub actuation_timeout_seconds: u64,

    /// 泵控最大尝试次数 (含首次)
    #[serde(default = "default_actuation_max_attempts")]
    pub actuation_max_attempts: u32,

    /// 泵控重试退避基值 (毫秒), 指数递增
    #[serde(default = "default_actuation_backoff_ms")]
    pub actuation_backoff_ms: u64,

    /// 叙述服务超时 (秒), 超时即放弃, 不影响决策落库
    #[serde(default = "default_narration_timeout_seconds")]
    pub narration_timeout_seconds: u64,

    /// 读数新鲜度阈值 (分钟), 超过即视为过期读数
    #[serde(default = "default_freshness_threshold_minutes")]
    pub freshness_threshold_minutes: i64,

    /// 预测回看窗口 (小时)
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,

    #[serde(default)]
    pub reservoirs: Vec<ReservoirConfig>,
}

// ===== 缺省值 =====
fn default_low_threshold() -> f64 { 40.0 }
fn default_high_threshold() -> f64 { 80.0 }
fn default_cooldown_seconds() -> i64 { 300 }
fn default_horizon_minutes() -> i64 { 30 }
fn default_max_alert_horizon_hours() -> f64 { 24.0 }
fn default_tick_interval_seconds() -> u64 { 60 }
fn default_max_concurrent_fetches() -> usize { 4 }
fn default_fetch_timeout_seconds() -> u64 { 10 }
fn default_actuation_timeout_seconds() -> u64 { 5 }
fn default_actuation_max_attempts() -> u32 { 3 }
fn default_actuation_backoff_ms() -> u64 { 500 }
fn default_narration_timeout_seconds() -> u64 { 10 }
fn default_freshness_threshold_minutes() -> i64 { 10 }
fn default_lookback_hours() -> i64 { 4 }

impl AutomationConfig {
    /// 从 JSON 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: AutomationConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// 演示配置: 两座水库各一台泵, 阈值 40/80 米
    pub fn demo() -> Self {
        let config = AutomationConfig {
            tick_interval_seconds: default_tick_interval_seconds(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            actuation_timeout_seconds: default_actuation_timeout_seconds(),
            actuation_max_attempts: default_actuation_max_attempts(),
            actuation_backoff_ms: default_actuation_backoff_ms(),
            narration_timeout_seconds: default_narration_timeout_seconds(),
            freshness_threshold_minutes: default_freshness_threshold_minutes(),
            lookback_hours: default_lookback_hours(),
            reservoirs: vec![
                ReservoirConfig {
                    reservoir_id: "gagok".to_string(),
                    name: "佳谷水库".to_string(),
                    horizon_minutes: default_horizon_minutes(),
                    alert_threshold_m: Some(90.0),
                    max_alert_horizon_hours: default_max_alert_horizon_hours(),
                    pumps: vec![PumpConfig {
                        pump_id: "pump1".to_string(),
                        low_threshold_m: default_low_threshold(),
                        high_threshold_m: default_high_threshold(),
                        cooldown_seconds: default_cooldown_seconds(),
                        anticipatory: true,
                    }],
                },
                ReservoirConfig {
                    reservoir_id: "haeryong".to_string(),
                    name: "海龙水库".to_string(),
                    horizon_minutes: default_horizon_minutes(),
                    alert_threshold_m: Some(90.0),
                    max_alert_horizon_hours: default_max_alert_horizon_hours(),
                    pumps: vec![PumpConfig {
                        pump_id: "pump2".to_string(),
                        low_threshold_m: default_low_threshold(),
                        high_threshold_m: default_high_threshold(),
                        cooldown_seconds: default_cooldown_seconds(),
                        anticipatory: true,
                    }],
                },
            ],
        };
        // demo 配置必然合法
        debug_assert!(config.validate().is_ok());
        config
    }

    /// 配置校验
    ///
    /// 规则:
    /// - 节拍间隔 / 并发上限必须为正
    /// - 至少配置一座水库, 水库ID不重复
    /// - 泵ID全局不重复 (泵控按泵串行化的前提)
    /// - 每台泵 low < high, 冷却期非负
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_seconds == 0 {
            return Err(ConfigError::Validation("tick_interval_seconds 必须大于 0".to_string()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Validation("max_concurrent_fetches 必须大于 0".to_string()));
        }
        if self.actuation_max_attempts == 0 {
            return Err(ConfigError::Validation("actuation_max_attempts 必须大于 0".to_string()));
        }
        if self.reservoirs.is_empty() {
            return Err(ConfigError::Validation("至少需要配置一座水库".to_string()));
        }

        let mut reservoir_ids = HashSet::new();
        let mut pump_ids = HashSet::new();
        for rc in &self.reservoirs {
            if !reservoir_ids.insert(rc.reservoir_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "水库ID重复: {}",
                    rc.reservoir_id
                )));
            }
            if rc.horizon_minutes <= 0 {
                return Err(ConfigError::Validation(format!(
                    "水库 {} 的 horizon_minutes 必须大于 0",
                    rc.reservoir_id
                )));
            }
            for pc in &rc.pumps {
                if !pump_ids.insert(pc.pump_id.as_str()) {
                    return Err(ConfigError::Validation(format!("泵ID重复: {}", pc.pump_id)));
                }
                if pc.low_threshold_m >= pc.high_threshold_m {
                    return Err(ConfigError::Validation(format!(
                        "泵 {} 阈值非法: low({}) 必须小于 high({})",
                        pc.pump_id, pc.low_threshold_m, pc.high_threshold_m
                    )));
                }
                if pc.cooldown_seconds < 0 {
                    return Err(ConfigError::Validation(format!(
                        "泵 {} 冷却期不能为负",
                        pc.pump_id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_config_is_valid() {
        let config = AutomationConfig::demo();
        assert!(config.validate().is_ok());
        assert_eq!(config.reservoirs.len(), 2);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = AutomationConfig::demo();
        config.reservoirs[0].pumps[0].low_threshold_m = 85.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_duplicate_pump_id_rejected() {
        let mut config = AutomationConfig::demo();
        config.reservoirs[1].pumps[0].pump_id = "pump1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = AutomationConfig::demo();
        config.tick_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let json = r#"{
            "reservoirs": [{
                "reservoir_id": "gagok",
                "name": "佳谷水库",
                "pumps": [{"pump_id": "pump1"}]
            }]
        }"#;
        let config: AutomationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tick_interval_seconds, 60);
        assert_eq!(config.reservoirs[0].pumps[0].low_threshold_m, 40.0);
        assert_eq!(config.reservoirs[0].pumps[0].high_threshold_m, 80.0);
        assert!(config.validate().is_ok());
    }
}
