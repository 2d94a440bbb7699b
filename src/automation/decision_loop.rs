// ==========================================
// 水库泵站自动化系统 - 决策循环
// ==========================================
// 职责: 固定节拍驱动 拉取→预测→策略→执行→落库 全链路
// 并发: 水库间受限并行 (max_concurrent_fetches), 单泵串行
// 隔离: 单水库失败只落一条 SKIPPED 记录, 不影响其余水库
// 红线: 状态锁不跨 await 持有; 决策必落库, 叙述只进日志
// ==========================================

use crate::automation::error::ActuationError;
use crate::automation::state::{AutomationState, PumpRuntime};
use crate::automation::traits::{
    Actuator, DecisionStore, NarrationService, ReadingHistory, TelemetrySource,
};
use crate::config::{AutomationConfig, PumpConfig, ReservoirConfig};
use crate::domain::types::{DecisionOutcome, FailureKind, PumpAction};
use crate::domain::{Decision, DecisionFilter, ForecastResult, PumpCommand, Reading};
use crate::engine::{ControlPolicy, EngineError, ForecastEngine, PolicyDecision, TrendAnalyzer};
use crate::repository::RepositoryResult;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time;
use tracing::{debug, error, info, warn};

// ==========================================
// 外设依赖集合
// ==========================================
pub struct DecisionLoopDeps {
    pub telemetry: Arc<dyn TelemetrySource>,
    pub actuator: Arc<dyn Actuator>,
    pub narration: Arc<dyn NarrationService>,
    pub readings: Arc<dyn ReadingHistory>,
    pub decisions: Arc<dyn DecisionStore>,
}

// ==========================================
// LoopStatus - 循环运行状态快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStatus {
    pub running: bool,
    pub interval_seconds: u64,
    pub tick_count: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}

// ==========================================
// DecisionLoop - 决策循环
// ==========================================
pub struct DecisionLoop {
    config: AutomationConfig,
    telemetry: Arc<dyn TelemetrySource>,
    actuator: Arc<dyn Actuator>,
    narration: Arc<dyn NarrationService>,
    readings: Arc<dyn ReadingHistory>,
    decisions: Arc<dyn DecisionStore>,
    forecast_engine: ForecastEngine,
    trend_analyzer: TrendAnalyzer,
    policy: ControlPolicy,
    state: Mutex<AutomationState>,
    running: AtomicBool,
    tick_count: AtomicU64,
    last_tick_at: Mutex<Option<DateTime<Utc>>>,
    stop_notify: Notify,
}

impl DecisionLoop {
    /// 构造决策循环 (不启动)
    pub fn new(config: AutomationConfig, deps: DecisionLoopDeps) -> Self {
        let state = AutomationState::from_config(&config);
        Self {
            config,
            telemetry: deps.telemetry,
            actuator: deps.actuator,
            narration: deps.narration,
            readings: deps.readings,
            decisions: deps.decisions,
            forecast_engine: ForecastEngine::new(),
            trend_analyzer: TrendAnalyzer::new(),
            policy: ControlPolicy::new(),
            state: Mutex::new(state),
            running: AtomicBool::new(false),
            tick_count: AtomicU64::new(0),
            last_tick_at: Mutex::new(None),
            stop_notify: Notify::new(),
        }
    }

    // ==========================================
    // 生命周期
    // ==========================================

    /// 启动后台节拍任务; 已在运行时返回 false
    ///
    /// 节拍采用固定时刻表 (interval_at): 单次节拍超时不会让
    /// 后续节拍漂移, 追不上的节拍直接跳过而不是补跑。
    pub fn start(self: &Arc<Self>) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("决策循环已在运行, 忽略重复启动");
            return false;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let period = Duration::from_secs(this.config.tick_interval_seconds);
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            info!(
                interval_seconds = this.config.tick_interval_seconds,
                reservoirs = this.config.reservoirs.len(),
                "决策循环启动"
            );
            loop {
                tokio::select! {
                    _ = this.stop_notify.notified() => {
                        // stop() 先清 running 再发许可; 许可在而 running 仍为
                        // true 说明是上一轮残留, 消费掉继续等下一节拍
                        if !this.running.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if !this.running.load(Ordering::SeqCst) {
                            break;
                        }
                        this.run_tick(Utc::now()).await;
                    }
                }
            }
            this.running.store(false, Ordering::SeqCst);
            info!("决策循环已停止");
        });
        true
    }

    /// 请求停止, 后台任务在当前节拍结束后退出
    ///
    /// notify_one 会存储一个许可: 即便停止请求到达时后台任务
    /// 正在执行节拍而尚未挂在 notified() 上, 下一轮 select 也会
    /// 立即消费许可退出, 不必再等一个完整节拍间隔。
    /// 未运行时不发许可, 避免残留许可干扰下一次启动。
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.stop_notify.notify_one();
        }
    }

    /// 循环运行状态快照
    pub fn status(&self) -> LoopStatus {
        let last_tick_at = self.last_tick_at.lock().map(|g| *g).unwrap_or(None);
        LoopStatus {
            running: self.running.load(Ordering::SeqCst),
            interval_seconds: self.config.tick_interval_seconds,
            tick_count: self.tick_count.load(Ordering::SeqCst),
            last_tick_at,
        }
    }

    /// 查询决策日志 (时间倒序)
    pub fn get_logs(&self, filter: &DecisionFilter) -> RepositoryResult<Vec<Decision>> {
        self.decisions.query(filter)
    }

    // ==========================================
    // 单节拍执行
    // ==========================================

    /// 执行一个完整决策节拍
    ///
    /// 公开给测试与手动触发; 后台任务按节拍调用同一入口。
    pub async fn run_tick(&self, now: DateTime<Utc>) {
        let tick = self.tick_count.load(Ordering::SeqCst) + 1;
        debug!(tick, "决策节拍开始");

        stream::iter(self.config.reservoirs.iter())
            .for_each_concurrent(self.config.max_concurrent_fetches, |rc| {
                self.process_reservoir(rc, now)
            })
            .await;

        self.tick_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_tick_at.lock() {
            *guard = Some(now);
        }
        debug!(tick, "决策节拍结束");
    }

    // 单水库处理: 失败只影响本水库
    async fn process_reservoir(&self, rc: &ReservoirConfig, now: DateTime<Utc>) {
        let fetch_timeout = Duration::from_secs(self.config.fetch_timeout_seconds);
        let fetched = time::timeout(fetch_timeout, self.telemetry.fetch_current(&rc.reservoir_id)).await;

        let reading = match fetched {
            Ok(Ok(reading)) => reading,
            Ok(Err(e)) => {
                self.record_reservoir_skip(rc, now, e.failure_kind(), e.to_string());
                return;
            }
            Err(_) => {
                self.record_reservoir_skip(
                    rc,
                    now,
                    FailureKind::FetchTimeout,
                    format!("遥测读取超过 {}秒未返回", self.config.fetch_timeout_seconds),
                );
                return;
            }
        };

        // 过期读数视为缺失
        let age = reading.age_minutes(now);
        if age > self.config.freshness_threshold_minutes {
            self.record_reservoir_skip(
                rc,
                now,
                FailureKind::StaleReading,
                format!(
                    "读数已过期 {}分钟 (阈值 {}分钟), 视为缺失",
                    age, self.config.freshness_threshold_minutes
                ),
            );
            return;
        }

        if let Err(e) = self.readings.record(&reading) {
            warn!(reservoir_id = %rc.reservoir_id, error = %e, "读数落库失败, 本节拍继续");
        }

        let since = now - chrono::Duration::hours(self.config.lookback_hours);
        let history = match self.readings.history(&rc.reservoir_id, since) {
            Ok(history) => history,
            Err(e) => {
                warn!(reservoir_id = %rc.reservoir_id, error = %e, "历史读数查询失败, 退化为只用当前读数");
                vec![reading.clone()]
            }
        };

        // 数据不足时预测缺席, 策略退化为纯反应式, 不为此刷 SKIPPED
        let forecast = match self
            .forecast_engine
            .predict(&rc.reservoir_id, &history, rc.horizon_minutes, now)
        {
            Ok(forecast) => Some(forecast),
            Err(EngineError::InsufficientData { needed, got, .. }) => {
                debug!(
                    reservoir_id = %rc.reservoir_id,
                    needed, got,
                    "预测输入数据不足, 本节拍仅反应式控制"
                );
                None
            }
            Err(e) => {
                warn!(reservoir_id = %rc.reservoir_id, error = %e, "预测失败, 本节拍仅反应式控制");
                None
            }
        };

        // 告警到达预测: 只进日志与决策理由, 不直接驱动泵控
        let mut alert_note: Option<String> = None;
        if let Some(threshold) = rc.alert_threshold_m {
            match self.trend_analyzer.predict_alert(
                &history,
                threshold,
                rc.max_alert_horizon_hours,
                now,
            ) {
                Ok(alert) if alert.will_reach => {
                    let hours = alert.hours_until.unwrap_or(0.0);
                    warn!(
                        reservoir_id = %rc.reservoir_id,
                        threshold_m = threshold,
                        hours_until = hours,
                        "预计将达到告警阈值"
                    );
                    alert_note = Some(format!(
                        "; 预警: 预计 {:.1}小时后达到告警阈值 {:.1}m",
                        hours, threshold
                    ));
                }
                Ok(_) => {}
                Err(EngineError::InsufficientData { .. }) => {}
                Err(e) => {
                    warn!(reservoir_id = %rc.reservoir_id, error = %e, "告警到达预测失败")
                }
            }
        }

        // 泵间串行: 同一泵同一时刻至多一条在途命令
        for pc in &rc.pumps {
            self.evaluate_pump(rc, pc, &reading, forecast.as_ref(), alert_note.as_deref(), now)
                .await;
        }
    }

    // 单泵评估与执行
    async fn evaluate_pump(
        &self,
        rc: &ReservoirConfig,
        pc: &PumpConfig,
        reading: &Reading,
        forecast: Option<&ForecastResult>,
        alert_note: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let mut runtime = self.with_state(|s| s.pump(&pc.pump_id));

        // 降级模式: 每节拍只发一次探测, 恢复前不下发命令
        if runtime.degraded {
            let probe_timeout = Duration::from_secs(self.config.actuation_timeout_seconds);
            let probed =
                time::timeout(probe_timeout, self.actuator.probe(&rc.reservoir_id, &pc.pump_id))
                    .await;
            match probed {
                Ok(Ok(())) => {
                    self.with_state(|s| s.clear_degraded(&pc.pump_id));
                    runtime = self.with_state(|s| s.pump(&pc.pump_id));
                    info!(pump_id = %pc.pump_id, "降级探测成功, 泵恢复正常模式");
                }
                _ => {
                    let mut decision = Decision::new(&rc.reservoir_id, Some(&pc.pump_id), now);
                    decision.rationale = "硬件降级中, 探测未恢复, 本节拍不下发命令".to_string();
                    decision.outcome = DecisionOutcome::Skipped;
                    decision.error_kind = Some(FailureKind::HardwareDisconnected);
                    self.append_and_narrate(decision);
                    return;
                }
            }
        }

        // 泵状态优先取遥测读数, 读数未报时退回运行时记录
        let pump_is_on = reading
            .pump_states
            .get(&pc.pump_id)
            .copied()
            .unwrap_or(runtime.is_on);

        let verdict = self.policy.evaluate(
            pc,
            pump_is_on,
            reading.level_m,
            forecast,
            runtime.last_transition,
            now,
        );

        let mut decision = Decision::new(&rc.reservoir_id, Some(&pc.pump_id), now);
        decision.input_snapshot = Some(serde_json::json!({
            "level_m": reading.level_m,
            "measured_at": reading.timestamp,
            "pump_is_on": pump_is_on,
            "forecast": forecast,
        }));
        decision.rule = Some(verdict.rule().as_str().to_string());
        decision.rationale = match alert_note {
            Some(note) => format!("{}{}", verdict.reason(), note),
            None => verdict.reason().to_string(),
        };

        match verdict {
            PolicyDecision::Hold { .. } => {
                decision.chosen_action = "NO_OP".to_string();
                decision.outcome = DecisionOutcome::Applied;
            }
            PolicyDecision::Blocked { .. } => {
                decision.chosen_action = "NO_OP".to_string();
                decision.outcome = DecisionOutcome::Skipped;
                decision.error_kind = Some(FailureKind::PolicyViolation);
            }
            PolicyDecision::Actuate { action, .. } => {
                decision.chosen_action = action_label(action);
                let command = PumpCommand {
                    pump_id: pc.pump_id.clone(),
                    action,
                    duration_seconds: None,
                    issued_at: now,
                };
                match self.actuate_with_retry(&rc.reservoir_id, &command).await {
                    Ok(()) => {
                        decision.outcome = DecisionOutcome::Applied;
                        self.with_state(|s| {
                            s.record_transition(&pc.pump_id, action == PumpAction::On, now)
                        });
                        info!(
                            reservoir_id = %rc.reservoir_id,
                            pump_id = %pc.pump_id,
                            action = %action,
                            level_m = reading.level_m,
                            "泵控命令已执行"
                        );
                    }
                    Err(e) => {
                        decision.outcome = DecisionOutcome::Failed;
                        decision.error_kind = Some(e.failure_kind());
                        if e == ActuationError::HardwareDisconnected {
                            self.with_state(|s| s.mark_degraded(&pc.pump_id));
                            warn!(pump_id = %pc.pump_id, "硬件断开, 泵进入降级模式");
                        }
                        error!(
                            reservoir_id = %rc.reservoir_id,
                            pump_id = %pc.pump_id,
                            action = %action,
                            error = %e,
                            "泵控命令执行失败"
                        );
                    }
                }
            }
        }

        self.append_and_narrate(decision);
    }

    // 泵控重试: 指数退避, 硬件断开不重试
    async fn actuate_with_retry(
        &self,
        reservoir_id: &str,
        command: &PumpCommand,
    ) -> Result<(), ActuationError> {
        let call_timeout = Duration::from_secs(self.config.actuation_timeout_seconds);
        let max_attempts = self.config.actuation_max_attempts;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = time::timeout(call_timeout, self.actuator.apply(reservoir_id, command)).await;
            let err = match outcome {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(ActuationError::HardwareDisconnected)) => {
                    return Err(ActuationError::HardwareDisconnected)
                }
                Ok(Err(e)) => e,
                Err(_) => ActuationError::Timeout,
            };
            if attempt >= max_attempts {
                return Err(err);
            }
            let backoff = self
                .config
                .actuation_backoff_ms
                .saturating_mul(1u64 << (attempt - 1).min(8));
            warn!(
                reservoir_id,
                pump_id = %command.pump_id,
                attempt,
                error = %err,
                backoff_ms = backoff,
                "泵控失败, 退避后重试"
            );
            time::sleep(Duration::from_millis(backoff)).await;
        }
    }

    // 整库级跳过: 落一条 pump_id 为空的 SKIPPED 记录
    fn record_reservoir_skip(
        &self,
        rc: &ReservoirConfig,
        now: DateTime<Utc>,
        kind: FailureKind,
        rationale: String,
    ) {
        warn!(reservoir_id = %rc.reservoir_id, kind = %kind, "{}", rationale);
        let mut decision = Decision::new(&rc.reservoir_id, None, now);
        decision.rationale = rationale;
        decision.outcome = DecisionOutcome::Skipped;
        decision.error_kind = Some(kind);
        self.append_and_narrate(decision);
    }

    // 决策落库 + 尽力而为的叙述 (只进日志, 不回写决策)
    fn append_and_narrate(&self, decision: Decision) {
        if let Err(e) = self.decisions.append(&decision) {
            error!(decision_id = %decision.decision_id, error = %e, "决策落库失败");
        }

        let narration = Arc::clone(&self.narration);
        let narration_timeout = Duration::from_secs(self.config.narration_timeout_seconds);
        tokio::spawn(async move {
            match time::timeout(narration_timeout, narration.narrate(&decision)).await {
                Ok(Ok(text)) => info!(decision_id = %decision.decision_id, "{}", text),
                Ok(Err(e)) => {
                    debug!(decision_id = %decision.decision_id, error = %e, "叙述服务不可用")
                }
                Err(_) => debug!(decision_id = %decision.decision_id, "叙述服务超时"),
            }
        });
    }

    // 状态访问: 锁只在闭包内持有, 不跨 await
    fn with_state<T>(&self, f: impl FnOnce(&mut AutomationState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// 测试辅助: 读取单泵运行时状态
    pub fn pump_runtime(&self, pump_id: &str) -> PumpRuntime {
        self.with_state(|s| s.pump(pump_id))
    }
}

/// 泵动作 → 决策记录动作标签
fn action_label(action: PumpAction) -> String {
    format!("PUMP_{}", action.as_str())
}
