// ==========================================
// 水库泵站自动化系统 - 服务入口
// ==========================================
// 启动流程: 日志 → 配置 → 数据库 → 外设 → 决策循环
// 外设: 默认挂仿真实现, 现场部署替换为硬件适配器
// ==========================================

use anyhow::{Context, Result};
use chrono::Utc;
use reservoir_automation::automation::{
    DecisionLoop, DecisionLoopDeps, SimulatedActuator, SimulatedTelemetrySource, SimulationHub,
    TemplateNarration,
};
use reservoir_automation::config::AutomationConfig;
use reservoir_automation::repository::{DecisionLogRepository, ReadingRepository};
use reservoir_automation::{db, logging, APP_NAME, VERSION};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    info!(version = VERSION, "水库泵站自动化系统启动");

    // 配置: 首个命令行参数为配置文件路径, 缺省用演示配置
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "加载配置文件");
            AutomationConfig::load_from_file(&path)
                .with_context(|| format!("加载配置失败: {}", path))?
        }
        None => {
            info!("未指定配置文件, 使用演示配置 (仿真模式)");
            AutomationConfig::demo()
        }
    };

    // 数据库: 数据目录下的 SQLite 文件
    let db_path = resolve_db_path()?;
    info!(db_path = %db_path.display(), "打开数据库");
    let conn = db::open_sqlite_connection(
        db_path
            .to_str()
            .context("数据库路径包含非法字符")?,
    )
    .context("打开数据库失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let reading_repo = Arc::new(
        ReadingRepository::new(Arc::clone(&conn)).context("初始化读数仓储失败")?,
    );
    let decision_repo = Arc::new(
        DecisionLogRepository::new(Arc::clone(&conn)).context("初始化决策日志仓储失败")?,
    );

    // 仿真外设
    let hub = SimulationHub::from_config(&config, Utc::now());
    let deps = DecisionLoopDeps {
        telemetry: Arc::new(SimulatedTelemetrySource::new(Arc::clone(&hub))),
        actuator: Arc::new(SimulatedActuator::new(hub)),
        narration: Arc::new(TemplateNarration),
        readings: reading_repo,
        decisions: decision_repo,
    };

    let decision_loop = Arc::new(DecisionLoop::new(config, deps));
    decision_loop.start();

    tokio::signal::ctrl_c()
        .await
        .context("等待退出信号失败")?;
    info!("收到退出信号, 停止决策循环");
    decision_loop.stop();

    Ok(())
}

// 数据目录: ~/.local/share/reservoir-automation/automation.db (或平台等价路径)
fn resolve_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("无法确定系统数据目录")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("创建数据目录失败: {}", dir.display()))?;
    Ok(dir.join("automation.db"))
}
