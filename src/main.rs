// ==========================================
// 听力筛查成绩导入 - 命令行入口
// ==========================================
// 用法:
//   hearing-screening-etl [input_dir]
//
// 配置来自环境变量 / .env（见 config::run_config::config_keys）
// 默认 DryRun；写入 HRN 需显式设置 HRN_COMMIT=true
// ==========================================

use anyhow::Context;
use hearing_screening_etl::db::{init_schema, open_sqlite_connection};
use hearing_screening_etl::{logging, RunConfig, ScreeningImporter, TargetEnvironment};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn main() -> anyhow::Result<()> {
    let mut config = RunConfig::from_env().context("加载运行配置失败")?;
    if let Some(dir) = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        config.input_dir = PathBuf::from(dir);
    }

    logging::init(config.log_format);

    tracing::info!("==================================================");
    tracing::info!("{}", hearing_screening_etl::APP_NAME);
    tracing::info!("系统版本: {}", hearing_screening_etl::VERSION);
    tracing::info!("==================================================");

    let db_path = config.database_path().clone();
    tracing::info!(
        environment = ?config.environment,
        db = %db_path.display(),
        mode = ?config.commit_mode,
        "使用数据库"
    );
    if config.environment == TargetEnvironment::Production && config.commit_mode.is_commit() {
        tracing::warn!("即将向生产库提交 HRN 记录");
    }

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path.display()))?;
    if config.init_schema {
        init_schema(&conn).context("初始化 HRN/STU 表失败")?;
    }

    let importer = ScreeningImporter::from_connection(config, Arc::new(Mutex::new(conn)))?;
    let summary = match importer.run() {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "导入中止");
            return Err(e).context("导入中止");
        }
    };

    if summary.has_failures() {
        tracing::warn!(
            skipped = summary.failures.len(),
            "部分记录被跳过，详见日志或运行汇总"
        );
    }
    tracing::info!("==================================================");
    Ok(())
}
