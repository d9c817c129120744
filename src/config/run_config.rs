// ==========================================
// 听力筛查成绩导入 - 运行配置
// ==========================================
// 职责: 目标库选择（生产/测试）、提交模式、输入输出路径、列映射
// 红线: 核心流程只接收 RunConfig 值，不在流程内部读取环境变量
// ==========================================

use crate::importer::error::{EtlError, ImportResult};
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    pub const PROD_DATABASE: &str = "PROD_DATABASE";
    pub const TEST_DATABASE: &str = "TEST_DATABASE";
    pub const COMMIT: &str = "HRN_COMMIT";
    pub const INPUT_DIR: &str = "HRN_INPUT_DIR";
    pub const SNAPSHOT_PATH: &str = "HRN_SNAPSHOT_PATH";
    pub const SUMMARY_PATH: &str = "HRN_SUMMARY_PATH";
    pub const STUDENT_ID_COLUMN: &str = "HRN_STUDENT_ID_COLUMN";
    pub const SCREEN_RESULT_COLUMN: &str = "HRN_SR_COLUMN";
    pub const SCREEN_LEFT_COLUMN: &str = "HRN_SL_COLUMN";
    pub const LOG_FORMAT: &str = "HRN_LOG_FORMAT";
    pub const INIT_SCHEMA: &str = "HRN_INIT_SCHEMA";
}

pub const DEFAULT_PROD_DATABASE: &str = "hrn_prod.db";
pub const DEFAULT_TEST_DATABASE: &str = "hrn_test.db";
pub const DEFAULT_INPUT_DIR: &str = "./in";
pub const DEFAULT_SNAPSHOT_PATH: &str = "out.csv";
pub const DEFAULT_STUDENT_ID_COLUMN: &str = "Stu ID";

// ==========================================
// TargetEnvironment - 目标库
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetEnvironment {
    Production,
    #[default]
    Test,
}

// ==========================================
// CommitMode - 提交模式
// ==========================================
// 默认 DryRun：语句照常构造并执行校验，但事务回滚
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitMode {
    #[default]
    DryRun,
    Commit,
}

impl CommitMode {
    pub fn is_commit(self) -> bool {
        matches!(self, CommitMode::Commit)
    }
}

// ==========================================
// ColumnMapping - 花名册列映射
// ==========================================
/// 花名册中各字段所在列
///
/// `screen_result` / `screen_left` 未配置时取首列（通过/未通过标记列）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub student_id: String,
    pub screen_result: Option<String>,
    pub screen_left: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            student_id: DEFAULT_STUDENT_ID_COLUMN.to_string(),
            screen_result: None,
            screen_left: None,
        }
    }
}

// ==========================================
// RunConfig - 单次运行配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub environment: TargetEnvironment,
    pub commit_mode: CommitMode,
    pub production_db_path: PathBuf,
    pub test_db_path: PathBuf,
    pub input_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub columns: ColumnMapping,
    pub log_format: LogFormat,
    pub init_schema: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment: TargetEnvironment::default(),
            commit_mode: CommitMode::default(),
            production_db_path: PathBuf::from(DEFAULT_PROD_DATABASE),
            test_db_path: PathBuf::from(DEFAULT_TEST_DATABASE),
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            summary_path: None,
            columns: ColumnMapping::default(),
            log_format: LogFormat::default(),
            init_schema: false,
        }
    }
}

impl RunConfig {
    /// 从进程环境（含可选 .env 文件）加载配置
    ///
    /// 仅供程序入口调用；核心流程接收构造好的 RunConfig
    pub fn from_env() -> ImportResult<Self> {
        // .env 不存在不算错误
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值查找函数加载配置
    ///
    /// # 参数
    /// - lookup: 配置键 → 值（不存在返回 None）
    ///
    /// # 返回
    /// - Ok(RunConfig): 缺省项使用默认值
    /// - Err: 布尔项取值无法识别
    pub fn from_lookup<F>(lookup: F) -> ImportResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = RunConfig::default();

        if let Some(env) = get(config_keys::ENVIRONMENT) {
            config.environment = if env.eq_ignore_ascii_case("PROD") {
                TargetEnvironment::Production
            } else {
                TargetEnvironment::Test
            };
        }

        if let Some(path) = get(config_keys::PROD_DATABASE) {
            config.production_db_path = PathBuf::from(path);
        }
        if let Some(path) = get(config_keys::TEST_DATABASE) {
            config.test_db_path = PathBuf::from(path);
        }

        if let Some(raw) = get(config_keys::COMMIT) {
            config.commit_mode = if parse_flag(config_keys::COMMIT, &raw)? {
                CommitMode::Commit
            } else {
                CommitMode::DryRun
            };
        }

        if let Some(dir) = get(config_keys::INPUT_DIR) {
            config.input_dir = PathBuf::from(dir);
        }
        if let Some(path) = get(config_keys::SNAPSHOT_PATH) {
            config.snapshot_path = PathBuf::from(path);
        }
        config.summary_path = get(config_keys::SUMMARY_PATH).map(PathBuf::from);

        if let Some(column) = get(config_keys::STUDENT_ID_COLUMN) {
            config.columns.student_id = column;
        }
        config.columns.screen_result = get(config_keys::SCREEN_RESULT_COLUMN);
        config.columns.screen_left = get(config_keys::SCREEN_LEFT_COLUMN);

        if let Some(format) = get(config_keys::LOG_FORMAT) {
            config.log_format = LogFormat::parse(&format);
        }
        if let Some(raw) = get(config_keys::INIT_SCHEMA) {
            config.init_schema = parse_flag(config_keys::INIT_SCHEMA, &raw)?;
        }

        Ok(config)
    }

    /// 按目标环境选择数据库路径
    pub fn database_path(&self) -> &PathBuf {
        match self.environment {
            TargetEnvironment::Production => &self.production_db_path,
            TargetEnvironment::Test => &self.test_db_path,
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> ImportResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(EtlError::Config {
            key: key.to_string(),
            message: format!("无法识别的布尔值: {}", raw),
        }),
    }
}
