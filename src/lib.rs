// ==========================================
// 听力筛查成绩导入 - 核心库
// ==========================================
// 技术栈: Rust + calamine + SQLite
// 系统定位: 花名册 Excel → 学籍系统 HRN 表（默认 DryRun）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与汇总
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 年级/序号/写入
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{HrnRow, RawRecord, RecordFailure, RosterFile, RunSummary, ScreeningRecord};

// 配置
pub use config::{ColumnMapping, CommitMode, RunConfig, TargetEnvironment};

// 引擎
pub use engine::{GradeResolver, LoadOutcome, Loader, SequenceAllocator};

// 导入
pub use importer::{EtlError, FailureKind, ImportResult, ScreeningImporter};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "听力筛查成绩导入";
