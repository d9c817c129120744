// ==========================================
// 听力筛查成绩导入 - 配置层
// ==========================================
// 职责: 运行配置（目标库、提交模式、路径、列映射）
// 来源: 进程环境变量 / .env 文件，由程序入口注入
// ==========================================

pub mod run_config;

// 重导出核心配置类型
pub use run_config::{config_keys, ColumnMapping, CommitMode, RunConfig, TargetEnvironment};
