// ==========================================
// 听力筛查成绩导入 - 领域模型层
// ==========================================
// 职责: 定义领域实体与运行汇总
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod screening;

// 重导出核心类型
pub use screening::{HrnRow, RawRecord, RecordFailure, RosterFile, RunSummary, ScreeningRecord};
