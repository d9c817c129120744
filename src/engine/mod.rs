// ==========================================
// 听力筛查成绩导入 - 引擎层
// ==========================================
// 职责: 年级解析、序号分配、HRN 写入
// 红线: Engine 不拼查询 SQL, 数据访问统一走 Repository
// ==========================================

pub mod grade_resolver;
pub mod loader;
pub mod sequence_allocator;

// 重导出核心引擎
pub use grade_resolver::{validate_student_id, GradeResolver};
pub use loader::{LoadOutcome, Loader};
pub use sequence_allocator::SequenceAllocator;
