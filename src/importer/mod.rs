// ==========================================
// 听力筛查成绩导入 - 导入层
// ==========================================
// 职责: 花名册工作簿 → 筛查记录 → HRN
// 支持: Excel (.xlsx/.xlsm/.xls)
// ==========================================

// 模块声明
pub mod error;
pub mod file_ingestor;
pub mod file_parser;
pub mod record_filter;
pub mod screening_importer;
pub mod screening_importer_trait;
pub mod snapshot;

// 重导出核心类型
pub use error::{EtlError, FailureKind, ImportResult};
pub use file_ingestor::FileIngestor;
pub use file_parser::ExcelRosterParser;
pub use record_filter::{FilterOutcome, RecordFilter, PASS_MARKER};
pub use screening_importer::ScreeningImporter;
pub use snapshot::SnapshotWriter;

// 重导出 Trait 接口
pub use screening_importer_trait::FileParser;
