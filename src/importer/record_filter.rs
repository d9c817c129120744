// ==========================================
// 听力筛查成绩导入 - 通过记录过滤器
// ==========================================
// 职责: 仅保留首列为 "P" 的行，并构造 ScreeningRecord
// 业务规则: HRN 只记录通过的筛查；其余行静默丢弃，但计数可审计
// ==========================================

use crate::config::ColumnMapping;
use crate::domain::{RawRecord, ScreeningRecord};
use tracing::debug;

/// 通过标记（精确匹配，区分大小写）
pub const PASS_MARKER: &str = "P";

/// 过滤结果
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<ScreeningRecord>,
    pub dropped: usize,
}

pub struct RecordFilter {
    columns: ColumnMapping,
}

impl RecordFilter {
    pub fn new(columns: ColumnMapping) -> Self {
        Self { columns }
    }

    /// 过滤并转换原始行
    pub fn apply(&self, rows: Vec<RawRecord>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for row in rows {
            if row.first_value() != Some(PASS_MARKER) {
                debug!(
                    file = %row.source_file,
                    sheet = %row.sheet_name,
                    row = row.row_number,
                    marker = row.first_value().unwrap_or(""),
                    "丢弃非通过行"
                );
                outcome.dropped += 1;
                continue;
            }
            outcome.kept.push(self.to_screening_record(row));
        }

        outcome
    }

    fn to_screening_record(&self, row: RawRecord) -> ScreeningRecord {
        let pass_fail = row.first_value().unwrap_or_default().to_string();
        let column_or_marker = |column: &Option<String>| -> String {
            column
                .as_deref()
                .and_then(|name| row.get(name))
                .unwrap_or(pass_fail.as_str())
                .to_string()
        };

        let screen_result = column_or_marker(&self.columns.screen_result);
        let screen_left = column_or_marker(&self.columns.screen_left);
        let student_id = row.get(&self.columns.student_id).unwrap_or("").to_string();

        ScreeningRecord {
            source_file: row.source_file,
            sheet_name: row.sheet_name,
            row_number: row.row_number,
            student_id,
            screen_result,
            screen_left,
            pass_fail,
            screening_date: row.screening_date,
            grade: None,
            sequence_number: None,
        }
    }
}
