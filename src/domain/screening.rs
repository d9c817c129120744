// ==========================================
// 听力筛查成绩导入 - 筛查领域模型
// ==========================================
// 职责: 花名册文件 / 原始行 / 筛查记录 / HRN 行 / 运行汇总
// 生命周期: RosterFile、RawRecord 仅存在于单次导入；
//           ScreeningRecord 交给 Loader 后即丢弃
// ==========================================

use crate::config::CommitMode;
use crate::importer::error::{EtlError, FailureKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ==========================================
// RosterFile - 花名册文件
// ==========================================
// screening_date 由文件名解析一次，之后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterFile {
    path: PathBuf,
    file_name: String,
    screening_date: NaiveDate,
}

impl RosterFile {
    pub fn new(path: PathBuf, file_name: String, screening_date: NaiveDate) -> Self {
        Self {
            path,
            file_name,
            screening_date,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn screening_date(&self) -> NaiveDate {
        self.screening_date
    }
}

// ==========================================
// RawRecord - 原始行
// ==========================================
/// 工作表中的一行（列名 → 原始值，保持列顺序）
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source_file: String,
    pub sheet_name: String,
    pub row_number: usize, // 工作表内行号（表头为第 1 行）
    pub cells: Vec<(String, String)>,
    pub screening_date: NaiveDate,
}

impl RawRecord {
    /// 首列值（通过/未通过标记列）
    pub fn first_value(&self) -> Option<&str> {
        self.cells.first().map(|(_, v)| v.as_str())
    }

    /// 按列名取值（首个同名列）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v.as_str())
    }
}

// ==========================================
// ScreeningRecord - 筛查记录
// ==========================================
// 由 RecordFilter 创建；GradeResolver 补 grade，SequenceAllocator 补 sequence_number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    // ===== 来源（审计用）=====
    pub source_file: String,
    pub sheet_name: String,
    pub row_number: usize,

    // ===== 筛查结果 =====
    pub student_id: String,
    pub screen_result: String,
    pub screen_left: String,
    pub pass_fail: String,
    pub screening_date: NaiveDate,

    // ===== 补全字段 =====
    pub grade: Option<String>,
    pub sequence_number: Option<i64>,
}

// ==========================================
// HrnRow - 目标表 HRN 的一行
// ==========================================
// 对齐: HRN(PID, SQ, GR, SR, SL, PF, TD)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrnRow {
    #[serde(rename = "PID")]
    pub pid: String,
    #[serde(rename = "SQ")]
    pub sq: i64,
    #[serde(rename = "GR")]
    pub gr: String,
    #[serde(rename = "SR")]
    pub sr: String,
    #[serde(rename = "SL")]
    pub sl: String,
    #[serde(rename = "PF")]
    pub pf: String,
    #[serde(rename = "TD")]
    pub td: NaiveDate,
}

impl TryFrom<&ScreeningRecord> for HrnRow {
    type Error = EtlError;

    fn try_from(record: &ScreeningRecord) -> Result<Self, Self::Error> {
        let (gr, sq) = match (&record.grade, record.sequence_number) {
            (Some(gr), Some(sq)) => (gr.clone(), sq),
            _ => {
                return Err(EtlError::Insert {
                    student_id: record.student_id.clone(),
                    sequence_number: record.sequence_number,
                    message: "记录未完成年级/序号补全".to_string(),
                })
            }
        };

        Ok(HrnRow {
            pid: record.student_id.clone(),
            sq,
            gr,
            sr: record.screen_result.clone(),
            sl: record.screen_left.clone(),
            pf: record.pass_fail.clone(),
            td: record.screening_date,
        })
    }
}

// ==========================================
// RecordFailure - 单条记录失败
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub source_file: String,
    pub sheet_name: String,
    pub row_number: usize,
    pub student_id: String,
    pub kind: FailureKind,
    pub message: String,
}

impl RecordFailure {
    pub fn new(record: &ScreeningRecord, kind: FailureKind, error: &EtlError) -> Self {
        Self {
            source_file: record.source_file.clone(),
            sheet_name: record.sheet_name.clone(),
            row_number: record.row_number,
            student_id: record.student_id.clone(),
            kind,
            message: error.to_string(),
        }
    }
}

// ==========================================
// RunSummary - 运行汇总
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub commit_mode: CommitMode,
    pub files_processed: usize,
    pub rows_read: usize,
    pub rows_dropped: usize,     // 非 "P" 行（业务规则丢弃）
    pub records_enriched: usize, // 已补全并写入快照
    pub records_loaded: usize,   // 插入成功（DryRun 下为校验通过）
    pub failures: Vec<RecordFailure>,
    pub elapsed_ms: u128,
}

impl RunSummary {
    pub fn new(run_id: String, commit_mode: CommitMode) -> Self {
        Self {
            run_id,
            commit_mode,
            files_processed: 0,
            rows_read: 0,
            rows_dropped: 0,
            records_enriched: 0,
            records_loaded: 0,
            failures: Vec::new(),
            elapsed_ms: 0,
        }
    }

    /// 按失败分类计数
    pub fn failure_counts(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
