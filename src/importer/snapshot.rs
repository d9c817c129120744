// ==========================================
// 听力筛查成绩导入 - CSV 快照
// ==========================================
// 职责: 每次运行输出一个 CSV，记录写入前的全部已补全记录
// 列: HRN 目标列 + 来源文件/工作表/行号（审计）
// ==========================================

use crate::domain::{HrnRow, ScreeningRecord};
use crate::importer::error::{EtlError, ImportResult};
use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Serialize)]
struct SnapshotRow<'a> {
    #[serde(rename = "PID")]
    pid: &'a str,
    #[serde(rename = "SQ")]
    sq: i64,
    #[serde(rename = "GR")]
    gr: &'a str,
    #[serde(rename = "SR")]
    sr: &'a str,
    #[serde(rename = "SL")]
    sl: &'a str,
    #[serde(rename = "PF")]
    pf: &'a str,
    #[serde(rename = "TD")]
    td: NaiveDate,
    source_file: &'a str,
    sheet: &'a str,
    row_number: usize,
}

pub struct SnapshotWriter {
    writer: Writer<File>,
    rows_written: usize,
}

impl SnapshotWriter {
    /// 创建快照文件（已存在则覆盖）
    pub fn create<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let writer = Writer::from_path(path)
            .map_err(|e| EtlError::Snapshot(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// 追加一条已补全记录
    pub fn append(&mut self, record: &ScreeningRecord) -> ImportResult<()> {
        let row = HrnRow::try_from(record)?;
        self.writer.serialize(SnapshotRow {
            pid: &row.pid,
            sq: row.sq,
            gr: &row.gr,
            sr: &row.sr,
            sl: &row.sl,
            pf: &row.pf,
            td: row.td,
            source_file: &record.source_file,
            sheet: &record.sheet_name,
            row_number: record.row_number,
        })?;
        // 逐条刷新，中途失败时快照仍与已写入记录一致
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn finish(mut self) -> ImportResult<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }
}
