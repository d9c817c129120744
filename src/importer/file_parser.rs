// ==========================================
// 听力筛查成绩导入 - 工作簿解析器实现
// ==========================================
// 职责: 读取工作簿全部工作表，合并为一个行集合
// 约定: 每个工作表首行为表头，首列为通过/未通过标记列
// ==========================================

use crate::domain::{RawRecord, RosterFile};
use crate::importer::error::{EtlError, ImportResult};
use crate::importer::screening_importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, info};

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelRosterParser;

impl FileParser for ExcelRosterParser {
    fn parse_roster(&self, roster: &RosterFile) -> ImportResult<Vec<RawRecord>> {
        let file_name = roster.file_name().to_string();
        let workbook_error = |message: String| EtlError::WorkbookRead {
            file: file_name.clone(),
            message,
        };

        // 打开工作簿（按扩展名选择 xlsx/xls 读取器）
        let mut workbook =
            open_workbook_auto(roster.path()).map_err(|e| workbook_error(e.to_string()))?;

        let mut records = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| workbook_error(format!("工作表 {}: {}", sheet_name, e)))?;

            let before = records.len();
            collect_sheet_rows(roster, &sheet_name, &range, &mut records);
            debug!(
                file = %file_name,
                sheet = %sheet_name,
                rows = records.len() - before,
                "工作表读取完成"
            );
        }

        info!(file = %file_name, rows = records.len(), "工作簿解析完成");
        Ok(records)
    }
}

/// 读取单个工作表的数据行（空表 / 仅表头不产生记录）
fn collect_sheet_rows(
    roster: &RosterFile,
    sheet_name: &str,
    range: &Range<Data>,
    out: &mut Vec<RawRecord>,
) {
    // 工作表可能不从 A1 开始
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_text).collect(),
        None => return,
    };

    for (idx, data_row) in rows.enumerate() {
        let cells: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(col_idx, header)| {
                let value = data_row.get(col_idx).map(cell_text).unwrap_or_default();
                (header.clone(), value)
            })
            .collect();

        // 跳过完全空白的行
        if cells.iter().all(|(_, v)| v.is_empty()) {
            continue;
        }

        out.push(RawRecord {
            source_file: roster.file_name().to_string(),
            sheet_name: sheet_name.to_string(),
            row_number: first_row + idx + 2,
            cells,
            screening_date: roster.screening_date(),
        });
    }
}

/// 单元格转文本（去除首尾空白；整数值浮点不带小数部分）
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}
