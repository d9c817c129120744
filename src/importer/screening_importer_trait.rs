// ==========================================
// 听力筛查成绩导入 - 导入接口 Trait
// ==========================================
// 职责: 定义文件解析接口（不包含实现）
// ==========================================

use crate::domain::{RawRecord, RosterFile};
use crate::importer::error::ImportResult;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 工作簿解析接口
// 实现者: ExcelRosterParser
pub trait FileParser {
    /// 解析花名册为原始行记录（所有工作表合并）
    ///
    /// # 参数
    /// - roster: 花名册文件（含筛查日期）
    ///
    /// # 返回
    /// - Ok(Vec<RawRecord>): 每行都带有 roster 的筛查日期
    /// - Err(WorkbookRead): 文件无法打开或不是有效工作簿
    fn parse_roster(&self, roster: &RosterFile) -> ImportResult<Vec<RawRecord>>;
}
