// ==========================================
// 听力筛查成绩导入 - 花名册文件发现
// ==========================================
// 职责: 枚举输入目录中的工作簿，解析文件名中的筛查日期
// 日期标记: M_DD_YY（月份不补零，日/年两位）
// ==========================================

use crate::domain::RosterFile;
use crate::importer::error::{EtlError, ImportResult};
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// 支持的工作簿扩展名（小写比较）
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

// 两侧是否紧邻数字由 last_date_token 检查，模式本身不消耗边界字符
const DATE_TOKEN_PATTERN: &str = r"([0-9]{1,2})_([0-9]{2})_([0-9]{2})";

// ==========================================
// FileIngestor
// ==========================================
pub struct FileIngestor {
    date_token: Regex,
}

impl FileIngestor {
    pub fn new() -> ImportResult<Self> {
        let date_token = Regex::new(DATE_TOKEN_PATTERN).map_err(|e| EtlError::Config {
            key: "DATE_TOKEN_PATTERN".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { date_token })
    }

    /// 枚举目录中的花名册文件
    ///
    /// # 参数
    /// - dir: 输入目录（不递归）
    ///
    /// # 返回
    /// - Ok(Vec<RosterFile>): 按文件名字典序排列
    /// - Err(DateParse): 任一工作簿文件名无法解析日期
    /// - Err(Io): 目录不可读
    ///
    /// # 说明
    /// - 非工作簿文件、子目录、Excel 锁文件（~$ 前缀）直接忽略
    pub fn discover<P: AsRef<Path>>(&self, dir: P) -> ImportResult<Vec<RosterFile>> {
        let dir = dir.as_ref();
        let mut candidates = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            if file_name.starts_with("~$") || !is_spreadsheet(&path) {
                debug!(file = %file_name, "跳过非花名册文件");
                continue;
            }

            candidates.push((file_name, path));
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut files = Vec::with_capacity(candidates.len());
        for (file_name, path) in candidates {
            let screening_date = self.parse_screening_date(&file_name)?;
            debug!(file = %file_name, date = %screening_date, "解析筛查日期");
            files.push(RosterFile::new(path, file_name, screening_date));
        }

        info!(dir = %dir.display(), count = files.len(), "花名册文件发现完成");
        Ok(files)
    }

    /// 从文件名解析筛查日期
    ///
    /// # 规则
    /// - 在文件主名中查找 M_DD_YY 标记，取最后一个
    /// - 年份按 2000 + YY 解释
    ///
    /// # 示例
    /// - "Bancroft Rosters 4RHearing 25-26 as of 9_18_25.xlsx" → 2025-09-18
    pub fn parse_screening_date(&self, file_name: &str) -> ImportResult<NaiveDate> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);

        let captures = self
            .last_date_token(stem)
            .ok_or_else(|| EtlError::DateParse {
                file_name: file_name.to_string(),
                message: "未找到 M_DD_YY 日期标记".to_string(),
            })?;

        let field = |idx: usize| -> ImportResult<u32> {
            captures
                .get(idx)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .ok_or_else(|| EtlError::DateParse {
                    file_name: file_name.to_string(),
                    message: "日期标记不完整".to_string(),
                })
        };

        let (month, day, year) = (field(1)?, field(2)?, field(3)?);

        NaiveDate::from_ymd_opt(2000 + year as i32, month, day).ok_or_else(|| {
            EtlError::DateParse {
                file_name: file_name.to_string(),
                message: format!("无效日期: {}_{:02}_{:02}", month, day, year),
            }
        })
    }
}

impl FileIngestor {
    /// 查找文件主名中最后一个完整的日期标记
    ///
    /// 逐个起始位置尝试匹配（候选可相互重叠），两侧紧邻数字的候选丢弃
    fn last_date_token<'h>(&self, stem: &'h str) -> Option<Captures<'h>> {
        let bytes = stem.as_bytes();
        let mut last = None;
        let mut start = 0;

        while let Some(captures) = self.date_token.captures_at(stem, start) {
            let whole = captures.get(0)?;
            let digit_before = whole.start() > 0 && bytes[whole.start() - 1].is_ascii_digit();
            let digit_after = bytes.get(whole.end()).map_or(false, u8::is_ascii_digit);
            // 匹配总以 ASCII 数字开头，下一个起点仍在字符边界上
            start = whole.start() + 1;
            if !digit_before && !digit_after {
                last = Some(captures);
            }
        }
        last
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = e.to_ascii_lowercase();
            SPREADSHEET_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
