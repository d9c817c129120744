// ==========================================
// 听力筛查成绩导入 - HRN 表 Repository
// ==========================================
// 职责: 查询学生现有最大序号、单条写入 HRN
// 约束: 每条记录独立事务；DryRun 执行后回滚，Commit 提交
// ==========================================

use crate::config::CommitMode;
use crate::domain::HrnRow;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// HRN 插入语句（参数顺序与 HrnRow 字段一致）
pub const INSERT_HRN_SQL: &str =
    "INSERT INTO HRN (PID, SQ, GR, SR, SL, PF, TD) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

// ==========================================
// HearingRepository Trait
// ==========================================
pub trait HearingRepository {
    /// 查询学生在 HRN 中的最大序号
    ///
    /// # 返回
    /// - Ok(Some(max)): 已有筛查记录
    /// - Ok(None): 无记录
    fn max_sequence(&self, student_id: &str) -> RepositoryResult<Option<i64>>;

    /// 在单条记录事务中写入 HRN
    ///
    /// # 参数
    /// - row: 目标行
    /// - mode: Commit 提交；DryRun 执行（触发约束校验）后回滚
    fn insert_row(&self, row: &HrnRow, mode: CommitMode) -> RepositoryResult<()>;

    /// 按序号升序列出学生的全部记录
    fn list_by_student(&self, student_id: &str) -> RepositoryResult<Vec<HrnRow>>;
}

// ==========================================
// SqliteHearingRepository
// ==========================================
#[derive(Clone)]
pub struct SqliteHearingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHearingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl HearingRepository for SqliteHearingRepository {
    fn max_sequence(&self, student_id: &str) -> RepositoryResult<Option<i64>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let max: Option<i64> = conn.query_row(
            "SELECT MAX(SQ) FROM HRN WHERE PID = ?1",
            params![student_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn insert_row(&self, row: &HrnRow, mode: CommitMode) -> RepositoryResult<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            INSERT_HRN_SQL,
            params![row.pid, row.sq, row.gr, row.sr, row.sl, row.pf, row.td],
        )?;

        match mode {
            CommitMode::Commit => tx
                .commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?,
            CommitMode::DryRun => tx
                .rollback()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?,
        }
        Ok(())
    }

    fn list_by_student(&self, student_id: &str) -> RepositoryResult<Vec<HrnRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT PID, SQ, GR, SR, SL, PF, TD FROM HRN WHERE PID = ?1 ORDER BY SQ ASC",
        )?;
        let rows = stmt.query_map(params![student_id], |row| {
            Ok(HrnRow {
                pid: row.get(0)?,
                sq: row.get(1)?,
                gr: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                sr: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                sl: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                pf: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                td: row.get::<_, NaiveDate>(6)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}
