// ==========================================
// 听力筛查成绩导入 - 学生信息 Repository
// ==========================================
// 职责: 只读查询 STU 表（当前年级）
// 红线: Repository 不含业务规则（学号校验在 GradeResolver）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// StudentRepository Trait
// ==========================================
pub trait StudentRepository {
    /// 查询学生当前年级
    ///
    /// # 返回
    /// - Ok(Some(grade)): 在籍学生
    /// - Ok(None): 不存在 / 已删除 / 已标记
    fn find_current_grade(&self, student_id: &str) -> RepositoryResult<Option<String>>;
}

// ==========================================
// SqliteStudentRepository
// ==========================================
#[derive(Clone)]
pub struct SqliteStudentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStudentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl StudentRepository for SqliteStudentRepository {
    fn find_current_grade(&self, student_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        // 仅在籍记录：DEL = 0 且无标记
        let grade = conn
            .query_row(
                "SELECT CAST(GR AS TEXT) FROM STU WHERE DEL = 0 AND TG = '' AND ID = ?1 LIMIT 1",
                params![student_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;

        Ok(grade.flatten())
    }
}
