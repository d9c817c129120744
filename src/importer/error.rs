// ==========================================
// 听力筛查成绩导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 致命错误（中止整次运行） / 单条记录错误（跳过并汇总）
// ==========================================

use crate::repository::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// 导入流程错误类型
#[derive(Error, Debug)]
pub enum EtlError {
    // ===== 文件相关错误（致命）=====
    #[error("文件名日期解析失败: {file_name}: {message}")]
    DateParse { file_name: String, message: String },

    #[error("工作簿读取失败: {file}: {message}")]
    WorkbookRead { file: String, message: String },

    // ===== 单条记录错误（可恢复）=====
    #[error("学号格式非法: '{student_id}'")]
    InvalidStudentId { student_id: String },

    #[error("学生不存在或无年级: {student_id}")]
    GradeNotFound { student_id: String },

    #[error("HRN 写入失败 (PID={student_id}, SQ={sequence_number:?}): {message}")]
    Insert {
        student_id: String,
        sequence_number: Option<i64>,
        message: String,
    },

    // ===== 序号查询错误（致命）=====
    #[error("序号查询失败 (PID={student_id}): {message}")]
    SequenceQuery { student_id: String, message: String },

    // ===== 基础设施错误（致命）=====
    #[error("数据库错误: {0}")]
    Database(String),

    #[error("快照写入失败: {0}")]
    Snapshot(String),

    #[error("配置错误 (key: {key}): {message}")]
    Config { key: String, message: String },

    #[error("文件读取失败: {0}")]
    Io(String),
}

/// 记录级失败的分类（用于运行汇总）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    InvalidStudentId,
    GradeNotFound,
    Insert,
}

impl EtlError {
    /// 是否为可恢复（单条记录）错误
    pub fn is_recoverable(&self) -> bool {
        self.failure_kind().is_some()
    }

    /// 可恢复错误对应的失败分类；致命错误返回 None
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            EtlError::InvalidStudentId { .. } => Some(FailureKind::InvalidStudentId),
            EtlError::GradeNotFound { .. } => Some(FailureKind::GradeNotFound),
            EtlError::Insert { .. } => Some(FailureKind::Insert),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Io(err.to_string())
    }
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        EtlError::Snapshot(err.to_string())
    }
}

impl From<rusqlite::Error> for EtlError {
    fn from(err: rusqlite::Error) -> Self {
        EtlError::Database(err.to_string())
    }
}

impl From<RepositoryError> for EtlError {
    fn from(err: RepositoryError) -> Self {
        EtlError::Database(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let bad_id = EtlError::InvalidStudentId {
            student_id: "abc".to_string(),
        };
        assert!(bad_id.is_recoverable());
        assert_eq!(bad_id.failure_kind(), Some(FailureKind::InvalidStudentId));

        let seq = EtlError::SequenceQuery {
            student_id: "1001".to_string(),
            message: "disk I/O error".to_string(),
        };
        assert!(!seq.is_recoverable());

        let date = EtlError::DateParse {
            file_name: "roster.xlsx".to_string(),
            message: "未找到日期".to_string(),
        };
        assert!(!date.is_recoverable());
    }

    #[test]
    fn test_error_message_names_student() {
        let err = EtlError::Insert {
            student_id: "1001".to_string(),
            sequence_number: Some(3),
            message: "UNIQUE constraint failed".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("1001"));
        assert!(text.contains("UNIQUE"));
    }
}
