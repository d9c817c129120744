// ==========================================
// 听力筛查成绩导入 - 年级解析
// ==========================================
// 职责: 学号校验 + 查询学生当前年级
// 失败策略: 学号非法 / 学生不存在 → 单条记录错误（跳过并汇总）
//           数据源故障 → 致命错误
// ==========================================

use crate::importer::error::{EtlError, ImportResult};
use crate::repository::StudentRepository;
use tracing::debug;

/// 学号最大长度
pub const MAX_STUDENT_ID_LEN: usize = 10;

// ==========================================
// GradeResolver - 年级解析器
// ==========================================
pub struct GradeResolver<S: StudentRepository> {
    students: S,
}

impl<S: StudentRepository> GradeResolver<S> {
    pub fn new(students: S) -> Self {
        Self { students }
    }

    /// 解析学生当前年级
    ///
    /// # 返回
    /// - Ok(grade)
    /// - Err(InvalidStudentId): 学号为空 / 非纯数字 / 过长（不查询数据库）
    /// - Err(GradeNotFound): STU 中无在籍记录
    /// - Err(Database): 查询本身失败
    pub fn resolve(&self, student_id: &str) -> ImportResult<String> {
        validate_student_id(student_id)?;

        match self.students.find_current_grade(student_id)? {
            Some(grade) => {
                debug!(student_id = %student_id, grade = %grade, "年级解析成功");
                Ok(grade)
            }
            None => Err(EtlError::GradeNotFound {
                student_id: student_id.to_string(),
            }),
        }
    }
}

/// 校验学号格式（纯数字，1..=MAX_STUDENT_ID_LEN 位）
pub fn validate_student_id(student_id: &str) -> ImportResult<()> {
    let well_formed = !student_id.is_empty()
        && student_id.len() <= MAX_STUDENT_ID_LEN
        && student_id.chars().all(|c| c.is_ascii_digit());

    if well_formed {
        Ok(())
    } else {
        Err(EtlError::InvalidStudentId {
            student_id: student_id.to_string(),
        })
    }
}
