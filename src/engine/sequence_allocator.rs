// ==========================================
// 听力筛查成绩导入 - 序号分配
// ==========================================
// 职责: 为学生的新筛查记录分配 SQ
// 规则: next = max(HRN 实时最大序号, 本次运行已分配最大序号) + 1
// 红线: 最大序号查询失败时不得默认为 0（会与已有记录冲突），直接中止运行
// ==========================================

use crate::importer::error::{EtlError, ImportResult};
use crate::repository::HearingRepository;
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// SequenceAllocator - 序号分配器
// ==========================================
// 状态仅在单次运行内有效；持久状态只在 HRN 表中
pub struct SequenceAllocator<H: HearingRepository> {
    hearings: H,
    issued: HashMap<String, i64>,
}

impl<H: HearingRepository> SequenceAllocator<H> {
    pub fn new(hearings: H) -> Self {
        Self {
            hearings,
            issued: HashMap::new(),
        }
    }

    /// 分配下一个序号
    ///
    /// # 说明
    /// - 每次都重新查询 HRN 当前最大值（兼容人工修改过的数据）
    /// - 同时参考本次运行已分配的序号（DryRun 下数据库中不会出现）
    ///
    /// # 返回
    /// - Ok(sq): 严格大于该学生所有已知序号
    /// - Err(SequenceQuery): 最大序号查询失败
    pub fn next_for(&mut self, student_id: &str) -> ImportResult<i64> {
        let live_max = self
            .hearings
            .max_sequence(student_id)
            .map_err(|e| EtlError::SequenceQuery {
                student_id: student_id.to_string(),
                message: e.to_string(),
            })?
            .unwrap_or(0);

        let last_issued = self.issued.get(student_id).copied().unwrap_or(0);
        let next = live_max.max(last_issued) + 1;

        self.issued.insert(student_id.to_string(), next);
        debug!(
            student_id = %student_id,
            live_max = live_max,
            last_issued = last_issued,
            next = next,
            "分配序号"
        );
        Ok(next)
    }

    /// 本次运行已分配的最大序号（学号 → SQ）
    pub fn issued(&self) -> &HashMap<String, i64> {
        &self.issued
    }
}
