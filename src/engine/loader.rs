// ==========================================
// 听力筛查成绩导入 - HRN 写入
// ==========================================
// 职责: ScreeningRecord → HRN(PID, SQ, GR, SR, SL, PF, TD)，按提交模式写入
// 红线: 默认 DryRun；Commit 必须由配置显式开启
// 隔离: 单条记录单事务，失败不影响其他记录
// ==========================================

use crate::config::CommitMode;
use crate::domain::{HrnRow, ScreeningRecord};
use crate::importer::error::{EtlError, ImportResult};
use crate::repository::{HearingRepository, INSERT_HRN_SQL};
use tracing::{info, warn};

/// 单条写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed,
    DryRun,
}

// ==========================================
// Loader - HRN 写入器
// ==========================================
pub struct Loader<H: HearingRepository> {
    hearings: H,
    mode: CommitMode,
}

impl<H: HearingRepository> Loader<H> {
    pub fn new(hearings: H, mode: CommitMode) -> Self {
        Self { hearings, mode }
    }

    /// 写入一条已补全的筛查记录
    ///
    /// # 返回
    /// - Ok(LoadOutcome::Committed): 已提交
    /// - Ok(LoadOutcome::DryRun): 已执行并校验，事务回滚
    /// - Err(Insert): 记录未补全 / 约束冲突 / 连接失败
    pub fn load(&self, record: &ScreeningRecord) -> ImportResult<LoadOutcome> {
        let row = HrnRow::try_from(record)?;

        info!(
            sql = INSERT_HRN_SQL,
            pid = %row.pid,
            sq = row.sq,
            gr = %row.gr,
            sr = %row.sr,
            sl = %row.sl,
            pf = %row.pf,
            td = %row.td,
            mode = ?self.mode,
            "写入 HRN 记录"
        );

        self.hearings.insert_row(&row, self.mode).map_err(|e| {
            warn!(pid = %row.pid, sq = row.sq, error = %e, "HRN 写入失败");
            EtlError::Insert {
                student_id: row.pid.clone(),
                sequence_number: Some(row.sq),
                message: e.to_string(),
            }
        })?;

        Ok(match self.mode {
            CommitMode::Commit => LoadOutcome::Committed,
            CommitMode::DryRun => LoadOutcome::DryRun,
        })
    }
}
