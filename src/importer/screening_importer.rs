// ==========================================
// 听力筛查成绩导入 - 导入流程编排
// ==========================================
// 职责: 整合导入流程，从花名册目录到 HRN 表
// 流程: 文件发现 → 工作簿解析 → 通过过滤 → 年级解析 → 序号分配 → 快照 → 写入
// 顺序: 单线程、逐文件、逐行；一个文件的记录全部写完才处理下一个文件
// ==========================================

use crate::config::RunConfig;
use crate::domain::{RecordFailure, RosterFile, RunSummary, ScreeningRecord};
use crate::engine::{GradeResolver, Loader, SequenceAllocator};
use crate::importer::error::{EtlError, ImportResult};
use crate::importer::file_ingestor::FileIngestor;
use crate::importer::file_parser::ExcelRosterParser;
use crate::importer::record_filter::RecordFilter;
use crate::importer::screening_importer_trait::FileParser;
use crate::importer::snapshot::SnapshotWriter;
use crate::repository::{
    HearingRepository, SqliteHearingRepository, SqliteStudentRepository, StudentRepository,
};
use rusqlite::Connection;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// 单次运行内的可变状态
struct RunContext<H: HearingRepository> {
    allocator: SequenceAllocator<H>,
    loader: Loader<H>,
    snapshot: SnapshotWriter,
    summary: RunSummary,
}

// ==========================================
// ScreeningImporter - 筛查成绩导入器
// ==========================================
pub struct ScreeningImporter<S, H>
where
    S: StudentRepository,
    H: HearingRepository + Clone,
{
    config: RunConfig,
    file_ingestor: FileIngestor,
    file_parser: Box<dyn FileParser>,
    record_filter: RecordFilter,
    grade_resolver: GradeResolver<S>,
    hearings: H,
}

impl ScreeningImporter<SqliteStudentRepository, SqliteHearingRepository> {
    /// 基于共享 SQLite 连接创建导入器
    ///
    /// 同一连接: GradeResolver / SequenceAllocator 只读，Loader 读写
    pub fn from_connection(
        config: RunConfig,
        conn: Arc<Mutex<Connection>>,
    ) -> ImportResult<Self> {
        let students = SqliteStudentRepository::new(conn.clone());
        let hearings = SqliteHearingRepository::new(conn);
        Self::new(config, students, hearings)
    }
}

impl<S, H> ScreeningImporter<S, H>
where
    S: StudentRepository,
    H: HearingRepository + Clone,
{
    /// 创建新的导入器实例
    ///
    /// # 参数
    /// - config: 运行配置（提交模式、列映射、输出路径）
    /// - students: 学生信息仓储
    /// - hearings: HRN 仓储
    pub fn new(config: RunConfig, students: S, hearings: H) -> ImportResult<Self> {
        Ok(Self {
            file_ingestor: FileIngestor::new()?,
            file_parser: Box::new(ExcelRosterParser),
            record_filter: RecordFilter::new(config.columns.clone()),
            grade_resolver: GradeResolver::new(students),
            hearings,
            config,
        })
    }

    /// 替换工作簿解析器
    pub fn with_file_parser(mut self, file_parser: Box<dyn FileParser>) -> Self {
        self.file_parser = file_parser;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// 按配置中的输入目录执行一次完整导入
    pub fn run(&self) -> ImportResult<RunSummary> {
        self.run_dir(&self.config.input_dir)
    }

    /// 对指定目录执行一次完整导入
    ///
    /// # 返回
    /// - Ok(RunSummary): 运行完成（可能包含单条记录失败）
    /// - Err: 致命错误（文件名日期、工作簿读取、序号查询、数据源、快照）
    #[instrument(skip(self, input_dir), fields(run_id))]
    pub fn run_dir<P: AsRef<Path>>(&self, input_dir: P) -> ImportResult<RunSummary> {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let input_dir = input_dir.as_ref();
        info!(
            run_id = %run_id,
            input_dir = %input_dir.display(),
            mode = ?self.config.commit_mode,
            "开始导入筛查成绩"
        );

        // === 步骤 1: 文件发现（全部日期先解析，失败则不写任何数据）===
        let rosters = self.file_ingestor.discover(input_dir).map_err(|e| {
            error!(error = %e, "文件发现失败");
            e
        })?;

        let mut ctx = RunContext {
            allocator: SequenceAllocator::new(self.hearings.clone()),
            loader: Loader::new(self.hearings.clone(), self.config.commit_mode),
            snapshot: SnapshotWriter::create(&self.config.snapshot_path)?,
            summary: RunSummary::new(run_id.clone(), self.config.commit_mode),
        };

        // === 步骤 2: 逐文件处理 ===
        for roster in &rosters {
            self.process_roster(roster, &mut ctx)?;
        }

        let RunContext {
            snapshot,
            mut summary,
            ..
        } = ctx;
        let snapshot_rows = snapshot.finish()?;
        summary.elapsed_ms = start_time.elapsed().as_millis();

        for (kind, count) in summary.failure_counts() {
            warn!(kind = ?kind, count = count, "记录被跳过");
        }
        info!(
            run_id = %run_id,
            files = summary.files_processed,
            rows_read = summary.rows_read,
            rows_dropped = summary.rows_dropped,
            enriched = summary.records_enriched,
            loaded = summary.records_loaded,
            failed = summary.failures.len(),
            snapshot_rows = snapshot_rows,
            elapsed_ms = summary.elapsed_ms,
            "筛查成绩导入完成"
        );

        if let Some(path) = &self.config.summary_path {
            write_summary_json(path, &summary)?;
        }

        Ok(summary)
    }

    /// 处理单个花名册文件
    fn process_roster(&self, roster: &RosterFile, ctx: &mut RunContext<H>) -> ImportResult<()> {
        info!(file = %roster.file_name(), date = %roster.screening_date(), "开始处理花名册");

        // === 工作簿解析（全部工作表合并）===
        let rows = self.file_parser.parse_roster(roster).map_err(|e| {
            error!(file = %roster.file_name(), error = %e, "工作簿解析失败");
            e
        })?;
        ctx.summary.rows_read += rows.len();

        // === 通过过滤 ===
        let outcome = self.record_filter.apply(rows);
        ctx.summary.rows_dropped += outcome.dropped;
        info!(
            file = %roster.file_name(),
            kept = outcome.kept.len(),
            dropped = outcome.dropped,
            "通过过滤完成"
        );

        // === 逐条补全并写入 ===
        for record in outcome.kept {
            self.process_record(record, ctx)?;
        }

        ctx.summary.files_processed += 1;
        Ok(())
    }

    /// 处理单条筛查记录（可恢复错误记入汇总，致命错误向上返回）
    fn process_record(
        &self,
        mut record: ScreeningRecord,
        ctx: &mut RunContext<H>,
    ) -> ImportResult<()> {
        // 年级先于序号：被跳过的记录不占用序号
        let grade = match self.grade_resolver.resolve(&record.student_id) {
            Ok(grade) => grade,
            Err(e) => return record_failure(&record, e, &mut ctx.summary),
        };
        record.grade = Some(grade);

        let sequence_number = ctx.allocator.next_for(&record.student_id).map_err(|e| {
            error!(student_id = %record.student_id, error = %e, "序号查询失败，中止运行");
            e
        })?;
        record.sequence_number = Some(sequence_number);

        ctx.snapshot.append(&record)?;
        ctx.summary.records_enriched += 1;

        match ctx.loader.load(&record) {
            Ok(outcome) => {
                debug!(student_id = %record.student_id, sq = sequence_number, outcome = ?outcome, "记录写入完成");
                ctx.summary.records_loaded += 1;
                Ok(())
            }
            Err(e) => record_failure(&record, e, &mut ctx.summary),
        }
    }
}

/// 可恢复错误 → 记入失败列表；其余错误原样返回
fn record_failure(
    record: &ScreeningRecord,
    err: EtlError,
    summary: &mut RunSummary,
) -> ImportResult<()> {
    match err.failure_kind() {
        Some(kind) => {
            warn!(
                file = %record.source_file,
                sheet = %record.sheet_name,
                row = record.row_number,
                student_id = %record.student_id,
                error = %err,
                "记录跳过"
            );
            summary.failures.push(RecordFailure::new(record, kind, &err));
            Ok(())
        }
        None => {
            error!(student_id = %record.student_id, error = %err, "致命错误，中止运行");
            Err(err)
        }
    }
}

fn write_summary_json(path: &Path, summary: &RunSummary) -> ImportResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| EtlError::Snapshot(format!("{}: {}", path.display(), e)))?;
    info!(path = %path.display(), "运行汇总已写出");
    Ok(())
}
