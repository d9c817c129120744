// ==========================================
// 听力筛查成绩导入 - 端到端流程测试
// ==========================================
// 覆盖: 花名册目录 → 过滤 → 年级/序号补全 → 快照 → HRN
// ==========================================


use chrono::NaiveDate;
use hearing_screening_etl::repository::{
    HearingRepository, RepositoryError, RepositoryResult, SqliteHearingRepository,
    SqliteStudentRepository,
};
use hearing_screening_etl::importer::FileParser;
use hearing_screening_etl::{
    ColumnMapping, CommitMode, EtlError, FailureKind, HrnRow, ImportResult, RawRecord, RosterFile,
    ScreeningImporter,
};
use tempfile::tempdir;
use test_helpers::*;

const BANCROFT: &str = "Bancroft Rosters 4RHearing 25-26 as of 9_18_25.xlsx";

fn sept(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
}

// ==========================================
// 场景: 单文件，P/F 混合，已有历史序号
// ==========================================
#[test]
fn test_bancroft_roster_end_to_end() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");
    seed_student(&conn, "1002", "4");
    seed_hrn(&conn, "1001", 1, "2024-09-20");
    seed_hrn(&conn, "1001", 2, "2025-02-11");

    let root = tempdir().unwrap();
    let mut config = test_config(root.path(), CommitMode::Commit);
    config.columns = ColumnMapping {
        screen_result: Some("Right".to_string()),
        screen_left: Some("Left".to_string()),
        ..ColumnMapping::default()
    };
    write_roster(
        &config.input_dir.join(BANCROFT),
        &[(
            "Room 12",
            vec![roster_row("P", "1001", "S1"), vec!["F", "R", "R", "1002", "S2"]],
        )],
    )
    .unwrap();

    let importer = ScreeningImporter::from_connection(config.clone(), conn.clone()).unwrap();
    let summary = importer.run().unwrap();

    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.rows_dropped, 1);
    assert_eq!(summary.records_loaded, 1);
    assert!(!summary.has_failures());

    let hearings = SqliteHearingRepository::new(conn.clone());
    let rows = hearings.list_by_student("1001").unwrap();
    assert_eq!(rows.len(), 3);
    let loaded = &rows[2];
    assert_eq!(loaded.sq, 3);
    assert_eq!(loaded.gr, "4");
    assert_eq!(loaded.sr, "R");
    assert_eq!(loaded.sl, "L");
    assert_eq!(loaded.pf, "P");
    assert_eq!(loaded.td, sept(18));

    // 未通过的学生不写入
    assert!(hearings.list_by_student("1002").unwrap().is_empty());

    let snapshot = read_snapshot(&config.snapshot_path);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0][0], "1001");
    assert_eq!(snapshot[0][1], "3");
    assert_eq!(snapshot[0][6], "2025-09-18");
    assert_eq!(snapshot[0][7], BANCROFT);
}

// ==========================================
// 默认 DryRun: 不落库，但序号仍在运行内递增
// ==========================================
#[test]
fn test_dry_run_issues_distinct_numbers_without_writing() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");
    seed_hrn(&conn, "1001", 1, "2024-09-20");
    seed_hrn(&conn, "1001", 2, "2025-02-11");

    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::default());
    write_roster(
        &config.input_dir.join("a roster 9_18_25.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1")])],
    )
    .unwrap();
    write_roster(
        &config.input_dir.join("b roster 9_25_25.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1")])],
    )
    .unwrap();

    let importer = ScreeningImporter::from_connection(config.clone(), conn.clone()).unwrap();
    let summary = importer.run().unwrap();

    assert_eq!(summary.commit_mode, CommitMode::DryRun);
    assert_eq!(summary.records_loaded, 2);
    assert_eq!(count_hrn(&conn), 2);

    let snapshot = read_snapshot(&config.snapshot_path);
    let sequences: Vec<&str> = snapshot.iter().map(|r| r[1].as_str()).collect();
    assert_eq!(sequences, vec!["3", "4"]);
    let dates: Vec<&str> = snapshot.iter().map(|r| r[6].as_str()).collect();
    assert_eq!(dates, vec!["2025-09-18", "2025-09-25"]);
}

// ==========================================
// 同一学生跨文件/跨工作表出现: 序号唯一且递增
// ==========================================
#[test]
fn test_repeat_student_across_files_and_sheets_commit() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");
    seed_student(&conn, "1003", "6");
    seed_hrn(&conn, "1001", 7, "2025-02-11");

    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::Commit);
    write_roster(
        &config.input_dir.join("roster 9_18_25.xlsx"),
        &[
            ("Room 12", vec![roster_row("P", "1001", "S1")]),
            ("Room 14", vec![roster_row("P", "1003", "S3"), roster_row("P", "1001", "S1")]),
        ],
    )
    .unwrap();
    write_roster(
        &config.input_dir.join("roster 10_02_25.xlsx"),
        &[("Room 12", vec![roster_row("P", "1001", "S1")])],
    )
    .unwrap();

    let importer = ScreeningImporter::from_connection(config, conn.clone()).unwrap();
    let summary = importer.run().unwrap();
    assert_eq!(summary.records_loaded, 4);

    let hearings = SqliteHearingRepository::new(conn.clone());
    let sequences: Vec<i64> = hearings
        .list_by_student("1001")
        .unwrap()
        .iter()
        .map(|r| r.sq)
        .collect();
    assert_eq!(sequences, vec![7, 8, 9, 10]);
    assert_eq!(hearings.max_sequence("1003").unwrap(), Some(1));

    // 文件按文件名字典序处理: "roster 10_02_25" 先于 "roster 9_18_25"
    let rows = hearings.list_by_student("1001").unwrap();
    assert_eq!(rows[1].td, NaiveDate::from_ymd_opt(2025, 10, 2).unwrap());
    assert_eq!(rows[2].td, sept(18));
}

// ==========================================
// 重跑: 不与上次（部分）运行已提交的记录冲突
// ==========================================
#[test]
fn test_rerun_after_partial_commit_never_collides() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");
    seed_student(&conn, "1002", "5");

    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::Commit);
    write_roster(
        &config.input_dir.join("roster 9_18_25.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1"), roster_row("P", "1002", "S2")])],
    )
    .unwrap();

    // 第一次运行中途中止（第二个文件损坏），第一个文件已提交
    std::fs::write(config.input_dir.join("roster 9_25_25.xlsx"), b"not a workbook").unwrap();
    let importer = ScreeningImporter::from_connection(config.clone(), conn.clone()).unwrap();
    let err = importer.run().unwrap_err();
    assert!(matches!(err, EtlError::WorkbookRead { .. }));
    assert_eq!(count_hrn(&conn), 2);

    // 修复文件后重跑全部输入
    write_roster(
        &config.input_dir.join("roster 9_25_25.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1")])],
    )
    .unwrap();
    let summary = importer.run().unwrap();
    assert!(!summary.has_failures());
    assert_eq!(summary.records_loaded, 3);

    let hearings = SqliteHearingRepository::new(conn.clone());
    let sequences: Vec<i64> = hearings
        .list_by_student("1001")
        .unwrap()
        .iter()
        .map(|r| r.sq)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(hearings.max_sequence("1002").unwrap(), Some(2));
}

// ==========================================
// 单条记录失败: 跳过并汇总，不影响其他记录
// ==========================================
#[test]
fn test_per_record_failures_are_reported_not_fatal() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");
    seed_student(&conn, "1004", "2");
    seed_student(&conn, "1005", "3");
    {
        // 模拟目标库拒绝某条记录
        let c = conn.lock().unwrap();
        c.execute_batch(
            r#"
            CREATE TRIGGER reject_1004 BEFORE INSERT ON HRN
            WHEN NEW.PID = '1004'
            BEGIN
                SELECT RAISE(ABORT, 'constraint rejected by district rule');
            END;
            "#,
        )
        .unwrap();
    }

    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::Commit);
    write_roster(
        &config.input_dir.join("roster 9_18_25.xlsx"),
        &[(
            "Sheet1",
            vec![
                roster_row("P", "1001", "known"),
                roster_row("P", "3003", "unknown student"),
                roster_row("P", "ABC", "malformed id"),
                roster_row("P", "1004", "rejected insert"),
                roster_row("P", "1005", "after failures"),
            ],
        )],
    )
    .unwrap();

    let importer = ScreeningImporter::from_connection(config.clone(), conn.clone()).unwrap();
    let summary = importer.run().unwrap();

    assert_eq!(summary.records_loaded, 2);
    assert_eq!(summary.failures.len(), 3);
    let counts = summary.failure_counts();
    assert_eq!(counts.get(&FailureKind::GradeNotFound), Some(&1));
    assert_eq!(counts.get(&FailureKind::InvalidStudentId), Some(&1));
    assert_eq!(counts.get(&FailureKind::Insert), Some(&1));

    let not_found = summary
        .failures
        .iter()
        .find(|f| f.kind == FailureKind::GradeNotFound)
        .unwrap();
    assert_eq!(not_found.student_id, "3003");
    assert_eq!(not_found.row_number, 3);

    let hearings = SqliteHearingRepository::new(conn.clone());
    assert_eq!(hearings.max_sequence("1001").unwrap(), Some(1));
    assert_eq!(hearings.max_sequence("1005").unwrap(), Some(1));
    assert_eq!(hearings.max_sequence("3003").unwrap(), None);
    assert_eq!(count_hrn(&conn), 2);

    // 快照包含已补全记录（含写入失败的 1004），不含未补全记录
    let snapshot = read_snapshot(&config.snapshot_path);
    let pids: Vec<&str> = snapshot.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(pids, vec!["1001", "1004", "1005"]);
}

// ==========================================
// 致命错误: 文件名无日期 → 不写入任何数据
// ==========================================
#[test]
fn test_undated_file_aborts_before_any_write() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");

    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::Commit);
    write_roster(
        &config.input_dir.join("a roster 9_18_25.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1")])],
    )
    .unwrap();
    write_roster(
        &config.input_dir.join("z roster latest.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1")])],
    )
    .unwrap();
    // 非工作簿文件忽略
    std::fs::write(config.input_dir.join("readme.txt"), "notes").unwrap();

    let importer = ScreeningImporter::from_connection(config.clone(), conn.clone()).unwrap();
    match importer.run() {
        Err(EtlError::DateParse { file_name, .. }) => assert_eq!(file_name, "z roster latest.xlsx"),
        other => panic!("期望 DateParse 错误, 实际: {:?}", other.map(|s| s.records_loaded)),
    }
    assert_eq!(count_hrn(&conn), 0);
    assert!(!config.snapshot_path.exists());
}

// ==========================================
// 空目录: 正常完成，无记录
// ==========================================
#[test]
fn test_empty_input_directory() {
    let (_db, conn) = create_test_db().unwrap();
    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::Commit);

    let importer = ScreeningImporter::from_connection(config, conn.clone()).unwrap();
    let summary = importer.run().unwrap();
    assert_eq!(summary.files_processed, 0);
    assert_eq!(summary.records_loaded, 0);
    assert!(!summary.run_id.is_empty());
}

// ==========================================
// 运行汇总 JSON
// ==========================================
#[test]
fn test_summary_json_written_when_configured() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");

    let root = tempdir().unwrap();
    let mut config = test_config(root.path(), CommitMode::DryRun);
    let summary_path = root.path().join("summary.json");
    config.summary_path = Some(summary_path.clone());
    write_roster(
        &config.input_dir.join("roster 9_18_25.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1"), roster_row("P", "4040", "S9")])],
    )
    .unwrap();

    let importer = ScreeningImporter::from_connection(config, conn).unwrap();
    importer.run().unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(json["commit_mode"], "DRY_RUN");
    assert_eq!(json["records_loaded"], 1);
    assert_eq!(json["failures"][0]["kind"], "GRADE_NOT_FOUND");
    assert_eq!(json["failures"][0]["student_id"], "4040");
}

// ==========================================
// 致命错误: 序号查询失败 → 立即中止
// ==========================================
#[derive(Clone)]
struct UnreachableHearings;

impl HearingRepository for UnreachableHearings {
    fn max_sequence(&self, _student_id: &str) -> RepositoryResult<Option<i64>> {
        Err(RepositoryError::DatabaseQueryError("连接已断开".to_string()))
    }

    fn insert_row(&self, _row: &HrnRow, _mode: CommitMode) -> RepositoryResult<()> {
        panic!("序号查询失败后不应再写入");
    }

    fn list_by_student(&self, _student_id: &str) -> RepositoryResult<Vec<HrnRow>> {
        Ok(Vec::new())
    }
}

#[test]
fn test_sequence_query_failure_is_fatal() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");

    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::Commit);
    write_roster(
        &config.input_dir.join("roster 9_18_25.xlsx"),
        &[("Sheet1", vec![roster_row("P", "1001", "S1")])],
    )
    .unwrap();

    let importer = ScreeningImporter::new(
        config,
        SqliteStudentRepository::new(conn.clone()),
        UnreachableHearings,
    )
    .unwrap();

    match importer.run() {
        Err(EtlError::SequenceQuery { student_id, .. }) => assert_eq!(student_id, "1001"),
        other => panic!("期望 SequenceQuery 错误, 实际: {:?}", other.map(|s| s.records_loaded)),
    }
}

// ==========================================
// 可替换解析器: 不依赖真实工作簿内容
// ==========================================
struct InMemoryRosterParser {
    rows: Vec<(&'static str, &'static str)>, // (标记, 学号)
}

impl FileParser for InMemoryRosterParser {
    fn parse_roster(&self, roster: &RosterFile) -> ImportResult<Vec<RawRecord>> {
        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, (marker, student_id))| RawRecord {
                source_file: roster.file_name().to_string(),
                sheet_name: "Sheet1".to_string(),
                row_number: idx + 2,
                cells: vec![
                    ("Result".to_string(), marker.to_string()),
                    ("Stu ID".to_string(), student_id.to_string()),
                ],
                screening_date: roster.screening_date(),
            })
            .collect())
    }
}

#[test]
fn test_custom_parser_and_last_date_token_reach_hrn() {
    let (_db, conn) = create_test_db().unwrap();
    seed_student(&conn, "1001", "4");

    let root = tempdir().unwrap();
    let config = test_config(root.path(), CommitMode::Commit);
    // 两个日期标记只隔一个空格，取后一个
    std::fs::write(config.input_dir.join("roster 9_18_25 9_25_25.xlsx"), b"").unwrap();

    let importer = ScreeningImporter::from_connection(config, conn.clone())
        .unwrap()
        .with_file_parser(Box::new(InMemoryRosterParser {
            rows: vec![("P", "1001"), ("F", "1001")],
        }));
    assert!(importer.config().commit_mode.is_commit());

    let summary = importer.run().unwrap();
    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.rows_dropped, 1);
    assert_eq!(summary.records_loaded, 1);

    let rows = SqliteHearingRepository::new(conn.clone())
        .list_by_student("1001")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].td, sept(25));
    assert_eq!(rows[0].sr, "P");
    assert_eq!(rows[0].sl, "P");
}
