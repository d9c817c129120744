// ==========================================
// 听力筛查成绩导入 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，避免目标库被其他进程占用时偶发 busy 错误
// ==========================================

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 目标表 HRN 与学生表 STU 的建表语句（幂等）
///
/// 说明：
/// - 生产库由学籍系统维护，不在此建表；仅测试库/本地库按需初始化
/// - (PID, SQ) 为主键，保证同一学生序号不重复
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS HRN (
    PID TEXT NOT NULL,
    SQ  INTEGER NOT NULL CHECK (SQ > 0),
    GR  TEXT,
    SR  TEXT,
    SL  TEXT,
    PF  TEXT,
    TD  TEXT NOT NULL,
    PRIMARY KEY (PID, SQ)
);

CREATE TABLE IF NOT EXISTS STU (
    ID  TEXT NOT NULL,
    GR  TEXT,
    DEL INTEGER NOT NULL DEFAULT 0,
    TG  TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_stu_id ON STU (ID);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection<P: AsRef<Path>>(db_path: P) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化 HRN / STU 表（已存在则跳过）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
