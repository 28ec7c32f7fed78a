// ==========================================
// 实验室采购运营系统 - 导入任务仓储
// ==========================================
// 职责: 记录每次提交的汇总与完整失败日志
// 说明: CommitResult 只携带有界失败样本，完整失败清单落在 import_job_failure
// ==========================================

use crate::domain::{CommitOutcome, CommitResult, ImportKind, RowFailure, RowOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 导入任务记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobEntity {
    pub job_id: String,
    pub file_id: String,
    pub filename: String,
    pub import_kind: String,
    pub total_rows: usize,
    pub success_rows: usize,
    pub error_rows: usize,
    pub skipped_rows: usize,
    pub created_rows: usize,
    pub updated_rows: usize,
    pub elapsed_ms: u64,
    pub committed_at: String,
}

impl ImportJobEntity {
    pub fn from_result(
        result: &CommitResult,
        file_id: &str,
        filename: &str,
        import_kind: ImportKind,
        elapsed_ms: u64,
        committed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: result.job_id.clone(),
            file_id: file_id.to_string(),
            filename: filename.to_string(),
            import_kind: import_kind.as_str().to_string(),
            total_rows: result.total_rows,
            success_rows: result.success_rows,
            error_rows: result.error_rows,
            skipped_rows: result.skipped_rows,
            created_rows: result.summary_counts.created,
            updated_rows: result.summary_counts.updated,
            elapsed_ms,
            committed_at: committed_at.to_rfc3339(),
        }
    }
}

pub struct ImportJobRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportJobRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入任务汇总与全部失败行（单事务）
    ///
    /// # 参数
    /// - job: 任务汇总
    /// - outcomes: 全部行级结果，仅 Failed 行落库
    ///
    /// # 返回
    /// - 写入的失败行数
    pub fn insert_job(&self, job: &ImportJobEntity, outcomes: &[RowOutcome]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            r#"
            INSERT INTO import_job (
                job_id, file_id, filename, import_kind,
                total_rows, success_rows, error_rows, skipped_rows,
                created_rows, updated_rows, elapsed_ms, committed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                job.job_id,
                job.file_id,
                job.filename,
                job.import_kind,
                job.total_rows as i64,
                job.success_rows as i64,
                job.error_rows as i64,
                job.skipped_rows as i64,
                job.created_rows as i64,
                job.updated_rows as i64,
                job.elapsed_ms as i64,
                job.committed_at,
            ],
        )?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO import_job_failure (job_id, row_number, reason) VALUES (?1, ?2, ?3)",
            )?;
            for outcome in outcomes {
                if let CommitOutcome::Failed(reason) = &outcome.outcome {
                    stmt.execute(params![job.job_id, outcome.row_number as i64, reason])?;
                    inserted += 1;
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(inserted)
    }

    /// 按 job_id 查询任务汇总
    pub fn find_job(&self, job_id: &str) -> RepositoryResult<Option<ImportJobEntity>> {
        let conn = self.get_conn()?;
        let job = conn
            .query_row(
                r#"
                SELECT job_id, file_id, filename, import_kind,
                       total_rows, success_rows, error_rows, skipped_rows,
                       created_rows, updated_rows, elapsed_ms, committed_at
                FROM import_job WHERE job_id = ?1
                "#,
                params![job_id],
                |row| {
                    Ok(ImportJobEntity {
                        job_id: row.get(0)?,
                        file_id: row.get(1)?,
                        filename: row.get(2)?,
                        import_kind: row.get(3)?,
                        total_rows: row.get::<_, i64>(4)? as usize,
                        success_rows: row.get::<_, i64>(5)? as usize,
                        error_rows: row.get::<_, i64>(6)? as usize,
                        skipped_rows: row.get::<_, i64>(7)? as usize,
                        created_rows: row.get::<_, i64>(8)? as usize,
                        updated_rows: row.get::<_, i64>(9)? as usize,
                        elapsed_ms: row.get::<_, i64>(10)? as u64,
                        committed_at: row.get(11)?,
                    })
                },
            )
            .optional()?;
        Ok(job)
    }

    /// 查询任务的完整失败清单（按行号升序）
    pub fn list_failures(&self, job_id: &str) -> RepositoryResult<Vec<RowFailure>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT row_number, reason FROM import_job_failure WHERE job_id = ?1 ORDER BY row_number",
        )?;
        let failures = stmt
            .query_map(params![job_id], |row| {
                Ok(RowFailure {
                    row_number: row.get::<_, i64>(0)? as usize,
                    reason: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(failures)
    }
}
