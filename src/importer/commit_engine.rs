// ==========================================
// 实验室采购运营系统 - 提交引擎
// ==========================================
// 职责: 暂存行 ∘ 覆写 → 复核校验 → 逐行写入领域存储
// 行状态机:
//   Pending → Skipped              （行号在排除集合中）
//   Pending → 校验 → Failed         （存在校验错误）
//   Pending → 写入 → Created | Updated | Failed
// 约束:
// - 单行失败（含写入方 panic）只记录该行，不中断批次
// - 不开启跨行事务，部分成功是预期结果
// - 结果按 row_number 升序汇总，与执行并发度无关
// ==========================================

use crate::domain::{
    CanonicalField, CanonicalRecord, CellValue, ColumnMapping, CommitOutcome, CommitResult,
    ExclusionSet, Row, RowEdits, RowOutcome, StagedFile,
};
use crate::importer::import_trait::RecordApplier;
use crate::importer::override_layer::OverrideLayer;
use crate::importer::result_reporter::ResultReporter;
use crate::importer::row_validator::RowValidator;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// FailureReason - 行级失败原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 复核校验未通过（错误按规则顺序）
    Validation(Vec<String>),
    /// 领域写入返回错误
    Apply(String),
    /// 领域写入 panic
    Panicked(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Validation(errors) => f.write_str(&errors.join("; ")),
            FailureReason::Apply(message) => f.write_str(message),
            FailureReason::Panicked(message) => write!(f, "apply panicked: {}", message),
        }
    }
}

/// 提交报告: 汇总结果 + 完整行级结果（供无上限失败日志使用）
#[derive(Debug, Clone)]
pub struct CommitReport {
    pub result: CommitResult,
    pub outcomes: Vec<RowOutcome>,
}

/// 按映射提取标准记录（未映射字段不出现）
pub fn resolve_record(row: &Row, mapping: &ColumnMapping, fields: &[CanonicalField]) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(row.row_number);
    for field in fields {
        if let Some(column) = mapping.get(field.key) {
            let value = row.get(column).cloned().unwrap_or(CellValue::Null);
            record.values.insert(field.key.to_string(), value);
        }
    }
    record
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ==========================================
// CommitEngine
// ==========================================
pub struct CommitEngine {
    error_sample_cap: usize,
    concurrency: usize,
}

impl CommitEngine {
    /// 创建提交引擎
    ///
    /// # 参数
    /// - error_sample_cap: 失败样本上限
    /// - concurrency: 同时进行的写入数（0 按 1 处理）
    pub fn new(error_sample_cap: usize, concurrency: usize) -> Self {
        Self {
            error_sample_cap,
            concurrency: concurrency.max(1),
        }
    }

    /// 提交暂存文件
    ///
    /// 对每个非排除、复核通过的行调用一次 applier；任何单行失败都被记录后继续
    #[instrument(skip_all, fields(file_id = %file.file_id, job_id = tracing::field::Empty))]
    pub async fn commit(
        &self,
        file: &StagedFile,
        mapping: &ColumnMapping,
        edits: &RowEdits,
        excluded: &ExclusionSet,
        applier: &dyn RecordApplier,
    ) -> CommitReport {
        let start_time = Instant::now();
        let job_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("job_id", job_id.as_str());

        let fields = file.import_kind.fields();
        info!(
            total_rows = file.total_row_count,
            excluded = excluded.len(),
            edited_rows = edits.iter().count(),
            concurrency = self.concurrency,
            "开始提交"
        );

        let outcomes: Vec<RowOutcome> = stream::iter(file.rows())
            .map(|row| async move {
                let outcome = match Self::evaluate_row(row, mapping, edits, excluded, fields, applier).await {
                    Ok(outcome) => outcome,
                    Err(reason) => {
                        warn!(row_number = row.row_number, reason = %reason, "行提交失败");
                        CommitOutcome::Failed(reason.to_string())
                    }
                };
                RowOutcome {
                    row_number: row.row_number,
                    outcome,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let result = ResultReporter::summarize(&job_id, outcomes.clone(), self.error_sample_cap);

        info!(
            success = result.success_rows,
            failed = result.error_rows,
            skipped = result.skipped_rows,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "提交完成"
        );

        CommitReport { result, outcomes }
    }

    /// 单行处理
    async fn evaluate_row(
        row: &Row,
        mapping: &ColumnMapping,
        edits: &RowEdits,
        excluded: &ExclusionSet,
        fields: &[CanonicalField],
        applier: &dyn RecordApplier,
    ) -> Result<CommitOutcome, FailureReason> {
        let effective = OverrideLayer::apply(row, edits, excluded);
        if effective.excluded {
            debug!(row_number = row.row_number, "行已排除");
            return Ok(CommitOutcome::Skipped);
        }

        let errors = RowValidator::validate(&effective.row, mapping, fields);
        if !errors.is_empty() {
            return Err(FailureReason::Validation(errors));
        }

        let record = resolve_record(&effective.row, mapping, fields);
        match AssertUnwindSafe(applier.apply(&record)).catch_unwind().await {
            Ok(Ok(outcome)) => Ok(outcome.into()),
            Ok(Err(e)) => Err(FailureReason::Apply(e.to_string())),
            Err(payload) => Err(FailureReason::Panicked(panic_message(payload))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApplyOutcome, ImportKind, TabularData};
    use crate::importer::error::{ImportError, ImportResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// 记录调用行号；指定行号返回错误或 panic
    struct ScriptedApplier {
        fail_rows: Vec<usize>,
        panic_rows: Vec<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedApplier {
        fn new() -> Self {
            Self {
                fail_rows: Vec::new(),
                panic_rows: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RecordApplier for ScriptedApplier {
        async fn apply(&self, record: &CanonicalRecord) -> ImportResult<ApplyOutcome> {
            self.calls.lock().unwrap().push(record.row_number);
            if self.panic_rows.contains(&record.row_number) {
                panic!("store exploded");
            }
            if self.fail_rows.contains(&record.row_number) {
                return Err(ImportError::ApplyFailed("downstream timeout".to_string()));
            }
            if record.row_number % 2 == 0 {
                Ok(ApplyOutcome::Updated)
            } else {
                Ok(ApplyOutcome::Created)
            }
        }
    }

    fn staged(names: &[&str]) -> StagedFile {
        let rows = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                Row::from_pairs(
                    idx + 1,
                    [("Name", CellValue::text(*name)), ("Qty", CellValue::Number(1.0))],
                )
            })
            .collect();
        let now = Utc::now();
        StagedFile::new(
            "file-1".to_string(),
            "stock.csv".to_string(),
            ImportKind::Inventory,
            TabularData {
                columns: vec!["Name".to_string(), "Qty".to_string()],
                rows,
            },
            now,
            now,
        )
    }

    fn mapping() -> ColumnMapping {
        [("productName", "Name"), ("quantity", "Qty")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_validation_failure_does_not_call_applier() {
        let file = staged(&["A", "", "C"]);
        let applier = ScriptedApplier::new();
        let engine = CommitEngine::new(20, 1);

        let report = engine
            .commit(&file, &mapping(), &RowEdits::new(), &ExclusionSet::new(), &applier)
            .await;

        assert_eq!(report.result.success_rows, 2);
        assert_eq!(report.result.error_rows, 1);
        assert_eq!(report.result.error_sample[0].reason, "productName is required");
        assert_eq!(*applier.calls.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_apply_error_and_panic_isolated() {
        let file = staged(&["A", "B", "C", "D"]);
        let mut applier = ScriptedApplier::new();
        applier.fail_rows = vec![2];
        applier.panic_rows = vec![3];
        let engine = CommitEngine::new(20, 1);

        let report = engine
            .commit(&file, &mapping(), &RowEdits::new(), &ExclusionSet::new(), &applier)
            .await;

        assert_eq!(report.result.success_rows, 2);
        assert_eq!(report.result.error_rows, 2);
        assert_eq!(report.result.error_sample[0].row_number, 2);
        assert!(report.result.error_sample[0].reason.contains("downstream timeout"));
        assert_eq!(report.result.error_sample[1].reason, "apply panicked: store exploded");
        // 第 4 行仍被尝试
        assert_eq!(*applier.calls.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_excluded_invalid_row_is_skipped() {
        let file = staged(&["A", ""]);
        let applier = ScriptedApplier::new();
        let excluded: ExclusionSet = [2].into_iter().collect();

        let report = CommitEngine::new(20, 1)
            .commit(&file, &mapping(), &RowEdits::new(), &excluded, &applier)
            .await;

        assert_eq!(report.result.skipped_rows, 1);
        assert_eq!(report.result.error_rows, 0);
        assert_eq!(report.outcomes[1].outcome, CommitOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_concurrent_commit_keeps_row_order() {
        let names: Vec<String> = (1..=50).map(|n| if n % 7 == 0 { String::new() } else { format!("item-{}", n) }).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let file = staged(&refs);
        let applier = ScriptedApplier::new();

        let sequential = CommitEngine::new(20, 1)
            .commit(&file, &mapping(), &RowEdits::new(), &ExclusionSet::new(), &applier)
            .await;
        let concurrent = CommitEngine::new(20, 8)
            .commit(&file, &mapping(), &RowEdits::new(), &ExclusionSet::new(), &applier)
            .await;

        assert_eq!(sequential.result.error_sample, concurrent.result.error_sample);
        assert_eq!(sequential.result.error_rows, 7);
        let rows: Vec<usize> = concurrent.outcomes.iter().map(|o| o.row_number).collect();
        assert_eq!(rows, (1..=50).collect::<Vec<_>>());
    }

    #[test]
    fn test_resolve_record_uses_mapping() {
        let row = Row::from_pairs(
            4,
            [("Name", CellValue::text("Tips")), ("Qty", CellValue::text("3"))],
        );
        let mut m = mapping();
        m.set("vendor", "Supplier");
        let record = resolve_record(&row, &m, ImportKind::Inventory.fields());

        assert_eq!(record.row_number, 4);
        assert_eq!(record.text("productName"), Some("Tips".to_string()));
        assert_eq!(record.number("quantity"), Some(3.0));
        assert_eq!(record.get("vendor"), Some(&CellValue::Null));
        assert!(record.get("location").is_none());
    }
}
