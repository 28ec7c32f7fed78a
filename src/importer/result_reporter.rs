// ==========================================
// 实验室采购运营系统 - 结果汇总
// ==========================================
// 职责: 行级结果 → CommitResult（计数 + 有界失败样本）
// 约束: error_rows 为真实数量；error_sample 至多 cap 条，按行号升序
// ==========================================

use crate::domain::{CommitOutcome, CommitResult, RowFailure, RowOutcome, SummaryCounts};

pub struct ResultReporter;

impl ResultReporter {
    /// 汇总提交结果
    ///
    /// # 参数
    /// - job_id: 提交任务 ID
    /// - outcomes: 每行终态（顺序不限，内部按 row_number 排序）
    /// - sample_cap: 失败样本上限
    pub fn summarize(job_id: &str, mut outcomes: Vec<RowOutcome>, sample_cap: usize) -> CommitResult {
        outcomes.sort_by_key(|o| o.row_number);

        let mut counts = SummaryCounts::default();
        let mut error_sample = Vec::new();

        for RowOutcome { row_number, outcome } in outcomes {
            match outcome {
                CommitOutcome::Created => counts.created += 1,
                CommitOutcome::Updated => counts.updated += 1,
                CommitOutcome::Skipped => counts.skipped += 1,
                CommitOutcome::Failed(reason) => {
                    counts.failed += 1;
                    if error_sample.len() < sample_cap {
                        error_sample.push(RowFailure { row_number, reason });
                    }
                }
            }
        }

        CommitResult {
            job_id: job_id.to_string(),
            total_rows: counts.created + counts.updated + counts.skipped + counts.failed,
            success_rows: counts.created + counts.updated,
            error_rows: counts.failed,
            skipped_rows: counts.skipped,
            error_sample,
            summary_counts: counts,
        }
    }
}
