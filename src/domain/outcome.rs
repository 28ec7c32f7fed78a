// ==========================================
// 实验室采购运营系统 - 提交结果
// ==========================================
// 职责: 标准记录 / 行级结果 / 提交汇总
// 不变量: success_rows + error_rows + skipped_rows == total_rows
// ==========================================

use crate::domain::cell::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// CanonicalRecord - 映射+覆写后的标准记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub row_number: usize,
    pub values: BTreeMap<String, CellValue>,
}

impl CanonicalRecord {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.values.get(key)
    }

    /// 文本值（去空白，空值为 None）
    pub fn text(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(|v| v.as_trimmed_text())
    }

    /// 数值（校验已通过的前提下，无法解析按 None 处理）
    pub fn number(&self, key: &str) -> Option<f64> {
        self.values
            .get(key)
            .and_then(|v| v.parse_number().ok().flatten())
    }
}

// ==========================================
// ApplyOutcome - 领域写入结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyOutcome {
    Created,
    Updated,
}

// ==========================================
// CommitOutcome - 行级终态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason")]
pub enum CommitOutcome {
    Created,
    Updated,
    Skipped,
    Failed(String),
}

impl From<ApplyOutcome> for CommitOutcome {
    fn from(outcome: ApplyOutcome) -> Self {
        match outcome {
            ApplyOutcome::Created => CommitOutcome::Created,
            ApplyOutcome::Updated => CommitOutcome::Updated,
        }
    }
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommitOutcome::Created | CommitOutcome::Updated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    pub row_number: usize,
    pub outcome: CommitOutcome,
}

/// 单行校验错误（派生数据，随映射/覆写即时重算）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValidationError {
    pub row_number: usize,
    pub errors: Vec<String>,
}

// ==========================================
// CommitResult - 提交汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row_number: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub job_id: String,
    pub total_rows: usize,
    pub success_rows: usize,
    pub error_rows: usize,
    pub skipped_rows: usize,
    /// 前 N 条失败（按 row_number 升序，N 为配置上限）
    pub error_sample: Vec<RowFailure>,
    pub summary_counts: SummaryCounts,
}
