// ==========================================
// 实验室采购运营系统 - 暂存文件与用户覆写
// ==========================================
// 职责: StagedFile / ColumnMapping / RowEdits / ExclusionSet
// 约束: StagedFile 创建后只读；映射/编辑/排除每次请求显式传入
// ==========================================

use crate::domain::cell::{CellValue, Row};
use crate::domain::field::ImportKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// TabularData - 解析器输出
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

// ==========================================
// StagedFile - 暂存文件
// ==========================================
// 生命周期: 解析成功创建 → 提交完成或过期销毁
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub file_id: String,
    pub filename: String,
    pub import_kind: ImportKind,
    pub columns: Vec<String>,
    pub total_row_count: usize,
    #[serde(skip)]
    rows: Vec<Row>,
    pub staged_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StagedFile {
    pub fn new(
        file_id: String,
        filename: String,
        import_kind: ImportKind,
        data: TabularData,
        staged_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_id,
            filename,
            import_kind,
            columns: data.columns,
            total_row_count: data.rows.len(),
            rows: data.rows,
            staged_at,
            expires_at,
        }
    }

    /// 全部行（按 row_number 升序）
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// 预览样本（前 n 行）
    pub fn sample_rows(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn contains_row(&self, row_number: usize) -> bool {
        (1..=self.total_row_count).contains(&row_number)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 暂存结果摘要（返回给调用方）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFileSummary {
    pub file_id: String,
    pub filename: String,
    pub import_kind: ImportKind,
    pub columns: Vec<String>,
    pub total_rows: usize,
    pub expires_at: DateTime<Utc>,
}

impl From<&StagedFile> for StagedFileSummary {
    fn from(file: &StagedFile) -> Self {
        Self {
            file_id: file.file_id.clone(),
            filename: file.filename.clone(),
            import_kind: file.import_kind,
            columns: file.columns.clone(),
            total_rows: file.total_row_count,
            expires_at: file.expires_at,
        }
    }
}

// ==========================================
// ColumnMapping - 字段 → 源列
// ==========================================
// 空字符串视为未映射
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<String, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_key: &str) -> Option<&str> {
        self.0
            .get(field_key)
            .map(|c| c.as_str())
            .filter(|c| !c.trim().is_empty())
    }

    /// 写入映射条目；空列名保留为“取消映射”标记，overlay 时覆盖建议值
    pub fn set(&mut self, field_key: impl Into<String>, column: impl Into<String>) {
        self.0.insert(field_key.into(), column.into());
    }

    pub fn unset(&mut self, field_key: &str) {
        self.0.remove(field_key);
    }

    /// 已映射条目（字段 key, 列名）
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, c)| !c.trim().is_empty())
            .map(|(k, c)| (k.as_str(), c.as_str()))
    }

    /// 所有原始条目（含空值），用于边界校验
    pub fn raw_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }

    /// 以 overrides 的条目覆盖当前映射（空值表示取消映射）
    pub fn overlay(&self, overrides: &ColumnMapping) -> ColumnMapping {
        let mut merged = self.clone();
        for (key, column) in overrides.raw_entries() {
            merged.set(key, column);
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = ColumnMapping::new();
        for (k, v) in iter {
            mapping.set(k, v);
        }
        mapping
    }
}

// ==========================================
// RowEdits - 单元格级覆写
// ==========================================
// row_number → (列名 → 新值)，同一单元格多次编辑后写覆盖
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowEdits(BTreeMap<usize, BTreeMap<String, CellValue>>);

impl RowEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(&mut self, row_number: usize, column: impl Into<String>, value: CellValue) {
        self.0
            .entry(row_number)
            .or_default()
            .insert(column.into(), value);
    }

    pub fn for_row(&self, row_number: usize) -> Option<&BTreeMap<String, CellValue>> {
        self.0.get(&row_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeMap<String, CellValue>)> {
        self.0.iter().map(|(n, cells)| (*n, cells))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ==========================================
// ExclusionSet - 提交时跳过的行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<usize>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(&mut self, row_number: usize) {
        self.0.insert(row_number);
    }

    pub fn contains(&self, row_number: usize) -> bool {
        self.0.contains(&row_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<usize> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
