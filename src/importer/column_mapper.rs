// ==========================================
// 实验室采购运营系统 - 列映射器
// ==========================================
// 职责: 标准字段 → 源列的启发式建议
// 规则: 规范化（小写、去 _ - 空白）后按规则表顺序匹配，首个命中即采用
// 约束: 纯函数；同样输入必得同样输出；允许多个字段复用同一列
// ==========================================

use crate::domain::{CanonicalField, ColumnMapping};
use tracing::debug;

/// 规范化: 小写 + 去除 `_`、`-` 与空白
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// ==========================================
// MatchRule - 单条匹配规则
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// 规范化后完全相等
    Exact,
    /// 规范化后任一方向包含
    Contains,
}

impl MatchRule {
    pub fn matches(&self, candidate: &str, column: &str) -> bool {
        if candidate.is_empty() || column.is_empty() {
            return false;
        }
        match self {
            MatchRule::Exact => candidate == column,
            MatchRule::Contains => column.contains(candidate) || candidate.contains(column),
        }
    }
}

// ==========================================
// ColumnMapper - 列映射建议
// ==========================================
pub struct ColumnMapper {
    rules: Vec<MatchRule>,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new(vec![MatchRule::Exact, MatchRule::Contains])
    }
}

impl ColumnMapper {
    /// 按给定规则顺序创建映射器（靠前的规则优先）
    pub fn new(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    /// 计算建议映射
    ///
    /// # 顺序
    /// 字段按声明顺序处理；对每个字段依次尝试规则 → 源列（文件顺序）→ key/label，
    /// 首个命中即为该字段的映射，无命中则保持未映射
    pub fn suggest(&self, columns: &[String], fields: &[CanonicalField]) -> ColumnMapping {
        let normalized_columns: Vec<String> = columns.iter().map(|c| normalize(c)).collect();
        let mut mapping = ColumnMapping::new();

        for field in fields {
            let candidates = [normalize(field.key), normalize(field.label)];
            if let Some(column) = self.first_match(&candidates, columns, &normalized_columns) {
                mapping.set(field.key, column.clone());
            }
        }

        debug!(
            fields = fields.len(),
            mapped = mapping.len(),
            "列映射建议完成"
        );
        mapping
    }

    fn first_match<'a>(
        &self,
        candidates: &[String],
        columns: &'a [String],
        normalized_columns: &[String],
    ) -> Option<&'a String> {
        for rule in &self.rules {
            for (column, normalized) in columns.iter().zip(normalized_columns) {
                if candidates.iter().any(|c| rule.matches(c, normalized)) {
                    return Some(column);
                }
            }
        }
        None
    }
}
