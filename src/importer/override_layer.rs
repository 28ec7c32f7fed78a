// ==========================================
// 实验室采购运营系统 - 覆写层
// ==========================================
// 职责: 将用户单元格编辑叠加到原始暂存行（编辑优先）
// 约束: 不做校验；排除行照常返回数据，仅打标记
// ==========================================

use crate::domain::{ExclusionSet, Row, RowEdits};

/// 叠加后的行
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveRow {
    pub row: Row,
    pub excluded: bool,
}

pub struct OverrideLayer;

impl OverrideLayer {
    /// 计算单行的有效值
    ///
    /// # 规则
    /// - 编辑逐单元格覆盖原值；原行没有的列追加在末尾
    /// - row_number 在排除集合中 → excluded = true（数据不变）
    pub fn apply(row: &Row, edits: &RowEdits, excluded: &ExclusionSet) -> EffectiveRow {
        let mut effective = row.clone();
        if let Some(cells) = edits.for_row(row.row_number) {
            for (column, value) in cells {
                effective.set(column.clone(), value.clone());
            }
        }

        EffectiveRow {
            row: effective,
            excluded: excluded.contains(row.row_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellValue;

    fn staged_row() -> Row {
        Row::from_pairs(
            2,
            [
                ("Name", CellValue::Null),
                ("Qty", CellValue::Number(4.0)),
            ],
        )
    }

    #[test]
    fn test_edits_win_and_keep_column_order() {
        let mut edits = RowEdits::new();
        edits.edit(2, "Name", CellValue::text("Nitrile Gloves"));
        edits.edit(2, "Notes", CellValue::text("added"));

        let effective = OverrideLayer::apply(&staged_row(), &edits, &ExclusionSet::new());

        assert!(!effective.excluded);
        assert_eq!(effective.row.get("Name"), Some(&CellValue::text("Nitrile Gloves")));
        assert_eq!(effective.row.get("Qty"), Some(&CellValue::Number(4.0)));
        let columns: Vec<&str> = effective.row.cells.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, vec!["Name", "Qty", "Notes"]);
    }

    #[test]
    fn test_edits_for_other_rows_ignored() {
        let mut edits = RowEdits::new();
        edits.edit(3, "Name", CellValue::text("other"));

        let effective = OverrideLayer::apply(&staged_row(), &edits, &ExclusionSet::new());
        assert_eq!(effective.row, staged_row());
    }

    #[test]
    fn test_excluded_row_keeps_data() {
        let excluded: ExclusionSet = [2].into_iter().collect();
        let mut edits = RowEdits::new();
        edits.edit(2, "Qty", CellValue::Number(9.0));

        let effective = OverrideLayer::apply(&staged_row(), &edits, &excluded);

        assert!(effective.excluded);
        assert_eq!(effective.row.get("Qty"), Some(&CellValue::Number(9.0)));
    }

    #[test]
    fn test_staged_row_untouched() {
        let row = staged_row();
        let mut edits = RowEdits::new();
        edits.edit(2, "Name", CellValue::text("x"));
        let _ = OverrideLayer::apply(&row, &edits, &ExclusionSet::new());
        assert_eq!(row.get("Name"), Some(&CellValue::Null));
    }
}
