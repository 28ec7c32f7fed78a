// ==========================================
// 实验室采购运营系统 - 行校验器
// ==========================================
// 职责: 按映射对单行执行固定规则，输出有序错误列表
// 规则顺序:
//   1. 必填字段必须已映射（未映射则该字段不再做后续检查）
//   2. 必填字段取值去空白后非空
//   3. 数值字段非空时须为非负数（去千分位与空白）
//   4. 日期字段非空时须为合法日期
// 约束: 纯函数，同样输入两次校验结果一致
// ==========================================

use crate::domain::{CanonicalField, CellValue, ColumnMapping, FieldKind, Row};
use chrono::NaiveDate;

static NULL_CELL: CellValue = CellValue::Null;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// 解析日期（YYYY-MM-DD / YYYY/MM/DD / YYYYMMDD，允许带时间后缀）
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

pub struct RowValidator;

impl RowValidator {
    /// 校验单行
    ///
    /// # 返回
    /// - 空 Vec: 校验通过
    /// - 非空: 人类可读的错误信息（按规则顺序、字段声明顺序）
    pub fn validate(row: &Row, mapping: &ColumnMapping, fields: &[CanonicalField]) -> Vec<String> {
        let mut errors = Vec::new();

        // 已映射字段及其取值
        let mut resolved: Vec<(&CanonicalField, &CellValue)> = Vec::with_capacity(fields.len());

        // 规则 1: 必填字段映射
        for field in fields {
            match mapping.get(field.key) {
                Some(column) => {
                    resolved.push((field, row.get(column).unwrap_or(&NULL_CELL)));
                }
                None if field.required => {
                    errors.push(format!("{} column is not mapped", field.key));
                }
                None => {}
            }
        }

        // 规则 2: 必填字段非空
        let mut missing: Vec<&str> = Vec::new();
        for (field, value) in &resolved {
            if field.required && value.is_blank() {
                errors.push(format!("{} is required", field.key));
                missing.push(field.key);
            }
        }

        // 规则 3/4: 类型检查（空值不检查）
        for (field, value) in &resolved {
            if value.is_blank() || missing.contains(&field.key) {
                continue;
            }
            match field.kind {
                FieldKind::Number => {
                    let valid = matches!(value.parse_number(), Ok(Some(n)) if n >= 0.0);
                    if !valid {
                        errors.push(format!("{} must be a non-negative number", field.key));
                    }
                }
                FieldKind::Date => {
                    let valid = value
                        .as_trimmed_text()
                        .and_then(|text| parse_date(&text))
                        .is_some();
                    if !valid {
                        errors.push(format!("{} must be a valid date (YYYY-MM-DD)", field.key));
                    }
                }
                FieldKind::Text => {}
            }
        }

        errors
    }
}
