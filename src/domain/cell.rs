// ==========================================
// 实验室采购运营系统 - 单元格值与行
// ==========================================
// 职责: 表格单元格的强类型表示（文本/数值/空）
// 说明: 解析器产出 CellValue，校验器负责按字段类型转换
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CellValue - 单元格原始值
// ==========================================
// 序列化为无标签 JSON: "abc" / 12.5 / null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl CellValue {
    /// 构造文本值
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// 是否为空（Null 或仅含空白的文本）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// 去除首尾空白后的文本表示（空值返回 None）
    pub fn as_trimmed_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(n) => Some(format_number(*n)),
        }
    }

    /// 数值转换
    ///
    /// # 规则
    /// - Number: 原值（非有限数视为失败）
    /// - Text: 去空白、去千分位逗号后按 f64 解析
    /// - Null / 空文本: None
    ///
    /// # 返回
    /// - Ok(None): 空值
    /// - Ok(Some(v)): 解析成功
    /// - Err(NotANumber): 非空但无法解析
    pub fn parse_number(&self) -> Result<Option<f64>, NotANumber> {
        match self {
            CellValue::Null => Ok(None),
            CellValue::Number(n) if n.is_finite() => Ok(Some(*n)),
            CellValue::Number(_) => Err(NotANumber),
            CellValue::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| *c != ',' && !c.is_whitespace())
                    .collect();
                if cleaned.is_empty() {
                    return Ok(None);
                }
                match cleaned.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(Some(v)),
                    _ => Err(NotANumber),
                }
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// 非空单元格无法解析为数值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotANumber;

/// 整数值不带小数部分输出（2.0 → "2"）
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ==========================================
// Cell / Row - 行记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub column: String,
    pub value: CellValue,
}

/// 一行原始数据：保持列顺序，row_number 从 1 开始且不复用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub row_number: usize,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: Vec::new(),
        }
    }

    /// 追加单元格（同名列保留首次出现的位置，后写覆盖）
    pub fn set(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        match self.cells.iter_mut().find(|c| c.column == column) {
            Some(cell) => cell.value = value,
            None => self.cells.push(Cell { column, value }),
        }
    }

    /// 按列名取值
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .map(|c| &c.value)
    }

    /// 整行是否全部为空
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.value.is_blank())
    }

    /// 便于测试构造: Row::from_pairs(1, [("名称", "x".into())])
    pub fn from_pairs<I, K>(row_number: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, CellValue)>,
        K: Into<String>,
    {
        let mut row = Row::new(row_number);
        for (k, v) in pairs {
            row.set(k, v);
        }
        row
    }
}
