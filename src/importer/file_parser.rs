// ==========================================
// 实验室采购运营系统 - 文件解析器实现
// ==========================================
// 阶段 0: 上传字节 → 表头 + 行
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::domain::{CellValue, Row, TabularData};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::TabularDecoder;
use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 取文件扩展名（小写）
fn extension_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 空表头补默认列名
fn header_name(raw: &str, idx: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Column {}", idx + 1)
    } else {
        trimmed.to_string()
    }
}

/// 生成表头列名：空表头补默认名，重名追加序号 `Qty (2)`，保证列名唯一
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();
    for (idx, h) in raw.enumerate() {
        let base = header_name(h, idx);
        let mut name = base.clone();
        let mut n = 2;
        while seen.contains(&name) {
            name = format!("{} ({})", base, n);
            n += 1;
        }
        seen.insert(name.clone());
        headers.push(name);
    }
    headers
}

fn text_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        CellValue::Null
    } else {
        CellValue::text(trimmed)
    }
}

/// 按表头组装行；完全空白的行跳过，行号按保留顺序从 1 开始
fn push_row(rows: &mut Vec<Row>, headers: &[String], cells: impl Iterator<Item = CellValue>) {
    let mut row = Row::new(rows.len() + 1);
    for (header, value) in headers.iter().zip(cells) {
        row.set(header.clone(), value);
    }
    // 短行补空值，保证每列都有单元格
    for header in headers {
        if row.get(header).is_none() {
            row.set(header.clone(), CellValue::Null);
        }
    }
    if !row.is_blank() {
        rows.push(row);
    }
}

// ==========================================
// CSV Decoder 实现
// ==========================================
pub struct CsvDecoder;

impl TabularDecoder for CsvDecoder {
    fn decode(&self, bytes: &[u8], filename: &str) -> ImportResult<TabularData> {
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(content);

        // 读取表头
        let headers = unique_headers(reader.headers()?.iter());

        if headers.is_empty() {
            return Err(ImportError::MissingHeader(filename.to_string()));
        }

        // 读取所有行
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            push_row(&mut rows, &headers, record.iter().map(text_cell));
        }

        debug!(filename = %filename, columns = headers.len(), rows = rows.len(), "CSV 解析完成");

        Ok(TabularData {
            columns: headers,
            rows,
        })
    }
}

// ==========================================
// Excel Decoder 实现
// ==========================================
pub struct ExcelDecoder;

impl ExcelDecoder {
    fn cell_value(cell: &Data) -> CellValue {
        match cell {
            Data::Empty => CellValue::Null,
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => text_cell(s),
            Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
                Some(date) => CellValue::text(date.format("%Y-%m-%d").to_string()),
                None => text_cell(&cell.to_string()),
            },
            other => text_cell(&other.to_string()),
        }
    }

    /// 读取第一个工作表
    fn read_first_sheet<RS, R>(workbook: &mut R, filename: &str) -> ImportResult<TabularData>
    where
        RS: Read + Seek,
        R: Reader<RS>,
        R::Error: Into<calamine::Error>,
    {
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError(format!("{}: Excel 文件无工作表", filename)))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::from(e.into()))?;

        let data = Self::decode_range(&range, filename)?;
        debug!(filename = %filename, sheet = %sheet_name, rows = data.rows.len(), "Excel 解析完成");
        Ok(data)
    }

    /// 工作表区域 → 表头 + 行（第一行为表头）
    fn decode_range(range: &Range<Data>, filename: &str) -> ImportResult<TabularData> {
        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| ImportError::MissingHeader(filename.to_string()))?;

        let header_text: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();
        let headers = unique_headers(header_text.iter().map(String::as_str));

        let mut rows = Vec::new();
        for data_row in sheet_rows {
            push_row(&mut rows, &headers, data_row.iter().map(Self::cell_value));
        }

        Ok(TabularData {
            columns: headers,
            rows,
        })
    }
}

impl TabularDecoder for ExcelDecoder {
    fn decode(&self, bytes: &[u8], filename: &str) -> ImportResult<TabularData> {
        let cursor = Cursor::new(bytes.to_vec());
        match extension_of(filename).as_str() {
            "xls" => {
                let mut workbook: Xls<_> = Xls::new(cursor)
                    .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
                Self::read_first_sheet(&mut workbook, filename)
            }
            _ => {
                let mut workbook: Xlsx<_> = Xlsx::new(cursor)
                    .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
                Self::read_first_sheet(&mut workbook, filename)
            }
        }
    }
}

// ==========================================
// 通用解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalDecoder {
    max_bytes: usize,
}

impl UniversalDecoder {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl TabularDecoder for UniversalDecoder {
    fn decode(&self, bytes: &[u8], filename: &str) -> ImportResult<TabularData> {
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile(filename.to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ImportError::FileTooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let ext = extension_of(filename);
        match ext.as_str() {
            "csv" => CsvDecoder.decode(bytes, filename),
            "xlsx" | "xls" => ExcelDecoder.decode(bytes, filename),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
