// ==========================================
// 实验室采购运营系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 只有解析阶段错误会使整个操作失败；
//       校验/写入错误在提交阶段降级为行级 Failed
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("上传文件为空: {0}")]
    EmptyFile(String),

    #[error("文件过大: {size} 字节（上限 {limit} 字节）")]
    FileTooLarge { size: usize, limit: usize },

    #[error("缺少表头行: {0}")]
    MissingHeader(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 暂存相关错误 =====
    #[error("暂存文件不存在或已过期: {0}")]
    StagedFileNotFound(String),

    // ===== 领域写入错误 =====
    // 原样作为行级失败原因
    #[error("{0}")]
    ApplyFailed(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ImportError {
    /// 是否属于文件解析阶段错误
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ImportError::UnsupportedFormat(_)
                | ImportError::EmptyFile(_)
                | ImportError::FileTooLarge { .. }
                | ImportError::MissingHeader(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
        )
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
