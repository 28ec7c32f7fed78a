// ==========================================
// 实验室采购运营系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把导入层/仓储层错误转换为调用方可理解的错误
// 约束: 只有解析阶段错误与边界校验错误会作为整体失败返回；
//       行级问题一律体现在 CommitResult 中
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::StagedFileNotFound(file_id) => {
                ApiError::NotFound(format!("暂存文件(file_id={})不存在或已过期", file_id))
            }
            ImportError::Repository(repo_err) => repo_err.into(),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::ApplyFailed(msg) => ApiError::ValidationError(msg),
            decode_err => ApiError::ImportError(decode_err.to_string()),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_conversion() {
        let err: ApiError = ImportError::StagedFileNotFound("abc".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = ImportError::UnsupportedFormat("a.pdf".to_string()).into();
        match err {
            ApiError::ImportError(msg) => assert!(msg.contains("a.pdf")),
            other => panic!("unexpected: {:?}", other),
        }

        let err: ApiError = ImportError::Repository(RepositoryError::LockError("poisoned".into())).into();
        assert!(matches!(err, ApiError::DatabaseConnectionError(_)));

        let err: ApiError = ImportError::ApplyFailed("quantity is required".into()).into();
        assert!(matches!(err, ApiError::ValidationError(ref msg) if msg == "quantity is required"));

        let err: ApiError = ImportError::InternalError("锁获取失败".into()).into();
        assert!(matches!(err, ApiError::InternalError(_)));
    }
}
