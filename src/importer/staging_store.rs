// ==========================================
// 实验室采购运营系统 - 暂存仓库
// ==========================================
// 职责: 以 file_id 保存解析结果，供预览/提交读取
// 约束: 写入仅发生在 stage/remove；StagedFile 本身只读（Arc 共享）
// ==========================================

use crate::domain::{ImportKind, StagedFile, TabularData};
use crate::importer::error::{ImportError, ImportResult};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// 暂存有效期上限（30 天）
const MAX_TTL_SECS: u64 = 30 * 24 * 3600;

pub struct StagingStore {
    files: RwLock<HashMap<String, Arc<StagedFile>>>,
    ttl: Duration,
}

impl StagingStore {
    /// 创建暂存仓库
    ///
    /// # 参数
    /// - ttl_secs: 暂存文件有效期（秒）
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
        }
    }

    /// 暂存解析结果，返回新分配 file_id 的 StagedFile
    pub fn stage(
        &self,
        filename: &str,
        import_kind: ImportKind,
        data: TabularData,
    ) -> ImportResult<Arc<StagedFile>> {
        let now = Utc::now();
        let file = Arc::new(StagedFile::new(
            Uuid::new_v4().to_string(),
            filename.to_string(),
            import_kind,
            data,
            now,
            now + self.ttl,
        ));

        let mut files = self
            .files
            .write()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        files.insert(file.file_id.clone(), Arc::clone(&file));

        info!(
            file_id = %file.file_id,
            filename = %filename,
            kind = %import_kind,
            rows = file.total_row_count,
            "文件已暂存"
        );
        Ok(file)
    }

    /// 读取暂存文件（已过期的视为不存在并清除）
    pub fn get(&self, file_id: &str) -> ImportResult<Arc<StagedFile>> {
        let found = {
            let files = self
                .files
                .read()
                .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
            files.get(file_id).cloned()
        };

        match found {
            Some(file) if !file.is_expired(Utc::now()) => Ok(file),
            Some(_) => {
                debug!(file_id = %file_id, "暂存文件已过期");
                self.remove(file_id)?;
                Err(ImportError::StagedFileNotFound(file_id.to_string()))
            }
            None => Err(ImportError::StagedFileNotFound(file_id.to_string())),
        }
    }

    /// 移除暂存文件（返回是否存在）
    pub fn remove(&self, file_id: &str) -> ImportResult<bool> {
        let mut files = self
            .files
            .write()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        Ok(files.remove(file_id).is_some())
    }

    /// 清理所有过期文件，返回清理数量
    pub fn purge_expired(&self) -> ImportResult<usize> {
        let now = Utc::now();
        let mut files = self
            .files
            .write()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        let before = files.len();
        files.retain(|_, f| !f.is_expired(now));
        let purged = before - files.len();
        if purged > 0 {
            info!(purged, "已清理过期暂存文件");
        }
        Ok(purged)
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
