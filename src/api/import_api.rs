// ==========================================
// 实验室采购运营系统 - 导入API
// ==========================================
// 职责: 封装暂存导入管道（上传暂存 / 预览 / 提交 / 模板 / 失败日志）
// 约束:
// - 映射、编辑、排除每次请求显式传入，暂存文件只读
// - 越界行号、未知列、未知字段在边界拒绝（InvalidInput），不做任何写入
// - 提交只在边界校验失败或暂存文件不存在时整体失败，其余降级为行级结果
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfig};
use crate::domain::{
    ColumnMapping, CommitResult, ExclusionSet, ImportKind, Row, RowEdits, RowFailure,
    RowValidationError, StagedFile, StagedFileSummary,
};
use crate::importer::{
    render_template, ColumnMapper, CommitEngine, InventoryApplier, PurchaseHistoryApplier,
    RecordApplier, RowValidator, StagingStore, TabularDecoder, UniversalDecoder,
};
use crate::repository::{
    ImportJobEntity, ImportJobRepository, InventoryRepository, PurchaseHistoryRepository,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, instrument, warn};

// ==========================================
// 请求 / 响应
// ==========================================

/// 预览请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub file_id: Option<String>,
    /// 覆盖建议映射中的对应字段（空值表示取消映射）
    #[serde(default)]
    pub mapping_override: Option<ColumnMapping>,
}

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub file_id: String,
    pub filename: String,
    pub import_kind: ImportKind,
    pub columns: Vec<String>,
    pub sample_rows: Vec<Row>,
    pub total_rows: usize,
    /// 启发式建议映射（不受 mapping_override 影响）
    pub suggested_mapping: ColumnMapping,
    /// 建议映射叠加 mapping_override 后的生效映射
    pub effective_mapping: ColumnMapping,
    /// 样本行校验错误（仅列出有错误的行）
    pub validation_errors_for_sample: Vec<RowValidationError>,
}

/// 提交请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub file_id: String,
    pub mapping: ColumnMapping,
    #[serde(default)]
    pub edits: RowEdits,
    #[serde(default)]
    pub excluded_row_numbers: ExclusionSet,
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    config: ImportConfig,
    staging: StagingStore,
    decoder: UniversalDecoder,
    mapper: ColumnMapper,
    inventory_repo: Arc<InventoryRepository>,
    purchase_repo: Arc<PurchaseHistoryRepository>,
    job_repo: ImportJobRepository,
}

impl ImportApi {
    /// 打开数据库（建表），从 config_kv 读取导入配置后创建 ImportApi
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub async fn open(db_path: &str) -> ApiResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = ConfigManager::from_connection(Arc::clone(&conn));
        let config = ImportConfig::load(&config_manager)
            .await
            .map_err(|e| ApiError::InternalError(format!("读取导入配置失败: {}", e)))?;

        info!(db_path = %db_path, config = ?config, "导入API已初始化");
        Ok(Self::with_connection(conn, config))
    }

    /// 使用已有连接（schema 已初始化）和给定配置创建 ImportApi
    pub fn with_connection(conn: Arc<Mutex<Connection>>, config: ImportConfig) -> Self {
        Self {
            staging: StagingStore::new(config.staging_ttl_secs),
            decoder: UniversalDecoder::new(config.max_upload_bytes),
            mapper: ColumnMapper::default(),
            inventory_repo: Arc::new(InventoryRepository::from_connection(Arc::clone(&conn))),
            purchase_repo: Arc::new(PurchaseHistoryRepository::from_connection(Arc::clone(&conn))),
            job_repo: ImportJobRepository::from_connection(conn),
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// 解析上传文件并暂存
    ///
    /// # 返回
    /// - Ok(StagedFileSummary): 新 file_id 与表头/行数
    /// - Err(ApiError::ImportError): 文件无法解析，不产生暂存文件
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn stage_upload(
        &self,
        kind: ImportKind,
        bytes: &[u8],
        filename: &str,
    ) -> ApiResult<StagedFileSummary> {
        let data = self.decoder.decode(bytes, filename).map_err(|e| {
            warn!(error = %e, "文件解析失败");
            ApiError::from(e)
        })?;
        let file = self.staging.stage(filename, kind, data)?;
        Ok(StagedFileSummary::from(file.as_ref()))
    }

    /// 预览: 样本行 + 建议映射 + 样本校验错误（只读，可重复调用）
    pub fn preview(&self, request: PreviewRequest) -> ApiResult<PreviewResponse> {
        let file_id = request
            .file_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::InvalidInput("file_id 不能为空".to_string()))?;

        let file = self.staging.get(file_id)?;
        let fields = file.import_kind.fields();

        let suggested_mapping = self.mapper.suggest(&file.columns, fields);
        let effective_mapping = match &request.mapping_override {
            Some(overrides) => {
                check_mapping(&file, overrides)?;
                suggested_mapping.overlay(overrides)
            }
            None => suggested_mapping.clone(),
        };

        let sample = file.sample_rows(self.config.preview_sample_size);
        let validation_errors_for_sample = sample
            .iter()
            .filter_map(|row| {
                let errors = RowValidator::validate(row, &effective_mapping, fields);
                (!errors.is_empty()).then(|| RowValidationError {
                    row_number: row.row_number,
                    errors,
                })
            })
            .collect();

        Ok(PreviewResponse {
            file_id: file.file_id.clone(),
            filename: file.filename.clone(),
            import_kind: file.import_kind,
            columns: file.columns.clone(),
            sample_rows: sample.to_vec(),
            total_rows: file.total_row_count,
            suggested_mapping,
            effective_mapping,
            validation_errors_for_sample,
        })
    }

    /// 提交（写入内置 SQLite 领域存储，按暂存文件的导入类型选择写入方）
    pub async fn commit(&self, request: CommitRequest) -> ApiResult<CommitResult> {
        let kind = self.staging.get(&request.file_id)?.import_kind;
        match kind {
            ImportKind::Inventory => {
                let applier = InventoryApplier::new(Arc::clone(&self.inventory_repo));
                self.commit_with(request, &applier).await
            }
            ImportKind::PurchaseHistory => {
                let applier = PurchaseHistoryApplier::new(Arc::clone(&self.purchase_repo));
                self.commit_with(request, &applier).await
            }
        }
    }

    /// 使用调用方提供的写入方提交
    ///
    /// # 前置条件
    /// - applier 必须幂等（按自然键 create-or-update），重复提交才不会产生重复数据
    #[instrument(skip(self, request, applier), fields(file_id = %request.file_id))]
    pub async fn commit_with(
        &self,
        request: CommitRequest,
        applier: &dyn RecordApplier,
    ) -> ApiResult<CommitResult> {
        let file = self.staging.get(&request.file_id)?;
        check_mapping(&file, &request.mapping)?;
        check_edits(&file, &request.edits)?;
        check_exclusions(&file, &request.excluded_row_numbers)?;

        let start_time = Instant::now();
        let engine = CommitEngine::new(self.config.error_sample_cap, self.config.commit_concurrency);
        let report = engine
            .commit(
                &file,
                &request.mapping,
                &request.edits,
                &request.excluded_row_numbers,
                applier,
            )
            .await;
        let elapsed_ms = start_time.elapsed().as_millis() as u64;

        // 行已写入，任务日志失败不影响本次结果
        let job = ImportJobEntity::from_result(
            &report.result,
            &file.file_id,
            &file.filename,
            file.import_kind,
            elapsed_ms,
            Utc::now(),
        );
        if let Err(e) = self.job_repo.insert_job(&job, &report.outcomes) {
            warn!(job_id = %job.job_id, error = %e, "导入任务日志写入失败");
        }

        if !self.config.retain_after_commit {
            self.staging.remove(&file.file_id)?;
        }

        Ok(report.result)
    }

    /// 取消导入（丢弃暂存文件）
    pub fn discard(&self, file_id: &str) -> ApiResult<()> {
        if self.staging.remove(file_id)? {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("暂存文件(file_id={})不存在", file_id)))
        }
    }

    /// 清理过期暂存文件，返回清理数量
    pub fn purge_expired(&self) -> ApiResult<usize> {
        Ok(self.staging.purge_expired()?)
    }

    /// 导入模板（CSV，仅表头）
    pub fn template(&self, kind: ImportKind) -> ApiResult<Vec<u8>> {
        Ok(render_template(kind)?)
    }

    /// 查询导入任务汇总
    pub fn job(&self, job_id: &str) -> ApiResult<ImportJobEntity> {
        self.job_repo
            .find_job(job_id)?
            .ok_or_else(|| ApiError::NotFound(format!("导入任务(job_id={})不存在", job_id)))
    }

    /// 查询导入任务的完整失败清单
    pub fn job_failures(&self, job_id: &str) -> ApiResult<Vec<RowFailure>> {
        self.job(job_id)?;
        Ok(self.job_repo.list_failures(job_id)?)
    }
}

// ==========================================
// 边界校验
// ==========================================

fn check_mapping(file: &StagedFile, mapping: &ColumnMapping) -> ApiResult<()> {
    for (field_key, column) in mapping.raw_entries() {
        if file.import_kind.field(field_key).is_none() {
            return Err(ApiError::InvalidInput(format!(
                "未知字段: {}（导入类型 {}）",
                field_key, file.import_kind
            )));
        }
        if !column.trim().is_empty() && !file.has_column(column) {
            return Err(ApiError::InvalidInput(format!(
                "字段 {} 映射到不存在的列: {}",
                field_key, column
            )));
        }
    }
    Ok(())
}

fn check_edits(file: &StagedFile, edits: &RowEdits) -> ApiResult<()> {
    for (row_number, cells) in edits.iter() {
        check_row_number(file, row_number)?;
        if let Some(column) = cells.keys().find(|c| !file.has_column(c)) {
            return Err(ApiError::InvalidInput(format!(
                "第 {} 行编辑了不存在的列: {}",
                row_number, column
            )));
        }
    }
    Ok(())
}

fn check_exclusions(file: &StagedFile, excluded: &ExclusionSet) -> ApiResult<()> {
    excluded
        .iter()
        .try_for_each(|row_number| check_row_number(file, row_number))
}

fn check_row_number(file: &StagedFile, row_number: usize) -> ApiResult<()> {
    if file.contains_row(row_number) {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "行号越界: {}（有效范围 1..={}）",
            row_number, file.total_row_count
        )))
    }
}
