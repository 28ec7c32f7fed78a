// ==========================================
// 暂存导入管道端到端测试
// ==========================================
// 模拟调用方完整流程: 上传暂存 → 预览 → 覆写/排除 → 提交 → 结果/失败日志

use async_trait::async_trait;
use lab_import_staging::api::{ApiError, CommitRequest, ImportApi, PreviewRequest};
use lab_import_staging::domain::{
    ApplyOutcome, CanonicalRecord, CellValue, ColumnMapping, CommitResult, ExclusionSet,
    ImportKind, RowEdits,
};
use lab_import_staging::importer::{ImportError, ImportResult, RecordApplier};
use lab_import_staging::repository::{InventoryRepository, PurchaseHistoryRepository};
use std::sync::Mutex;

mod test_helpers;
use test_helpers::{create_test_db, INVENTORY_CSV, PURCHASE_CSV};

/// 内存写入方: 记录调用行号，指定行号返回下游错误
struct RecordingApplier {
    fail_rows: Vec<usize>,
    calls: Mutex<Vec<usize>>,
}

impl RecordingApplier {
    fn failing_on(fail_rows: Vec<usize>) -> Self {
        Self {
            fail_rows,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordApplier for RecordingApplier {
    async fn apply(&self, record: &CanonicalRecord) -> ImportResult<ApplyOutcome> {
        self.calls.lock().unwrap().push(record.row_number);
        if self.fail_rows.contains(&record.row_number) {
            return Err(ImportError::ApplyFailed("downstream timeout".to_string()));
        }
        Ok(ApplyOutcome::Created)
    }
}

async fn open_api() -> (tempfile::NamedTempFile, String, ImportApi) {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let api = ImportApi::open(&db_path).await.expect("初始化 ImportApi 失败");
    (temp_file, db_path, api)
}

fn inventory_mapping() -> ColumnMapping {
    [
        ("productName", "Product Name"),
        ("catalogNumber", "Catalog Number"),
        ("vendor", "Vendor"),
        ("quantity", "Qty On Hand"),
        ("expirationDate", "Expiration Date"),
    ]
    .into_iter()
    .collect()
}

fn stage_inventory(api: &ImportApi) -> String {
    api.stage_upload(ImportKind::Inventory, INVENTORY_CSV.as_bytes(), "stock.csv")
        .expect("暂存失败")
        .file_id
}

fn request(file_id: &str, edits: RowEdits, excluded: ExclusionSet) -> CommitRequest {
    CommitRequest {
        file_id: file_id.to_string(),
        mapping: inventory_mapping(),
        edits,
        excluded_row_numbers: excluded,
    }
}

fn assert_counts_invariant(result: &CommitResult) {
    assert_eq!(
        result.success_rows + result.error_rows + result.skipped_rows,
        result.total_rows
    );
}

#[tokio::test]
async fn test_missing_required_value_fails_only_that_row() {
    let (_tmp, db_path, api) = open_api().await;
    let file_id = stage_inventory(&api);

    let result = api
        .commit(request(&file_id, RowEdits::new(), ExclusionSet::new()))
        .await
        .unwrap();

    assert_eq!(result.total_rows, 3);
    assert_eq!(result.success_rows, 2);
    assert_eq!(result.error_rows, 1);
    assert_eq!(result.skipped_rows, 0);
    assert_eq!(result.error_sample.len(), 1);
    assert_eq!(result.error_sample[0].row_number, 2);
    assert_eq!(result.error_sample[0].reason, "productName is required");
    assert_counts_invariant(&result);

    // 有效行已落库（含千分位数量）
    let repo = InventoryRepository::new(&db_path).unwrap();
    let gloves = repo.find_by_catalog_number("G-M").unwrap();
    assert_eq!(gloves.len(), 1);
    assert_eq!(gloves[0].quantity, 1200.0);
    assert_eq!(repo.count().unwrap(), 2);
}

#[tokio::test]
async fn test_excluded_row_is_skipped() {
    let (_tmp, _db_path, api) = open_api().await;
    let file_id = stage_inventory(&api);

    let result = api
        .commit(request(&file_id, RowEdits::new(), [2].into_iter().collect()))
        .await
        .unwrap();

    assert_eq!(result.total_rows, 3);
    assert_eq!(result.success_rows, 2);
    assert_eq!(result.error_rows, 0);
    assert_eq!(result.skipped_rows, 1);
    assert!(result.error_sample.is_empty());
    assert_counts_invariant(&result);
}

#[tokio::test]
async fn test_edit_fixes_failing_row() {
    let (_tmp, db_path, api) = open_api().await;
    let file_id = stage_inventory(&api);

    let mut edits = RowEdits::new();
    edits.edit(2, "Product Name", CellValue::text("Ethanol 200 proof"));

    let result = api
        .commit(request(&file_id, edits, ExclusionSet::new()))
        .await
        .unwrap();

    assert_eq!(result.total_rows, 3);
    assert_eq!(result.success_rows, 3);
    assert_eq!(result.error_rows, 0);
    assert_eq!(result.skipped_rows, 0);

    let repo = InventoryRepository::new(&db_path).unwrap();
    let ethanol = repo.find_by_catalog_number("E7023").unwrap();
    assert_eq!(ethanol[0].product_name, "Ethanol 200 proof");
}

#[tokio::test]
async fn test_apply_failure_does_not_stop_later_rows() {
    let (_tmp, _db_path, api) = open_api().await;
    let csv = "Product Name,Qty On Hand\nA,1\nB,2\nC,3\nD,4\n";
    let file_id = api
        .stage_upload(ImportKind::Inventory, csv.as_bytes(), "four.csv")
        .unwrap()
        .file_id;

    let applier = RecordingApplier::failing_on(vec![3]);
    let mapping: ColumnMapping = [("productName", "Product Name"), ("quantity", "Qty On Hand")]
        .into_iter()
        .collect();
    let result = api
        .commit_with(
            CommitRequest {
                file_id,
                mapping,
                edits: RowEdits::new(),
                excluded_row_numbers: ExclusionSet::new(),
            },
            &applier,
        )
        .await
        .unwrap();

    assert_eq!(result.success_rows, 3);
    assert_eq!(result.error_rows, 1);
    assert_eq!(result.error_sample[0].row_number, 3);
    assert_eq!(result.error_sample[0].reason, "downstream timeout");
    assert_eq!(applier.calls(), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_unmapped_required_field_fails_every_row() {
    let (_tmp, _db_path, api) = open_api().await;
    let file_id = stage_inventory(&api);

    let mut mapping = inventory_mapping();
    mapping.unset("quantity");
    let result = api
        .commit(CommitRequest {
            file_id,
            mapping,
            edits: RowEdits::new(),
            excluded_row_numbers: ExclusionSet::new(),
        })
        .await
        .unwrap();

    assert_eq!(result.success_rows, 0);
    assert_eq!(result.error_rows, 3);
    assert_eq!(result.error_sample[0].reason, "quantity column is not mapped");
    assert_eq!(
        result.error_sample[1].reason,
        "quantity column is not mapped; productName is required"
    );
}

#[tokio::test]
async fn test_preview_suggests_and_validates_sample() {
    let (_tmp, _db_path, api) = open_api().await;
    let file_id = stage_inventory(&api);

    let first = api
        .preview(PreviewRequest {
            file_id: Some(file_id.clone()),
            mapping_override: None,
        })
        .unwrap();
    let second = api
        .preview(PreviewRequest {
            file_id: Some(file_id.clone()),
            mapping_override: None,
        })
        .unwrap();

    // 建议映射确定性
    assert_eq!(first.suggested_mapping, second.suggested_mapping);
    assert_eq!(first.suggested_mapping.get("productName"), Some("Product Name"));
    assert_eq!(first.suggested_mapping.get("catalogNumber"), Some("Catalog Number"));
    assert_eq!(first.suggested_mapping.get("quantity"), None);
    assert_eq!(first.validation_errors_for_sample.len(), 3);

    // 覆盖 quantity 映射后只剩第 2 行缺少产品名
    let overrides: ColumnMapping = [("quantity", "Qty On Hand")].into_iter().collect();
    let fixed = api
        .preview(PreviewRequest {
            file_id: Some(file_id),
            mapping_override: Some(overrides),
        })
        .unwrap();
    assert_eq!(fixed.suggested_mapping, first.suggested_mapping);
    assert_eq!(fixed.validation_errors_for_sample.len(), 1);
    assert_eq!(fixed.validation_errors_for_sample[0].row_number, 2);
    assert_eq!(
        fixed.validation_errors_for_sample[0].errors,
        vec!["productName is required".to_string()]
    );
}

#[tokio::test]
async fn test_recommit_after_retain_is_idempotent() {
    let (_tmp, db_path, _api) = open_api().await;
    let config_manager = lab_import_staging::config::ConfigManager::new(&db_path).unwrap();
    config_manager
        .set_config_value(lab_import_staging::config::config_keys::RETAIN_AFTER_COMMIT, "true")
        .unwrap();
    let api = ImportApi::open(&db_path).await.unwrap();
    let file_id = stage_inventory(&api);

    let first = api
        .commit(request(&file_id, RowEdits::new(), ExclusionSet::new()))
        .await
        .unwrap();
    let second = api
        .commit(request(&file_id, RowEdits::new(), ExclusionSet::new()))
        .await
        .unwrap();

    assert_eq!(first.summary_counts.created, 2);
    assert_eq!(second.summary_counts.created, 0);
    assert_eq!(second.summary_counts.updated, 2);
    assert_eq!(first.error_sample, second.error_sample);
    assert_ne!(first.job_id, second.job_id);

    let repo = InventoryRepository::new(&db_path).unwrap();
    assert_eq!(repo.count().unwrap(), 2);
}

#[tokio::test]
async fn test_double_submit_without_retain_is_not_found() {
    let (_tmp, _db_path, api) = open_api().await;
    let file_id = stage_inventory(&api);

    api.commit(request(&file_id, RowEdits::new(), ExclusionSet::new()))
        .await
        .unwrap();
    let err = api
        .commit(request(&file_id, RowEdits::new(), ExclusionSet::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_error_sample_capped_and_failure_log_complete() {
    let (_tmp, _db_path, api) = open_api().await;

    let mut csv = String::from("Product Name,Qty On Hand\n");
    for n in 1..=500 {
        // 偶数行数量为负数
        let qty = if n % 2 == 0 { -1 } else { n };
        csv.push_str(&format!("item-{},{}\n", n, qty));
    }
    let file_id = api
        .stage_upload(ImportKind::Inventory, csv.as_bytes(), "big.csv")
        .unwrap()
        .file_id;

    let mapping: ColumnMapping = [("productName", "Product Name"), ("quantity", "Qty On Hand")]
        .into_iter()
        .collect();
    let result = api
        .commit(CommitRequest {
            file_id,
            mapping,
            edits: RowEdits::new(),
            excluded_row_numbers: ExclusionSet::new(),
        })
        .await
        .unwrap();

    assert_eq!(result.total_rows, 500);
    assert_eq!(result.error_rows, 250);
    assert_eq!(result.error_sample.len(), 20);
    let sample_rows: Vec<usize> = result.error_sample.iter().map(|f| f.row_number).collect();
    assert_eq!(sample_rows, (1..=20).map(|n| n * 2).collect::<Vec<_>>());
    assert_eq!(
        result.error_sample[0].reason,
        "quantity must be a non-negative number"
    );
    assert_counts_invariant(&result);

    let failures = api.job_failures(&result.job_id).unwrap();
    assert_eq!(failures.len(), 250);
    assert_eq!(failures.last().unwrap().row_number, 500);
}

#[tokio::test]
async fn test_purchase_history_import_with_overrides() {
    let (_tmp, db_path, api) = open_api().await;
    let file_id = api
        .stage_upload(ImportKind::PurchaseHistory, PURCHASE_CSV.as_bytes(), "orders.csv")
        .unwrap()
        .file_id;

    let preview = api
        .preview(PreviewRequest {
            file_id: Some(file_id.clone()),
            mapping_override: Some(
                [
                    ("productName", "Item"),
                    ("vendor", "Supplier"),
                    ("catalogNumber", "Cat No"),
                ]
                .into_iter()
                .collect(),
            ),
        })
        .unwrap();
    assert_eq!(preview.import_kind, ImportKind::PurchaseHistory);
    assert_eq!(preview.effective_mapping.get("poNumber"), Some("PO"));
    assert!(preview.validation_errors_for_sample.is_empty());

    let result = api
        .commit(CommitRequest {
            file_id,
            mapping: preview.effective_mapping,
            edits: RowEdits::new(),
            excluded_row_numbers: ExclusionSet::new(),
        })
        .await
        .unwrap();
    assert_eq!(result.success_rows, 2);

    let repo = PurchaseHistoryRepository::new(&db_path).unwrap();
    let agarose = repo.find_by_po_number("PO-1001").unwrap();
    assert_eq!(agarose[0].total_price, Some(61.0));
    let tris = repo.find_by_po_number("PO-1002").unwrap();
    assert_eq!(tris[0].order_date, chrono::NaiveDate::from_ymd_opt(2026, 1, 20));
}

#[tokio::test]
async fn test_unknown_file_id_is_not_found() {
    let (_tmp, _db_path, api) = open_api().await;
    let err = api
        .preview(PreviewRequest {
            file_id: Some("no-such-file".to_string()),
            mapping_override: None,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_template_round_trips_through_mapper() {
    let (_tmp, _db_path, api) = open_api().await;
    let template = api.template(ImportKind::Inventory).unwrap();

    // 仅表头的模板: 可暂存，0 行
    let staged = api
        .stage_upload(ImportKind::Inventory, &template, "template.csv")
        .unwrap();
    assert_eq!(staged.total_rows, 0);

    let preview = api
        .preview(PreviewRequest {
            file_id: Some(staged.file_id),
            mapping_override: None,
        })
        .unwrap();
    assert_eq!(preview.suggested_mapping.len(), ImportKind::Inventory.fields().len());
}
