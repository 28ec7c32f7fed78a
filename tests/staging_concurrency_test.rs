// ==========================================
// 暂存仓库并发读取测试
// ==========================================
// 同一 file_id 的多个预览请求并发读取，结果一致

use lab_import_staging::api::{ImportApi, PreviewRequest};
use lab_import_staging::domain::ImportKind;
use std::sync::Arc;
use std::thread;

mod test_helpers;
use test_helpers::{create_test_db, INVENTORY_CSV};

#[tokio::test]
async fn test_concurrent_previews_are_consistent() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = Arc::new(ImportApi::open(&db_path).await.unwrap());
    let file_id = api
        .stage_upload(ImportKind::Inventory, INVENTORY_CSV.as_bytes(), "stock.csv")
        .unwrap()
        .file_id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let api = Arc::clone(&api);
            let file_id = file_id.clone();
            thread::spawn(move || {
                api.preview(PreviewRequest {
                    file_id: Some(file_id),
                    mapping_override: None,
                })
                .unwrap()
            })
        })
        .collect();

    let previews: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for preview in &previews[1..] {
        assert_eq!(preview.suggested_mapping, previews[0].suggested_mapping);
        assert_eq!(
            preview.validation_errors_for_sample,
            previews[0].validation_errors_for_sample
        );
        assert_eq!(preview.sample_rows, previews[0].sample_rows);
    }
}

#[tokio::test]
async fn test_concurrent_stages_get_distinct_ids() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = Arc::new(ImportApi::open(&db_path).await.unwrap());

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let api = Arc::clone(&api);
            thread::spawn(move || {
                api.stage_upload(
                    ImportKind::Inventory,
                    INVENTORY_CSV.as_bytes(),
                    &format!("stock-{}.csv", n),
                )
                .unwrap()
                .file_id
            })
        })
        .collect();

    let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
