// ==========================================
// 实验室采购运营系统 - 命令行入口
// ==========================================
// 用法:
//   lab-import-staging <文件> [--kind inventory|purchase-history]
//                      [--db <路径>] [--map 字段=列]... [--exclude 行号]... [--commit]
// 行为: 暂存文件并输出预览 JSON；带 --commit 时按生效映射提交并输出 CommitResult
// ==========================================

use anyhow::{anyhow, bail, Context};
use lab_import_staging::api::{CommitRequest, ImportApi, PreviewRequest};
use lab_import_staging::domain::{ColumnMapping, ExclusionSet, ImportKind, RowEdits};
use lab_import_staging::{db, logging};
use std::path::Path;

struct CliArgs {
    file: String,
    kind: ImportKind,
    db_path: String,
    mapping_override: ColumnMapping,
    excluded: ExclusionSet,
    commit: bool,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut file = None;
    let mut kind = ImportKind::Inventory;
    let mut db_path = None;
    let mut mapping_override = ColumnMapping::new();
    let mut excluded = ExclusionSet::new();
    let mut commit = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--kind" => {
                let value = args.next().context("--kind 需要参数")?;
                kind = value.parse().map_err(|e: String| anyhow!(e))?;
            }
            "--db" => db_path = Some(args.next().context("--db 需要参数")?),
            "--map" => {
                let value = args.next().context("--map 需要参数")?;
                let (field, column) = value
                    .split_once('=')
                    .with_context(|| format!("--map 格式应为 字段=列: {}", value))?;
                mapping_override.set(field.trim(), column.trim());
            }
            "--exclude" => {
                let value = args.next().context("--exclude 需要参数")?;
                let row_number: usize = value
                    .parse()
                    .with_context(|| format!("无效行号: {}", value))?;
                excluded.exclude(row_number);
            }
            "--commit" => commit = true,
            other if other.starts_with("--") => bail!("未知参数: {}", other),
            other => file = Some(other.to_string()),
        }
    }

    Ok(CliArgs {
        file: file.context("缺少待导入文件路径")?,
        kind,
        db_path: db_path.unwrap_or_else(db::default_db_path),
        mapping_override,
        excluded,
        commit,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("{} v{}", lab_import_staging::APP_NAME, lab_import_staging::VERSION);

    let args = parse_args()?;
    let bytes = std::fs::read(&args.file).with_context(|| format!("读取文件失败: {}", args.file))?;
    let filename = Path::new(&args.file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file.clone());

    tracing::info!(db_path = %args.db_path, "使用数据库");
    let api = ImportApi::open(&args.db_path).await?;

    let staged = api.stage_upload(args.kind, &bytes, &filename)?;
    let preview = api.preview(PreviewRequest {
        file_id: Some(staged.file_id.clone()),
        mapping_override: Some(args.mapping_override),
    })?;
    println!("{}", serde_json::to_string_pretty(&preview)?);

    if args.commit {
        let result = api
            .commit(CommitRequest {
                file_id: staged.file_id,
                mapping: preview.effective_mapping,
                edits: RowEdits::new(),
                excluded_row_numbers: args.excluded,
            })
            .await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}
