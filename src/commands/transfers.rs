use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cli::FolderArgs;
use crate::commands::{resolve_folder, Context};
use crate::config::StatusFormat;
use crate::error::{validation, AppError, AppResult};
use crate::listing::SortKey;
use crate::status::{render_events, JsonRenderer, StatusContext, StatusRenderer, TextRenderer};
use crate::transfer::{
    collect_upload_items, BatchResult, DownloadSpec, HttpDownload, HttpUpload, SequentialRunner, TransferItem,
    TransferJob, Transport,
};
use crate::types::Direction;

pub async fn upload(ctx: &Context, paths: &[PathBuf], folder: &FolderArgs) -> AppResult<BatchResult> {
    let as_strings: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    validation::validate_paths_exist(&as_strings)?;

    let crumbs = resolve_folder(&ctx.api, folder).await?;
    let items = collect_upload_items(paths, crumbs.current_id())?;
    if items.is_empty() {
        return Err(AppError::InvalidInput("nothing to upload".to_string()));
    }

    let mut job = TransferJob::new(Direction::Upload, items);
    let transport = HttpUpload::new(ctx.api.clone(), ctx.config.transfer.chunk_size);
    run_job(ctx, transport, &mut job).await
}

pub async fn download(ctx: &Context, ids: &[i64], out: &Path, parent: Option<i64>) -> AppResult<BatchResult> {
    // Names come from the listing like in the web UI; without them the
    // response headers decide.
    let listing = match ctx.api.list_files(parent, SortKey::Name).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, "listing unavailable, falling back to response file names");
            Vec::new()
        }
    };

    let items = ids
        .iter()
        .map(|&id| {
            let entry = listing.iter().find(|e| e.id == id);
            let name = entry.map(|e| e.filename.clone()).unwrap_or_else(|| format!("#{}", id));
            TransferItem::new(
                name,
                None,
                DownloadSpec {
                    file_id: id,
                    dest_dir: out.to_path_buf(),
                    file_name: entry.map(|e| e.filename.clone()),
                    is_folder: entry.map(|e| e.is_folder).unwrap_or(false),
                },
            )
        })
        .collect::<Vec<_>>();

    let mut job = TransferJob::new(Direction::Download, items);
    run_job(ctx, HttpDownload::new(ctx.api.clone()), &mut job).await
}

/// Runs one batch while a separate task renders its events.
async fn run_job<P, T>(ctx: &Context, transport: T, job: &mut TransferJob<P>) -> AppResult<BatchResult>
where
    T: Transport<P>,
    P: Send + Sync,
{
    let names: Vec<String> = job.items().iter().map(|i| i.name.clone()).collect();
    let renderer: Box<dyn StatusRenderer> = match ctx.status_format {
        StatusFormat::Json => Box::new(JsonRenderer::new(io::stdout())),
        StatusFormat::Text => Box::new(TextRenderer::new(io::stderr(), StatusContext::new(job.direction, &names))),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let render_task = tokio::spawn(render_events(rx, renderer));

    let runner = SequentialRunner::new(transport, tx, ctx.metrics.clone());
    let result = runner.run(job).await;
    // dropping the runner closes the channel so the renderer can finish
    drop(runner);

    match render_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to render transfer status"),
        Err(e) => warn!(error = %e, "status renderer task failed"),
    }
    Ok(result)
}
