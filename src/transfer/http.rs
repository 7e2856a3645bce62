use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::debug;
use walkdir::WalkDir;

use crate::api::ApiClient;
use crate::error::TransferError;
use crate::transfer::runner::{ProgressReporter, TransferItem, Transport};
use crate::types::FileEntry;

#[derive(Debug, Clone)]
pub struct UploadSpec {
    pub local_path: PathBuf,
    /// `<folder>/<sub>/<file>` for folder uploads; the server recreates the folders.
    pub relative_path: Option<String>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DownloadSpec {
    pub file_id: i64,
    pub dest_dir: PathBuf,
    /// Name from the listing, if known. Otherwise taken from the response.
    pub file_name: Option<String>,
    /// Folders arrive zipped.
    pub is_folder: bool,
}

/// Multipart upload to `/api/files/upload`, streamed from disk.
pub struct HttpUpload {
    api: ApiClient,
    chunk_size: usize,
}

impl HttpUpload {
    pub fn new(api: ApiClient, chunk_size: usize) -> Self {
        Self { api, chunk_size: chunk_size.max(1) }
    }
}

#[async_trait]
impl Transport<UploadSpec> for HttpUpload {
    async fn transfer(
        &self,
        item: &TransferItem<UploadSpec>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<(), TransferError> {
        let spec = &item.payload;
        let file = tokio::fs::File::open(&spec.local_path).await?;
        let file_len = file.metadata().await?.len();
        let file_name = spec
            .local_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| item.name.clone());

        // Body chunks are counted as they are handed to the connection.
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let stream = ReaderStream::with_capacity(file, self.chunk_size).inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                let _ = tx.send(bytes.len() as u64);
            }
        });
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), file_len)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        let mut form = Form::new().part("file", part);
        if let Some(parent_id) = spec.parent_id {
            form = form.text("parent_id", parent_id.to_string());
        }
        if let Some(rel) = &spec.relative_path {
            form = form.text("relative_path", rel.clone());
        }

        let send = self.api.post("/api/files/upload").multipart(form).send();
        tokio::pin!(send);
        let mut loaded = 0u64;
        let response = loop {
            tokio::select! {
                Some(n) = rx.recv() => {
                    loaded += n;
                    progress.loaded(loaded);
                }
                res = &mut send => break res,
            }
        };
        while let Ok(n) = rx.try_recv() {
            loaded += n;
            progress.loaded(loaded);
        }

        let response = response.map_err(|e| TransferError::Transport(format!("Network error during upload: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Server {
                status: status.as_u16(),
                message: format!("Upload failed with status {}", status.as_u16()),
            });
        }

        let total = item.size_bytes.unwrap_or(loaded);
        let remaining = total.saturating_sub(progress.item_bytes());
        if remaining > 0 {
            progress.delta(i64::try_from(remaining).unwrap_or(i64::MAX));
        }

        let entry: FileEntry = response
            .json()
            .await
            .map_err(|e| TransferError::Transport(format!("malformed upload response: {}", e)))?;
        debug!(id = entry.id, filename = %entry.filename, parent_id = ?entry.parent_id, "upload stored");
        Ok(())
    }
}

/// Download from `/api/files/download/{id}` into a local directory.
pub struct HttpDownload {
    api: ApiClient,
}

impl HttpDownload {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Transport<DownloadSpec> for HttpDownload {
    async fn transfer(
        &self,
        item: &TransferItem<DownloadSpec>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<(), TransferError> {
        let spec = &item.payload;
        let response = self
            .api
            .get(&format!("/api/files/download/{}", spec.file_id))
            .send()
            .await
            .map_err(|e| TransferError::Transport(format!("Network error during download: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Server {
                status: status.as_u16(),
                message: format!("Download failed with status {}", status.as_u16()),
            });
        }

        let header_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition);
        let name = download_file_name(spec, header_name.as_deref());
        if let Some(len) = response.content_length() {
            progress.declare_size(len);
        }

        tokio::fs::create_dir_all(&spec.dest_dir).await?;
        let dest = unique_destination(&spec.dest_dir, &name).await?;
        let part = part_path(&dest);
        let mut file = tokio::fs::OpenOptions::new().write(true).create_new(true).open(&part).await?;

        let written = write_body(response, &mut file, progress).await;
        drop(file);
        let stored = match written {
            Ok(()) => promote(&part, &dest).await,
            Err(err) => Err(err),
        };
        if stored.is_err() {
            if let Err(e) = tokio::fs::remove_file(&part).await {
                debug!(part = %part.display(), error = %e, "could not remove partial download");
            }
            return stored;
        }
        debug!(id = spec.file_id, dest = %dest.display(), "download stored");
        Ok(())
    }
}

/// Moves a complete `.part` file to its final name, refusing to replace a file
/// that appeared there while the body was streaming.
async fn promote(part: &Path, dest: &Path) -> Result<(), TransferError> {
    if tokio::fs::try_exists(dest).await? {
        return Err(TransferError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} appeared during the download", dest.display()),
        )));
    }
    tokio::fs::rename(part, dest).await?;
    Ok(())
}

async fn write_body(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), TransferError> {
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| TransferError::Transport(format!("download interrupted: {}", e)))?;
        file.write_all(&chunk).await?;
        progress.delta(chunk.len() as i64);
    }
    file.flush().await?;
    Ok(())
}

/// `<dest>.part`, where the body is staged until it is complete.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn is_taken(path: &Path) -> io::Result<bool> {
    Ok(tokio::fs::try_exists(path).await? || tokio::fs::try_exists(part_path(path)).await?)
}

/// `name`, or `stem (n).ext` with the first `n` that is free. Existing files,
/// including earlier items of the same batch, are never overwritten.
pub async fn unique_destination(dir: &Path, name: &str) -> io::Result<PathBuf> {
    let first = dir.join(name);
    if !is_taken(&first).await? {
        return Ok(first);
    }
    let path = Path::new(name);
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| name.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    for n in 1u32.. {
        let candidate = match &ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(candidate);
        if !is_taken(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("no free file name for {}", name)))
}

/// Extracts the plain `filename=` parameter of a `Content-Disposition` header.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|param| {
        let raw = param.strip_prefix("filename=")?;
        let name = raw.trim_matches('"').trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    })
}

/// Local file name: listing name, then header name, then `download-{id}`.
/// Only the last path component is kept; folders get a `.zip` suffix.
pub fn download_file_name(spec: &DownloadSpec, header_name: Option<&str>) -> String {
    let candidate = spec
        .file_name
        .as_deref()
        .or(header_name)
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("download-{}", spec.file_id));

    if spec.is_folder && !candidate.to_ascii_lowercase().ends_with(".zip") {
        format!("{}.zip", candidate)
    } else {
        candidate
    }
}

/// Expands local paths into upload items. Directories contribute every regular
/// file below them (in file-name order) with a `<dir>/<relative>` path.
pub fn collect_upload_items(paths: &[PathBuf], parent_id: Option<i64>) -> io::Result<Vec<TransferItem<UploadSpec>>> {
    let mut items = Vec::new();
    for path in paths {
        let meta = std::fs::metadata(path)?;
        if meta.is_dir() {
            let dir_name = path
                .canonicalize()?
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid folder: {}", path.display())))?;
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = entry
                    .path()
                    .strip_prefix(path)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                let relative_path = format!("{}/{}", dir_name, rel);
                let size = entry.metadata()?.len();
                items.push(TransferItem::new(
                    relative_path.clone(),
                    Some(size),
                    UploadSpec {
                        local_path: entry.path().to_path_buf(),
                        relative_path: Some(relative_path),
                        parent_id,
                    },
                ));
            }
        } else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            items.push(TransferItem::new(
                name,
                Some(meta.len()),
                UploadSpec { local_path: path.clone(), relative_path: None, parent_id },
            ));
        }
    }
    Ok(items)
}
