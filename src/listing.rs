use std::fmt::Write as _;

use chrono::Local;
use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::{AppResult, OptionExt};
use crate::types::FileEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Date,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Details,
    Grid,
}

const GRID_COLUMNS: usize = 3;
const GRID_CELL_WIDTH: usize = 28;

/// Lower-cased text after the last `.`; the whole name when there is none.
fn extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or("").to_lowercase()
}

fn type_key(entry: &FileEntry) -> String {
    if entry.is_folder {
        "folder".to_string()
    } else {
        extension(&entry.filename)
    }
}

/// Label shown in the Type column.
pub fn type_label(entry: &FileEntry) -> String {
    if entry.is_folder {
        return "Folder".to_string();
    }
    match entry.filename.rsplit('.').next() {
        Some(ext) if !ext.is_empty() => ext.to_string(),
        _ => "File".to_string(),
    }
}

/// Stable sort by the given key and direction.
pub fn apply_sorting(entries: &[FileEntry], key: SortKey, direction: SortDirection) -> Vec<FileEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| {
        let ord = match key {
            SortKey::Name => a.filename.to_lowercase().cmp(&b.filename.to_lowercase()),
            SortKey::Date => a.created_at.cmp(&b.created_at),
            SortKey::Type => type_key(a).cmp(&type_key(b)),
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    sorted
}

pub fn render(entries: &[FileEntry], view: ViewMode) -> String {
    if entries.is_empty() {
        return "This folder is empty.\n".to_string();
    }
    match view {
        ViewMode::Details => render_details(entries),
        ViewMode::Grid => render_grid(entries),
    }
}

fn render_details(entries: &[FileEntry]) -> String {
    let name_width = entries
        .iter()
        .map(|e| e.filename.chars().count() + if e.is_folder { 1 } else { 0 })
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let type_width = entries.iter().map(|e| type_label(e).len()).max().unwrap_or(0).max("Type".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<nw$}  {:<tw$}  {:<19}  {}", "Name", "Type", "Modified", "Id", nw = name_width, tw = type_width);
    for e in entries {
        let name = if e.is_folder { format!("{}/", e.filename) } else { e.filename.clone() };
        let date = e.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        let _ = writeln!(
            out,
            "{:<nw$}  {:<tw$}  {}  {}",
            name,
            type_label(e),
            date,
            e.id,
            nw = name_width,
            tw = type_width
        );
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
    t.push('…');
    t
}

fn render_grid(entries: &[FileEntry]) -> String {
    let mut out = String::new();
    for row in entries.chunks(GRID_COLUMNS) {
        let mut names = String::new();
        let mut metas = String::new();
        for e in row {
            let icon = if e.is_folder { "[D]" } else { "[F]" };
            let name = truncate(&format!("{} {}", icon, e.filename), GRID_CELL_WIDTH);
            let date = e.created_at.with_timezone(&Local).format("%Y-%m-%d");
            let meta = truncate(&format!("{} · {}", type_label(e), date), GRID_CELL_WIDTH);
            let _ = write!(names, "{:<w$}  ", name, w = GRID_CELL_WIDTH);
            let _ = write!(metas, "{:<w$}  ", meta, w = GRID_CELL_WIDTH);
        }
        let _ = writeln!(out, "{}", names.trim_end());
        let _ = writeln!(out, "{}", metas.trim_end());
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub folder_id: Option<i64>,
    pub folder_name: String,
}

/// Navigation trail from `Home` to the current folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    trail: Vec<Crumb>,
}

impl Default for Breadcrumb {
    fn default() -> Self {
        Self { trail: vec![Crumb { folder_id: None, folder_name: "Home".to_string() }] }
    }
}

impl Breadcrumb {
    pub fn push(&mut self, folder_id: i64, folder_name: impl Into<String>) {
        self.trail.push(Crumb { folder_id: Some(folder_id), folder_name: folder_name.into() });
    }

    /// Drops everything after `index`; `Home` always stays.
    pub fn pop_to(&mut self, index: usize) {
        self.trail.truncate(index + 1);
    }

    pub fn current_id(&self) -> Option<i64> {
        self.trail.last().and_then(|c| c.folder_id)
    }

    pub fn crumbs(&self) -> &[Crumb] {
        &self.trail
    }

    pub fn render(&self) -> String {
        self.trail.iter().map(|c| c.folder_name.as_str()).collect::<Vec<_>>().join(" / ")
    }

    /// Walks `a/b/c` from the root, matching folder names level by level.
    pub async fn resolve(api: &ApiClient, path: &str) -> AppResult<Self> {
        let mut crumbs = Self::default();
        for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let entries = api.list_files(crumbs.current_id(), SortKey::Name).await?;
            let folder = find_folder(&entries, segment).ok_or_not_found(&format!("folder '{}'", segment))?;
            crumbs.push(folder.id, folder.filename.clone());
        }
        Ok(crumbs)
    }
}

/// Exact match first, then a case-insensitive one.
pub fn find_folder<'a>(entries: &'a [FileEntry], name: &str) -> Option<&'a FileEntry> {
    let folders = || entries.iter().filter(|e| e.is_folder);
    folders()
        .find(|e| e.filename == name)
        .or_else(|| folders().find(|e| e.filename.to_lowercase() == name.to_lowercase()))
}
