use std::io::{self, BufRead, Write};

use tracing::info;

use crate::cli::FolderArgs;
use crate::commands::{resolve_folder, Context};
use crate::error::{validation, AppError, AppResult};
use crate::listing::{self, SortDirection, SortKey, ViewMode};

pub async fn list(
    ctx: &Context,
    folder: &FolderArgs,
    sort: Option<SortKey>,
    order: Option<SortDirection>,
    view: Option<ViewMode>,
) -> AppResult<String> {
    let defaults = &ctx.config.listing;
    let sort = sort.unwrap_or(defaults.sort);
    let order = order.unwrap_or(defaults.order);
    let view = view.unwrap_or(defaults.view);

    let crumbs = resolve_folder(&ctx.api, folder).await?;
    let entries = ctx.api.list_files(crumbs.current_id(), sort).await?;
    let sorted = listing::apply_sorting(&entries, sort, order);

    Ok(format!("{}\n\n{}", crumbs.render(), listing::render(&sorted, view)))
}

pub async fn mkdir(ctx: &Context, name: &str, folder: &FolderArgs) -> AppResult<String> {
    validation::validate_folder_name(name)?;
    let crumbs = resolve_folder(&ctx.api, folder).await?;
    let created = ctx.api.create_folder(name, crumbs.current_id()).await?;
    info!(id = created.id, name = %created.filename, parent_id = ?created.parent_id, "folder created");
    Ok(format!("Created folder '{}' (id {}) in {}", created.filename, created.id, crumbs.render()))
}

pub async fn remove(ctx: &Context, id: i64, yes: bool, parent: Option<i64>) -> AppResult<String> {
    if !yes {
        // Name and kind only make the prompt nicer; a failed lookup is not fatal.
        let entry = ctx
            .api
            .list_files(parent, SortKey::Name)
            .await
            .ok()
            .and_then(|entries| entries.into_iter().find(|e| e.id == id));
        let prompt = match entry {
            Some(e) => format!(
                "Are you sure you want to delete the {} \"{}\"? This cannot be undone. [y/N] ",
                if e.is_folder { "folder" } else { "file" },
                e.filename
            ),
            None => format!("Are you sure you want to delete item #{}? This cannot be undone. [y/N] ", id),
        };
        let confirmed = tokio::task::spawn_blocking(move || confirm(&prompt, &mut io::stdin().lock(), &mut io::stderr()))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;
        if !confirmed {
            return Err(AppError::InvalidInput("deletion cancelled".to_string()));
        }
    }

    ctx.api.delete(id).await?;
    info!(id, "item deleted");
    Ok(format!("Deleted item #{}", id))
}

/// Asks a yes/no question; only `y`/`yes` (any case) confirm.
pub fn confirm(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{}", prompt)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
