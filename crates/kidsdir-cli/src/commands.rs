//! One handler per subcommand.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use kidsdir_core::auth::PkceChallenge;
use kidsdir_core::cache::{CachePolicy, Freshness};
use kidsdir_core::models::{
    ActivityCategory, ActivitySearch, MediaUploadRequest, ReviewAction, TicketReview,
};
use kidsdir_core::validation::{validate_body, validate_category_name};
use kidsdir_core::{ActivityRepository, ApiMode, ListQuery, Resource};

use crate::context::AppContext;
use crate::output::{print_json, render_tree, report_freshness, summary_line};

/// How long to wait for a background refresh before exiting
const REFRESH_WAIT: Duration = Duration::from_secs(10);
const REFRESH_POLL: Duration = Duration::from_millis(50);

const TICKET_TYPES: [&str; 3] = ["access_request", "organization_suggestion", "feedback"];

// ===== Session =====

pub async fn login(ctx: &AppContext, code: Option<String>, state: Option<String>) -> Result<()> {
    let auth = ctx.auth()?;
    let pending_path = ctx.pending_login_path();

    let Some(code) = code else {
        let (url, pkce) = auth.begin_login()?;
        std::fs::create_dir_all(&ctx.cache_dir)?;
        std::fs::write(&pending_path, serde_json::to_string(&pkce)?)
            .with_context(|| format!("Failed to write {}", pending_path.display()))?;
        eprintln!("Open this URL to sign in, then run `kidsdir login --code <code> --state <state>`:");
        println!("{}", url);
        return Ok(());
    };

    let Some(state) = state else {
        bail!("--state is required with --code");
    };
    let contents = std::fs::read_to_string(&pending_path)
        .context("No login in progress; run `kidsdir login` first")?;
    let pkce: PkceChallenge =
        serde_json::from_str(&contents).context("Pending login file is corrupt")?;

    auth.login_with_code(code.trim(), &pkce, state.trim()).await?;
    if let Err(e) = std::fs::remove_file(&pending_path) {
        warn!(error = %e, "Failed to remove pending login file");
    }
    // Cached reads may have been anonymous
    ctx.repository.clear();
    whoami(ctx).await
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    let url = ctx.auth()?.logout().await?;
    ctx.repository.clear();
    eprintln!("Signed out. Open this URL to end the browser session:");
    println!("{}", url);
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<()> {
    let auth = ctx.auth()?;
    let Some(tokens) = auth.tokens().await else {
        println!("Not signed in");
        return Ok(());
    };

    let claims = auth.claims().await?;
    let role = claims.as_ref().map(|c| c.role());
    print_json(&json!({
        "sub": claims.as_ref().map(|c| c.sub.clone()),
        "email": claims.as_ref().and_then(|c| c.email.clone()),
        "name": claims.as_ref().and_then(|c| c.name.clone()),
        "username": claims.as_ref().and_then(|c| c.username.clone()),
        "groups": claims.as_ref().map(|c| c.groups.clone()).unwrap_or_default(),
        "role": role.map(|r| r.to_string()),
        "mode": ctx.mode().await,
        "access_token_expires_at": tokens.expires_at,
        "minutes_until_expiry": tokens.minutes_until_expiry(),
    }))
}

// ===== CRUD =====

pub struct ListOptions {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub all: bool,
    pub brief: bool,
}

pub async fn list(
    ctx: &AppContext,
    resource: Resource,
    options: ListOptions,
    filters: &[String],
) -> Result<()> {
    let mode = ctx.mode().await;
    let mut query = ListQuery::new();
    if let Some(limit) = options.limit {
        query = query.with_limit(limit);
    }
    if let Some(cursor) = options.cursor {
        query = query.with_cursor(cursor);
    }
    for (key, value) in parse_filters(filters)? {
        query = query.filter(key, value);
    }

    let items: Vec<Value> = if options.all {
        let items: Vec<Value> = ctx.api.list_all_vec(mode, resource, query).await?;
        info!(%resource, count = items.len(), "Listed every page");
        if !options.brief {
            return print_json(&items);
        }
        items
    } else {
        let page = ctx.api.list::<Value>(mode, resource, &query).await?;
        if let Some(next) = page.next_cursor() {
            eprintln!("More results: --cursor {}", next);
        }
        if !options.brief {
            return print_json(&page);
        }
        page.items
    };

    for item in &items {
        println!("{}", summary_line(resource, item));
    }
    Ok(())
}

pub async fn get(ctx: &AppContext, resource: Resource, id: &str) -> Result<()> {
    let mode = ctx.mode().await;
    let record: Value = ctx.api.get(mode, resource, id).await?;
    print_json(&record)
}

pub async fn create(ctx: &AppContext, resource: Resource, file: &Path) -> Result<()> {
    let mode = ctx.mode().await;
    let body = read_json(file)?;
    check_body(ctx, mode, resource, &body, None, false).await?;

    let created: Value = ctx.api.create(mode, resource, &body).await?;
    ctx.repository.invalidate(resource);
    print_json(&created)
}

/// PUT when `partial` is false, PATCH otherwise
pub async fn update(
    ctx: &AppContext,
    resource: Resource,
    id: &str,
    file: &Path,
    partial: bool,
) -> Result<()> {
    let mode = ctx.mode().await;
    let body = read_json(file)?;
    check_body(ctx, mode, resource, &body, Some(id), partial).await?;

    let updated: Value = if partial {
        ctx.api.patch(mode, resource, id, &body).await?
    } else {
        ctx.api.update(mode, resource, id, &body).await?
    };
    ctx.repository.invalidate(resource);
    print_json(&updated)
}

pub async fn delete(ctx: &AppContext, resource: Resource, id: &str) -> Result<()> {
    let mode = ctx.mode().await;
    ctx.api.delete(mode, resource, id).await?;
    ctx.repository.invalidate(resource);
    eprintln!("Deleted {} {}", resource, id);
    Ok(())
}

async fn check_body(
    ctx: &AppContext,
    mode: ApiMode,
    resource: Resource,
    body: &Value,
    editing_id: Option<&str>,
    partial: bool,
) -> Result<()> {
    validate_body(resource, body, partial)
        .with_context(|| format!("Invalid {} record", resource))?;

    if resource != Resource::Categories {
        return Ok(());
    }
    let Some(name) = body.get("name").and_then(Value::as_str) else {
        return Ok(());
    };

    let existing: Vec<ActivityCategory> = ctx
        .api
        .list_all_vec(mode, Resource::Categories, ListQuery::new())
        .await?;
    let parent_id = match body.get("parent_id") {
        Some(parent) => parent.as_str().map(str::to_string),
        // PATCH without parent_id keeps the current parent
        None => editing_id.and_then(|id| {
            existing
                .iter()
                .find(|c| c.id == id)
                .and_then(|c| c.parent_id.clone())
        }),
    };
    validate_category_name(name, parent_id.as_deref(), &existing, editing_id)
        .context("Invalid categories record")?;
    Ok(())
}

// ===== Public reads =====

pub async fn search(ctx: &AppContext, search: ActivitySearch, fresh: bool) -> Result<()> {
    let repository = repository_for(ctx, fresh);
    let fetched = repository.search(&search).await?;
    report_freshness(&fetched);
    print_json(&fetched.data)?;
    settle(&repository, fetched.freshness).await;
    Ok(())
}

pub async fn tree(ctx: &AppContext, resource: Resource, find: Option<String>) -> Result<()> {
    let repository = &ctx.repository;
    if let Some(needle) = find {
        if resource != Resource::Categories {
            bail!("--find only applies to categories");
        }
        for (category, path) in repository.find_categories(&needle).await? {
            println!("{}  [{}]", path, category.id);
        }
        return Ok(());
    }

    let (rendered, freshness) = match resource {
        Resource::Categories => {
            let fetched = repository.categories().await?;
            report_freshness(&fetched);
            (render_tree(&fetched.data), fetched.freshness)
        }
        Resource::Areas => {
            let fetched = repository.areas().await?;
            report_freshness(&fetched);
            (render_tree(&fetched.data), fetched.freshness)
        }
        other => bail!("{} is not a tree; use categories or areas", other),
    };
    print!("{}", rendered);
    settle(repository, freshness).await;
    Ok(())
}

fn repository_for(ctx: &AppContext, fresh: bool) -> ActivityRepository {
    let mut repository = ctx.repository.clone();
    if fresh {
        repository.set_policy(CachePolicy::network_only());
    }
    repository
}

/// Give a stale read's background refresh a chance to land in the disk
/// cache before the process exits.
async fn settle(repository: &ActivityRepository, freshness: Freshness) {
    if freshness != Freshness::Stale {
        return;
    }
    let wait = async {
        while repository.cache().has_pending_refresh() {
            tokio::time::sleep(REFRESH_POLL).await;
        }
    };
    if tokio::time::timeout(REFRESH_WAIT, wait).await.is_err() {
        debug!("Background refresh still running at exit");
    }
}

// ===== Admin =====

pub async fn export(ctx: &AppContext, resource: Resource) -> Result<()> {
    let csv = ctx.api.export_csv(resource).await?;
    print!("{}", csv);
    Ok(())
}

pub async fn import(ctx: &AppContext, resource: Resource, file: &Path) -> Result<()> {
    let csv = read_input(file)?;
    let summary = ctx.api.import_csv(resource, csv).await?;
    ctx.repository.invalidate(resource);
    if !summary.is_clean() {
        warn!(%resource, rows = summary.errors.len(), "Import finished with row errors");
    }
    print_json(&summary)
}

pub async fn review(
    ctx: &AppContext,
    ticket_id: &str,
    action: ReviewAction,
    notes: Option<String>,
    create_organization: bool,
) -> Result<()> {
    let review = TicketReview {
        action,
        admin_notes: notes.filter(|n| !n.trim().is_empty()),
        create_organization: create_organization.then_some(true),
    };
    let ticket = ctx.api.review_ticket(ticket_id, &review).await?;
    eprintln!("{}: {}", ticket.id(), ticket.status());
    if create_organization {
        ctx.repository.invalidate(Resource::Organizations);
    }
    print_json(&ticket)
}

pub async fn submit_ticket(ctx: &AppContext, file: &Path) -> Result<()> {
    let body = read_json(file)?;
    match body.get("ticket_type").and_then(Value::as_str) {
        Some(kind) if TICKET_TYPES.contains(&kind) => {}
        Some(kind) => bail!(
            "Unknown ticket_type {}; expected one of {}",
            kind,
            TICKET_TYPES.join(", ")
        ),
        None => bail!("ticket_type is required"),
    }
    let ticket = ctx.api.submit_ticket(&body).await?;
    print_json(&ticket)
}

pub async fn group(ctx: &AppContext, username: &str, group: &str, add: bool) -> Result<()> {
    if add {
        ctx.api.add_user_to_group(username, group).await?;
        eprintln!("Added {} to {}", username, group);
    } else {
        ctx.api.remove_user_from_group(username, group).await?;
        eprintln!("Removed {} from {}", username, group);
    }
    Ok(())
}

pub async fn upload_url(
    ctx: &AppContext,
    org_id: &str,
    file_name: &str,
    content_type: &str,
) -> Result<()> {
    let mode = ctx.mode().await;
    let request = MediaUploadRequest {
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
    };
    let upload = ctx.api.request_media_upload(mode, org_id, &request).await?;
    print_json(&upload)
}

pub fn clear_cache(ctx: &AppContext) -> Result<()> {
    ctx.repository.clear();
    eprintln!("Cache cleared");
    Ok(())
}

// ===== Helpers =====

fn parse_filters(filters: &[String]) -> Result<Vec<(String, String)>> {
    filters
        .iter()
        .map(|raw| match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => bail!("Filter must look like key=value, got {:?}", raw),
        })
        .collect()
}

/// File contents, or stdin for `-`
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("Failed to read stdin")?;
        return Ok(contents);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = read_input(path)?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))
}
