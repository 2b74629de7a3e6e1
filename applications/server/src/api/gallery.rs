/// Gallery API - listing, groups, search and random picks
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use vuvur_core::{GroupCount, MediaKind, MediaQuery, MediaRecord, MediaSort};
use vuvur_storage::media;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 500;
const SEARCH_LIMIT: u32 = 100;

/// A media record as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    pub path: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub size: i64,
    pub mod_time: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub descriptive_text: Option<String>,
    /// Always an object, `{}` when nothing was extracted
    pub raw_metadata: Value,
    pub group_tag: Option<String>,
    pub liked: bool,
}

impl From<MediaRecord> for MediaItem {
    fn from(record: MediaRecord) -> Self {
        Self {
            id: record.id,
            path: record.path,
            filename: record.filename,
            kind: record.kind,
            size: record.size,
            mod_time: record.mod_time,
            width: record.width,
            height: record.height,
            descriptive_text: record.descriptive_text,
            raw_metadata: record
                .raw_metadata
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            group_tag: record.group_tag,
            liked: record.liked,
        }
    }
}

fn items(records: Vec<MediaRecord>) -> Vec<MediaItem> {
    records.into_iter().map(MediaItem::from).collect()
}

/// Empty query-string values count as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub subgroup: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GalleryPage {
    pub total_items: i64,
    pub page: u32,
    pub total_pages: i64,
    pub items: Vec<MediaItem>,
}

/// GET /api/gallery
/// Paginated listing with sort, free-text, group and subgroup filters
pub async fn list_gallery(
    State(app_state): State<AppState>,
    Query(params): Query<GalleryQuery>,
) -> Result<Json<GalleryPage>> {
    // Unknown sort values fall back to the configured default
    let sort = match non_empty(params.sort).as_deref().and_then(MediaSort::from_str) {
        Some(sort) => sort,
        None => app_state.settings.current().await?.default_sort(),
    };

    let group = non_empty(params.group);
    let subgroup = non_empty(params.subgroup);
    let path_prefix = match (&group, &subgroup) {
        (Some(group), Some(subgroup)) => Some(subgroup_prefix(
            &app_state.config.library.roots,
            group,
            subgroup,
        )?),
        _ => None,
    };

    let query = MediaQuery {
        page: params.page.unwrap_or(1).max(1),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        sort,
        search: non_empty(params.q),
        group,
        path_prefix,
    };

    let page = media::list(&app_state.pool, &query).await?;
    Ok(Json(GalleryPage {
        total_items: page.total_items,
        page: page.page,
        total_pages: page.total_pages,
        items: items(page.items),
    }))
}

/// Path prefix (with trailing separator) selecting one subgroup directory
///
/// With several roots, the first root holding `<group>/<subgroup>` wins.
fn subgroup_prefix(roots: &[PathBuf], group: &str, subgroup: &str) -> Result<String> {
    let is_plain = |name: &str| {
        let mut components = Path::new(name).components();
        matches!(components.next(), Some(std::path::Component::Normal(_)))
            && components.next().is_none()
    };
    if !is_plain(group) || !is_plain(subgroup) {
        return Err(ServerError::BadRequest(
            "group and subgroup must be single directory names".to_string(),
        ));
    }

    let root = roots
        .iter()
        .find(|root| root.join(group).join(subgroup).is_dir())
        .or_else(|| roots.first())
        .ok_or_else(|| ServerError::Internal("No media roots configured".to_string()))?;

    let dir = root.join(group).join(subgroup);
    let dir = dir
        .to_str()
        .ok_or_else(|| ServerError::BadRequest("Invalid subgroup path".to_string()))?;
    Ok(format!("{}{}", dir, std::path::MAIN_SEPARATOR))
}

/// GET /api/gallery/groups
pub async fn list_groups(State(app_state): State<AppState>) -> Result<Json<Vec<GroupCount>>> {
    let groups = media::groups(&app_state.pool).await?;
    Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
pub struct SubgroupQuery {
    #[serde(default)]
    pub group: Option<String>,
}

/// GET /api/gallery/subgroups?group=
pub async fn list_subgroups(
    State(app_state): State<AppState>,
    Query(params): Query<SubgroupQuery>,
) -> Result<Json<Vec<String>>> {
    let group = non_empty(params.group)
        .ok_or_else(|| ServerError::BadRequest("Missing 'group' parameter".to_string()))?;

    let subgroups =
        media::subgroups(&app_state.pool, &app_state.config.library.roots, &group).await?;
    Ok(Json(subgroups))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/search?q=
/// Best matches first, at most 100
pub async fn search(
    State(app_state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<MediaItem>>> {
    let q = non_empty(params.q)
        .ok_or_else(|| ServerError::BadRequest("Missing search query".to_string()))?;

    let hits = media::search(&app_state.pool, &q, SEARCH_LIMIT).await?;
    Ok(Json(items(hits)))
}

#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/files/random?count=&q=
pub async fn random_files(
    State(app_state): State<AppState>,
    Query(params): Query<RandomQuery>,
) -> Result<Json<Vec<MediaItem>>> {
    let count = params.count.unwrap_or(1).clamp(1, MAX_LIMIT);
    let q = non_empty(params.q);

    let picks = media::random(&app_state.pool, count, q.as_deref()).await?;
    Ok(Json(items(picks)))
}

/// GET /api/random-single?q=
/// One random item, 404 when nothing matches
pub async fn random_single(
    State(app_state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<MediaItem>>> {
    let q = non_empty(params.q);

    let picks = media::random(&app_state.pool, 1, q.as_deref()).await?;
    if picks.is_empty() {
        return Err(ServerError::NotFound(
            "No media found matching that query".to_string(),
        ));
    }
    Ok(Json(items(picks)))
}
