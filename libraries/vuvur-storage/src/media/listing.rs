//! Read-side queries: gallery pages, groups, search and random picks

use super::{record_from_row, MEDIA_COLUMNS};
use crate::error::{Result, StorageError};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use vuvur_core::{GroupCount, MediaPage, MediaQuery, MediaRecord};

/// Turn free text into an FTS5 prefix query
///
/// Each whitespace-separated term is quoted (so FTS operators in user input
/// are matched literally) and made a prefix match. Terms without any
/// letter or digit would tokenize to nothing and are dropped. Returns `None`
/// when no terms remain.
pub fn fts_query(input: &str) -> Option<String> {
    let terms: Vec<String> = input
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// One page of the gallery
pub async fn list(pool: &SqlitePool, query: &MediaQuery) -> Result<MediaPage> {
    let limit = i64::from(query.limit.max(1));
    let page = query.page.max(1);
    let fts = query.search.as_deref().and_then(fts_query);

    let mut count_sql = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS cnt FROM media");
    push_filters(&mut count_sql, query, fts.as_deref());
    let total_items: i64 = count_sql.build().fetch_one(pool).await?.try_get("cnt")?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM media", MEDIA_COLUMNS));
    push_filters(&mut select, query, fts.as_deref());
    select.push(" ");
    select.push(query.sort.order_by());
    select.push(" LIMIT ");
    select.push_bind(limit);
    select.push(" OFFSET ");
    select.push_bind(i64::from(page - 1) * limit);

    let rows = select.build().fetch_all(pool).await?;
    let items = rows
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(MediaPage {
        total_items,
        page,
        total_pages: (total_items + limit - 1) / limit,
        items,
    })
}

fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Sqlite>,
    query: &'a MediaQuery,
    fts: Option<&'a str>,
) {
    if fts.is_some() {
        builder.push(" JOIN media_fts ON media_fts.rowid = media.id");
    }

    let mut conjunction = " WHERE ";
    if let Some(fts) = fts {
        builder.push(conjunction);
        builder.push("media_fts MATCH ");
        builder.push_bind(fts);
        conjunction = " AND ";
    }
    if let Some(group) = &query.group {
        builder.push(conjunction);
        builder.push("media.group_tag = ");
        builder.push_bind(group);
        conjunction = " AND ";
    }
    if let Some(prefix) = &query.path_prefix {
        builder.push(conjunction);
        builder.push("substr(media.path, 1, length(");
        builder.push_bind(prefix);
        builder.push(")) = ");
        builder.push_bind(prefix);
    }
}

/// Group tags with item counts, by name
pub async fn groups(pool: &SqlitePool) -> Result<Vec<GroupCount>> {
    let rows = sqlx::query(
        r#"
        SELECT group_tag, COUNT(*) AS cnt
        FROM media
        WHERE group_tag IS NOT NULL AND group_tag != ''
        GROUP BY group_tag
        ORDER BY group_tag ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(GroupCount {
                group_tag: row.try_get("group_tag")?,
                count: row.try_get("cnt")?,
            })
        })
        .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
        .map_err(StorageError::from)
}

/// Paths of every item in `group`
pub async fn paths_in_group(pool: &SqlitePool, group: &str) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT path FROM media WHERE group_tag = ?")
        .bind(group)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("path").map_err(StorageError::from))
        .collect()
}

/// Second-level directory names inside `group`, sorted
///
/// A subgroup is the directory directly below `<root>/<group>/` that holds
/// at least one indexed file (at any depth).
pub async fn subgroups(pool: &SqlitePool, roots: &[PathBuf], group: &str) -> Result<Vec<String>> {
    let paths = paths_in_group(pool, group).await?;

    let mut names = BTreeSet::new();
    for path in &paths {
        let path = Path::new(path);
        for root in roots {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let components: Vec<_> = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => part.to_str(),
                    _ => None,
                })
                .collect();
            // group / subgroup / ... / file
            if components.len() > 2 && components[0] == group {
                names.insert(components[1].to_string());
            }
            break;
        }
    }

    Ok(names.into_iter().collect())
}

/// Full-text search ordered by relevance
pub async fn search(pool: &SqlitePool, text: &str, limit: u32) -> Result<Vec<MediaRecord>> {
    let Some(fts) = fts_query(text) else {
        return Ok(Vec::new());
    };

    let sql = format!(
        r#"
        SELECT {}
        FROM media_fts
        JOIN media ON media.id = media_fts.rowid
        WHERE media_fts MATCH ?
        ORDER BY rank
        LIMIT ?
        "#,
        MEDIA_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(fts)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// Up to `count` random items, optionally restricted to a search
pub async fn random(pool: &SqlitePool, count: u32, text: Option<&str>) -> Result<Vec<MediaRecord>> {
    let fts = text.and_then(fts_query);

    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM media", MEDIA_COLUMNS));
    if let Some(fts) = &fts {
        builder.push(" JOIN media_fts ON media_fts.rowid = media.id WHERE media_fts MATCH ");
        builder.push_bind(fts);
    }
    builder.push(" ORDER BY RANDOM() LIMIT ");
    builder.push_bind(i64::from(count));

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(record_from_row).collect()
}
