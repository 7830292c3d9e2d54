use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::CurrentUser;
use crate::db::models::User;
use crate::db::query::{ItemQuery, SearchField, SortOrder};
use crate::db::repository::ItemRepository;
use crate::error::AppError;
use crate::models::item::ItemResponse;
use crate::models::plan::require_pro;
use crate::state::AppState;

/// Queries shorter than this return no results.
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SEARCH_RESULTS: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvancedSearchParams {
    #[serde(default)]
    pub q: Option<String>,
    /// Comma-separated field names; all fields when absent.
    pub search_in: Option<String>,
    pub platform: Option<String>,
    pub content_type: Option<String>,
    pub tag: Option<String>,
    pub collection: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedSearchResponse {
    pub results: Vec<ItemResponse>,
    pub total: usize,
    pub search_in: Vec<String>,
}

/// Case-insensitive substring search over title, notes, tags, platform and URL.
pub async fn process_search(
    items: &dyn ItemRepository,
    user_id: &str,
    q: &str,
) -> Result<Vec<ItemResponse>, AppError> {
    let q = q.trim();
    if q.chars().count() < MIN_QUERY_CHARS {
        return Ok(Vec::new());
    }

    let query = ItemQuery {
        text: Some(q.to_string()),
        limit: MAX_SEARCH_RESULTS,
        ..ItemQuery::default()
    };
    let found = items.query(user_id, &query).await?;
    Ok(found.into_iter().map(ItemResponse::from).collect())
}

/// Parse `search_in`; blank means every field.
pub fn parse_search_fields(raw: Option<&str>) -> Result<Vec<SearchField>, AppError> {
    let mut fields = Vec::new();
    for name in raw.unwrap_or_default().split(',').map(str::trim) {
        if name.is_empty() {
            continue;
        }
        let field = SearchField::parse(name)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown search field '{name}'")))?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }

    if fields.is_empty() {
        fields = SearchField::ALL.to_vec();
    }
    Ok(fields)
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date.
///
/// A bare date means the start of that day, or its last millisecond when
/// `end_of_day` is set, so that a date range is inclusive on both ends.
pub fn parse_date_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid date '{raw}'. Expected YYYY-MM-DD or an RFC 3339 timestamp"
        ))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| AppError::Internal("invalid time of day".into()))?;

    Ok(date.and_time(time).and_utc())
}

/// Field-scoped search with filters and a date range. Pro only.
pub async fn process_advanced_search(
    items: &dyn ItemRepository,
    user: &User,
    params: AdvancedSearchParams,
    now: DateTime<Utc>,
) -> Result<AdvancedSearchResponse, AppError> {
    require_pro(user, "Advanced search", now)?;

    let fields = parse_search_fields(params.search_in.as_deref())?;
    let non_blank = |s: Option<String>| {
        s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    };

    let created_from = non_blank(params.date_from)
        .map(|d| parse_date_bound(&d, false))
        .transpose()?;
    let created_to = non_blank(params.date_to)
        .map(|d| parse_date_bound(&d, true))
        .transpose()?;
    if let (Some(from), Some(to)) = (created_from, created_to) {
        if from > to {
            return Err(AppError::BadRequest("date_from must not be after date_to".into()));
        }
    }

    let query = ItemQuery {
        text: non_blank(params.q),
        fields: fields.clone(),
        platform: non_blank(params.platform),
        content_type: non_blank(params.content_type),
        tag: non_blank(params.tag),
        collection: non_blank(params.collection),
        created_from: created_from.map(bson::DateTime::from_chrono),
        created_to: created_to.map(bson::DateTime::from_chrono),
        sort: SortOrder::Newest,
        limit: MAX_SEARCH_RESULTS,
    };

    let results: Vec<ItemResponse> = items
        .query(&user.id, &query)
        .await?
        .into_iter()
        .map(ItemResponse::from)
        .collect();

    Ok(AdvancedSearchResponse {
        total: results.len(),
        results,
        search_in: fields.iter().map(|f| f.name().to_string()).collect(),
    })
}

/// Axum handler for `GET /api/search`.
pub async fn search_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let results = process_search(state.items.as_ref(), &user.id, &params.q).await?;
    Ok(Json(results))
}

/// Axum handler for `GET /api/search/advanced`.
pub async fn advanced_search_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<AdvancedSearchParams>,
) -> Result<Json<AdvancedSearchResponse>, AppError> {
    let response =
        process_advanced_search(state.items.as_ref(), &user, params, Utc::now()).await?;
    Ok(Json(response))
}

/// Axum handler for `GET /api/tags`.
pub async fn tags_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<String>>, AppError> {
    let tags = state.items.distinct_tags(&user.id).await?;
    Ok(Json(tags))
}
