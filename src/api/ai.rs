//! LLM-backed annotations of saved items.
//!
//! Every generation is one round trip to the model, counted against the
//! user's monthly AI allowance.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::items::{find_owned_item, item_not_found};
use crate::auth::middleware::CurrentUser;
use crate::db::collection_repository::CollectionRepository;
use crate::db::models::{Collection, SavedItem, User};
use crate::db::repository::{ItemPatch, ItemRepository};
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::llm::client::LlmClient;
use crate::llm::parse::{parse_list_reply, parse_tag_reply};
use crate::models::item::ItemResponse;
use crate::models::plan::{ai_generation_limit, ai_quota_exceeded, check_ai_quota, month_key};
use crate::state::AppState;

/// The list-valued annotations a model can generate for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTask {
    Summary,
    KeyIdeas,
    SmartTags,
    ActionItems,
}

impl AiTask {
    pub fn max_entries(&self) -> usize {
        match self {
            AiTask::Summary => 3,
            AiTask::KeyIdeas | AiTask::SmartTags | AiTask::ActionItems => 5,
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            AiTask::Summary => {
                "You summarize saved links for a personal reading list. Reply with a JSON array \
                 of at most 3 short sentences and nothing else."
            }
            AiTask::KeyIdeas => {
                "You extract the key ideas of saved content. Reply with a JSON array of at most \
                 5 concise ideas and nothing else."
            }
            AiTask::SmartTags => {
                "You tag saved content for later retrieval. Reply with a JSON array of at most 5 \
                 short lowercase tags and nothing else."
            }
            AiTask::ActionItems => {
                "You turn saved content into concrete next steps. Reply with a JSON array of at \
                 most 5 actionable items, each starting with a verb, and nothing else."
            }
        }
    }

    fn patch(&self, entries: Vec<String>, now: DateTime<Utc>) -> ItemPatch {
        let mut patch = ItemPatch {
            ai_generated_at: Some(bson::DateTime::from_chrono(now)),
            ..ItemPatch::default()
        };
        match self {
            AiTask::Summary => patch.ai_summary = Some(entries),
            AiTask::KeyIdeas => patch.ai_key_ideas = Some(entries),
            AiTask::SmartTags => patch.ai_suggested_tags = Some(entries),
            AiTask::ActionItems => patch.ai_action_items = Some(entries),
        }
        patch
    }
}

/// Body of `POST /api/items/{id}/suggest-collection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSuggestion {
    pub collection_id: Option<String>,
    pub collection_name: Option<String>,
    pub item: ItemResponse,
}

/// Describe an item to the model.
pub fn item_context(item: &SavedItem) -> String {
    let mut context = format!(
        "Title: {}\nURL: {}\nPlatform: {} ({})",
        item.title, item.url, item.platform, item.content_type
    );
    if !item.notes.trim().is_empty() {
        context.push_str(&format!("\nNotes: {}", item.notes.trim()));
    }
    if !item.tags.is_empty() {
        context.push_str(&format!("\nTags: {}", item.tags.join(", ")));
    }
    context
}

fn require_llm(llm: Option<&dyn LlmClient>) -> Result<&dyn LlmClient, AppError> {
    llm.ok_or_else(|| AppError::Unavailable("AI features are not configured".into()))
}

/// Count one generation up front and run `prompt` against the model.
///
/// The generation is given back when the model call fails, so only
/// completed replies use up the allowance.
async fn complete_counted(
    users: &dyn UserRepository,
    llm: &dyn LlmClient,
    user: &User,
    now: DateTime<Utc>,
    system: &str,
    prompt: &str,
) -> Result<String, AppError> {
    let month = month_key(now);
    if !users
        .try_consume_ai_generation(&user.id, &month, ai_generation_limit(user, now))
        .await?
    {
        return Err(ai_quota_exceeded());
    }

    match llm.complete(system, prompt).await {
        Ok(reply) => Ok(reply),
        Err(err) => {
            if let Err(release_err) = users.release_ai_generation(&user.id, &month).await {
                tracing::warn!(user_id = %user.id, error = %release_err, "Failed to release AI generation");
            }
            Err(err)
        }
    }
}

/// Generate one annotation for an item, persist it and count the generation.
pub async fn process_generate(
    users: &dyn UserRepository,
    items: &dyn ItemRepository,
    llm: Option<&dyn LlmClient>,
    user: &User,
    item_id: &str,
    task: AiTask,
    now: DateTime<Utc>,
) -> Result<ItemResponse, AppError> {
    let item = find_owned_item(items, &user.id, item_id).await?;
    check_ai_quota(user, now)?;
    let llm = require_llm(llm)?;

    let reply = complete_counted(
        users,
        llm,
        user,
        now,
        task.system_prompt(),
        &item_context(&item),
    )
    .await?;
    let entries = match task {
        AiTask::SmartTags => parse_tag_reply(&reply, task.max_entries(), &item.tags),
        _ => parse_list_reply(&reply, task.max_entries()),
    };
    tracing::debug!(item_id, ?task, entries = entries.len(), "Generated AI annotation");

    let updated = items
        .update(&user.id, item_id, task.patch(entries, now))
        .await?
        .ok_or_else(item_not_found)?;

    Ok(updated.into())
}

/// Match a model reply against the user's collection names.
///
/// Exact (case-insensitive) name matches win; otherwise the first reply line
/// naming a collection is used. `none` or anything unrecognised yields `None`.
pub fn match_collection<'a>(reply: &str, collections: &'a [Collection]) -> Option<&'a Collection> {
    let clean = |s: &str| {
        s.trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
            .trim()
            .to_lowercase()
    };

    let candidates = std::iter::once(clean(reply))
        .chain(parse_list_reply(reply, usize::MAX).into_iter().map(|l| clean(&l)));

    for candidate in candidates {
        if candidate.is_empty() || candidate == "none" {
            continue;
        }
        if let Some(found) = collections
            .iter()
            .find(|c| c.name.trim().to_lowercase() == candidate)
        {
            return Some(found);
        }
    }
    None
}

/// Ask the model which existing collection fits an item best.
pub async fn process_suggest_collection(
    users: &dyn UserRepository,
    items: &dyn ItemRepository,
    collections: &dyn CollectionRepository,
    llm: Option<&dyn LlmClient>,
    user: &User,
    item_id: &str,
    now: DateTime<Utc>,
) -> Result<CollectionSuggestion, AppError> {
    let item = find_owned_item(items, &user.id, item_id).await?;
    let owned = collections.list(&user.id, None).await?;
    if owned.is_empty() {
        return Ok(CollectionSuggestion {
            collection_id: None,
            collection_name: None,
            item: item.into(),
        });
    }

    check_ai_quota(user, now)?;
    let llm = require_llm(llm)?;

    let names: Vec<&str> = owned.iter().map(|c| c.name.as_str()).collect();
    let system = "You file saved content into the user's existing collections. Reply with the \
                  exact name of the single best collection, or `none` if nothing fits.";
    let prompt = format!(
        "{}\n\nCollections:\n- {}",
        item_context(&item),
        names.join("\n- ")
    );
    let reply = complete_counted(users, llm, user, now, system, &prompt).await?;

    let chosen = match_collection(&reply, &owned);
    tracing::debug!(item_id, chosen = ?chosen.map(|c| &c.id), "Suggested collection");

    Ok(CollectionSuggestion {
        collection_id: chosen.map(|c| c.id.clone()),
        collection_name: chosen.map(|c| c.name.clone()),
        item: item.into(),
    })
}

async fn generate(
    state: AppState,
    user: User,
    item_id: String,
    task: AiTask,
) -> Result<Json<ItemResponse>, AppError> {
    let item = process_generate(
        state.users.as_ref(),
        state.items.as_ref(),
        state.llm.as_deref(),
        &user,
        &item_id,
        task,
        Utc::now(),
    )
    .await?;
    Ok(Json(item))
}

/// Axum handler for `POST /api/items/{id}/ai-summary`.
pub async fn summary_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    generate(state, user, item_id, AiTask::Summary).await
}

/// Axum handler for `POST /api/items/{id}/extract-ideas`.
pub async fn key_ideas_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    generate(state, user, item_id, AiTask::KeyIdeas).await
}

/// Axum handler for `POST /api/items/{id}/smart-tags`.
pub async fn smart_tags_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    generate(state, user, item_id, AiTask::SmartTags).await
}

/// Axum handler for `POST /api/items/{id}/action-items`.
pub async fn action_items_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    generate(state, user, item_id, AiTask::ActionItems).await
}

/// Axum handler for `POST /api/items/{id}/suggest-collection`.
pub async fn suggest_collection_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<CollectionSuggestion>, AppError> {
    let suggestion = process_suggest_collection(
        state.users.as_ref(),
        state.items.as_ref(),
        state.collections.as_ref(),
        state.llm.as_deref(),
        &user,
        &item_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(suggestion))
}
