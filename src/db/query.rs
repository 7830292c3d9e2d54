use bson::{doc, Bson, DateTime, Document};

use crate::db::models::SavedItem;

/// Item fields that free-text search can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Notes,
    Tags,
    Platform,
    Url,
    Summary,
}

impl SearchField {
    /// Fields covered by the basic search endpoint.
    pub const BASIC: [SearchField; 5] = [
        SearchField::Title,
        SearchField::Notes,
        SearchField::Tags,
        SearchField::Platform,
        SearchField::Url,
    ];

    /// Every searchable field (advanced search default).
    pub const ALL: [SearchField; 6] = [
        SearchField::Title,
        SearchField::Notes,
        SearchField::Tags,
        SearchField::Platform,
        SearchField::Url,
        SearchField::Summary,
    ];

    /// Parse a field name as used in the `search_in` query parameter.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Some(SearchField::Title),
            "notes" => Some(SearchField::Notes),
            "tags" => Some(SearchField::Tags),
            "platform" => Some(SearchField::Platform),
            "url" => Some(SearchField::Url),
            "summary" | "ai_summary" => Some(SearchField::Summary),
            _ => None,
        }
    }

    /// Name exposed to API clients.
    pub fn name(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Notes => "notes",
            SearchField::Tags => "tags",
            SearchField::Platform => "platform",
            SearchField::Url => "url",
            SearchField::Summary => "ai_summary",
        }
    }

    /// Path of the field inside the stored document.
    fn document_path(&self) -> &'static str {
        match self {
            SearchField::Summary => "ai.summary",
            other => other.name(),
        }
    }

    fn values<'a>(&self, item: &'a SavedItem) -> Vec<&'a str> {
        match self {
            SearchField::Title => vec![item.title.as_str()],
            SearchField::Notes => vec![item.notes.as_str()],
            SearchField::Tags => item.tags.iter().map(String::as_str).collect(),
            SearchField::Platform => vec![item.platform.as_str()],
            SearchField::Url => vec![item.url.as_str()],
            SearchField::Summary => item.ai.summary.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    /// `oldest` sorts ascending; anything else is newest-first.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("oldest") {
            SortOrder::Oldest
        } else {
            SortOrder::Newest
        }
    }

    fn direction(&self) -> i32 {
        match self {
            SortOrder::Newest => -1,
            SortOrder::Oldest => 1,
        }
    }
}

/// Filter, sort and cap applied when listing or searching a user's items.
#[derive(Debug, Clone)]
pub struct ItemQuery {
    /// Case-insensitive literal substring matched against `fields`.
    pub text: Option<String>,
    pub fields: Vec<SearchField>,
    pub platform: Option<String>,
    pub content_type: Option<String>,
    pub tag: Option<String>,
    pub collection: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime>,
    pub sort: SortOrder,
    pub limit: usize,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            text: None,
            fields: SearchField::BASIC.to_vec(),
            platform: None,
            content_type: None,
            tag: None,
            collection: None,
            created_from: None,
            created_to: None,
            sort: SortOrder::Newest,
            limit: 1000,
        }
    }
}

impl ItemQuery {
    /// Build the MongoDB filter for this query, scoped to `user_id`.
    pub fn to_filter(&self, user_id: &str) -> Document {
        let mut filter = doc! { "user_id": user_id };

        if let Some(platform) = &self.platform {
            filter.insert("platform", platform.as_str());
        }
        if let Some(content_type) = &self.content_type {
            filter.insert("content_type", content_type.as_str());
        }
        if let Some(tag) = &self.tag {
            filter.insert("tags", tag.as_str());
        }
        if let Some(collection) = &self.collection {
            filter.insert("collections", collection.as_str());
        }

        let mut range = Document::new();
        if let Some(from) = self.created_from {
            range.insert("$gte", from);
        }
        if let Some(to) = self.created_to {
            range.insert("$lte", to);
        }
        if !range.is_empty() {
            filter.insert("created_at", range);
        }

        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            let pattern = regex::escape(text);
            let clauses: Vec<Bson> = self
                .fields
                .iter()
                .map(|field| {
                    let mut clause = Document::new();
                    clause.insert(
                        field.document_path(),
                        doc! { "$regex": pattern.as_str(), "$options": "i" },
                    );
                    Bson::Document(clause)
                })
                .collect();
            filter.insert("$or", clauses);
        }

        filter
    }

    /// MongoDB sort specification. `_id` breaks ties between equal timestamps.
    pub fn sort_document(&self) -> Document {
        let direction = self.sort.direction();
        doc! { "created_at": direction, "_id": direction }
    }

    /// In-process equivalent of [`ItemQuery::to_filter`], minus the owner check.
    pub fn matches(&self, item: &SavedItem) -> bool {
        if self.platform.as_ref().is_some_and(|p| &item.platform != p) {
            return false;
        }
        if self
            .content_type
            .as_ref()
            .is_some_and(|c| &item.content_type != c)
        {
            return false;
        }
        if self.tag.as_ref().is_some_and(|t| !item.tags.contains(t)) {
            return false;
        }
        if self
            .collection
            .as_ref()
            .is_some_and(|c| !item.collections.contains(c))
        {
            return false;
        }
        if self.created_from.is_some_and(|from| item.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| item.created_at > to) {
            return false;
        }

        match self.text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => {
                let needle = text.to_lowercase();
                self.fields.iter().any(|field| {
                    field
                        .values(item)
                        .iter()
                        .any(|value| value.to_lowercase().contains(&needle))
                })
            }
            None => true,
        }
    }
}
