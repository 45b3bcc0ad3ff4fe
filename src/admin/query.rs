/// Admin Query Engine
///
/// Read-only search, filter, sort and pagination over the managed
/// collections. Nothing here writes to the store.
use crate::{
    admin::{
        lifecycle::Lifecycle,
        moderation::ModeratableContent,
        reports::Report,
        users::ManagedUser,
    },
    error::{AdminError, AdminResult},
    store::{Collection, DocumentStore, Record},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Filter value meaning "no filter"
pub const FILTER_ALL: &str = "all";

const DEFAULT_SORT_FIELD: &str = "created_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query parameters for one view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryParams {
    pub search_text: Option<String>,
    pub status_filter: Option<String>,
    pub type_filter: Option<String>,
    pub priority_filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// 1-based; 0 is treated as 1
    pub page: usize,
    /// 0 means the configured default
    pub page_size: usize,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    // Any change to the result set sends the caller back to page 1.

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self.page = 1;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status_filter = Some(status.into());
        self.page = 1;
        self
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.type_filter = Some(kind.into());
        self.page = 1;
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority_filter = Some(priority.into());
        self.page = 1;
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = order;
        self.page = 1;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self.page = 1;
        self
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage<T> {
    pub items: Vec<T>,
    /// Filtered size before pagination
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Comparable projection of a sort field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Text(String),
    Number(u64),
    Instant(DateTime<Utc>),
}

/// A record type the query engine can search
pub trait Queryable: Record {
    /// Field names accepted by `sort_by`
    const SORT_FIELDS: &'static [&'static str];

    /// Values matched by free-text search
    fn search_fields(&self) -> Vec<&str>;

    fn status_token(&self) -> &str;

    fn type_token(&self) -> Option<&str>;

    /// Whether `priority_filter` applies to this collection at all
    const HAS_PRIORITY: bool = false;

    fn priority_token(&self) -> Option<&str> {
        None
    }

    /// `None` for a field this collection cannot be sorted by
    fn sort_key(&self, field: &str) -> Option<SortKey>;
}

fn matches_filter(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter.map(str::trim) {
        None | Some("") | Some(FILTER_ALL) => true,
        Some(wanted) => value == Some(wanted),
    }
}

/// Run `params` over `records`
pub fn query<T: Queryable + Clone>(
    records: &[T],
    params: &QueryParams,
    default_page_size: usize,
) -> AdminResult<QueryPage<T>> {
    let sort_field = params
        .sort_by
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SORT_FIELD);

    if !T::SORT_FIELDS.contains(&sort_field) {
        return Err(AdminError::Validation(format!(
            "Cannot sort {} by {}",
            T::COLLECTION,
            sort_field
        )));
    }

    let needle = params
        .search_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut matched: Vec<(SortKey, &T)> = Vec::new();
    for record in records {
        let Some(key) = record.sort_key(sort_field) else {
            continue;
        };

        if !matches_filter(params.status_filter.as_deref(), Some(record.status_token()))
            || !matches_filter(params.type_filter.as_deref(), record.type_token())
            || (T::HAS_PRIORITY
                && !matches_filter(params.priority_filter.as_deref(), record.priority_token()))
        {
            continue;
        }

        if let Some(needle) = &needle {
            let hit = record
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(needle.as_str()));
            if !hit {
                continue;
            }
        }

        matched.push((key, record));
    }

    matched.sort_by(|(ka, a), (kb, b)| {
        let ordering = match params.sort_order {
            SortOrder::Asc => ka.cmp(kb),
            SortOrder::Desc => kb.cmp(ka),
        };
        ordering.then_with(|| a.id().cmp(b.id()))
    });

    let page_size = if params.page_size == 0 {
        default_page_size.max(1)
    } else {
        params.page_size
    };
    let page = params.page.max(1);
    let total_count = matched.len();
    let total_pages = total_count.div_ceil(page_size);

    let items = matched
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .map(|(_, record)| record.clone())
        .collect();

    Ok(QueryPage {
        items,
        total_count,
        page,
        page_size,
        total_pages,
    })
}

fn shared_sort_key(field: &str, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Option<SortKey> {
    match field {
        "created_at" | "createdAt" => Some(SortKey::Instant(created_at)),
        "updated_at" | "updatedAt" => Some(SortKey::Instant(updated_at)),
        _ => None,
    }
}

impl Queryable for ManagedUser {
    const SORT_FIELDS: &'static [&'static str] = &[
        "name", "email", "status", "role", "created_at", "createdAt", "updated_at", "updatedAt",
    ];

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }

    fn status_token(&self) -> &str {
        self.status.as_str()
    }

    fn type_token(&self) -> Option<&str> {
        Some(self.role.as_str())
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        match field {
            "name" => Some(SortKey::Text(self.name.to_lowercase())),
            "email" => Some(SortKey::Text(self.email.to_lowercase())),
            "status" => Some(SortKey::Text(self.status.as_str().to_string())),
            "role" => Some(SortKey::Text(self.role.as_str().to_string())),
            _ => shared_sort_key(field, self.created_at, self.updated_at),
        }
    }
}

impl Queryable for Report {
    const SORT_FIELDS: &'static [&'static str] = &[
        "title", "status", "type", "priority", "created_at", "createdAt", "updated_at", "updatedAt",
    ];

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.reporter_id.as_str()];
        if let Some(reported) = &self.reported_user_id {
            fields.push(reported.as_str());
        }
        fields.push(self.description.as_str());
        fields
    }

    fn status_token(&self) -> &str {
        self.status.as_str()
    }

    fn type_token(&self) -> Option<&str> {
        Some(self.report_type.as_str())
    }

    const HAS_PRIORITY: bool = true;

    fn priority_token(&self) -> Option<&str> {
        Some(self.priority.as_str())
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        match field {
            "title" => Some(SortKey::Text(self.title.to_lowercase())),
            "status" => Some(SortKey::Text(self.status.as_str().to_string())),
            "type" => Some(SortKey::Text(self.report_type.as_str().to_string())),
            // Ordered by severity, not alphabetically
            "priority" => Some(SortKey::Number(self.priority as u64)),
            _ => shared_sort_key(field, self.created_at, self.updated_at),
        }
    }
}

impl Queryable for ModeratableContent {
    const SORT_FIELDS: &'static [&'static str] = &[
        "title",
        "status",
        "kind",
        "report_count",
        "reportCount",
        "created_at",
        "createdAt",
        "updated_at",
        "updatedAt",
    ];

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.author_id.as_str()]
    }

    fn status_token(&self) -> &str {
        self.status.as_str()
    }

    fn type_token(&self) -> Option<&str> {
        Some(self.kind.as_str())
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        match field {
            "title" => Some(SortKey::Text(self.title.to_lowercase())),
            "status" => Some(SortKey::Text(self.status.as_str().to_string())),
            "kind" => Some(SortKey::Text(self.kind.as_str().to_string())),
            "report_count" | "reportCount" => Some(SortKey::Number(u64::from(self.report_count))),
            _ => shared_sort_key(field, self.created_at, self.updated_at),
        }
    }
}

/// Query engine over the persisted collections
#[derive(Clone)]
pub struct QueryEngine {
    users: Collection<ManagedUser>,
    reports: Collection<Report>,
    content: Collection<ModeratableContent>,
    default_page_size: usize,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn DocumentStore>, default_page_size: usize) -> Self {
        Self {
            users: Collection::new(Arc::clone(&store)),
            reports: Collection::new(Arc::clone(&store)),
            content: Collection::new(store),
            default_page_size,
        }
    }

    pub async fn query_users(&self, params: &QueryParams) -> AdminResult<QueryPage<ManagedUser>> {
        query(&self.users.load_or_empty().await, params, self.default_page_size)
    }

    pub async fn query_reports(&self, params: &QueryParams) -> AdminResult<QueryPage<Report>> {
        query(&self.reports.load_or_empty().await, params, self.default_page_size)
    }

    pub async fn query_content(
        &self,
        params: &QueryParams,
    ) -> AdminResult<QueryPage<ModeratableContent>> {
        query(&self.content.load_or_empty().await, params, self.default_page_size)
    }
}
