//! Browse query: search, filter, sort and paginate stored records.
//!
//! This is the dashboard read path. It operates on records already loaded
//! from a [`Collection`](crate::store::Collection), so every store gets the
//! same semantics.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attr::{Attribute, StoredRecord};
use crate::field::trust_score;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 500;

/// Filter keys the dashboard sends that differ from storage keys.
const FILTER_ALIASES: &[(&str, &str)] = &[
    ("department", "departments"),
    ("pastCompany", "pastCompanies"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => bail!("invalid sort order: '{}'. Must be asc or desc.", other),
        }
    }
}

/// Parameters of one browse request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: SortOrder,
    /// 1-based.
    pub page: usize,
    pub size: usize,
    pub filters: Vec<(String, String)>,
}

impl Default for BrowseQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: None,
            order: SortOrder::Asc,
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            filters: Vec::new(),
        }
    }
}

/// A field as shown to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub value: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub trust_score: u32,
}

/// A stored record as shown to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: String,
    #[serde(flatten)]
    pub fields: BTreeMap<&'static str, FieldView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub records: Vec<RecordView>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

fn resolve_attr<A: Attribute>(key: &str) -> Option<A> {
    let key = FILTER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, target)| *target)
        .unwrap_or(key);
    A::from_key(key)
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Run `query` over `records`.
///
/// Fails on an unknown sort or filter key and on a page size outside
/// `1..=MAX_PAGE_SIZE`.
pub fn browse<A: Attribute>(
    mut records: Vec<StoredRecord<A>>,
    query: &BrowseQuery,
    now: DateTime<Utc>,
) -> Result<Page> {
    if query.size == 0 || query.size > MAX_PAGE_SIZE {
        bail!("page size must be between 1 and {}", MAX_PAGE_SIZE);
    }
    if query.page == 0 {
        bail!("page must be >= 1");
    }

    let mut filters: Vec<(A, String)> = Vec::new();
    for (key, value) in &query.filters {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match resolve_attr::<A>(key) {
            Some(attr) => filters.push((attr, value.to_lowercase())),
            None => bail!("invalid filter key: '{}'", key),
        }
    }

    let sort_attr = match query.sort.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(key) => match resolve_attr::<A>(key) {
            Some(attr) => Some(attr),
            None => bail!("invalid sort key: '{}'", key),
        },
    };

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    records.retain(|stored| {
        let matches_search = search.as_deref().map_or(true, |needle| {
            stored
                .record
                .iter()
                .any(|(_, f)| f.text().is_some_and(|v| contains_ci(v, needle)))
        });
        matches_search
            && filters.iter().all(|(attr, needle)| {
                stored
                    .record
                    .text(*attr)
                    .is_some_and(|v| contains_ci(v, needle))
            })
    });

    match sort_attr {
        Some(attr) => records.sort_by(|a, b| {
            let ord = match (a.record.text(attr), b.record.text(attr)) {
                (Some(x), Some(y)) => {
                    let ord = x.to_lowercase().cmp(&y.to_lowercase());
                    if query.order == SortOrder::Desc {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
                // Missing values sort last in either direction.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            ord.then_with(|| a.id.cmp(&b.id))
        }),
        None => records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
    }

    let total = records.len();
    let total_pages = total.div_ceil(query.size);
    // Saturates for huge page numbers, which simply lands past the end.
    let offset = query.page.saturating_sub(1).saturating_mul(query.size);
    let records = records
        .into_iter()
        .skip(offset)
        .take(query.size)
        .map(|stored| view(stored, now))
        .collect();

    Ok(Page {
        records,
        total,
        page: query.page,
        total_pages,
    })
}

/// Render a stored record with per-field trust scores.
pub fn view<A: Attribute>(stored: StoredRecord<A>, now: DateTime<Utc>) -> RecordView {
    let fields = stored
        .record
        .iter()
        .map(|(attr, f)| {
            (
                attr.key(),
                FieldView {
                    value: f.value.clone(),
                    last_updated: f.last_updated,
                    trust_score: trust_score(f.last_updated, now),
                },
            )
        })
        .collect();
    RecordView {
        id: stored.id,
        fields,
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    }
}
