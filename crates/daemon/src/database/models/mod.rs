mod broadcast;
mod pointer;
mod report;
mod reviewer;
mod reviewer_request;

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

pub use broadcast::{Broadcast, NewBroadcast};
pub use pointer::{NewPointer, Pointer};
pub use report::{NewReport, Report};
pub use reviewer::{Counter, NewReviewer, Reviewer};
pub use reviewer_request::{NewReviewerRequest, ReviewerRequest, Transition};

/// Optional filters shared by the reviewer and pointer listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
    /// A single grade token, matched against the comma-joined grade set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    /// Exact subject match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Case-insensitive substring over the record's text columns (see
    /// [`push_text_match`] for how case is folded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl CatalogFilter {
    pub fn grade(grade: impl Into<String>) -> Self {
        Self {
            grade: Some(grade.into()),
            ..Default::default()
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Append the `WHERE` fragments for `filter` to a query that already ends in a
/// `WHERE` clause, followed by ordering and the clamped limit.
pub(crate) fn push_filter(
    qb: &mut QueryBuilder<'_, Sqlite>,
    filter: &CatalogFilter,
    text_columns: &[TextColumn],
    max_limit: u32,
) {
    if let Some(grade) = non_blank(&filter.grade) {
        qb.push(" AND instr(',' || grade_level || ',', ',' || ")
            .push_bind(grade.to_string())
            .push(" || ',') > 0");
    }

    if let Some(subject) = non_blank(&filter.subject) {
        qb.push(" AND subject = ").push_bind(subject.to_string());
    }

    if let Some(q) = non_blank(&filter.q) {
        push_text_match(qb, q, text_columns);
    }

    let limit = filter.limit.unwrap_or(max_limit).clamp(1, max_limit);
    qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
        .push_bind(i64::from(limit));
}

/// A searchable column of a catalog table.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TextColumn {
    Plain(&'static str),
    /// JSON array of strings; matched per element, never on the raw JSON text.
    JsonArray(&'static str),
}

/// ` AND (instr(lower(a), ?) > 0 OR EXISTS (... json_each(b) ...) ...)`
///
/// The needle is lowercased with full Unicode folding. SQLite's `lower()` only
/// folds ASCII, so stored non-ASCII capitals (`Á`) still only match themselves.
pub(crate) fn push_text_match(
    qb: &mut QueryBuilder<'_, Sqlite>,
    needle: &str,
    columns: &[TextColumn],
) {
    let needle = needle.to_lowercase();
    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        match column {
            TextColumn::Plain(name) => {
                qb.push("instr(lower(")
                    .push(*name)
                    .push("), ")
                    .push_bind(needle.clone())
                    .push(") > 0");
            }
            TextColumn::JsonArray(name) => {
                qb.push("EXISTS (SELECT 1 FROM json_each(")
                    .push(*name)
                    .push(") WHERE instr(lower(json_each.value), ")
                    .push_bind(needle.clone())
                    .push(") > 0)");
            }
        }
    }
    qb.push(")");
}
