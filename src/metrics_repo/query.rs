// Query builder for the metric measurement. Every query selects codec::COLUMNS in order.

use super::codec::{COLUMNS, MEASUREMENT};
use crate::store::{quote_ident, quote_literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOrder {
    /// Most recent first.
    Descending,
    /// Left to the store (window scans feeding aggregation).
    Unordered,
}

/// Exact-match `app` (and `resource`) over an inclusive millisecond time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricQuery<'a> {
    pub app: &'a str,
    pub resource: Option<&'a str>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub order: TimeOrder,
}

impl<'a> MetricQuery<'a> {
    /// One resource of one app, most recent first.
    pub fn range(app: &'a str, resource: &'a str, start_ms: i64, end_ms: i64) -> Self {
        Self {
            app,
            resource: Some(resource),
            start_ms,
            end_ms,
            order: TimeOrder::Descending,
        }
    }

    /// Every resource of one app, unordered.
    pub fn window(app: &'a str, start_ms: i64, end_ms: i64) -> Self {
        Self {
            app,
            resource: None,
            start_ms,
            end_ms,
            order: TimeOrder::Unordered,
        }
    }

    /// SQL text, or `None` when the query is rejected (blank app, blank resource when
    /// scoped, or a value that cannot be quoted). A rejected query must not be issued.
    pub fn build(&self) -> Option<String> {
        if self.app.trim().is_empty() {
            return None;
        }
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            projection(),
            quote_ident(MEASUREMENT),
            quote_ident("app"),
            quote_literal(self.app)?
        );
        if let Some(resource) = self.resource {
            if resource.trim().is_empty() {
                return None;
            }
            sql.push_str(&format!(
                " AND {} = {}",
                quote_ident("resource"),
                quote_literal(resource)?
            ));
        }
        let time = quote_ident("time");
        sql.push_str(&format!(
            " AND {time} >= {} AND {time} <= {}",
            self.start_ms, self.end_ms
        ));
        if self.order == TimeOrder::Descending {
            sql.push_str(&format!(" ORDER BY {time} DESC"));
        }
        Some(sql)
    }
}

/// Quoted, comma-separated column list in contract order.
pub fn projection() -> String {
    COLUMNS
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}
