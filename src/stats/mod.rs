//! Dashboard analytics: KPI counts, chart series, the "next up" queue and list filtering.
//!
//! Status names changed over the sheet's lifetime, so both the current set
//! (Not Started / Waiting Feedback / Done / Not Doing) and the legacy set
//! (Pending / Waiting for Client / Completed / Cancelled) are recognized.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Label, RequestItem};
use crate::normalize::{days_since, parse_date};

/// Completions within this many days count towards `completed7d`.
const RECENT_DAYS: i64 = 7;

/// Days a request may wait before it is overdue.
pub fn sla_days(tier: &Label) -> i64 {
    if tier.matches("VIP") {
        2
    } else if tier.matches("Premium") {
        3
    } else {
        5
    }
}

fn tier_weight(tier: &Label) -> u8 {
    ["Basic", "Standard", "Premium", "VIP"]
        .iter()
        .position(|name| tier.matches(name))
        .map_or(0, |index| index as u8 + 1)
}

fn is_completed(status: &Label) -> bool {
    status.matches("Done") || status.matches("Completed")
}

/// Finished one way or the other.
pub fn is_closed(status: &Label) -> bool {
    is_completed(status) || status.matches("Not Doing") || status.matches("Cancelled")
}

fn is_pending(status: &Label) -> bool {
    status.matches("Not Started") || status.matches("Pending")
}

fn is_waiting(status: &Label) -> bool {
    status.matches("Waiting Feedback") || status.matches("Waiting for Client")
}

pub fn is_overdue(item: &RequestItem, now: DateTime<Utc>) -> bool {
    !is_closed(&item.status) && days_since(&item.date_requested, now) > sla_days(&item.tier)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub waiting: usize,
    pub completed: usize,
    #[serde(rename = "completed7d")]
    pub completed_7d: usize,
    pub overdue: usize,
}

pub fn compute_metrics(items: &[RequestItem], now: DateTime<Utc>) -> Metrics {
    let count = |pred: &dyn Fn(&RequestItem) -> bool| items.iter().filter(|&i| pred(i)).count();

    Metrics {
        total: items.len(),
        pending: count(&|i| is_pending(&i.status)),
        in_progress: count(&|i| i.status.matches("In Progress")),
        waiting: count(&|i| is_waiting(&i.status)),
        completed: count(&|i| is_completed(&i.status)),
        completed_7d: count(&|i| {
            is_completed(&i.status)
                && i
                    .date_completed
                    .as_deref()
                    .is_some_and(|done| days_since(done, now) <= RECENT_DAYS)
        }),
        overdue: count(&|i| is_overdue(i, now)),
    }
}

/// An active request annotated for the work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(flatten)]
    pub request: RequestItem,
    pub days_waiting: i64,
    pub overdue: bool,
    pub tier_score: u8,
}

/// Active requests, overdue first, then higher tier, then longest waiting.
pub fn next_up(items: &[RequestItem], now: DateTime<Utc>) -> Vec<QueueEntry> {
    let mut queue: Vec<QueueEntry> = items
        .iter()
        .filter(|i| !is_closed(&i.status))
        .map(|i| QueueEntry {
            days_waiting: days_since(&i.date_requested, now),
            overdue: is_overdue(i, now),
            tier_score: tier_weight(&i.tier),
            request: i.clone(),
        })
        .collect();

    queue.sort_by(|a, b| {
        b.overdue
            .cmp(&a.overdue)
            .then_with(|| b.tier_score.cmp(&a.tier_score))
            .then_with(|| b.days_waiting.cmp(&a.days_waiting))
    });
    queue
}

/// One bar/slice of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: usize,
}

/// Counts per distinct label in first-seen order; blank labels count as `Unknown`.
pub fn breakdown<'a, F>(items: &'a [RequestItem], field: F) -> Vec<ChartPoint>
where
    F: Fn(&'a RequestItem) -> &'a Label,
{
    let mut points: Vec<ChartPoint> = Vec::new();
    for item in items {
        let label = field(item);
        let name = if label.is_empty() {
            "Unknown"
        } else {
            label.as_str()
        };
        match points.iter_mut().find(|p| p.name == name) {
            Some(point) => point.value += 1,
            None => points.push(ChartPoint {
                name: name.to_string(),
                value: 1,
            }),
        }
    }
    points
}

/// Requests per day for the last seven days, oldest first, labelled by weekday.
pub fn weekly(items: &[RequestItem], now: DateTime<Utc>) -> Vec<ChartPoint> {
    let today = now.date_naive();
    (0..RECENT_DAYS)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(offset);
            let value = items
                .iter()
                .filter(|i| parse_date(&i.date_requested).is_some_and(|at| at.date_naive() == day))
                .count();
            ChartPoint {
                name: day.format("%a").to_string(),
                value,
            }
        })
        .collect()
}

/// Dashboard list filters. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    /// Case-insensitive search over patreon and character names
    pub query: Option<String>,
    pub statuses: Vec<String>,
    pub request_types: Vec<String>,
}

impl RequestFilter {
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.statuses.is_empty() && self.request_types.is_empty()
    }

    pub fn matches(&self, item: &RequestItem) -> bool {
        if !self.statuses.is_empty() && !self.statuses.iter().any(|s| item.status.matches(s)) {
            return false;
        }
        if !self.request_types.is_empty()
            && !self.request_types.iter().any(|t| item.request_type.matches(t))
        {
            return false;
        }
        match &self.query {
            Some(query) => {
                let query = query.to_lowercase();
                item.patreon_name.to_lowercase().contains(&query)
                    || item.character_name.to_lowercase().contains(&query)
            }
            None => true,
        }
    }
}

fn status_rank(status: &Label) -> usize {
    ["In Progress", "Waiting Feedback", "Not Started", "Not Doing", "Done"]
        .iter()
        .position(|name| status.matches(name))
        .unwrap_or(99)
}

/// Apply `filter`, then order by status (active work first) and oldest request first.
pub fn filter_requests(items: Vec<RequestItem>, filter: &RequestFilter) -> Vec<RequestItem> {
    let mut filtered: Vec<RequestItem> = items.into_iter().filter(|i| filter.matches(i)).collect();
    filtered.sort_by(|a, b| {
        status_rank(&a.status)
            .cmp(&status_rank(&b.status))
            .then_with(|| {
                match (parse_date(&a.date_requested), parse_date(&b.date_requested)) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => Ordering::Equal,
                }
            })
    });
    filtered
}

/// Everything the analytics page renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub metrics: Metrics,
    pub by_status: Vec<ChartPoint>,
    pub by_tier: Vec<ChartPoint>,
    pub weekly: Vec<ChartPoint>,
    pub next_up: Vec<QueueEntry>,
}

pub fn dashboard(items: &[RequestItem], now: DateTime<Utc>) -> DashboardStats {
    DashboardStats {
        metrics: compute_metrics(items, now),
        by_status: breakdown(items, |i| &i.status),
        by_tier: breakdown(items, |i| &i.tier),
        weekly: weekly(items, now),
        next_up: next_up(items, now),
    }
}
