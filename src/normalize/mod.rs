//! Turns partial records from any source into complete [`RequestItem`]s.
//!
//! Normalization is idempotent: feeding a normalized record back in (with the same `now`)
//! yields the identical record. Ids are only synthesized when the source supplied none.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::models::{Label, Priority, RawRequest, RequestItem};

const MS_PER_DAY: i64 = 86_400_000;

/// Placeholder for requests that arrive without a patron name.
pub const UNKNOWN_PATRON: &str = "Unknown";

/// Normalize one record. `position_index` feeds the `req-<n>` fallback id.
pub fn normalize(raw: RawRequest, position_index: usize, now: DateTime<Utc>) -> RequestItem {
    let (date_requested, requested_at) = raw
        .date_requested
        .as_deref()
        .map(str::trim)
        .and_then(|s| parse_date(s).map(|at| (s.to_string(), at)))
        .unwrap_or_else(|| (timestamp(now), now));

    let tier = Label::new(raw.tier.unwrap_or_default());
    let priority = raw
        .priority
        .as_deref()
        .and_then(Priority::parse)
        .unwrap_or_else(|| priority_from_tier(&tier));

    let patreon_name = raw
        .patreon_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_PATRON.to_string());

    RequestItem {
        id: non_blank(raw.id).unwrap_or_else(|| format!("req-{position_index}")),
        patreon_name,
        tier,
        character_name: raw.character_name.unwrap_or_default().trim().to_string(),
        origin: raw.origin.unwrap_or_default(),
        request_type: Label::new(raw.request_type.unwrap_or_default()),
        status: Label::new(raw.status.unwrap_or_default()),
        priority,
        date_requested,
        date_started: non_blank(raw.date_started),
        date_completed: non_blank(raw.date_completed),
        revision_count: raw
            .revision_count
            .map_or(0, |n| u32::try_from(n.max(0)).unwrap_or(u32::MAX)),
        notes: raw.notes.unwrap_or_default(),
        details: raw.details.unwrap_or_default(),
        days_since_request: days_between(requested_at, now),
    }
}

/// Normalize a whole list, using array position for fallback ids.
pub fn normalize_all(raws: Vec<RawRequest>, now: DateTime<Utc>) -> Vec<RequestItem> {
    raws.into_iter()
        .enumerate()
        .map(|(index, raw)| normalize(raw, index, now))
        .collect()
}

/// Merge a partial patch into a normalized record and re-derive computed fields.
///
/// A tier change without an explicit priority re-derives the priority from the new tier.
pub fn apply_patch(item: &RequestItem, patch: &RawRequest, now: DateTime<Utc>) -> RequestItem {
    let mut raw = RawRequest::from(item.clone());
    if patch.tier.is_some() && patch.priority.is_none() {
        raw.priority = None;
    }
    raw.merge(patch);
    normalize(raw, 0, now)
}

/// Fixed tier → priority mapping. Unknown tiers get [`Priority::Normal`].
pub fn priority_from_tier(tier: &Label) -> Priority {
    if tier.matches("VIP") {
        Priority::High
    } else if tier.matches("Premium") {
        Priority::Medium
    } else if tier.matches("Basic") {
        Priority::Low
    } else {
        Priority::Normal
    }
}

/// Whole days from `date` to `now`, never negative.
pub fn days_between(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - date)
        .num_milliseconds()
        .div_euclid(MS_PER_DAY)
        .max(0)
}

/// Days since an ISO date string; unparseable dates count as today.
pub fn days_since(date: &str, now: DateTime<Utc>) -> i64 {
    parse_date(date).map_or(0, |at| days_between(at, now))
}

/// Parse the date shapes that show up in the sheet, the CSV export and old local snapshots.
///
/// Naive values are taken as UTC; date-only values are midnight.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    ["%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Timestamp format used for defaulted dates.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Short random id for records created locally.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_fills_defaults() {
        let item = normalize(RawRequest::default(), 3, now());

        assert_eq!(item.id, "req-3");
        assert_eq!(item.patreon_name, UNKNOWN_PATRON);
        assert_eq!(item.priority, Priority::Normal);
        assert_eq!(item.revision_count, 0);
        assert_eq!(item.date_requested, "2026-01-20T15:30:00.000Z");
        assert_eq!(item.days_since_request, 0);
        assert!(item.notes.is_empty());
        assert!(item.details.is_empty());
        assert!(item.date_started.is_none());
    }

    #[test]
    fn test_never_overwrites_supplied_id() {
        let raw = RawRequest {
            id: Some("dummy-1".to_string()),
            ..Default::default()
        };
        assert_eq!(normalize(raw, 9, now()).id, "dummy-1");
    }

    #[test]
    fn test_idempotent() {
        let raws = [
            RawRequest::default(),
            RawRequest {
                patreon_name: Some("  naopHASAMI ".to_string()),
                tier: Some("VIP".to_string()),
                date_requested: Some("2025-12-30".to_string()),
                revision_count: Some(-2),
                date_started: Some("   ".to_string()),
                ..Default::default()
            },
            RawRequest {
                id: Some("x".to_string()),
                priority: Some("low".to_string()),
                date_requested: Some("not a date".to_string()),
                status: Some("Waiting Feedback".to_string()),
                ..Default::default()
            },
        ];

        for (index, raw) in raws.into_iter().enumerate() {
            let once = normalize(raw, index, now());
            let twice = normalize(once.clone().into(), index, now());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_days_since_request_floors_and_clamps() {
        let raw = RawRequest {
            date_requested: Some("2026-01-18T16:00:00Z".to_string()),
            ..Default::default()
        };
        // 1 day 23.5 hours
        assert_eq!(normalize(raw, 0, now()).days_since_request, 1);

        let future = RawRequest {
            date_requested: Some("2026-03-01".to_string()),
            ..Default::default()
        };
        assert_eq!(normalize(future, 0, now()).days_since_request, 0);
    }

    #[test]
    fn test_days_since_request_matches_formula() {
        let requested = Utc.with_ymd_and_hms(2025, 12, 30, 0, 0, 0).unwrap();
        let expected = (now() - requested).num_milliseconds() / MS_PER_DAY;
        assert_eq!(days_since("2025-12-30", now()), expected);
        assert_eq!(expected, 21);
    }

    #[test]
    fn test_priority_derived_from_tier() {
        for (tier, expected) in [
            ("VIP", Priority::High),
            ("Premium", Priority::Medium),
            ("Standard", Priority::Normal),
            ("Basic", Priority::Low),
            ("Tier 4", Priority::Normal),
        ] {
            let raw = RawRequest {
                tier: Some(tier.to_string()),
                ..Default::default()
            };
            assert_eq!(normalize(raw, 0, now()).priority, expected, "tier {tier}");
        }
    }

    #[test]
    fn test_explicit_priority_wins_over_tier() {
        let raw = RawRequest {
            tier: Some("VIP".to_string()),
            priority: Some("Low".to_string()),
            ..Default::default()
        };
        assert_eq!(normalize(raw, 0, now()).priority, Priority::Low);
    }

    #[test]
    fn test_parse_date_shapes() {
        let midnight = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2026-01-02"), Some(midnight));
        assert_eq!(parse_date("1/2/2026"), Some(midnight));
        assert_eq!(parse_date("2026-01-02T00:00:00"), Some(midnight));
        assert_eq!(parse_date("2026-01-02T00:00:00.000Z"), Some(midnight));
        assert_eq!(parse_date("2026-01-02T01:00:00+01:00"), Some(midnight));
        assert_eq!(
            parse_date("12/30/2025 14:05:00"),
            Some(Utc.with_ymd_and_hms(2025, 12, 30, 14, 5, 0).unwrap())
        );
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_apply_patch_only_touches_patched_fields() {
        let before = normalize(
            RawRequest {
                id: Some("req-4".to_string()),
                patreon_name: Some("Tim Hu".to_string()),
                tier: Some("Tier 4".to_string()),
                status: Some("Not Started".to_string()),
                date_requested: Some("2026-01-11".to_string()),
                revision_count: Some(1),
                ..Default::default()
            },
            0,
            now(),
        );
        let patch = RawRequest {
            status: Some("Done".to_string()),
            ..Default::default()
        };

        let after = apply_patch(&before, &patch, now());

        assert_eq!(after.status.as_str(), "Done");
        let mut expected = before.clone();
        expected.status = Label::new("Done");
        assert_eq!(after, expected);
    }

    #[test]
    fn test_sheet_datetime_is_kept() {
        let item = normalize(
            RawRequest {
                date_requested: Some("1/10/2026 09:30:00".to_string()),
                ..Default::default()
            },
            0,
            now(),
        );
        assert_eq!(item.date_requested, "1/10/2026 09:30:00");
        assert_eq!(item.days_since_request, 10);
    }

    #[test]
    fn test_tier_change_rederives_priority() {
        let before = normalize(
            RawRequest {
                tier: Some("Standard".to_string()),
                ..Default::default()
            },
            0,
            now(),
        );
        assert_eq!(before.priority, Priority::Normal);

        let tier_only = RawRequest {
            tier: Some("VIP".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_patch(&before, &tier_only, now()).priority, Priority::High);

        let with_priority = RawRequest {
            tier: Some("VIP".to_string()),
            priority: Some("Low".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_patch(&before, &with_priority, now()).priority, Priority::Low);

        // untouched tier keeps an explicitly chosen priority
        let pinned = apply_patch(&before, &with_priority, now());
        let status_only = RawRequest {
            status: Some("Done".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_patch(&pinned, &status_only, now()).priority, Priority::Low);
    }

    #[test]
    fn test_generate_id_is_short() {
        let id = generate_id();
        assert_eq!(id.len(), 8);
        assert_ne!(id, generate_id());
    }
}
