//! Embedded sample requests served when no remote source answers.

use crate::models::RawRequest;

struct SeedRow {
    id: &'static str,
    patreon_name: &'static str,
    status: &'static str,
    character_name: &'static str,
    origin: &'static str,
    request_type: &'static str,
    date_requested: &'static str,
    notes: &'static str,
}

const SEED_ROWS: &[SeedRow] = &[
    SeedRow {
        id: "dummy-1",
        patreon_name: "naopHASAMI",
        status: "In Progress",
        character_name: "Chisaki Hiradaira",
        origin: "Nagi no Asu kara",
        request_type: "Not Poll",
        date_requested: "2025-12-30",
        notes: "",
    },
    SeedRow {
        id: "dummy-2",
        patreon_name: "joe su",
        status: "In Progress",
        character_name: "Latticenail",
        origin: "Ansatsusha de Aru...",
        request_type: "Not Poll",
        date_requested: "2026-01-02",
        notes: "",
    },
    SeedRow {
        id: "dummy-3",
        patreon_name: "SinnamonSymon66",
        status: "Not Started",
        character_name: "Sadayo Kawakami",
        origin: "Persona 5",
        request_type: "Not Poll",
        date_requested: "2026-01-04",
        notes: "",
    },
    SeedRow {
        id: "dummy-4",
        patreon_name: "Tim Hu",
        status: "Not Started",
        character_name: "Nijika Ijichi",
        origin: "Bocchi the Rock!",
        request_type: "Not Poll",
        date_requested: "2026-01-11",
        notes: "",
    },
    SeedRow {
        id: "dummy-5",
        patreon_name: "SuperFan99",
        status: "In Progress",
        character_name: "Eldric the Mage",
        origin: "Original Character",
        request_type: "Portrait",
        date_requested: "2026-01-15",
        notes: "High detail required",
    },
];

/// The sample list, as raw records ready for normalization.
pub fn seed_requests() -> Vec<RawRequest> {
    SEED_ROWS
        .iter()
        .map(|row| RawRequest {
            id: Some(row.id.to_string()),
            patreon_name: Some(row.patreon_name.to_string()),
            tier: Some("Tier 4".to_string()),
            character_name: Some(row.character_name.to_string()),
            origin: Some(row.origin.to_string()),
            request_type: Some(row.request_type.to_string()),
            status: Some(row.status.to_string()),
            priority: Some("Normal".to_string()),
            date_requested: Some(row.date_requested.to_string()),
            revision_count: Some(0),
            notes: Some(row.notes.to_string()),
            details: Some(String::new()),
            ..RawRequest::default()
        })
        .collect()
}
