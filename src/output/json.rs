//! JSON output formatting

use serde_json::{json, Value};

use crate::output::formatter::Listing;

pub fn format_json(listing: &Listing) -> String {
    let data: Value = match listing {
        Listing::Programs(names) => json!(names),
        Listing::Aliases(lines) => json!(lines),
        Listing::Volumes(volumes) => serde_json::to_value(volumes).unwrap_or(json!([])),
    };

    serde_json::to_string_pretty(&data).unwrap_or_else(|_| "[]".to_string())
}
