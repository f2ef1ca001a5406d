//! Output formatting

use crate::output::human::format_human;
use crate::output::json::format_json;
use crate::volume::VolumeInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// What a listing command prints
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Programs(Vec<String>),
    Aliases(Vec<String>),
    Volumes(Vec<VolumeInfo>),
}

pub fn format_output(listing: &Listing, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(listing),
        OutputFormat::Json => format_json(listing),
    }
}
