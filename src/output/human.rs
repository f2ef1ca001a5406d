//! Human-readable output formatting

use crate::output::formatter::Listing;

/// One entry per line, ready for `eval` in the alias case
pub fn format_human(listing: &Listing) -> String {
    match listing {
        Listing::Programs(names) => names.join("\n"),
        Listing::Aliases(lines) => lines.join("\n"),
        Listing::Volumes(volumes) => volumes
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VolumeInfo;

    #[test]
    fn test_programs_one_per_line() {
        let listing = Listing::Programs(vec!["pydev".to_string(), "rb".to_string()]);
        assert_eq!(format_human(&listing), "pydev\nrb");
    }

    #[test]
    fn test_volume_names() {
        let volume = |name: &str| VolumeInfo {
            name: name.to_string(),
            driver: Some("local".to_string()),
            labels: None,
            mountpoint: None,
        };
        let listing = Listing::Volumes(vec![volume("vol1"), volume("vol2")]);
        assert_eq!(format_human(&listing), "vol1\nvol2");
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(format_human(&Listing::Aliases(Vec::new())), "");
    }
}
