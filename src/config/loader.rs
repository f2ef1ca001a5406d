//! Config source discovery, decoding and merging

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SandockError};

/// Dot-file names probed in every directory, first existing wins
pub const DOT_CONFIG_NAMES: [&str; 4] = [".sandock.yml", ".sandock.yaml", ".sandock.json", ".sandock"];

/// Top-level collections whose entries are replaced wholesale when merging
const NAMED_COLLECTIONS: [&str; 4] = ["programs", "volumes", "images", "networks"];

/// First sandock dot-file present in `directory`
pub fn dot_config_finder(directory: &Path) -> Option<PathBuf> {
    DOT_CONFIG_NAMES
        .iter()
        .map(|name| directory.join(name))
        .find(|candidate| candidate.exists())
}

/// Resolve the main configuration path
///
/// Precedence: explicit path, then the environment path, then the dot-file in
/// the home directory, then the dot-file in the current directory (skipped when
/// the current directory is the home directory).
pub fn main_config_finder(
    explicit: Option<&Path>,
    env_path: Option<&str>,
    home_dir: &Path,
    current_dir: &Path,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    if let Some(path) = dot_config_finder(home_dir) {
        return Some(path);
    }

    if current_dir == home_dir {
        return None;
    }

    dot_config_finder(current_dir)
}

pub fn json_decoder(content: &str) -> Result<Value> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(feature = "yaml")]
pub fn yaml_decoder(content: &str) -> Result<Value> {
    Ok(serde_yaml::from_str(content)?)
}

#[cfg(not(feature = "yaml"))]
pub fn yaml_decoder(_content: &str) -> Result<Value> {
    Err(SandockError::config(
        "yaml support is not available in this build, use a json configuration",
    ))
}

/// Read and decode one config file, choosing the codec by extension
pub fn load_config_file(path: &Path) -> Result<Value> {
    debug!(path = %path.display(), "loading config file");
    let content = fs::read_to_string(path)?;

    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => yaml_decoder(&content)?,
        Some("json") => json_decoder(&content)?,
        // extension-less dot-file, JSON is a YAML subset but gives better errors
        _ => match json_decoder(&content) {
            Ok(value) => value,
            Err(_) => yaml_decoder(&content)?,
        },
    };

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(SandockError::config(format!(
            "configuration `{}` must contain a mapping at the top level",
            path.display()
        ))),
    }
}

/// Merge `overlay` onto `base`
///
/// Maps merge key by key, any other value in `overlay` replaces the one in
/// `base` (lists are not concatenated). Entries of the top-level named
/// collections are replaced as a whole.
pub fn merge_configs(base: &mut Value, overlay: &Value) {
    merge_at(base, overlay, 0);
}

fn merge_at(base: &mut Value, overlay: &Value, depth: usize) {
    if !(base.is_object() && overlay.is_object()) {
        *base = overlay.clone();
        return;
    }
    let (Some(base_map), Some(overlay_map)) = (base.as_object_mut(), overlay.as_object()) else {
        return;
    };

    for (key, value) in overlay_map {
        let wholesale = depth == 0 && NAMED_COLLECTIONS.contains(&key.as_str());

        match (base_map.get_mut(key), value) {
            // an empty section such as a bare `programs:` adds nothing
            (Some(_), Value::Null) if wholesale => {}
            (Some(Value::Object(existing)), Value::Object(entries)) if wholesale => {
                for (name, definition) in entries {
                    existing.insert(name.clone(), definition.clone());
                }
            }
            (Some(existing), _) if !wholesale => merge_at(existing, value, depth + 1),
            _ => {
                base_map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_dot_config_finder_order() {
        let temp_dir = TempDir::new().unwrap();
        assert!(dot_config_finder(temp_dir.path()).is_none());

        // create in reverse so every step has a higher priority candidate
        for name in DOT_CONFIG_NAMES.iter().rev() {
            File::create(temp_dir.path().join(name)).unwrap();
            assert_eq!(
                dot_config_finder(temp_dir.path()),
                Some(temp_dir.path().join(name))
            );
        }
    }

    #[test]
    fn test_main_config_finder_precedence() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        File::create(home.path().join(".sandock.json")).unwrap();
        File::create(cwd.path().join(".sandock")).unwrap();

        let explicit = Path::new("/to/the/path");
        assert_eq!(
            main_config_finder(Some(explicit), Some("/mention/in/env"), home.path(), cwd.path()),
            Some(PathBuf::from("/to/the/path"))
        );
        assert_eq!(
            main_config_finder(None, Some("/mention/in/env"), home.path(), cwd.path()),
            Some(PathBuf::from("/mention/in/env"))
        );
        assert_eq!(
            main_config_finder(None, None, home.path(), cwd.path()),
            Some(home.path().join(".sandock.json"))
        );

        File::create(home.path().join(".sandock.yml")).unwrap();
        assert_eq!(
            main_config_finder(None, None, home.path(), cwd.path()),
            Some(home.path().join(".sandock.yml"))
        );
    }

    #[test]
    fn test_main_config_finder_current_dir() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        File::create(cwd.path().join(".sandock")).unwrap();

        assert_eq!(
            main_config_finder(None, None, home.path(), cwd.path()),
            Some(cwd.path().join(".sandock"))
        );
        assert_eq!(
            main_config_finder(None, Some(""), home.path(), cwd.path()),
            Some(cwd.path().join(".sandock"))
        );
    }

    #[test]
    fn test_main_config_finder_in_home_dir() {
        let home = TempDir::new().unwrap();
        assert!(main_config_finder(None, None, home.path(), home.path()).is_none());
    }

    #[test]
    fn test_json_decoder() {
        assert_eq!(
            json_decoder(r#"{"hello": {"this": "is world"}}"#).unwrap(),
            json!({"hello": {"this": "is world"}})
        );
        assert!(matches!(json_decoder("{broken"), Err(SandockError::Json(_))));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_decoder() {
        assert_eq!(
            yaml_decoder("hello:\n    this: is world\n").unwrap(),
            json!({"hello": {"this": "is world"}})
        );
        assert!(matches!(yaml_decoder("a: [b"), Err(SandockError::Yaml(_))));
    }

    #[cfg(not(feature = "yaml"))]
    #[test]
    fn test_yaml_decoder_unavailable() {
        assert!(matches!(yaml_decoder("hello: world"), Err(SandockError::Config(_))));
    }

    #[test]
    fn test_load_config_file_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("conf.json");
        fs::write(&json_path, r#"{"programs": {"a": {"image": "x", "exec": "y"}}}"#).unwrap();
        assert_eq!(load_config_file(&json_path).unwrap()["programs"]["a"]["image"], "x");

        let bare = temp_dir.path().join(".sandock");
        fs::write(&bare, r#"{"volumes": {}}"#).unwrap();
        assert_eq!(load_config_file(&bare).unwrap(), json!({"volumes": {}}));

        let list = temp_dir.path().join("list.json");
        fs::write(&list, "[1, 2]").unwrap();
        assert!(matches!(load_config_file(&list), Err(SandockError::Config(_))));

        assert!(matches!(
            load_config_file(&temp_dir.path().join("missing.json")),
            Err(SandockError::IoError(_))
        ));
    }

    #[test]
    fn test_merge_replaces_leaves() {
        let mut base = json!({
            "execution": {"docker_bin": "docker", "container_name_prefix": "sb-"},
            "config": {"includes": ["/a", "/b"]}
        });
        merge_configs(
            &mut base,
            &json!({"execution": {"docker_bin": "podman"}, "config": {"includes": ["/c"]}}),
        );

        assert_eq!(
            base,
            json!({
                "execution": {"docker_bin": "podman", "container_name_prefix": "sb-"},
                "config": {"includes": ["/c"]}
            })
        );
    }

    #[test]
    fn test_merge_named_collections_wholesale() {
        let mut base = json!({
            "programs": {
                "py311": {"image": "python:3.11", "exec": "python3", "network": "host"},
                "go122": {"image": "golang:1.22", "exec": "go"}
            }
        });
        merge_configs(
            &mut base,
            &json!({"programs": {
                "py311": {"image": "python:3.11-slim", "exec": "python3"},
                "rb": {"image": "ruby:3.3", "exec": "ruby"}
            }}),
        );

        assert_eq!(
            base["programs"]["py311"],
            json!({"image": "python:3.11-slim", "exec": "python3"})
        );
        assert_eq!(base["programs"]["go122"]["exec"], "go");
        assert_eq!(base["programs"]["rb"]["exec"], "ruby");
        let order: Vec<&String> = base["programs"].as_object().unwrap().keys().collect();
        assert_eq!(order, vec!["py311", "go122", "rb"]);

        // empty sections in a later source keep what was declared before
        merge_configs(&mut base, &json!({"programs": null, "volumes": {}}));
        assert_eq!(base["programs"]["go122"]["exec"], "go");
        assert_eq!(base["programs"].as_object().unwrap().len(), 3);
        assert_eq!(base["volumes"], json!({}));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let config = json!({
            "execution": {"docker_bin": "podman"},
            "programs": {"a": {"image": "x", "exec": "y", "env": {"K": "V"}}},
            "volumes": {"v": {}}
        });
        let mut merged = config.clone();
        merge_configs(&mut merged, &config);
        assert_eq!(merged, config);
    }
}
