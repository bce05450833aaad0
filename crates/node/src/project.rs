// Path: crates/node/src/project.rs
//! The project map: resolves the tag a proof carries in its public witness
//! to a `(project_name, verifiers)` pair for explorer reporting.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One project entry from the map file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Project {
    /// Display name reported to the explorer.
    pub project_name: String,
    /// Verifier identifiers attached to this project's proofs.
    pub verifiers: Vec<String>,
}

impl Project {
    fn anonymous() -> Self {
        Self {
            project_name: "Anonymous".to_string(),
            verifiers: vec!["Unknown".to_string()],
        }
    }
}

/// Loads `project_id → Project` from a JSON file and resolves witness tags.
pub struct ProjectManager {
    projects: HashMap<String, Project>,
}

impl ProjectManager {
    /// Load the map. A missing or broken file logs and starts empty — every
    /// lookup then resolves to the anonymous project.
    pub fn load(path: &Path) -> Self {
        let projects = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(projects) => projects,
                Err(e) => {
                    tracing::error!(target: "project", path = %path.display(), error = %e, "project map unparsable");
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::error!(target: "project", path = %path.display(), error = %e, "project map unreadable");
                HashMap::new()
            }
        };
        tracing::info!(target: "project", count = projects.len(), "projects loaded");
        Self { projects }
    }

    /// Resolve a witness tag.
    ///
    /// A five-digit tag matches the map directly. Longer tags are decoded
    /// as pairs of decimal ASCII codes (`"4948..."` → `"10..."`); pairs
    /// that do not decode to a digit are skipped. Odd-length tags and
    /// unknown ids resolve to the anonymous project.
    pub fn get_project(&self, tag: &str) -> Project {
        if tag.len() == 5 {
            return self
                .projects
                .get(tag)
                .cloned()
                .unwrap_or_else(Project::anonymous);
        }
        if tag.len() % 2 != 0 {
            tracing::warn!(target: "project", %tag, "odd-length project tag");
            return Project::anonymous();
        }
        let mut clean_id = String::new();
        for chunk in tag.as_bytes().chunks(2) {
            let Ok(pair) = std::str::from_utf8(chunk) else {
                continue;
            };
            let Ok(code) = pair.parse::<u32>() else {
                continue;
            };
            match char::from_u32(code) {
                Some(c) if c.is_ascii_digit() => clean_id.push(c),
                _ => continue,
            }
        }
        self.projects
            .get(&clean_id)
            .cloned()
            .unwrap_or_else(Project::anonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ProjectManager {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(
            &path,
            r#"{
                "10005": {"project_name": "tiga", "verifiers": ["v-tiga"]},
                "10006": {"project_name": "binance", "verifiers": ["v-bn1", "v-bn2"]}
            }"#,
        )
        .unwrap();
        ProjectManager::load(&path)
    }

    #[test]
    fn five_digit_tags_match_directly() {
        let projects = manager();
        assert_eq!(projects.get_project("10005").project_name, "tiga");
        assert_eq!(projects.get_project("10006").verifiers.len(), 2);
    }

    #[test]
    fn unknown_tags_resolve_to_anonymous() {
        let projects = manager();
        let p = projects.get_project("99999");
        assert_eq!(p.project_name, "Anonymous");
        assert_eq!(p.verifiers, vec!["Unknown".to_string()]);
    }

    #[test]
    fn long_tags_decode_as_ascii_pairs() {
        let projects = manager();
        // "1" = 49, "0" = 48, "5" = 53 → "4948484853" decodes to "10005".
        assert_eq!(projects.get_project("4948484853").project_name, "tiga");
    }

    #[test]
    fn odd_length_tags_are_anonymous() {
        let projects = manager();
        assert_eq!(projects.get_project("494").project_name, "Anonymous");
    }

    #[test]
    fn missing_map_file_resolves_everything_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let projects = ProjectManager::load(&dir.path().join("absent.json"));
        assert_eq!(projects.get_project("10005").project_name, "Anonymous");
    }
}
