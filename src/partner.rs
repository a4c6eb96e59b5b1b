use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::models::VolunteerSnapshot;

/// Per-organization settings for volunteer partner orgs.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrgManifest {
    #[serde(default)]
    pub math_coaching_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OrgManifests {
    manifests: HashMap<String, OrgManifest>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read org manifests from {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("org manifests in {} are not valid JSON", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl OrgManifests {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let manifests = serde_json::from_str(raw)?;
        Ok(Self { manifests })
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&OrgManifest> {
        self.manifests.get(key)
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

/// `None` for non-volunteers; unknown partner orgs are not coaching-only.
pub fn math_coaching_only(volunteer: &VolunteerSnapshot, manifests: &OrgManifests) -> Option<bool> {
    if !volunteer.is_volunteer {
        return None;
    }

    let Some(org) = volunteer.volunteer_partner_org.as_deref() else {
        return Some(false);
    };

    Some(
        manifests
            .get(org)
            .is_some_and(|manifest| manifest.math_coaching_only),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    const MANIFESTS: &str = r#"{
        "example": { "name": "Example Corp", "mathCoachingOnly": true },
        "bigcorp": { "name": "Big Corp" }
    }"#;

    fn volunteer(partner_org: Option<&str>) -> VolunteerSnapshot {
        VolunteerSnapshot {
            id: Uuid::new_v4(),
            email: "jules@example.com".to_string(),
            first_name: "Jules".to_string(),
            last_name: "Moreno".to_string(),
            created_at: Utc::now(),
            is_volunteer: true,
            volunteer_partner_org: partner_org.map(str::to_string),
            last_notification: None,
            last_session: None,
            past_sessions: None,
            phone: None,
        }
    }

    #[test]
    fn parses_manifest_json() {
        let manifests = OrgManifests::from_json(MANIFESTS).expect("manifests parse");
        assert_eq!(manifests.len(), 2);
        assert_eq!(
            manifests.get("bigcorp"),
            Some(&OrgManifest {
                math_coaching_only: false,
            })
        );
    }

    #[test]
    fn coaching_only_follows_manifest_flag() {
        let manifests = OrgManifests::from_json(MANIFESTS).expect("manifests parse");
        assert_eq!(math_coaching_only(&volunteer(Some("example")), &manifests), Some(true));
        assert_eq!(math_coaching_only(&volunteer(Some("bigcorp")), &manifests), Some(false));
        assert_eq!(math_coaching_only(&volunteer(Some("unknown")), &manifests), Some(false));
        assert_eq!(math_coaching_only(&volunteer(None), &manifests), Some(false));
    }

    #[test]
    fn students_have_no_coaching_flag() {
        let mut student = volunteer(Some("example"));
        student.is_volunteer = false;
        assert_eq!(math_coaching_only(&student, &OrgManifests::default()), None);
    }

    #[test]
    fn missing_manifest_file_reports_path() {
        let err = OrgManifests::load(Path::new("/nonexistent/orgs.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/orgs.json"));
    }
}
