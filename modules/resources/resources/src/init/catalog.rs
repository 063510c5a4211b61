//! The seed catalog: required navigation resources grouped by application.

use std::path::Path;

use serde::Deserialize;

use crate::error::InitError;

const BUILTIN: &str = include_str!("../../seed/resources.yaml");

/// One required resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedEntry {
    pub alias: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub description: String,
    /// Also the initial display order of an inserted row.
    #[serde(default)]
    pub group_order: i32,
    #[serde(default)]
    pub step: i32,
}

/// Resources owned by one application, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedApplication {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<SeedEntry>,
}

/// Ordered list of required resources.
///
/// Entries are applied in document order; a repeated `(alias, app)` pair is
/// applied again, so the later entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedCatalog {
    #[serde(default)]
    applications: Vec<SeedApplication>,
}

impl SeedCatalog {
    /// The catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Catalog` if the embedded document is malformed.
    pub fn builtin() -> Result<Self, InitError> {
        Self::from_yaml_str(BUILTIN)
    }

    /// Parses and validates a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Catalog` on malformed YAML, unknown fields, or an
    /// entry without an alias or application name.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, InitError> {
        let catalog: Self =
            serde_saphyr::from_str(yaml).map_err(|e| InitError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reads a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Catalog` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, InitError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| InitError::Catalog(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    #[must_use]
    pub fn applications(&self) -> &[SeedApplication] {
        &self.applications
    }

    /// Distinct application names in first-seen order.
    #[must_use]
    pub fn app_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for app in &self.applications {
            if !names.contains(&app.name.as_str()) {
                names.push(&app.name);
            }
        }
        names
    }

    /// Total number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applications.iter().map(|a| a.resources.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in application order, paired with their application name.
    ///
    /// With a filter, only applications whose name matches it ignoring case
    /// are yielded.
    pub fn entries<'a>(
        &'a self,
        app_filter: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a SeedEntry)> + 'a {
        let filter = app_filter.map(str::to_lowercase);
        self.applications
            .iter()
            .filter(move |app| {
                filter
                    .as_deref()
                    .is_none_or(|f| app.name.to_lowercase() == f)
            })
            .flat_map(|app| {
                app.resources
                    .iter()
                    .map(move |entry| (app.name.as_str(), entry))
            })
    }

    fn validate(&self) -> Result<(), InitError> {
        for (index, app) in self.applications.iter().enumerate() {
            if app.name.trim().is_empty() {
                return Err(InitError::Catalog(format!(
                    "applications[{index}] has an empty name"
                )));
            }
            if let Some(pos) = app.resources.iter().position(|e| e.alias.trim().is_empty()) {
                return Err(InitError::Catalog(format!(
                    "{}: resources[{pos}] has an empty alias",
                    app.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_shape() {
        let catalog = SeedCatalog::builtin().unwrap();

        assert_eq!(catalog.len(), 239);
        assert_eq!(
            catalog.app_names(),
            [
                "VisualAcademy",
                "DotNetNote",
                "DevLec",
                "Hawaso",
                "MemoEngine",
                "JavaCampus",
                "Portal",
                "EmployeeLicensing",
                "VendorLicensing",
                "InternalAudit",
                "ReportWriter",
                "SAT",
            ]
        );
        assert_eq!(catalog.entries(Some("VisualAcademy")).count(), 20);
        assert_eq!(catalog.entries(Some("SAT")).count(), 19);
    }

    #[test]
    fn test_builtin_home_entry() {
        let catalog = SeedCatalog::builtin().unwrap();
        let (app, home) = catalog.entries(Some("VisualAcademy")).next().unwrap();

        assert_eq!(app, "VisualAcademy");
        assert_eq!(home.alias, "Home");
        assert_eq!(home.title, "Home");
        assert_eq!(home.route, "/");
        assert_eq!(home.description, "Main landing page");
        assert_eq!(home.group_order, 1);
        assert_eq!(home.step, 0);
    }

    #[test]
    fn test_filter_ignores_case() {
        let catalog = SeedCatalog::builtin().unwrap();

        assert_eq!(catalog.entries(Some("visualacademy")).count(), 20);
        assert_eq!(catalog.entries(Some("NoSuchApp")).count(), 0);
        assert_eq!(catalog.entries(None).count(), 239);
    }

    #[test]
    fn test_duplicate_alias_kept_in_order() {
        let catalog = SeedCatalog::builtin().unwrap();
        let users: Vec<&SeedEntry> = catalog
            .entries(Some("SAT"))
            .filter(|(_, e)| e.alias == "Users")
            .map(|(_, e)| e)
            .collect();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].title, "Users");
        assert_eq!(users[1].title, "User Roles");
        assert_eq!(users[1].group_order, 8);
    }

    #[test]
    fn test_missing_fields_default() {
        let yaml = "applications:\n  - name: Demo\n    resources:\n      - { alias: Start }\n";
        let catalog = SeedCatalog::from_yaml_str(yaml).unwrap();
        let (_, entry) = catalog.entries(None).next().unwrap();

        assert_eq!(entry.title, "");
        assert_eq!(entry.group_order, 0);
    }

    #[test]
    fn test_empty_alias_rejected() {
        let yaml = "applications:\n  - name: Demo\n    resources:\n      - { alias: \"  \", title: X }\n";
        let err = SeedCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, InitError::Catalog(ref msg) if msg.contains("Demo")), "{err}");
    }

    #[test]
    fn test_empty_app_name_rejected() {
        let yaml = "applications:\n  - name: \"\"\n    resources: []\n";
        assert!(matches!(
            SeedCatalog::from_yaml_str(yaml),
            Err(InitError::Catalog(_))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "applications:\n  - name: Demo\n    resources:\n      - { alias: A, order: 1 }\n";
        assert!(matches!(
            SeedCatalog::from_yaml_str(yaml),
            Err(InitError::Catalog(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "applications:\n  - name: Demo\n    resources:\n      - { alias: A, group_order: 3 }\n",
        )
        .unwrap();

        let catalog = SeedCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 1);

        let missing = SeedCatalog::load(&dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(InitError::Catalog(_))));
    }
}
