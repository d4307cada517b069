use std::path::PathBuf;

/// Where the dataset comes from and how to ask for it.
///
/// ```text
/// ┌──────────────┬─────────────────────────┬────────────────────────────────┐
/// │ Field        │ Default                 │ Purpose                        │
/// ├──────────────┼─────────────────────────┼────────────────────────────────┤
/// │ server_url   │ http://localhost:3000   │ Base URL of the load service   │
/// │ dataset_name │ datapackage             │ Dataset and shm region name    │
/// │ data_dir     │ ../Data/owid-deaths/    │ Directory holding the dataset  │
/// │ suffix       │ (empty)                 │ Picks an alternative dataset   │
/// │ load_csv     │ true                    │ Ask the service to inline CSVs │
/// └──────────────┴─────────────────────────┴────────────────────────────────┘
/// ```
///
/// The dataset name doubles as the name of the shared memory region the
/// service publishes, so both sides agree on it without further setup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub server_url: String,
    pub dataset_name: String,
    pub data_dir: PathBuf,
    /// Appended to the dataset name to form the file name, so
    /// `datapackage` with suffix `_big` loads `datapackage_big.json`.
    pub suffix: String,
    /// When false, the service leaves CSV resources as paths instead of
    /// loading them into tables.
    pub load_csv: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_owned(),
            dataset_name: "datapackage".to_owned(),
            data_dir: PathBuf::from("../Data/owid-deaths/"),
            suffix: String::new(),
            load_csv: true,
        }
    }
}

impl SessionConfig {
    /// The dataset file the service is asked to load:
    /// `{data_dir}/{dataset_name}{suffix}.json`.
    #[must_use]
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}{}.json", self.dataset_name, self.suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path() {
        assert_eq!(
            SessionConfig::default().dataset_path(),
            PathBuf::from("../Data/owid-deaths/datapackage.json")
        );
    }

    #[test]
    fn suffix_selects_alternative_dataset() {
        let config = SessionConfig {
            suffix: "_10x".into(),
            data_dir: PathBuf::from("/data"),
            ..SessionConfig::default()
        };
        assert_eq!(
            config.dataset_path(),
            PathBuf::from("/data/datapackage_10x.json")
        );
    }
}
