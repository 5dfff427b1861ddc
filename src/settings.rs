use crate::date_format::{self, DateFormat};
use crate::errors::{NavError, NavResult};
use crate::models::{Document, Granularity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeriodSettings {
    pub enabled: bool,
    pub folder: String,
    pub format: String,
    pub template_path: Option<String>,
}

impl PeriodSettings {
    pub fn for_granularity(granularity: Granularity) -> Self {
        Self {
            enabled: true,
            folder: String::new(),
            format: date_format::default_format(granularity).to_string(),
            template_path: None,
        }
    }
}

impl Default for PeriodSettings {
    fn default() -> Self {
        Self::for_granularity(Granularity::Daily)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigatorSettings {
    pub daily: PeriodSettings,
    pub weekly: PeriodSettings,
    pub monthly: PeriodSettings,
    pub quarterly: PeriodSettings,
    pub yearly: PeriodSettings,
    pub require_parent_document: bool,
    pub require_parent_selection: bool,
    pub debounce_ms: u64,
    pub item_height: f64,
    pub buffer_items: usize,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            daily: PeriodSettings::for_granularity(Granularity::Daily),
            weekly: PeriodSettings::for_granularity(Granularity::Weekly),
            monthly: PeriodSettings::for_granularity(Granularity::Monthly),
            quarterly: PeriodSettings::for_granularity(Granularity::Quarterly),
            yearly: PeriodSettings::for_granularity(Granularity::Yearly),
            require_parent_document: true,
            require_parent_selection: false,
            debounce_ms: 300,
            item_height: 28.0,
            buffer_items: 5,
        }
    }
}

impl NavigatorSettings {
    /// Reads `.json`, `.yaml` or `.yml` settings, layered over the defaults.
    pub fn load(path: &Path) -> NavResult<Self> {
        let raw = fs::read_to_string(path)?;
        let value: serde_json::Value = match path.extension().and_then(|value| value.to_str()) {
            Some("json") => serde_json::from_str(&raw)?,
            Some("yaml" | "yml") => serde_yaml::from_str(&raw)?,
            _ => {
                return Err(NavError::Settings(format!(
                    "Unsupported settings file extension: {}",
                    path.to_string_lossy()
                )))
            }
        };
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::default().merged(value)
    }

    /// Deep-merges a partial JSON patch over the current values.
    pub fn merged(&self, update: serde_json::Value) -> NavResult<Self> {
        let mut merged = serde_json::to_value(self)?;
        merge_json(&mut merged, update);
        let settings: Self = serde_json::from_value(merged)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> NavResult<()> {
        for granularity in Granularity::ALL {
            let period = self.period(granularity);
            if period.enabled {
                DateFormat::compile(&period.format).map_err(|error| {
                    NavError::Settings(format!("{} format '{}': {}", granularity, period.format, error))
                })?;
            }
        }
        if !(self.item_height > 0.0) {
            return Err(NavError::Settings(format!(
                "itemHeight must be positive, got {}",
                self.item_height
            )));
        }
        Ok(())
    }

    pub fn period(&self, granularity: Granularity) -> &PeriodSettings {
        match granularity {
            Granularity::Daily => &self.daily,
            Granularity::Weekly => &self.weekly,
            Granularity::Monthly => &self.monthly,
            Granularity::Quarterly => &self.quarterly,
            Granularity::Yearly => &self.yearly,
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = Granularity> + '_ {
        Granularity::ALL
            .into_iter()
            .filter(|granularity| self.period(*granularity).enabled)
    }
}

/// Compiled formats of the enabled granularities plus folder ownership rules.
#[derive(Debug, Clone)]
pub struct FormatSet {
    folders: HashMap<Granularity, String>,
    formats: HashMap<Granularity, DateFormat>,
}

impl FormatSet {
    pub fn new(settings: &NavigatorSettings) -> NavResult<Self> {
        let mut folders = HashMap::new();
        let mut formats = HashMap::new();
        for granularity in settings.enabled() {
            let period = settings.period(granularity);
            folders.insert(granularity, period.folder.trim_matches('/').to_string());
            formats.insert(granularity, DateFormat::compile(&period.format)?);
        }
        Ok(Self { folders, formats })
    }

    pub fn format(&self, granularity: Granularity) -> Option<&DateFormat> {
        self.formats.get(&granularity)
    }

    pub fn folder(&self, granularity: Granularity) -> Option<&str> {
        self.folders.get(&granularity).map(String::as_str)
    }

    /// Granularity owning `document`: the enabled one whose folder is the
    /// longest prefix of its path. Granularities sharing that folder are
    /// told apart by which format decodes the name, smallest first.
    pub fn owner(&self, document: &Document) -> Option<Granularity> {
        let mut best: Option<usize> = None;
        let mut candidates: Vec<Granularity> = Vec::new();
        for granularity in Granularity::ALL {
            let Some(folder) = self.folders.get(&granularity) else {
                continue;
            };
            if !folder_contains(folder, &document.path) {
                continue;
            }
            match best {
                Some(len) if folder.len() < len => continue,
                Some(len) if folder.len() == len => candidates.push(granularity),
                _ => {
                    best = Some(folder.len());
                    candidates.clear();
                    candidates.push(granularity);
                }
            }
        }

        if candidates.len() <= 1 {
            return candidates.first().copied();
        }
        candidates.into_iter().find(|granularity| {
            let folder = self.folders.get(granularity).map(String::as_str).unwrap_or("");
            self.formats
                .get(granularity)
                .and_then(|format| date_format::extract_date(document, folder, format))
                .is_some()
        })
    }

    /// Vault-relative path a new note for `date` should live at.
    pub fn path_for(&self, granularity: Granularity, date: chrono::NaiveDate) -> Option<String> {
        let format = self.formats.get(&granularity)?;
        let folder = self.folders.get(&granularity)?;
        let name = format.format(date);
        if folder.is_empty() {
            Some(format!("{}.md", name))
        } else {
            Some(format!("{}/{}.md", folder, name))
        }
    }
}

fn folder_contains(folder: &str, path: &str) -> bool {
    if folder.is_empty() {
        return true;
    }
    path.strip_prefix(folder)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        let settings = NavigatorSettings::default();
        settings.validate().expect("defaults validate");
        assert_eq!(settings.weekly.format, "GGGG-[W]WW");
        assert_eq!(settings.enabled().count(), 5);
    }

    #[test]
    fn merge_patches_nested_values() {
        let settings = NavigatorSettings::default()
            .merged(json!({ "daily": { "folder": "Journal/Daily" }, "yearly": { "enabled": false } }))
            .expect("merge");
        assert_eq!(settings.daily.folder, "Journal/Daily");
        assert_eq!(settings.daily.format, "YYYY-MM-DD");
        assert!(!settings.yearly.enabled);

        let error = NavigatorSettings::default()
            .merged(json!({ "weekly": { "format": "[week]" } }))
            .expect_err("tokenless format rejected");
        assert!(error.to_string().contains("SETTINGS_INVALID"));
    }

    #[test]
    fn loads_yaml_with_partial_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nav.yaml");
        fs::write(&path, "monthly:\n  folder: Months\ndebounceMs: 50\n").expect("write settings");
        let settings = NavigatorSettings::load(&path).expect("load yaml");
        assert_eq!(settings.monthly.folder, "Months");
        assert_eq!(settings.monthly.format, "YYYY-MM");
        assert!(settings.monthly.enabled);
        assert_eq!(settings.debounce_ms, 50);
        assert_eq!(settings.daily, PeriodSettings::for_granularity(Granularity::Daily));
    }

    #[test]
    fn owner_prefers_longest_folder_then_format() {
        let settings = NavigatorSettings::default()
            .merged(json!({ "daily": { "folder": "Journal/Daily" }, "weekly": { "folder": "Journal" } }))
            .expect("merge");
        let formats = FormatSet::new(&settings).expect("formats");

        assert_eq!(formats.owner(&Document::new("Journal/Daily/2024-01-08.md")), Some(Granularity::Daily));
        assert_eq!(formats.owner(&Document::new("Journal/2024-W02.md")), Some(Granularity::Weekly));
        assert_eq!(formats.owner(&Document::new("2024-Q1.md")), Some(Granularity::Quarterly));
        assert_eq!(formats.owner(&Document::new("2024.md")), Some(Granularity::Yearly));
        assert_eq!(formats.owner(&Document::new("notes/idea.md")), None);
        assert_eq!(
            formats.path_for(Granularity::Daily, chrono::NaiveDate::from_ymd_opt(2024, 1, 8).expect("date")),
            Some("Journal/Daily/2024-01-08.md".to_string())
        );
    }
}
