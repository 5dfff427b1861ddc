use crate::errors::{NavError, NavResult};
use crate::models::{CreateRequest, Document, DocumentRef, DocumentSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies the full document collection, stamped with a version that
/// grows on every refresh.
pub trait DocumentSource {
    fn load(&mut self) -> NavResult<DocumentSet>;
}

/// Creates the backing note for a missing period.
pub trait DocumentCreator {
    fn create(&mut self, request: &CreateRequest) -> NavResult<DocumentRef>;
}

/// Markdown notes under a directory on disk.
#[derive(Debug, Clone)]
pub struct VaultSource {
    root: PathBuf,
    version: u64,
}

impl VaultSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            version: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan_dir(&self, dir: &Path, documents: &mut Vec<DocumentRef>) -> NavResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(error) => {
                    tracing::warn!(path = %path.to_string_lossy(), error = %error, "skipping unreadable vault entry");
                    continue;
                }
            };
            if file_type.is_dir() {
                if let Err(error) = self.scan_dir(&path, documents) {
                    tracing::warn!(path = %path.to_string_lossy(), error = %error, "skipping unreadable vault folder");
                }
                continue;
            }
            if !is_note_file(&path) {
                continue;
            }
            if let Some(relative) = vault_relative(&self.root, &path) {
                documents.push(Arc::new(Document::new(relative)));
            }
        }
        Ok(())
    }
}

impl DocumentSource for VaultSource {
    fn load(&mut self) -> NavResult<DocumentSet> {
        if !self.root.is_dir() {
            return Err(NavError::NotFound(format!(
                "Vault directory does not exist: {}",
                self.root.to_string_lossy()
            )));
        }
        let mut documents = Vec::new();
        self.scan_dir(&self.root, &mut documents)?;
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        self.version += 1;
        tracing::info!(version = self.version, count = documents.len(), "scanned vault");
        Ok(DocumentSet::new(self.version, documents))
    }
}

impl DocumentCreator for VaultSource {
    fn create(&mut self, request: &CreateRequest) -> NavResult<DocumentRef> {
        let target = self.root.join(&request.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let body = match request.template_path.as_deref() {
            Some(template) if !template.trim().is_empty() => {
                fs::read(self.root.join(template)).map_err(|error| {
                    NavError::Create(format!("Cannot read template {}: {}", template, error))
                })?
            }
            _ => Vec::new(),
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|error| NavError::Create(format!("{}: {}", request.path, error)))?;
        file.write_all(&body)?;

        tracing::info!(path = %request.path, granularity = %request.granularity, "created period note");
        Ok(Arc::new(Document::new(request.path.clone())))
    }
}

fn is_note_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|value| value.to_str()), Some("md"))
}

fn vault_relative(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Granularity;
    use chrono::NaiveDate;

    fn temp_root() -> tempfile::TempDir {
        tempfile::tempdir().expect("temp vault root")
    }

    #[test]
    fn scans_markdown_and_skips_dot_folders() {
        let root = temp_root();
        fs::create_dir_all(root.path().join("Journal/Daily")).expect("mkdir");
        fs::create_dir_all(root.path().join(".obsidian")).expect("mkdir");
        fs::write(root.path().join("Journal/Daily/2024-01-08.md"), "").expect("write");
        fs::write(root.path().join("2024.md"), "").expect("write");
        fs::write(root.path().join("image.png"), "").expect("write");
        fs::write(root.path().join(".obsidian/workspace.md"), "").expect("write");

        let mut source = VaultSource::new(root.path());
        let set = source.load().expect("scan vault");
        let paths: Vec<&str> = set.documents.iter().map(|doc| doc.path.as_str()).collect();
        assert_eq!(paths, vec!["2024.md", "Journal/Daily/2024-01-08.md"]);
        assert_eq!(set.version, 1);
        assert_eq!(source.load().expect("rescan").version, 2);
    }

    #[test]
    fn missing_vault_is_not_found() {
        let root = temp_root();
        let mut source = VaultSource::new(root.path().join("nope"));
        let error = source.load().expect_err("missing vault");
        assert!(error.to_string().starts_with("NOT_FOUND"));
    }

    #[test]
    fn creates_note_from_template_once() {
        let root = temp_root();
        fs::write(root.path().join("template.md"), "# Weekly\n").expect("write template");
        let mut source = VaultSource::new(root.path());
        let request = CreateRequest {
            granularity: Granularity::Weekly,
            date: NaiveDate::from_ymd_opt(2024, 12, 30).expect("date"),
            path: "Weeks/2025-W01.md".to_string(),
            template_path: Some("template.md".to_string()),
        };

        let document = source.create(&request).expect("create");
        assert_eq!(document.path, "Weeks/2025-W01.md");
        let written = fs::read_to_string(root.path().join("Weeks/2025-W01.md")).expect("read back");
        assert_eq!(written, "# Weekly\n");

        let error = source.create(&request).expect_err("second create fails");
        assert!(error.to_string().starts_with("CREATE_FAILED"));
    }
}
