use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Period granularity, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Larger granularities, nearest first.
    pub fn ancestors(self) -> &'static [Granularity] {
        match self {
            Self::Daily => &[Self::Weekly, Self::Monthly, Self::Quarterly, Self::Yearly],
            Self::Weekly => &[Self::Monthly, Self::Quarterly, Self::Yearly],
            Self::Monthly => &[Self::Quarterly, Self::Yearly],
            Self::Quarterly => &[Self::Yearly],
            Self::Yearly => &[],
        }
    }

    /// Smaller granularities, nearest first.
    pub fn descendants(self) -> &'static [Granularity] {
        match self {
            Self::Daily => &[],
            Self::Weekly => &[Self::Daily],
            Self::Monthly => &[Self::Weekly, Self::Daily],
            Self::Quarterly => &[Self::Monthly, Self::Weekly, Self::Daily],
            Self::Yearly => &[Self::Quarterly, Self::Monthly, Self::Weekly, Self::Daily],
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note in the vault, addressed by its vault-relative, `/`-separated path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub path: String,
}

impl Document {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn basename(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.strip_suffix(".md").unwrap_or(name)
    }
}

pub type DocumentRef = Arc<Document>;

/// One snapshot of the document collection as delivered by a source.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    pub version: u64,
    pub documents: Vec<DocumentRef>,
}

impl DocumentSet {
    pub fn new(version: u64, documents: Vec<DocumentRef>) -> Self {
        Self { version, documents }
    }

    pub fn from_paths<I, S>(version: u64, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version,
            documents: paths
                .into_iter()
                .map(|path| Arc::new(Document::new(path)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodItem {
    pub date: NaiveDate,
    pub granularity: Granularity,
    pub label: String,
    #[serde(rename = "path", serialize_with = "serialize_document_path")]
    pub document: Option<DocumentRef>,
    pub missing: bool,
    pub current: bool,
    pub done: bool,
}

fn serialize_document_path<S>(document: &Option<DocumentRef>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match document {
        Some(document) => serializer.serialize_some(&document.path),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "parent", rename_all = "camelCase")]
pub enum BlockReason {
    ParentMissing(Granularity),
    ParentNotSelected(Granularity),
}

impl BlockReason {
    pub fn message(self) -> String {
        match self {
            Self::ParentMissing(parent) => {
                format!("Create the {} period first.", parent.as_str())
            }
            Self::ParentNotSelected(parent) => {
                format!("Select a {} period first.", parent.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ColumnState {
    Items { granularity: Granularity, items: Vec<PeriodItem> },
    Blocked { granularity: Granularity, reason: BlockReason, message: String },
}

impl ColumnState {
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Items { granularity, .. } | Self::Blocked { granularity, .. } => *granularity,
        }
    }

    pub fn items(&self) -> &[PeriodItem] {
        match self {
            Self::Items { items, .. } => items,
            Self::Blocked { .. } => &[],
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// What the view hands a creation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub granularity: Granularity,
    pub date: NaiveDate,
    pub path: String,
    pub template_path: Option<String>,
}
