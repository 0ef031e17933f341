/// Blob storage data models
use crate::error::{VidError, VidResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Top-level partition of the storage root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobCategory {
    Videos,
    Thumbnails,
    Avatars,
}

impl BlobCategory {
    pub const ALL: [BlobCategory; 3] = [
        BlobCategory::Videos,
        BlobCategory::Thumbnails,
        BlobCategory::Avatars,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlobCategory::Videos => "videos",
            BlobCategory::Thumbnails => "thumbnails",
            BlobCategory::Avatars => "avatars",
        }
    }

    fn from_dir(dir: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == dir)
    }
}

impl fmt::Display for BlobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative path of a blob: `<category>/<name>`
///
/// This is the string persisted in metadata rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobReference {
    category: BlobCategory,
    name: String,
}

impl BlobReference {
    pub fn new(category: BlobCategory, name: impl Into<String>) -> VidResult<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(VidError::Validation(format!("Invalid blob name: {}", name)));
        }
        Ok(Self { category, name })
    }

    /// Parse a stored reference, rejecting anything that could escape the storage root
    pub fn parse(reference: &str) -> VidResult<Self> {
        let (dir, name) = reference
            .split_once('/')
            .ok_or_else(|| VidError::Validation(format!("Invalid blob reference: {}", reference)))?;

        let category = BlobCategory::from_dir(dir)
            .ok_or_else(|| VidError::Validation(format!("Unknown blob category: {}", dir)))?;

        Self::new(category, name)
    }

    /// Generate a collision-resistant name keeping the original extension
    ///
    /// Format: `{unix_millis}-{uuid_v4_simple}{.ext}`
    pub fn generate(category: BlobCategory, original_name: &str) -> Self {
        let name = format!(
            "{}-{}{}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple(),
            sanitized_extension(original_name)
        );
        Self { category, name }
    }

    pub fn category(&self) -> BlobCategory {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BlobReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

/// Lower-cased `.ext` of the original filename, or empty if unusable
fn sanitized_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Result of committing a payload to the store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlob {
    pub reference: String,
    pub size: u64,
    pub mime_type: String,
}

/// Outcome of a delete; a missing blob is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Listing entry used by the reconciliation sweep
#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub reference: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}
