//! Inventory listing filters.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use diskscope_core::{FileRecord, FolderRecord, Inventory};

/// Broad file category derived from the extension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum FileCategory {
    Images,
    Music,
    Videos,
    Documents,
    Archives,
    System,
}

impl FileCategory {
    /// Normalized extensions (lower-case, leading dot) in this category.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Images => &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp", ".svg"],
            Self::Music => &[".mp3", ".wav", ".aac", ".flac", ".ogg", ".wma", ".m4a"],
            Self::Videos => &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm"],
            Self::Documents => &[
                ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".rtf", ".csv",
            ],
            Self::Archives => &[".zip", ".rar", ".7z", ".tar", ".gz", ".iso", ".jar"],
            Self::System => &[".exe", ".dll", ".sys", ".ini", ".drv", ".bat", ".sh"],
        }
    }

    /// Category of a normalized extension, if any.
    pub fn of_extension(extension: &str) -> Option<Self> {
        Self::iter().find(|c| c.extensions().contains(&extension))
    }

    /// Whether `extension` belongs to this category.
    pub fn contains(self, extension: &str) -> bool {
        self.extensions().contains(&extension)
    }
}

/// Criteria for narrowing an inventory listing. Empty criteria match
/// everything; all set criteria must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFilter {
    /// Case-insensitive substring of the full path.
    pub text: Option<String>,
    /// Inclusive lower size bound in bytes.
    pub min_size: Option<u64>,
    /// Inclusive upper size bound in bytes.
    pub max_size: Option<u64>,
    /// Extension must fall in one of these categories.
    pub categories: Vec<FileCategory>,
}

impl InventoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn category(mut self, category: FileCategory) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    /// Check a file against every criterion.
    pub fn matches(&self, file: &FileRecord) -> bool {
        self.check(&file.path, file.size, &file.extension)
    }

    /// Check a folder; folders never match a category.
    pub fn matches_folder(&self, folder: &FolderRecord) -> bool {
        self.check(&folder.path, folder.size, &folder.extension)
    }

    /// Files of `inventory` that pass, in inventory order.
    pub fn apply<'a>(&self, inventory: &'a Inventory) -> Vec<&'a FileRecord> {
        inventory.files.iter().filter(|f| self.matches(f)).collect()
    }

    fn check(&self, path: &Path, size: u64, extension: &str) -> bool {
        if let Some(text) = &self.text {
            if !path.to_string_lossy().to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        if self.min_size.is_some_and(|min| size < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| size > max) {
            return false;
        }
        self.categories.is_empty() || self.categories.iter().any(|c| c.contains(extension))
    }
}
