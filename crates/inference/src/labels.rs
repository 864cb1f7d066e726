use crate::error::LabelLoadError;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// Class names indexed by model output position. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelStore {
    labels: Vec<String>,
}

impl LabelStore {
    /// Read a newline-delimited label file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelLoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LabelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::parse(&contents);
        if store.is_empty() {
            tracing::warn!(
                path = %path.display(),
                "Label file is empty; every prediction will be reported by index"
            );
        } else {
            tracing::info!(path = %path.display(), count = store.len(), "Loaded labels");
        }

        Ok(store)
    }

    /// Each non-blank line, trimmed, in file order.
    pub fn parse(contents: &str) -> Self {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>()
            .into()
    }

    /// Label for output class `index`.
    ///
    /// Out-of-range indices resolve to the decimal index itself rather than
    /// an error; API consumers depend on this.
    pub fn label_for(&self, index: usize) -> Cow<'_, str> {
        match self.labels.get(index) {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(index.to_string()),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.labels.len()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for LabelStore {
    fn from(labels: Vec<String>) -> Self {
        Self { labels }
    }
}
