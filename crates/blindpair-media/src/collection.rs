//! Model output collections.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use blindpair_models::identity::is_video_filename;
use blindpair_models::Identity;

use crate::error::{MediaError, MediaResult};

/// The outputs of one model, addressable by identity.
pub trait VideoCollection: Send + Sync {
    /// Model name of this collection.
    fn model(&self) -> &str;

    /// All identities present, sorted.
    fn identities(&self) -> Vec<Identity>;

    /// Location of the output for `identity`.
    fn locate(&self, identity: &Identity) -> Option<PathBuf>;
}

/// A flat directory of video files, one per identity (`<identity>.<ext>`).
#[derive(Debug, Clone)]
pub struct DirectoryCollection {
    model: String,
    root: PathBuf,
    files: BTreeMap<Identity, PathBuf>,
}

impl DirectoryCollection {
    /// Scan `root` for video files.
    ///
    /// When two files share a stem (`clip.mp4`, `clip.mov`) the first in
    /// name order is kept.
    pub fn scan(model: impl Into<String>, root: impl AsRef<Path>) -> MediaResult<Self> {
        let model = model.into();
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(MediaError::DirectoryNotFound(root));
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_video_filename(&name) {
                names.push(name);
            }
        }
        names.sort();

        let mut files = BTreeMap::new();
        for name in names {
            let identity = match Identity::from_filename(&name) {
                Ok(id) => id,
                Err(e) => {
                    warn!(model = %model, file = %name, error = %e, "Skipping unusable file name");
                    continue;
                }
            };
            if files.contains_key(&identity) {
                warn!(model = %model, file = %name, "Duplicate identity, keeping first file");
                continue;
            }
            files.insert(identity, root.join(&name));
        }

        debug!(model = %model, root = %root.display(), videos = files.len(), "Scanned collection");
        Ok(Self { model, root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl VideoCollection for DirectoryCollection {
    fn model(&self) -> &str {
        &self.model
    }

    fn identities(&self) -> Vec<Identity> {
        self.files.keys().cloned().collect()
    }

    fn locate(&self, identity: &Identity) -> Option<PathBuf> {
        self.files.get(identity).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_lists_videos_by_stem() {
        let dir = TempDir::new().unwrap();
        for name in ["b.mp4", "a.mp4", "notes.txt", "a.mov"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let collection = DirectoryCollection::scan("foo", dir.path()).unwrap();
        let ids: Vec<String> = collection
            .identities()
            .into_iter()
            .map(|i| i.0)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(collection.model(), "foo");

        // "a.mov" sorts before "a.mp4"
        let located = collection.locate(&Identity::new("a").unwrap()).unwrap();
        assert_eq!(located.file_name().unwrap(), "a.mov");
        assert!(collection.locate(&Identity::new("c").unwrap()).is_none());
    }

    #[test]
    fn test_missing_directory() {
        let err = DirectoryCollection::scan("foo", "/no/such/dir").unwrap_err();
        assert!(matches!(err, MediaError::DirectoryNotFound(_)));
    }
}
