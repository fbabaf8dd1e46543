//! Video index mappings.
//!
//! Result codes refer to comparison videos by position. The mapping file
//! written next to each pair's videos pins that position down:
//!
//! ```text
//! # foo_vs_bar Video Index Mapping
//! # Format: index:filename
//! 0:v1_comparison.mp4
//! 1:v2_comparison.mp4
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

use crate::error::{StudyError, StudyResult};

/// index -> comparison filename for one pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMapping {
    files: BTreeMap<usize, String>,
}

impl IndexMapping {
    /// Build a mapping from filenames, indexed in sorted order.
    pub fn from_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = files.into_iter().map(Into::into).collect();
        sorted.sort();
        sorted.dedup();
        Self {
            files: sorted.into_iter().enumerate().collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.files.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn render(&self, pair_name: &str) -> String {
        let mut out = format!("# {} Video Index Mapping\n# Format: index:filename\n", pair_name);
        for (index, file) in &self.files {
            out.push_str(&format!("{}:{}\n", index, file));
        }
        out
    }

    /// Parse mapping text; `#` lines and blank lines are skipped.
    pub fn parse(text: &str) -> StudyResult<Self> {
        let mut files = BTreeMap::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (index, file) = line.split_once(':').ok_or_else(|| {
                StudyError::invalid_mapping(format!("line {}: expected index:filename", n + 1))
            })?;
            let index: usize = index.trim().parse().map_err(|_| {
                StudyError::invalid_mapping(format!("line {}: bad index {:?}", n + 1, index))
            })?;
            let file = file.trim();
            if file.is_empty() {
                return Err(StudyError::invalid_mapping(format!(
                    "line {}: empty filename",
                    n + 1
                )));
            }
            files.insert(index, file.to_string());
        }
        Ok(Self { files })
    }

    pub async fn load(path: &Path) -> StudyResult<Self> {
        Self::parse(&fs::read_to_string(path).await?)
    }

    pub async fn write(&self, path: &Path, pair_name: &str) -> StudyResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.render(pair_name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_files_sorts() {
        let mapping = IndexMapping::from_files(["b_comparison.mp4", "a_comparison.mp4"]);
        assert_eq!(mapping.get(0), Some("a_comparison.mp4"));
        assert_eq!(mapping.get(1), Some("b_comparison.mp4"));
        assert_eq!(mapping.get(2), None);
    }

    #[test]
    fn test_render_format() {
        let mapping = IndexMapping::from_files(["v1_comparison.mp4"]);
        assert_eq!(
            mapping.render("foo_vs_bar"),
            "# foo_vs_bar Video Index Mapping\n# Format: index:filename\n0:v1_comparison.mp4\n"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(IndexMapping::parse("# header\nzero:v1.mp4\n").is_err());
        assert!(IndexMapping::parse("0\n").is_err());
        assert!(IndexMapping::parse("0:\n").is_err());
    }

    #[tokio::test]
    async fn test_write_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pair").join("index_mapping.txt");
        let mapping = IndexMapping::from_files(["x_comparison.mp4", "y_comparison.mp4"]);

        mapping.write(&path, "foo_vs_bar").await.unwrap();
        assert_eq!(IndexMapping::load(&path).await.unwrap(), mapping);
    }
}
