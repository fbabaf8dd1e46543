//! Order sheet writer and parser.
//!
//! An order sheet is the ground truth of one pair's label assignment:
//!
//! ```text
//! Blind Test Order Sheet for foo_vs_bar
//! ==================================================
//! Original Method A: foo
//! Original Method B: bar
//! Seed: 42
//!
//! Randomized Order (filename -> Model A = ?, Model B = ?):
//! --------------------------------------------------
//! v1: Model A = bar, Model B = foo
//! v2: Model A = foo, Model B = bar
//! ```
//!
//! The parser only trusts entry lines; the header is informational.

use blindpair_models::identity::{canonicalize, strip_comparison_infix, strip_video_extension};
use blindpair_models::{ComparisonPair, OrderSheetEntry};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{StudyError, StudyResult};

const RULE_WIDTH: usize = 50;
const TITLE_PREFIX: &str = "Blind Test Order Sheet for ";
const LEFT_PREFIX: &str = "Original Method A: ";
const RIGHT_PREFIX: &str = "Original Method B: ";
const SEED_PREFIX: &str = "Seed: ";

// ============================================================================
// Writing
// ============================================================================

/// Render a complete order sheet, header included.
pub fn render_order_sheet(pair: &ComparisonPair, seed: u64, entries: &[OrderSheetEntry]) -> String {
    let mut lines = vec![
        format!("{}{}", TITLE_PREFIX, pair.name()),
        "=".repeat(RULE_WIDTH),
        format!("{}{}", LEFT_PREFIX, pair.left),
        format!("{}{}", RIGHT_PREFIX, pair.right),
        format!("{}{}", SEED_PREFIX, seed),
        String::new(),
        "Randomized Order (filename -> Model A = ?, Model B = ?):".to_string(),
        "-".repeat(RULE_WIDTH),
    ];
    lines.extend(entries.iter().map(OrderSheetEntry::to_line));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Write an order sheet to `path`, replacing it atomically.
pub async fn write_order_sheet(
    path: &Path,
    pair: &ComparisonPair,
    seed: u64,
    entries: &[OrderSheetEntry],
) -> StudyResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("txt.tmp");
    fs::write(&tmp, render_order_sheet(pair, seed, entries)).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), entries = entries.len(), "Wrote order sheet");
    Ok(())
}

// ============================================================================
// Parsing
// ============================================================================

/// Parsed order sheet with normalized lookup.
#[derive(Debug, Clone, Default)]
pub struct OrderSheet {
    entries: Vec<OrderSheetEntry>,
    /// identity as written -> entry index
    exact: HashMap<String, usize>,
    /// canonical identity -> first entry index
    canonical: HashMap<String, usize>,
    title: Option<String>,
    original_left: Option<String>,
    original_right: Option<String>,
    seed: Option<u64>,
}

impl OrderSheet {
    pub fn from_entries(entries: impl IntoIterator<Item = OrderSheetEntry>) -> Self {
        let mut sheet = Self::default();
        for entry in entries {
            sheet.insert(entry);
        }
        sheet
    }

    /// Parse order sheet text. Lines that are not entries are ignored.
    pub fn parse(text: &str) -> Self {
        let mut sheet = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Ok(entry) = OrderSheetEntry::parse_line(line) {
                sheet.insert(entry);
            } else if let Some(rest) = line.strip_prefix(TITLE_PREFIX) {
                sheet.title = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix(LEFT_PREFIX) {
                sheet.original_left = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix(RIGHT_PREFIX) {
                sheet.original_right = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix(SEED_PREFIX) {
                sheet.seed = rest.trim().parse().ok();
            }
        }

        sheet
    }

    /// Read and parse the order sheet at `path`.
    pub async fn load(path: &Path) -> StudyResult<Self> {
        match fs::read_to_string(path).await {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StudyError::OrderSheetNotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn insert(&mut self, entry: OrderSheetEntry) {
        let key = entry.identity.as_str().to_string();
        if self.exact.contains_key(&key) {
            warn!(identity = %key, "Duplicate order sheet entry, keeping the first");
            return;
        }

        let index = self.entries.len();
        let canonical = canonicalize(&key);
        match self.canonical.get(&canonical) {
            Some(&first) => warn!(
                identity = %key,
                first = %self.entries[first].identity,
                "Order sheet identities collide after normalization, keeping the first"
            ),
            None => {
                self.canonical.insert(canonical, index);
            }
        }

        self.exact.insert(key, index);
        self.entries.push(entry);
    }

    /// Find the entry for an identity as it appears in a response.
    ///
    /// Tried in order: exact, extension stripped, comparison infix
    /// stripped, then the canonical form of both sides.
    pub fn lookup(&self, identity: &str) -> Option<&OrderSheetEntry> {
        let query = identity.trim();
        let no_ext = strip_video_extension(query);
        let no_infix = strip_comparison_infix(no_ext);

        [query, no_ext, no_infix]
            .into_iter()
            .find_map(|key| self.exact.get(key))
            .or_else(|| self.canonical.get(&canonicalize(query)))
            .map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[OrderSheetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pair name from the header, if present.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn original_left(&self) -> Option<&str> {
        self.original_left.as_deref()
    }

    pub fn original_right(&self) -> Option<&str> {
        self.original_right.as_deref()
    }

    /// Seed recorded in the header, if present.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blindpair_models::{Identity, Label};
    use tempfile::TempDir;

    fn entry(id: &str, a: &str, b: &str) -> OrderSheetEntry {
        OrderSheetEntry {
            identity: Identity::new(id).unwrap(),
            model_a: a.into(),
            model_b: b.into(),
        }
    }

    #[test]
    fn test_render_then_parse() {
        let pair = ComparisonPair::new("foo", "bar").unwrap();
        let entries = vec![entry("v1", "bar", "foo"), entry("v2", "foo", "bar")];
        let text = render_order_sheet(&pair, 42, &entries);

        assert!(text.starts_with("Blind Test Order Sheet for foo_vs_bar\n"));
        assert!(text.contains("Randomized Order (filename -> Model A = ?, Model B = ?):"));

        let sheet = OrderSheet::parse(&text);
        assert_eq!(sheet.entries(), entries.as_slice());
        assert_eq!(sheet.title(), Some("foo_vs_bar"));
        assert_eq!(sheet.original_left(), Some("foo"));
        assert_eq!(sheet.original_right(), Some("bar"));
        assert_eq!(sheet.seed(), Some(42));
    }

    #[test]
    fn test_parse_without_header() {
        let sheet = OrderSheet::parse("v1: Model A = foo, Model B = bar\n\nnoise line\n");
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.seed(), None);
        assert_eq!(sheet.lookup("v1").unwrap().model_for(Label::A), "foo");
    }

    #[test]
    fn test_lookup_normalizes_filenames() {
        let sheet = OrderSheet::parse("clip_01: Model A = foo, Model B = bar");
        for query in ["clip_01", "clip_01.mp4", "clip_01_comparison.mp4", " clip_01_comparison "] {
            let found = sheet.lookup(query).unwrap_or_else(|| panic!("{query} not found"));
            assert_eq!(found.identity.as_str(), "clip_01");
        }
        assert!(sheet.lookup("clip_02").is_none());
    }

    #[test]
    fn test_lookup_sheet_keyed_by_filename() {
        let sheet = OrderSheet::parse("clip_01.mp4: Model A = foo, Model B = bar");
        assert!(sheet.lookup("clip_01.mp4").is_some());
        assert!(sheet.lookup("clip_01").is_some());
        assert!(sheet.lookup("clip_01_comparison.mp4").is_some());
    }

    #[test]
    fn test_exact_match_beats_canonical() {
        let sheet = OrderSheet::parse(
            "clip: Model A = foo, Model B = bar\n\
             clip_comparison: Model A = bar, Model B = foo\n",
        );
        assert_eq!(sheet.lookup("clip_comparison").unwrap().model_a, "bar");
        assert_eq!(sheet.lookup("clip.mp4").unwrap().model_a, "foo");
    }

    #[test]
    fn test_duplicate_entry_keeps_first() {
        let sheet = OrderSheet::parse(
            "v1: Model A = foo, Model B = bar\n\
             v1: Model A = bar, Model B = foo\n",
        );
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.lookup("v1").unwrap().model_a, "foo");
    }

    #[tokio::test]
    async fn test_load_missing_sheet() {
        let dir = TempDir::new().unwrap();
        let err = OrderSheet::load(&dir.path().join("order_sheet.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::OrderSheetNotFound(_)));
    }

    #[tokio::test]
    async fn test_write_creates_parent_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo_vs_bar").join("order_sheet.txt");
        let pair = ComparisonPair::new("foo", "bar").unwrap();

        write_order_sheet(&path, &pair, 7, &[entry("v1", "foo", "bar")])
            .await
            .unwrap();

        let sheet = OrderSheet::load(&path).await.unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.seed(), Some(7));
        assert!(!path.with_extension("txt.tmp").exists());
    }
}
