//! Raw video preparation.
//!
//! Model outputs arrive in heterogeneous directory trees with generator
//! suffixes in their file names (`a cat surfing-lora-3.mp4`,
//! `a cat surfing-007.mp4`). Preparation reduces each file to a base name,
//! keeps the base names every model produced, and copies them into one flat
//! directory per model so that collections line up by identity.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, info, warn};

use blindpair_models::identity::{is_video_filename, strip_video_extension};

use crate::error::{MediaError, MediaResult};

/// Generator suffixes, stripped in order.
static SUFFIX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"-lora-\d+$").unwrap(),
        Regex::new(r"-\d{3}$").unwrap(),
        Regex::new(r"-\d+$").unwrap(),
    ]
});

/// Base name of a generated video file.
pub fn extract_base_name(filename: &str) -> String {
    let mut base = strip_video_extension(filename).to_string();
    for pattern in SUFFIX_PATTERNS.iter() {
        base = pattern.replace(&base, "").into_owned();
    }
    base.trim_end().to_string()
}

/// A model's source directory, given on the command line as `model=path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub model: String,
    pub dir: PathBuf,
}

impl FromStr for ModelSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (model, dir) = s
            .split_once('=')
            .ok_or_else(|| format!("expected MODEL=DIR, got '{}'", s))?;
        let model = model.trim();
        if model.is_empty() || dir.trim().is_empty() {
            return Err(format!("expected MODEL=DIR, got '{}'", s));
        }
        Ok(Self {
            model: model.to_string(),
            dir: PathBuf::from(dir.trim()),
        })
    }
}

/// Outcome of a preparation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    /// Base names copied for every model.
    pub prepared: Vec<String>,
    /// Base names skipped, with the models lacking them.
    pub incomplete: Vec<(String, Vec<String>)>,
    pub files_copied: usize,
    pub copy_failures: usize,
}

impl PrepareSummary {
    pub fn failed(&self) -> usize {
        self.incomplete.len() + self.copy_failures
    }
}

/// Copy the base names shared by all `sources` into `<raw_dir>/<model>/`.
///
/// With `only`, just those base names are considered; requested names that
/// some model lacks are reported as incomplete.
pub async fn prepare_raw_videos(
    sources: &[ModelSource],
    raw_dir: &Path,
    only: Option<&BTreeSet<String>>,
) -> MediaResult<PrepareSummary> {
    let mut by_model: Vec<(&ModelSource, BTreeMap<String, PathBuf>)> = Vec::new();
    for source in sources {
        if !source.dir.is_dir() {
            return Err(MediaError::DirectoryNotFound(source.dir.clone()));
        }
        let files = index_base_names(&source.dir)?;
        info!(model = %source.model, videos = files.len(), "Indexed source directory");
        by_model.push((source, files));
    }

    let mut candidates: BTreeSet<String> = match only {
        Some(names) => names.clone(),
        None => by_model
            .iter()
            .flat_map(|(_, files)| files.keys().cloned())
            .collect(),
    };
    candidates.retain(|name| !name.is_empty());

    let mut summary = PrepareSummary::default();

    for base in candidates {
        let missing: Vec<String> = by_model
            .iter()
            .filter(|(_, files)| !files.contains_key(&base))
            .map(|(source, _)| source.model.clone())
            .collect();
        if !missing.is_empty() {
            warn!(base = %base, missing = ?missing, "Skipping base name missing from some models");
            summary.incomplete.push((base, missing));
            continue;
        }

        let mut complete = true;
        for (source, files) in &by_model {
            let Some(src) = files.get(&base) else {
                continue;
            };
            let ext = src
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_else(|| "mp4".to_string());
            let dst = raw_dir.join(&source.model).join(format!("{}.{}", base, ext));

            match copy_atomic(src, &dst).await {
                Ok(()) => {
                    summary.files_copied += 1;
                    debug!(model = %source.model, base = %base, "Copied video");
                }
                Err(e) => {
                    warn!(
                        model = %source.model,
                        src = %src.display(),
                        error = %e,
                        "Failed to copy video"
                    );
                    summary.copy_failures += 1;
                    complete = false;
                }
            }
        }

        if complete {
            summary.prepared.push(base);
        }
    }

    Ok(summary)
}

/// Map base name -> first video file (path order) under `dir`, recursively.
fn index_base_names(dir: &Path) -> MediaResult<BTreeMap<String, PathBuf>> {
    let mut files = Vec::new();
    walk_videos(dir, &mut files)?;
    files.sort();

    let mut index = BTreeMap::new();
    for path in files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        index.entry(extract_base_name(&name)).or_insert(path);
    }
    Ok(index)
}

fn walk_videos(dir: &Path, out: &mut Vec<PathBuf>) -> MediaResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_videos(&path, out)?;
        } else if file_type.is_file() && is_video_filename(&entry.file_name().to_string_lossy()) {
            out.push(path);
        }
    }
    Ok(())
}

/// Copy through a temporary sibling so a partial copy never has the final name.
async fn copy_atomic(src: &Path, dst: &Path) -> MediaResult<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp_dst = dst.with_extension("tmp");
    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(MediaError::from(e));
    }
    Ok(())
}
