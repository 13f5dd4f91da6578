//! Windowed engagement ranking.
//!
//! Items are ordered by post date. Each item is measured against the `w` items posted just
//! before it: an item is an average outlier when its likes exceed a multiple of the window
//! mean, and a deviation outlier when they exceed a multiple of the window standard deviation.
//! Outliers are copied (or linked) into one output directory per kind under a name whose
//! fixed-width prefix sorts by score.

use log::info;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::discovery::CorpusSnapshot;
use crate::error::{Error, Result};
use crate::filename::{self, MediaFields};
use crate::logging::log_fs_modification;
use crate::store::FileStore;
use crate::types::{Mutation, Operation, OperationReport};

/// A decoded corpus item
#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub path: PathBuf,
    pub fields: MediaFields,
}

/// Mean and population standard deviation of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub average: f64,
    pub std_dev: f64,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierKind {
    Average,
    Deviation,
}

/// An item that beat its local baseline
#[derive(Debug, Clone, PartialEq)]
pub struct Outlier {
    /// Position in the chronological order
    pub index: usize,
    pub kind: OutlierKind,

    /// Likes divided by the baseline, times 1000
    pub score: u64,
}

/// Window size used for a corpus of `len` items
pub fn effective_window(len: usize, config: &Config) -> usize {
    config.window_size.unwrap_or_else(|| {
        let proportional = (len as f64 * config.window_fraction) as usize;
        proportional.max(config.min_window_size)
    })
}

/// Statistics of the (at most) `window` counts before `index`; `None` for an empty window
pub fn window_stats(counts: &[u64], index: usize, window: usize) -> Option<WindowStats> {
    let start = index.saturating_sub(window);
    let slice = &counts[start..index.min(counts.len())];
    if slice.is_empty() {
        return None;
    }

    let len = slice.len() as f64;
    let average = slice.iter().map(|&c| c as f64).sum::<f64>() / len;
    let variance = slice
        .iter()
        .map(|&c| {
            let d = c as f64 - average;
            d * d
        })
        .sum::<f64>()
        / len;

    Some(WindowStats {
        average,
        std_dev: variance.sqrt(),
        len: slice.len(),
    })
}

/// Sort chronologically; ties are ordered by id
pub fn sort_chronologically(items: &mut [RankedItem]) {
    items.sort_by(|a, b| {
        a.fields
            .post_date
            .cmp(&b.fields.post_date)
            .then_with(|| a.fields.unique_id.cmp(&b.fields.unique_id))
    });
}

fn score(likes: u64, baseline: f64, max_score: u64) -> u64 {
    let raw = (likes as f64 / baseline * 1000.0).round();
    if raw >= max_score as f64 {
        max_score
    } else {
        raw as u64
    }
}

/// Classify chronologically sorted items against their preceding windows
pub fn classify(items: &[RankedItem], window: usize, config: &Config) -> Vec<Outlier> {
    let counts: Vec<u64> = items.iter().map(|i| i.fields.engagement).collect();
    let max_score = 10u64.pow(config.score_width as u32) - 1;
    let mut outliers = Vec::new();

    for (index, &likes) in counts.iter().enumerate() {
        let Some(stats) = window_stats(&counts, index, window) else {
            continue;
        };
        let likes_f = likes as f64;

        if stats.average > 0.0 && likes_f > config.average_multiplier * stats.average {
            outliers.push(Outlier {
                index,
                kind: OutlierKind::Average,
                score: score(likes, stats.average, max_score),
            });
        }

        if stats.std_dev > 0.0 && likes_f > config.deviation_multiplier * stats.std_dev {
            outliers.push(Outlier {
                index,
                kind: OutlierKind::Deviation,
                score: score(likes, stats.std_dev, max_score),
            });
        }
    }
    outliers
}

/// Name of an outlier's copy: zero-padded score, then the original file name
pub fn ranked_name(score: u64, width: usize, source: &Path) -> String {
    let original = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{:0width$}_{}", score, original, width = width)
}

/// Rank the snapshot and export outliers into the configured output directories
pub fn rank_corpus(
    store: &dyn FileStore,
    snapshot: &CorpusSnapshot,
    config: &Config,
) -> Result<OperationReport> {
    let mut report = OperationReport::new(Operation::Rank);

    let mut items = Vec::with_capacity(snapshot.len());
    for path in &snapshot.items {
        match filename::decode(path) {
            Ok(fields) => items.push(RankedItem {
                path: path.clone(),
                fields,
            }),
            Err(e) => report.skip(path, &e),
        }
    }
    sort_chronologically(&mut items);

    let average_dir = snapshot.root.join(&config.average_dir);
    let deviation_dir = snapshot.root.join(&config.deviation_dir);
    for dir in [&average_dir, &deviation_dir] {
        store.recreate_dir(dir).map_err(|e| match e {
            Error::Io(io) => Error::Io(std::io::Error::new(
                io.kind(),
                format!("cannot recreate {}: {}", dir.display(), io),
            )),
            other => other,
        })?;
        report
            .applied
            .push(Mutation::RecreateDir { path: dir.clone() });
    }

    let window = effective_window(items.len(), config);
    let outliers = classify(&items, window, config);
    info!(
        "Ranking {} items of {} with window {}: {} outlier entries",
        items.len(),
        snapshot.root.display(),
        window,
        outliers.len()
    );

    let mut failed = vec![false; items.len()];
    for outlier in outliers {
        let source = &items[outlier.index].path;
        let dir = match outlier.kind {
            OutlierKind::Average => &average_dir,
            OutlierKind::Deviation => &deviation_dir,
        };
        let target = dir.join(ranked_name(outlier.score, config.score_width, source));

        match store.materialize(source, &target, config.link_mode) {
            Ok(()) => {
                log_fs_modification("materialize", &target, Some(&format!("{:?}", outlier.kind)));
                report.applied.push(Mutation::Materialize {
                    source: source.clone(),
                    target,
                    mode: config.link_mode,
                });
            }
            Err(e) => {
                report.skip(source, &e);
                failed[outlier.index] = true;
            }
        }
    }

    report.processed = failed.iter().filter(|&&f| !f).count();
    Ok(report)
}
