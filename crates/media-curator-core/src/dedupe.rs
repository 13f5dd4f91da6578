//! Near-duplicate pruning.
//!
//! Every image becomes a small grayscale [`Thumbnail`]. Thumbnails are sorted by the value of
//! one reference pixel, which places look-alikes next to each other: two copies of the same
//! picture have nearly the same reference value. Each anchor is then compared by SSIM only
//! with the run of successors whose reference value is within the tolerance. Because the list
//! is ascending and a promoted anchor never has a smaller reference value than the one it
//! replaces, the first successor outside the tolerance ends the scan.
//!
//! A promoted anchor restarts the scan right behind itself. The entries it passed over lie
//! between the old and the new anchor's reference value, so they stay within the tolerance and
//! are compared again, this time against the new anchor.
//!
//! Of a matching pair the file with fewer native pixels is deleted, so a chain of
//! near-duplicates collapses onto its highest-resolution member.

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::discovery::CorpusSnapshot;
use crate::error::Result;
use crate::logging::log_fs_modification;
use crate::progress::file_progress;
use crate::similarity::{structural_similarity, Thumbnail};
use crate::store::FileStore;
use crate::types::{Mutation, Operation, OperationReport};

/// One entry of the sorted working list
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub thumbnail: Thumbnail,
    pub reference: f64,
}

impl Candidate {
    pub fn new(path: PathBuf, thumbnail: Thumbnail, reference_pixel: (u32, u32)) -> Self {
        let reference = thumbnail.value_at(reference_pixel.0, reference_pixel.1);
        Self {
            path,
            thumbnail,
            reference,
        }
    }
}

/// Thresholds of the two comparison stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneParams {
    pub similarity_threshold: f64,
    pub reference_tolerance: f64,
}

impl From<&Config> for PruneParams {
    fn from(config: &Config) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            reference_tolerance: config.reference_tolerance,
        }
    }
}

/// Decode thumbnails for every file, reporting the ones that fail
fn load_candidates(
    store: &dyn FileStore,
    snapshot: &CorpusSnapshot,
    config: &Config,
    report: &mut OperationReport,
) -> Vec<Candidate> {
    let progress = file_progress(snapshot.len(), "Loading images", config.show_progress);
    let mut candidates = Vec::with_capacity(snapshot.len());

    for path in &snapshot.items {
        match store.read_image(path) {
            Ok(image) => {
                let thumbnail = Thumbnail::from_image(&image, config.thumbnail_size);
                candidates.push(Candidate::new(
                    path.clone(),
                    thumbnail,
                    config.reference_pixel,
                ));
            }
            Err(e) => report.skip(path, &e),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    candidates
}

/// Sort by reference value; the scan below depends on this order
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.reference.total_cmp(&b.reference));
}

fn pixel_count(store: &dyn FileStore, path: &Path) -> Result<u64> {
    let (width, height) = store.dimensions(path)?;
    Ok(width as u64 * height as u64)
}

/// Resolve near-duplicates in an already sorted candidate list.
///
/// Deletes through `store` and records each deletion (and each file whose resolution could
/// not be read) in `report`. Returns the surviving candidates.
pub fn prune_sorted(
    store: &dyn FileStore,
    mut candidates: Vec<Candidate>,
    params: &PruneParams,
    report: &mut OperationReport,
) -> Vec<Candidate> {
    let mut anchor_index = 0;

    while anchor_index < candidates.len() {
        let mut next = anchor_index + 1;

        while next < candidates.len() {
            let anchor = &candidates[anchor_index];
            let candidate = &candidates[next];

            if candidate.reference - anchor.reference > params.reference_tolerance {
                break;
            }

            let score = structural_similarity(&anchor.thumbnail, &candidate.thumbnail);
            if score < params.similarity_threshold {
                next += 1;
                continue;
            }

            debug!(
                "{} and {} match (ssim {:.4})",
                anchor.path.display(),
                candidate.path.display(),
                score
            );

            let anchor_pixels = match pixel_count(store, &anchor.path) {
                Ok(count) => count,
                Err(e) => {
                    // Without its resolution the anchor cannot be weighed against anything
                    let anchor = candidates.remove(anchor_index);
                    report.skip(&anchor.path, &e);
                    next = anchor_index + 1;
                    continue;
                }
            };
            let candidate_pixels = match pixel_count(store, &candidate.path) {
                Ok(count) => count,
                Err(e) => {
                    let candidate = candidates.remove(next);
                    report.skip(&candidate.path, &e);
                    continue;
                }
            };

            // Ties keep the anchor
            let loser_index = if candidate_pixels > anchor_pixels {
                anchor_index
            } else {
                next
            };
            let kept_index = if loser_index == next { anchor_index } else { next };
            let kept = candidates[kept_index].path.clone();
            let loser = candidates[loser_index].path.clone();

            if let Err(e) = store.remove(&loser) {
                report.skip(&loser, &e);
                next += 1;
                continue;
            }
            log_fs_modification(
                "delete",
                &loser,
                Some(&format!("near-duplicate of {} (ssim {:.4})", kept.display(), score)),
            );
            report.applied.push(Mutation::Delete {
                path: loser,
                kept,
                similarity: score,
            });

            // The slot at `next` always empties; a winning candidate moves into the anchor slot
            let matched = candidates.remove(next);
            if loser_index == anchor_index {
                candidates[anchor_index] = matched;
                // Entries passed over so far were only weighed against the old anchor
                next = anchor_index + 1;
            }
        }

        anchor_index += 1;
    }

    candidates
}

/// Remove near-duplicates from the snapshot, keeping the highest resolution of each group
pub fn prune_duplicates(
    store: &dyn FileStore,
    snapshot: &CorpusSnapshot,
    config: &Config,
) -> Result<OperationReport> {
    let mut report = OperationReport::new(Operation::Duplicates);

    let mut candidates = load_candidates(store, snapshot, config, &mut report);
    let loaded = candidates.len();
    sort_candidates(&mut candidates);

    let survivors = prune_sorted(store, candidates, &PruneParams::from(config), &mut report);

    // Files whose resolution could not be read were already counted as skipped
    let unresolved = loaded - survivors.len() - report.applied.len();
    report.processed = loaded - unresolved;

    info!(
        "Duplicate scan of {}: {} images, {} removed",
        snapshot.root.display(),
        loaded,
        report.applied.len()
    );
    Ok(report)
}
