//! Candidate selection: which encodings to offer, and what to try next when
//! a download comes out too large.

use std::collections::HashSet;

use super::Candidate;

/// Pure selection logic over candidate lists.
///
/// The presentation list built here is shown to the user and later serves as
/// the lookup table for fallback, so both operations must agree on ordering.
pub struct CandidateSelector;

impl CandidateSelector {
    /// Builds the list of candidates offered to the user.
    ///
    /// Walks the raw list in the given order, skipping candidates without a
    /// size estimate and candidates whose resolution label was already
    /// accepted (first one seen wins). Survivors are then stable-sorted by
    /// `rank`, highest first, so "next smaller" never depends on the order
    /// the provider happened to return.
    pub fn build_presentation_list(candidates: &[Candidate]) -> Vec<Candidate> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut presented: Vec<Candidate> = candidates
            .iter()
            .filter(|c| c.size_estimate_mb.is_some())
            .filter(|c| seen.insert(c.resolution_label.as_str()))
            .cloned()
            .collect();

        presented.sort_by(|a, b| b.rank.cmp(&a.rank));
        presented
    }

    /// Returns the entry right after `current_id` in the presented list.
    ///
    /// `None` when `current_id` is not in the list or is already the last entry.
    pub fn next_smaller<'a>(current_id: &str, presented: &'a [Candidate]) -> Option<&'a Candidate> {
        let index = presented.iter().position(|c| c.id == current_id)?;
        presented.get(index + 1)
    }

    /// Button text for a presented candidate, e.g. `1920x1080 / ~45.2 MB`.
    pub fn button_label(candidate: &Candidate) -> String {
        match candidate.size_estimate_mb {
            Some(size) => format!("{} / ~{} MB", candidate.resolution_label, size),
            None => candidate.resolution_label.clone(),
        }
    }
}
