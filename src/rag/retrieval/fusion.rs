// Hybrid fusion of semantic and lexical candidate pools
//
// Pure functions only; the engine handles I/O around them.
use std::collections::{HashMap, HashSet};

use crate::types::{preview_of, CandidateSource, FusedCandidate, Passage, PassageKey};

/// Weight of the semantic signal when none is configured
pub const DEFAULT_ALPHA: f64 = 0.55;

/// Min-max scale a pool of scores into [0, 1]
///
/// ```text
/// norm(s_i) = (s_i - min) / (max - min)
/// empty pool      -> empty
/// max == min      -> all 0
/// non-finite s_i  -> treated as 0 before scaling
/// ```
pub fn min_max_normalize(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let clean: Vec<f64> = scores
        .iter()
        .map(|s| if s.is_finite() { *s } else { 0.0 })
        .collect();
    let lo = clean.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = clean.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        return vec![0.0; clean.len()];
    }
    clean
        .iter()
        .map(|s| ((s - lo) / (hi - lo)).clamp(0.0, 1.0))
        .collect()
}

struct Merged {
    doc_id: String,
    chunk_index: u32,
    text: String,
    sem: Option<f64>,
    kw: Option<f64>,
}

impl Merged {
    fn new(passage: &Passage) -> Self {
        Self {
            doc_id: passage.doc_id.clone(),
            chunk_index: passage.chunk_index,
            text: passage.text.clone(),
            sem: None,
            kw: None,
        }
    }

    fn into_candidate(self, alpha: f64) -> FusedCandidate {
        let sem = self.sem.unwrap_or(0.0);
        let kw = self.kw.unwrap_or(0.0);
        let source = match (self.sem.is_some(), self.kw.is_some()) {
            (true, true) => CandidateSource::Hybrid,
            (true, false) => CandidateSource::Semantic,
            _ => CandidateSource::Keyword,
        };
        FusedCandidate {
            preview: preview_of(&self.text),
            doc_id: self.doc_id,
            chunk_index: self.chunk_index,
            sem_score: sem,
            kw_score: kw,
            fused_score: (alpha * sem + (1.0 - alpha) * kw).clamp(0.0, 1.0),
            source,
            text: self.text,
            rerank_score: None,
        }
    }
}

/// Merge both pools by identity key and sort by fused score descending
///
/// ```text
/// fused = α·sem_norm + (1 − α)·kw_norm
/// ```
///
/// Keys present in both pools are tagged `hybrid`. Ties keep first-seen
/// order (semantic pool first), so fusion is deterministic.
pub fn fuse(semantic: &[Passage], lexical: &[Passage], alpha: f64) -> Vec<FusedCandidate> {
    let alpha = if alpha.is_finite() {
        alpha.clamp(0.0, 1.0)
    } else {
        DEFAULT_ALPHA
    };

    let mut order: Vec<PassageKey> = Vec::new();
    let mut merged: HashMap<PassageKey, Merged> = HashMap::new();

    let sem_norm = min_max_normalize(&semantic.iter().map(|p| p.score).collect::<Vec<_>>());
    for (passage, norm) in semantic.iter().zip(sem_norm) {
        let key = passage.key();
        let entry = merged.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Merged::new(passage)
        });
        entry.sem = Some(entry.sem.map_or(norm, |s| s.max(norm)));
    }

    let kw_norm = min_max_normalize(&lexical.iter().map(|p| p.score).collect::<Vec<_>>());
    for (passage, norm) in lexical.iter().zip(kw_norm) {
        let key = passage.key();
        let entry = merged.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Merged::new(passage)
        });
        if entry.text.is_empty() {
            entry.text = passage.text.clone();
        }
        entry.kw = Some(entry.kw.map_or(norm, |s| s.max(norm)));
    }

    let mut candidates: Vec<FusedCandidate> = order
        .iter()
        .filter_map(|key| merged.remove(key))
        .map(|m| m.into_candidate(alpha))
        .collect();

    // Stable sort keeps first-seen order among equal scores
    candidates.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
    candidates
}

/// Greedy selection with adjacency suppression and backfill
///
/// Strict pass: keep a candidate only if no kept candidate shares its
/// `doc_id` with `|Δchunk| ≤ 1`. Backfill pass: if fewer than `n` were kept,
/// append remaining candidates in order, ignoring adjacency but never
/// re-adding an identity key that is already kept.
pub fn select_diverse(candidates: &[FusedCandidate], n: usize) -> Vec<FusedCandidate> {
    let mut kept: Vec<FusedCandidate> = Vec::with_capacity(n.min(candidates.len()));
    let mut keys: HashSet<PassageKey> = HashSet::new();

    for candidate in candidates {
        if kept.len() >= n {
            break;
        }
        if keys.contains(&candidate.key()) || kept.iter().any(|k| k.is_adjacent_to(candidate)) {
            continue;
        }
        keys.insert(candidate.key());
        kept.push(candidate.clone());
    }

    if kept.len() < n {
        for candidate in candidates {
            if kept.len() >= n {
                break;
            }
            if keys.insert(candidate.key()) {
                kept.push(candidate.clone());
            }
        }
    }

    kept
}
