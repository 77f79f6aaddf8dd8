//! Conflict resolution: candidate stream in, non-overlapping span set out.
//!
//! The policy is strictly first come, first accepted. There is no scoring and
//! no preference for longer matches; callers control priority through the
//! order in which they offer candidates.

use super::span::Span;

/// A set of spans of which no two overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptedSpans {
    spans: Vec<Span>,
}

impl AcceptedSpans {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `candidate` intersects any accepted span.
    pub fn overlaps_any(&self, candidate: &Span) -> bool {
        self.spans.iter().any(|span| span.overlaps(candidate))
    }

    /// Accepts `candidate` unless it is degenerate or overlaps an accepted span.
    pub fn offer(&mut self, candidate: Span) -> bool {
        if candidate.is_degenerate() || self.overlaps_any(&candidate) {
            return false;
        }
        self.spans.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans in acceptance order.
    pub fn as_slice(&self) -> &[Span] {
        &self.spans
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    pub fn into_vec(self) -> Vec<Span> {
        self.spans
    }
}

impl IntoIterator for AcceptedSpans {
    type Item = Span;
    type IntoIter = std::vec::IntoIter<Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.into_iter()
    }
}

/// Filters candidates through `is_valid` and resolves overlaps greedily.
pub fn resolve<I, F>(candidates: I, mut is_valid: F) -> AcceptedSpans
where
    I: IntoIterator<Item = Span>,
    F: FnMut(&Span) -> bool,
{
    let mut accepted = AcceptedSpans::new();
    for candidate in candidates {
        if is_valid(&candidate) {
            accepted.offer(candidate);
        }
    }
    accepted
}

/// Overlap-only resolution.
pub fn resolve_overlaps<I>(candidates: I) -> AcceptedSpans
where
    I: IntoIterator<Item = Span>,
{
    resolve(candidates, |_| true)
}
