use std::sync::Arc;

use super::history::History;

/// An AI-generated candidate document shown in place of the real one until
/// the user applies or discards it. The candidate never enters the history
/// until it is applied.
#[derive(Debug, Clone)]
pub struct ProposalOverlay<T> {
    candidate: Option<Arc<T>>,
}

impl<T> Default for ProposalOverlay<T> {
    fn default() -> Self {
        Self { candidate: None }
    }
}

impl<T> ProposalOverlay<T> {
    pub fn is_previewing(&self) -> bool {
        self.candidate.is_some()
    }

    pub fn candidate(&self) -> Option<&T> {
        self.candidate.as_deref()
    }

    /// Start (or replace) a preview.
    pub fn begin(&mut self, candidate: T) {
        self.candidate = Some(Arc::new(candidate));
    }

    /// Commit the candidate as one new history entry. Returns false when
    /// there was nothing to apply.
    pub fn apply(&mut self, history: &mut History<T>) -> bool
    where
        T: Clone,
    {
        match self.candidate.take() {
            Some(candidate) => {
                let value = Arc::try_unwrap(candidate).unwrap_or_else(|shared| (*shared).clone());
                history.set(value);
                true
            }
            None => false,
        }
    }

    /// Drop the candidate. The history is not touched.
    pub fn discard(&mut self) -> bool {
        self.candidate.take().is_some()
    }
}
