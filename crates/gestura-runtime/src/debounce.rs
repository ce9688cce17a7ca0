//! Action debounce: fire once per change of recognized gesture.

/// Remembers the last gesture an action was evaluated for.
#[derive(Debug, Default, Clone)]
pub struct Debouncer {
    last: Option<String>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start as if `label` had just been evaluated.
    pub fn with_last(label: impl Into<String>) -> Self {
        Self {
            last: Some(label.into()),
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Record a recognized gesture. Returns true when it differs from the
    /// previous one and its action should be evaluated.
    pub fn observe(&mut self, label: &str) -> bool {
        if self.last.as_deref() == Some(label) {
            return false;
        }
        self.last = Some(label.to_string());
        true
    }

    /// A frame without a hand: the next gesture always fires.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
