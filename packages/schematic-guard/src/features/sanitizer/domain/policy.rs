//! Pruning policy and sanitize verdict

/// Which compound key is the reserved attributes slot, and which of its
/// children may stay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizePolicy {
    reserved_slot: String,
    allowed: Vec<String>,
}

impl SanitizePolicy {
    pub fn new<I, S>(reserved_slot: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved_slot: reserved_slot.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reserved_slot(&self) -> &str {
        &self.reserved_slot
    }

    pub fn is_allowed(&self, key: &str) -> bool {
        self.allowed.iter().any(|a| a == key)
    }
}

impl Default for SanitizePolicy {
    /// Clipboard attributes are the only item components a schematic may carry
    fn default() -> Self {
        Self::new(
            "components",
            ["create:clipboard_pages", "create:clipboard_type"],
        )
    }
}

/// Outcome of one sanitize pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SanitizeVerdict {
    /// At least one reserved-slot entry was removed
    pub structurally_modified: bool,
    /// A string tag contains a banned keyword
    pub banned_content_found: bool,
}

impl SanitizeVerdict {
    pub fn is_clean(&self) -> bool {
        !self.structurally_modified && !self.banned_content_found
    }
}
