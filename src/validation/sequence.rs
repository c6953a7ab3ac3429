use crate::core::FieldName;
use std::collections::HashMap;

/// Per-field monotonic request counter. Every validation request and every
/// value change takes the next number; a result only applies if it carries
/// the latest number issued for its field.
#[derive(Debug, Default, Clone)]
pub struct FieldSequencer {
    versions: HashMap<FieldName, u64>,
}

impl FieldSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&mut self, field: &FieldName) -> u64 {
        let entry = self.versions.entry(field.clone()).or_insert(0);
        *entry = entry.saturating_add(1);
        *entry
    }

    pub fn current(&self, field: &str) -> u64 {
        self.versions.get(field).copied().unwrap_or(0)
    }

    pub fn is_current(&self, field: &str, seq: u64) -> bool {
        self.current(field) == seq
    }
}

#[cfg(test)]
mod tests {
    use super::FieldSequencer;
    use crate::core::FieldName;

    #[test]
    fn older_sequences_go_stale() {
        let mut seq = FieldSequencer::new();
        let field = FieldName::new("x");
        assert!(seq.is_current("x", 0));
        let first = seq.bump(&field);
        let second = seq.bump(&field);
        assert!(!seq.is_current("x", first));
        assert!(seq.is_current("x", second));
        assert_eq!(seq.current("other"), 0);
    }
}
