//! Response envelopes for the generated endpoints.

use serde::Serialize;
use serde_json::Value;

/// List responses: one page of records plus enough to page further.
#[derive(Debug, Serialize)]
pub struct ListEnvelope {
    pub items: Vec<Value>,
    pub total: u64,
    pub skip: u32,
    pub limit: u32,
    pub has_next: bool,
}

impl ListEnvelope {
    pub fn new(items: Vec<Value>, total: u64, skip: u32, limit: u32) -> Self {
        ListEnvelope {
            items,
            total,
            skip,
            limit,
            has_next: (skip as u64 + limit as u64) < total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountBody {
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_next_is_strict() {
        assert!(ListEnvelope::new(vec![], 25, 0, 10).has_next);
        assert!(ListEnvelope::new(vec![], 25, 20, 5).has_next == false);
        assert!(!ListEnvelope::new(vec![], 10, 0, 10).has_next);
    }
}
