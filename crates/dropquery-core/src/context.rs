//! Runtime context probe.
//!
//! When the browser tears down the extension runtime (update, reload), the
//! content side keeps running but can no longer reach storage. The probe is
//! a shared flag: once invalidated, the detector hub drops every event and
//! the ledger refuses storage access.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to the shared context-validity flag.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    valid: Arc<AtomicBool>,
}

impl ContextHandle {
    /// A new, valid context.
    pub fn new() -> Self {
        Self {
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the runtime context is still usable.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Mark the context as gone. All clones observe the change.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

impl Default for ContextHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_is_shared() {
        let context = ContextHandle::new();
        let clone = context.clone();
        assert!(clone.is_valid());
        context.invalidate();
        assert!(!clone.is_valid());
    }
}
