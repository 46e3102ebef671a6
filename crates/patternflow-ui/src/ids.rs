//! Stable widget-id assignment.
//!
//! Descriptors with a source range get a positional id, reproducible
//! across evaluations of the same source. Range-less descriptors are
//! keyed by Arc identity in a table of non-owning handles, so the same
//! descriptor instance keeps its id for as long as the evaluator holds
//! it, without the table extending the descriptor's lifetime.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use patternflow_render::{WidgetId, WidgetKind};

use crate::descriptor::WidgetDescriptor;

/// Positional id for a descriptor with a known source range
pub fn positional_id(kind: WidgetKind, start: usize, end: usize) -> WidgetId {
    format!("{kind}-{start}-{end}")
}

struct IdEntry {
    handle: Weak<WidgetDescriptor>,
    id: WidgetId,
}

/// Identity-keyed id table for descriptors without a source range.
#[derive(Default)]
pub struct IdentityIdTable {
    entries: HashMap<usize, IdEntry>,
    next: u64,
}

impl IdentityIdTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for this descriptor instance, allocating on first sight.
    ///
    /// Keys are raw Arc addresses, which the allocator may reuse after a
    /// descriptor dies; a stale entry at the same address is detected by
    /// upgrading the stored weak handle and comparing identities.
    pub fn id_for(&mut self, descriptor: &Arc<WidgetDescriptor>, kind: WidgetKind) -> WidgetId {
        self.prune();

        let key = Arc::as_ptr(descriptor) as usize;
        if let Some(entry) = self.entries.get(&key) {
            if let Some(live) = entry.handle.upgrade() {
                if Arc::ptr_eq(&live, descriptor) {
                    return entry.id.clone();
                }
            }
        }

        let id = format!("{kind}-anon-{}", self.next);
        self.next += 1;
        self.entries.insert(
            key,
            IdEntry {
                handle: Arc::downgrade(descriptor),
                id: id.clone(),
            },
        );
        id
    }

    /// Drop entries whose descriptors have died
    fn prune(&mut self) {
        self.entries.retain(|_, e| e.handle.strong_count() > 0);
    }

    /// Number of live entries (diagnostics and tests)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anon_descriptor() -> Arc<WidgetDescriptor> {
        Arc::new(WidgetDescriptor {
            kind: crate::descriptor::DescriptorKind::Visual(WidgetKind::Spiral),
            range: None,
            options: serde_json::Value::Null,
        })
    }

    #[test]
    fn test_positional_id_is_reproducible() {
        assert_eq!(positional_id(WidgetKind::Scope, 10, 25), "scope-10-25");
        assert_eq!(
            positional_id(WidgetKind::Scope, 10, 25),
            positional_id(WidgetKind::Scope, 10, 25)
        );
    }

    #[test]
    fn test_identity_table_is_stable_per_instance() {
        let mut table = IdentityIdTable::new();
        let a = anon_descriptor();
        let b = anon_descriptor();

        let id_a = table.id_for(&a, WidgetKind::Spiral);
        let id_b = table.id_for(&b, WidgetKind::Spiral);
        assert_ne!(id_a, id_b, "distinct instances get distinct ids");
        assert_eq!(table.id_for(&a, WidgetKind::Spiral), id_a);
        assert_eq!(table.id_for(&b, WidgetKind::Spiral), id_b);
    }

    #[test]
    fn test_dead_descriptors_are_pruned() {
        let mut table = IdentityIdTable::new();
        let a = anon_descriptor();
        table.id_for(&a, WidgetKind::Spiral);
        assert_eq!(table.len(), 1);

        drop(a);
        let b = anon_descriptor();
        table.id_for(&b, WidgetKind::Spiral);
        assert_eq!(table.len(), 1, "dead entry pruned, live entry kept");
    }

    #[test]
    fn test_reused_address_gets_a_fresh_id() {
        let mut table = IdentityIdTable::new();

        // Force many allocations; even if the allocator hands back the
        // same address, identity comparison must prevent id aliasing
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let d = anon_descriptor();
            let id = table.id_for(&d, WidgetKind::Spiral);
            assert!(seen.insert(id), "fresh instance must never inherit an id");
        }
    }
}
