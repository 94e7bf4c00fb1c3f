//! Ownership of one engine handle.

use crate::engine::Engine;
use symbridge_abi::EntityRef;
use tracing::trace;

/// Owns exactly one handle and releases it when dropped.
///
/// Not `Clone`: sharing goes through the `Arc` around the entity instance
/// holding this owner, so `free_entity` runs once, when the last sharer is
/// gone.
pub(crate) struct HandleOwner {
    engine: Engine,
    reference: EntityRef,
}

impl HandleOwner {
    /// Takes ownership of a handle freshly produced by `engine`.
    pub(crate) fn adopt(engine: Engine, reference: EntityRef) -> Self {
        engine.stats_ref().record_adopted();
        trace!(handle = reference.into_raw(), "adopted handle");
        Self { engine, reference }
    }

    pub(crate) fn reference(&self) -> EntityRef {
        self.reference
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Drop for HandleOwner {
    fn drop(&mut self) {
        self.engine.release_entity(self.reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbridge_testkit::FakeEngine;

    #[test]
    fn drop_releases_once() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        let reference = fake.issue_entity("x");
        let owner = HandleOwner::adopt(engine.clone(), reference);
        assert_eq!(owner.reference(), reference);
        assert!(owner.engine().same_engine(&engine));
        assert_eq!(fake.ledger().live_handles(), 1);

        drop(owner);

        let ledger = fake.ledger();
        assert_eq!(ledger.handles_freed, 1);
        assert_eq!(ledger.live_handles(), 0);
        assert_eq!(ledger.double_frees, 0);

        let stats = engine.stats();
        assert_eq!(stats.handles_adopted, 1);
        assert_eq!(stats.handles_released, 1);
        assert_eq!(stats.release_failures, 0);
    }
}
