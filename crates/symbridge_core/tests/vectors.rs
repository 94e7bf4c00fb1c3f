//! Shared expression vectors against the in-process engine.

mod common;

use symbridge_core::Engine;
use symbridge_testkit::{all_vectors, FakeEngine};

#[test]
fn all_vectors_pass() {
    common::init_tracing();
    let fake = FakeEngine::new();
    let engine = Engine::new(fake.clone());

    for vector in all_vectors() {
        let actual = common::run_vector(&engine, &vector)
            .unwrap_or_else(|e| panic!("Vector {} failed: {e}", vector.id));
        assert_eq!(actual, vector.expected, "Vector {}: {}", vector.id, vector.description);
    }

    assert!(fake.ledger().is_balanced());
}
