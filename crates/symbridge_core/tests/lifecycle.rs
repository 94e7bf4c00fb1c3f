//! Handle lifecycle under random operation sequences and threads.

mod common;

use proptest::prelude::*;
use std::thread;
use symbridge_abi::symbols;
use symbridge_core::{Engine, Entity};
use symbridge_testkit::generators::{operation_sequence_strategy, EntityOperation, Query};
use symbridge_testkit::prelude::PropTestConfig;
use symbridge_testkit::FakeEngine;

fn run_query(engine: &Engine, entity: &Entity, query: Query, pool: &mut Vec<Entity>) {
    match query {
        Query::Stringify => {
            let _ = entity.stringify();
        }
        Query::Nodes => {
            if let Ok(nodes) = entity.nodes() {
                pool.extend(nodes.iter().skip(1).take(2).cloned());
            }
        }
        Query::Vars => {
            if let Ok(vars) = entity.vars() {
                pool.extend(vars.iter().cloned());
            }
        }
        Query::Children => {
            if let Ok(children) = entity.direct_children() {
                pool.extend(children.iter().cloned());
            }
        }
        Query::Evaled => {
            if let Ok(evaled) = entity.evaled() {
                pool.push(evaled.clone());
            }
        }
        Query::Differentiate => {
            if let Ok(x) = engine.parse("x") {
                if let Ok(derivative) = entity.differentiate(&x) {
                    pool.push(derivative);
                }
            }
        }
        Query::Simplify => {
            if let Ok(simplified) = entity.simplify() {
                pool.push(simplified);
            }
        }
    }
}

fn run_sequence(engine: &Engine, operations: Vec<EntityOperation>) {
    let mut pool: Vec<Entity> = Vec::new();

    for operation in operations {
        match operation {
            EntityOperation::Parse { text } => {
                if let Ok(entity) = engine.parse(&text) {
                    pool.push(entity);
                }
            }
            _ if pool.is_empty() => {}
            EntityOperation::Share { index } => {
                let shared = pool[index % pool.len()].clone();
                pool.push(shared);
            }
            EntityOperation::Release { index } => {
                let index = index % pool.len();
                drop(pool.swap_remove(index));
            }
            EntityOperation::Query { index, query } => {
                let entity = pool[index % pool.len()].clone();
                run_query(engine, &entity, query, &mut pool);
            }
            EntityOperation::Add { left, right } => {
                let sum = &pool[left % pool.len()] + &pool[right % pool.len()];
                if let Ok(sum) = sum {
                    pool.push(sum);
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn every_handle_is_released_once(operations in operation_sequence_strategy(1, 40)) {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        run_sequence(&engine, operations);
        drop(engine);

        let ledger = fake.ledger();
        prop_assert!(ledger.is_balanced(), "unbalanced ledger: {:?}", ledger);
    }
}

#[test]
fn engine_outlives_its_handle() {
    common::init_tracing();
    let fake = FakeEngine::new();
    let expr = {
        let engine = Engine::new(fake.clone());
        engine.parse("x + 1").unwrap()
    };

    assert_eq!(expr.stringify().unwrap(), "x + 1");
    drop(expr);
    assert!(fake.ledger().is_balanced());
}

#[test]
fn concurrent_first_access_computes_once() {
    let fake = FakeEngine::new();
    let engine = Engine::new(fake.clone());
    let expr = engine.parse("a * b + sin(c)").unwrap();

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                assert_eq!(expr.nodes().unwrap().len(), 6);
                assert_eq!(expr.stringify().unwrap(), "a * b + sin(c)");
            });
        }
    });

    let ledger = fake.ledger();
    assert_eq!(ledger.calls(symbols::ENTITY_NODES), 1);
    assert_eq!(ledger.calls(symbols::ENTITY_TO_STRING), 1);
}

#[test]
fn entities_move_across_threads() {
    let fake = FakeEngine::new();
    let engine = Engine::new(fake.clone());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                let expr = engine.parse(&format!("x + {i}")).unwrap();
                let shared = expr.clone();
                drop(expr);
                shared.to_string()
            })
        })
        .collect();

    let mut texts: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    texts.sort();
    assert_eq!(texts, ["x + 0", "x + 1", "x + 2", "x + 3"]);

    drop(engine);
    assert!(fake.ledger().is_balanced());
}
