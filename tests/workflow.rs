use std::sync::Arc;
use std::thread;

use modelflow::ModelflowError;
use modelflow::events::{MemoryEventSink, STATUS_HISTORY_INCONSISTENCIES};
use modelflow::model::{Entity, EntityKey, FieldDescriptor, ObjectGraph};
use modelflow::sample;
use modelflow::workflow::{
    Context, HistoryStore, MemoryHistoryStore, NewRecord, StateMachine, Subject,
};

fn fake_item() -> Arc<StateMachine> {
    Arc::new(sample::fake_item_machine().unwrap())
}

fn current_count(store: &MemoryHistoryStore, key: &EntityKey) -> usize {
    store.current(key).unwrap().len()
}

#[test]
fn fake_item_walks_its_workflow() {
    let store = Arc::new(MemoryHistoryStore::new());
    let mut ctx = Context::new(Subject::unsaved("FakeItem"), fake_item(), store.clone());

    assert_eq!(ctx.current_state().unwrap().label(), "CREATED");
    assert_eq!(store.entity_count(), 0);

    assert_eq!(ctx.on_saved(1).unwrap().label(), "CREATED");
    let key = EntityKey::new("FakeItem", 1);
    assert_eq!(current_count(&store, &key), 1);

    for expected in ["EMAILED", "CONSULTED", "PROVIDED"] {
        ctx.advance("SYSTEM").unwrap();
        assert_eq!(ctx.current_state().unwrap().label(), expected);
        assert_eq!(current_count(&store, &key), 1);
    }

    let trail = ctx.audit().unwrap().unwrap();
    let labels: Vec<_> = trail.state_transitions.iter().map(|s| s.label()).collect();
    assert_eq!(labels, vec!["CREATED", "EMAILED", "CONSULTED", "PROVIDED"]);
    assert_eq!(trail.current.unwrap().label(), "PROVIDED");
}

#[test]
fn context_binds_to_graph_entity() {
    let mut graph = ObjectGraph::new();
    graph.define("Order", vec![FieldDescriptor::scalar("total")]);
    let order = graph.insert("Order", 42).unwrap();
    let entity = graph.get(order);

    let store = Arc::new(MemoryHistoryStore::new());
    let subject = Subject::from(&entity as &dyn Entity);
    let mut ctx = Context::new(subject, fake_item(), store.clone());

    assert_eq!(ctx.advance("clerk").unwrap().label(), "EMAILED");
    assert_eq!(current_count(&store, &entity.key()), 1);
}

#[test]
fn unsaved_entity_cannot_advance() {
    let store = Arc::new(MemoryHistoryStore::new());
    let mut ctx = Context::new(Subject::unsaved("FakeItem"), fake_item(), store);
    assert!(matches!(
        ctx.advance("SYSTEM"),
        Err(ModelflowError::IllegalTransition { .. })
    ));
}

#[test]
fn concurrent_advances_keep_one_current_row() {
    let store = Arc::new(MemoryHistoryStore::new());
    let labels: Vec<String> = (0..64).map(|i| format!("S{i}")).collect();
    let machine = Arc::new(StateMachine::sequence("long", &labels[..]).unwrap());
    let key = EntityKey::new("Job", 7);

    thread::scope(|scope| {
        for worker in 0..8 {
            let store = store.clone();
            let machine = machine.clone();
            let key = key.clone();
            scope.spawn(move || {
                let mut ctx = Context::new(Subject::new("Job", Some(key.id)), machine, store);
                for _ in 0..5 {
                    ctx.advance(&format!("worker-{worker}")).unwrap();
                }
            });
        }
    });

    let history = store.history(&key).unwrap();
    assert_eq!(history.iter().filter(|r| r.current).count(), 1);
    // One synthesized initial row plus 40 transitions, each a distinct step.
    assert_eq!(history.len(), 41);
    assert_eq!(store.current(&key).unwrap()[0].status.label(), "S40");
}

#[test]
fn different_entities_advance_independently() {
    let store = Arc::new(MemoryHistoryStore::new());
    let machine = fake_item();

    thread::scope(|scope| {
        for id in 0..4i64 {
            let store = store.clone();
            let machine = machine.clone();
            scope.spawn(move || {
                let mut ctx = Context::new(Subject::new("FakeItem", Some(id.into())), machine, store);
                ctx.advance("SYSTEM").unwrap();
                ctx.advance("SYSTEM").unwrap();
            });
        }
    });

    for id in 0..4i64 {
        let key = EntityKey::new("FakeItem", id);
        let current = store.current(&key).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].status.label(), "CONSULTED");
    }
}

#[test]
fn corrupted_history_is_reported_not_raised() {
    let store = Arc::new(MemoryHistoryStore::new());
    let events = Arc::new(MemoryEventSink::new());
    let machine = fake_item();
    let key = EntityKey::new("FakeItem", 11);
    for label in ["EMAILED", "CONSULTED"] {
        store.import(
            NewRecord::now(key.clone(), machine.state(Some(label)).unwrap(), "import"),
            true,
        );
    }

    let mut ctx = Context::new(Subject::new("FakeItem", Some(key.id.clone())), machine, store)
        .with_events(events.clone());
    let state = ctx.current_state().unwrap();

    assert_eq!(state.label(), "CONSULTED");
    assert_eq!(events.count(STATUS_HISTORY_INCONSISTENCIES), 1);
}
