use std::collections::HashSet;

use modelflow::ModelflowError;
use modelflow::model::{Entity, EntityKey, FieldDescriptor, ObjectGraph};
use modelflow::sample;
use modelflow::serializer::{
    FieldFilter, NodeValue, SerializedNode, Serializer, VisitedSet, serialize,
};
use proptest::prelude::*;
use serde_json::json;

fn abc_graph() -> (ObjectGraph, modelflow::model::NodeRef) {
    let mut graph = ObjectGraph::new();
    graph.define(
        "T",
        vec![
            FieldDescriptor::scalar("A"),
            FieldDescriptor::scalar("B"),
            FieldDescriptor::scalar("C"),
        ],
    );
    let t = graph.insert("T", 1).unwrap();
    graph.set(t, "A", 1).unwrap();
    graph.set(t, "B", 2).unwrap();
    graph.set(t, "C", 3).unwrap();
    (graph, t)
}

#[test]
fn include_keeps_only_named_field() {
    let (graph, t) = abc_graph();
    let node = serialize(&graph.get(t), Some(&["T.B"][..]), None).unwrap();
    assert_eq!(node.field_names(), vec!["B"]);
}

#[test]
fn exclude_drops_named_field() {
    let (graph, t) = abc_graph();
    let node = serialize(&graph.get(t), None, Some(&["T.B"][..])).unwrap();
    assert_eq!(node.field_names(), vec!["A", "C"]);
}

#[test]
fn include_and_exclude_together_fail() {
    let (graph, t) = abc_graph();
    let err = serialize(&graph.get(t), Some(&["T.A"][..]), Some(&["T.B"][..])).unwrap_err();
    assert!(matches!(err, ModelflowError::InvalidFilterConfiguration));
}

#[test]
fn library_graph_round_trip_shape() {
    let (graph, author) = sample::library_graph().unwrap();
    let node = Serializer::default().serialize(&graph.get(author));

    assert_eq!(
        node.to_json().unwrap(),
        json!({
            "id": 1,
            "type": "Author",
            "name": "Ursula K. Le Guin",
            "born": "1929-10-21T00:00:00",
            "genre": {"selected": 1, "labels": ["Science fiction", "Fantasy", "Poetry"]},
            "awards": [
                {"checked": true, "label": "Hugo"},
                {"checked": false, "label": "Nebula"},
                {"checked": false, "label": "Locus"},
                {"checked": true, "label": "World Fantasy"},
                {"checked": false, "label": "Newbery"},
                {"checked": false, "label": "National Book"}
            ],
            "books": [
                {
                    "id": 10,
                    "type": "Book",
                    "title": "A Wizard of Earthsea",
                    "author": {"id": 1, "type": "Author"},
                    "recommends": [
                        {
                            "id": 11,
                            "type": "Book",
                            "title": "The Dispossessed",
                            "author": {"id": 1, "type": "Author"},
                            "recommends": [{"id": 10, "type": "Book"}]
                        }
                    ]
                },
                {"id": 11, "type": "Book"}
            ]
        })
    );
}

#[test]
fn filters_apply_across_the_whole_traversal() {
    let (graph, author) = sample::library_graph().unwrap();
    let filter = FieldFilter::exclude(&["Book.recommends", "Author.awards", "Author.born"]);
    let node = Serializer::new(filter).serialize(&graph.get(author));

    assert_eq!(node.field_names(), vec!["name", "genre", "books"]);
    let books = node.get("books").and_then(NodeValue::as_nodes).unwrap();
    assert_eq!(books[0].field_names(), vec!["title", "author"]);
    assert_eq!(books[1].field_names(), vec!["title", "author"]);
    assert!(!books[1].is_stub());
}

#[test]
fn include_without_entries_for_a_type_empties_it() {
    let (graph, author) = sample::library_graph().unwrap();
    let filter = FieldFilter::include(&["Author.name", "Author.books"]);
    let node = Serializer::new(filter).serialize(&graph.get(author));

    let books = node.get("books").and_then(NodeValue::as_nodes).unwrap();
    assert_eq!(books.len(), 2);
    assert!(books.iter().all(|b| b.field_names().is_empty()));
}

#[test]
fn output_is_deterministic() {
    let (graph, author) = sample::library_graph().unwrap();
    let serializer = Serializer::default();
    let first = serializer.serialize(&graph.get(author)).to_json_pretty().unwrap();
    let second = serializer.serialize(&graph.get(author)).to_json_pretty().unwrap();
    assert_eq!(first, second);
}

#[test]
fn stubs_skip_filters_and_recursion() {
    let (graph, author) = sample::library_graph().unwrap();
    let mut visited = VisitedSet::new();
    visited.insert(EntityKey::new("Author", 1));

    let node = Serializer::default().serialize_into(&graph.get(author), &mut visited);
    assert!(node.is_stub());
    assert_eq!(node.to_json().unwrap(), json!({"id": 1, "type": "Author"}));
}

fn collect_keys(node: &SerializedNode, full: &mut Vec<EntityKey>, stubs: &mut Vec<EntityKey>) {
    if node.is_stub() {
        stubs.push(node.key());
        return;
    }
    full.push(node.key());
    for (_, value) in node.fields() {
        match value {
            NodeValue::Node(child) => collect_keys(child, full, stubs),
            NodeValue::Nodes(children) => {
                for child in children {
                    collect_keys(child, full, stubs);
                }
            }
            _ => {}
        }
    }
}

proptest! {
    #[test]
    fn random_graphs_terminate_with_each_entity_serialized_once(
        size in 1usize..12,
        links in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
        root in 0usize..12,
    ) {
        let mut graph = ObjectGraph::new();
        graph.define(
            "N",
            vec![
                FieldDescriptor::reference("next"),
                FieldDescriptor::reference_set("peers"),
                FieldDescriptor::reverse("pointed_by", "N", "next"),
            ],
        );
        let nodes: Vec<_> = (0..size)
            .map(|i| graph.insert("N", i as i64).unwrap())
            .collect();
        for (k, (from, to)) in links.iter().enumerate() {
            let (from, to) = (nodes[from % size], nodes[to % size]);
            if k % 2 == 0 {
                graph.link(from, "next", Some(to)).unwrap();
            } else {
                graph.add(from, "peers", to).unwrap();
            }
        }

        let start = graph.get(nodes[root % size]);
        let out = Serializer::default().serialize(&start);

        let (mut full, mut stubs) = (Vec::new(), Vec::new());
        collect_keys(&out, &mut full, &mut stubs);

        let unique: HashSet<_> = full.iter().cloned().collect();
        prop_assert_eq!(unique.len(), full.len());
        for stub in &stubs {
            prop_assert!(unique.contains(stub));
        }
        prop_assert_eq!(out.key(), start.key());
    }
}
