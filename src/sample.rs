//! Sample data used by the CLI.

use chrono::NaiveDate;

use crate::error::{ModelflowError, Result};
use crate::model::{Choice, FieldDescriptor, NodeRef, ObjectGraph};
use crate::workflow::StateMachine;

pub const FAKE_ITEM_STATES: [&str; 4] = ["CREATED", "EMAILED", "CONSULTED", "PROVIDED"];

pub fn fake_item_machine() -> Result<StateMachine> {
    StateMachine::sequence("fake_item", &FAKE_ITEM_STATES)
}

/// A small library where authors and books point at each other: every
/// book links back to its author, authors list their books through a
/// reverse relation, and books recommend each other.
pub fn library_graph() -> Result<(ObjectGraph, NodeRef)> {
    let mut graph = ObjectGraph::new();
    graph
        .define(
            "Author",
            vec![
                FieldDescriptor::scalar("name"),
                FieldDescriptor::scalar("born"),
                FieldDescriptor::choice(
                    "genre",
                    vec![
                        Choice::new("sf", "Science fiction"),
                        Choice::new("fa", "Fantasy"),
                        Choice::new("po", "Poetry"),
                    ],
                ),
                FieldDescriptor::bit_flags(
                    "awards",
                    &["Hugo", "Nebula", "Locus", "World Fantasy", "Newbery", "National Book"],
                ),
                FieldDescriptor::reverse("books", "Book", "author"),
            ],
        )
        .define(
            "Book",
            vec![
                FieldDescriptor::scalar("title"),
                FieldDescriptor::reference("author"),
                FieldDescriptor::reference_set("recommends"),
            ],
        );

    let author = graph.insert("Author", 1)?;
    graph.set(author, "name", "Ursula K. Le Guin")?;
    let born = NaiveDate::from_ymd_opt(1929, 10, 21)
        .ok_or_else(|| ModelflowError::Graph("invalid sample date".into()))?;
    graph.set(author, "born", born)?;
    graph.set(author, "genre", "fa")?;
    graph.set(author, "awards", 9)?;

    let earthsea = graph.insert("Book", 10)?;
    graph.set(earthsea, "title", "A Wizard of Earthsea")?;
    graph.link(earthsea, "author", Some(author))?;

    let dispossessed = graph.insert("Book", 11)?;
    graph.set(dispossessed, "title", "The Dispossessed")?;
    graph.link(dispossessed, "author", Some(author))?;

    graph.add(earthsea, "recommends", dispossessed)?;
    graph.add(dispossessed, "recommends", earthsea)?;

    Ok((graph, author))
}
