use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;

use modelflow::cli::{Cli, Command};
use modelflow::config::ModelflowConfig;
use modelflow::sample;
use modelflow::serializer::{FieldFilter, Serializer};
use modelflow::telemetry;
use modelflow::ui::Printer;
use modelflow::workflow::{Context, MemoryHistoryStore, Subject};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ModelflowConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ModelflowConfig::load()?,
    };
    let log_format = cli.log_format.map(Into::into).unwrap_or(config.log_format);
    telemetry::init(cli.verbose, log_format)?;

    match cli.command {
        Command::Demo { actor } => run_demo(&config, &actor),
        Command::Graph { include, exclude } => run_graph(&config, &include, &exclude),
    }
}

fn run_demo(config: &ModelflowConfig, actor: &str) -> Result<()> {
    let printer = Printer::default();
    let machine = Arc::new(sample::fake_item_machine()?);
    let store = Arc::new(MemoryHistoryStore::new());
    let mut ctx = Context::new(Subject::unsaved("FakeItem"), machine.clone(), store)
        .with_config(config);

    let mut step = 0;
    let state = ctx.current_state()?;
    printer.state(step, &state, machine.is_terminal(&state));

    ctx.on_saved(1)?;
    loop {
        step += 1;
        let state = ctx.advance(actor)?;
        let terminal = machine.is_terminal(&state);
        printer.state(step, &state, terminal);
        if terminal {
            break;
        }
    }

    if let Some(trail) = ctx.audit()? {
        printer.audit(&trail);
    }
    Ok(())
}

fn run_graph(config: &ModelflowConfig, include: &[String], exclude: &[String]) -> Result<()> {
    let include = (!include.is_empty()).then_some(include);
    let exclude = (!exclude.is_empty()).then_some(exclude);
    let filter = FieldFilter::new(include, exclude)?;

    let (graph, root) = sample::library_graph()?;
    let node = Serializer::from_config(config, filter).serialize(&graph.get(root));
    Printer::default().json("Library", &node.to_json_pretty()?);
    Ok(())
}
