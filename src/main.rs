use clap::Parser;
use noodles::bgzf;
use std::fs::File;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use annidx::{
    Cli, IndexBuilder, Mode, QueryEngine,
    storage::{LocalStorage, OutputSink},
};

type Engine = QueryEngine<bgzf::Reader<File>, OutputSink>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout carries the JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let storage = LocalStorage::new(cli.input.clone(), cli.index_path.clone());
    storage.check_input()?;

    match cli.mode() {
        Mode::CreateIndex => {
            IndexBuilder::new(cli.schema()?).create(&storage)?;
        }
        Mode::List => with_engine(&cli, &storage, |engine| {
            engine.list_chromosomes_and_sections()
        })?,
        Mode::HeaderOnly => with_engine(&cli, &storage, |engine| engine.print_header_only())?,
        Mode::Section(name) => with_engine(&cli, &storage, |engine| engine.print_section(&name))?,
        Mode::Query {
            regions,
            include_header,
        } => with_engine(&cli, &storage, |engine| {
            let emitted = engine.process_query(&regions, include_header)?;
            tracing::info!(queries = regions.len(), records = emitted, "query finished");
            Ok(())
        })?,
    }

    Ok(())
}

/// Open the index, document and output sink, run `f`, then finish the sink.
fn with_engine<F>(cli: &Cli, storage: &LocalStorage, f: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut Engine) -> annidx::Result<()>,
{
    storage.check_index(cli.check_stale)?;
    let index = storage.read_index()?;
    let reader = storage.open_input()?;
    let sink = match &cli.out {
        Some(path) => OutputSink::bgzf_file(path)?,
        None => OutputSink::console(),
    };

    let mut engine = QueryEngine::new(index, reader, sink, cli.query_config());
    f(&mut engine)?;
    engine.into_output().finish()?;
    Ok(())
}
