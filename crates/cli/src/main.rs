//! DocFeed CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments**: global client options plus one document command.
//! 2. **Wire observability**: configure `tracing-subscriber` with an
//!    `EnvFilter` (`RUST_LOG`, default `info`) and a text or JSON layer on
//!    stderr, so stdout carries only results.
//! 3. **Construct infrastructure**: build the reqwest-backed
//!    [`transport::HttpTransport`] and inject it into [`document::Client`].
//! 4. **Run the command** and print each [`document::OperationResult`].

mod args;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use document::{Client, Document, Operation, OperationResult, SendResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use transport::HttpTransport;

use crate::args::{Cli, Command, LogFormat, PostInput};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let transport = HttpTransport::new(&cli.transport_config()).context("failed to set up HTTP transport")?;
    let client = Arc::new(
        Client::new(cli.client_options(), Arc::new(transport))
            .with_context(|| format!("invalid target '{}'", cli.target))?,
    );

    let success = match cli.command {
        Command::Post { first, file } => {
            let doc = match PostInput::resolve(&first, file.as_ref())? {
                PostInput::WithId(id, file) => Document::new(id, read_body(&file)?),
                PostInput::FromDocument(file) => post_from_document(&file)?,
            };
            send(&client, doc).await?
        }
        Command::Put { id, file, write } => {
            let mut doc = Document::put(id, read_body(&file)?).with_create(write.create);
            doc.condition = write.condition;
            send(&client, doc).await?
        }
        Command::Update { id, file, write } => {
            let mut doc = Document::update(id, read_body(&file)?).with_create(write.create);
            doc.condition = write.condition;
            send(&client, doc).await?
        }
        Command::Remove { id, condition } => {
            let mut doc = Document::remove(id);
            doc.condition = condition;
            send(&client, doc).await?
        }
        Command::Get { id } => {
            let result = client.get(&id).await?;
            print_result(&result);
            result.is_success()
        }
        Command::Feed { file, concurrency } => feed(&client, &file, concurrency).await?,
    };

    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&client.stats())?);
    }
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn read_body(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Reads a file holding one `put` operation and turns it into a new-document post.
fn post_from_document(path: &Path) -> Result<Document> {
    let mut documents = document::feed::decode(read_body(path)?.as_slice())
        .with_context(|| format!("failed to decode {}", path.display()))?;
    let (Some(doc), None) = (documents.pop(), documents.pop()) else {
        bail!("{} must hold exactly one document", path.display());
    };
    if doc.operation != Some(Operation::Put) {
        bail!("{} must hold a put operation to post without an id", path.display());
    }
    Ok(Document::new(doc.id, doc.body))
}

async fn send(client: &Client, doc: Document) -> Result<bool> {
    let result = client.send(&doc).await?;
    print_result(&result);
    Ok(result.is_success())
}

/// Sends every operation in a feed file with at most `concurrency` in flight.
async fn feed(client: &Arc<Client>, path: &Path, concurrency: u32) -> Result<bool> {
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let documents = document::feed::decode(std::io::BufReader::new(file))
        .with_context(|| format!("failed to decode feed {}", path.display()))?;
    tracing::info!(operations = documents.len(), concurrency, "feeding");

    let permits = Arc::new(Semaphore::new(concurrency as usize));
    let mut tasks = JoinSet::new();
    for doc in documents {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .context("feed semaphore closed")?;
        let client = Arc::clone(client);
        tasks.spawn(async move {
            let _permit = permit;
            client.send(&doc).await
        });
    }

    let mut all_succeeded = true;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.context("feed task panicked")??;
        if !result.is_success() {
            all_succeeded = false;
            print_result(&result);
        }
    }

    let stats = client.stats();
    tracing::info!(
        requests = stats.requests_issued,
        succeeded = stats.successes(),
        failed = stats.failures(),
        "feed complete"
    );
    Ok(all_succeeded)
}

fn print_result(result: &SendResult) {
    let report = OperationResult::from(result);
    if report.success {
        println!("Success: {}", report.message);
    } else {
        println!("Error: {}", report.message);
    }
    if let Some(detail) = &report.detail {
        println!("{detail}");
    }
    if let Some(payload) = &report.payload {
        println!();
        println!("{payload}");
    }
}
