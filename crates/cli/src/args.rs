//! Command-line arguments.
//!
//! ```text
//! docfeed [--target URL] [--timeout-ms MS] [--param K=V]... <command>
//!   post   [id] <file>
//!   put    <id> <file> [--create] [--condition EXPR]
//!   update <id> <file> [--create] [--condition EXPR]
//!   remove <id> [--condition EXPR]
//!   get    <id>
//!   feed   <file> [--concurrency N]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use document::{ClientOptions, DocumentId, ParseError, QueryParams, DEFAULT_BASE_URL};
use transport::TransportConfig;

/// Extra time the transport waits beyond the server-side timeout, so the
/// server gets the chance to answer with its own timeout response first.
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// DocFeed - issue document operations against a /document/v1 API
#[derive(Parser, Debug)]
#[command(name = "docfeed")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the document API container
    #[arg(long, global = true, env = "DOCFEED_TARGET", default_value = DEFAULT_BASE_URL)]
    pub target: String,

    /// Server-side operation timeout in milliseconds
    #[arg(long, global = true, env = "DOCFEED_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Extra query parameter sent with every request (repeatable)
    #[arg(long = "param", global = true, value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Print call statistics as JSON after the command
    #[arg(long, global = true)]
    pub stats: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new document from a JSON file
    ///
    /// Without an id, the file must hold a single `put` operation and the
    /// id is taken from it.
    Post {
        /// Document id, or the file when the id comes from the document
        #[arg(value_name = "ID|FILE")]
        first: String,
        file: Option<PathBuf>,
    },

    /// Write a whole document from a JSON file
    Put {
        id: DocumentId,
        file: PathBuf,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Apply a partial update from a JSON file
    Update {
        id: DocumentId,
        file: PathBuf,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Remove a document
    Remove {
        id: DocumentId,
        /// Test-and-set condition the stored document must satisfy
        #[arg(long)]
        condition: Option<String>,
    },

    /// Fetch a document and print it
    Get { id: DocumentId },

    /// Send every operation in a JSON feed file
    Feed {
        file: PathBuf,
        /// Maximum number of operations in flight at once
        #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..))]
        concurrency: u32,
    },
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Create the document if it does not exist
    #[arg(long)]
    pub create: bool,

    /// Test-and-set condition the stored document must satisfy
    #[arg(long)]
    pub condition: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Client options assembled from the global flags.
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::new(self.target.clone());
        options.timeout = self.timeout_ms.map(Duration::from_millis);
        options.default_params = self.params.iter().cloned().collect::<QueryParams>();
        options
    }

    /// Transport settings. A server-side timeout also bounds the whole
    /// exchange, with [`REQUEST_TIMEOUT_MARGIN`] to spare.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            request_timeout: self
                .timeout_ms
                .filter(|ms| *ms > 0)
                .map(|ms| Duration::from_millis(ms) + REQUEST_TIMEOUT_MARGIN),
            ..TransportConfig::default()
        }
    }
}

/// Where `post` takes its document from.
#[derive(Debug, PartialEq)]
pub enum PostInput {
    /// An explicit id and a file holding the document body.
    WithId(DocumentId, PathBuf),
    /// A file holding one `put` operation that names its own id.
    FromDocument(PathBuf),
}

impl PostInput {
    pub fn resolve(first: &str, file: Option<&PathBuf>) -> Result<Self, ParseError> {
        match file {
            Some(file) => Ok(Self::WithId(first.parse()?, file.clone())),
            None => Ok(Self::FromDocument(PathBuf::from(first))),
        }
    }
}

fn parse_param(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{text}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_put_with_global_flags() {
        let cli = Cli::try_parse_from([
            "docfeed",
            "--target",
            "https://example.com:1337",
            "--timeout-ms",
            "5000",
            "put",
            "id:ns:type::doc1",
            "doc.json",
            "--create",
            "--param",
            "route=default",
        ])
        .unwrap();

        let options = cli.client_options();
        assert_eq!(options.base_url, "https://example.com:1337");
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.default_params.get("route").map(String::as_str), Some("default"));
        match cli.command {
            Command::Put { id, file, write } => {
                assert_eq!(id.user_specific(), "doc1");
                assert_eq!(file, PathBuf::from("doc.json"));
                assert!(write.create);
                assert_eq!(write.condition, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn timeout_bounds_the_transport_too() {
        let cli = Cli::try_parse_from(["docfeed", "--timeout-ms", "2000", "get", "id:ns:t::a"]).unwrap();
        assert_eq!(
            cli.transport_config().request_timeout,
            Some(Duration::from_secs(2) + REQUEST_TIMEOUT_MARGIN)
        );

        let cli = Cli::try_parse_from(["docfeed", "get", "id:ns:t::a"]).unwrap();
        assert_eq!(cli.transport_config(), TransportConfig::default());
    }

    #[test]
    fn post_takes_an_optional_id() {
        let cli = Cli::try_parse_from(["docfeed", "post", "id:ns:t::a", "doc.json"]).unwrap();
        let Command::Post { first, file } = cli.command else {
            panic!("expected post");
        };
        let input = PostInput::resolve(&first, file.as_ref()).unwrap();
        assert_eq!(
            input,
            PostInput::WithId("id:ns:t::a".parse().unwrap(), PathBuf::from("doc.json"))
        );

        let cli = Cli::try_parse_from(["docfeed", "post", "doc.json"]).unwrap();
        let Command::Post { first, file } = cli.command else {
            panic!("expected post");
        };
        let input = PostInput::resolve(&first, file.as_ref()).unwrap();
        assert_eq!(input, PostInput::FromDocument(PathBuf::from("doc.json")));

        assert!(PostInput::resolve("not-an-id", Some(&PathBuf::from("doc.json"))).is_err());
    }

    #[test]
    fn rejects_invalid_ids_and_params() {
        assert!(Cli::try_parse_from(["docfeed", "get", "not-an-id"]).is_err());
        assert!(Cli::try_parse_from(["docfeed", "--param", "novalue", "get", "id:ns:t::a"]).is_err());
        assert!(Cli::try_parse_from(["docfeed", "feed", "f.json", "--concurrency", "0"]).is_err());
    }

    #[test]
    fn verifies_command_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
