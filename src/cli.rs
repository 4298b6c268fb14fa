use std::error::Error;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use wordpick::source::{SourceOverride, SourceTable};
use wordpick::web::{self, WebConfig};
use wordpick::{DEFAULT_COUNT, DEFAULT_DATABASE, DEFAULT_LANGUAGE, PickDefaults, UsageStore};

#[derive(Parser, Debug)]
#[command(
    name = "wordpick",
    about = "Serve never-repeated words from random encyclopedia articles",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        /// SQLite file holding the words already served.
        #[arg(long, default_value = DEFAULT_DATABASE)]
        database: PathBuf,
        /// Add or replace a random-article source, as CODE=URL.
        #[arg(long = "source", value_name = "CODE=URL")]
        sources: Vec<SourceOverride>,
        /// Language used when a request names none.
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        default_language: String,
        /// Word count used when a request names no valid count.
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        default_count: usize,
    },
    /// List the words already served for a language.
    Used {
        /// Language code to list.
        #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
        language: String,
        /// SQLite file holding the words already served.
        #[arg(long, default_value = DEFAULT_DATABASE)]
        database: PathBuf,
        /// Emit JSON instead of one word per line.
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            addr,
            database,
            sources,
            default_language,
            default_count,
        } => handle_serve(
            addr,
            database,
            sources,
            PickDefaults {
                language: default_language,
                count: default_count,
            },
        ),
        Command::Used {
            language,
            database,
            json,
        } => handle_used(&language, database, json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_serve(
    addr: SocketAddr,
    database: PathBuf,
    overrides: Vec<SourceOverride>,
    defaults: PickDefaults,
) -> Result<(), Box<dyn Error>> {
    let sources = overrides
        .into_iter()
        .fold(SourceTable::wikipedia(), |table, entry| {
            table.with_source(entry.language, entry.url)
        });
    let config = WebConfig {
        addr,
        database,
        sources,
        defaults,
    };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::serve(config))?;
    Ok(())
}

fn handle_used(language: &str, database: PathBuf, as_json: bool) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    write_used(language, &database, as_json, &mut stdout.lock())
}

fn write_used(
    language: &str,
    database: &Path,
    as_json: bool,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    if !database.exists() {
        return Err(format!("No database found at {}", database.display()).into());
    }
    let store = UsageStore::open(database)?;
    let words = store.used_words_sorted(language)?;

    if as_json {
        let payload = json!({
            "language": language,
            "count": words.len(),
            "words": words,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
    } else if words.is_empty() {
        writeln!(out, "No words served yet for language \"{language}\".")?;
    } else {
        for word in &words {
            writeln!(out, "{word}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mktemp::Temp;

    fn seeded_database(dir: &Temp) -> PathBuf {
        let root: &Path = dir.as_ref();
        let path = root.join("words.db");
        let store = UsageStore::open(&path).unwrap();
        store
            .store_used(&["zebra".to_string(), "apple".to_string()], "en")
            .unwrap();
        path
    }

    fn render(language: &str, database: &Path, as_json: bool) -> String {
        let mut out = Vec::new();
        write_used(language, database, as_json, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn used_lists_words_alphabetically() {
        let dir = Temp::new_dir().unwrap();
        let path = seeded_database(&dir);
        assert_eq!(render("en", &path, false), "apple\nzebra\n");
    }

    #[test]
    fn used_reports_empty_language() {
        let dir = Temp::new_dir().unwrap();
        let path = seeded_database(&dir);
        assert_eq!(
            render("fr", &path, false),
            "No words served yet for language \"fr\".\n"
        );
    }

    #[test]
    fn used_emits_json_payload() {
        let dir = Temp::new_dir().unwrap();
        let path = seeded_database(&dir);
        let payload: serde_json::Value =
            serde_json::from_str(&render("en", &path, true)).unwrap();
        assert_eq!(payload["language"], "en");
        assert_eq!(payload["count"], 2);
        assert_eq!(payload["words"], json!(["apple", "zebra"]));
    }

    #[test]
    fn used_refuses_missing_database() {
        let dir = Temp::new_dir().unwrap();
        let root: &Path = dir.as_ref();
        let missing = root.join("absent.db");
        let mut out = Vec::new();
        let err = write_used("en", &missing, false, &mut out).unwrap_err();
        assert!(err.to_string().starts_with("No database found"));
        assert!(!missing.exists());
    }

    #[test]
    fn cli_parses_used_and_serve_arguments() {
        let cli = Cli::try_parse_from(["wordpick", "used", "-l", "de", "--json"]).unwrap();
        match cli.command {
            Command::Used { language, json, .. } => {
                assert_eq!(language, "de");
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "wordpick",
            "serve",
            "--source",
            "es=http://localhost/random",
            "--default-count",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Serve {
                sources,
                default_count,
                default_language,
                ..
            } => {
                assert_eq!(sources.len(), 1);
                assert_eq!(sources[0].language, "es");
                assert_eq!(default_count, 3);
                assert_eq!(default_language, "en");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
