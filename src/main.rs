//! CLI entry point for `nthmail`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};

use nthmail::config::Config;
use nthmail::inbox::InboxRecord;
use nthmail::model::mail::StructuredMessage;
use nthmail::parser::eml::load_eml;
use nthmail::parser::{MessageDecoder, ParseMode};
use nthmail::select::FormatRequest;

#[derive(Parser)]
#[command(
    name = "nthmail",
    version,
    about = "Decode raw email messages into displayable bodies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List envelope headers without decoding bodies
    Headers {
        #[arg(required = true, value_name = "FILE")]
        paths: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Decode a message and print its preferred body
    Show {
        path: PathBuf,
        /// Preferred body format: html, md or text
        #[arg(short, long)]
        format: Option<String>,
        /// Print the whole decoded message as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a message against the inbox policy and print its stored record
    Ingest {
        path: PathBuf,
        /// Envelope recipient
        #[arg(long)]
        rcpt: String,
        /// Envelope sender
        #[arg(long, default_value = "")]
        from: String,
        /// Inbox domain (defaults to the configured one)
        #[arg(long)]
        domain: Option<String>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = nthmail::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Headers { paths, json } => cmd_headers(&paths, json, &config),
        Commands::Show { path, format, json } => cmd_show(&path, format.as_deref(), json, &config),
        Commands::Ingest {
            path,
            rcpt,
            from,
            domain,
        } => cmd_ingest(&path, &rcpt, &from, domain.as_deref(), &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = nthmail::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "nthmail.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Header-only decode of each file, as a listing view would do.
fn cmd_headers(paths: &[PathBuf], json: bool, config: &Config) -> anyhow::Result<()> {
    let decoder = MessageDecoder::from_config(&config.parser);
    let mut messages = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = load_eml(path, config.parser.max_message_size)?;
        let msg = decoder.parse(&raw, ParseMode::HeadersOnly)?;
        messages.push((path.as_path(), msg));
    }

    if json {
        let listing: Vec<_> = messages
            .iter()
            .map(|(path, msg)| {
                serde_json::json!({
                    "file": path.display().to_string(),
                    "from": msg.from,
                    "to": msg.to,
                    "subject": msg.subject,
                    "date": msg.parsed_date().map(|d| d.to_rfc3339()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for (_, msg) in &messages {
            print_listing_line(msg);
        }
    }
    Ok(())
}

fn print_listing_line(msg: &StructuredMessage) {
    let date = msg
        .parsed_date()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".repeat(16));
    println!("{date}  {:<32}  {}", truncate(&msg.from, 32), msg.subject);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Full decode plus body selection.
fn cmd_show(
    path: &Path,
    format: Option<&str>,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let raw = load_eml(path, config.parser.max_message_size)?;
    let request = FormatRequest::from_query(format);
    if format.is_some() && request.format.is_none() {
        tracing::warn!(format = format.unwrap_or_default(), "Unknown format requested, ignoring");
    }

    let msg = MessageDecoder::from_config(&config.parser)
        .parse(&raw, ParseMode::Full)?
        .with_preferred_body(request);

    if json {
        println!("{}", serde_json::to_string_pretty(&msg)?);
        return Ok(());
    }

    println!("From:    {}", msg.from);
    println!("To:      {}", msg.to.join(", "));
    if !msg.cc.is_empty() {
        println!("Cc:      {}", msg.cc.join(", "));
    }
    println!("Subject: {}", msg.subject);
    println!("Date:    {}", msg.date);
    match msg.preferred_body() {
        Some(part) => {
            println!(
                "Format:  {} (part {} of {})",
                part.format,
                msg.preferred_index.unwrap_or(0) + 1,
                msg.body_parts.len()
            );
            println!();
            println!("{}", part.text);
        }
        None => println!("\n(no displayable body)"),
    }
    Ok(())
}

fn cmd_ingest(
    path: &Path,
    rcpt: &str,
    from: &str,
    domain: Option<&str>,
    config: &Config,
) -> anyhow::Result<()> {
    let raw = load_eml(path, config.parser.max_message_size)?;
    let domain = domain.unwrap_or(&config.inbox.domain);
    let record = InboxRecord::ingest(raw, from, rcpt, domain, chrono::Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "nthmail", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
