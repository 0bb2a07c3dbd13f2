use std::{
    io::{IsTerminal, Write},
    path::PathBuf,
    process::Command as Process,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use indicatif::ProgressBar;
use output::{OutputFormat, Renderer};
use progress::spinner;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};
use wp_reference_client::{types::ReferencePage, Filter};
use wp_reference_core::{bootstrap, ReferenceService};

const ENTER_ID_PROMPT: &str = "Please type the number list and press enter key: ";
const CONFIRM_CLEAR_PROMPT: &str = "Are you sure you want to drop the cache?";
const UNKNOWN_ID_MESSAGE: &str = "Your search ID is not found.";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "wp-reference",
    version,
    about = "Search the WordPress Code Reference from the shell."
)]
struct Cli {
    /// Renderer for command output.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Override the cache directory.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Configuration file to read instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Disable ANSI colors in log output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Suppress non-critical CLI output.
    #[arg(long, global = true)]
    quiet: bool,
    /// Disable progress indicators.
    #[arg(long, global = true)]
    no_progress: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, Clone)]
enum Command {
    /// Search the code reference.
    Search(SearchArgs),
    /// Show entry N of the last results.
    Show { id: u32 },
    /// Open the last shown document, or the reference home page, in a browser.
    Browser,
    /// Inspect or drop the local page cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args, Clone, Default)]
struct SearchArgs {
    /// Search keyword.
    term: Option<String>,
    /// Restrict results to these post types (function, hook, class, method).
    #[arg(long = "filter", value_delimiter = ',')]
    filters: Vec<Filter>,
    /// Search functions only.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["term", "class", "hook", "method"])]
    function: Option<String>,
    /// Search classes only.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["term", "hook", "method"])]
    class: Option<String>,
    /// Search hooks only.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["term", "method"])]
    hook: Option<String>,
    /// Search methods only.
    #[arg(long, value_name = "NAME", conflicts_with = "term")]
    method: Option<String>,
    /// Do not ask for a result number after a listing.
    #[arg(long)]
    no_prompt: bool,
}

impl SearchArgs {
    /// The term to search and the filter set to apply; a shortcut flag
    /// restricts the search to its own post type.
    fn request(&self) -> (String, Vec<Filter>) {
        let shortcuts = [
            (&self.function, Filter::Function),
            (&self.class, Filter::Class),
            (&self.hook, Filter::Hook),
            (&self.method, Filter::Method),
        ];
        for (name, filter) in shortcuts {
            if let Some(name) = name {
                return (name.clone(), vec![filter]);
            }
        }
        (self.term.clone().unwrap_or_default(), self.filters.clone())
    }
}

#[derive(Debug, Subcommand, Clone)]
enum CacheCommand {
    /// Report cache directory status and entry counts.
    Status,
    /// Delete every cached page and the search history.
    Clear {
        /// Skip the confirmation question.
        #[arg(long, short)]
        yes: bool,
    },
}

impl Cli {
    fn progress_enabled(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    if let Command::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(*shell, &mut command, "wp-reference", &mut std::io::stdout());
        return Ok(());
    }

    let service = bootstrap(cli.config.clone(), cli.cache_dir.clone())?;
    let renderer = Renderer::new(cli.format);

    match &cli.command {
        Command::Search(args) => handle_search(args, &cli, &renderer, &service).await,
        Command::Show { id } => handle_show(*id, &cli, &renderer, &service).await,
        Command::Browser => handle_browser(&service).await,
        Command::Cache { command } => handle_cache_command(command, &cli, &renderer, &service).await,
        Command::Completions { .. } => Ok(()),
    }
}

async fn handle_search(
    args: &SearchArgs,
    cli: &Cli,
    renderer: &Renderer,
    service: &ReferenceService,
) -> Result<()> {
    let (term, filters) = args.request();
    let spinner = spinner(cli.progress_enabled(), "Searching WordPress Reference...");
    let result = service.search(&term, &filters).await;
    finish_spinner(spinner, None);
    let page = result?;

    renderer.page(&page)?;

    let interactive = !args.no_prompt
        && !cli.quiet
        && renderer.is_text()
        && std::io::stdin().is_terminal();
    if matches!(page, ReferencePage::Listing(_)) && interactive {
        let id = prompt_for_id().await?;
        if let Some(id) = id {
            let spinner = progress::spinner(cli.progress_enabled(), "Loading document...");
            let result = service.select_by_id(id).await;
            finish_spinner(spinner, None);
            if let Some(page) = result? {
                renderer.page(&page)?;
            }
        }
    }
    Ok(())
}

async fn handle_show(
    id: u32,
    cli: &Cli,
    renderer: &Renderer,
    service: &ReferenceService,
) -> Result<()> {
    let spinner = spinner(cli.progress_enabled(), "Loading document...");
    let result = service.select_by_id(id).await;
    finish_spinner(spinner, None);
    match result? {
        Some(page) => renderer.page(&page),
        None => bail!(UNKNOWN_ID_MESSAGE),
    }
}

async fn handle_browser(service: &ReferenceService) -> Result<()> {
    let target = service.browser_target().await?;
    info!(target: "wp_reference_cli", url = %target, "opening browser");
    open_in_browser(&target)
}

async fn handle_cache_command(
    command: &CacheCommand,
    cli: &Cli,
    renderer: &Renderer,
    service: &ReferenceService,
) -> Result<()> {
    match command {
        CacheCommand::Status => {
            let status = service.cache_status().await?;
            if cli.quiet {
                return Ok(());
            }
            renderer.cache_status(&status)?;
        }
        CacheCommand::Clear { yes } => {
            if !yes && !confirm(CONFIRM_CLEAR_PROMPT).await? {
                debug!(target: "wp_reference_cli", "cache clear declined");
                return Ok(());
            }
            service.clear_cache().await?;
            if cli.quiet {
                return Ok(());
            }
            renderer.cache_cleared()?;
        }
    }
    Ok(())
}

/// Asks until a number is entered. `None` when stdin closes first.
async fn prompt_for_id() -> Result<Option<u32>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{ENTER_ID_PROMPT}");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(None);
        };
        if let Ok(id) = line.trim().parse::<u32>() {
            return Ok(Some(id));
        }
    }
}

async fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/n] ");
    std::io::stdout().flush()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn open_in_browser(url: &str) -> Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = Process::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else if cfg!(target_os = "macos") {
        Process::new("open")
    } else {
        Process::new("xdg-open")
    };
    let status = command
        .arg(url)
        .status()
        .with_context(|| format!("failed to launch a browser for {url}"))?;
    if !status.success() {
        return Err(anyhow!("browser opener exited with {status}"));
    }
    Ok(())
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,wp_reference_cli=info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .without_time()
        .with_ansi(!cli.no_color)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize logging: {error}"))
}

fn finish_spinner(spinner: Option<ProgressBar>, message: Option<String>) {
    if let Some(progress) = spinner {
        if let Some(msg) = message {
            progress.finish_with_message(msg);
        } else {
            progress.finish_and_clear();
        }
    }
}

mod output {
    use std::fmt::Write;

    use anyhow::Result;
    use clap::ValueEnum;
    use serde_json::json;
    use wp_reference_client::types::{Document, Listing, ReferencePage};
    use wp_reference_core::CacheStatus;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
    pub enum OutputFormat {
        Json,
        Text,
    }

    #[derive(Copy, Clone, Debug)]
    pub struct Renderer {
        format: OutputFormat,
    }

    impl Renderer {
        pub fn new(format: OutputFormat) -> Self {
            Self { format }
        }

        pub fn is_text(&self) -> bool {
            self.format == OutputFormat::Text
        }

        pub fn page(&self, page: &ReferencePage) -> Result<()> {
            match self.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page)?),
                OutputFormat::Text => match page {
                    ReferencePage::Listing(listing) => print!("{}", listing_text(listing)),
                    ReferencePage::Document(document) => print!("{}", document_text(document)),
                },
            }
            Ok(())
        }

        pub fn cache_status(&self, status: &CacheStatus) -> Result<()> {
            match self.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(status)?),
                OutputFormat::Text => {
                    println!("Cache directory: {}", status.path.display());
                    println!("Exists: {}", status.exists);
                    println!("Entries: {} (limit {})", status.entries, status.max_entries);
                    println!("Search history: {}", status.has_last_results);
                }
            }
            Ok(())
        }

        pub fn cache_cleared(&self) -> Result<()> {
            match self.format {
                OutputFormat::Json => {
                    let payload = json!({ "event": "clear_cache", "status": "success" });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                OutputFormat::Text => println!("Cache cleared."),
            }
            Ok(())
        }
    }

    pub fn listing_text(listing: &Listing) -> String {
        let mut out = String::new();
        for (index, item) in listing.iter() {
            let _ = writeln!(out, "{index}. {} [{}]", item.title, item.kind.label());
            let _ = writeln!(out, "     Source: {}:{}", item.source_file, item.source_line);
            let _ = writeln!(out, "      {}", item.description);
            out.push('\n');
        }
        out
    }

    pub fn document_text(document: &Document) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Structure");
        let _ = writeln!(out, "  {}", document.structure);
        out.push('\n');
        if !document.summary.is_empty() {
            let _ = writeln!(out, "Summary   : {}", document.summary);
        }
        let _ = writeln!(out, "Reference : {}", document.kind.label());
        let _ = writeln!(out, "Url       : {}", document.page_url);
        if let Some(source) = &document.source {
            match source.line {
                Some(line) => {
                    let _ = writeln!(out, "Source    : {}:{line}", source.file);
                }
                None => {
                    let _ = writeln!(out, "Source    : {}", source.file);
                }
            }
        }

        if let Some(description) = document.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "\n# Description");
            for line in description.lines() {
                let _ = writeln!(out, " {line}");
            }
        }

        if let Some(parameters) = document.parameters.as_ref().filter(|p| !p.is_empty()) {
            let _ = writeln!(out, "\n# Parameters");
            for (name, parameter) in parameters.iter() {
                let _ = writeln!(out, " {name}");
                let _ = writeln!(
                    out,
                    "  ({}) {{{}}}",
                    parameter.kind,
                    parameter.required.label()
                );
                if !parameter.description.is_empty() {
                    let _ = writeln!(out, "    {}", parameter.description);
                }
                for (nested_name, nested) in parameter.nested.iter() {
                    let _ = writeln!(out, "       {nested_name}");
                    let _ = writeln!(out, "         ({})", nested.kind);
                    let _ = writeln!(out, "            {}", nested.description);
                }
            }
        }

        if let Some(return_value) = &document.return_value {
            let _ = writeln!(out, "\n# Return");
            let _ = writeln!(out, " ({}) {}", return_value.kind, return_value.description);
        }

        if let Some(changelog) = document.changelog.as_ref().filter(|c| !c.rows.is_empty()) {
            let _ = writeln!(out, "\n# Changelog");
            let headers: Vec<&str> = changelog.columns.iter().map(String::as_str).collect();
            let rows: Vec<Vec<String>> = changelog
                .rows
                .iter()
                .map(|row| {
                    changelog
                        .columns
                        .iter()
                        .map(|column| row.get(column).cloned().unwrap_or_default())
                        .collect()
                })
                .collect();
            out.push_str(&render_table(&headers, &rows));
        }
        out
    }

    fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
        for row in rows {
            for (idx, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(idx) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        fn render_line(columns: &[&str], widths: &[usize]) -> String {
            let mut line = String::new();
            for (value, width) in columns.iter().zip(widths) {
                let _ = write!(line, "| {value:width$} ");
            }
            line.push('|');
            line
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", render_line(headers, &widths));
        let separator: String = widths
            .iter()
            .map(|width| format!("|{:-^1$}", "", width + 2))
            .collect();
        let _ = writeln!(out, "{separator}|");
        for row in rows {
            let cols: Vec<&str> = row.iter().map(String::as_str).collect();
            let _ = writeln!(out, "{}", render_line(&cols, &widths));
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use wp_reference_client::types::{
            Changelog, DocumentKind, ParameterSpec, Requirement, ResultKind, ReturnSpec,
            SearchResultItem, SourceLocation,
        };

        #[test]
        fn listing_rows_show_index_kind_and_source() {
            let listing: Listing = [SearchResultItem {
                title: "absint()".to_string(),
                kind: ResultKind::Function,
                link: "https://developer.wordpress.org/reference/functions/absint/".to_string(),
                source_file: "wp-includes/load.php".to_string(),
                source_line: 1623,
                description: "Converts a value to non-negative integer.".to_string(),
            }]
            .into_iter()
            .collect();

            assert_eq!(
                listing_text(&listing),
                "1. absint() [Function]\n     Source: wp-includes/load.php:1623\n      Converts a value to non-negative integer.\n\n"
            );
        }

        #[test]
        fn document_sections_render_in_order() {
            let document = Document {
                page_url: "https://developer.wordpress.org/reference/functions/absint/".to_string(),
                kind: DocumentKind::Function,
                structure: "absint( mixed $maybeint )".to_string(),
                summary: "Converts a value to non-negative integer.".to_string(),
                description: None,
                source: Some(SourceLocation {
                    file: "wp-includes/load.php".to_string(),
                    line: Some(1623),
                }),
                parameters: Some(
                    [(
                        "$maybeint".to_string(),
                        ParameterSpec {
                            kind: "mixed".to_string(),
                            required: Requirement::Required,
                            description: "Data you wish to have converted.".to_string(),
                            ..ParameterSpec::default()
                        },
                    )]
                    .into_iter()
                    .collect(),
                ),
                return_value: Some(ReturnSpec {
                    kind: "int".to_string(),
                    description: "A non-negative integer.".to_string(),
                }),
                changelog: Some(Changelog {
                    columns: vec!["Version".to_string(), "Description".to_string()],
                    rows: vec![[
                        ("Version".to_string(), "2.5.0".to_string()),
                        ("Description".to_string(), "Introduced.".to_string()),
                    ]
                    .into_iter()
                    .collect()],
                }),
            };

            let text = document_text(&document);
            assert!(text.starts_with("# Structure\n  absint( mixed $maybeint )\n"));
            assert!(text.contains("Source    : wp-includes/load.php:1623\n"));
            assert!(text.contains(" $maybeint\n  (mixed) {Required}\n    Data you wish"));
            assert!(text.contains("# Return\n (int) A non-negative integer.\n"));
            assert!(text.contains("| Version | Description |\n"));
            assert!(text.contains("| 2.5.0   | Introduced. |\n"));
            assert!(!text.contains("# Description"));
        }
    }
}

mod progress {
    use std::time::Duration;

    use indicatif::{ProgressBar, ProgressStyle};

    pub fn spinner(message_enabled: bool, message: impl Into<String>) -> Option<ProgressBar> {
        if !message_enabled {
            return None;
        }
        let progress = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        progress.set_style(style);
        progress.set_message(message.into());
        progress.enable_steady_tick(Duration::from_millis(80));
        Some(progress)
    }
}
