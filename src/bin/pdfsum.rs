//! CLI binary for pdfsum.
//!
//! A thin shim over the library crate: maps CLI flags to `SummaryConfig` and
//! `Settings`, drives a `Session`, and prints the result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use pdfsum::{
    CombineStrategy, Completion, Document, DocumentId, HttpSummaryClient, LlmProviderClient,
    OcrEngine, ProgressCallback, Provider, Session, Settings, SummarizeError, Summarizer, Summary,
    SummaryClient, SummaryConfig, SummaryProgressCallback, TesseractOcr, Upload, VisionOcr,
};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinError;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Live progress bar for one request at a time. A fresh bar is created on
/// every `on_request_start`, so one callback serves a whole REPL session.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
    /// Pages already counted on the bar for the current request.
    counted: Mutex<HashSet<usize>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            counted: Mutex::new(HashSet::new()),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }

    /// Advance the bar once per page, however many events the page produces.
    fn count(&self, page_num: usize) {
        let first = self
            .counted
            .lock()
            .map(|mut c| c.insert(page_num))
            .unwrap_or(false);
        if first {
            self.with_bar(|bar| bar.inc(1));
        }
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_request_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total_pages as u64);
        bar.set_style(style);
        bar.set_prefix("Reading");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Summarizing {total_pages} page(s)…"))
        ));

        if let Ok(mut counted) = self.counted.lock() {
            counted.clear();
        }
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_page_extracted(&self, page_num: usize, total: usize, chars: usize, used_ocr: bool) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} Page {:>3}/{:<3}  {:<8}  {}",
                green("✓"),
                page_num,
                total,
                dim(&format!("{chars:>5} chars")),
                if used_ocr { dim("OCR") } else { dim("text layer") },
            ));
        });
        self.count(page_num);
    }

    fn on_summary_call(&self, pages: &[usize]) {
        let label = match pages {
            [single] => format!("page {single}"),
            _ => format!("{} pages", pages.len()),
        };
        self.with_bar(|bar| {
            bar.set_prefix("Summarizing");
            bar.set_message(label);
        });
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} Page {:>3}/{:<3}  {}",
                red("✗"),
                page_num,
                total,
                red(&msg),
            ));
        });
        self.count(page_num);
    }

    fn on_request_complete(&self, total_pages: usize, success_count: usize) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }

        let failed = total_pages.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} page(s) summarized",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} page(s) summarized  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarize pages 1 and 3 with the saved provider
  pdfsum summarize report.pdf --pages 1,3

  # Per-page sections with titles, written to a file
  pdfsum summarize report.pdf --pages 2-4 --strategy per-page \
      --titles 2=Intro --titles 3=Method --titles 4=Results -o summary.md

  # Extra instructions, OpenAI instead of Gemini
  pdfsum summarize notes.pdf --pages all --provider openai \
      --instructions "Answer in Indonesian, bullet points"

  # Interactive selection
  pdfsum summarize report.pdf --interactive

  # Store keys and choose the default provider
  pdfsum config set-key gemini AIza...
  pdfsum config use gemini

INTERACTIVE COMMANDS:
  list                 show pages, selection and titles
  toggle N [N...]      select / unselect pages
  title N TEXT         set a page title (empty TEXT clears it)
  all | none           select every page / clear the selection
  load PATH            open another PDF
  summarize            summarize the selected pages
  show                 print the last summary or error
  save PATH            write the last summary to a file
  quit                 leave

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY       Gemini API key (overrides the settings file)
  OPENAI_API_KEY       OpenAI API key (overrides the settings file)
  PDFSUM_PROVIDER      Provider to use: gemini or openai
  PDFSUM_MODEL         Model for the selected provider
  PDFSUM_SETTINGS      Settings file location
  PDFIUM_LIB_PATH      Path to libpdfium (file or directory)

OCR:
  Pages without a text layer are rendered and passed to tesseract
  (install tesseract-ocr), or with --ocr vision to a vision model through
  edgequake-llm.
"#;

/// Summarize selected PDF pages with Gemini or OpenAI.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsum",
    version,
    about = "Summarize selected PDF pages with a language model",
    long_about = "Summarize selected pages of a PDF with Google Gemini or any OpenAI-compatible \
chat endpoint. Pages without a text layer are read through OCR.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file.
    #[arg(long, global = true, env = "PDFSUM_SETTINGS")]
    settings: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFSUM_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize pages of a PDF (batch, or --interactive).
    Summarize(SummarizeArgs),

    /// Show or edit stored provider settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// PDF file to open.
    #[arg(required_unless_present = "interactive")]
    input: Option<PathBuf>,

    /// Pages to select: all, 5, 3-15, or 1,3,5-7.
    #[arg(short, long)]
    pages: Option<String>,

    /// Page title as N=TEXT; repeat for several pages.
    #[arg(long, value_name = "N=TEXT")]
    titles: Vec<String>,

    /// Refuse to summarize while a selected page has no title.
    #[arg(long)]
    require_titles: bool,

    /// How selected pages are combined.
    #[arg(long, value_enum, default_value = "joint")]
    strategy: StrategyArg,

    /// Extra instructions appended to every prompt.
    #[arg(short, long)]
    instructions: Option<String>,

    /// Ask for a summary that stays coherent across pages (joint mode).
    #[arg(long)]
    cross_page_context: bool,

    /// Provider: gemini or openai. Default: the saved choice.
    #[arg(long, env = "PDFSUM_PROVIDER")]
    provider: Option<String>,

    /// Model ID for the provider.
    #[arg(long, env = "PDFSUM_MODEL")]
    model: Option<String>,

    /// Endpoint override (proxy or OpenAI-compatible host).
    #[arg(long)]
    base_url: Option<String>,

    /// Send the summary call through an edgequake-llm provider instead
    /// (openai, anthropic, gemini, ollama, …); it reads its own API key.
    #[arg(long, value_name = "PROVIDER")]
    llm_provider: Option<String>,

    /// OCR engine for pages without a text layer.
    #[arg(long, value_enum, default_value = "tesseract")]
    ocr: OcrArg,

    /// Tesseract language(s), e.g. eng or ind+eng.
    #[arg(long, default_value = "eng")]
    ocr_lang: String,

    /// edgequake-llm provider used with --ocr vision.
    #[arg(long, default_value = "openai")]
    vision_provider: String,

    /// Model used with --ocr vision.
    #[arg(long, default_value = "gpt-4.1-nano")]
    vision_model: String,

    /// Render upscale factor for OCR (0.5–6.0).
    #[arg(long, default_value_t = pdfsum::pipeline::extract::DEFAULT_RENDER_SCALE)]
    scale: f32,

    /// Pages read at once in joint mode.
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,

    /// Provider call timeout in seconds. Default: none.
    #[arg(long)]
    timeout: Option<u64>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSUM_PASSWORD")]
    password: Option<String>,

    /// Write the summary to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the full summary record as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Select pages and summarize from a prompt.
    #[arg(long)]
    interactive: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the settings file (keys masked).
    Show,
    /// Store the API key for a provider.
    SetKey { provider: String, key: String },
    /// Store the model for a provider.
    SetModel { provider: String, model: String },
    /// Store an endpoint override for a provider.
    SetBaseUrl { provider: String, url: String },
    /// Select the default provider.
    Use { provider: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Joint,
    PerPage,
}

impl From<StrategyArg> for CombineStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Joint => CombineStrategy::Joint,
            StrategyArg::PerPage => CombineStrategy::PerPage,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OcrArg {
    Tesseract,
    Vision,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are hidden while the progress bar is active.
    let show_progress = match &cli.command {
        Command::Summarize(args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Config { .. } => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);

    match &cli.command {
        Command::Config { action } => run_config(action, &settings_path),
        Command::Summarize(args) => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>)
            } else {
                None
            };
            if args.interactive {
                run_interactive(args, &settings_path, progress).await
            } else {
                run_batch(args, &settings_path, progress, cli.quiet).await
            }
        }
    }
}

// ── Summarize ────────────────────────────────────────────────────────────────

/// Settings file + environment + command-line overrides.
fn resolve_settings(args: &SummarizeArgs, path: &Path) -> Result<Settings> {
    let mut settings = Settings::load(path).context("Failed to load settings")?;
    settings.apply_env().context("Invalid environment settings")?;

    if let Some(ref name) = args.provider {
        settings.select(name.parse::<Provider>()?);
    }
    let selected = settings.selected();
    if let Some(ref model) = args.model {
        settings.set_model(selected, model.clone());
    }
    if let Some(ref url) = args.base_url {
        settings.set_base_url(selected, url.clone());
    }
    Ok(settings)
}

fn build_config(args: &SummarizeArgs, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .strategy(args.strategy.into())
        .require_titles(args.require_titles)
        .cross_page_context(args.cross_page_context)
        .render_scale(args.scale)
        .concurrency(args.concurrency);

    if let Some(ref text) = args.instructions {
        builder = builder.instructions(text.clone());
    }
    if let Some(secs) = args.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn build_summarizer(args: &SummarizeArgs, config: SummaryConfig) -> Result<Summarizer> {
    let client: Arc<dyn SummaryClient> = match args.llm_provider {
        Some(ref name) => {
            let model = args.model.as_deref().unwrap_or("gpt-4.1-nano");
            Arc::new(LlmProviderClient::from_provider_name(name, model)?)
        }
        None => {
            let timeout = config.request_timeout_secs.map(Duration::from_secs);
            Arc::new(HttpSummaryClient::new(timeout)?)
        }
    };

    let ocr: Arc<dyn OcrEngine> = match args.ocr {
        OcrArg::Tesseract => {
            let tesseract = TesseractOcr::new().with_language(args.ocr_lang.clone());
            if !tesseract.is_available().await {
                tracing::warn!("tesseract not found on PATH; scanned pages will fail to summarize");
            }
            Arc::new(tesseract)
        }
        OcrArg::Vision => Arc::new(VisionOcr::from_provider_name(
            &args.vision_provider,
            &args.vision_model,
        )?),
    };

    Ok(Summarizer::new(client, ocr, config))
}

async fn open_document(path: &Path, password: Option<&str>) -> Result<Document> {
    let upload = Upload::from_path(path).await?;
    Ok(Document::open(upload, password).await?)
}

async fn run_batch(
    args: &SummarizeArgs,
    settings_path: &Path,
    progress: Option<ProgressCallback>,
    quiet: bool,
) -> Result<()> {
    let Some(ref input) = args.input else {
        bail!("No input PDF given");
    };
    let settings = resolve_settings(args, settings_path)?;
    let config = build_config(args, progress)?;

    let document = open_document(input, config.password.as_deref())
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let mut session = Session::new();
    session.load(document);
    if let Some(ref spec) = args.pages {
        apply_page_spec(&mut session, spec)?;
    }
    apply_titles(&mut session, &args.titles)?;

    let request = session
        .begin_request(&config)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let summarizer = build_summarizer(args, config).await?;
    let summary = summarizer
        .run(&request, &settings.provider_config())
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if let Some(ref output_path) = args.output {
        pdfsum::write_summary(output_path, &summary)
            .await
            .context("Failed to write summary")?;
        if !quiet {
            eprintln!(
                "{}  {} page(s)  {}ms  →  {}",
                if summary.is_partial() { cyan("⚠") } else { green("✔") },
                summary.pages.len(),
                summary.duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else {
        print_summary(&summary)?;
    }

    if !quiet && !args.json {
        report_failures(&summary);
    }
    Ok(())
}

fn print_summary(summary: &Summary) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(summary.text.as_bytes())
        .context("Failed to write to stdout")?;
    if !summary.text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

fn report_failures(summary: &Summary) {
    for failure in &summary.failures {
        eprintln!("  {} {}", red("✗"), failure);
    }
}

/// Apply `all`, `5`, `3-15` or `1,3,5-7` to the session selection.
fn apply_page_spec(session: &mut Session, spec: &str) -> Result<()> {
    let spec = spec.trim().to_lowercase();
    if spec == "all" {
        session.select_all()?;
        return Ok(());
    }

    let mut pages = parse_pages(&spec)?;
    pages.sort_unstable();
    pages.dedup();
    for page in pages {
        if !session.selected_pages().contains(&page) {
            session.toggle(page)?;
        }
    }
    Ok(())
}

/// Parse `5`, `3-15` or `1,3,5-7` into page numbers.
fn parse_pages(s: &str) -> Result<Vec<usize>> {
    let mut pages = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start
                .trim()
                .parse()
                .with_context(|| format!("Invalid start page in '{part}'"))?;
            let end: usize = end
                .trim()
                .parse()
                .with_context(|| format!("Invalid end page in '{part}'"))?;
            if start < 1 {
                bail!("Pages are 1-indexed, minimum is 1 (got {start})");
            }
            if start > end {
                bail!("Invalid page range '{part}': start must be <= end");
            }
            pages.extend(start..=end);
        } else {
            let page: usize = part
                .parse()
                .with_context(|| format!("Invalid page number: '{part}'"))?;
            if page < 1 {
                bail!("Pages are 1-indexed, minimum is 1 (got {page})");
            }
            pages.push(page);
        }
    }
    if pages.is_empty() {
        bail!("No pages given in '{s}'");
    }
    Ok(pages)
}

/// Apply every `--titles N=TEXT` to the loaded document.
fn apply_titles(session: &mut Session, titles: &[String]) -> Result<()> {
    for raw in titles {
        let (page, title) = parse_title(raw)?;
        session.set_title(page, title)?;
    }
    Ok(())
}

/// Parse `N=TEXT`.
fn parse_title(raw: &str) -> Result<(usize, String)> {
    let Some((page, title)) = raw.split_once('=') else {
        bail!("Expected N=TEXT, got '{raw}'");
    };
    let page: usize = page
        .trim()
        .parse()
        .with_context(|| format!("Invalid page number in '{raw}'"))?;
    Ok((page, title.trim().to_string()))
}

// ── Interactive ──────────────────────────────────────────────────────────────

/// A background request as it comes back from its task.
type Finished = (DocumentId, Result<Result<Summary, SummarizeError>, JoinError>);

async fn run_interactive(
    args: &SummarizeArgs,
    settings_path: &Path,
    progress: Option<ProgressCallback>,
) -> Result<()> {
    let settings = resolve_settings(args, settings_path)?;
    let config = build_config(args, progress)?;
    let password = config.password.clone();
    let summarizer = Arc::new(build_summarizer(args, config).await?);
    let mut session = Session::new();

    if let Some(ref input) = args.input {
        match open_document(input, password.as_deref()).await {
            Ok(doc) => {
                session.load(doc);
                if let Some(ref spec) = args.pages {
                    apply_page_spec(&mut session, spec)?;
                }
                apply_titles(&mut session, &args.titles)?;
                print_pages(&session);
            }
            Err(e) => eprintln!("{} {e:#}", red("✗")),
        }
    }
    eprintln!(
        "{}",
        dim("Commands: list, toggle N, title N TEXT, all, none, load PATH, summarize, show, save PATH, quit")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // Requests run on their own tasks; stdin stays live so `load` can
    // replace the document while a summary is pending.
    let mut pending: FuturesUnordered<BoxFuture<'static, Finished>> = FuturesUnordered::new();
    loop {
        eprint!("{} ", cyan("pdfsum>"));
        io::stderr().flush().ok();

        let line = tokio::select! {
            Some(finished) = pending.next(), if !pending.is_empty() => {
                eprintln!();
                finish_request(&mut session, finished);
                continue;
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else {
            // End of input: let running requests land before exiting.
            while let Some(finished) = pending.next().await {
                finish_request(&mut session, finished);
            }
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let outcome: Result<bool> = match cmd {
            "quit" | "exit" | "q" => break,
            "help" | "?" => {
                eprintln!("{AFTER_HELP}");
                Ok(true)
            }
            "list" | "ls" => {
                print_pages(&session);
                Ok(true)
            }
            "toggle" | "t" => toggle_pages(&mut session, rest),
            "title" => parse_title_command(rest)
                .and_then(|(page, title)| Ok(session.set_title(page, title)?))
                .map(|_| true),
            "all" => session.select_all().map(|_| true).map_err(Into::into),
            "none" => session.clear_selection().map(|_| true).map_err(Into::into),
            "load" => {
                if rest.is_empty() {
                    Err(anyhow::anyhow!("usage: load PATH"))
                } else {
                    open_document(Path::new(rest), password.as_deref())
                        .await
                        .map(|doc| {
                            session.load(doc);
                            print_pages(&session);
                            false
                        })
                }
            }
            "summarize" | "s" => session
                .begin_request(summarizer.config())
                .map(|request| {
                    let id = request.document_id;
                    let handle = summarizer.spawn(request, settings.provider_config());
                    pending.push(async move { (id, handle.await) }.boxed());
                    eprintln!("{}", dim("Summarizing in the background..."));
                    false
                })
                .map_err(|e| anyhow::anyhow!(e.user_message())),
            "show" => show_result(&session).map(|_| false),
            "save" => save_summary(&session, rest).await.map(|_| false),
            other => Err(anyhow::anyhow!("Unknown command '{other}' (try help)")),
        };

        match outcome {
            Ok(true) => eprintln!("{}", dim(&selection_line(&session))),
            Ok(false) => {}
            Err(e) => eprintln!("{} {e:#}", red("✗")),
        }
    }
    Ok(())
}

fn toggle_pages(session: &mut Session, rest: &str) -> Result<bool> {
    if rest.is_empty() {
        bail!("usage: toggle N [N...]");
    }
    for part in rest.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.is_empty() {
            continue;
        }
        for page in parse_pages(part)? {
            session.toggle(page)?;
        }
    }
    Ok(true)
}

/// `title N TEXT`
fn parse_title_command(rest: &str) -> Result<(usize, String)> {
    let (page, title) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let page: usize = page
        .trim()
        .parse()
        .with_context(|| format!("usage: title N TEXT (got '{rest}')"))?;
    Ok((page, title.trim().to_string()))
}

fn finish_request(session: &mut Session, (id, joined): Finished) {
    let result = joined.unwrap_or_else(|e| {
        Err(SummarizeError::Internal(format!("summarization task failed: {e}")))
    });
    match session.complete(id, result) {
        Completion::Applied => {
            if let Err(e) = show_result(session) {
                eprintln!("{} {e:#}", red("✗"));
            }
        }
        Completion::Stale => eprintln!(
            "{}",
            dim(&format!("Discarded summary for {id}: that document is no longer loaded."))
        ),
    }
}

fn show_result(session: &Session) -> Result<()> {
    if let Some(summary) = session.summary() {
        print_summary(summary)?;
        report_failures(summary);
    } else if let Some(message) = session.last_error() {
        eprintln!("{} {}", red("✗"), message);
    } else {
        eprintln!("{}", dim("No summary yet."));
    }
    Ok(())
}

async fn save_summary(session: &Session, path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("usage: save PATH");
    }
    let Some(summary) = session.summary() else {
        bail!("No summary to save");
    };
    pdfsum::write_summary(path, summary).await?;
    eprintln!("{} saved to {}", green("✔"), bold(path));
    Ok(())
}

fn print_pages(session: &Session) {
    let Some(doc) = session.document() else {
        eprintln!("{}", dim("No document loaded (use: load PATH)"));
        return;
    };
    eprintln!(
        "{} {}",
        bold(doc.file_name()),
        dim(&format!("({} pages)", doc.page_count()))
    );
    for page in session.selections() {
        eprintln!(
            "  [{}] {:>3}  {}",
            if page.selected { green("x") } else { " ".to_string() },
            page.page_num,
            page.title().unwrap_or(""),
        );
    }
}

fn selection_line(session: &Session) -> String {
    let selected = session.selected_pages();
    if selected.is_empty() {
        "selected: none".to_string()
    } else {
        let list: Vec<String> = selected.iter().map(usize::to_string).collect();
        format!("selected: {}", list.join(", "))
    }
}

// ── Config ───────────────────────────────────────────────────────────────────

/// Edits go to the file only; environment overlays are never persisted.
fn run_config(action: &ConfigAction, path: &Path) -> Result<()> {
    let mut settings = Settings::load(path).context("Failed to load settings")?;

    match action {
        ConfigAction::Show => {
            println!("Settings:  {}", path.display());
            println!("Provider:  {}", settings.selected());
            for provider in Provider::ALL {
                let entry = settings.config_for(provider);
                println!();
                println!("[{provider}]");
                println!("  api_key:  {}", mask_key(&entry.api_key));
                println!("  model:    {}", entry.model);
                if let Some(ref url) = entry.base_url {
                    println!("  base_url: {url}");
                }
            }
            return Ok(());
        }
        ConfigAction::SetKey { provider, key } => {
            settings.set_api_key(provider.parse()?, key.clone());
        }
        ConfigAction::SetModel { provider, model } => {
            settings.set_model(provider.parse()?, model.clone());
        }
        ConfigAction::SetBaseUrl { provider, url } => {
            settings.set_base_url(provider.parse()?, url.clone());
        }
        ConfigAction::Use { provider } => {
            settings.select(provider.parse()?);
        }
    }

    settings.save(path).context("Failed to save settings")?;
    eprintln!("{} saved {}", green("✔"), path.display());
    Ok(())
}

/// `AIza…x9Qk`, or `(not set)`.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        1..=8 => "****".to_string(),
        n => format!(
            "{}…{}",
            chars[..4].iter().collect::<String>(),
            chars[n - 4..].iter().collect::<String>()
        ),
    }
}
