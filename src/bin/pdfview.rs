//! CLI binary for edgequake-pdfview.
//!
//! A thin shim over the library crate: maps CLI flags to `ViewerConfig`,
//! drives a `ViewerSession` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdfview::settings::settings_path;
use edgequake_pdfview::{
    resolve_service, Action, CustomPrompt, DispatcherState, DocumentSource, FitMode, PdfDocument,
    Settings, TaskEvent, TaskOutcome, TaskReport, TaskStage, ViewerConfig, ViewerError,
    ViewerSession, ViewportSize, AVAILABLE_MODELS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render page 3 fitted to a 1280x800 viewport
  pdfview render paper.pdf --page 3 -o page3.png

  # Render a two-page spread at 150% zoom
  pdfview render book.pdf --page 2 --two-page --zoom 1.5 -o spread.png

  # Summarise the pages in view
  pdfview ask paper.pdf summarize --page 4 --two-page

  # Interactive viewer loop
  pdfview shell paper.pdf

  # Save an API key and pick a model
  pdfview settings set-key AIza...
  pdfview settings set-model gemini-1.5-pro-latest

ACTIONS:
  translate (Tab)        summarize (Ctrl+S)     example (Ctrl+E)
  explain-terms (Ctrl+X) paraphrase             reconstruct
  interpret-intent       <name of a saved custom prompt>

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (or use `settings set-key`)
  PDFVIEW_PROVIDER        Text service provider (default: gemini)
  PDFVIEW_MODEL           Model override
  PDFVIEW_LANGUAGE        Answer language for built-in actions
  PDFVIEW_SETTINGS        Settings file location
  PDFIUM_LIB_PATH         Path to an existing libpdfium
"#;

/// View PDF pages and run LLM text actions on them.
#[derive(Parser, Debug)]
#[command(
    name = "pdfview",
    version,
    about = "View PDF pages and run LLM text actions on them",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Text service provider: gemini, openai, anthropic, mistral, ollama.
    #[arg(long, global = true, env = "PDFVIEW_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Model override (default: the saved model, else gemini-2.0-flash).
    #[arg(long, global = true, env = "PDFVIEW_MODEL")]
    model: Option<String>,

    /// Language the built-in actions answer in.
    #[arg(long, global = true, env = "PDFVIEW_LANGUAGE", default_value = "Japanese")]
    language: String,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "PDFVIEW_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens per action.
    #[arg(long, global = true, env = "PDFVIEW_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFVIEW_PASSWORD")]
    password: Option<String>,

    /// Settings file (default: <config dir>/pdfview/settings.json).
    #[arg(long, global = true, env = "PDFVIEW_SETTINGS")]
    settings: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFVIEW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the view of a page to a PNG/JPEG file.
    Render {
        input: PathBuf,

        /// 1-indexed page to show.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Show pages side by side.
        #[arg(long)]
        two_page: bool,

        /// Fit mode; ignored when --zoom is given.
        #[arg(long, value_enum, default_value = "height")]
        fit: FitArg,

        /// Manual zoom factor (0.1–10).
        #[arg(long)]
        zoom: Option<f32>,

        /// Viewport size in pixels.
        #[arg(long, default_value = "1280x800")]
        viewport: String,

        /// Output image path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run a text action on the pages in view and print the result.
    Ask {
        input: PathBuf,

        /// translate, summarize, example, explain-terms, … or a custom prompt name.
        action: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        two_page: bool,
    },

    /// Interactive, line-driven viewer.
    Shell {
        input: PathBuf,

        #[arg(long, default_value = "1280x800")]
        viewport: String,
    },

    /// Print PDF metadata.
    Inspect {
        input: PathBuf,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show or change saved settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings.
    Show,
    /// Save the API key.
    SetKey { key: String },
    /// Save the model.
    SetModel { model: String },
    /// List the available models.
    Models,
    /// Add or replace a custom prompt. The template uses {text} for the page text.
    AddPrompt {
        name: String,
        template: String,
        #[arg(long)]
        shortcut: Option<String>,
    },
    /// Remove a custom prompt.
    RemovePrompt { name: String },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FitArg {
    Width,
    Height,
    None,
}

impl From<FitArg> for FitMode {
    fn from(v: FitArg) -> Self {
        match v {
            FitArg::Width => FitMode::FitWidth,
            FitArg::Height => FitMode::FitHeight,
            FitArg::None => FitMode::None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let settings_file = cli.settings.clone().unwrap_or_else(settings_path);

    match &cli.command {
        Command::Render {
            input,
            page,
            two_page,
            fit,
            zoom,
            viewport,
            output,
        } => {
            let viewport = parse_viewport(viewport)?;
            let mut session = open_session(&cli, &config, input, &settings_file)?;
            session.set_two_page(*two_page);
            go_to_page(&mut session, *page)?;
            match zoom {
                Some(z) => session.set_zoom(*z),
                None => session.set_fit_mode((*fit).into()),
            }

            let view = session.render(viewport).context("Failed to render view")?;
            view.image
                .save(output)
                .with_context(|| format!("Failed to write image to {}", output.display()))?;

            if !cli.quiet {
                eprintln!(
                    "{}  page {}  zoom {:.3}  {}x{} px  →  {}",
                    green("✔"),
                    view.label,
                    view.plan.zoom,
                    view.image.width(),
                    view.image.height(),
                    bold(&output.display().to_string()),
                );
            }
        }

        Command::Ask {
            input,
            action,
            page,
            two_page,
        } => {
            let settings = load_settings(&settings_file)?;
            let action = Action::parse(action, &settings)?;
            let mut session = open_session(&cli, &config, input, &settings_file)?;
            session.set_service(Some(resolve_service(&config, &settings)?));
            session.set_two_page(*two_page);
            go_to_page(&mut session, *page)?;

            session
                .request(&action)
                .with_context(|| format!("{} could not start", action))?;
            let report = await_report(&mut session, cli.quiet).await?;
            print_report(&report);
            if let TaskOutcome::Failed(e) = &report.outcome {
                bail!("{} failed: {}", report.action_name, e);
            }
        }

        Command::Shell { input, viewport } => {
            let viewport = parse_viewport(viewport)?;
            let settings = load_settings(&settings_file)?;
            let mut session = open_session(&cli, &config, input, &settings_file)?;
            match resolve_service(&config, &settings) {
                Ok(service) => session.set_service(Some(service)),
                Err(e) => eprintln!("{} {}", cyan("⚠"), e),
            }
            run_shell(&mut session, &settings, viewport).await?;
        }

        Command::Inspect { input, json } => {
            let doc = PdfDocument::open(input, cli.password.as_deref())
                .context("Failed to open PDF")?;
            let info = doc.info().context("Failed to inspect PDF")?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
                );
            } else {
                println!("File:         {}", input.display());
                if let Some(ref t) = info.title {
                    println!("Title:        {}", t);
                }
                if let Some(ref a) = info.author {
                    println!("Author:       {}", a);
                }
                if let Some(ref s) = info.subject {
                    println!("Subject:      {}", s);
                }
                println!("Pages:        {}", info.page_count);
                println!("PDF Version:  {}", info.pdf_version);
                if let Some(ref p) = info.producer {
                    println!("Producer:     {}", p);
                }
                if let Some(ref c) = info.creator {
                    println!("Creator:      {}", c);
                }
                if let Some(first) = info.pages.first() {
                    println!("Page size:    {:.0} x {:.0} pt", first.width, first.height);
                }
            }
        }

        Command::Settings { command } => run_settings(command, &settings_file)?,
    }

    Ok(())
}

/// Map CLI args to `ViewerConfig`.
fn build_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut builder = ViewerConfig::builder()
        .provider_name(cli.provider.clone())
        .output_language(cli.language.clone())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens);
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    builder.build().context("Invalid configuration")
}

fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load(path).context("Failed to load settings")
}

fn open_session<'a>(
    cli: &'a Cli,
    config: &ViewerConfig,
    input: &Path,
    settings_file: &Path,
) -> Result<ViewerSession<PdfDocument<'a>>> {
    let doc = PdfDocument::open(input, cli.password.as_deref()).context("Failed to open PDF")?;
    let mut session = ViewerSession::new(config.clone(), Handle::current());
    session.open(doc);
    remember_directory(settings_file, input);
    Ok(session)
}

/// Save the opened file's directory. Failures only warn.
fn remember_directory(settings_file: &Path, input: &Path) {
    let result = Settings::load(settings_file).and_then(|mut settings| {
        if settings.remember_directory(input) {
            settings.save(settings_file)?;
        }
        Ok(())
    });
    if let Err(e) = result {
        tracing::warn!("Could not record last directory: {}", e);
    }
}

/// Errors the shell reports as a notice rather than a failure.
fn is_notice(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<ViewerError>(), Some(ViewerError::Busy { .. }))
}

fn go_to_page<D: DocumentSource>(session: &mut ViewerSession<D>, page: usize) -> Result<()> {
    if page < 1 {
        bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    session.go_to(page - 1)?;
    Ok(())
}

/// Parse `WxH`, e.g. `1280x800`.
fn parse_viewport(s: &str) -> Result<ViewportSize> {
    let (w, h) = s
        .trim()
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid viewport '{}': expected WIDTHxHEIGHT", s))?;
    let width: u32 = w.trim().parse().context("Invalid viewport width")?;
    let height: u32 = h.trim().parse().context("Invalid viewport height")?;
    if width == 0 || height == 0 {
        bail!("Viewport must be at least 1x1 (got {}x{})", width, height);
    }
    Ok(ViewportSize::new(width, height))
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(message.to_string());
    bar.set_message("Starting…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn stage_message(stage: TaskStage, percent: u8) -> String {
    match stage {
        TaskStage::AwaitingResponse => format!("Waiting for the model… {percent}%"),
        TaskStage::ResponseReceived => format!("Response received {percent}%"),
    }
}

/// Wait for the running action to finish; Ctrl-C requests cancellation.
async fn await_report<D: DocumentSource>(
    session: &mut ViewerSession<D>,
    quiet: bool,
) -> Result<TaskReport> {
    let token = session
        .dispatcher()
        .cancellation_token()
        .context("No action is running")?;
    let bar = match session.task_state() {
        DispatcherState::Running { action } if !quiet => Some(spinner(&action)),
        _ => None,
    };
    let mut cancel_requested = false;

    let report = loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(TaskEvent::Progress { stage, percent }) => {
                    if let Some(ref bar) = bar {
                        bar.set_message(stage_message(stage, percent));
                    }
                }
                Some(TaskEvent::Finished(report)) => break report,
                None => bail!("The action ended without a result"),
            },
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                cancel_requested = true;
                token.cancel();
                if let Some(ref bar) = bar {
                    bar.set_message("Cancelling… (waiting for the current call to return)");
                }
            }
        }
    };

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(report)
}

fn print_report(report: &TaskReport) {
    match &report.outcome {
        TaskOutcome::Success(text) => {
            println!("{} {}", cyan("◆"), bold(&report.result_label));
            println!("{}", text.trim_end());
        }
        TaskOutcome::Failed(e) => {
            eprintln!("{} {}: {}", red("✗"), report.action_name, red(&e.to_string()));
        }
        TaskOutcome::Cancelled(stage) => {
            eprintln!(
                "{} {} cancelled {}",
                cyan("⚠"),
                report.action_name,
                dim(&format!("({stage:?})"))
            );
        }
    }
}

// ── Shell ────────────────────────────────────────────────────────────────────

const SHELL_HELP: &str = "\
  n / p          next / previous page
  g N            go to page N
  + / -          zoom in / out
  w / h          fit width / fit height
  t              toggle two-page mode
  size WxH       set the viewport size
  render FILE    write the current view to an image
  ask ACTION     run a text action on the pages in view
  cancel         cancel the running action
  status         show view and task state
  help           this text
  q              quit";

async fn run_shell<D: DocumentSource>(
    session: &mut ViewerSession<D>,
    settings: &Settings,
    mut viewport: ViewportSize,
) -> Result<()> {
    let (tx, mut lines) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    session.on_resize(viewport);
    println!("{} {}  {}", cyan("◆"), session.page_label(), dim("(type `help`)"));
    prompt();

    loop {
        let running = session.task_state() != DispatcherState::Idle;
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                match run_command(session, settings, &mut viewport, line.trim()) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) if is_notice(&e) => eprintln!("{} {}", cyan("⚠"), e),
                    Err(e) => eprintln!("{} {:#}", red("✗"), e),
                }
                prompt();
            }
            event = session.next_event(), if running => {
                match event {
                    Some(TaskEvent::Progress { stage, percent }) => {
                        println!("{}", dim(&stage_message(stage, percent)));
                    }
                    Some(TaskEvent::Finished(report)) => {
                        print_report(&report);
                        prompt();
                    }
                    None => {}
                }
            }
        }
    }

    if session.cancel() {
        eprintln!("{}", dim("Cancelled the running action"));
    }
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Handle one shell line. Returns `false` to quit.
fn run_command<D: DocumentSource>(
    session: &mut ViewerSession<D>,
    settings: &Settings,
    viewport: &mut ViewportSize,
    line: &str,
) -> Result<bool> {
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match cmd {
        "" => return Ok(true),
        "q" | "quit" | "exit" => return Ok(false),
        "help" | "?" => {
            println!("{SHELL_HELP}");
            return Ok(true);
        }
        "n" | "next" => {
            session.next_page();
        }
        "p" | "prev" => {
            session.prev_page();
        }
        "g" | "goto" => {
            let page: usize = arg.parse().context("Usage: g <page>")?;
            go_to_page(session, page)?;
        }
        "+" => session.zoom_in(),
        "-" => session.zoom_out(),
        "w" => session.set_fit_width(),
        "h" => session.set_fit_height(),
        "t" => {
            session.toggle_two_page();
        }
        "size" => {
            let vp = parse_viewport(arg)?;
            if session.on_resize(vp) {
                println!("{}", dim("relayout"));
            }
            *viewport = vp;
        }
        "render" => {
            if arg.is_empty() {
                bail!("Usage: render <file>");
            }
            let view = session.render(*viewport)?;
            view.image
                .save(arg)
                .with_context(|| format!("Failed to write image to {}", arg))?;
            println!("{} {}  →  {}", green("✔"), view.label, bold(arg));
            return Ok(true);
        }
        "ask" => {
            let action = Action::parse(arg, settings)?;
            session.request(&action)?;
            println!("{} {}…", cyan("◆"), action);
            return Ok(true);
        }
        "cancel" => {
            if !session.cancel() {
                println!("{}", dim("Nothing to cancel"));
            }
            return Ok(true);
        }
        "status" => {}
        other => bail!("Unknown command '{}' (type `help`)", other),
    }

    let plan = session.plan(*viewport)?;
    let state = session.state();
    println!(
        "{} {}  zoom {:.3}  {}{}  {}",
        cyan("◆"),
        session.page_label(),
        plan.zoom,
        state.fit_mode,
        if state.two_page { "  two-page" } else { "" },
        dim(&session.task_state().to_string()),
    );
    Ok(true)
}

// ── Settings ─────────────────────────────────────────────────────────────────

fn run_settings(command: &SettingsCommand, path: &Path) -> Result<()> {
    let mut settings = load_settings(path)?;

    match command {
        SettingsCommand::Show => {
            println!("File:     {}", path.display());
            println!(
                "API key:  {}",
                if settings.has_api_key() { "set" } else { "not set" }
            );
            println!("Model:    {}", settings.effective_model());
            if let Some(ref dir) = settings.last_directory {
                println!("Last dir: {}", dir.display());
            }
            for p in &settings.custom_prompts {
                println!(
                    "Prompt:   {}{}",
                    bold(&p.name),
                    p.shortcut
                        .as_deref()
                        .map(|s| format!(" ({s})"))
                        .unwrap_or_default()
                );
            }
            return Ok(());
        }
        SettingsCommand::Models => {
            let current = settings.effective_model().to_string();
            for m in AVAILABLE_MODELS {
                if *m == current {
                    println!("* {}", green(m));
                } else {
                    println!("  {m}");
                }
            }
            return Ok(());
        }
        SettingsCommand::SetKey { key } => {
            settings.api_key = Some(key.trim().to_string());
        }
        SettingsCommand::SetModel { model } => {
            if !AVAILABLE_MODELS.contains(&model.as_str()) {
                bail!(
                    "Unknown model '{}'. Available: {}",
                    model,
                    AVAILABLE_MODELS.join(", ")
                );
            }
            settings.model = Some(model.clone());
        }
        SettingsCommand::AddPrompt {
            name,
            template,
            shortcut,
        } => {
            if !template.contains("{text}") {
                bail!("The template must contain {{text}}");
            }
            settings.upsert_prompt(CustomPrompt {
                name: name.clone(),
                template: template.clone(),
                shortcut: shortcut.clone(),
            });
        }
        SettingsCommand::RemovePrompt { name } => {
            if !settings.remove_prompt(name) {
                bail!("No custom prompt named '{}'", name);
            }
        }
    }

    settings.save(path).context("Failed to save settings")?;
    eprintln!("{} Saved {}", green("✔"), path.display());
    Ok(())
}
