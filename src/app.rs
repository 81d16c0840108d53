use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::cache::{self, AssetCache};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::dataset::{self, AssetOrigin};
use crate::debounce::{self, Debouncer};
use crate::index::Dimension;
use crate::output::{self, OutputFormat};
use crate::pager;
use crate::record::{self, Kural, Section};
use crate::session::{ResultsState, Session};
use crate::view::Visibility;

fn print_banner() {
    const BANNER: &str = r#"
    __                         _
   / /____  ___________ _   __(_)__ _      __
  / //_/ / / / ___/ __ `/ | / / / _ \ | /| / /
 / ,< / /_/ / /  / /_/ /| |/ / /  __/ |/ |/ /
/_/|_|\__,_/_/   \__,_/ |___/_/\___/|__/|__/
"#;
    print!("{}", BANNER);
    println!(
        "       v{} - Thirukkural reference viewer",
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label.bold(), value);
}

fn flag_label(arg: &clap::Arg) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(short) = arg.get_short() {
        parts.push(format!("-{short}"));
    }
    if let Some(long) = arg.get_long() {
        parts.push(format!("--{long}"));
    }
    for alias in arg.get_visible_aliases().unwrap_or_default() {
        let rendered = format!("--{alias}");
        if !parts.contains(&rendered) {
            parts.push(rendered);
        }
    }

    let mut flags = parts.join(", ");
    if arg.get_action().takes_values() {
        let value_name = arg
            .get_value_names()
            .and_then(|names| names.first())
            .map(|name| name.as_str())
            .unwrap_or("VALUE");
        let optional = arg
            .get_num_args()
            .map(|r| r.min_values() == 0)
            .unwrap_or(false);
        if optional {
            flags.push_str(&format!(" [<{value_name}>]"));
        } else {
            flags.push_str(&format!(" <{value_name}>"));
        }
    }
    flags
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');
    if let Some(about) = cmd.get_about() {
        out.push_str(&about.to_string());
        out.push('\n');
    }
    if let Some(long_about) = cmd.get_long_about() {
        out.push('\n');
        out.push_str(&long_about.to_string());
        out.push('\n');
    }
    out.push_str(&format!("\nUsage: {} [OPTIONS]\n\n", cmd.get_name()));

    // headings keep the order in which their first argument is declared
    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options").to_string();
        let idx = *section_idx.entry(heading.clone()).or_insert_with(|| {
            sections.push((heading, Vec::new()));
            sections.len() - 1
        });
        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");
        for arg in args {
            out.push_str("  ");
            out.push_str(&flag_label(arg));
            out.push('\n');
            if let Some(help) = arg.get_help().map(|h| h.to_string()) {
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }
            out.push('\n');
        }
    }

    out
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone, Debug)]
struct RunConfig {
    data: String,
    base: Option<String>,
    delimiter: u8,
    timeout: u64,
    paul: Option<String>,
    iyal: Option<String>,
    adikaram: Option<String>,
    number: Option<String>,
    search: Option<String>,
    search_commentary: bool,
    page: usize,
    page_size: usize,
    hidden: Vec<Section>,
    show_options: bool,
    interactive: bool,
    debounce: Duration,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
    verbose: u8,
    offline: bool,
    cache_dir: PathBuf,
    cache_version: String,
    cache_assets: Vec<String>,
    refresh_cache: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let data = config::expand_tilde_string(
        non_blank(args.data)
            .or_else(|| non_blank(cfg.data))
            .unwrap_or_else(|| dataset::DEFAULT_DATASET_NAME.to_string())
            .as_str(),
    );
    let base = non_blank(args.base).or_else(|| non_blank(cfg.base));

    let delimiter = match args.delimiter.or(cfg.delimiter) {
        Some(raw) => validation::parse_delimiter(&raw)
            .map_err(|e| format!("invalid delimiter '{raw}': {e}"))?,
        None => dataset::DEFAULT_DELIMITER,
    };
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }

    let page_size = args
        .page_size
        .or(cfg.page_size)
        .unwrap_or(pager::DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("invalid page-size, expected positive integer".to_string());
    }
    let page = args.page.unwrap_or(1);

    let hidden_raw = if args.hide.is_empty() {
        cfg.hidden_sections.unwrap_or_default()
    } else {
        args.hide.clone()
    };
    let mut hidden: Vec<Section> = Vec::new();
    for raw in hidden_raw.iter() {
        let section = Section::parse(raw)
            .ok_or_else(|| format!("invalid hidden section '{raw}', expected explanation, mk, mv, or sp"))?;
        if !hidden.contains(&section) {
            hidden.push(section);
        }
    }

    let search_commentary = if args.no_commentary_search {
        false
    } else {
        cfg.search_commentary.unwrap_or(true)
    };

    let debounce = cfg
        .debounce_ms
        .map(Duration::from_millis)
        .unwrap_or(debounce::DEFAULT_DEBOUNCE);
    let debounce = args.debounce_ms.map(Duration::from_millis).unwrap_or(debounce);

    let output = non_blank(args.output)
        .or_else(|| non_blank(cfg.output))
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text or json"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    let refresh_cache = args.refresh_cache;
    let offline = args.offline.or(cfg.offline).unwrap_or(false) || refresh_cache;
    let cache_dir = non_blank(args.cache_dir)
        .or_else(|| non_blank(cfg.cache_dir))
        .map(|p| config::expand_tilde(&p))
        .unwrap_or_else(config::default_cache_dir);
    let cache_version = non_blank(args.cache_version)
        .or_else(|| non_blank(cfg.cache_version))
        .unwrap_or_else(|| cache::DEFAULT_CACHE_VERSION.to_string());
    let cache_assets = cfg
        .cache_assets
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    Ok(RunConfig {
        data,
        base,
        delimiter,
        timeout,
        paul: non_blank(args.paul),
        iyal: non_blank(args.iyal),
        adikaram: non_blank(args.adikaram),
        number: args.number,
        search: args.search,
        search_commentary,
        page,
        page_size,
        hidden,
        show_options: args.options,
        interactive: args.interactive,
        debounce,
        output,
        output_format,
        no_color,
        verbose: args.verbose,
        offline,
        cache_dir,
        cache_version,
        cache_assets,
        refresh_cache,
    })
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8, no_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .try_init();
}

fn loading_spinner(label: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(label.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn read_dataset(run: &RunConfig) -> Result<Vec<Kural>, String> {
    let (origin, asset) =
        AssetOrigin::resolve(&run.data, run.base.as_deref()).map_err(|e| e.to_string())?;
    let client = dataset::build_client(run.timeout).map_err(|e| e.to_string())?;

    let rows = if run.offline {
        let cache = AssetCache::new(&run.cache_dir, &run.cache_version).map_err(|e| e.to_string())?;
        let mut assets = run.cache_assets.clone();
        if !assets.contains(&asset) {
            assets.push(asset.clone());
        }
        cache
            .ensure_current(&client, &origin, &assets, run.refresh_cache)
            .await
            .map_err(|e| e.to_string())?;
        let bytes = cache
            .fetch(&client, &origin, &asset)
            .await
            .map_err(|e| e.to_string())?;
        dataset::parse_rows(&bytes, run.delimiter).map_err(|e| e.to_string())?
    } else {
        let source = origin.locate(&asset).map_err(|e| e.to_string())?;
        dataset::load_rows(&client, &source, run.delimiter)
            .await
            .map_err(|e| e.to_string())?
    };

    Ok(record::normalize_rows(&rows))
}

async fn load_session(run: &RunConfig) -> Session {
    let spinner = loading_spinner("loading kurals");
    let loaded = read_dataset(run).await;
    spinner.finish_and_clear();
    match loaded {
        Ok(records) => {
            tracing::info!(records = records.len(), "kurals loaded");
            Session::loaded(records, run.page_size)
        }
        Err(reason) => Session::failed(reason, run.page_size),
    }
}

fn apply_initial_criteria(session: &mut Session, run: &RunConfig) {
    session.set_visibility(Visibility::with_hidden(&run.hidden));
    session.set_page_size(run.page_size);
    session.edit_search(run.search.as_deref().unwrap_or_default());
    session.edit_number_input(run.number.as_deref().unwrap_or_default());
    if !run.search_commentary {
        session.set_search_commentary(false);
    }
    let selections = [
        (Dimension::Paul, run.paul.as_deref()),
        (Dimension::Iyal, run.iyal.as_deref()),
        (Dimension::Adikaram, run.adikaram.as_deref()),
    ];
    for (dimension, value) in selections {
        if value.is_some() {
            session.select(dimension, value);
        }
    }
    session.refresh();
    if run.page > 1 {
        session.goto_page(run.page);
    }
}

/// The labelled lines printed under a kural's couplet: the Paul
/// translation, then every visible non-empty section.
fn kural_details<'k>(kural: &'k Kural, visibility: &Visibility) -> Vec<(&'static str, &'k str)> {
    let mut details = Vec::new();
    if !kural.paul_translation().is_empty() {
        details.push(("Paul Translation", kural.paul_translation()));
    }
    for section in Section::ALL {
        let text = kural.section(section);
        if visibility.is_visible(section) && !text.is_empty() {
            details.push((section.title(), text));
        }
    }
    details
}

fn print_kural(kural: &Kural, visibility: &Visibility) {
    println!(
        "{} {}",
        format!("#{}", kural.number()).bold().cyan(),
        format!("{} / {} / {}", kural.paul(), kural.iyal(), kural.adikaram()).dimmed()
    );
    for line in kural.lines() {
        println!("    {}", line.bold());
    }
    for (label, text) in kural_details(kural, visibility) {
        println!("  {}: {}", label.green(), text);
    }
    println!();
}

fn print_results(session: &Session) {
    match session.results() {
        ResultsState::LoadFailed { message, reason } => {
            println!("{}", message.red().bold());
            tracing::debug!(%reason, "load failure detail");
        }
        ResultsState::Invalid { message } => {
            println!("{}", message.yellow());
        }
        ResultsState::Ready(view) => {
            println!("{}", view.summary.bold());
            if let Some(message) = view.empty_message() {
                println!("{}", message.yellow());
                return;
            }
            println!();
            let page = view.page();
            for kural in page.items {
                print_kural(kural, &view.visibility);
            }
            let range = page
                .item_range()
                .map(|(start, end)| format!(" ({start}-{end} of {})", page.total))
                .unwrap_or_default();
            format_kv_line(
                "Page",
                &format!("{}/{}{}", page.page, page.total_pages, range),
            );
        }
    }
}

fn print_options(session: &Session) {
    let options = session.options();
    for dimension in Dimension::ALL {
        let opts = options.get(dimension);
        let selected = session.criteria().categories.get(dimension);
        let state = if opts.enabled {
            opts.placeholder.to_string()
        } else {
            opts.placeholder.dimmed().to_string()
        };
        format_kv_line(dimension.label(), &state);
        for value in opts.values.iter() {
            if selected == Some(value.as_str()) {
                println!("   * {}", value.green());
            } else {
                println!("     {}", value);
            }
        }
    }
}

fn print_run_config(run: &RunConfig) {
    format_kv_line("Dataset", &run.data);
    if let Some(base) = run.base.as_deref() {
        format_kv_line("Base", base);
    }
    format_kv_line("Page Size", &run.page_size.to_string());
    format_kv_line("Commentary", format_bool(run.search_commentary));
    if !run.hidden.is_empty() {
        let hidden: Vec<&str> = run.hidden.iter().map(|s| s.key()).collect();
        format_kv_line("Hidden", &hidden.join(","));
    }
    if run.offline {
        format_kv_line(
            "Cache",
            &format!("{} ({})", run.cache_dir.display(), run.cache_version),
        );
    }
    if let Some(path) = run.output.as_deref() {
        format_kv_line("Output", path);
    }
    println!();
}

async fn write_output(session: &Session, path: &str, format: OutputFormat) -> Result<(), String> {
    let report = match session.results() {
        ResultsState::Ready(view) => output::build_report(
            &view.page(),
            &view.summary,
            view.search_tier,
            &view.visibility,
        ),
        ResultsState::Invalid { message } => return Err(message),
        ResultsState::LoadFailed { message, .. } => return Err(message.to_string()),
    };
    let rendered = output::render(&report, format);

    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;
    outfile
        .write_all(&rendered)
        .await
        .map_err(|_| "failed to write output file".to_string())?;
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Select(Dimension, Option<String>),
    Number(String),
    Search(String),
    Commentary(bool),
    Next,
    Prev,
    Page(usize),
    Size(usize),
    Toggle(Section),
    Options,
    Reset,
    Show,
    Help,
    Quit,
}

const INTERACTIVE_HELP: &str = "\
commands:
  paul|iyal|adikaram [value]   select a category (no value clears it)
  number [n]                   show a single kural (no value clears it)
  search [text]                search the couplets (no value clears it)
  commentary on|off            fall back to the commentaries when searching
  next | prev | page <n>       move between pages
  size <n>                     kurals per page
  toggle <section>             show/hide explanation, mk, mv or sp
  options                      list the category options
  reset                        clear every filter
  show                         print the current page
  help | quit";

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let word = word.to_lowercase();

    if let Some(dimension) = Dimension::parse(&word) {
        let value = if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        };
        return Ok(Some(Command::Select(dimension, value)));
    }

    let positive = |raw: &str, what: &str| -> Result<usize, String> {
        raw.parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("{what} expects a positive number"))
    };

    let command = match word.as_str() {
        "number" | "n" => Command::Number(rest.to_string()),
        "search" | "s" => Command::Search(rest.to_string()),
        "commentary" => match rest.to_lowercase().as_str() {
            "on" | "true" | "yes" => Command::Commentary(true),
            "off" | "false" | "no" => Command::Commentary(false),
            _ => return Err("commentary expects on or off".to_string()),
        },
        "next" => Command::Next,
        "prev" | "previous" => Command::Prev,
        "page" => Command::Page(positive(rest, "page")?),
        "size" => Command::Size(positive(rest, "size")?),
        "toggle" => Command::Toggle(
            Section::parse(rest)
                .ok_or_else(|| "toggle expects explanation, mk, mv or sp".to_string())?,
        ),
        "options" => Command::Options,
        "reset" => Command::Reset,
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

enum Flow {
    Continue,
    Quit,
}

/// Runs the filter pass an edit is still waiting on, whether its timer is
/// pending or has already fired into the channel. Returns whether it ran.
fn flush_pending(
    session: &mut Session,
    debouncer: &mut Debouncer<()>,
    fired: &mut mpsc::UnboundedReceiver<()>,
) -> bool {
    let cancelled = debouncer.cancel();
    let mut queued = false;
    while fired.try_recv().is_ok() {
        queued = true;
    }
    if cancelled || queued {
        session.refresh();
        return true;
    }
    false
}

fn apply_command(
    session: &mut Session,
    debouncer: &mut Debouncer<()>,
    fired: &mut mpsc::UnboundedReceiver<()>,
    command: Command,
) -> Flow {
    match command {
        Command::Number(raw) => {
            session.edit_number_input(&raw);
            debouncer.trigger(());
            return Flow::Continue;
        }
        Command::Search(raw) => {
            session.edit_search(&raw);
            debouncer.trigger(());
            return Flow::Continue;
        }
        Command::Quit => return Flow::Quit,
        _ => {}
    }

    // an immediate pass supersedes any pending debounced one
    flush_pending(session, debouncer, fired);

    match command {
        Command::Select(dimension, value) => {
            session.select(dimension, value.as_deref());
            print_results(session);
        }
        Command::Commentary(enabled) => {
            session.set_search_commentary(enabled);
            print_results(session);
        }
        Command::Next => {
            if session.next_page() {
                print_results(session);
            } else {
                println!("{}", "already on the last page".yellow());
            }
        }
        Command::Prev => {
            if session.prev_page() {
                print_results(session);
            } else {
                println!("{}", "already on the first page".yellow());
            }
        }
        Command::Page(page) => {
            session.goto_page(page);
            print_results(session);
        }
        Command::Size(size) => {
            session.set_page_size(size);
            print_results(session);
        }
        Command::Toggle(section) => {
            let visible = session.toggle(section);
            format_kv_line(section.title(), if visible { "shown" } else { "hidden" });
            print_results(session);
        }
        Command::Options => print_options(session),
        Command::Reset => {
            session.reset();
            print_results(session);
        }
        Command::Show => print_results(session),
        Command::Help => println!("{INTERACTIVE_HELP}"),
        Command::Number(_) | Command::Search(_) | Command::Quit => {}
    }
    Flow::Continue
}

async fn run_interactive(session: &mut Session, debounce: Duration) -> Result<(), String> {
    let (mut debouncer, mut fired) = Debouncer::<()>::new(debounce);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", "type 'help' for commands".dimmed());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| format!("failed to read stdin: {e}"))?;
                let Some(line) = line else {
                    if flush_pending(session, &mut debouncer, &mut fired) {
                        print_results(session);
                    }
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if let Flow::Quit = apply_command(session, &mut debouncer, &mut fired, command) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e.red()),
                }
            }
            Some(()) = fired.recv() => {
                tracing::debug!("debounced filter pass");
                session.refresh();
                print_results(session);
            }
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();
    print_run_config(&run);

    let mut session = load_session(&run).await;
    if session.is_loaded() {
        apply_initial_criteria(&mut session, &run);
    }

    if run.show_options && session.is_loaded() {
        print_options(&session);
        println!();
    }
    print_results(&session);

    if run.interactive && session.is_loaded() {
        run_interactive(&mut session, run.debounce).await?;
    }

    if let Some(path) = run.output.as_deref() {
        write_output(&session, path, run.output_format).await?;
        format_kv_line("Saved", path);
    }

    if let ResultsState::LoadFailed { reason, .. } = session.results() {
        return Err(format!("failed to load dataset: {reason}"));
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_deref().map(config::expand_tilde) {
        Some(path) => config::load_config(&path, false)?,
        None => match config::default_config_path() {
            Some(path) => {
                if let Err(e) = config::ensure_default_config_file(&path) {
                    eprintln!("{}", e.yellow());
                }
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    init_logging(run.verbose, run.no_color);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
