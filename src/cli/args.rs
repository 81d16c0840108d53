use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "kuralview",
    version,
    about = "Thirukkural reference viewer",
    long_about = "kuralview browses the 1330 kurals of the Thirukkural with cascading Paul/Iyal/Adikaram filters, direct number lookup and text search that falls back to the commentaries.\n\nExamples:\n  kuralview --number 1\n  kuralview --paul அறத்துப்பால் --iyal பாயிரவியல் --page 2\n  kuralview --search அறம் --hide mk --hide mv\n  kuralview --interactive\n\nTip: Use --config to persist the dataset location and view settings."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv). RUST_LOG takes precedence."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Also write the current page to a file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output file format (text or json). Inferred from the file extension when omitted."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'd',
        long = "data",
        visible_alias = "dataset",
        value_name = "FILE|URL",
        help_heading = "Input",
        help = "Dataset location (defaults to thirukkural.csv under --base)."
    )]
    pub data: Option<String>,

    #[arg(
        long = "base",
        value_name = "DIR|URL",
        help_heading = "Input",
        help = "Directory or URL that relative dataset and asset names resolve against."
    )]
    pub base: Option<String>,

    #[arg(
        long = "delim",
        visible_alias = "delimiter",
        value_name = "CHAR",
        help_heading = "Input",
        help = "Field delimiter of the dataset (single character, \\t for tab)."
    )]
    pub delimiter: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "Input",
        help = "HTTP timeout when the dataset is fetched from a URL."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.kuralview/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'p',
        long = "paul",
        value_name = "NAME",
        help_heading = "Filter",
        help = "Only kurals in this Paul."
    )]
    pub paul: Option<String>,

    #[arg(
        short = 'y',
        long = "iyal",
        value_name = "NAME",
        help_heading = "Filter",
        help = "Only kurals in this Iyal."
    )]
    pub iyal: Option<String>,

    #[arg(
        short = 'a',
        long = "adikaram",
        value_name = "NAME",
        help_heading = "Filter",
        help = "Only kurals in this Adikaram."
    )]
    pub adikaram: Option<String>,

    #[arg(
        short = 'k',
        long = "num",
        visible_alias = "number",
        value_name = "N",
        help_heading = "Filter",
        help = "Show a single kural by number (1-1330); other filters are ignored."
    )]
    pub number: Option<String>,

    #[arg(
        short = 's',
        long = "search",
        value_name = "TEXT",
        help_heading = "Filter",
        help = "Search the couplet text, falling back to the commentaries when nothing matches."
    )]
    pub search: Option<String>,

    #[arg(
        long = "ncs",
        visible_alias = "no-commentary-search",
        help_heading = "Filter",
        help = "Never fall back to the explanation and commentaries when searching."
    )]
    pub no_commentary_search: bool,

    #[arg(
        short = 'P',
        long = "page",
        value_name = "N",
        help_heading = "View",
        help = "Page to show (clamped into range)."
    )]
    pub page: Option<usize>,

    #[arg(
        short = 'S',
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "View",
        help = "Kurals per page."
    )]
    pub page_size: Option<usize>,

    #[arg(
        short = 'H',
        long = "hide",
        value_name = "SECTION",
        action = ArgAction::Append,
        help_heading = "View",
        help = "Hide a section: explanation, mk, mv or sp (repeatable)."
    )]
    pub hide: Vec<String>,

    #[arg(
        long = "opts",
        visible_alias = "options",
        help_heading = "View",
        help = "Print the Paul/Iyal/Adikaram options for the current selection."
    )]
    pub options: bool,

    #[arg(
        short = 'i',
        long = "int",
        visible_alias = "interactive",
        help_heading = "View",
        help = "Start an interactive session reading commands from stdin."
    )]
    pub interactive: bool,

    #[arg(
        long = "db",
        visible_alias = "debounce",
        value_name = "MS",
        help_heading = "View",
        help = "Quiet period before search/number input is applied in interactive mode."
    )]
    pub debounce_ms: Option<u64>,

    #[arg(
        long = "off",
        visible_alias = "offline",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "Cache",
        help = "Serve the dataset from the offline cache, fetching it once when missing."
    )]
    pub offline: Option<bool>,

    #[arg(
        long = "cd",
        visible_alias = "cache-dir",
        value_name = "DIR",
        help_heading = "Cache",
        help = "Offline cache directory (defaults to ~/.kuralview/cache)."
    )]
    pub cache_dir: Option<String>,

    #[arg(
        long = "cv",
        visible_alias = "cache-version",
        value_name = "NAME",
        help_heading = "Cache",
        help = "Cache version; other versions are deleted on refresh."
    )]
    pub cache_version: Option<String>,

    #[arg(
        long = "rc",
        visible_alias = "refresh-cache",
        help_heading = "Cache",
        help = "Fetch all cached assets again and delete stale cache versions."
    )]
    pub refresh_cache: bool,
}
