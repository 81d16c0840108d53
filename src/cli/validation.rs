use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.delimiter.as_deref() {
        parse_delimiter(raw).map_err(|e| format!("invalid --delimiter '{raw}': {e}"))?;
    }
    for raw in args.hide.iter() {
        crate::record::Section::parse(raw).ok_or_else(|| {
            format!("invalid --hide '{raw}', expected explanation, mk, mv, or sp")
        })?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        crate::output::OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid --output-format '{raw}', expected text or json"))?;
    }
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            return Err("invalid page-size, expected positive integer".to_string());
        }
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid page, pages start at 1".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive number of seconds".to_string());
        }
    }
    if args.refresh_cache && args.offline == Some(false) {
        return Err("--refresh-cache requires the offline cache".to_string());
    }
    Ok(())
}

/// A delimiter is a single ASCII character; `\t` and `tab` mean a tab.
pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "\\t" | "tab" | "\t" => return Ok(b'\t'),
        _ => {}
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        (Some(_), None) => Err("delimiter must be an ASCII character".to_string()),
        _ => Err("delimiter must be a single character".to_string()),
    }
}
