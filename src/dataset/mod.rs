use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use csv::StringRecord;
use thiserror::Error;

pub const DEFAULT_DATASET_NAME: &str = "thirukkural.csv";
pub const DEFAULT_DELIMITER: u8 = b',';

/// A table row as read from the dataset, before any normalization.
///
/// Columns are matched by header name; missing columns and fields missing
/// from short rows read as empty strings. Unknown columns are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRow {
    pub number: String,
    pub kural: String,
    pub explanation: String,
    pub paul_name: String,
    pub paul_translation: String,
    pub iyal_name: String,
    pub adikaram_name: String,
    pub mk: String,
    pub mv: String,
    pub sp: String,
}

// header positions of the recognized columns
#[derive(Clone, Copy, Debug, Default)]
struct Columns {
    number: Option<usize>,
    kural: Option<usize>,
    explanation: Option<usize>,
    paul_name: Option<usize>,
    paul_translation: Option<usize>,
    iyal_name: Option<usize>,
    adikaram_name: Option<usize>,
    mk: Option<usize>,
    mv: Option<usize>,
    sp: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            number: find("Number"),
            kural: find("kural"),
            explanation: find("explanation"),
            paul_name: find("paul_name"),
            paul_translation: find("paul_translation"),
            iyal_name: find("iyal_name"),
            adikaram_name: find("adikaram_name"),
            mk: find("mk"),
            mv: find("mv"),
            sp: find("sp"),
        }
    }

    fn row(&self, record: &StringRecord) -> RawRow {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        RawRow {
            number: field(self.number),
            kural: field(self.kural),
            explanation: field(self.explanation),
            paul_name: field(self.paul_name),
            paul_translation: field(self.paul_translation),
            iyal_name: field(self.iyal_name),
            adikaram_name: field(self.adikaram_name),
            mk: field(self.mk),
            mv: field(self.mv),
            sp: field(self.sp),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid dataset location '{location}': {message}")]
    InvalidLocation { location: String, message: String },

    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch dataset {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("dataset request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse dataset: {source}")]
    Parse {
        #[source]
        source: csv::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

/// Where the application's assets live: a base URL or a local directory.
/// Relative asset names (such as the dataset file) resolve against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetOrigin {
    Url(reqwest::Url),
    Directory(PathBuf),
}

impl AssetOrigin {
    pub fn parse(base: &str) -> Result<Self, LoadError> {
        let base = base.trim();
        if is_http_url(base) {
            let mut url = reqwest::Url::parse(base).map_err(|e| LoadError::InvalidLocation {
                location: base.to_string(),
                message: e.to_string(),
            })?;
            // a base without a trailing slash would drop its last segment on join
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(Self::Url(url));
        }
        let dir = if base.is_empty() { "." } else { base };
        Ok(Self::Directory(crate::config::expand_tilde(dir)))
    }

    /// Splits a dataset location into the origin it lives under and the
    /// asset name relative to that origin. A relative location with a `base`
    /// resolves against the base; anything else stands on its own.
    pub fn resolve(location: &str, base: Option<&str>) -> Result<(Self, String), LoadError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(LoadError::InvalidLocation {
                location: location.to_string(),
                message: "location is empty".to_string(),
            });
        }

        if is_http_url(location) {
            let url = reqwest::Url::parse(location).map_err(|e| LoadError::InvalidLocation {
                location: location.to_string(),
                message: e.to_string(),
            })?;
            let name = url
                .path_segments()
                .and_then(|segments| segments.last())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| LoadError::InvalidLocation {
                    location: location.to_string(),
                    message: "URL does not name a file".to_string(),
                })?
                .to_string();
            let parent = url.join("./").map_err(|e| LoadError::InvalidLocation {
                location: location.to_string(),
                message: e.to_string(),
            })?;
            return Ok((Self::Url(parent), name));
        }

        if let Some(base) = base.filter(|b| !b.trim().is_empty()) {
            if is_relative_asset(location) {
                return Ok((Self::parse(base)?, location.to_string()));
            }
        }

        let path = crate::config::expand_tilde(location);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| LoadError::InvalidLocation {
                location: location.to_string(),
                message: "path does not name a file".to_string(),
            })?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((Self::Directory(parent), name))
    }

    pub fn locate(&self, asset: &str) -> Result<DatasetSource, LoadError> {
        if !is_relative_asset(asset) {
            return Err(LoadError::InvalidLocation {
                location: asset.to_string(),
                message: "asset names must be relative and stay inside the origin".to_string(),
            });
        }
        match self {
            Self::Url(base) => base
                .join(asset)
                .map(DatasetSource::Url)
                .map_err(|e| LoadError::InvalidLocation {
                    location: asset.to_string(),
                    message: e.to_string(),
                }),
            Self::Directory(dir) => Ok(DatasetSource::File(dir.join(asset))),
        }
    }
}

impl fmt::Display for AssetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Url(reqwest::Url),
    Inline(String),
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
            Self::Inline(_) => write!(f, "<inline>"),
        }
    }
}

fn is_http_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// True when `asset` is a plain relative path with no `..`, root or prefix
/// components.
pub fn is_relative_asset(asset: &str) -> bool {
    let trimmed = asset.trim();
    if trimmed.is_empty() || trimmed.starts_with('~') || trimmed.contains("://") {
        return false;
    }
    Path::new(trimmed)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

pub fn build_client(timeout_seconds: u64) -> Result<reqwest::Client, LoadError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!(
            "kuralview/",
            env!("CARGO_PKG_VERSION")
        )),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_seconds.max(1)))
        .build()
        .map_err(|e| LoadError::HttpClientBuild { source: e })
}

/// Fetches the raw bytes of a dataset resource. Any non-success HTTP status
/// is an error.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    source: &DatasetSource,
) -> Result<Vec<u8>, LoadError> {
    match source {
        DatasetSource::Inline(text) => Ok(text.clone().into_bytes()),
        DatasetSource::File(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|e| LoadError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
        }
        DatasetSource::Url(url) => {
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| LoadError::Fetch {
                    url: url.to_string(),
                    source: e,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            let body = response.bytes().await.map_err(|e| LoadError::Fetch {
                url: url.to_string(),
                source: e,
            })?;
            Ok(body.to_vec())
        }
    }
}

/// Parses a delimited table with a header row into raw rows. Quoted fields
/// may span lines, blank lines are skipped, and rows shorter or longer than
/// the header are tolerated.
pub fn parse_rows(bytes: &[u8], delimiter: u8) -> Result<Vec<RawRow>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Parse { source: e })?
        .clone();
    let columns = Columns::from_headers(&headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| LoadError::Parse { source: e })?;
        rows.push(columns.row(&record));
    }
    Ok(rows)
}

pub async fn load_rows(
    client: &reqwest::Client,
    source: &DatasetSource,
    delimiter: u8,
) -> Result<Vec<RawRow>, LoadError> {
    tracing::debug!(%source, "loading dataset");
    let bytes = fetch_bytes(client, source).await?;
    let rows = parse_rows(&bytes, delimiter)?;
    tracing::info!(%source, rows = rows.len(), "dataset parsed");
    Ok(rows)
}
