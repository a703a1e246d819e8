use crate::types::{BrowseError, BrowseResult};
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::LOCATION;
use reqwest::Url;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// ASF search API endpoint
pub const ASF_SEARCH_URL: &str = "https://api.daac.asf.alaska.edu/services/search/param";

/// Earthdata Login host answering authentication redirects
pub const EARTHDATA_LOGIN_HOST: &str = "urs.earthdata.nasa.gov";

const MAX_REDIRECTS: usize = 10;

/// Download parameters
#[derive(Debug, Clone)]
pub struct DownloadParams {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per URL
    pub max_retries: u32,
    /// Pause between attempts in seconds
    pub retry_delay_secs: u64,
    pub user_agent: String,
}

impl Default for DownloadParams {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_retries: 3,
            retry_delay_secs: 2,
            user_agent: format!("opera-rtc-browse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Earthdata Login username and password
#[derive(Clone)]
pub struct EarthdataCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for EarthdataCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EarthdataCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl EarthdataCredentials {
    /// Resolve credentials from explicit values, the environment, or `~/.netrc`
    pub fn resolve(username: Option<String>, password: Option<String>) -> BrowseResult<Self> {
        let username = username.or_else(|| std::env::var("EARTHDATA_USERNAME").ok());
        let password = password.or_else(|| std::env::var("EARTHDATA_PASSWORD").ok());

        if let (Some(username), Some(password)) = (username, password) {
            return Ok(Self { username, password });
        }

        if let Some(netrc) = dirs::home_dir().map(|home| home.join(".netrc")) {
            if let Ok(content) = std::fs::read_to_string(&netrc) {
                if let Some(credentials) = Self::from_netrc(&content, EARTHDATA_LOGIN_HOST) {
                    log::debug!("Using Earthdata credentials from {}", netrc.display());
                    return Ok(credentials);
                }
            }
        }

        Err(BrowseError::Config(
            "Earthdata credentials not found. Pass --earthdata-username/--earthdata-password, \
             set EARTHDATA_USERNAME/EARTHDATA_PASSWORD, or add an entry to ~/.netrc"
                .to_string(),
        ))
    }

    /// Parse the `login`/`password` of `machine` from netrc content
    pub fn from_netrc(content: &str, machine: &str) -> Option<Self> {
        let tokens: Vec<&str> = content.split_whitespace().collect();
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i] == "machine" && tokens.get(i + 1) == Some(&machine) {
                let mut login = None;
                let mut password = None;
                let mut j = i + 2;
                while j + 1 < tokens.len() && tokens[j] != "machine" {
                    match tokens[j] {
                        "login" => login = Some(tokens[j + 1].to_string()),
                        "password" => password = Some(tokens[j + 1].to_string()),
                        _ => {}
                    }
                    j += 2;
                }
                return match (login, password) {
                    (Some(username), Some(password)) => Some(Self { username, password }),
                    _ => None,
                };
            }
            i += 1;
        }
        None
    }
}

/// Whether a name follows the OPERA RTC-S1 burst granule convention
pub fn is_opera_rtc_granule(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^OPERA_L2_RTC-S1_T\d{3}-\d{6}-IW[1-3]_\d{8}T\d{6}Z_\d{8}T\d{6}Z_S1[A-D]_\d{2}_v\d+\.\d+$",
            )
            .ok()
        })
        .as_ref()
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<SearchFeature>,
}

#[derive(Debug, Deserialize)]
struct SearchFeature {
    properties: SearchProperties,
}

#[derive(Debug, Deserialize)]
struct SearchProperties {
    url: Option<String>,
    #[serde(rename = "additionalUrls", default)]
    additional_urls: Vec<String>,
}

/// Granule lookup against the ASF search API
pub struct AsfSearch {
    client: Client,
    endpoint: String,
}

impl AsfSearch {
    pub fn new(params: &DownloadParams) -> BrowseResult<Self> {
        Ok(Self {
            client: build_client(params, true)?,
            endpoint: ASF_SEARCH_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// All product URLs of a granule: `additionalUrls` followed by `url`
    pub fn granule_urls(&self, granule: &str) -> BrowseResult<Vec<String>> {
        log::info!("Searching ASF for granule: {}", granule);

        let response = self
            .client
            .get(self.endpoint.as_str())
            .query(&[("granule_list", granule), ("output", "geojson")])
            .send()
            .map_err(|e| BrowseError::Download(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BrowseError::Download(format!(
                "Search returned HTTP {} for granule {}",
                response.status().as_u16(),
                granule
            )));
        }

        let body = response
            .text()
            .map_err(|e| BrowseError::Download(format!("Failed to read search response: {}", e)))?;
        parse_granule_urls(&body, granule)
    }
}

/// Extract the URL list of the first feature of a GeoJSON search response
pub fn parse_granule_urls(body: &str, granule: &str) -> BrowseResult<Vec<String>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| BrowseError::InvalidFormat(format!("Invalid search response: {}", e)))?;

    let feature = response.features.into_iter().next().ok_or_else(|| {
        BrowseError::MissingInput {
            label: "search result".to_string(),
            id: granule.to_string(),
        }
    })?;

    let mut urls = feature.properties.additional_urls;
    urls.extend(feature.properties.url);
    log::debug!("Granule {} has {} URLs", granule, urls.len());
    Ok(urls)
}

/// How requests authenticate against Earthdata-protected hosts
#[derive(Debug, Clone)]
pub enum EarthdataAuth {
    Anonymous,
    Credentials(EarthdataCredentials),
    Token(String),
}

/// Fetches files into a local directory
pub trait Downloader {
    fn download(&self, url: &str, destination_dir: &Path, access_token: Option<&str>) -> BrowseResult<PathBuf>;
}

/// Authenticated HTTP session for Earthdata-hosted products
pub struct EarthdataSession {
    client: Client,
    auth: EarthdataAuth,
    params: DownloadParams,
}

fn build_client(params: &DownloadParams, follow_redirects: bool) -> BrowseResult<Client> {
    let policy = if follow_redirects {
        reqwest::redirect::Policy::default()
    } else {
        reqwest::redirect::Policy::none()
    };
    Client::builder()
        .timeout(std::time::Duration::from_secs(params.timeout_secs))
        .user_agent(params.user_agent.as_str())
        .cookie_store(true)
        .redirect(policy)
        .build()
        .map_err(|e| BrowseError::Download(format!("Failed to create HTTP client: {}", e)))
}

/// File name a URL downloads to
pub fn url_filename(url: &str) -> BrowseResult<String> {
    let name = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.last())
            .map(str::to_string),
        Err(_) => url.rsplit('/').next().map(str::to_string),
    };
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| BrowseError::Download(format!("Cannot derive a file name from URL: {}", url)))
}

impl EarthdataSession {
    pub fn new(auth: EarthdataAuth, params: DownloadParams) -> BrowseResult<Self> {
        // Redirects are followed by hand so credentials only go to the login host
        let client = build_client(&params, false)?;
        Ok(Self { client, auth, params })
    }

    /// Download several URLs into `output_dir`, in order
    pub fn download_urls(&self, urls: &[&str], output_dir: &Path) -> BrowseResult<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)?;
        urls.iter()
            .map(|url| self.download(url, output_dir, None))
            .collect()
    }

    /// Attach credentials for a request to `current` reached from `origin`.
    ///
    /// Tokens go only to the origin host and the login host; redirect
    /// targets elsewhere (presigned S3 or CDN URLs) are requested bare.
    fn authorize(&self, request: RequestBuilder, origin: &Url, current: &Url, token: Option<&str>) -> RequestBuilder {
        let host = current.host_str();
        let on_login_host = host == Some(EARTHDATA_LOGIN_HOST);
        let token = token.or(match &self.auth {
            EarthdataAuth::Token(token) => Some(token.as_str()),
            _ => None,
        });

        match (token, &self.auth) {
            (Some(token), _) if on_login_host || host == origin.host_str() => request.bearer_auth(token),
            (Some(_), _) => request,
            (None, EarthdataAuth::Credentials(creds)) if on_login_host => {
                request.basic_auth(&creds.username, Some(&creds.password))
            }
            _ => request,
        }
    }

    fn try_download_once(&self, url: &str, output_path: &Path, token: Option<&str>) -> BrowseResult<()> {
        let origin = Url::parse(url)
            .map_err(|e| BrowseError::Download(format!("Invalid URL {}: {}", url, e)))?;
        let mut current = origin.clone();

        for _ in 0..MAX_REDIRECTS {
            let request = self.authorize(self.client.get(current.clone()), &origin, &current, token);
            let mut response = request
                .send()
                .map_err(|e| BrowseError::Download(format!("HTTP request failed: {}", e)))?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| BrowseError::Download(format!("Redirect without location from {}", current)))?;
                current = current
                    .join(location)
                    .map_err(|e| BrowseError::Download(format!("Invalid redirect location {}: {}", location, e)))?;
                log::debug!("Following redirect to {}", current);
                continue;
            }

            if !response.status().is_success() {
                return Err(BrowseError::Download(format!(
                    "HTTP {} {}: {}",
                    response.status().as_u16(),
                    response.status().canonical_reason().unwrap_or(""),
                    url
                )));
            }

            let mut file = File::create(output_path)?;
            let bytes = response
                .copy_to(&mut file)
                .map_err(|e| BrowseError::Download(format!("Failed to read response body: {}", e)))?;
            log::debug!("Downloaded {} bytes to {}", bytes, output_path.display());
            return Ok(());
        }

        Err(BrowseError::Download(format!("Too many redirects for {}", url)))
    }
}

impl Downloader for EarthdataSession {
    fn download(&self, url: &str, destination_dir: &Path, access_token: Option<&str>) -> BrowseResult<PathBuf> {
        let output_path = destination_dir.join(url_filename(url)?);
        log::info!("Downloading {} -> {}", url, output_path.display());

        let mut last_error = None;
        for attempt in 1..=self.params.max_retries {
            match self.try_download_once(url, &output_path, access_token) {
                Ok(()) => return Ok(output_path),
                Err(e) => {
                    log::warn!("Download attempt {} of {} failed: {}", attempt, self.params.max_retries, e);
                    // Drop any partial file before the next attempt
                    let _ = std::fs::remove_file(&output_path);
                    last_error = Some(e);
                    if attempt < self.params.max_retries {
                        std::thread::sleep(std::time::Duration::from_secs(self.params.retry_delay_secs));
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BrowseError::Download(format!("Download failed after all retries: {}", url))))
    }
}
