use serde::{Deserialize, Serialize};

/// Default expansion alphabet: digits then lowercase ASCII letters
pub const DEFAULT_EXPANSION_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

/// Main configuration structure for Catalog-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What the orchestrator does when a query node's fetch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the whole crawl with the transport error
    #[default]
    Abort,
    /// Record the node as failed and keep going with its siblings
    Continue,
}

/// Crawl engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Queries the frontier is seeded with (depth 0)
    pub seeds: Vec<String>,

    /// Store/location context passed with every search call
    #[serde(rename = "location-id")]
    pub location_id: String,

    /// Entities requested per page (`L`)
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// First-page entity count at which a query counts as broad (`T`, at most `L`)
    #[serde(rename = "expansion-threshold")]
    pub expansion_threshold: u32,

    /// Deepest level a child query may be created at
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Page cap per query
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Queries shorter than this are expanded without being searched
    #[serde(rename = "min-term-length", default = "default_min_term_length")]
    pub min_term_length: usize,

    /// Symbols appended to a broad query to form its children
    #[serde(rename = "expansion-alphabet", default = "default_expansion_alphabet")]
    pub expansion_alphabet: String,

    /// Optional cap on the total number of query nodes ever created
    #[serde(rename = "max-nodes", default)]
    pub max_nodes: Option<usize>,

    #[serde(rename = "on-node-failure", default)]
    pub on_node_failure: FailurePolicy,
}

impl CrawlConfig {
    /// Creates a crawl configuration with default page cap, term length and alphabet
    pub fn new(
        seeds: Vec<String>,
        location_id: impl Into<String>,
        page_size: u32,
        expansion_threshold: u32,
        max_depth: u32,
    ) -> Self {
        Self {
            seeds,
            location_id: location_id.into(),
            page_size,
            expansion_threshold,
            max_depth,
            max_pages: default_max_pages(),
            min_term_length: default_min_term_length(),
            expansion_alphabet: default_expansion_alphabet(),
            max_nodes: None,
            on_node_failure: FailurePolicy::default(),
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_min_term_length(mut self, min_term_length: usize) -> Self {
        self.min_term_length = min_term_length;
        self
    }

    pub fn with_alphabet(mut self, alphabet: impl Into<String>) -> Self {
        self.expansion_alphabet = alphabet.into();
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_node_failure = policy;
        self
    }

    /// Returns the expansion alphabet as individual symbols
    pub fn alphabet(&self) -> Vec<char> {
        self.expansion_alphabet.chars().collect()
    }

    /// Worst-case number of nodes the crawl can create
    ///
    /// Each seed roots a tree of branching factor `A` (alphabet size) and
    /// height `max_depth`, so the bound is `seeds * sum(A^d for d in 0..=max_depth)`.
    /// Saturates instead of overflowing.
    pub fn worst_case_nodes(&self) -> u64 {
        let branching = self.expansion_alphabet.chars().count() as u64;
        let mut per_seed: u64 = 0;
        let mut level: u64 = 1;
        for _ in 0..=self.max_depth {
            per_seed = per_seed.saturating_add(level);
            level = level.saturating_mul(branching);
        }
        per_seed.saturating_mul(self.seeds.len() as u64)
    }
}

/// Bounded lookup pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    /// Requested number of workers
    #[serde(default = "default_lookup_concurrency")]
    pub concurrency: usize,

    /// Hard upper bound on workers
    #[serde(rename = "max-concurrency", default = "default_lookup_max_concurrency")]
    pub max_concurrency: usize,

    /// Records requested per lookup call
    #[serde(rename = "page-size", default = "default_lookup_page_size")]
    pub page_size: u32,

    /// CSS selector for elements carrying an identifier in an HTML listing
    #[serde(rename = "id-selector", default = "default_id_selector")]
    pub id_selector: String,

    /// Attribute holding the identifier on matched elements
    #[serde(rename = "id-attribute", default = "default_id_attribute")]
    pub id_attribute: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            concurrency: default_lookup_concurrency(),
            max_concurrency: default_lookup_max_concurrency(),
            page_size: default_lookup_page_size(),
            id_selector: default_id_selector(),
            id_attribute: default_id_attribute(),
        }
    }
}

/// External search API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the search API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the product search endpoint
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for 429/5xx/timeouts, on top of the first attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Environment variable holding a bearer token, if the API needs one
    #[serde(rename = "token-env", default)]
    pub token_env: Option<String>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            search_path: default_search_path(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            token_env: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON crawl report
    #[serde(rename = "report-path", default = "default_report_path")]
    pub report_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_path: default_report_path(),
        }
    }
}

fn default_max_pages() -> u32 {
    5
}

fn default_min_term_length() -> usize {
    3
}

fn default_expansion_alphabet() -> String {
    DEFAULT_EXPANSION_ALPHABET.to_string()
}

fn default_lookup_concurrency() -> usize {
    8
}

fn default_lookup_max_concurrency() -> usize {
    32
}

fn default_lookup_page_size() -> u32 {
    5
}

fn default_id_selector() -> String {
    "[data-product-id]".to_string()
}

fn default_id_attribute() -> String {
    "data-product-id".to_string()
}

fn default_search_path() -> String {
    "/v1/products".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_report_path() -> String {
    "./crawl-report.json".to_string()
}
