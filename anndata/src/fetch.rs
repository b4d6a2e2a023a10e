//! Downloads of public single-cell atlases
//!
//! A [`Fetcher`] owns one pooled HTTP client and is passed by reference to every
//! download. Transient failures (connection errors, timeouts and the configured
//! retry statuses) are retried with exponential backoff; anything else surfaces
//! immediately.

use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use itertools::Itertools;
use rayon::prelude::*;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumIter};

const USER_AGENT: &str = concat!("spatialrsp/", env!("CARGO_PKG_VERSION"));

/// Longest server-requested `Retry-After` honoured before a retry
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Retries after the first attempt
    pub retries: u32,
    /// Backoff before retry `n` is `backoff_factor * 2^(n - 1)` seconds
    pub backoff_factor: f64,
    pub retry_statuses: Vec<u16>,
    /// Connect timeout, and the longest wait for headers or for any single read
    /// of the body; a download may take any time while bytes keep arriving
    pub timeout_secs: u64,
    /// Idle connections kept per host
    pub pool_size: usize,
    pub chunk_size: usize,
    /// Concurrent downloads in [`Fetcher::download_all`]
    pub workers: usize,
    pub show_progress: bool,
    /// Destination directory for dataset files
    pub data_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_factor: 0.5,
            retry_statuses: vec![429, 500, 502, 503, 504],
            timeout_secs: 10,
            pool_size: 10,
            chunk_size: 1024 * 1024,
            workers: 4,
            show_progress: true,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl FetchConfig {
    /// Delay before retry number `retry` (1-based)
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        Duration::from_secs_f64((self.backoff_factor * 2f64.powi(exponent)).max(0.0))
    }

    /// Delay before retry number `retry`: the server's `Retry-After` capped at
    /// [`MAX_RETRY_AFTER`], else the backoff schedule
    pub fn retry_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(delay) => delay.min(MAX_RETRY_AFTER),
            None => self.backoff_delay(retry),
        }
    }

    fn is_retry_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }
}

/// A file to download and where to put it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub url: String,
    pub dest: PathBuf,
    /// Progress bar label
    pub desc: String,
}

/// Result of one download within [`Fetcher::download_all`]
#[derive(Debug)]
pub struct DownloadOutcome {
    pub file: RemoteFile,
    pub result: Result<PathBuf>,
}

/// KPMP assay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum KpmpKind {
    /// Single-nucleus
    Sn,
    /// Single-cell
    Sc,
}

impl FromStr for KpmpKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sn" => Ok(KpmpKind::Sn),
            "sc" => Ok(KpmpKind::Sc),
            _ => Err(anyhow!("Invalid data_type: must be 'sn' or 'sc'.")),
        }
    }
}

/// Public datasets with known download locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dataset {
    /// Human Cell Landscape
    Hcl,
    /// Kidney Precision Medicine Project
    Kpmp(KpmpKind),
    /// Mouse Cell Atlas (matrix plus cell annotations)
    Mca,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Hcl => write!(f, "HCL"),
            Dataset::Kpmp(kind) => write!(f, "KPMP-{}", kind),
            Dataset::Mca => write!(f, "MCA"),
        }
    }
}

impl Dataset {
    /// Parse a dataset name; `kind` selects the KPMP assay and defaults to `sn`
    pub fn parse(name: &str, kind: Option<&str>) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hcl" => Ok(Dataset::Hcl),
            "kpmp" => Ok(Dataset::Kpmp(kind.unwrap_or("sn").parse()?)),
            "mca" => Ok(Dataset::Mca),
            other => Err(anyhow!(
                "Unknown dataset '{}': expected hcl, kpmp or mca",
                other
            )),
        }
    }

    /// Files making up the dataset, rooted at `data_dir`
    pub fn files(&self, data_dir: &Path) -> Vec<RemoteFile> {
        let file = |url: &str, name: &str, desc: String| RemoteFile {
            url: url.to_string(),
            dest: data_dir.join(name),
            desc,
        };
        match self {
            Dataset::Hcl => vec![file(
                "https://datasets.cellxgene.cziscience.com/ae0c62a1-a30f-4033-97d2-0edb2e146c53.h5ad",
                "hcl.h5ad",
                self.to_string(),
            )],
            Dataset::Kpmp(kind) => {
                let url = match kind {
                    KpmpKind::Sn => {
                        "https://datasets.cellxgene.cziscience.com/7d8af09a-2f96-49f9-a473-f561a332f25d.h5ad"
                    }
                    KpmpKind::Sc => {
                        "https://datasets.cellxgene.cziscience.com/f5b6d620-76df-45c5-9524-e5631be0e44a.h5ad"
                    }
                };
                vec![file(url, &format!("kpmp_{}.h5ad", kind), self.to_string())]
            }
            Dataset::Mca => vec![
                file(
                    "https://figshare.com/ndownloader/files/37560595",
                    "mca.h5ad",
                    "mca.h5ad".to_string(),
                ),
                file(
                    "https://figshare.com/ndownloader/files/36222822",
                    "mca_cell_info.csv",
                    "mca_cell_info.csv".to_string(),
                ),
            ],
        }
    }
}

enum AttemptError {
    Transient {
        error: anyhow::Error,
        retry_after: Option<Duration>,
    },
    Fatal(anyhow::Error),
}

/// Pooled HTTP downloader
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    progress: MultiProgress,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        // the blocking client applies `timeout` to the header wait and to each
        // body read separately, so it bounds idle time rather than total time
        let idle = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(idle)
            .timeout(idle)
            .pool_max_idle_per_host(config.pool_size)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            config,
            progress: MultiProgress::new(),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download `url` to `dest`, returning `dest`
    ///
    /// An existing `dest` is returned untouched. Data is streamed into
    /// `<dest>.part`, which is renamed over `dest` only once complete.
    pub fn download_file(&self, url: &str, dest: &Path, desc: &str) -> Result<PathBuf> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        if dest.exists() {
            tracing::info!("Exists: {}", dest.display());
            return Ok(dest.to_path_buf());
        }

        let part = part_path(dest);
        let mut retry = 0;
        loop {
            match self.attempt(url, &part, desc) {
                Ok(bytes) => {
                    fs::rename(&part, dest).with_context(|| {
                        format!("Failed to move {} to {}", part.display(), dest.display())
                    })?;
                    tracing::info!("Downloaded: {} ({} bytes)", dest.display(), bytes);
                    return Ok(dest.to_path_buf());
                }
                Err(AttemptError::Transient { error, retry_after }) if retry < self.config.retries => {
                    retry += 1;
                    let delay = self.config.retry_delay(retry, retry_after);
                    tracing::warn!(
                        "{}: {:#}; retry {}/{} in {:.1}s",
                        desc,
                        error,
                        retry,
                        self.config.retries,
                        delay.as_secs_f64()
                    );
                    thread::sleep(delay);
                }
                Err(AttemptError::Transient { error, .. }) | Err(AttemptError::Fatal(error)) => {
                    let _ = fs::remove_file(&part);
                    return Err(error.context(format!("Failed to download {}", url)));
                }
            }
        }
    }

    fn attempt(&self, url: &str, part: &Path, desc: &str) -> std::result::Result<u64, AttemptError> {
        let response = self.client.get(url).send().map_err(|e| {
            let transient = e.is_connect() || e.is_timeout();
            classify(transient, anyhow!(e), None)
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(&response);
            let error = anyhow!("HTTP {} from {}", status, url);
            return Err(classify(self.config.is_retry_status(status), error, retry_after));
        }

        // errors while streaming the body are treated as transient
        self.stream_to_file(response, part, desc)
            .map_err(|error| AttemptError::Transient {
                error,
                retry_after: None,
            })
    }

    fn stream_to_file(&self, mut response: Response, part: &Path, desc: &str) -> Result<u64> {
        let total = response.content_length().unwrap_or(0);
        let bar = self.progress_bar(total, desc);

        let file = File::create(part)
            .with_context(|| format!("Failed to create {}", part.display()))?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; self.config.chunk_size.max(1)];
        let mut written = 0u64;
        loop {
            let n = response.read(&mut buffer).context("Connection interrupted")?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n])?;
            written += n as u64;
            bar.inc(n as u64);
        }
        writer.flush()?;
        bar.finish_and_clear();

        if total > 0 && written != total {
            return Err(anyhow!("Expected {} bytes, received {}", total, written));
        }
        Ok(written)
    }

    fn progress_bar(&self, total: u64, desc: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = if total > 0 {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{msg:>20} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            ) {
                bar.set_style(style.progress_chars("##-"));
            }
            bar
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_message(desc.to_string());
        self.progress.add(bar)
    }

    /// Download several files concurrently on a bounded pool
    ///
    /// Every file gets its own outcome; a failure does not cancel the others.
    pub fn download_all(&self, files: &[RemoteFile]) -> Result<Vec<DownloadOutcome>> {
        let workers = self.config.workers.clamp(1, files.len().max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("download-{}", i))
            .build()
            .context("Failed to build download pool")?;
        tracing::debug!("Downloading {} files on {} workers", files.len(), workers);

        Ok(pool.install(|| {
            files
                .par_iter()
                .map(|file| DownloadOutcome {
                    file: file.clone(),
                    result: self.download_file(&file.url, &file.dest, &file.desc),
                })
                .collect()
        }))
    }

    /// Download every file of a dataset into the configured data directory
    pub fn fetch_dataset(&self, dataset: Dataset) -> Result<Vec<PathBuf>> {
        let files = dataset.files(&self.config.data_dir);
        tracing::info!("Fetching {} ({} files)", dataset, files.len());

        let (paths, failures): (Vec<_>, Vec<_>) = self
            .download_all(&files)?
            .into_iter()
            .partition(|outcome| outcome.result.is_ok());

        if !failures.is_empty() {
            let details = failures
                .iter()
                .filter_map(|outcome| {
                    outcome
                        .result
                        .as_ref()
                        .err()
                        .map(|e| format!("  {}: {:#}", outcome.file.desc, e))
                })
                .join("\n");
            return Err(anyhow!(
                "{} of {} downloads failed for {}:\n{}",
                failures.len(),
                files.len(),
                dataset,
                details
            ));
        }

        Ok(paths
            .into_iter()
            .filter_map(|outcome| outcome.result.ok())
            .collect())
    }
}

fn classify(transient: bool, error: anyhow::Error, retry_after: Option<Duration>) -> AttemptError {
    if transient {
        AttemptError::Transient { error, retry_after }
    } else {
        AttemptError::Fatal(error)
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates fall back to the backoff schedule
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use strum::IntoEnumIterator;

    /// Bytes written to a client connection, each after a pause
    type Reply = Vec<(Vec<u8>, Duration)>;

    fn reply(status: &str, headers: &str, body: &[u8]) -> Reply {
        let mut bytes = format!(
            "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            headers,
            body.len()
        )
        .into_bytes();
        bytes.extend_from_slice(body);
        vec![(bytes, Duration::ZERO)]
    }

    /// 200 response whose body arrives one byte per `pause`
    fn trickle(body: &[u8], pause: Duration) -> Reply {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        std::iter::once((head.into_bytes(), Duration::ZERO))
            .chain(body.iter().map(|&b| (vec![b], pause)))
            .collect()
    }

    fn read_request(stream: &mut TcpStream) {
        let mut buffer = [0u8; 1024];
        let mut seen = Vec::new();
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(n) => seen.extend_from_slice(&buffer[..n]),
            }
        }
    }

    /// Serve one scripted reply per connection; returns the base URL and a request counter
    fn serve(replies: Vec<Reply>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for segments in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut stream);
                for (bytes, pause) in segments {
                    thread::sleep(pause);
                    if stream.write_all(&bytes).and_then(|_| stream.flush()).is_err() {
                        break;
                    }
                }
            }
        });
        (base, hits)
    }

    fn local_config(dir: &Path, retries: u32) -> FetchConfig {
        FetchConfig {
            retries,
            backoff_factor: 0.01,
            ..offline_config(dir)
        }
    }

    fn offline_config(dir: &Path) -> FetchConfig {
        FetchConfig {
            retries: 0,
            timeout_secs: 1,
            show_progress: false,
            data_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_schedule() {
        let config = FetchConfig::default();
        assert_eq!(config.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let config = FetchConfig::default();
        assert_eq!(
            config.retry_delay(1, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            config.retry_delay(1, Some(Duration::from_secs(86_400))),
            MAX_RETRY_AFTER
        );
        assert_eq!(config.retry_delay(2, None), config.backoff_delay(2));
    }

    #[test]
    fn test_dataset_selection() {
        assert_eq!(Dataset::parse("HCL", None).unwrap(), Dataset::Hcl);
        assert_eq!(
            Dataset::parse("kpmp", None).unwrap(),
            Dataset::Kpmp(KpmpKind::Sn)
        );
        assert_eq!(
            Dataset::parse("kpmp", Some("sc")).unwrap(),
            Dataset::Kpmp(KpmpKind::Sc)
        );

        let err = Dataset::parse("kpmp", Some("bulk")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid data_type: must be 'sn' or 'sc'.");
        assert!(Dataset::parse("tabula", None).is_err());
    }

    #[test]
    fn test_dataset_files() {
        let dir = Path::new("data");
        let hcl = Dataset::Hcl.files(dir);
        assert_eq!(hcl.len(), 1);
        assert_eq!(hcl[0].dest, PathBuf::from("data/hcl.h5ad"));

        for kind in KpmpKind::iter() {
            let files = Dataset::Kpmp(kind).files(dir);
            assert_eq!(files[0].dest, dir.join(format!("kpmp_{}.h5ad", kind.as_ref())));
        }

        let mca = Dataset::Mca.files(dir);
        let names: Vec<_> = mca.iter().map(|f| f.dest.clone()).collect();
        assert_eq!(
            names,
            vec![PathBuf::from("data/mca.h5ad"), PathBuf::from("data/mca_cell_info.csv")]
        );
    }

    #[test]
    fn test_existing_file_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("already.h5ad");
        fs::write(&dest, b"cached").unwrap();

        let fetcher = Fetcher::new(offline_config(dir.path())).unwrap();
        let path = fetcher
            .download_file("http://127.0.0.1:9/never-requested", &dest, "cached")
            .unwrap();
        assert_eq!(path, dest);
        assert_eq!(fs::read(&dest).unwrap(), b"cached");
    }

    #[test]
    fn test_partial_failure_is_reported_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("cached.csv");
        fs::write(&cached, b"x,y\n").unwrap();

        let files = vec![
            RemoteFile {
                url: "http://127.0.0.1:9/cached.csv".to_string(),
                dest: cached.clone(),
                desc: "cached".to_string(),
            },
            RemoteFile {
                url: "http://127.0.0.1:9/missing.h5ad".to_string(),
                dest: dir.path().join("sub/missing.h5ad"),
                desc: "missing".to_string(),
            },
        ];

        let fetcher = Fetcher::new(offline_config(dir.path())).unwrap();
        let outcomes = fetcher.download_all(&files).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].result.as_ref().unwrap(), &cached);
        assert!(outcomes[1].result.is_err());
        assert!(!dir.path().join("sub/missing.h5ad.part").exists());
        assert!(!dir.path().join("sub/missing.h5ad").exists());
    }

    #[test]
    fn test_retry_statuses_are_retried_until_success() {
        let dir = tempfile::tempdir().unwrap();
        let (base, hits) = serve(vec![
            reply("500 Internal Server Error", "", b""),
            reply("503 Service Unavailable", "Retry-After: 0\r\n", b""),
            reply("200 OK", "", b"payload"),
        ]);
        let dest = dir.path().join("atlas.h5ad");

        let fetcher = Fetcher::new(local_config(dir.path(), 3)).unwrap();
        let path = fetcher
            .download_file(&format!("{}/atlas.h5ad", base), &dest, "atlas")
            .unwrap();

        assert_eq!(path, dest);
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let (base, hits) = serve(vec![
            reply("404 Not Found", "", b""),
            reply("200 OK", "", b"payload"),
        ]);
        let dest = dir.path().join("missing.h5ad");

        let fetcher = Fetcher::new(local_config(dir.path(), 2)).unwrap();
        let err = fetcher
            .download_file(&format!("{}/missing.h5ad", base), &dest, "missing")
            .unwrap_err();

        assert!(format!("{:#}", err).contains("404"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn test_slow_body_outlasts_timeout_while_bytes_arrive() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"trickled";
        let (base, hits) = serve(vec![trickle(body, Duration::from_millis(250))]);
        let dest = dir.path().join("slow.h5ad");

        // timeout 1 s, total transfer about 2 s
        let fetcher = Fetcher::new(local_config(dir.path(), 0)).unwrap();
        let start = Instant::now();
        fetcher
            .download_file(&format!("{}/slow.h5ad", base), &dest, "slow")
            .unwrap();

        assert!(start.elapsed() > Duration::from_secs(1));
        assert_eq!(fs::read(&dest).unwrap(), body);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stalled_body_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = serve(vec![trickle(b"ab", Duration::from_secs(3))]);
        let dest = dir.path().join("stalled.h5ad");

        let fetcher = Fetcher::new(local_config(dir.path(), 0)).unwrap();
        let start = Instant::now();
        let result = fetcher.download_file(&format!("{}/stalled.h5ad", base), &dest, "stalled");

        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(3));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("data/hcl.h5ad")),
            PathBuf::from("data/hcl.h5ad.part")
        );
    }
}
