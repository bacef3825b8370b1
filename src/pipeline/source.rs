//! Video source handling: classify the user's input, fetch remote videos
//! into a temporary directory, and guarantee cleanup.
//!
//! ## Cleanup contract
//!
//! A downloaded video lives inside a [`tempfile::TempDir`] owned by the
//! [`ResolvedSource`]. Dropping the resolved source removes the directory
//! and everything in it, so every exit path (success, render failure, panic
//! unwind) reclaims the space without explicit bookkeeping. A failed
//! download never leaks either: the directory is created before the fetch
//! and dropped with the error.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::Vid2TextError;

/// yt-dlp format selector: prefer an mp4 the decoder can open directly.
const YTDLP_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Filename the downloader writes inside its temporary directory.
const DOWNLOAD_NAME: &str = "video.mp4";

/// Where the video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// A URL to download first.
    Remote {
        url: String,
        /// Browser whose cookies unlock the video, e.g. "firefox".
        auth_hint: Option<String>,
    },
    /// A file already on disk.
    Local(PathBuf),
}

impl VideoSource {
    /// Classify a raw input string. Anything that does not look like an
    /// http(s) URL is treated as a filesystem path.
    pub fn parse(input: &str, auth_hint: Option<String>) -> Self {
        if is_url(input) {
            VideoSource::Remote {
                url: input.to_string(),
                auth_hint,
            }
        } else {
            VideoSource::Local(PathBuf::from(input))
        }
    }
}

impl std::fmt::Display for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoSource::Remote { url, .. } => write!(f, "{url}"),
            VideoSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// True for inputs the pipeline should download rather than open.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// A source that is ready to decode.
#[derive(Debug)]
pub enum ResolvedSource {
    /// The caller's own file; never deleted.
    Local(PathBuf),
    /// A downloaded file; the directory is removed when this drops.
    Downloaded {
        path: PathBuf,
        _temp_dir: TempDir,
    },
}

impl ResolvedSource {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedSource::Local(path) => path,
            ResolvedSource::Downloaded { path, .. } => path,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, ResolvedSource::Downloaded { .. })
    }
}

/// A download failure, classified so the caller can suggest cookies when the
/// video wanted a login.
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct DownloadError {
    pub detail: String,
    pub auth_required: bool,
}

/// Fetches a remote video into `dest_dir`. Blocking; the pipeline runs it on
/// a blocking thread.
pub trait Downloader: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        auth_hint: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, DownloadError>;
}

/// Production downloader driving the `yt-dlp` binary.
#[derive(Debug, Clone, Default)]
pub struct YtDlpDownloader;

impl Downloader for YtDlpDownloader {
    fn fetch(
        &self,
        url: &str,
        auth_hint: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let target = dest_dir.join(DOWNLOAD_NAME);

        let mut command = Command::new("yt-dlp");
        command
            .stdin(Stdio::null())
            .args(["--no-playlist", "--quiet", "--no-warnings"])
            .args(["-f", YTDLP_FORMAT])
            .arg("-o")
            .arg(&target);
        if let Some(browser) = auth_hint {
            command.args(["--cookies-from-browser", browser]);
        }
        command.arg(url);

        debug!(url, cookies = auth_hint.is_some(), "starting download");
        let output = command.output().map_err(|e| DownloadError {
            detail: format!("failed to run yt-dlp: {e} (is yt-dlp installed?)"),
            auth_required: false,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => format!("yt-dlp exited with {}", output.status),
                tail => tail.to_string(),
            };
            return Err(DownloadError {
                auth_required: auth_failure(&detail),
                detail,
            });
        }

        if !target.exists() {
            return Err(DownloadError {
                detail: "yt-dlp reported success but produced no file".to_string(),
                auth_required: false,
            });
        }
        Ok(target)
    }
}

/// Heuristic over yt-dlp stderr for failures a login would fix.
fn auth_failure(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    [
        "sign in",
        "log in",
        "login",
        "cookies",
        "private video",
        "members-only",
        "authentication",
    ]
    .iter()
    .any(|needle| lowered.contains(needle))
}

/// Turn a [`VideoSource`] into a decodable file on disk.
///
/// Local paths are checked for existence and passed through untouched.
/// Remote URLs are fetched into a fresh temporary directory owned by the
/// returned value.
pub async fn resolve(
    source: &VideoSource,
    downloader: Arc<dyn Downloader>,
) -> Result<ResolvedSource, Vid2TextError> {
    match source {
        VideoSource::Local(path) => {
            if !path.exists() {
                return Err(Vid2TextError::SourceNotFound { path: path.clone() });
            }
            debug!(path = %path.display(), "using local video");
            Ok(ResolvedSource::Local(path.clone()))
        }
        VideoSource::Remote { url, auth_hint } => {
            let temp_dir = TempDir::new().map_err(|e| {
                Vid2TextError::Internal(format!("could not create temp directory: {e}"))
            })?;

            let dest = temp_dir.path().to_path_buf();
            let fetch_url = url.clone();
            let hint = auth_hint.clone();
            let fetched = tokio::task::spawn_blocking(move || {
                downloader.fetch(&fetch_url, hint.as_deref(), &dest)
            })
            .await
            .map_err(|e| Vid2TextError::Internal(format!("download task failed: {e}")))?;

            match fetched {
                Ok(path) => {
                    info!(url, path = %path.display(), "download complete");
                    Ok(ResolvedSource::Downloaded {
                        path,
                        _temp_dir: temp_dir,
                    })
                }
                // temp_dir drops here, removing any partial download.
                Err(e) => Err(Vid2TextError::SourceUnavailable {
                    url: url.clone(),
                    reason: e.detail,
                    auth_required: e.auth_required,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    struct StubDownloader;

    impl Downloader for StubDownloader {
        fn fetch(
            &self,
            _url: &str,
            _auth_hint: Option<&str>,
            dest_dir: &Path,
        ) -> Result<PathBuf, DownloadError> {
            let path = dest_dir.join(DOWNLOAD_NAME);
            fs::write(&path, b"fake video").unwrap();
            Ok(path)
        }
    }

    /// Writes a partial file, remembers where, then fails.
    struct AuthWallDownloader {
        seen_dir: Mutex<Option<PathBuf>>,
    }

    impl Downloader for AuthWallDownloader {
        fn fetch(
            &self,
            _url: &str,
            _auth_hint: Option<&str>,
            dest_dir: &Path,
        ) -> Result<PathBuf, DownloadError> {
            fs::write(dest_dir.join("partial.mp4"), b"truncated").unwrap();
            *self.seen_dir.lock().unwrap() = Some(dest_dir.to_path_buf());
            Err(DownloadError {
                detail: "Sign in to confirm your age".to_string(),
                auth_required: true,
            })
        }
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/v.mp4"));
        assert!(is_url("http://example.com/v"));
        assert!(!is_url("./videos/talk.mp4"));
        assert!(!is_url("C:\\videos\\talk.mp4"));
        assert!(!is_url("ftp://example.com/v.mp4"));
    }

    #[test]
    fn parse_classifies_input() {
        let remote = VideoSource::parse("https://example.com/v", Some("firefox".into()));
        assert_eq!(
            remote,
            VideoSource::Remote {
                url: "https://example.com/v".into(),
                auth_hint: Some("firefox".into()),
            }
        );
        let local = VideoSource::parse("talk.mp4", None);
        assert_eq!(local, VideoSource::Local(PathBuf::from("talk.mp4")));
    }

    #[test]
    fn auth_failures_recognised() {
        assert!(auth_failure("ERROR: Sign in to confirm your age"));
        assert!(auth_failure("This video is private video content"));
        assert!(auth_failure("use --cookies-from-browser to retry"));
        assert!(!auth_failure("HTTP Error 404: Not Found"));
        assert!(!auth_failure("network unreachable"));
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let source = VideoSource::Local(PathBuf::from("/definitely/not/here.mp4"));
        let err = resolve(&source, Arc::new(StubDownloader)).await.unwrap_err();
        assert!(matches!(err, Vid2TextError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn existing_local_file_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        fs::write(&video, b"data").unwrap();

        let source = VideoSource::Local(video.clone());
        let resolved = resolve(&source, Arc::new(StubDownloader)).await.unwrap();
        assert!(!resolved.is_downloaded());
        assert_eq!(resolved.path(), video.as_path());
        // Dropping a local resolution must not touch the caller's file.
        drop(resolved);
        assert!(video.exists());
    }

    #[tokio::test]
    async fn download_is_removed_on_drop() {
        let source = VideoSource::parse("https://example.com/v", None);
        let resolved = resolve(&source, Arc::new(StubDownloader)).await.unwrap();
        assert!(resolved.is_downloaded());
        let path = resolved.path().to_path_buf();
        assert!(path.exists());

        drop(resolved);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_download_cleans_partial_and_reports_auth() {
        let downloader = Arc::new(AuthWallDownloader {
            seen_dir: Mutex::new(None),
        });
        let source = VideoSource::parse("https://example.com/gated", None);

        let err = resolve(&source, downloader.clone()).await.unwrap_err();
        match err {
            Vid2TextError::SourceUnavailable { auth_required, .. } => assert!(auth_required),
            other => panic!("unexpected error: {other}"),
        }

        let seen = downloader.seen_dir.lock().unwrap().clone().unwrap();
        assert!(!seen.exists(), "partial download directory must be removed");
    }
}
