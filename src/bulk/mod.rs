//! Bulk event archive retrieval
//!
//! Lists the bulk artifacts published for a series, downloads the events
//! archive, and decodes its JSONL members into envelopes. Decoding is
//! best-effort: malformed lines are skipped, an oversized line abandons the
//! member it was found in but not its siblings.

use std::io::{BufReader, Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::client::config::{END_STATE_CACHE_TTL, EVENTS_CACHE_TTL, MAX_RETRIES};
use crate::client::{retry, ApiClient, ClientError, ClientResult};
use crate::reconstruct::{reconstruct, Reconstruction};
use crate::{EventEnvelope, FileDescriptor, SeriesState};

pub mod scanner;

use scanner::LineScanner;

/// Artifact identifiers carrying the events feed, in preference order.
const EVENT_ARTIFACT_IDS: [&str; 2] = ["events-grid", "events-grid-compressed"];

/// Artifact identifier carrying the end-of-series state file.
const STATE_ARTIFACT_ID: &str = "state-grid";

/// Artifact readiness status required for download.
const STATUS_READY: &str = "ready";

/// Decoded contents of a bulk events archive.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct EventDownload {
    /// Envelopes in arrival order across all archive members
    pub envelopes: Vec<EventEnvelope>,
    /// First fatal member error encountered, if any; when set, one or more
    /// members were abandoned part-way and the download is incomplete
    #[serde(skip)]
    pub fatal: Option<ClientError>,
}

#[derive(serde::Deserialize)]
struct FileListing {
    #[serde(default)]
    files: Vec<FileDescriptor>,
}

/// Decode a ZIP archive of JSONL members into envelopes.
///
/// Members are processed in archive order, selected by the `.jsonl` suffix.
/// Blank lines and lines that fail to decode are skipped. A line over the
/// scanner cap terminates its member and is surfaced via
/// [`EventDownload::fatal`]; remaining members are still processed.
pub fn parse_event_archive(data: &[u8]) -> ClientResult<EventDownload> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| ClientError::Archive(format!("open archive: {e}")))?;

    let mut envelopes = Vec::new();
    let mut fatal: Option<ClientError> = None;

    for index in 0..archive.len() {
        let member = archive
            .by_index(index)
            .map_err(|e| ClientError::Archive(format!("read archive member: {e}")))?;
        let name = member.name().to_string();
        if !name.ends_with(".jsonl") {
            debug!(member = %name, "skipping non-JSONL archive member");
            continue;
        }

        if let Err(error) = scan_member(member, &name, &mut envelopes) {
            warn!(member = %name, error = %error, "abandoning archive member");
            fatal.get_or_insert(error);
        }
    }

    Ok(EventDownload { envelopes, fatal })
}

fn scan_member<R: Read>(
    member: R,
    name: &str,
    envelopes: &mut Vec<EventEnvelope>,
) -> ClientResult<()> {
    let mut scanner = LineScanner::new(BufReader::new(member));
    let mut decoded = 0usize;
    let mut skipped = 0usize;

    while let Some(line) = scanner.next_line()? {
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice::<EventEnvelope>(line) {
            Ok(envelope) => {
                envelopes.push(envelope);
                decoded += 1;
            }
            Err(error) => {
                debug!(member = %name, error = %error, "skipping undecodable line");
                skipped += 1;
            }
        }
    }

    debug!(member = %name, decoded, skipped, "scanned archive member");
    Ok(())
}

impl ApiClient {
    /// List the bulk artifacts published for a series.
    pub async fn list_files(&self, series_id: &str) -> ClientResult<Vec<FileDescriptor>> {
        let url = format!(
            "{}/file-download/list/{series_id}",
            self.config().file_download_url
        );

        let listing: FileListing = retry::run(self.shutdown(), MAX_RETRIES, || async {
            let body = self.fetch_file_url(&url).await?;
            serde_json::from_slice(&body)
                .map_err(|e| ClientError::Parse(format!("decode file listing: {e}")))
        })
        .await?;

        Ok(listing.files)
    }

    /// Download and decode the events archive for a series.
    ///
    /// Only fully-decoded downloads are cached; a download with a fatal member
    /// error is returned but never written back.
    pub async fn download_events(&self, series_id: &str) -> ClientResult<EventDownload> {
        let cache_key = format!("events:{series_id}");
        if let Some(envelopes) = self.get_cached::<Vec<EventEnvelope>>(&cache_key).await {
            return Ok(EventDownload {
                envelopes,
                fatal: None,
            });
        }

        let files = self.list_files(series_id).await?;
        let descriptor = select_events_artifact(&files).ok_or_else(|| {
            ClientError::FileUnavailable(format!("no ready events artifact for series {series_id}"))
        })?;

        debug!(series_id, artifact = %descriptor.id, "downloading events archive");

        let body = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.fetch_file_url(&descriptor.full_url)
        })
        .await?;

        let download = parse_event_archive(&body)?;
        if download.fatal.is_none() {
            self.set_cache(&cache_key, &download.envelopes, EVENTS_CACHE_TTL)
                .await;
        }
        Ok(download)
    }

    /// Download the events archive and reconstruct its typed event stream.
    pub async fn download_and_reconstruct(
        &self,
        series_id: &str,
    ) -> ClientResult<Reconstruction> {
        let download = self.download_events(series_id).await?;
        Ok(reconstruct(&download.envelopes))
    }

    /// Download the end-of-series state file: a single JSON snapshot of the
    /// final series state, published as its own artifact once the series
    /// concludes.
    pub async fn download_end_state(&self, series_id: &str) -> ClientResult<SeriesState> {
        let cache_key = format!("endstate:{series_id}");
        if let Some(state) = self.get_cached::<SeriesState>(&cache_key).await {
            return Ok(state);
        }

        let files = self.list_files(series_id).await?;
        let descriptor = select_ready(&files, STATE_ARTIFACT_ID).ok_or_else(|| {
            ClientError::FileUnavailable(format!(
                "no ready end-state artifact for series {series_id}"
            ))
        })?;

        debug!(series_id, artifact = %descriptor.id, "downloading end state");

        let body = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.fetch_file_url(&descriptor.full_url)
        })
        .await?;

        let state: SeriesState = serde_json::from_slice(&body)
            .map_err(|e| ClientError::Parse(format!("decode end state: {e}")))?;

        self.set_cache(&cache_key, &state, END_STATE_CACHE_TTL).await;
        Ok(state)
    }
}

/// Pick the events artifact to download: preferred identifiers in order,
/// ready status required.
fn select_events_artifact(files: &[FileDescriptor]) -> Option<&FileDescriptor> {
    EVENT_ARTIFACT_IDS
        .iter()
        .find_map(|id| select_ready(files, id))
}

fn select_ready<'a>(files: &'a [FileDescriptor], id: &str) -> Option<&'a FileDescriptor> {
    files.iter().find(|f| f.id == id && f.status == STATUS_READY)
}
