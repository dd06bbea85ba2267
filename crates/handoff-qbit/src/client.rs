//! Authenticated qBittorrent session implementing [`DownloadClient`].
//!
//! # Design
//! - One login per handle; the `SID` cookie is replayed on every request.
//! - HTTP 403 means the session was refused; other non-success statuses are
//!   request rejections.
//! - Bodies are read as bytes first so transport and decode failures stay distinct.

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use handoff_core::{
    AddOptions, ClientError, ClientResult, ContentHash, DownloadClient, JobSource, JobSummary,
    TrackerEntry, TrackerStatus, TransferInfo,
};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::settings::QbitSettings;
use crate::wire::{TorrentInfo, TrackerRow, TransferStats};

const OP_LOGIN: &str = "login";
const OP_ACTIVE: &str = "active_downloads";
const OP_TRANSFER: &str = "transfer_info";
const OP_SUBMIT: &str = "submit";
const OP_REANNOUNCE: &str = "reannounce";
const OP_TRACKERS: &str = "trackers";
const OP_DELETE: &str = "delete";

const SESSION_COOKIE: &str = "SID";
const REPLY_OK: &str = "Ok.";
const REPLY_FAILS: &str = "Fails.";
const DEFAULT_UPLOAD_NAME: &str = "upload.torrent";

/// Logged-in handle to one qBittorrent instance.
///
/// Cloning shares the underlying connection pool and session.
#[derive(Clone)]
pub struct QbitClient {
    settings: QbitSettings,
    http: Client,
    session: Option<String>,
}

impl QbitClient {
    /// Open a session against the configured web UI.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] when the credentials are refused and
    /// [`ClientError::Unreachable`] when the web UI cannot be contacted.
    pub async fn connect(settings: QbitSettings) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|err| transport_error(settings.name(), OP_LOGIN, err))?;

        let response = http
            .post(settings.api_url("auth/login"))
            .form(&[
                ("username", settings.username()),
                ("password", settings.password()),
            ])
            .send()
            .await
            .map_err(|err| transport_error(settings.name(), OP_LOGIN, err))?;
        let response = check_status(settings.name(), OP_LOGIN, response).await?;
        let session = session_cookie(&response);
        let body = read_text(settings.name(), OP_LOGIN, response).await?;

        if body.trim() == REPLY_FAILS {
            return Err(ClientError::Unauthorized {
                client: settings.name().to_string(),
                operation: OP_LOGIN,
            });
        }
        if body.trim() != REPLY_OK {
            return Err(ClientError::Rejected {
                client: settings.name().to_string(),
                operation: OP_LOGIN,
                status: StatusCode::OK.as_u16(),
                message: Some(body),
            });
        }

        info!(
            client = settings.name(),
            session = session.is_some(),
            "qBittorrent session established"
        );
        Ok(Self {
            settings,
            http,
            session,
        })
    }

    fn get(&self, method: &str) -> RequestBuilder {
        self.with_session(self.http.get(self.settings.api_url(method)))
    }

    fn post(&self, method: &str) -> RequestBuilder {
        self.with_session(self.http.post(self.settings.api_url(method)))
    }

    fn with_session(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(sid) => builder.header(COOKIE, format!("{SESSION_COOKIE}={sid}")),
            None => builder,
        }
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|err| transport_error(self.name(), operation, err))?;
        check_status(self.name(), operation, response).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> ClientResult<T> {
        let response = self.send(operation, builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport_error(self.name(), operation, err))?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode {
            client: self.name().to_string(),
            operation,
            source: Box::new(err),
        })
    }
}

impl Debug for QbitClient {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QbitClient")
            .field("settings", &self.settings)
            .field("session", &self.session.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DownloadClient for QbitClient {
    fn name(&self) -> &str {
        self.settings.name()
    }

    async fn active_downloads(&self) -> ClientResult<Vec<JobSummary>> {
        let rows: Vec<TorrentInfo> = self
            .fetch_json(
                OP_ACTIVE,
                self.get("torrents/info").query(&[("filter", "downloading")]),
            )
            .await?;
        let total = rows.len();
        let active: Vec<JobSummary> = rows
            .into_iter()
            .filter(TorrentInfo::is_transferring)
            .map(|row| JobSummary {
                hash: row.hash,
                name: row.name,
                state: row.state,
            })
            .collect();
        debug!(
            client = self.name(),
            listed = total,
            active = active.len(),
            "fetched active downloads"
        );
        Ok(active)
    }

    async fn transfer_info(&self) -> ClientResult<TransferInfo> {
        let stats: TransferStats = self.fetch_json(OP_TRANSFER, self.get("transfer/info")).await?;
        Ok(TransferInfo {
            download_bps: stats.dl_info_speed,
            upload_bps: stats.up_info_speed,
        })
    }

    async fn submit(
        &self,
        source: &JobSource,
        name_hint: Option<&str>,
        options: &AddOptions,
    ) -> ClientResult<()> {
        let mut form = match source {
            JobSource::Url { uri } => Form::new().text("urls", uri.clone()),
            JobSource::Metainfo { bytes } => {
                let file_name = name_hint.map_or_else(
                    || DEFAULT_UPLOAD_NAME.to_string(),
                    |hint| format!("{hint}.torrent"),
                );
                Form::new().part("torrents", Part::bytes(bytes.clone()).file_name(file_name))
            }
        };
        for (key, value) in options.iter() {
            form = form.text(key.to_string(), value.to_string());
        }

        let response = self
            .send(OP_SUBMIT, self.post("torrents/add").multipart(form))
            .await?;
        let body = read_text(self.name(), OP_SUBMIT, response).await?;
        if body.trim() == REPLY_FAILS {
            return Err(ClientError::Rejected {
                client: self.name().to_string(),
                operation: OP_SUBMIT,
                status: StatusCode::OK.as_u16(),
                message: Some(body),
            });
        }
        debug!(client = self.name(), options = options.len(), "job submitted");
        Ok(())
    }

    async fn reannounce(&self, hash: &ContentHash) -> ClientResult<()> {
        self.send(
            OP_REANNOUNCE,
            self.post("torrents/reannounce")
                .form(&[("hashes", hash.torrent_id())]),
        )
        .await
        .map(|_| ())
    }

    async fn trackers(&self, hash: &ContentHash) -> ClientResult<Vec<TrackerEntry>> {
        let rows: Vec<TrackerRow> = self
            .fetch_json(
                OP_TRACKERS,
                self.get("torrents/trackers").query(&[("hash", hash.torrent_id())]),
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                TrackerStatus::try_from(row.status)
                    .map(|status| TrackerEntry {
                        url: row.url,
                        status,
                        message: Some(row.msg).filter(|msg| !msg.is_empty()),
                    })
                    .map_err(|err| ClientError::Decode {
                        client: self.name().to_string(),
                        operation: OP_TRACKERS,
                        source: Box::new(err),
                    })
            })
            .collect()
    }

    async fn delete(&self, hash: &ContentHash, delete_payload: bool) -> ClientResult<()> {
        let delete_files = if delete_payload { "true" } else { "false" };
        self.send(
            OP_DELETE,
            self.post("torrents/delete")
                .form(&[("hashes", hash.torrent_id()), ("deleteFiles", delete_files)]),
        )
        .await
        .map(|_| ())
    }
}

fn transport_error(client: &str, operation: &'static str, err: reqwest::Error) -> ClientError {
    ClientError::Unreachable {
        client: client.to_string(),
        operation,
        source: Box::new(err),
    }
}

async fn check_status(
    client: &str,
    operation: &'static str,
    response: Response,
) -> ClientResult<Response> {
    let status = response.status();
    if status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized {
            client: client.to_string(),
            operation,
        });
    }
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.text().await {
        Ok(body) => Some(body.trim().to_string()).filter(|text| !text.is_empty()),
        Err(err) => {
            debug!(
                client,
                operation,
                status = status.as_u16(),
                error = %err,
                "failed to read rejection body"
            );
            None
        }
    };
    Err(ClientError::Rejected {
        client: client.to_string(),
        operation,
        status: status.as_u16(),
        message,
    })
}

async fn read_text(client: &str, operation: &'static str, response: Response) -> ClientResult<String> {
    response
        .text()
        .await
        .map_err(|err| transport_error(client, operation, err))
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim();
            let (name, value) = pair.split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}
