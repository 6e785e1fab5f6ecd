//! Evergreen REST API client
//!
//! Requests are authenticated with the `Api-User` / `Api-Key` headers from the user's Evergreen
//! configuration. Transient failures are retried with exponential backoff and collection
//! endpoints are followed through their `Link: <...>; rel="next"` headers.

use super::models::{Manifest, Project, Task, Version};
use super::{CiBackend, EvergreenConfig, RevisionDescriptor, TaskResult};
use crate::Result;
use camino::Utf8PathBuf;
use core::time::Duration;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use layered::{Execute, Service, Stack};
use ohno::{EnrichableExt, IntoAppError, app_err, bail};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LINK, RETRY_AFTER};
use seatbelt::retry::{Backoff, Retry};
use seatbelt::timeout::Timeout;
use seatbelt::{RecoveryInfo, ResilienceContext};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tick::Clock;

const LOG_TARGET: &str = " evergreen";

/// Timeout applied to each individual request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum retry attempts (on top of the original request).
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Delay used for 429 responses that carry no `Retry-After` header.
const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

/// Requester of the versions produced by ordinary commits.
const COMMIT_REQUESTER: &str = "gitter_request";

/// Result of an Evergreen API call
pub enum ApiResult<T> {
    /// Request succeeded
    Success(T),

    /// The requested resource was not found (404)
    NotFound,

    /// Request failed after all retries
    Failed(ohno::AppError),
}

/// Evergreen API client
#[derive(Debug, Clone)]
#[expect(clippy::struct_field_names, reason = "client field stores the underlying HTTP client")]
pub struct Client {
    client: reqwest::Client,
    api_root: String,
    max_retry_attempts: u32,
    retry_base_delay: Duration,
}

impl Client {
    /// Create a client for the server and credentials of an Evergreen configuration.
    pub fn new(config: &EvergreenConfig) -> Result<Self> {
        Self::with_api_root(&config.api_server_host, Some((&config.user, &config.api_key)))
    }

    /// Create a client for an explicit server, optionally authenticated as `(user, api_key)`.
    pub fn with_api_root(api_root: &str, credentials: Option<(&str, &str)>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("git-co-evg-base");

        if let Some((user, api_key)) = credentials {
            let mut headers = HeaderMap::new();
            let _ = headers.insert(HeaderName::from_static("api-user"), HeaderValue::from_str(user)?);

            let mut key = HeaderValue::from_str(api_key)?;
            key.set_sensitive(true);
            let _ = headers.insert(HeaderName::from_static("api-key"), key);

            builder = builder.default_headers(headers);
        }

        Ok(Self {
            client: builder.build()?,
            api_root: api_root.trim_end_matches('/').to_string(),
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
            retry_base_delay: RETRY_BASE_DELAY,
        })
    }

    /// Replace the retry policy used for transient failures.
    #[must_use]
    pub const fn with_retry_policy(mut self, max_retry_attempts: u32, retry_base_delay: Duration) -> Self {
        self.max_retry_attempts = max_retry_attempts;
        self.retry_base_delay = retry_base_delay;
        self
    }

    #[must_use]
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn rest_url(&self, endpoint: &str) -> String {
        format!("{}/rest/v2{endpoint}", self.api_root)
    }

    /// Make an API call and classify the result
    pub async fn api_call(&self, url: &str) -> ApiResult<reqwest::Response> {
        let resp = match self.get_with_retry(url).await {
            Ok(r) => r,
            Err(e) => return ApiResult::Failed(e),
        };

        let status = resp.status();
        if status.is_success() {
            return ApiResult::Success(resp);
        }

        if status == StatusCode::NOT_FOUND {
            return ApiResult::NotFound;
        }

        match resp.error_for_status() {
            Err(e) => ApiResult::Failed(e.into()),
            Ok(resp) => ApiResult::Failed(app_err!("unexpected HTTP status {} from '{url}'", resp.status())),
        }
    }

    /// Send a GET with the client's retry policy and the per-request timeout.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let clock = Clock::new_tokio();
        let context = ResilienceContext::new(&clock).name("evergreen_get");

        let client = self.client.clone();
        let target = url.to_string();
        let service = (
            Retry::layer("retry", &context)
                .clone_input()
                .recovery_with(|result: &Result<reqwest::Response>, _| classify_for_retry(result))
                .max_retry_attempts(self.max_retry_attempts)
                .base_delay(self.retry_base_delay)
                .backoff(Backoff::Exponential)
                .on_retry(move |_output, args| {
                    log::debug!(
                        target: LOG_TARGET,
                        "Retrying GET '{target}' (attempt {}, delay {}ms)",
                        args.attempt().index() + 1,
                        args.retry_delay().as_millis(),
                    );
                }),
            Timeout::layer("timeout", &context)
                .timeout_error(|_| app_err!("HTTP request timed out"))
                .timeout(DEFAULT_REQUEST_TIMEOUT),
            Execute::new(move |url: String| {
                let client = client.clone();
                async move { client.get(&url).send().await.map_err(ohno::AppError::from) }
            }),
        )
            .into_service();

        service.execute(url.to_string()).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        match self.api_call(url).await {
            ApiResult::Success(resp) => match resp.json().await {
                Ok(value) => ApiResult::Success(value),
                Err(e) => ApiResult::Failed(ohno::AppError::from(e).enrich_with(|| format!("decoding response from '{url}'"))),
            },
            ApiResult::NotFound => ApiResult::NotFound,
            ApiResult::Failed(e) => ApiResult::Failed(e),
        }
    }

    /// Fetch one page of a collection endpoint along with the URL of the next page.
    async fn fetch_page<T: DeserializeOwned>(&self, url: &str) -> Result<(Vec<T>, Option<String>)> {
        let resp = match self.api_call(url).await {
            ApiResult::Success(resp) => resp,
            ApiResult::NotFound => bail!("'{url}' was not found"),
            ApiResult::Failed(e) => return Err(e.enrich_with(|| format!("fetching '{url}'"))),
        };

        let next = next_page_url(resp.headers());
        let items: Vec<T> = resp
            .json()
            .await
            .into_app_err_with(|| format!("decoding response from '{url}'"))?;

        // An empty page ends the collection regardless of what the headers claim
        if items.is_empty() {
            return Ok((items, None));
        }

        Ok((items, next))
    }

    /// Stream every item of a paginated collection, fetching pages on demand.
    fn paginate<'a, T>(&'a self, first_url: String) -> BoxStream<'a, Result<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        stream::try_unfold(Some(first_url), move |next_url| async move {
            let Some(url) = next_url else {
                return Ok::<_, ohno::AppError>(None);
            };

            log::debug!(target: LOG_TARGET, "Fetching page '{url}'");
            let (items, next) = self.fetch_page::<T>(&url).await?;
            Ok(Some((stream::iter(items.into_iter().map(Ok::<T, ohno::AppError>)), next)))
        })
        .try_flatten()
        .boxed()
    }

    /// Versions of a project created by commits, newest first.
    pub fn versions<'a>(&'a self, project: &str) -> BoxStream<'a, Result<Version>> {
        self.paginate(self.rest_url(&format!("/projects/{project}/versions?requester={COMMIT_REQUESTER}")))
    }

    /// All tasks of a build.
    pub async fn tasks_for_build(&self, build_id: &str) -> Result<Vec<Task>> {
        self.paginate(self.rest_url(&format!("/builds/{build_id}/tasks")))
            .try_collect()
            .await
    }

    /// The module manifest of a commit, or an empty manifest if Evergreen has none.
    pub async fn manifest(&self, project: &str, revision: &str) -> Result<Manifest> {
        let url = format!("{}/plugin/manifest/get/{project}/{revision}", self.api_root);
        match self.get_json(&url).await {
            ApiResult::Success(manifest) => Ok(manifest),
            ApiResult::NotFound => {
                log::debug!(target: LOG_TARGET, "No manifest for '{project}' at '{revision}'");
                Ok(Manifest::default())
            }
            ApiResult::Failed(e) => Err(e.enrich_with(|| format!("fetching the manifest of '{project}' at '{revision}'"))),
        }
    }

    /// Every project known to the server.
    pub fn projects(&self) -> BoxStream<'_, Result<Project>> {
        self.paginate(self.rest_url("/projects"))
    }

    /// The single project with the given identifier.
    pub async fn project(&self, identifier: &str) -> Result<Project> {
        let mut matches: Vec<Project> = self
            .projects()
            .try_filter(|project| core::future::ready(project.identifier == identifier))
            .try_collect()
            .await?;

        if matches.len() != 1 {
            bail!(
                "could not find unique project configuration for project '{identifier}' ({} candidates)",
                matches.len()
            );
        }

        matches.pop().into_app_err("project list unexpectedly empty")
    }
}

impl CiBackend for Client {
    fn revisions<'a>(&'a self, project: &'a str) -> BoxStream<'a, Result<RevisionDescriptor>> {
        self.versions(project).map_ok(RevisionDescriptor::from).boxed()
    }

    async fn build_tasks(&self, build_id: &str) -> Result<Vec<TaskResult>> {
        let tasks = self.tasks_for_build(build_id).await?;
        Ok(tasks.into_iter().map(TaskResult::from).collect())
    }

    async fn module_revisions(&self, project: &str, revision: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.manifest(project, revision).await?.module_revisions())
    }

    async fn project_config_path(&self, project: &str) -> Result<Utf8PathBuf> {
        let project = self.project(project).await?;
        if project.remote_path.is_empty() {
            bail!("project '{}' does not name a configuration file", project.identifier);
        }

        Ok(Utf8PathBuf::from(project.remote_path))
    }
}

/// Classify the outcome of a GET for the retry layer.
fn classify_for_retry(result: &Result<reqwest::Response>) -> RecoveryInfo {
    match result {
        // Network / connection errors are always transient.
        Err(_) => RecoveryInfo::retry(),

        Ok(resp) if resp.status().is_server_error() => RecoveryInfo::retry(),

        // Rate-limited (429), honor Retry-After if present.
        Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
            RecoveryInfo::retry().delay(parse_retry_after(resp.headers()).unwrap_or(DEFAULT_RATE_LIMIT_DELAY))
        }

        _ => RecoveryInfo::never(),
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get(RETRY_AFTER)?.to_str().ok()?.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#)
            .then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    })
}
