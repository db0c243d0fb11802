//! Page fetchers for the supported audit APIs
//!
//! Each fetcher turns one [`PageRequest`] into one [`Page`], mapping the
//! API's response body onto [`Record`]s. Throttling surfaces as
//! [`Error::RateLimited`] straight from the [`HttpClient`].

use super::client::HttpClient;
use crate::error::{Error, Result};
use crate::types::{format_millis, JsonObject, JsonValue, Page, Position, Record, Window};
use async_trait::async_trait;
use url::Url;

/// Path of the Jira audit records endpoint
pub const JIRA_AUDIT_PATH: &str = "/rest/api/3/auditing/record";

/// Parameters for fetching one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Time window being exported
    pub window: Window,
    /// Position of the requested page
    pub position: Position,
    /// Records per page. Sent as `limit` by offset-style fetchers; cursor
    /// APIs choose their own page size and ignore it.
    pub page_size: u32,
    /// Free-text filter passed to the API
    pub filter: String,
}

/// Capability: fetch one page of records
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page described by `request`
    async fn fetch(&self, request: &PageRequest) -> Result<Page>;
}

// ============================================================================
// Jira audit records (offset style)
// ============================================================================

/// Fetches `GET /rest/api/3/auditing/record` pages
#[derive(Debug, Clone)]
pub struct JiraAuditFetcher {
    client: HttpClient,
}

impl JiraAuditFetcher {
    /// Create a fetcher using `client`
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for JiraAuditFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        let mut query = vec![
            ("offset", request.position.offset().unwrap_or(0).to_string()),
            ("limit", request.page_size.to_string()),
            ("from", format_millis(&request.window.from)),
            ("to", format_millis(&request.window.to)),
        ];
        if !request.filter.is_empty() {
            query.push(("filter", request.filter.clone()));
        }

        let body = self.client.get_json(JIRA_AUDIT_PATH, &query).await?;

        let records = body
            .get("records")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| Error::decode("Response has no 'records' array"))?
            .iter()
            .map(|value| to_record(value, &["created"]))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(records))
    }
}

// ============================================================================
// Organization admin events (cursor style)
// ============================================================================

/// Fetches `GET /admin/v1/orgs/{org_id}/events` pages
///
/// The endpoint has no page-size parameter: the server decides how many
/// events each page holds, so [`PageRequest::page_size`] is not sent.
#[derive(Debug, Clone)]
pub struct AdminEventsFetcher {
    client: HttpClient,
    org_id: String,
}

impl AdminEventsFetcher {
    /// Create a fetcher for the given organization
    pub fn new(client: HttpClient, org_id: impl Into<String>) -> Self {
        Self {
            client,
            org_id: org_id.into(),
        }
    }

    fn path(&self) -> String {
        format!("/admin/v1/orgs/{}/events", self.org_id)
    }
}

#[async_trait]
impl PageFetcher for AdminEventsFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        let mut query = vec![
            ("from", request.window.from.timestamp_millis().to_string()),
            ("to", request.window.to.timestamp_millis().to_string()),
        ];
        if let Some(cursor) = request.position.cursor() {
            query.push(("cursor", cursor.to_string()));
        }
        if !request.filter.is_empty() {
            query.push(("q", request.filter.clone()));
        }

        let path = self.path();
        let body = self.client.get_json(&path, &query).await?;

        let records = body
            .get("data")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| Error::decode("Response has no 'data' array"))?
            .iter()
            .map(|value| to_record(value, &["attributes", "time"]))
            .collect::<Result<Vec<_>>>()?;

        let next_link = body
            .pointer("/links/next")
            .and_then(JsonValue::as_str)
            .filter(|link| !link.is_empty());

        let mut page = Page::new(records);
        if let Some(link) = next_link {
            page.next_cursor = Some(cursor_from_link(&self.client.build_url(&path), link)?);
        }
        Ok(page)
    }
}

/// Pull the `cursor` query parameter out of a next link.
///
/// Relative links are resolved against `base`.
pub fn cursor_from_link(base: &str, link: &str) -> Result<String> {
    let url = Url::parse(base)?.join(link)?;
    url.query_pairs()
        .find(|(key, _)| key == "cursor")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::decode(format!("Next link has no cursor: {link}")))
}

/// Map one JSON event onto a [`Record`].
///
/// `created_path` is the chain of keys leading to the creation timestamp. A
/// missing timestamp is kept as an empty string and dealt with downstream.
fn to_record(value: &JsonValue, created_path: &[&str]) -> Result<Record> {
    let object: &JsonObject = value
        .as_object()
        .ok_or_else(|| Error::decode(format!("Expected an event object, got: {value}")))?;

    let id = match object.get("id") {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => return Err(Error::decode(format!("Event has no id: {value}"))),
    };

    let created = created_path
        .iter()
        .try_fold(value, |current, key| current.get(key))
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();

    let mut attributes = object.clone();
    attributes.remove("id");
    if let [key] = created_path {
        attributes.remove(*key);
    }

    Ok(Record::new(id, created).with_attributes(attributes))
}
