use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::types::{Authorization, DockTool, Person, Project};
use crate::api::Remote;
use crate::error::{BcqError, Result};

pub const DEFAULT_BASE_URL: &str = "https://3.basecampapi.com";
pub const DEFAULT_LAUNCHPAD_URL: &str = "https://launchpad.37signals.com";

const USER_AGENT: &str = concat!("bcq/", env!("CARGO_PKG_VERSION"));
const MAX_PAGES: usize = 100;

#[derive(Clone)]
pub struct BasecampClient {
    client: Client,
    base_url: String,
    launchpad_url: String,
    account_id: String,
    token: String,
}

impl BasecampClient {
    pub fn new(account_id: &str, token: &str) -> Self {
        Self::with_urls(DEFAULT_BASE_URL, DEFAULT_LAUNCHPAD_URL, account_id, token)
    }

    pub fn with_urls(base_url: &str, launchpad_url: &str, account_id: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            launchpad_url: launchpad_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            token: token.to_string(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn account_url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.account_id, path)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        debug!(url, "GET");
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        check_status(resp, url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get(url).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Follows `Link: <...>; rel="next"` until the last page.
    async fn get_paginated<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0;

        while let Some(url) = next.take() {
            let resp = self.get(&url).await?;
            next = next_page(resp.headers());
            let body = resp.text().await?;
            let mut page: Vec<T> = serde_json::from_str(&body)?;
            items.append(&mut page);

            pages += 1;
            if pages >= MAX_PAGES {
                debug!(url = %url, "pagination stopped at page limit");
                break;
            }
        }
        Ok(items)
    }
}

async fn check_status(resp: Response, url: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let message = resp.text().await.unwrap_or_default();

    Err(match status {
        StatusCode::UNAUTHORIZED => BcqError::Auth(if message.is_empty() {
            "access token rejected".into()
        } else {
            message
        }),
        StatusCode::NOT_FOUND => BcqError::not_found("Resource", url),
        StatusCode::TOO_MANY_REQUESTS => BcqError::RateLimited { retry_after },
        _ => BcqError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

fn next_page(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    parse_next_link(link)
}

fn parse_next_link(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(String::from)
    })
}

#[async_trait]
impl Remote for BasecampClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get_paginated(&self.account_url("/projects.json")).await
    }

    async fn list_people(&self) -> Result<Vec<Person>> {
        self.get_paginated(&self.account_url("/people.json")).await
    }

    async fn get_project_dock(&self, project_id: &str) -> Result<Vec<DockTool>> {
        let url = self.account_url(&format!("/projects/{}.json", project_id));
        match self.get_json::<Project>(&url).await {
            Ok(project) => Ok(project.dock),
            Err(e) if e.is_not_found() => Err(BcqError::not_found("Project", project_id)),
            Err(e) => Err(e),
        }
    }

    async fn authorization(&self) -> Result<Authorization> {
        let url = format!("{}/authorization.json", self.launchpad_url);
        self.get_json(&url).await
    }
}
