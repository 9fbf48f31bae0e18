use crate::api::{check_status, PagerDutyApi};
use crate::error::Result;
use crate::model::Incident;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "PagerDuty";
const PAGERDUTY_API_URL: &str = "https://api.pagerduty.com";
const PAGE_SIZE: usize = 100;

/// PagerDuty REST v2 client
pub struct PagerDutyClient {
    api_token: String,
    client: Client,
}

impl PagerDutyClient {
    pub fn new(api_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { api_token, client })
    }
}

#[async_trait]
impl PagerDutyApi for PagerDutyClient {
    async fn get_service_pages(
        &self,
        service_id: &str,
        start_inclusive: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Incident>> {
        let mut incidents = Vec::new();
        let mut offset = 0;
        loop {
            let response = self
                .client
                .get(format!("{}/incidents", PAGERDUTY_API_URL))
                .header("Authorization", format!("Token token={}", self.api_token))
                .header("Accept", "application/vnd.pagerduty+json;version=2")
                .query(&[
                    ("service_ids[]", service_id.to_string()),
                    ("since", start_inclusive.to_rfc3339()),
                    ("until", end_exclusive.to_rfc3339()),
                    ("limit", PAGE_SIZE.to_string()),
                    ("offset", offset.to_string()),
                ])
                .send()
                .await?;
            let page: IncidentPage = check_status(SERVICE, response).await?.json().await?;

            let fetched = page.incidents.len();
            offset += fetched;
            incidents.extend(
                page.incidents
                    .into_iter()
                    .filter(|raw| raw.created_at >= start_inclusive && raw.created_at < end_exclusive)
                    .map(RawIncident::into_incident),
            );
            if !page.more || fetched == 0 {
                break;
            }
        }
        Ok(incidents)
    }
}

#[derive(Debug, Deserialize)]
struct IncidentPage {
    #[serde(default)]
    incidents: Vec<RawIncident>,
    #[serde(default)]
    more: bool,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    id: String,
    incident_number: u64,
    title: String,
    html_url: String,
    status: String,
    urgency: Option<String>,
    created_at: DateTime<Utc>,
    service: Option<ServiceRef>,
}

#[derive(Debug, Deserialize)]
struct ServiceRef {
    summary: Option<String>,
}

impl RawIncident {
    fn into_incident(self) -> Incident {
        Incident {
            id: self.id,
            number: self.incident_number,
            title: self.title,
            url: self.html_url,
            service: self.service.and_then(|s| s.summary),
            status: self.status,
            urgency: self.urgency,
            created_at: self.created_at,
        }
    }
}
