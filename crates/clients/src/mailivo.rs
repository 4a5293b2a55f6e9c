//! REST client for the Mailivo campaign API (campaigns and templates).

use async_trait::async_trait;
use mailivo_core::campaign::{CreatedCampaign, MultiCampaignPayload, SingleCampaignPayload};
use mailivo_core::records::EmailTemplate;
use mailivo_core::services::{CampaignService, ServiceError, TemplateSource};
use serde::Serialize;

use crate::error::ClientError;
use crate::http::{join, parse_optional, parse_response};

/// HTTP client for the Mailivo campaign API.
pub struct MailivoApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl MailivoApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_campaign<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<CreatedCampaign, ClientError> {
        let request = self.client.post(join(&self.base_url, path)).json(payload);
        let response = self.authorize(request).send().await?;
        parse_response(response).await
    }

    /// `POST /api/campaigns`.
    pub async fn create_single(&self, payload: &SingleCampaignPayload) -> Result<CreatedCampaign, ClientError> {
        self.post_campaign("api/campaigns", payload).await
    }

    /// `POST /api/campaigns/multi-property`.
    pub async fn create_multi(&self, payload: &MultiCampaignPayload) -> Result<CreatedCampaign, ClientError> {
        self.post_campaign("api/campaigns/multi-property", payload).await
    }

    /// `GET /api/templates/{id}`; `None` on 404.
    pub async fn get_template(&self, id: &str) -> Result<Option<EmailTemplate>, ClientError> {
        let request = self.client.get(join(&self.base_url, &format!("api/templates/{id}")));
        let response = self.authorize(request).send().await?;
        parse_optional(response).await
    }
}

#[async_trait]
impl CampaignService for MailivoApiClient {
    async fn create_campaign(&self, payload: &SingleCampaignPayload) -> Result<CreatedCampaign, ServiceError> {
        let created = self.create_single(payload).await?;
        tracing::info!(campaign_id = %created.id, property_id = %payload.property_id, "Campaign created");
        Ok(created)
    }

    async fn create_multi_property_campaign(
        &self,
        payload: &MultiCampaignPayload,
    ) -> Result<CreatedCampaign, ServiceError> {
        let created = self.create_multi(payload).await?;
        tracing::info!(
            campaign_id = %created.id,
            property_count = payload.property_ids.len(),
            "Multi-property campaign created"
        );
        Ok(created)
    }
}

#[async_trait]
impl TemplateSource for MailivoApiClient {
    async fn find_template(&self, template_id: &str) -> Result<Option<EmailTemplate>, ServiceError> {
        Ok(self.get_template(template_id).await?)
    }
}
