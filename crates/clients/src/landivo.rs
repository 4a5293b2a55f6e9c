//! REST client for the Landivo listing service (properties and buyers).

use async_trait::async_trait;
use mailivo_core::records::{Buyer, Property};
use mailivo_core::services::{BuyerSource, PropertyQuery, PropertySource, ServiceError};

use crate::error::ClientError;
use crate::http::{join, parse_optional, parse_response};

/// HTTP client for the Landivo API.
pub struct LandivoClient {
    client: reqwest::Client,
    base_url: String,
}

impl LandivoClient {
    /// * `base_url` - e.g. `https://api.landivo.com`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// `GET /property/{id}`; `None` on 404.
    pub async fn get_property(&self, id: &str) -> Result<Option<Property>, ClientError> {
        let response = self
            .client
            .get(join(&self.base_url, &format!("property/{id}")))
            .send()
            .await?;
        parse_optional(response).await
    }

    /// `GET /property?status=a,b`.
    pub async fn list_properties(&self, statuses: &[String]) -> Result<Vec<Property>, ClientError> {
        let mut request = self.client.get(join(&self.base_url, "property"));
        if !statuses.is_empty() {
            request = request.query(&[("status", statuses.join(","))]);
        }
        parse_response(request.send().await?).await
    }

    /// `GET /buyer/byProperty/{id}`.
    pub async fn buyers_for_property(&self, property_id: &str) -> Result<Vec<Buyer>, ClientError> {
        let response = self
            .client
            .get(join(&self.base_url, &format!("buyer/byProperty/{property_id}")))
            .send()
            .await?;
        parse_response(response).await
    }

    /// `GET /buyer/{id}`; `None` on 404.
    pub async fn get_buyer(&self, id: &str) -> Result<Option<Buyer>, ClientError> {
        let response = self
            .client
            .get(join(&self.base_url, &format!("buyer/{id}")))
            .send()
            .await?;
        parse_optional(response).await
    }
}

#[async_trait]
impl PropertySource for LandivoClient {
    async fn find(&self, query: &PropertyQuery) -> Result<Vec<Property>, ServiceError> {
        let mut properties = if query.ids.is_empty() {
            self.list_properties(&query.statuses).await?
        } else {
            let mut found = Vec::with_capacity(query.ids.len());
            for id in &query.ids {
                match self.get_property(id).await? {
                    Some(property) => found.push(property),
                    None => tracing::warn!(property_id = %id, "Property not found in Landivo"),
                }
            }
            found
        };

        if !query.statuses.is_empty() {
            properties.retain(|p| query.statuses.iter().any(|s| s.eq_ignore_ascii_case(&p.status)));
        }
        if let Some(limit) = query.limit {
            properties.truncate(limit);
        }
        Ok(properties)
    }
}

#[async_trait]
impl BuyerSource for LandivoClient {
    async fn find_by_property(&self, property_id: &str) -> Result<Vec<Buyer>, ServiceError> {
        Ok(self.buyers_for_property(property_id).await?)
    }

    async fn find_by_id(&self, buyer_id: &str) -> Result<Option<Buyer>, ServiceError> {
        Ok(self.get_buyer(buyer_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_http_client;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn find_by_ids_skips_missing_properties() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p1", "state": "TX", "status": "Available", "askingPrice": 30000
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/property/p2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = LandivoClient::new(server.uri());
        let found = client
            .find(&PropertyQuery::by_ids(vec!["p1".into(), "p2".into()]))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].state, "TX");
    }

    #[tokio::test]
    async fn find_by_status_sends_status_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property"))
            .and(query_param("status", "Available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "a", "status": "Available" },
                { "id": "b", "status": "Sold" }
            ])))
            .mount(&server)
            .await;

        let client = LandivoClient::new(server.uri());
        let found = client.find(&PropertyQuery::by_status("Available")).await.unwrap();
        let ids: Vec<_> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn buyers_for_property_are_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/buyer/byProperty/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "b1", "email": "one@example.com", "buyerType": "Investor" }
            ])))
            .mount(&server)
            .await;

        let client = LandivoClient::new(server.uri());
        let buyers = client.find_by_property("p1").await.unwrap();
        assert_eq!(buyers[0].buyer_type.as_deref(), Some("Investor"));
        assert!(buyers[0].subscribed);
    }

    #[tokio::test]
    async fn stalled_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let http = build_http_client(Duration::from_millis(100)).unwrap();
        let client = LandivoClient::with_client(http, server.uri());
        assert_matches!(client.find_by_property("p1").await, Err(ServiceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = LandivoClient::new(server.uri());
        assert_matches!(
            client.find_by_property("p1").await,
            Err(ServiceError::Unavailable(msg)) if msg.contains("502")
        );
    }
}
