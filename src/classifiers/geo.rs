//! ip-api.com geolocation client.
//!
//! Input is the submitting client's IP address, not the complaint text.
//! Addresses that cannot be located publicly are refused before any request.

use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Classifier, decode_json, http_client, transport_error};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;

const NAME: &str = "geo";

/// Coarse origin of a complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub ip: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    region_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    query: Option<String>,
}

pub struct IpApiLocator {
    client: reqwest::Client,
    base_url: String,
}

impl IpApiLocator {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: http_client(NAME, config.timeout)?,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

/// Why `ip` cannot be geolocated, or `None` if it is a public address.
pub fn unroutable_reason(ip: &str) -> Option<&'static str> {
    if ip.eq_ignore_ascii_case("localhost") {
        return Some("localhost");
    }
    let addr = match ip.parse::<IpAddr>() {
        Ok(addr) => addr.to_canonical(),
        Err(_) => return Some("not an IP address"),
    };
    match addr {
        addr if addr.is_loopback() => Some("loopback address"),
        addr if addr.is_unspecified() => Some("unspecified address"),
        IpAddr::V4(v4) if v4.is_private() || v4.is_link_local() => Some("private address"),
        IpAddr::V6(v6) if v6.is_unique_local() || v6.is_unicast_link_local() => {
            Some("private address")
        }
        _ => None,
    }
}

#[async_trait]
impl Classifier for IpApiLocator {
    type Output = GeoLocation;

    fn name(&self) -> &str {
        NAME
    }

    async fn classify(&self, input: &str) -> Result<GeoLocation, ClassifierError> {
        let ip = input.trim();
        if let Some(reason) = unroutable_reason(ip) {
            return Err(ClassifierError::Skipped {
                classifier: NAME.into(),
                reason: format!("{ip}: {reason}"),
            });
        }

        let response = self
            .client
            .get(format!("{}/{ip}", self.base_url))
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        let body: IpApiResponse = decode_json(NAME, response).await?;
        if body.status != "success" {
            return Err(ClassifierError::InvalidResponse {
                classifier: NAME.into(),
                reason: format!(
                    "lookup status '{}': {}",
                    body.status,
                    body.message.as_deref().unwrap_or("no message")
                ),
            });
        }

        Ok(GeoLocation {
            country: body.country,
            region: body.region_name,
            city: body.city,
            ip: body.query.unwrap_or_else(|| ip.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn locator_for(server: &MockServer) -> IpApiLocator {
        IpApiLocator::new(&ClassifierConfig {
            url: format!("{}/json/", server.uri()),
            api_key: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn local_addresses_are_unroutable() {
        assert_eq!(unroutable_reason("127.0.0.1"), Some("loopback address"));
        assert_eq!(unroutable_reason("::1"), Some("loopback address"));
        assert_eq!(unroutable_reason("localhost"), Some("localhost"));
        assert_eq!(unroutable_reason("10.1.2.3"), Some("private address"));
        assert_eq!(unroutable_reason("0.0.0.0"), Some("unspecified address"));
        assert_eq!(unroutable_reason("garbage"), Some("not an IP address"));
        assert_eq!(unroutable_reason("8.8.8.8"), None);
    }

    #[test]
    fn private_ipv6_addresses_are_unroutable() {
        assert_eq!(unroutable_reason("fd12:3456:789a::1"), Some("private address"));
        assert_eq!(unroutable_reason("fc00::1"), Some("private address"));
        assert_eq!(unroutable_reason("fe80::1ff:fe23:4567:890a"), Some("private address"));
        assert_eq!(unroutable_reason("::ffff:192.168.1.10"), Some("private address"));
        assert_eq!(unroutable_reason("::ffff:127.0.0.1"), Some("loopback address"));
        assert_eq!(unroutable_reason("::"), Some("unspecified address"));
        assert_eq!(unroutable_reason("2001:4860:4860::8888"), None);
    }

    #[tokio::test]
    async fn locates_public_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/8.8.8.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "country": "United States",
                "regionName": "Virginia",
                "city": "Ashburn",
                "query": "8.8.8.8",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let geo = locator_for(&server).classify("8.8.8.8").await.unwrap();
        assert_eq!(geo.country.as_deref(), Some("United States"));
        assert_eq!(geo.region.as_deref(), Some("Virginia"));
        assert_eq!(geo.city.as_deref(), Some("Ashburn"));
        assert_eq!(geo.ip, "8.8.8.8");
    }

    #[tokio::test]
    async fn failed_lookup_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "message": "reserved range",
                "query": "100.64.0.1",
            })))
            .mount(&server)
            .await;

        let err = locator_for(&server).classify("100.64.0.1").await.unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn loopback_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = locator_for(&server).classify("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Skipped { .. }));
    }
}
