// consul.rs
//
// Consul REST discovery driver (spec §4.6), grounded on
// `original_source/discovery/consul/{consul,agent,status_code,request}.go`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::Driver;
use crate::error::{Error, Result};

const STATUS_CODE_PASSING: u16 = 200;

fn status_message(code: u16) -> &'static str {
    match code {
        200 => "All health checks of every matching service instance are passing",
        400 => "Bad parameter (missing service name of id)",
        404 => "No such service id or name",
        429 => "Some health checks are passing, at least one is warning",
        503 => "At least one of the health checks is critical",
        _ => "Unknown Consul status code",
    }
}

#[derive(Debug, Serialize)]
struct RegisterService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Address")]
    address: String,
}

#[derive(Debug, Serialize)]
struct Check {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "ServiceID")]
    service_id: String,
    #[serde(rename = "HTTP", skip_serializing_if = "Option::is_none")]
    http: Option<String>,
    #[serde(rename = "TCP", skip_serializing_if = "Option::is_none")]
    tcp: Option<String>,
    #[serde(rename = "Interval")]
    interval: String,
    #[serde(rename = "Timeout")]
    timeout: String,
}

#[derive(Debug, Deserialize)]
struct ConsulService {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Address")]
    address: String,
}

#[derive(Debug, Deserialize)]
struct HealthService {
    #[serde(rename = "Service")]
    service: ConsulService,
}

pub struct Consul {
    url: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl Consul {
    pub fn new(raw_url: &str) -> Result<Self> {
        let url = Url::parse(raw_url)?;
        let token = url
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.to_string());
        Ok(Self {
            url,
            token,
            client: reqwest::Client::new(),
        })
    }

    fn build_url(&self, path: &str) -> Url {
        let mut url = self.url.clone();
        url.set_path(path);
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        url
    }

    fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[async_trait]
impl Driver for Consul {
    async fn register(&self, name: &str, protocol: &str, hostname: &str, port: u16) -> Result<()> {
        let instance_id = self.query("instanceId");
        let id = match instance_id {
            Some(instance_id) if !instance_id.is_empty() => format!("{name}-{instance_id}:{port}"),
            _ => format!("{name}:{port}"),
        };
        let service = RegisterService {
            id: id.clone(),
            name: name.to_string(),
            port,
            address: hostname.to_string(),
        };
        let resp = self
            .client
            .put(self.build_url("/v1/agent/service/register"))
            .json(&service)
            .send()
            .await?;
        if resp.status().as_u16() != STATUS_CODE_PASSING {
            return Err(Error::Discovery(status_message(resp.status().as_u16()).to_string()));
        }

        if self.query("check").as_deref() == Some("true") {
            let interval = self.query("interval").unwrap_or_else(|| "30s".to_string());
            let timeout = self.query("timeout").unwrap_or_else(|| "10s".to_string());
            let (http, tcp) = match protocol {
                "http" | "https" => (Some(format!("{protocol}://{hostname}:{port}")), None),
                "tcp" => (None, Some(format!("{hostname}:{port}"))),
                _ => (None, None),
            };
            let check = Check {
                id: id.clone(),
                name: name.to_string(),
                status: "passing".to_string(),
                service_id: id,
                http,
                tcp,
                interval,
                timeout,
            };
            let resp = self
                .client
                .put(self.build_url("/v1/agent/check/register"))
                .json(&check)
                .send()
                .await?;
            if resp.status().as_u16() != STATUS_CODE_PASSING {
                return Err(Error::Discovery(status_message(resp.status().as_u16()).to_string()));
            }
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<String> {
        let resp = self
            .client
            .get(self.build_url(&format!("/v1/agent/health/service/name/{name}")))
            .send()
            .await?;
        if resp.status().as_u16() != STATUS_CODE_PASSING {
            return Err(Error::Discovery(status_message(resp.status().as_u16()).to_string()));
        }
        let services: Vec<HealthService> = resp.json().await?;
        Ok(services
            .into_iter()
            .map(|s| format!("{}:{}", s.service.address, s.service.port))
            .collect::<Vec<_>>()
            .join(","))
    }
}

#[cfg(test)]
mod consul_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn register_puts_service_document() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let driver = Consul::new(&server.uri()).unwrap();
        driver.register("IntRpc", "tcp", "127.0.0.1", 3612).await.unwrap();
    }

    #[tokio::test]
    async fn get_joins_healthy_instances() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/health/service/name/IntRpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"Service": {"Service": "IntRpc", "Port": 3612, "Address": "127.0.0.1"}},
                {"Service": {"Service": "IntRpc", "Port": 3613, "Address": "127.0.0.1"}},
            ])))
            .mount(&server)
            .await;

        let driver = Consul::new(&server.uri()).unwrap();
        let addresses = driver.get("IntRpc").await.unwrap();
        assert_eq!(addresses, "127.0.0.1:3612,127.0.0.1:3613");
    }

    #[tokio::test]
    async fn non_passing_status_maps_to_fixed_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/health/service/name/Missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let driver = Consul::new(&server.uri()).unwrap();
        let err = driver.get("Missing").await.unwrap_err();
        assert!(matches!(err, Error::Discovery(ref m) if m == "No such service id or name"));
    }
}
