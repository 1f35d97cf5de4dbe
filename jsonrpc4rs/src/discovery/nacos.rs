// nacos.rs
//
// Nacos REST discovery driver with ephemeral-instance heartbeating (spec
// §4.6), grounded on `original_source/discovery/nacos/{nacos,request}.go`.
// The original joins the healthy address list then slices off a leading
// comma (`[1:]`); spec §9 Open Questions calls this out as a leftover bug
// and directs emitting the joined list directly — done here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use super::Driver;
use crate::error::Result;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const HEARTBEAT_RETRY_MAX: u32 = 3;

#[derive(Clone)]
struct HeartbeatEntry {
    service_name: String,
    ip: String,
    port: u16,
    retry: u32,
}

struct Inner {
    heartbeat_list: Mutex<HashMap<String, HeartbeatEntry>>,
    heartbeat_started: AtomicBool,
}

pub struct Nacos {
    url: Url,
    client: reqwest::Client,
    inner: Arc<Inner>,
}

#[derive(Debug, Deserialize)]
struct InstanceListResponse {
    hosts: Vec<InstanceHost>,
}

#[derive(Debug, Deserialize)]
struct InstanceHost {
    ip: String,
    port: u16,
    healthy: bool,
}

impl Nacos {
    pub fn new(raw_url: &str) -> Result<Self> {
        let url = Url::parse(raw_url)?;
        Ok(Self {
            url,
            client: reqwest::Client::new(),
            inner: Arc::new(Inner {
                heartbeat_list: Mutex::new(HashMap::new()),
                heartbeat_started: AtomicBool::new(false),
            }),
        })
    }

    fn build_url(&self, path: &str, extra: &[(&str, String)]) -> Url {
        let mut url = self.url.clone();
        url.set_path(path);
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in self.url.query_pairs() {
                pairs.append_pair(&k, &v);
            }
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    fn spawn_heartbeat_if_needed(&self) {
        if self
            .inner
            .heartbeat_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let base = self.url.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                ticker.tick().await;
                let snapshot: Vec<(String, HeartbeatEntry)> = {
                    let list = inner.heartbeat_list.lock().await;
                    list.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                };
                for (key, entry) in snapshot {
                    let mut beat_url = base.clone();
                    beat_url.set_path("/nacos/v1/ns/instance/beat");
                    beat_url
                        .query_pairs_mut()
                        .append_pair("serviceName", &entry.service_name)
                        .append_pair("ip", &entry.ip)
                        .append_pair("port", &entry.port.to_string());
                    let ok = client
                        .put(beat_url)
                        .send()
                        .await
                        .map(|r| r.status().is_success())
                        .unwrap_or(false);
                    let mut list = inner.heartbeat_list.lock().await;
                    if ok {
                        if let Some(e) = list.get_mut(&key) {
                            e.retry = 0;
                        }
                    } else if let Some(e) = list.get_mut(&key) {
                        e.retry += 1;
                        if e.retry >= HEARTBEAT_RETRY_MAX {
                            list.remove(&key);
                        }
                    }
                }
            }
        });
    }
}

#[async_trait]
impl Driver for Nacos {
    async fn register(&self, name: &str, _protocol: &str, hostname: &str, port: u16) -> Result<()> {
        let instance_id = self
            .url
            .query_pairs()
            .find(|(k, _)| k == "instanceId")
            .map(|(_, v)| v.to_string());
        let service_name = match instance_id {
            Some(instance_id) if !instance_id.is_empty() => format!("{name}-{instance_id}:{port}"),
            _ => format!("{name}:{port}"),
        };
        let ephemeral = self
            .url
            .query_pairs()
            .find(|(k, _)| k == "ephemeral")
            .map(|(_, v)| v == "true")
            .unwrap_or(false);

        let url = self.build_url(
            "/nacos/v1/ns/instance",
            &[
                ("serviceName", service_name.clone()),
                ("ip", hostname.to_string()),
                ("port", port.to_string()),
                ("ephemeral", ephemeral.to_string()),
            ],
        );
        self.client.put(url).send().await?;

        if ephemeral {
            let key = format!("{service_name}:{hostname}:{port}");
            let mut list = self.inner.heartbeat_list.lock().await;
            list.insert(
                key,
                HeartbeatEntry {
                    service_name,
                    ip: hostname.to_string(),
                    port,
                    retry: 0,
                },
            );
            drop(list);
            self.spawn_heartbeat_if_needed();
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<String> {
        let url = self.build_url("/nacos/v1/ns/instance/list", &[("serviceName", name.to_string())]);
        let resp: InstanceListResponse = self.client.get(url).send().await?.json().await?;
        Ok(resp
            .hosts
            .into_iter()
            .filter(|h| h.healthy)
            .map(|h| format!("{}:{}", h.ip, h.port))
            .collect::<Vec<_>>()
            .join(","))
    }
}

#[cfg(test)]
mod nacos_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_filters_unhealthy_instances() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nacos/v1/ns/instance/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hosts": [
                    {"ip": "127.0.0.1", "port": 3612, "healthy": true},
                    {"ip": "127.0.0.1", "port": 3613, "healthy": false},
                ]
            })))
            .mount(&server)
            .await;

        let driver = Nacos::new(&server.uri()).unwrap();
        let addresses = driver.get("IntRpc").await.unwrap();
        assert_eq!(addresses, "127.0.0.1:3612");
    }

    #[tokio::test]
    async fn register_non_ephemeral_does_not_start_heartbeat() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/nacos/v1/ns/instance"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let driver = Nacos::new(&format!("{}?ephemeral=false", server.uri())).unwrap();
        driver.register("IntRpc", "tcp", "127.0.0.1", 3612).await.unwrap();
        assert!(!driver.inner.heartbeat_started.load(Ordering::SeqCst));
    }
}
