// etcd.rs
//
// Etcd discovery driver via a hand-written slice of the etcd v3 gRPC API
// (spec §4.6), grounded on `original_source/discovery/etcd/etcd.go` and
// `discovery/etcd/etcdserverpb/lease_grpc.pb.go`. Generating the full
// `etcdserverpb` client via `tonic-build` needs a `.proto` compile step
// this crate cannot run, so the handful of request/response messages
// actually used (`KV.Put`, `KV.Range`, `Lease.LeaseGrant`,
// `Lease.LeaseKeepAlive`) are declared directly as `prost::Message`
// structs and invoked through `tonic::client::Grpc::unary`.
//
// The original registers every instance under one flat key (`name`),
// which only a single writer can ever occupy; this implementation keys
// each instance as `{name}/{uniqueId}` and ranges by prefix on `get`, so
// multiple server instances sharing a service name are all discoverable
// (see DESIGN.md).

use std::time::Duration;

use async_trait::async_trait;
use http::uri::PathAndQuery;
use serde::{Deserialize, Serialize};
use tonic::client::Grpc;
use tonic_prost::ProstCodec;
use tonic::transport::Channel;
use tonic::Request;

use super::Driver;
use crate::error::{Error, Result};

const LEASE_TTL_SECS: i64 = 10;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub lease: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyValue {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RangeRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub range_end: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RangeResponse {
    #[prost(message, repeated, tag = "2")]
    pub kvs: Vec<KeyValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseGrantRequest {
    #[prost(int64, tag = "1")]
    pub ttl: i64,
    #[prost(int64, tag = "2")]
    pub id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseGrantResponse {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(int64, tag = "2")]
    pub ttl: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseKeepAliveRequest {
    #[prost(int64, tag = "1")]
    pub id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseKeepAliveResponse {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(int64, tag = "2")]
    pub ttl: i64,
}

#[derive(Serialize, Deserialize)]
struct RegisteredService {
    unique_id: String,
    name: String,
    addr: String,
}

async fn unary<Req, Resp>(grpc: &mut Grpc<Channel>, path: &'static str, req: Req) -> Result<Resp>
where
    Req: prost::Message + 'static,
    Resp: prost::Message + Default + 'static,
{
    grpc.ready().await.map_err(|e| Error::Discovery(e.to_string()))?;
    let path = PathAndQuery::from_static(path);
    let resp = grpc
        .unary(Request::new(req), path, ProstCodec::default())
        .await?;
    Ok(resp.into_inner())
}

pub struct Etcd {
    channel: Channel,
}

impl Etcd {
    pub fn new(endpoint: &str) -> Result<Self> {
        let channel = Channel::from_shared(format!("http://{endpoint}"))
            .map_err(|e| Error::Discovery(e.to_string()))?
            .connect_lazy();
        Ok(Self { channel })
    }

    fn kv_client(&self) -> Grpc<Channel> {
        Grpc::new(self.channel.clone())
    }

    fn lease_client(&self) -> Grpc<Channel> {
        Grpc::new(self.channel.clone())
    }
}

#[async_trait]
impl Driver for Etcd {
    async fn register(&self, name: &str, _protocol: &str, hostname: &str, port: u16) -> Result<()> {
        let mut lease = self.lease_client();
        let grant: LeaseGrantResponse = unary(
            &mut lease,
            "/etcdserverpb.Lease/LeaseGrant",
            LeaseGrantRequest {
                ttl: LEASE_TTL_SECS,
                id: 0,
            },
        )
        .await?;

        let unique_id = uuid::Uuid::new_v4().to_string();
        let key = format!("{name}/{unique_id}");
        let value = serde_json::to_vec(&RegisteredService {
            unique_id: unique_id.clone(),
            name: name.to_string(),
            addr: format!("{hostname}:{port}"),
        })?;

        let mut kv = self.kv_client();
        let _: PutResponse = unary(
            &mut kv,
            "/etcdserverpb.KV/Put",
            PutRequest {
                key: key.into_bytes(),
                value,
                lease: grant.id,
            },
        )
        .await?;

        let mut heartbeat_lease = self.lease_client();
        let lease_id = grant.id;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                ticker.tick().await;
                let result: Result<LeaseKeepAliveResponse> = unary(
                    &mut heartbeat_lease,
                    "/etcdserverpb.Lease/LeaseKeepAlive",
                    LeaseKeepAliveRequest { id: lease_id },
                )
                .await;
                if let Err(e) = result {
                    tracing::warn!("etcd lease keep-alive failed for {}: {}", lease_id, e);
                }
            }
        });
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<String> {
        let mut kv = self.kv_client();
        let prefix = format!("{name}/");
        let mut range_end = prefix.clone().into_bytes();
        if let Some(last) = range_end.last_mut() {
            *last += 1;
        }
        let resp: RangeResponse = unary(
            &mut kv,
            "/etcdserverpb.KV/Range",
            RangeRequest {
                key: prefix.into_bytes(),
                range_end,
            },
        )
        .await?;

        let mut addresses = Vec::with_capacity(resp.kvs.len());
        for kv in resp.kvs {
            let service: RegisteredService = serde_json::from_slice(&kv.value)?;
            addresses.push(service.addr);
        }
        Ok(addresses.join(","))
    }
}

#[cfg(test)]
mod etcd_tests {
    use super::*;

    #[test]
    fn registered_service_round_trips_through_json() {
        let service = RegisteredService {
            unique_id: "abc".to_string(),
            name: "IntRpc".to_string(),
            addr: "127.0.0.1:3612".to_string(),
        };
        let bytes = serde_json::to_vec(&service).unwrap();
        let decoded: RegisteredService = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.addr, "127.0.0.1:3612");
    }

    #[test]
    fn prefix_range_end_increments_last_byte() {
        let prefix = "IntRpc/".to_string();
        let mut range_end = prefix.clone().into_bytes();
        *range_end.last_mut().unwrap() += 1;
        assert_eq!(range_end, b"IntRpc0".to_vec());
    }
}
