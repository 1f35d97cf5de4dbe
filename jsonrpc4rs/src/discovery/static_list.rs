// static_list.rs
//
// The no-op discovery driver (spec §4.6 "Static"): constructed from a raw
// comma-separated address string; `register` is a no-op, `get` always
// returns the stored string.

use async_trait::async_trait;

use super::Driver;
use crate::error::Result;

pub struct StaticList {
    addresses: String,
}

impl StaticList {
    pub fn new(addresses: impl Into<String>) -> Self {
        Self {
            addresses: addresses.into(),
        }
    }
}

#[async_trait]
impl Driver for StaticList {
    async fn register(&self, _name: &str, _protocol: &str, _hostname: &str, _port: u16) -> Result<()> {
        Ok(())
    }

    async fn get(&self, _name: &str) -> Result<String> {
        Ok(self.addresses.clone())
    }
}

#[cfg(test)]
mod static_list_tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_the_configured_address_list() {
        let driver = StaticList::new("127.0.0.1:3612,127.0.0.1:3613");
        assert_eq!(driver.get("any").await.unwrap(), "127.0.0.1:3612,127.0.0.1:3613");
        driver.register("any", "tcp", "127.0.0.1", 3612).await.unwrap();
    }
}
