use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub mod oid;
pub mod v2c;
pub mod value;

#[cfg(test)]
pub mod mock;

pub use oid::{create_oid, last_component, normalize_oid};
pub use v2c::{SnmpClientV2c, with_default_port};
pub use value::{SnmpValue, Varbind};

/// Операции SNMP, которые нужны коллектору
#[async_trait]
pub trait SnmpApi: Send + Sync {
    /// Обходит всё поддерево `root_oid` (GETBULK до выхода за пределы поддерева)
    async fn bulk_walk_all(&self, root_oid: &str) -> Result<Vec<Varbind>>;

    /// Один пакетный GET по набору полностью заданных OID
    async fn get(&self, oids: &[String]) -> Result<Vec<Varbind>>;
}

pub async fn create_v2c_client(
    target: &str,
    community: &[u8],
    timeout: Duration,
    retries: u32,
) -> Result<SnmpClientV2c> {
    SnmpClientV2c::new(&with_default_port(target), community, timeout, retries).await
}
