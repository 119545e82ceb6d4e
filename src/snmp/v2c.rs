use anyhow::{Context, Result};
use async_trait::async_trait;
use snmp2::{AsyncSession, Oid, Pdu};
use tokio::sync::Mutex;
use tokio::time::{Duration, timeout};

use super::SnmpApi;
use super::oid::parse_oid;
use super::value::{SnmpValue, Varbind};

const MAX_REPETITIONS: u32 = 10;

/// SNMPv2c клиент с таймаутом и ограниченным числом повторов.
///
/// Сессия под мьютексом: сбор и запись работают из разных задач,
/// а `AsyncSession` требует `&mut self`.
pub struct SnmpClientV2c {
    session: Mutex<AsyncSession>,
    timeout: Duration,
    retries: u32,
}

impl SnmpClientV2c {
    pub async fn new(target: &str, community: &[u8], timeout: Duration, retries: u32) -> Result<Self> {
        let session = AsyncSession::new_v2c(target, community, 2)
            .await
            .context("Не удалось создать SNMP сессию")?;

        Ok(Self {
            session: Mutex::new(session),
            timeout,
            retries,
        })
    }

    async fn get_many(&self, oids: &[Oid<'static>]) -> Result<Vec<Varbind>> {
        let refs: Vec<&Oid<'_>> = oids.iter().collect();
        let mut session = self.session.lock().await;
        let mut last_error = None;

        for attempt in 0..=self.retries {
            match timeout(self.timeout, session.get_many(&refs)).await {
                Ok(Ok(pdu)) => return owned_varbinds(pdu),
                Ok(Err(e)) => {
                    last_error = Some(anyhow::Error::from(e).context("SNMP GET запрос не удался"));
                }
                Err(_) => {
                    last_error = Some(anyhow::anyhow!("Таймаут SNMP GET ({:?})", self.timeout));
                }
            }
            tracing::debug!(attempt, oids = oids.len(), "SNMP GET не удался, повторяем");
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("SNMP GET не выполнен")))
    }

    async fn get_bulk(&self, oid: &Oid<'_>) -> Result<Vec<Varbind>> {
        let mut session = self.session.lock().await;
        let mut last_error = None;

        for attempt in 0..=self.retries {
            match timeout(self.timeout, session.getbulk(&[oid], 0, MAX_REPETITIONS)).await {
                Ok(Ok(pdu)) => return owned_varbinds(pdu),
                Ok(Err(e)) => {
                    last_error =
                        Some(anyhow::Error::from(e).context("SNMP GETBULK запрос не удался"));
                }
                Err(_) => {
                    last_error = Some(anyhow::anyhow!("Таймаут SNMP GETBULK ({:?})", self.timeout));
                }
            }
            tracing::debug!(attempt, "SNMP GETBULK не удался, повторяем");
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("SNMP GETBULK не выполнен")))
    }
}

/// Копирует varbind'ы из ответа, пока он ещё держит буфер сессии
fn owned_varbinds(pdu: Pdu<'_>) -> Result<Vec<Varbind>> {
    if pdu.error_status != 0 {
        anyhow::bail!(
            "Агент вернул ошибку: status={} index={}",
            pdu.error_status,
            pdu.error_index
        );
    }

    Ok(pdu
        .varbinds
        .map(|(oid, value)| Varbind::new(oid.to_string(), SnmpValue::from(&value)))
        .collect())
}

#[async_trait]
impl SnmpApi for SnmpClientV2c {
    async fn bulk_walk_all(&self, root_oid: &str) -> Result<Vec<Varbind>> {
        let start_oid = parse_oid(root_oid)?;
        let mut results = Vec::new();
        let mut current_oid = parse_oid(root_oid)?;

        loop {
            let batch = self.get_bulk(&current_oid).await?;
            if batch.is_empty() {
                break;
            }

            for varbind in batch {
                let oid = parse_oid(&varbind.oid)?;
                if !oid.starts_with(&start_oid) || varbind.value == SnmpValue::EndOfMibView {
                    return Ok(results);
                }
                current_oid = oid;
                results.push(varbind);
            }
        }

        Ok(results)
    }

    async fn get(&self, oids: &[String]) -> Result<Vec<Varbind>> {
        let parsed = oids
            .iter()
            .map(|oid| parse_oid(oid))
            .collect::<Result<Vec<_>>>()?;

        self.get_many(&parsed).await
    }
}

/// Добавляет стандартный порт SNMP, если он не указан
pub fn with_default_port(target: &str) -> String {
    if target.contains(':') {
        target.to_string()
    } else {
        format!("{}:161", target)
    }
}
