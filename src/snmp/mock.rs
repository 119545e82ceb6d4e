//! Агент в памяти для тестов.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use super::{SnmpApi, SnmpValue, Varbind, normalize_oid};

pub const MACHINE_DESCR_OID: &str = ".1.3.6.1.2.1.2.2.1.2.524";
pub const UPLINK_DESCR_OID: &str = ".1.3.6.1.2.1.2.2.1.2.568";

#[derive(Default)]
pub struct MockSnmp {
    walk: Vec<Varbind>,
    scalars: HashMap<String, SnmpValue>,
    /// Ответы на пакетные GET по порядку; `None` означает ошибку транспорта
    batches: Mutex<VecDeque<Option<Vec<Varbind>>>>,
    walk_fails: bool,
    /// Задержка ответа на пакетный GET, имитирует медленный агент
    delay: Option<Duration>,
    pub batch_calls: Mutex<usize>,
    /// Когда начался каждый пакетный GET
    pub batch_starts: Mutex<Vec<Instant>>,
}

impl MockSnmp {
    /// Коммутатор из тестов: mlab2 на порту 524, аплинк на 568
    pub fn switch() -> Self {
        let mut scalars = HashMap::new();
        scalars.insert(
            normalize_oid(MACHINE_DESCR_OID),
            SnmpValue::OctetString(b"xe-0/0/12".to_vec()),
        );
        scalars.insert(
            normalize_oid(UPLINK_DESCR_OID),
            SnmpValue::OctetString(b"xe-0/0/45".to_vec()),
        );

        Self {
            walk: vec![
                Varbind::new(
                    ".1.3.6.1.2.1.31.1.1.1.18.524",
                    SnmpValue::OctetString(b"mlab2".to_vec()),
                ),
                Varbind::new(
                    ".1.3.6.1.2.1.31.1.1.1.18.568",
                    SnmpValue::OctetString(b"uplink-10g".to_vec()),
                ),
            ],
            scalars,
            ..Default::default()
        }
    }

    pub fn with_walk(mut self, walk: Vec<Varbind>) -> Self {
        self.walk = walk;
        self
    }

    pub fn with_failing_walk(mut self) -> Self {
        self.walk_fails = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_batch(&self, batch: Vec<Varbind>) {
        self.batches.lock().unwrap().push_back(Some(batch));
    }

    pub fn push_failure(&self) {
        self.batches.lock().unwrap().push_back(None);
    }
}

/// Счётчики первого прогона из тестового набора
pub fn run1() -> Vec<Varbind> {
    vec![
        Varbind::new(".1.3.6.1.2.1.2.2.1.19.524", SnmpValue::Counter32(0)),
        Varbind::new(".1.3.6.1.2.1.2.2.1.19.568", SnmpValue::Counter32(3)),
        Varbind::new(".1.3.6.1.2.1.31.1.1.1.6.524", SnmpValue::Counter64(275)),
        Varbind::new(".1.3.6.1.2.1.31.1.1.1.6.568", SnmpValue::Counter64(437)),
    ]
}

/// Счётчики второго прогона
pub fn run2() -> Vec<Varbind> {
    vec![
        Varbind::new(".1.3.6.1.2.1.2.2.1.19.524", SnmpValue::Counter32(0)),
        Varbind::new(".1.3.6.1.2.1.2.2.1.19.568", SnmpValue::Counter32(8)),
        Varbind::new(".1.3.6.1.2.1.31.1.1.1.6.524", SnmpValue::Counter64(511)),
        Varbind::new(".1.3.6.1.2.1.31.1.1.1.6.568", SnmpValue::Counter64(624)),
    ]
}

#[async_trait]
impl SnmpApi for MockSnmp {
    async fn bulk_walk_all(&self, _root_oid: &str) -> Result<Vec<Varbind>> {
        if self.walk_fails {
            anyhow::bail!("request timeout");
        }
        Ok(self.walk.clone())
    }

    async fn get(&self, oids: &[String]) -> Result<Vec<Varbind>> {
        if oids.len() == 1 {
            if let Some(value) = self.scalars.get(&normalize_oid(&oids[0])) {
                return Ok(vec![Varbind::new(oids[0].clone(), value.clone())]);
            }
        }

        *self.batch_calls.lock().unwrap() += 1;
        self.batch_starts.lock().unwrap().push(Instant::now());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.batches.lock().unwrap().pop_front() {
            Some(Some(batch)) => Ok(batch),
            Some(None) => anyhow::bail!("request timeout"),
            None => anyhow::bail!("no more responses queued"),
        }
    }
}
