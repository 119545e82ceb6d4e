use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use tokio::sync::Mutex;

pub mod counter;
pub mod interfaces;
pub mod store;

use counter::{CounterValue, Delta};
use interfaces::discover;
use store::CounterStore;

use crate::archive::{ArchiveWriter, Sample};
use crate::config::{AppConfig, MetricsConfig};
use crate::exposition::SwitchMetrics;
use crate::snmp::{SnmpApi, normalize_oid};

/// Ошибки цикла опроса
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Пакетный GET не прошёл; состояние не менялось, следующий цикл повторит
    #[error("Не удалось получить счётчики: {0:#}")]
    Fetch(anyhow::Error),

    /// Агент вернул не счётчик. Это ошибка конфигурации, продолжать нет смысла.
    #[error("OID {oid}: тип {type_name} не является Counter32/Counter64")]
    UnsupportedCounterType { oid: String, type_name: &'static str },
}

impl CollectError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollectError::UnsupportedCounterType { .. })
    }
}

/// Итог одного цикла опроса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Сколько записей получили новое значение
    pub updated: usize,
    /// Сколько приростов добавлено в буферы
    pub samples: usize,
    /// Первый цикл: только запомнили значения
    pub baseline: bool,
}

/// Итог записи архива
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushSummary {
    pub path: PathBuf,
    pub records: usize,
    pub samples: usize,
}

/// Параметры, которые не приходят из SNMP
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Адрес коммутатора, попадает в поле experiment архива
    pub target: String,
    pub hostname: String,
    /// Подпись порта машины в ifAlias
    pub machine: String,
}

impl CollectorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            target: config.settings.target.clone(),
            hostname: config.hostname.clone(),
            machine: config.machine(),
        }
    }
}

/// Коллектор счётчиков коммутатора.
///
/// Опрос и запись архива работают с одним `CounterStore` под одним мьютексом,
/// поэтому запись никогда не видит наполовину обновлённый буфер, а опрос
/// не меняет значения посреди сериализации.
pub struct SwitchCollector {
    snmp: Arc<dyn SnmpApi>,
    store: Mutex<CounterStore>,
    metrics: Arc<SwitchMetrics>,
    archive: ArchiveWriter,
    hostname: String,
    /// Копия флага первого цикла из `CounterStore`, читается без мьютекса
    first_run: AtomicBool,
}

impl SwitchCollector {
    /// Находит интерфейсы и строит таблицу OID
    pub async fn new(
        snmp: Arc<dyn SnmpApi>,
        config: &MetricsConfig,
        options: CollectorOptions,
        archive: ArchiveWriter,
    ) -> Result<Self> {
        let interfaces = discover(snmp.as_ref(), &options.machine).await?;
        let store = CounterStore::new(config, &interfaces, &options.target, &options.hostname)?;
        let metrics = Arc::new(SwitchMetrics::new(config)?);

        tracing::info!(
            oids = store.len(),
            machine = %options.machine,
            "Таблица OID построена"
        );

        Ok(Self {
            snmp,
            first_run: AtomicBool::new(store.is_first_run()),
            store: Mutex::new(store),
            metrics,
            archive,
            hostname: options.hostname,
        })
    }

    pub fn metrics(&self) -> Arc<SwitchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Копия записи для проверки состояния снаружи
    #[cfg(test)]
    pub async fn entry(&self, oid: &str) -> Option<store::OidEntry> {
        self.store.lock().await.get(&normalize_oid(oid)).cloned()
    }

    #[cfg(test)]
    pub async fn entries(&self) -> Vec<store::OidEntry> {
        self.store.lock().await.entries().to_vec()
    }

    /// Не ждёт мьютекс: опрос может висеть в повторах транспорта
    pub fn is_first_run(&self) -> bool {
        self.first_run.load(Ordering::Acquire)
    }

    /// Один цикл опроса: пакетный GET, приросты, счётчики, буферы
    pub async fn collect(&self) -> Result<CycleSummary, CollectError> {
        let mut store = self.store.lock().await;

        let oids = store.oids();
        let varbinds = match self.snmp.get(&oids).await {
            Ok(varbinds) => varbinds,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Опрос счётчиков не удался, цикл пропущен");
                return Err(CollectError::Fetch(e));
            }
        };

        // Сначала проверяем все значения, чтобы не применить цикл частично
        let mut readings = Vec::with_capacity(varbinds.len());
        for varbind in &varbinds {
            let oid = normalize_oid(&varbind.oid);
            let Some(position) = store.position(&oid) else {
                tracing::warn!(%oid, "Агент вернул OID, которого нет в таблице");
                continue;
            };
            readings.push((position, CounterValue::from_snmp(&oid, &varbind.value)?));
        }

        let baseline = store.is_first_run();
        let timestamp = Utc::now().timestamp();
        let mut summary = CycleSummary {
            updated: 0,
            samples: 0,
            baseline,
        };

        for (position, value) in readings {
            let entry = store.entry_mut(position);
            if !baseline {
                let delta = value.delta_since(entry.previous_value);
                match delta {
                    Delta::Increase(_) => {}
                    Delta::Wrapped(_) => tracing::warn!(
                        oid = %entry.oid,
                        previous = entry.previous_value,
                        current = value.as_u64(),
                        "Counter32 переполнился"
                    ),
                    Delta::Reset(_) => tracing::warn!(
                        oid = %entry.oid,
                        previous = entry.previous_value,
                        current = value.as_u64(),
                        "Счётчик сброшен"
                    ),
                }

                self.metrics
                    .add(&entry.metric, &self.hostname, &entry.if_descr, delta.value());
                entry.series.samples.push(Sample {
                    timestamp,
                    value: delta.value(),
                });
                summary.samples += 1;
            }
            entry.previous_value = value.as_u64();
            summary.updated += 1;
        }

        store.finish_cycle();
        self.first_run.store(store.is_first_run(), Ordering::Release);
        tracing::debug!(
            updated = summary.updated,
            samples = summary.samples,
            baseline,
            "Цикл опроса завершён"
        );

        Ok(summary)
    }

    /// Записывает накопленные серии за окно `[сейчас - window, сейчас]`
    pub async fn flush(&self, window: Duration) -> Result<FlushSummary> {
        self.flush_at(Local::now(), window).await
    }

    /// Как `flush`, но с явным временем конца окна.
    ///
    /// При ошибке ввода-вывода буферы остаются на месте и уйдут
    /// в следующую запись.
    pub async fn flush_at(&self, now: DateTime<Local>, window: Duration) -> Result<FlushSummary> {
        let mut store = self.store.lock().await;

        let path = self.archive.file_path(&self.hostname, &now, window);
        let samples = store.pending_samples();
        if let Err(e) = self.archive.append_to(&path, store.records()) {
            tracing::error!(
                path = %path.display(),
                samples,
                error = %format!("{:#}", e),
                "Не удалось записать архив, данные сохранены до следующей записи"
            );
            return Err(e);
        }

        store.reset_buffers();
        let summary = FlushSummary {
            path,
            records: store.len(),
            samples,
        };
        tracing::info!(
            path = %summary.path.display(),
            records = summary.records,
            samples = summary.samples,
            "Архив записан"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
