use std::collections::HashMap;

use anyhow::Result;

use super::interfaces::{Interfaces, Scope};
use crate::archive::ArchiveRecord;
use crate::config::{MetricDef, MetricsConfig};
use crate::snmp::create_oid;

/// Состояние одного опрашиваемого OID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidEntry {
    /// Нормализованный OID, он же ключ
    pub oid: String,
    /// Имя метрики из конфига
    pub metric: String,
    pub scope: Scope,
    /// ifDescr интерфейса, метка в /metrics
    pub if_descr: String,
    /// Значение счётчика на прошлом цикле
    pub previous_value: u64,
    /// Накопленные с прошлой записи архива приросты
    pub series: ArchiveRecord,
}

/// Таблица OID: одна запись на пару (метрика, scope).
///
/// Набор записей фиксируется при создании и не меняется до конца жизни
/// процесса. Записи меняются на месте по индексу.
#[derive(Debug)]
pub struct CounterStore {
    entries: Vec<OidEntry>,
    index: HashMap<String, usize>,
    first_run: bool,
}

impl CounterStore {
    pub fn new(
        config: &MetricsConfig,
        interfaces: &Interfaces,
        target: &str,
        hostname: &str,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(config.len() * Scope::ALL.len());
        let mut index = HashMap::with_capacity(entries.capacity());

        for metric in config.iter() {
            for iface in Scope::ALL.iter().filter_map(|&scope| interfaces.get(scope)) {
                let oid = create_oid(&metric.oid_stub, &iface.index);
                if let Some(&existing) = index.get(&oid) {
                    let other: &OidEntry = &entries[existing];
                    anyhow::bail!(
                        "OID {} получается и для {}/{}, и для {}/{}",
                        oid,
                        other.metric,
                        other.scope,
                        metric.name,
                        iface.scope
                    );
                }

                index.insert(oid.clone(), entries.len());
                entries.push(OidEntry {
                    oid,
                    metric: metric.name.clone(),
                    scope: iface.scope,
                    if_descr: iface.description.clone(),
                    previous_value: 0,
                    series: ArchiveRecord::new(target, hostname, archive_name(metric, iface.scope)),
                });
            }
        }

        Ok(Self {
            entries,
            index,
            first_run: true,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Все OID одним списком для пакетного GET
    pub fn oids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.oid.clone()).collect()
    }

    pub fn position(&self, oid: &str) -> Option<usize> {
        self.index.get(oid).copied()
    }

    #[cfg(test)]
    pub fn get(&self, oid: &str) -> Option<&OidEntry> {
        self.position(oid).map(|i| &self.entries[i])
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[OidEntry] {
        &self.entries
    }

    pub(super) fn entry_mut(&mut self, position: usize) -> &mut OidEntry {
        &mut self.entries[position]
    }

    /// Пока первый цикл не прошёл, предыдущих значений нет и приросты не считаются
    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    pub(super) fn finish_cycle(&mut self) {
        self.first_run = false;
    }

    pub fn records(&self) -> impl Iterator<Item = &ArchiveRecord> {
        self.entries.iter().map(|e| &e.series)
    }

    pub fn pending_samples(&self) -> usize {
        self.entries.iter().map(|e| e.series.samples.len()).sum()
    }

    /// Очищает буферы после записи архива. Предыдущие значения не трогаются.
    pub(super) fn reset_buffers(&mut self) {
        for entry in &mut self.entries {
            entry.series.samples.clear();
        }
    }
}

fn archive_name(metric: &MetricDef, scope: Scope) -> &str {
    match scope {
        Scope::Machine => &metric.mlab_machine_name,
        Scope::Uplink => &metric.mlab_uplink_name,
    }
}
