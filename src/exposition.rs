use std::collections::HashMap;

use anyhow::{Context, Result};
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::config::MetricsConfig;

const LABELS: [&str; 2] = ["node", "interface"];

/// Накопленные приросты, которые отдаются на /metrics.
/// Один CounterVec на метрику из конфига, метки: хост и ifDescr.
pub struct SwitchMetrics {
    registry: Registry,
    counters: HashMap<String, CounterVec>,
}

impl SwitchMetrics {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let registry = Registry::new();
        let mut counters = HashMap::with_capacity(config.len());

        for metric in config.iter() {
            let counter = CounterVec::new(Opts::new(&metric.name, &metric.description), &LABELS)
                .context(format!("Некорректное имя метрики '{}'", metric.name))?;
            registry
                .register(Box::new(counter.clone()))
                .context(format!("Не удалось зарегистрировать метрику '{}'", metric.name))?;
            counters.insert(metric.name.clone(), counter);
        }

        Ok(Self { registry, counters })
    }

    /// Увеличивает счётчик метрики `name` для пары (хост, интерфейс)
    pub fn add(&self, name: &str, hostname: &str, interface: &str, delta: u64) {
        match self.counters.get(name) {
            Some(counter) => counter
                .with_label_values(&[hostname, interface])
                .inc_by(delta as f64),
            None => tracing::warn!(metric = name, "Метрика не зарегистрирована"),
        }
    }

    /// Текущее значение счётчика, `None` если серия ещё не создавалась
    #[cfg(test)]
    pub fn value(&self, name: &str, hostname: &str, interface: &str) -> Option<f64> {
        let counter = self.counters.get(name)?;
        let family = self
            .registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?;
        let has_series = family.get_metric().iter().any(|metric| {
            let labels = metric.get_label();
            labels.iter().any(|l| l.get_name() == "node" && l.get_value() == hostname)
                && labels.iter().any(|l| l.get_name() == "interface" && l.get_value() == interface)
        });

        has_series.then(|| counter.with_label_values(&[hostname, interface]).get())
    }

    /// Текстовый формат Prometheus
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .context("Не удалось закодировать метрики")?;
        String::from_utf8(buf).context("Метрики не в UTF-8")
    }
}
