use anyhow::{Context, Result};
use sysinfo::System;

pub mod metrics;
pub mod settings;

pub use metrics::{MetricDef, MetricsConfig};
pub use settings::Settings;

/// Длина префикса имени хоста, которым машина подписана в ifAlias
const MACHINE_PREFIX_LEN: usize = 5;

/// Главная конфигурация приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Опрашиваемые метрики
    pub metrics: MetricsConfig,
    /// Флаги и окружение
    pub settings: Settings,
    /// Имя хоста, которым подписываются архивы и метки
    pub hostname: String,
}

impl AppConfig {
    /// Загружает YAML с метриками и определяет имя хоста
    pub fn load(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let metrics = MetricsConfig::load(&settings.metrics_file)?;

        let hostname = match &settings.hostname {
            Some(name) => name.clone(),
            None => System::host_name().context("Не удалось определить имя хоста")?,
        };
        if hostname.trim().is_empty() {
            anyhow::bail!("Имя хоста пустое");
        }

        Ok(Self {
            metrics,
            settings,
            hostname,
        })
    }

    /// Короткое имя машины, например "mlab2" для "mlab2-abc0t.mlab-sandbox..."
    pub fn machine(&self) -> String {
        machine_name(&self.hostname)
    }

    pub fn debug_config(&self) {
        tracing::info!(
            target_addr = %self.settings.target,
            hostname = %self.hostname,
            machine = %self.machine(),
            metrics = self.metrics.len(),
            collect_interval = self.settings.collect_interval,
            write_interval = self.settings.write_interval,
            datadir = %self.settings.datadir.display(),
            "Конфигурация загружена"
        );
    }
}

pub fn machine_name(hostname: &str) -> String {
    hostname.chars().take(MACHINE_PREFIX_LEN).collect()
}
