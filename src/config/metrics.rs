use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Описание одной метрики из YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDef {
    /// Имя счётчика в /metrics, например "ifHCInOctets"
    pub name: String,
    pub description: String,
    /// Шаблон OID, индекс интерфейса подставляется вместо IFACE (или дописывается в конец)
    pub oid_stub: String,
    /// Имя метрики в архиве для аплинка
    pub mlab_uplink_name: String,
    /// Имя метрики в архиве для порта машины
    pub mlab_machine_name: String,
}

/// Список метрик, которые опрашиваются на коммутаторе
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsConfig {
    pub metrics: Vec<MetricDef>,
}

impl MetricsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Не удалось прочитать файл: {}", path.display()))?;

        Self::from_yaml(&content).context(format!("Некорректный конфиг метрик: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: MetricsConfig =
            serde_yml::from_str(content).context("Не удалось распарсить YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            anyhow::bail!("Список метрик пустой");
        }

        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.name.trim().is_empty() {
                anyhow::bail!("У метрики не задано имя");
            }
            if metric.oid_stub.trim().is_empty() {
                anyhow::bail!("У метрики '{}' не задан oidStub", metric.name);
            }
            if !seen.insert(metric.name.as_str()) {
                anyhow::bail!("Метрика '{}' описана дважды", metric.name);
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDef> {
        self.metrics.iter()
    }
}

#[cfg(test)]
pub(crate) fn sample_config() -> MetricsConfig {
    MetricsConfig {
        metrics: vec![
            MetricDef {
                name: "ifHCInOctets".to_string(),
                description: "Ingress octets.".to_string(),
                oid_stub: ".1.3.6.1.2.1.31.1.1.1.6".to_string(),
                mlab_uplink_name: "switch.octets.uplink.rx".to_string(),
                mlab_machine_name: "switch.octets.local.rx".to_string(),
            },
            MetricDef {
                name: "ifOutDiscards".to_string(),
                description: "Egress discards.".to_string(),
                oid_stub: ".1.3.6.1.2.1.2.2.1.19".to_string(),
                mlab_uplink_name: "switch.discards.uplink.tx".to_string(),
                mlab_machine_name: "switch.discards.local.tx".to_string(),
            },
        ],
    }
}
