use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser};

/// Настройки процесса: флаги командной строки и переменные окружения
#[derive(Debug, Clone, Parser)]
#[command(name = "disco", version, about = "Сбор счётчиков интерфейсов коммутатора по SNMP")]
pub struct Settings {
    /// Адрес, на котором отдаются /metrics и /health
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:8888")]
    pub listen_address: String,

    /// YAML с описанием опрашиваемых метрик
    #[arg(long = "metrics", env = "DISCO_METRICS")]
    pub metrics_file: PathBuf,

    /// Адрес коммутатора (порт 161 по умолчанию)
    #[arg(long, env = "DISCO_TARGET")]
    pub target: String,

    /// Community string для SNMPv2c
    #[arg(long, env = "DISCO_COMMUNITY", hide_env_values = true)]
    pub community: String,

    /// Период записи архива, секунды
    #[arg(long = "write-interval", default_value_t = 60)]
    pub write_interval: u64,

    /// Период опроса счётчиков, секунды
    #[arg(long = "collect-interval", default_value_t = 10)]
    pub collect_interval: u64,

    /// Корень каталога архива
    #[arg(long, default_value = ".")]
    pub datadir: PathBuf,

    /// Имя хоста вместо системного
    #[arg(long, env = "DISCO_HOSTNAME")]
    pub hostname: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionSettings,
}

#[derive(Debug, Clone, Args)]
pub struct ConnectionSettings {
    /// Таймаут для SNMP операций (секунды)
    #[arg(long = "snmp-timeout", default_value_t = 2)]
    pub timeout: u64,
    /// Количество повторов при ошибках
    #[arg(long = "snmp-retries", default_value_t = 1)]
    pub retries: u32,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            anyhow::bail!("Не задан адрес коммутатора: DISCO_TARGET");
        }
        if self.community.is_empty() {
            anyhow::bail!("Не задан community: DISCO_COMMUNITY");
        }
        if self.collect_interval == 0 || self.write_interval == 0 {
            anyhow::bail!("Интервалы опроса и записи должны быть больше нуля");
        }
        if self.connection.timeout == 0 {
            anyhow::bail!("Таймаут SNMP должен быть больше нуля");
        }
        Ok(())
    }

    pub fn collect_period(&self) -> Duration {
        Duration::from_secs(self.collect_interval)
    }

    pub fn write_period(&self) -> Duration {
        Duration::from_secs(self.write_interval)
    }

    pub fn snmp_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }
}
