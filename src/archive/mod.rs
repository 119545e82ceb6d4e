use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DAY_DIR_FORMAT: &str = "%Y/%m/%d";

/// Прирост счётчика за один цикл опроса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix-время в секундах
    pub timestamp: i64,
    pub value: u64,
}

/// Серия приростов одной метрики между двумя записями архива
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// Адрес коммутатора
    pub experiment: String,
    pub hostname: String,
    /// Имя метрики в архиве, например "switch.octets.uplink.rx"
    pub metric: String,
    #[serde(rename = "sample")]
    pub samples: Vec<Sample>,
}

impl ArchiveRecord {
    pub fn new(experiment: &str, hostname: &str, metric: &str) -> Self {
        Self {
            experiment: experiment.to_string(),
            hostname: hostname.to_string(),
            metric: metric.to_string(),
            samples: Vec::new(),
        }
    }

    /// JSON с отступом в 4 пробела
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .context(format!("Не удалось сериализовать метрику {}", self.metric))?;
        Ok(buf)
    }
}

/// Читает документы, записанные подряд без общего массива
#[cfg(test)]
pub fn read_records(data: &str) -> Result<Vec<ArchiveRecord>> {
    serde_json::Deserializer::from_str(data)
        .into_iter::<ArchiveRecord>()
        .map(|record| record.context("Повреждённая запись в архиве"))
        .collect()
}

/// Пишет серии в файлы вида
/// `<root>/<год>/<месяц>/<день>/<hostname>/<начало>-to-<конец>-switch.json`
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    root: PathBuf,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Путь файла для окна `[now - window, now]`
    pub fn file_path<Tz: TimeZone>(&self, hostname: &str, now: &DateTime<Tz>, window: Duration) -> PathBuf
    where
        Tz::Offset: std::fmt::Display,
    {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        let start = now.clone() - window;
        let file_name = format!(
            "{}-to-{}-switch.json",
            start.format(WINDOW_FORMAT),
            now.format(WINDOW_FORMAT)
        );

        self.root
            .join(now.format(DAY_DIR_FORMAT).to_string())
            .join(hostname)
            .join(file_name)
    }

    /// Сначала всё сериализуется, потом пишется одним вызовом:
    /// при ошибке сериализации файл не трогается, при ошибке записи
    /// обрезается до прежней длины.
    pub fn append_to<'a>(
        &self,
        path: &Path,
        records: impl IntoIterator<Item = &'a ArchiveRecord>,
    ) -> Result<()> {
        let mut data = Vec::new();
        for record in records {
            data.extend(record.to_pretty_json()?);
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .context(format!("Не удалось создать каталог архива {}", dir.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context(format!("Не удалось открыть файл архива {}", path.display()))?;

        append_or_rollback(&mut file, &data)
            .context(format!("Не удалось записать архив {}", path.display()))?;

        Ok(())
    }
}

/// Приёмник, который умеет вернуться к прежней длине
trait Truncate: Write {
    fn current_len(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Дописывает `data` целиком или не оставляет от неё ничего
fn append_or_rollback<W: Truncate>(out: &mut W, data: &[u8]) -> io::Result<()> {
    let len = out.current_len()?;
    if let Err(e) = out.write_all(data).and_then(|_| out.flush()) {
        if let Err(rollback) = out.truncate_to(len) {
            tracing::error!(error = %rollback, len, "Не удалось обрезать архив после неудачной записи");
        }
        return Err(e);
    }
    Ok(())
}
