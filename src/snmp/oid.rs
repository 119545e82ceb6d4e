use anyhow::{Context, Result};
use snmp2::Oid;

/// Плейсхолдер индекса интерфейса в шаблоне OID из конфигурации
pub const IFACE_PLACEHOLDER: &str = "IFACE";

/// Парсит строку OID в объект Oid
pub fn parse_oid(s: &str) -> Result<Oid<'static>> {
    let parts: Result<Vec<u64>, _> = s
        .trim()
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>())
        .collect();

    let parts = parts.context(format!("Невалидный OID: {}", s))?;
    Oid::from(&parts).map_err(|e| anyhow::anyhow!("Не удалось создать Oid из '{}': {:?}", s, e))
}

/// Приводит OID к единому виду: без пробелов и ведущей точки.
///
/// Конфиги обычно пишут `.1.3.6...`, а агент возвращает `1.3.6...`,
/// ключи в хранилище всегда в нормализованном виде.
pub fn normalize_oid(s: &str) -> String {
    s.trim().trim_start_matches('.').to_string()
}

/// Подставляет индекс интерфейса в шаблон OID.
/// Если плейсхолдера нет, индекс дописывается последним компонентом.
pub fn create_oid(oid_stub: &str, iface: &str) -> String {
    let stub = normalize_oid(oid_stub);
    if stub.contains(IFACE_PLACEHOLDER) {
        stub.replacen(IFACE_PLACEHOLDER, iface, 1)
    } else {
        format!("{}.{}", stub.trim_end_matches('.'), iface)
    }
}

/// Последний компонент OID (для ifAlias/ifDescr это индекс интерфейса)
pub fn last_component(oid: &str) -> Option<&str> {
    oid.trim()
        .rsplit('.')
        .next()
        .filter(|part| !part.is_empty())
}
