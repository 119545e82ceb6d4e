use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};

use crate::snmp::{SnmpApi, create_oid, last_component};

/// ifAlias: подписи портов, по ним ищем машину и аплинк
pub const IF_ALIAS_OID: &str = ".1.3.6.1.2.1.31.1.1.1.18";
/// ifDescr: человекочитаемое имя порта
pub const IF_DESCR_OID_STUB: &str = ".1.3.6.1.2.1.2.2.1.2";

const UPLINK_ALIAS_PREFIX: &str = "uplink";

/// К какому порту относится значение
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Machine,
    Uplink,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Machine, Scope::Uplink];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Machine => "machine",
            Scope::Uplink => "uplink",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub scope: Scope,
    /// Индекс интерфейса (последний компонент OID)
    pub index: String,
    /// ifDescr, например "xe-0/0/12"
    pub description: String,
}

/// Найденные интерфейсы, ровно по одному на каждый Scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interfaces {
    by_scope: BTreeMap<Scope, InterfaceDescriptor>,
}

impl Interfaces {
    pub fn new(descriptors: impl IntoIterator<Item = InterfaceDescriptor>) -> Result<Self> {
        let by_scope: BTreeMap<_, _> = descriptors.into_iter().map(|d| (d.scope, d)).collect();
        for scope in Scope::ALL {
            if !by_scope.contains_key(&scope) {
                anyhow::bail!("Не найден интерфейс для '{}'", scope);
            }
        }
        Ok(Self { by_scope })
    }

    pub fn get(&self, scope: Scope) -> Option<&InterfaceDescriptor> {
        self.by_scope.get(&scope)
    }
}

/// Ищет порт машины и аплинк по ifAlias.
///
/// Выполняется один раз при старте: без индексов интерфейсов собирать
/// нечего, поэтому любая ошибка здесь фатальна для процесса.
pub async fn discover(snmp: &dyn SnmpApi, machine: &str) -> Result<Interfaces> {
    let pdus = snmp
        .bulk_walk_all(IF_ALIAS_OID)
        .await
        .context("Не удалось обойти ifAlias")?;

    let mut bound: BTreeMap<Scope, String> = BTreeMap::new();
    for pdu in &pdus {
        let Some(index) = last_component(&pdu.oid) else {
            tracing::warn!(oid = %pdu.oid, "OID без индекса интерфейса, пропускаем");
            continue;
        };
        let alias = pdu.value.as_trimmed_string().ok_or_else(|| {
            anyhow::anyhow!(
                "ifAlias {} имеет тип {}, ожидалась строка",
                pdu.oid,
                pdu.value.type_name()
            )
        })?;

        if alias == machine {
            bound.insert(Scope::Machine, index.to_string());
        }
        if alias.starts_with(UPLINK_ALIAS_PREFIX) {
            bound.insert(Scope::Uplink, index.to_string());
        }
    }

    for scope in Scope::ALL {
        if !bound.contains_key(&scope) {
            match scope {
                Scope::Machine => anyhow::bail!("Порт машины '{}' не найден среди ifAlias", machine),
                Scope::Uplink => anyhow::bail!(
                    "Аплинк не найден: нет ifAlias, начинающегося с '{}'",
                    UPLINK_ALIAS_PREFIX
                ),
            }
        }
    }

    let mut descriptors = Vec::with_capacity(bound.len());
    for (scope, index) in bound {
        let description = interface_description(snmp, &index).await?;
        tracing::info!(%scope, %index, %description, "Интерфейс найден");
        descriptors.push(InterfaceDescriptor {
            scope,
            index,
            description,
        });
    }

    Interfaces::new(descriptors)
}

async fn interface_description(snmp: &dyn SnmpApi, index: &str) -> Result<String> {
    let oid = create_oid(IF_DESCR_OID_STUB, index);
    let varbinds = snmp
        .get(std::slice::from_ref(&oid))
        .await
        .context(format!("Не удалось получить ifDescr для интерфейса {}", index))?;

    let varbind = varbinds
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("SNMP ответ пустой ({})", oid))?;

    varbind.value.as_trimmed_string().ok_or_else(|| {
        anyhow::anyhow!("ifDescr {} имеет тип {}, ожидалась строка", oid, varbind.value.type_name())
    })
}
