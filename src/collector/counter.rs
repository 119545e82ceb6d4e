use crate::snmp::SnmpValue;

use super::CollectError;

/// Значение счётчика с известной разрядностью
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterValue {
    Bits32(u32),
    Bits64(u64),
}

impl CounterValue {
    /// Приводит значение из ответа агента к счётчику.
    /// Всё, что не Counter32/Gauge32/Counter64, считается ошибкой совместимости.
    pub fn from_snmp(oid: &str, value: &SnmpValue) -> Result<Self, CollectError> {
        match value {
            SnmpValue::Counter32(v) | SnmpValue::Unsigned32(v) => Ok(CounterValue::Bits32(*v)),
            SnmpValue::Counter64(v) => Ok(CounterValue::Bits64(*v)),
            other => Err(CollectError::UnsupportedCounterType {
                oid: oid.to_string(),
                type_name: other.type_name(),
            }),
        }
    }

    pub fn as_u64(&self) -> u64 {
        match self {
            CounterValue::Bits32(v) => u64::from(*v),
            CounterValue::Bits64(v) => *v,
        }
    }

    /// Прирост относительно предыдущего значения.
    ///
    /// Если счётчик уменьшился: 32-битный считаем переполнившимся один раз,
    /// 64-битный считаем сброшенным (перезагрузка агента), и тогда приростом
    /// будет текущее значение.
    pub fn delta_since(&self, previous: u64) -> Delta {
        let current = self.as_u64();
        if current >= previous {
            return Delta::Increase(current - previous);
        }

        match self {
            CounterValue::Bits32(_) if previous <= u64::from(u32::MAX) => {
                Delta::Wrapped((u64::from(u32::MAX) - previous) + current + 1)
            }
            _ => Delta::Reset(current),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Increase(u64),
    Wrapped(u64),
    Reset(u64),
}

impl Delta {
    pub fn value(&self) -> u64 {
        match self {
            Delta::Increase(v) | Delta::Wrapped(v) | Delta::Reset(v) => *v,
        }
    }
}
