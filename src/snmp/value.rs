use snmp2::Value;

/// Владеющее значение varbind'а.
///
/// `snmp2::Value` заимствует буфер сессии, поэтому на границе транспорта
/// всё копируется в этот тип.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    OctetString(Vec<u8>),
    Counter32(u32),
    Unsigned32(u32),
    Counter64(u64),
    Integer(i64),
    Timeticks(u32),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// Всё остальное в виде Debug-строки
    Other(String),
}

impl SnmpValue {
    /// Название типа для логов и ошибок
    pub fn type_name(&self) -> &'static str {
        match self {
            SnmpValue::OctetString(_) => "OCTET STRING",
            SnmpValue::Counter32(_) => "Counter32",
            SnmpValue::Unsigned32(_) => "Gauge32",
            SnmpValue::Counter64(_) => "Counter64",
            SnmpValue::Integer(_) => "INTEGER",
            SnmpValue::Timeticks(_) => "TimeTicks",
            SnmpValue::NoSuchObject => "noSuchObject",
            SnmpValue::NoSuchInstance => "noSuchInstance",
            SnmpValue::EndOfMibView => "endOfMibView",
            SnmpValue::Other(_) => "unsupported",
        }
    }

    /// Строка из OCTET STRING, обрезанная по краям
    pub fn as_trimmed_string(&self) -> Option<String> {
        match self {
            SnmpValue::OctetString(bytes) => Some(String::from_utf8_lossy(bytes).trim().to_string()),
            _ => None,
        }
    }
}

impl From<&Value<'_>> for SnmpValue {
    fn from(value: &Value<'_>) -> Self {
        match value {
            Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
            Value::Counter32(v) => SnmpValue::Counter32(*v),
            Value::Unsigned32(v) => SnmpValue::Unsigned32(*v),
            Value::Counter64(v) => SnmpValue::Counter64(*v),
            Value::Integer(v) => SnmpValue::Integer(*v),
            Value::Timeticks(v) => SnmpValue::Timeticks(*v),
            Value::NoSuchObject => SnmpValue::NoSuchObject,
            Value::NoSuchInstance => SnmpValue::NoSuchInstance,
            Value::EndOfMibView => SnmpValue::EndOfMibView,
            other => SnmpValue::Other(format!("{:?}", other)),
        }
    }
}

/// Пара (OID, значение) из ответа агента
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Varbind {
    pub oid: String,
    pub value: SnmpValue,
}

impl Varbind {
    pub fn new(oid: impl Into<String>, value: SnmpValue) -> Self {
        Self {
            oid: oid.into(),
            value,
        }
    }
}
