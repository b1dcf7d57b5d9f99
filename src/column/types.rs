#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Serial,
    BigSerial,
    Integer,
    BigInt,
    SmallInt,
    Text,
    VarChar(u32),
    Boolean,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Uuid,
    Json,
    JsonB,
    Binary,
    Real,
    DoublePrecision,
    Decimal { precision: u8, scale: u8 },
    /// Declared type passed through verbatim. Reflected columns use this so
    /// a rebuilt table keeps the exact type text the engine reported.
    Custom(String),
}

impl ColumnType {
    pub fn custom(declared: impl Into<String>) -> Self {
        ColumnType::Custom(declared.into())
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, ColumnType::Serial | ColumnType::BigSerial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varchar_keeps_length() {
        let ty = ColumnType::VarChar(32);
        assert_eq!(ty.clone(), ColumnType::VarChar(32));
        assert_ne!(ty, ColumnType::VarChar(64));
    }

    #[test]
    fn custom_keeps_declared_text() {
        assert_eq!(
            ColumnType::custom("varchar(20)"),
            ColumnType::Custom("varchar(20)".to_string())
        );
    }

    #[test]
    fn serial_detection() {
        assert!(ColumnType::Serial.is_serial());
        assert!(ColumnType::BigSerial.is_serial());
        assert!(!ColumnType::Integer.is_serial());
    }
}
