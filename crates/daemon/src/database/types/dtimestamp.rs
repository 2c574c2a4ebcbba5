use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// UTC instant stored as integer microseconds since the epoch.
///
/// Integer storage keeps `ORDER BY created_at` exact; the wire form is RFC 3339.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DTimestamp(OffsetDateTime);

impl DTimestamp {
    pub fn now() -> Self {
        Self::from(OffsetDateTime::now_utc())
    }

    pub fn as_micros(&self) -> i64 {
        (self.0.unix_timestamp_nanos() / 1_000) as i64
    }

    pub fn from_micros(micros: i64) -> Result<Self, time::error::ComponentRange> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).map(Self)
    }
}

impl From<OffsetDateTime> for DTimestamp {
    fn from(value: OffsetDateTime) -> Self {
        // Truncate to what the column can hold so values round-trip exactly
        let micros = (value.unix_timestamp_nanos() / 1_000) * 1_000;
        Self(OffsetDateTime::from_unix_timestamp_nanos(micros).unwrap_or(value))
    }
}

impl From<DTimestamp> for OffsetDateTime {
    fn from(val: DTimestamp) -> Self {
        val.0
    }
}

impl std::ops::Deref for DTimestamp {
    type Target = OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for DTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.format(&Rfc3339) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for DTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = self.0.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for DTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, &Rfc3339)
            .map(Self::from)
            .map_err(serde::de::Error::custom)
    }
}

impl Decode<'_, Sqlite> for DTimestamp {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let micros = <i64 as Decode<Sqlite>>::decode(value)?;
        Ok(Self::from_micros(micros)?)
    }
}

impl Encode<'_, Sqlite> for DTimestamp {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Int64(self.as_micros()));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for DTimestamp {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <i64 as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <i64 as Type<Sqlite>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_micros_round_trip() {
        let ts = DTimestamp::now();
        let back = DTimestamp::from_micros(ts.as_micros()).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn test_json_is_rfc3339() {
        let ts = DTimestamp::from_micros(1_700_000_000_123_456).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2023-11-14T22:13:20.123456Z\"");

        let parsed: DTimestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ts);
    }
}
