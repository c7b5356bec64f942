// Named query parameters and their SQL typing.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};

/// 8-4-4-4-12 hex with hyphens; the only 36 character form `uuid` accepts.
fn is_guid(value: &str) -> bool {
    value.len() == 36 && Uuid::try_parse(value).is_ok()
}

/// A caller-supplied parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Uuid> for ParamValue {
    fn from(value: Uuid) -> Self {
        Self::Text(value.hyphenated().to_string())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::String(s) => Self::Text(s),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Integer(i),
                (None, Some(f)) => Self::Float(f),
                (None, None) => Self::Text(n.to_string()),
            },
            other => Self::Json(other),
        }
    }
}

/// SQL type a parameter is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    UniqueIdentifier,
}

/// Decides the SQL type of parameters the caller did not type explicitly.
///
/// Precedence: identifier-named parameter or GUID-shaped string, then
/// string, integral number, other number, boolean, timestamp. Anything
/// else binds as text.
#[derive(Debug, Clone)]
pub struct ParamTyping {
    identifier_names: Vec<String>,
}

impl Default for ParamTyping {
    fn default() -> Self {
        Self {
            identifier_names: vec!["UserID".to_string()],
        }
    }
}

impl ParamTyping {
    /// Replace the parameter names always bound as unique identifiers.
    pub fn with_identifier_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifier_names: names.into_iter().map(Into::into).collect(),
        }
    }

    fn is_identifier_name(&self, name: &str) -> bool {
        self.identifier_names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn infer(&self, name: &str, value: &ParamValue) -> SqlType {
        if self.is_identifier_name(name) {
            return SqlType::UniqueIdentifier;
        }

        match value {
            ParamValue::Text(s) if is_guid(s) => SqlType::UniqueIdentifier,
            ParamValue::Text(_) => SqlType::Text,
            ParamValue::Integer(_) => SqlType::Integer,
            ParamValue::Float(f) if integral(*f).is_some() => SqlType::Integer,
            ParamValue::Float(_) => SqlType::Float,
            ParamValue::Boolean(_) => SqlType::Boolean,
            ParamValue::Timestamp(_) => SqlType::DateTime,
            ParamValue::Null | ParamValue::Json(_) => SqlType::Text,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then(|| value as i64)
}

/// A parameter with its resolved SQL type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedParam {
    pub name: String,
    pub sql_type: SqlType,
    pub value: ParamValue,
}

impl TypedParam {
    pub fn new<N: Into<String>>(name: N, sql_type: SqlType, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            sql_type,
            value,
        }
    }

    fn mismatch(&self) -> DatabaseError {
        DatabaseError::invalid_parameter(
            &self.name,
            format!("cannot bind {:?} as {:?}", self.value, self.sql_type),
        )
    }

    pub fn as_text(&self) -> Option<String> {
        match &self.value {
            ParamValue::Null => None,
            ParamValue::Text(s) => Some(s.clone()),
            ParamValue::Integer(i) => Some(i.to_string()),
            ParamValue::Float(f) => Some(f.to_string()),
            ParamValue::Boolean(b) => Some(b.to_string()),
            ParamValue::Timestamp(t) => Some(t.to_rfc3339()),
            ParamValue::Json(v) => Some(v.to_string()),
        }
    }

    pub fn as_integer(&self) -> DatabaseResult<Option<i64>> {
        match &self.value {
            ParamValue::Null => Ok(None),
            ParamValue::Integer(i) => Ok(Some(*i)),
            ParamValue::Float(f) => integral(*f).map(Some).ok_or_else(|| self.mismatch()),
            ParamValue::Boolean(b) => Ok(Some(i64::from(*b))),
            ParamValue::Text(s) => s.trim().parse().map(Some).map_err(|_| self.mismatch()),
            _ => Err(self.mismatch()),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> DatabaseResult<Option<f64>> {
        match &self.value {
            ParamValue::Null => Ok(None),
            ParamValue::Float(f) => Ok(Some(*f)),
            ParamValue::Integer(i) => Ok(Some(*i as f64)),
            ParamValue::Text(s) => s.trim().parse().map(Some).map_err(|_| self.mismatch()),
            _ => Err(self.mismatch()),
        }
    }

    pub fn as_boolean(&self) -> DatabaseResult<Option<bool>> {
        match &self.value {
            ParamValue::Null => Ok(None),
            ParamValue::Boolean(b) => Ok(Some(*b)),
            ParamValue::Integer(0) => Ok(Some(false)),
            ParamValue::Integer(1) => Ok(Some(true)),
            ParamValue::Text(s) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            ParamValue::Text(s) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            _ => Err(self.mismatch()),
        }
    }

    pub fn as_timestamp(&self) -> DatabaseResult<Option<DateTime<Utc>>> {
        match &self.value {
            ParamValue::Null => Ok(None),
            ParamValue::Timestamp(t) => Ok(Some(*t)),
            ParamValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|_| self.mismatch()),
            _ => Err(self.mismatch()),
        }
    }

    pub fn as_uuid(&self) -> DatabaseResult<Option<Uuid>> {
        match &self.value {
            ParamValue::Null => Ok(None),
            ParamValue::Text(s) => Uuid::parse_str(s).map(Some).map_err(|_| self.mismatch()),
            _ => Err(self.mismatch()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ParamEntry {
    name: String,
    value: ParamValue,
    sql_type: Option<SqlType>,
}

/// Ordered named parameters for one request.
///
/// Names are written without the leading `@` and compared
/// case-insensitively; binding an existing name replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<ParamEntry>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value whose SQL type is inferred at execution time.
    #[must_use]
    pub fn bind<N: Into<String>, V: Into<ParamValue>>(mut self, name: N, value: V) -> Self {
        self.insert(name.into(), value.into(), None);
        self
    }

    /// Bind a value with an explicit SQL type.
    #[must_use]
    pub fn bind_typed<N: Into<String>, V: Into<ParamValue>>(
        mut self,
        name: N,
        sql_type: SqlType,
        value: V,
    ) -> Self {
        self.insert(name.into(), value.into(), Some(sql_type));
        self
    }

    fn insert(&mut self, name: String, value: ParamValue, sql_type: Option<SqlType>) {
        let name = name.trim_start_matches('@').to_string();
        match self
            .entries
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(&name))
        {
            Some(entry) => {
                entry.value = value;
                entry.sql_type = sql_type;
            }
            None => self.entries.push(ParamEntry {
                name,
                value,
                sql_type,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| &e.value)
    }

    /// Resolve every parameter's SQL type.
    pub fn typed(&self, typing: &ParamTyping) -> Vec<TypedParam> {
        self.entries
            .iter()
            .map(|e| TypedParam {
                name: e.name.clone(),
                sql_type: e
                    .sql_type
                    .unwrap_or_else(|| typing.infer(&e.name, &e.value)),
                value: e.value.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_precedence() {
        let typing = ParamTyping::default();
        let guid = "0f8fad5b-d9cb-469f-a165-70867728950e";

        assert_eq!(typing.infer("UserID", &"not-a-guid".into()), SqlType::UniqueIdentifier);
        assert_eq!(typing.infer("userid", &ParamValue::Integer(4)), SqlType::UniqueIdentifier);
        assert_eq!(typing.infer("owner", &guid.into()), SqlType::UniqueIdentifier);
        assert_eq!(typing.infer("owner", &guid.to_uppercase().into()), SqlType::UniqueIdentifier);
        assert_eq!(typing.infer("username", &"kiosk".into()), SqlType::Text);
        assert_eq!(typing.infer("limit", &ParamValue::Integer(50)), SqlType::Integer);
        assert_eq!(typing.infer("limit", &ParamValue::Float(50.0)), SqlType::Integer);
        assert_eq!(typing.infer("ratio", &ParamValue::Float(0.25)), SqlType::Float);
        assert_eq!(typing.infer("active", &true.into()), SqlType::Boolean);
        assert_eq!(typing.infer("since", &Utc::now().into()), SqlType::DateTime);
        assert_eq!(typing.infer("note", &ParamValue::Null), SqlType::Text);
        assert_eq!(
            typing.infer("tags", &ParamValue::Json(serde_json::json!(["a"]))),
            SqlType::Text
        );
    }

    #[test]
    fn test_guid_shape() {
        assert!(is_guid("0F8FAD5B-D9CB-469F-A165-70867728950E"));
        assert!(!is_guid("0f8fad5bd9cb469fa16570867728950e"));
        assert!(!is_guid("{0f8fad5b-d9cb-469f-a165-70867728950e}"));
        assert!(!is_guid("0f8fad5b-d9cb-469f-a165-70867728950g"));
    }

    #[test]
    fn test_custom_identifier_names() {
        let typing = ParamTyping::with_identifier_names(["PatientID"]);
        assert_eq!(typing.infer("PatientID", &"x".into()), SqlType::UniqueIdentifier);
        assert_eq!(typing.infer("UserID", &"x".into()), SqlType::Text);
    }

    #[test]
    fn test_params_replace_and_type() {
        let params = Params::new()
            .bind("@username", "kiosk")
            .bind("Username", "admin")
            .bind_typed("code", SqlType::Text, 42)
            .bind("missing", Option::<i64>::None);

        assert_eq!(params.len(), 3);
        assert_eq!(params.get("USERNAME"), Some(&ParamValue::Text("admin".into())));

        let typed = params.typed(&ParamTyping::default());
        assert_eq!(typed[0].name, "username");
        assert_eq!(typed[1].sql_type, SqlType::Text);
        assert_eq!(typed[1].as_text().as_deref(), Some("42"));
        assert_eq!(typed[2].as_text(), None);
    }

    #[test]
    fn test_json_values_convert() {
        assert_eq!(ParamValue::from(serde_json::json!(7)), ParamValue::Integer(7));
        assert_eq!(ParamValue::from(serde_json::json!(1.5)), ParamValue::Float(1.5));
        assert_eq!(ParamValue::from(serde_json::json!(null)), ParamValue::Null);
        assert!(matches!(ParamValue::from(serde_json::json!({"a": 1})), ParamValue::Json(_)));
    }

    #[test]
    fn test_conversions_reject_mismatches() {
        let bad_uuid = TypedParam::new("UserID", SqlType::UniqueIdentifier, "kiosk".into());
        assert!(matches!(bad_uuid.as_uuid(), Err(DatabaseError::InvalidParameter { .. })));

        let fractional = TypedParam::new("limit", SqlType::Integer, ParamValue::Float(1.5));
        assert!(fractional.as_integer().is_err());

        let numeric_text = TypedParam::new("limit", SqlType::Integer, " 12 ".into());
        assert_eq!(numeric_text.as_integer().unwrap(), Some(12));

        let stamp = TypedParam::new("since", SqlType::DateTime, "2024-03-01T08:00:00Z".into());
        assert!(stamp.as_timestamp().unwrap().is_some());
    }
}
