//! BSON value definitions.

use std::hash::{Hash, Hasher};

use crate::{document::Document, oid::ObjectId, spec::ElementType, Binary, DateTime, Decimal128};

/// An owned regular expression: pattern plus options.
///
/// Options are identified by characters, which must be stored in alphabetical order. Valid
/// options are `i` for case insensitive matching, `m` for multiline matching, `x` for verbose
/// mode, `l` to make `\w`, `\W`, etc. locale dependent (deprecated), `s` for dotall mode, and `u`
/// to make `\w`, `\W`, etc. match unicode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    /// The regex pattern to match.
    pub pattern: String,

    /// The options for the regex.
    pub options: String,
}

impl Regex {
    /// Constructs a new [`Regex`], sorting `options` into alphabetical order.
    pub fn new(pattern: impl Into<String>, options: impl AsRef<str>) -> Self {
        let mut chars: Vec<char> = options.as_ref().chars().collect();
        chars.sort_unstable();
        Self {
            pattern: pattern.into(),
            options: chars.into_iter().collect(),
        }
    }
}

/// A BSON DBPointer value (deprecated, preserved on read).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbPointer {
    /// The namespace of the collection being pointed to.
    pub namespace: String,

    /// The ID of the document being pointed to.
    pub id: ObjectId,
}

/// A BSON "code with scope" value: JavaScript code plus a scope document of variable bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct JavaScriptCodeWithScope {
    /// The JavaScript code.
    pub code: String,

    /// The scope document containing variable bindings.
    pub scope: Document,
}

/// A BSON timestamp value.
///
/// Timestamps are used internally by MongoDB's replication and sharding. They are not the
/// same as the [`DateTime`] type and are not generally useful to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    /// The seconds since the Unix epoch.
    pub time: u32,

    /// An incrementing ordinal for operations within a given second.
    pub increment: u32,
}

/// An enumeration of all the possible BSON value types.
#[derive(Debug, Clone, PartialEq)]
pub enum Bson {
    /// 64-bit binary floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Array.
    Array(Array),
    /// Embedded document.
    Document(Document),
    /// Boolean value.
    Boolean(bool),
    /// Null value.
    Null,
    /// Regular expression.
    RegularExpression(Regex),
    /// JavaScript code.
    JavaScriptCode(String),
    /// JavaScript code with scope.
    JavaScriptCodeWithScope(JavaScriptCodeWithScope),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Timestamp.
    Timestamp(Timestamp),
    /// Binary data.
    Binary(Binary),
    /// ObjectId.
    ObjectId(ObjectId),
    /// UTC datetime.
    DateTime(DateTime),
    /// Symbol (deprecated).
    Symbol(String),
    /// 128-bit decimal floating point.
    Decimal128(Decimal128),
    /// Undefined value (deprecated).
    Undefined,
    /// Max key.
    MaxKey,
    /// Min key.
    MinKey,
    /// DBPointer (deprecated).
    DbPointer(DbPointer),
}

/// Alias for `Vec<Bson>`.
pub type Array = Vec<Bson>;

impl Eq for Bson {}

impl Hash for Bson {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Bson::Double(d) => d.to_bits().hash(state),
            Bson::String(s) => s.hash(state),
            Bson::Array(a) => a.hash(state),
            Bson::Document(d) => d.as_bytes().hash(state),
            Bson::Boolean(b) => b.hash(state),
            Bson::Null => {}
            Bson::RegularExpression(r) => r.hash(state),
            Bson::JavaScriptCode(c) => c.hash(state),
            Bson::JavaScriptCodeWithScope(c) => {
                c.code.hash(state);
                c.scope.as_bytes().hash(state);
            }
            Bson::Int32(i) => i.hash(state),
            Bson::Int64(i) => i.hash(state),
            Bson::Timestamp(t) => t.hash(state),
            Bson::Binary(b) => b.hash(state),
            Bson::ObjectId(o) => o.hash(state),
            Bson::DateTime(d) => d.hash(state),
            Bson::Symbol(s) => s.hash(state),
            Bson::Decimal128(d) => d.bytes().hash(state),
            Bson::Undefined | Bson::MaxKey | Bson::MinKey => {}
            Bson::DbPointer(d) => d.hash(state),
        }
    }
}

impl Bson {
    /// Returns the [`ElementType`] of this value.
    pub fn element_type(&self) -> ElementType {
        match self {
            Bson::Double(..) => ElementType::Double,
            Bson::String(..) => ElementType::String,
            Bson::Array(..) => ElementType::Array,
            Bson::Document(..) => ElementType::EmbeddedDocument,
            Bson::Boolean(..) => ElementType::Boolean,
            Bson::Null => ElementType::Null,
            Bson::RegularExpression(..) => ElementType::RegularExpression,
            Bson::JavaScriptCode(..) => ElementType::JavaScriptCode,
            Bson::JavaScriptCodeWithScope(..) => ElementType::JavaScriptCodeWithScope,
            Bson::Int32(..) => ElementType::Int32,
            Bson::Int64(..) => ElementType::Int64,
            Bson::Timestamp(..) => ElementType::Timestamp,
            Bson::Binary(..) => ElementType::Binary,
            Bson::ObjectId(..) => ElementType::ObjectId,
            Bson::DateTime(..) => ElementType::DateTime,
            Bson::Symbol(..) => ElementType::Symbol,
            Bson::Decimal128(..) => ElementType::Decimal128,
            Bson::Undefined => ElementType::Undefined,
            Bson::MaxKey => ElementType::MaxKey,
            Bson::MinKey => ElementType::MinKey,
            Bson::DbPointer(..) => ElementType::DbPointer,
        }
    }

    /// If this value is a `Double`, returns it, else `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// If this value is a `String`, returns its contents, else `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::String(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is an `Array`, returns it, else `None`.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Bson::Array(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is a `Document`, returns it, else `None`.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is a `Boolean`, returns it, else `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Bson::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// If this value is an `Int32`, returns it, else `None`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Bson::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// If this value is an `Int64`, returns it, else `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Bson::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Losslessly widens this value to an `i64` if it is an `Int32`, an `Int64`, a `Double` with
    /// an exact integer value, or a `Decimal128` with an integral value in range. Returns `None`
    /// for any other variant, or for a value that cannot be represented exactly.
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Bson::Int32(v) => Some(*v as i64),
            Bson::Int64(v) => Some(*v),
            Bson::Double(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
            Bson::Decimal128(d) => d.to_i64(),
            _ => None,
        }
    }

    /// If this value is an `ObjectId`, returns it, else `None`.
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Bson::ObjectId(v) => Some(*v),
            _ => None,
        }
    }

    /// If this value is a `Binary`, returns it, else `None`.
    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Bson::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is a `RegularExpression`, returns it, else `None`.
    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            Bson::RegularExpression(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is a `DateTime`, returns it, else `None`.
    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Bson::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// If this value is a `Symbol`, returns its contents, else `None`.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Bson::Symbol(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is a `Timestamp`, returns it, else `None`.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Bson::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// If this value is `Null`, returns `()`, else `None`.
    pub fn as_null(&self) -> Option<()> {
        match self {
            Bson::Null => Some(()),
            _ => None,
        }
    }

    /// If this value is a `DbPointer`, returns it, else `None`.
    pub fn as_db_pointer(&self) -> Option<&DbPointer> {
        match self {
            Bson::DbPointer(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is `JavaScriptCode`, returns its contents, else `None`.
    pub fn as_javascript(&self) -> Option<&str> {
        match self {
            Bson::JavaScriptCode(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is `JavaScriptCodeWithScope`, returns it, else `None`.
    pub fn as_javascript_with_scope(&self) -> Option<&JavaScriptCodeWithScope> {
        match self {
            Bson::JavaScriptCodeWithScope(v) => Some(v),
            _ => None,
        }
    }

    /// If this value is a `Decimal128`, returns it, else `None`.
    pub fn as_decimal128(&self) -> Option<&Decimal128> {
        match self {
            Bson::Decimal128(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Bson {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bson::Double(v) => write!(f, "{v}"),
            Bson::String(v) => write!(f, "{v:?}"),
            Bson::RegularExpression(re) => write!(f, "/{}/{}", re.pattern, re.options),
            Bson::JavaScriptCode(code) => write!(f, "{code}"),
            Bson::JavaScriptCodeWithScope(cws) => write!(f, "{}", cws.code),
            Bson::Int32(v) => write!(f, "{v}"),
            Bson::Int64(v) => write!(f, "{v}"),
            Bson::Timestamp(Timestamp { time, increment }) => {
                write!(f, "Timestamp({time}, {increment})")
            }
            Bson::Binary(bin) => write!(f, "{bin}"),
            Bson::ObjectId(oid) => write!(f, "{oid}"),
            Bson::DateTime(dt) => write!(f, "{dt}"),
            Bson::Symbol(v) => write!(f, "{v}"),
            Bson::Decimal128(v) => write!(f, "{v}"),
            Bson::DbPointer(DbPointer { namespace, id }) => {
                write!(f, "DbPointer({namespace}, {id})")
            }
            // No bespoke rendering for these; fall back to the derived Debug output.
            other => write!(f, "{other:?}"),
        }
    }
}

impl Default for Bson {
    fn default() -> Self {
        Bson::Null
    }
}

impl From<f64> for Bson {
    fn from(a: f64) -> Bson {
        Bson::Double(a)
    }
}

impl From<i32> for Bson {
    fn from(a: i32) -> Bson {
        Bson::Int32(a)
    }
}

impl From<i64> for Bson {
    fn from(a: i64) -> Bson {
        Bson::Int64(a)
    }
}

// Construction from a platform-width integer literal follows the native int width: Int64 on
// 64-bit platforms, Int32 on 32-bit ones.
#[cfg(target_pointer_width = "64")]
impl From<usize> for Bson {
    fn from(a: usize) -> Bson {
        Bson::Int64(a as i64)
    }
}
#[cfg(target_pointer_width = "32")]
impl From<usize> for Bson {
    fn from(a: usize) -> Bson {
        Bson::Int32(a as i32)
    }
}

impl From<String> for Bson {
    fn from(a: String) -> Bson {
        Bson::String(a)
    }
}

impl From<&str> for Bson {
    fn from(a: &str) -> Bson {
        Bson::String(a.to_owned())
    }
}

impl From<bool> for Bson {
    fn from(a: bool) -> Bson {
        Bson::Boolean(a)
    }
}

impl From<Array> for Bson {
    fn from(a: Array) -> Bson {
        Bson::Array(a)
    }
}

impl From<Document> for Bson {
    fn from(a: Document) -> Bson {
        Bson::Document(a)
    }
}

impl From<ObjectId> for Bson {
    fn from(a: ObjectId) -> Bson {
        Bson::ObjectId(a)
    }
}

impl From<DateTime> for Bson {
    fn from(a: DateTime) -> Bson {
        Bson::DateTime(a)
    }
}

impl From<Binary> for Bson {
    fn from(a: Binary) -> Bson {
        Bson::Binary(a)
    }
}

impl From<Regex> for Bson {
    fn from(a: Regex) -> Bson {
        Bson::RegularExpression(a)
    }
}

impl From<Timestamp> for Bson {
    fn from(a: Timestamp) -> Bson {
        Bson::Timestamp(a)
    }
}

impl From<Decimal128> for Bson {
    fn from(a: Decimal128) -> Bson {
        Bson::Decimal128(a)
    }
}

impl<T> From<Option<T>> for Bson
where
    T: Into<Bson>,
{
    fn from(a: Option<T>) -> Bson {
        match a {
            Some(v) => v.into(),
            None => Bson::Null,
        }
    }
}

impl<T> std::iter::FromIterator<T> for Bson
where
    T: Into<Bson>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Bson::Array(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn as_int64_widens_losslessly() {
        assert_eq!(Bson::Int32(5).as_int64(), Some(5));
        assert_eq!(Bson::Double(5.0).as_int64(), Some(5));
        assert_eq!(Bson::Double(5.5).as_int64(), None);
        assert_eq!(Bson::String("x".into()).as_int64(), None);
    }

    #[test]
    fn regex_options_are_sorted() {
        let re = Regex::new("end$", "xi");
        assert_eq!(re.options, "ix");
    }

    #[test]
    fn element_type_matches_variant() {
        assert_eq!(Bson::Null.element_type(), ElementType::Null);
        assert_eq!(Bson::Int64(1).element_type(), ElementType::Int64);
    }

    #[test]
    fn display_dispatches_to_each_variant() {
        assert_eq!(Bson::Int32(5).to_string(), "5");
        assert_eq!(Bson::String("hi".into()).to_string(), "\"hi\"");
        assert_eq!(
            Bson::RegularExpression(Regex::new("a", "i")).to_string(),
            "/a/i"
        );
        assert_eq!(
            Bson::Timestamp(Timestamp { time: 1, increment: 2 }).to_string(),
            "Timestamp(1, 2)"
        );
    }

    #[test]
    fn display_falls_back_to_debug_for_untyped_variants() {
        assert_eq!(Bson::Null.to_string(), "Null");
        assert_eq!(Bson::Boolean(true).to_string(), "Boolean(true)");
    }
}
