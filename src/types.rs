//! The closed set of data type variants and the convenience queries over
//! them.
//!
//! A `DataType` is a *description* of a value shape: scalar kinds, arrays,
//! maps, objects with named fields, and named user/result types. Composite
//! variants do not own their children directly; they point at attribute
//! nodes in the owning [`Design`] arena, which is what lets the same node be
//! shared by several parents and lets type graphs be cyclic.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use indexmap::IndexMap;

use crate::design::{AttrId, Design, TypeId};

/// Conceptual kind of a data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Boolean,
    Int,
    Int32,
    Int64,
    UInt,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Bytes,
    Any,
    Array,
    Object,
    Map,
    UserType,
    ResultType,
}

/// Scalar types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Boolean,
    Int,
    Int32,
    Int64,
    UInt,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Bytes,
    Any,
}

impl Primitive {
    pub fn kind(self) -> Kind {
        match self {
            Primitive::Boolean => Kind::Boolean,
            Primitive::Int => Kind::Int,
            Primitive::Int32 => Kind::Int32,
            Primitive::Int64 => Kind::Int64,
            Primitive::UInt => Kind::UInt,
            Primitive::UInt32 => Kind::UInt32,
            Primitive::UInt64 => Kind::UInt64,
            Primitive::Float32 => Kind::Float32,
            Primitive::Float64 => Kind::Float64,
            Primitive::String => Kind::String,
            Primitive::Bytes => Kind::Bytes,
            Primitive::Any => Kind::Any,
        }
    }

    /// Name appropriate for logging and hashing.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::UInt => "uint",
            Primitive::UInt32 => "uint32",
            Primitive::UInt64 => "uint64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
            Primitive::Any => "any",
        }
    }

    /// True if the JSON value could inhabit this primitive.
    pub fn is_compatible(self, val: &Value) -> bool {
        if self == Primitive::Any {
            return true;
        }
        match val {
            Value::Bool(_) => self == Primitive::Boolean,
            Value::Number(n) => match self {
                Primitive::Float32 | Primitive::Float64 => true,
                Primitive::Int | Primitive::Int32 | Primitive::Int64 => n.is_i64(),
                Primitive::UInt | Primitive::UInt32 | Primitive::UInt64 => n.is_u64(),
                _ => false,
            },
            Value::String(_) => self == Primitive::String || self == Primitive::Bytes,
            _ => false,
        }
    }

    pub fn zero_value(self) -> Value {
        match self {
            Primitive::Boolean => json!(false),
            Primitive::Int
            | Primitive::Int32
            | Primitive::Int64
            | Primitive::UInt
            | Primitive::UInt32
            | Primitive::UInt64 => json!(0),
            Primitive::Float32 | Primitive::Float64 => json!(0.0),
            Primitive::String | Primitive::Bytes => json!(""),
            Primitive::Any => Value::Null,
        }
    }
}

/// The closed polymorphic set of type descriptions.
///
/// `Array`/`Map` children and `Object` fields are attribute ids into the
/// design arena; `UserType`/`ResultType` are ids into the named-type table.
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
    Primitive(Primitive),
    Array { elem: AttrId },
    Map { key: AttrId, elem: AttrId },
    Object(Object),
    UserType(TypeId),
    ResultType(TypeId),
}

impl DataType {
    pub fn kind(&self) -> Kind {
        match self {
            DataType::Primitive(p) => p.kind(),
            DataType::Array { .. } => Kind::Array,
            DataType::Map { .. } => Kind::Map,
            DataType::Object(_) => Kind::Object,
            DataType::UserType(_) => Kind::UserType,
            DataType::ResultType(_) => Kind::ResultType,
        }
    }
}

impl From<Primitive> for DataType {
    fn from(p: Primitive) -> Self {
        DataType::Primitive(p)
    }
}

/// An ordered sequence of named attributes. Names are unique within one
/// object; insertion order is preserved on iteration but carries no meaning
/// for hashing or equality (those sort by name).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object {
    fields: IndexMap<String, AttrId>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the attribute with the given name if any.
    pub fn attribute(&self, name: &str) -> Option<AttrId> {
        self.fields.get(name).copied()
    }

    /// Replaces the named attribute if present (keeping its position),
    /// appends a new field otherwise.
    pub fn set(&mut self, name: impl Into<String>, att: AttrId) {
        self.fields.insert(name.into(), att);
    }

    /// Removes the named field, preserving the order of the rest.
    pub fn delete(&mut self, name: &str) {
        self.fields.shift_remove(name);
    }

    /// Renames field `from` to `to` in place. Does nothing if `from` is not
    /// a field.
    pub fn rename(&mut self, from: &str, to: &str) {
        if !self.fields.contains_key(from) || from == to {
            return;
        }
        self.fields = self
            .fields
            .iter()
            .map(|(k, &v)| {
                if k == from {
                    (to.to_string(), v)
                } else {
                    (k.clone(), v)
                }
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AttrId)> {
        self.fields.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Field list snapshot, handy when mutation must follow a read pass.
    pub fn entries(&self) -> Vec<(String, AttrId)> {
        self.fields.iter().map(|(k, &v)| (k.clone(), v)).collect()
    }
}

impl FromIterator<(String, AttrId)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, AttrId)>>(iter: I) -> Self {
        Object {
            fields: iter.into_iter().collect(),
        }
    }
}

// ------------------------- resolution helpers ------------------------- //

/// Returns the object underlying `dt`, resolving through named types.
pub fn as_object<'d>(d: &'d Design, dt: &'d DataType) -> Option<&'d Object> {
    match dt {
        DataType::Object(o) => Some(o),
        DataType::UserType(t) | DataType::ResultType(t) => {
            let att = d.attr(d.type_node(*t).attr);
            att.ty.as_ref().and_then(|ty| as_object(d, ty))
        }
        _ => None,
    }
}

/// Returns the element attribute of the array underlying `dt` if any.
pub fn as_array(d: &Design, dt: &DataType) -> Option<AttrId> {
    match dt {
        DataType::Array { elem } => Some(*elem),
        DataType::UserType(t) | DataType::ResultType(t) => {
            let att = d.attr(d.type_node(*t).attr);
            att.ty.as_ref().and_then(|ty| as_array(d, ty))
        }
        _ => None,
    }
}

/// Returns the (key, element) attributes of the map underlying `dt` if any.
pub fn as_map(d: &Design, dt: &DataType) -> Option<(AttrId, AttrId)> {
    match dt {
        DataType::Map { key, elem } => Some((*key, *elem)),
        DataType::UserType(t) | DataType::ResultType(t) => {
            let att = d.attr(d.type_node(*t).attr);
            att.ty.as_ref().and_then(|ty| as_map(d, ty))
        }
        _ => None,
    }
}

pub fn is_object(d: &Design, dt: &DataType) -> bool {
    as_object(d, dt).is_some()
}

pub fn is_array(d: &Design, dt: &DataType) -> bool {
    as_array(d, dt).is_some()
}

pub fn is_map(d: &Design, dt: &DataType) -> bool {
    as_map(d, dt).is_some()
}

/// True if `dt` is a primitive, possibly behind named-type aliases.
pub fn is_primitive(d: &Design, dt: &DataType) -> bool {
    match dt {
        DataType::Primitive(_) => true,
        DataType::UserType(t) | DataType::ResultType(t) => {
            let att = d.attr(d.type_node(*t).attr);
            att.ty.as_ref().is_some_and(|ty| is_primitive(d, ty))
        }
        _ => false,
    }
}

/// Display name of a type.
pub fn type_name(d: &Design, dt: &DataType) -> String {
    match dt {
        DataType::Primitive(p) => p.name().to_string(),
        DataType::Array { .. } => "array".to_string(),
        DataType::Map { .. } => "map".to_string(),
        DataType::Object(_) => "object".to_string(),
        DataType::UserType(t) | DataType::ResultType(t) => d.type_node(*t).name.clone(),
    }
}

/// Qualified name including element types of arrays and maps, used in error
/// messages: `array<string>`, `map<string, array<int32>>`.
pub fn qualified_type_name(d: &Design, dt: &DataType) -> String {
    match dt {
        DataType::Array { elem } => {
            let et = d.attr(*elem).ty.as_ref();
            format!(
                "array<{}>",
                et.map_or_else(|| "nil".to_string(), |t| qualified_type_name(d, t))
            )
        }
        DataType::Map { key, elem } => {
            let kt = d.attr(*key).ty.as_ref();
            let et = d.attr(*elem).ty.as_ref();
            format!(
                "map<{}, {}>",
                kt.map_or_else(|| "nil".to_string(), |t| qualified_type_name(d, t)),
                et.map_or_else(|| "nil".to_string(), |t| qualified_type_name(d, t)),
            )
        }
        _ => type_name(d, dt),
    }
}

/// True if the JSON value could inhabit the type.
pub fn is_compatible(d: &Design, dt: &DataType, val: &Value) -> bool {
    match dt {
        DataType::Primitive(p) => p.is_compatible(val),
        DataType::Array { elem } => match val {
            Value::Array(items) => {
                let et = d.attr(*elem).ty.clone();
                items.iter().all(|item| {
                    et.as_ref().is_some_and(|t| is_compatible(d, t, item))
                })
            }
            _ => false,
        },
        DataType::Map { key, elem } => match val {
            Value::Object(entries) => {
                // JSON map keys are strings; the key type must accept them.
                let kt = d.attr(*key).ty.clone();
                let et = d.attr(*elem).ty.clone();
                entries.iter().all(|(k, v)| {
                    let k_ok = kt
                        .as_ref()
                        .is_none_or(|t| is_compatible(d, t, &Value::String(k.clone())));
                    let v_ok = et.as_ref().is_none_or(|t| is_compatible(d, t, v));
                    k_ok && v_ok
                })
            }
            _ => false,
        },
        DataType::Object(_) => matches!(val, Value::Object(_)),
        DataType::UserType(t) | DataType::ResultType(t) => {
            let att = d.attr(d.type_node(*t).attr).ty.clone();
            att.is_some_and(|ty| is_compatible(d, &ty, val))
        }
    }
}

/// Zero value of the type, used to seed attributes during finalization.
pub fn zero_value(d: &Design, dt: &DataType) -> Value {
    match dt {
        DataType::Primitive(p) => p.zero_value(),
        DataType::Array { .. } => json!([]),
        DataType::Map { .. } | DataType::Object(_) => json!({}),
        DataType::UserType(t) | DataType::ResultType(t) => {
            match d.attr(d.type_node(*t).attr).ty.as_ref() {
                // Named types zero like their underlying shape. Objects are
                // matched here directly so cyclic types terminate.
                Some(DataType::Object(_)) => json!({}),
                Some(ty) => zero_value(d, &ty.clone()),
                None => Value::Null,
            }
        }
    }
}
