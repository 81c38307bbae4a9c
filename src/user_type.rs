//! Named types: user types, result types, views and media type
//! identifiers.
//!
//! A result type is a user type with a media type identifier and a set of
//! named views; each view selects a subset of the type's fields. The
//! `default` view always exists after finalization.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::design::{AttrId, Design, TypeId};
use crate::types::{DataType, as_array, as_object};

/// Name of the view synthesized for every result type.
pub const DEFAULT_VIEW: &str = "default";

/// A named type registered in the design.
#[derive(Clone, Debug)]
pub struct TypeNode {
    /// Display name. Renaming changes this, never the `TypeId`.
    pub name: String,
    /// Backing attribute describing the type's shape.
    pub attr: AttrId,
    /// Present on result types only.
    pub result: Option<ResultPart>,
    pub(crate) finalized: bool,
}

/// The result type half of a [`TypeNode`].
#[derive(Clone, Debug)]
pub struct ResultPart {
    /// Media type identifier, e.g. `application/vnd.bottle+json`.
    pub identifier: String,
    /// Content type sent over the wire; defaults to the identifier.
    pub content_type: String,
    pub views: Vec<View>,
}

/// A named field selection on a result type.
#[derive(Clone, Debug)]
pub struct View {
    pub name: String,
    /// Object-shaped attribute whose field names select the rendered
    /// fields; fields may carry a `view` meta tag nominating a sub-view.
    pub attr: AttrId,
}

impl Design {
    /// Changes the display name of a type. Identity is untouched.
    pub fn rename_type(&mut self, tid: TypeId, name: impl Into<String>) {
        self.type_node_mut(tid).name = name.into();
    }

    /// Looks up a view by name on a result type.
    pub fn view(&self, tid: TypeId, name: &str) -> Option<&View> {
        self.type_node(tid)
            .result
            .as_ref()
            .and_then(|r| r.views.iter().find(|v| v.name == name))
    }

    /// Adds a view to a result type. Registering a view on a plain user
    /// type is a bug.
    pub fn add_view(&mut self, tid: TypeId, name: impl Into<String>, attr: AttrId) {
        let node = self.type_node_mut(tid);
        let result = node
            .result
            .as_mut()
            .unwrap_or_else(|| panic!("cannot add view to non result type")); // bug
        result.views.push(View {
            name: name.into(),
            attr,
        });
    }

    /// True if the result type defines views beyond `default`.
    pub fn has_multiple_views(&self, tid: TypeId) -> bool {
        self.type_node(tid)
            .result
            .as_ref()
            .is_some_and(|r| r.views.iter().any(|v| v.name != DEFAULT_VIEW))
    }

    /// True if the type's shape is an array (a collection result type).
    pub fn is_collection(&self, tid: TypeId) -> bool {
        let aid = self.type_node(tid).attr;
        self.attr(aid)
            .ty
            .as_ref()
            .is_some_and(|ty| as_array(self, ty).is_some())
    }

    /// Synthesizes the `default` view when the result type does not define
    /// one: a copy of the backing attribute, with collections unwrapped to
    /// their element object so the view lists element fields.
    pub(crate) fn ensure_default_view(&mut self, tid: TypeId) {
        let has_default = self
            .type_node(tid)
            .result
            .as_ref()
            .is_some_and(|r| r.views.iter().any(|v| v.name == DEFAULT_VIEW));
        if has_default {
            return;
        }
        let aid = self.type_node(tid).attr;
        let copy = self.dup_attr(aid);
        if let Some(elem) = self
            .attr(copy)
            .ty
            .clone()
            .and_then(|ty| as_array(self, &ty))
        {
            let elem_obj = self
                .attr(elem)
                .ty
                .clone()
                .and_then(|ty| as_object(self, &ty).cloned());
            if let Some(o) = elem_obj {
                self.attr_mut(copy).ty = Some(DataType::Object(o));
            }
        }
        if let Some(result) = &mut self.type_node_mut(tid).result {
            result.views.push(View {
                name: DEFAULT_VIEW.to_string(),
                attr: copy,
            });
        }
    }
}

// --------------------------- media identifiers --------------------------- //

static MEDIA_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9!#$&^_.-]*/[a-zA-Z0-9][a-zA-Z0-9!#$&^_.+-]*$")
        .expect("media type pattern")
});

/// True if the identifier's base (before any parameters) is a
/// syntactically valid `type/subtype` media type.
pub fn is_media_type(identifier: &str) -> bool {
    let (base, _) = parse_media_type(identifier);
    MEDIA_TYPE_RE.is_match(&base)
}

/// Splits a media type identifier into its base and parameters. Parameters
/// are `key=value` pairs separated by `;`; malformed pieces are dropped.
pub fn parse_media_type(identifier: &str) -> (String, BTreeMap<String, String>) {
    let mut pieces = identifier.split(';');
    let base = pieces.next().unwrap_or_default().trim().to_string();
    let mut params = BTreeMap::new();
    for piece in pieces {
        if let Some((key, value)) = piece.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                params.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    (base, params)
}

/// Formats a media type identifier canonically: parameters sorted by name.
pub fn format_media_type(base: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = base.to_string();
    for (key, value) in params {
        out.push_str("; ");
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Canonical form of a media type identifier: any `+suffix` is stripped
/// from the subtype while the parameters are kept (sorted).
pub fn canonical_identifier(identifier: &str) -> String {
    let (base, params) = parse_media_type(identifier);
    let canonical_base = match base.split_once('+') {
        Some((prefix, _)) => prefix.to_string(),
        None => base,
    };
    format_media_type(&canonical_base, &params)
}

/// Identifier of a projection: the original identifier with a `view`
/// parameter naming the view, `default` included. The parameter is what
/// lets a projection be recognized as already projected.
pub(crate) fn project_identifier(identifier: &str, view: &str) -> String {
    let (base, mut params) = parse_media_type(identifier);
    params.insert("view".to_string(), view.to_string());
    format_media_type(&base, &params)
}

/// Upper-cases the first character, used when deriving projected type
/// names from view names.
pub(crate) fn title(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
