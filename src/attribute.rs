//! Attribute nodes and the merge/inherit algorithms that combine them.
//!
//! An attribute describes a single named value: its type, documentation,
//! validation rules, default, examples and tags. Attributes compose two
//! ways and the distinction matters everywhere in this file:
//!
//! - `bases` merge *destructively*: base fields are copied in wholesale,
//!   overriding like-named fields.
//! - `references` inherit *additively*: only properties the attribute has
//!   not set itself are filled in, recursively through matching fields.

use serde_json::Value;

use crate::design::{AttrId, Design, EMPTY};
use crate::meta::Meta;
use crate::types::{DataType, Object, as_object};
use crate::validation::ValidationRules;

/// External documentation pointer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Docs {
    pub description: Option<String>,
    pub url: Option<String>,
}

/// A single example value with optional prose.
#[derive(Clone, Debug, PartialEq)]
pub struct ExampleValue {
    pub summary: String,
    pub description: Option<String>,
    pub value: Value,
}

/// A node of the design graph.
///
/// `ty` is `None` until the prepare pass runs; afterwards every reachable
/// attribute has a type (defaulting to the Empty sentinel).
#[derive(Clone, Debug, Default)]
pub struct Attribute {
    /// The attribute type. `None` only before preparation.
    pub ty: Option<DataType>,
    /// Types whose fields are merged in destructively during finalization.
    pub bases: Vec<DataType>,
    /// Types whose properties fill in missing ones during finalization.
    pub references: Vec<DataType>,
    pub description: Option<String>,
    pub docs: Option<Docs>,
    pub validation: Option<ValidationRules>,
    /// Default used when the value is absent.
    pub default_value: Option<Value>,
    /// Zero value of the type, computed during finalization.
    pub zero_value: Option<Value>,
    pub examples: Vec<ExampleValue>,
    pub meta: Meta,
    pub(crate) prepared: bool,
    pub(crate) finalized: bool,
}

impl Attribute {
    pub fn typed(ty: DataType) -> Self {
        Attribute {
            ty: Some(ty),
            ..Default::default()
        }
    }

    /// True if the validation rules mark the field required.
    pub fn is_required(&self, field: &str) -> bool {
        self.validation
            .as_ref()
            .is_some_and(|v| v.is_required(field))
    }
}

impl Design {
    /// Looks up a field by name on an object-shaped attribute. The
    /// attribute's own type is searched first, then its bases, then its
    /// references, in order.
    pub fn find(&self, aid: AttrId, name: &str) -> Option<AttrId> {
        let att = self.attr(aid);
        let lookup = |dt: &DataType| -> Option<AttrId> {
            as_object(self, dt).and_then(|o| o.attribute(name))
        };
        if let Some(found) = att.ty.as_ref().and_then(|dt| lookup(dt)) {
            return Some(found);
        }
        for base in &att.bases {
            if let Some(found) = lookup(base) {
                return Some(found);
            }
        }
        for reference in &att.references {
            if let Some(found) = lookup(reference) {
                return Some(found);
            }
        }
        None
    }

    /// Removes the named field from the underlying object, from the
    /// required list and from any object-valued examples. Does nothing if
    /// the attribute is not object-shaped.
    pub fn delete_field(&mut self, aid: AttrId, name: &str) {
        if let Some(storage) = self.object_storage(aid) {
            if let Some(DataType::Object(o)) = &mut self.attr_mut(storage).ty {
                o.delete(name);
            }
        }
        let att = self.attr_mut(aid);
        if let Some(v) = &mut att.validation {
            v.remove_required(name);
        }
        for ex in &mut att.examples {
            if let Value::Object(map) = &mut ex.value {
                map.remove(name);
            }
        }
    }

    /// Required field names, delegating to the named type's attribute when
    /// the attribute itself carries no validation.
    pub fn all_required(&self, aid: AttrId) -> Vec<String> {
        let att = self.attr(aid);
        if let Some(v) = &att.validation {
            return v.required.clone();
        }
        match &att.ty {
            Some(DataType::UserType(t)) | Some(DataType::ResultType(t)) => {
                self.all_required(self.type_node(*t).attr)
            }
            _ => Vec::new(),
        }
    }

    pub fn is_required(&self, aid: AttrId, field: &str) -> bool {
        self.all_required(aid).iter().any(|n| n == field)
    }

    /// True if the field is required and carries no default value.
    pub fn is_required_no_default(&self, aid: AttrId, field: &str) -> bool {
        self.is_required(aid, field)
            && self
                .find(aid, field)
                .is_none_or(|f| self.attr(f).default_value.is_none())
    }

    /// True if the named field exists and has a default value.
    pub fn has_default_value(&self, aid: AttrId, field: &str) -> bool {
        self.find(aid, field)
            .is_some_and(|f| self.attr(f).default_value.is_some())
    }

    /// True if any field of the underlying object has a default value.
    pub fn has_default_values(&self, aid: AttrId) -> bool {
        let Some(ty) = self.attr(aid).ty.as_ref() else {
            return false;
        };
        match as_object(self, ty) {
            Some(o) => o
                .entries()
                .iter()
                .any(|(_, f)| self.attr(*f).default_value.is_some()),
            None => false,
        }
    }

    /// Default value of the named field. Falls through to the named type's
    /// attribute when the field aliases a primitive user type.
    pub fn get_default(&self, aid: AttrId, field: &str) -> Option<Value> {
        let fid = self.find(aid, field)?;
        let att = self.attr(fid);
        if let Some(v) = &att.default_value {
            return Some(v.clone());
        }
        match &att.ty {
            Some(DataType::UserType(t)) | Some(DataType::ResultType(t)) => {
                let inner = self.attr(self.type_node(*t).attr);
                match &inner.ty {
                    Some(DataType::Primitive(_)) => inner.default_value.clone(),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn set_default(&mut self, aid: AttrId, value: Value) {
        self.attr_mut(aid).default_value = Some(value);
    }

    pub fn has_tag(&self, aid: AttrId, tag: &str) -> bool {
        self.attr(aid).meta.contains(tag)
    }

    pub fn has_tag_prefix(&self, aid: AttrId, prefix: &str) -> bool {
        self.attr(aid).meta.has_prefix(prefix)
    }

    /// Visits every attribute reachable from `aid` exactly once, cycles
    /// included. The root itself is visited first.
    pub fn walk_attr(&self, aid: AttrId, f: &mut impl FnMut(AttrId)) {
        let mut seen = std::collections::HashSet::new();
        self.walk_attr_guarded(aid, f, &mut seen);
    }

    fn walk_attr_guarded(
        &self,
        aid: AttrId,
        f: &mut impl FnMut(AttrId),
        seen: &mut std::collections::HashSet<AttrId>,
    ) {
        if !seen.insert(aid) {
            return;
        }
        f(aid);
        let mut children = Vec::new();
        let att = self.attr(aid);
        for dt in att
            .ty
            .iter()
            .chain(att.bases.iter())
            .chain(att.references.iter())
        {
            match dt {
                DataType::Primitive(_) => {}
                DataType::Array { elem } => children.push(*elem),
                DataType::Map { key, elem } => {
                    children.push(*key);
                    children.push(*elem);
                }
                DataType::Object(o) => children.extend(o.iter().map(|(_, fid)| fid)),
                DataType::UserType(t) | DataType::ResultType(t) => {
                    children.push(self.type_node(*t).attr)
                }
            }
        }
        for child in children {
            self.walk_attr_guarded(child, f, seen);
        }
    }

    /// Name of the first field carrying the given meta tag, if any.
    pub fn tagged_attribute(&self, aid: AttrId, tag: &str) -> Option<String> {
        let ty = self.attr(aid).ty.as_ref()?;
        let o = as_object(self, ty)?;
        o.iter()
            .find(|(_, f)| self.attr(*f).meta.contains(tag))
            .map(|(name, _)| name.to_string())
    }

    /// Walks the fields of the underlying object, also visiting fields
    /// contributed by bases and references (one level, not recursive).
    pub fn walk_fields(&self, aid: AttrId, mut f: impl FnMut(&str, AttrId)) {
        let att = self.attr(aid);
        let visit = |dt: &DataType, f: &mut dyn FnMut(&str, AttrId)| {
            if let Some(o) = as_object(self, dt) {
                for (name, fid) in o.iter() {
                    f(name, fid);
                }
            }
        };
        if let Some(ty) = &att.ty {
            visit(ty, &mut f);
        }
        for base in &att.bases {
            visit(base, &mut f);
        }
        for reference in &att.references {
            visit(reference, &mut f);
        }
    }

    /// Attribute whose `ty` is the plain object backing `aid`, resolving
    /// through named types. `None` when not object-shaped.
    pub(crate) fn object_storage(&self, aid: AttrId) -> Option<AttrId> {
        match self.attr(aid).ty.as_ref()? {
            DataType::Object(_) => Some(aid),
            DataType::UserType(t) | DataType::ResultType(t) => {
                self.object_storage(self.type_node(*t).attr)
            }
            _ => None,
        }
    }

    /// Merges the fields and validations of `other` into `aid`. Fields of
    /// `other` override like-named fields. Both attributes must be
    /// object-shaped.
    pub fn merge_attr(&mut self, aid: AttrId, other: AttrId) {
        let other_ty = self.attr(other).ty.clone();
        let other_obj = other_ty
            .as_ref()
            .and_then(|ty| as_object(self, ty))
            .cloned()
            .unwrap_or_else(|| panic!("cannot merge from non object attribute")); // bug

        // Swap the Empty sentinel for a fresh mutable object before adding
        // fields; Empty itself must never grow fields.
        if self.attr(aid).ty == Some(DataType::UserType(EMPTY)) && !other_obj.is_empty() {
            self.attr_mut(aid).ty = Some(DataType::Object(Object::new()));
        }

        if let Some(other_val) = self.attr(other).validation.clone() {
            match &mut self.attr_mut(aid).validation {
                Some(v) => v.merge(&other_val),
                slot @ None => *slot = Some(other_val),
            }
        }

        let storage = self
            .object_storage(aid)
            .unwrap_or_else(|| panic!("cannot merge into non object attribute")); // bug
        for (name, fid) in other_obj.entries() {
            if let Some(DataType::Object(o)) = &mut self.attr_mut(storage).ty {
                o.set(name, fid);
            }
        }
    }

    /// Fills in properties of `aid` from `parent` without overriding
    /// anything already set, recursing into like-named fields. Both sides
    /// must resolve to objects for anything to happen.
    pub fn inherit(&mut self, aid: AttrId, parent: AttrId) {
        let mut seen = std::collections::HashSet::new();
        self.inherit_guarded(aid, parent, &mut seen);
    }

    fn inheritable(&self, aid: AttrId, parent: AttrId) -> bool {
        let a_obj = self
            .attr(aid)
            .ty
            .as_ref()
            .is_some_and(|ty| as_object(self, ty).is_some());
        let p_obj = self
            .attr(parent)
            .ty
            .as_ref()
            .is_some_and(|ty| as_object(self, ty).is_some());
        a_obj && p_obj
    }

    fn inherit_guarded(
        &mut self,
        aid: AttrId,
        parent: AttrId,
        seen: &mut std::collections::HashSet<AttrId>,
    ) {
        if !self.inheritable(aid, parent) {
            return;
        }
        self.inherit_validations(aid, parent);

        let fields = {
            let ty = self.attr(aid).ty.clone();
            ty.as_ref()
                .and_then(|t| as_object(self, t))
                .map(Object::entries)
                .unwrap_or_default()
        };
        for (name, fid) in fields {
            let Some(pfid) = ({
                let pty = self.attr(parent).ty.clone();
                pty.as_ref()
                    .and_then(|t| as_object(self, t))
                    .and_then(|o| o.attribute(&name))
            }) else {
                continue;
            };

            let (p_desc, p_default, p_ty) = {
                let p = self.attr(pfid);
                (p.description.clone(), p.default_value.clone(), p.ty.clone())
            };
            {
                let a = self.attr_mut(fid);
                if a.description.is_none() {
                    a.description = p_desc;
                }
                if a.default_value.is_none() {
                    a.default_value = p_default;
                }
                // The Empty sentinel stands in for "no type yet" after
                // preparation, so it counts as unset here.
                if a.ty.is_none() || a.ty == Some(DataType::UserType(EMPTY)) {
                    a.ty = p_ty;
                }
            }
            self.inherit_validations(fid, pfid);
            if self.inheritable(fid, pfid) {
                // Cycle guard: recursive types inherit each level once.
                if !seen.insert(fid) {
                    continue;
                }
                self.inherit_guarded(fid, pfid, seen);
            }
        }
    }

    fn inherit_validations(&mut self, aid: AttrId, parent: AttrId) {
        let Some(parent_val) = self.attr(parent).validation.clone() else {
            return;
        };
        match &mut self.attr_mut(aid).validation {
            Some(v) => v.add_required(parent_val.required.iter().cloned()),
            slot @ None => {
                *slot = Some(ValidationRules {
                    required: parent_val.required.clone(),
                    ..Default::default()
                })
            }
        }
    }
}
