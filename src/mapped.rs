//! Mapped attributes: objects whose field names carry a second, external
//! name (header names, query parameter names and the like).
//!
//! Field names written as `"name:elem"` are split on construction: the
//! object keeps `name` and the adapter records `name -> elem` both ways.
//! The adapter owns a private deep copy of the attribute so callers can
//! rename and delete freely; `attribute()` recombines the stored names
//! back into `"name:elem"` form.

use indexmap::IndexMap;

use crate::design::{AttrId, Design};
use crate::types::{DataType, Object, as_object};

#[derive(Clone, Debug)]
pub struct MappedAttribute {
    /// Private copy of the underlying object attribute. Field names here
    /// are the attribute (key) names, already split.
    attr: AttrId,
    /// Attribute name to external element name, differing pairs only.
    name_map: IndexMap<String, String>,
    /// External element name back to attribute name.
    reverse_map: IndexMap<String, String>,
}

impl MappedAttribute {
    /// Builds a mapped attribute from an object-shaped attribute, splitting
    /// `"name:elem"` field names. The attribute is deep-copied; when it
    /// carries no validation, the named type's validation is adopted.
    pub fn new(d: &mut Design, att: AttrId) -> Self {
        let src = d.attr(att);
        let fallback_validation = match &src.ty {
            Some(ty) if as_object(d, ty).is_some() => match ty {
                DataType::UserType(t) | DataType::ResultType(t) => {
                    d.attr(d.type_node(*t).attr).validation.clone()
                }
                _ => None,
            },
            _ => panic!("cannot create a mapped attribute from a non object attribute"), // bug
        };
        let copy = d.dup_attr(att);
        if d.attr(copy).validation.is_none() {
            d.attr_mut(copy).validation = fallback_validation;
        }
        let mut ma = MappedAttribute {
            attr: copy,
            name_map: IndexMap::new(),
            reverse_map: IndexMap::new(),
        };
        ma.remap(d);
        ma
    }

    /// A mapped attribute over a fresh empty object.
    pub fn empty(d: &mut Design) -> Self {
        let attr = d.new_attr(DataType::Object(Object::new()));
        MappedAttribute {
            attr,
            name_map: IndexMap::new(),
            reverse_map: IndexMap::new(),
        }
    }

    /// Id of the private (split-name) attribute.
    pub fn attr_id(&self) -> AttrId {
        self.attr
    }

    /// Recomputes the name maps from the field names, splitting any
    /// `"name:elem"` entries and flattening the object in the process.
    /// Required names are rewritten to their key part.
    pub fn remap(&mut self, d: &mut Design) {
        self.name_map.clear();
        self.reverse_map.clear();
        let entries = {
            let ty = d.attr(self.attr).ty.clone();
            ty.as_ref()
                .and_then(|t| as_object(d, t))
                .map(Object::entries)
                .unwrap_or_default()
        };
        let mut flat = Object::new();
        for (name, fid) in entries {
            match name.split_once(':') {
                Some((key, elem)) => {
                    flat.set(key, fid);
                    if key != elem && !elem.is_empty() {
                        self.name_map.insert(key.to_string(), elem.to_string());
                        self.reverse_map.insert(elem.to_string(), key.to_string());
                    }
                }
                None => flat.set(name, fid),
            }
        }
        d.attr_mut(self.attr).ty = Some(DataType::Object(flat));
        if let Some(rules) = &mut d.attr_mut(self.attr).validation {
            for r in rules.required.iter_mut() {
                if let Some((key, _)) = r.split_once(':') {
                    *r = key.to_string();
                }
            }
        }
    }

    /// Maps an existing attribute to an external element name. Mapping an
    /// unknown attribute is a bug.
    pub fn map(&mut self, d: &Design, elem_name: impl Into<String>, key_name: impl Into<String>) {
        let key_name = key_name.into();
        let elem_name = elem_name.into();
        if d.find(self.attr, &key_name).is_none() {
            panic!("attempt to map unknown attribute {key_name:?}"); // bug
        }
        if let Some(old) = self.name_map.insert(key_name.clone(), elem_name.clone()) {
            self.reverse_map.shift_remove(&old);
        }
        self.reverse_map.insert(elem_name, key_name);
    }

    /// External element name of an attribute, the attribute name itself
    /// when unmapped. Unknown attributes are a bug.
    pub fn elem_name(&self, d: &Design, key_name: &str) -> String {
        if d.find(self.attr, key_name).is_none() {
            panic!("attempt to lookup unknown attribute {key_name:?}"); // bug
        }
        self.name_map
            .get(key_name)
            .cloned()
            .unwrap_or_else(|| key_name.to_string())
    }

    /// Attribute name behind an external element name. Unknown names are a
    /// bug; use [`find_key`](Self::find_key) for a fallible lookup.
    pub fn key_name(&self, d: &Design, elem_name: &str) -> String {
        self.find_key(d, elem_name)
            .unwrap_or_else(|| panic!("attempt to lookup unknown element {elem_name:?}")) // bug
    }

    /// Attribute name behind an external element name, if the attribute
    /// exists.
    pub fn find_key(&self, d: &Design, elem_name: &str) -> Option<String> {
        let key = self
            .reverse_map
            .get(elem_name)
            .cloned()
            .unwrap_or_else(|| elem_name.to_string());
        d.find(self.attr, &key).map(|_| key)
    }

    /// Removes an attribute and its mapping.
    pub fn delete(&mut self, d: &mut Design, key_name: &str) {
        d.delete_field(self.attr, key_name);
        if let Some(elem) = self.name_map.shift_remove(key_name) {
            self.reverse_map.shift_remove(&elem);
        }
    }

    pub fn is_empty(&self, d: &Design) -> bool {
        d.attr(self.attr)
            .ty
            .as_ref()
            .and_then(|ty| as_object(d, ty))
            .is_none_or(Object::is_empty)
    }

    /// Recombined form: a fresh copy whose mapped fields are named
    /// `"name:elem"` again.
    pub fn attribute(&self, d: &mut Design) -> AttrId {
        let copy = d.dup_attr(self.attr);
        let entries = {
            let ty = d.attr(copy).ty.clone();
            ty.as_ref()
                .and_then(|t| as_object(d, t))
                .map(Object::entries)
                .unwrap_or_default()
        };
        let mut combined = Object::new();
        for (name, fid) in entries {
            match self.name_map.get(&name) {
                Some(elem) => combined.set(format!("{name}:{elem}"), fid),
                None => combined.set(name, fid),
            }
        }
        d.attr_mut(copy).ty = Some(DataType::Object(combined));
        copy
    }

    /// Merges another mapped attribute into this one: both sides are
    /// recombined, merged destructively and split again, so `other`'s
    /// mappings win for overridden fields.
    pub fn merge(&mut self, d: &mut Design, other: &MappedAttribute) {
        let mine = self.attribute(d);
        let theirs = other.attribute(d);
        d.merge_attr(mine, theirs);
        self.attr = mine;
        self.remap(d);
    }

    /// Visits `(attribute name, element name, attribute)` for every field.
    pub fn walk_mapped(&self, d: &Design, mut f: impl FnMut(&str, &str, AttrId)) {
        let Some(ty) = d.attr(self.attr).ty.as_ref() else {
            return;
        };
        let Some(o) = as_object(d, ty) else {
            return;
        };
        for (name, fid) in o.iter() {
            let elem = self.name_map.get(name).map(String::as_str).unwrap_or(name);
            f(name, elem, fid);
        }
    }
}
