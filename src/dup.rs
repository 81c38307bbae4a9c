//! Cycle-safe deep copy of attributes and types.
//!
//! Copies allocate fresh arena nodes. A seen map keyed by source id keeps
//! the copy isomorphic to the source: shared nodes stay shared within the
//! copy and self-referential types copy to self-referential copies. The
//! Empty sentinel is never duplicated.

use std::collections::HashMap;

use crate::attribute::Attribute;
use crate::design::{AttrId, Design, EMPTY, TypeId};
use crate::types::{DataType, Object};

impl Design {
    /// Deep-copies an attribute and everything it reaches.
    pub fn dup_attr(&mut self, aid: AttrId) -> AttrId {
        Dupper::new(self).attr(aid)
    }

    /// Deep-copies a type description. Primitives copy trivially; composite
    /// and named types get fresh nodes.
    pub fn dup_type(&mut self, dt: &DataType) -> DataType {
        Dupper::new(self).ty(dt)
    }

    /// Deep-copies a named type, returning the copy's id. `EMPTY` is
    /// returned as-is.
    pub fn dup_user_type(&mut self, tid: TypeId) -> TypeId {
        Dupper::new(self).named(tid)
    }
}

struct Dupper<'d> {
    d: &'d mut Design,
    attrs: HashMap<AttrId, AttrId>,
    types: HashMap<TypeId, TypeId>,
}

impl<'d> Dupper<'d> {
    fn new(d: &'d mut Design) -> Self {
        Dupper {
            d,
            attrs: HashMap::new(),
            types: HashMap::new(),
        }
    }

    fn attr(&mut self, aid: AttrId) -> AttrId {
        if let Some(&copy) = self.attrs.get(&aid) {
            return copy;
        }
        // Allocate the copy before recursing so cycles resolve to it.
        let copy = self.d.push_attr(Attribute::default());
        self.attrs.insert(aid, copy);

        let src = self.d.attr(aid).clone();
        let ty = src.ty.as_ref().map(|t| self.ty(t));
        let bases = src.bases.iter().map(|t| self.ty(t)).collect();
        let references = src.references.iter().map(|t| self.ty(t)).collect();
        *self.d.attr_mut(copy) = Attribute {
            ty,
            bases,
            references,
            ..src
        };
        copy
    }

    fn ty(&mut self, dt: &DataType) -> DataType {
        match dt {
            DataType::Primitive(p) => DataType::Primitive(*p),
            DataType::Array { elem } => DataType::Array {
                elem: self.attr(*elem),
            },
            DataType::Map { key, elem } => DataType::Map {
                key: self.attr(*key),
                elem: self.attr(*elem),
            },
            DataType::Object(o) => {
                let copy: Object = o
                    .entries()
                    .into_iter()
                    .map(|(name, fid)| (name, self.attr(fid)))
                    .collect();
                DataType::Object(copy)
            }
            DataType::UserType(t) => DataType::UserType(self.named(*t)),
            DataType::ResultType(t) => DataType::ResultType(self.named(*t)),
        }
    }

    fn named(&mut self, tid: TypeId) -> TypeId {
        if tid == EMPTY {
            return EMPTY;
        }
        if let Some(&copy) = self.types.get(&tid) {
            return copy;
        }
        let src = self.d.type_node(tid).clone();
        // Placeholder node registered first; the backing attribute may
        // reach back to this very type.
        let placeholder = self.d.type_node(EMPTY).attr;
        let copy = self.d.user_type(src.name.clone(), placeholder);
        self.types.insert(tid, copy);

        let attr = self.attr(src.attr);
        self.d.type_node_mut(copy).attr = attr;
        self.d.type_node_mut(copy).finalized = src.finalized;
        if let Some(mut result) = src.result {
            for view in &mut result.views {
                view.attr = self.attr(view.attr);
            }
            self.d.type_node_mut(copy).result = Some(result);
        }
        copy
    }
}
