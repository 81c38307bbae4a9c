//! Structural hashing and equality over type graphs.
//!
//! The hash is a readable string usable as a memoization key: two types
//! with the same hash have the same shape under the chosen flags. Cycles
//! contribute `_cycle<n>_` markers where `n` is the DFS entry index of the
//! node being revisited; markers depend only on traversal order, so a type
//! and its deep copy hash identically.
//!
//! Equality is a separate, stricter relation: structural deep equality
//! ignoring declared type names, computed coinductively (a pair of nodes
//! already under comparison is assumed equal, which is what makes
//! recursive types comparable). It is not defined as hash equality.

use std::collections::{HashMap, HashSet};

use crate::design::{AttrId, Design, TypeId};
use crate::types::DataType;

/// Knobs controlling which parts of the structure feed the hash.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HashFlags {
    /// Hash object field types only, not their names.
    pub ignore_fields: bool,
    /// Leave declared user/result type names out.
    pub ignore_names: bool,
    /// Leave `rpc:tag` meta values out.
    pub ignore_tags: bool,
}

/// Hashes a type description under the given flags.
pub fn hash(d: &Design, dt: &DataType, flags: HashFlags) -> String {
    Hasher::new(d, flags).ty(dt)
}

/// Hashes the type of an attribute. Untyped attributes hash to `_nil_`.
pub fn hash_attr(d: &Design, aid: AttrId, flags: HashFlags) -> String {
    Hasher::new(d, flags).attr(aid)
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
enum Key {
    Attr(AttrId),
    Type(TypeId),
}

struct Hasher<'d> {
    d: &'d Design,
    flags: HashFlags,
    /// DFS stack: node -> entry index. Entries are removed on exit so
    /// shared non-cyclic nodes hash fully at each occurrence.
    stack: HashMap<Key, usize>,
    counter: usize,
}

impl<'d> Hasher<'d> {
    fn new(d: &'d Design, flags: HashFlags) -> Self {
        Hasher {
            d,
            flags,
            stack: HashMap::new(),
            counter: 0,
        }
    }

    fn enter(&mut self, key: Key) -> Result<usize, String> {
        if let Some(&n) = self.stack.get(&key) {
            return Err(format!("_cycle{n}_"));
        }
        let n = self.counter;
        self.counter += 1;
        self.stack.insert(key, n);
        Ok(n)
    }

    fn attr(&mut self, aid: AttrId) -> String {
        let key = Key::Attr(aid);
        if let Err(marker) = self.enter(key) {
            return marker;
        }
        let out = match self.d.attr(aid).ty.clone() {
            Some(ty) => self.ty(&ty),
            None => "_nil_".to_string(),
        };
        self.stack.remove(&key);
        out
    }

    fn ty(&mut self, dt: &DataType) -> String {
        match dt {
            DataType::Primitive(p) => p.name().to_string(),
            DataType::Array { elem } => format!("_array_+{}", self.attr(*elem)),
            DataType::Map { key, elem } => {
                format!("_map_+{}:{}", self.attr(*key), self.attr(*elem))
            }
            DataType::Object(o) => {
                let mut fields = o.entries();
                fields.sort_by(|(a, _), (b, _)| a.cmp(b));
                let mut out = String::from("_object_");
                for (name, fid) in fields {
                    let fh = self.attr(fid);
                    if self.flags.ignore_fields {
                        out.push('+');
                        out.push_str(&fh);
                    } else {
                        let mut label = name;
                        if !self.flags.ignore_tags {
                            if let Some(tag) = self.d.attr(fid).meta.rpc_tag() {
                                label = format!("{label}#{tag}");
                            }
                        }
                        out.push('+');
                        out.push_str(&label);
                        out.push(':');
                        out.push_str(&fh);
                    }
                }
                out
            }
            DataType::UserType(t) | DataType::ResultType(t) => self.named(*t),
        }
    }

    fn named(&mut self, tid: TypeId) -> String {
        let key = Key::Type(tid);
        if let Err(marker) = self.enter(key) {
            return marker;
        }
        let node = self.d.type_node(tid);
        let attr_hash = self.attr(node.attr);
        let out = if self.flags.ignore_names {
            attr_hash
        } else {
            format!("{};{attr_hash}", node.name)
        };
        self.stack.remove(&key);
        out
    }
}

/// Structural deep equality of two type descriptions, ignoring declared
/// type names.
pub fn equal(d: &Design, a: &DataType, b: &DataType) -> bool {
    Equality::new(d).ty(a, b)
}

/// Structural deep equality of two attribute types.
pub fn equal_attr(d: &Design, a: AttrId, b: AttrId) -> bool {
    Equality::new(d).attr(a, b)
}

struct Equality<'d> {
    d: &'d Design,
    /// Pairs currently under comparison, assumed equal (coinduction).
    assumed: HashSet<(AttrId, AttrId)>,
    /// Named types being unwrapped against a structural type, per side.
    unwrapping: HashSet<TypeId>,
}

impl<'d> Equality<'d> {
    fn new(d: &'d Design) -> Self {
        Equality {
            d,
            assumed: HashSet::new(),
            unwrapping: HashSet::new(),
        }
    }

    fn attr(&mut self, a: AttrId, b: AttrId) -> bool {
        if a == b {
            return true;
        }
        if !self.assumed.insert((a, b)) {
            return true;
        }
        let result = match (self.d.attr(a).ty.clone(), self.d.attr(b).ty.clone()) {
            (Some(ta), Some(tb)) => self.ty(&ta, &tb),
            (None, None) => true,
            _ => false,
        };
        self.assumed.remove(&(a, b));
        result
    }

    fn ty(&mut self, a: &DataType, b: &DataType) -> bool {
        use DataType::*;
        match (a, b) {
            (Primitive(p), Primitive(q)) => p == q,
            (Array { elem: ea }, Array { elem: eb }) => self.attr(*ea, *eb),
            (Map { key: ka, elem: ea }, Map { key: kb, elem: eb }) => {
                self.attr(*ka, *kb) && self.attr(*ea, *eb)
            }
            (Object(oa), Object(ob)) => {
                if oa.len() != ob.len() {
                    return false;
                }
                let mut fa = oa.entries();
                let mut fb = ob.entries();
                fa.sort_by(|(x, _), (y, _)| x.cmp(y));
                fb.sort_by(|(x, _), (y, _)| x.cmp(y));
                fa.iter().zip(fb.iter()).all(|((na, ia), (nb, ib))| {
                    na == nb && self.attr(*ia, *ib)
                })
            }
            (UserType(ta) | ResultType(ta), UserType(tb) | ResultType(tb)) => {
                ta == tb || self.attr(self.d.type_node(*ta).attr, self.d.type_node(*tb).attr)
            }
            // Named against structural: unwrap the named side once. A type
            // aliasing itself without intermediate structure equals nothing.
            (UserType(t) | ResultType(t), other) | (other, UserType(t) | ResultType(t)) => {
                if !self.unwrapping.insert(*t) {
                    return false;
                }
                let inner = self.d.attr(self.d.type_node(*t).attr).ty.clone();
                let result = inner.is_some_and(|ty| self.ty(&ty, other));
                self.unwrapping.remove(t);
                result
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Object, Primitive};

    fn rec_type(d: &mut Design, name: &str) -> TypeId {
        let holder = d.new_attr(DataType::Object(Object::new()));
        let tid = d.user_type(name, holder);
        let label = d.new_attr(DataType::Primitive(Primitive::String));
        let next = d.new_attr(DataType::UserType(tid));
        let mut o = Object::new();
        o.set("label", label);
        o.set("next", next);
        d.attr_mut(holder).ty = Some(DataType::Object(o));
        tid
    }

    #[test]
    fn primitive_and_composite_formats() {
        let mut d = Design::new();
        let i = d.new_attr(DataType::Primitive(Primitive::Int32));
        let s = d.new_attr(DataType::Primitive(Primitive::String));
        let flags = HashFlags::default();

        assert_eq!(
            hash(&d, &DataType::Primitive(Primitive::Boolean), flags),
            "boolean"
        );
        assert_eq!(
            hash(&d, &DataType::Array { elem: i }, flags),
            "_array_+int32"
        );
        assert_eq!(
            hash(&d, &DataType::Map { key: s, elem: i }, flags),
            "_map_+string:int32"
        );
    }

    #[test]
    fn object_fields_sort_by_name() {
        let mut d = Design::new();
        let i = d.new_attr(DataType::Primitive(Primitive::Int32));
        let s = d.new_attr(DataType::Primitive(Primitive::String));
        let mut o = Object::new();
        o.set("zeta", i);
        o.set("alpha", s);
        let dt = DataType::Object(o);
        assert_eq!(
            hash(&d, &dt, HashFlags::default()),
            "_object_+alpha:string+zeta:int32"
        );
        assert_eq!(
            hash(&d, &dt, HashFlags { ignore_fields: true, ..Default::default() }),
            "_object_+string+int32"
        );
    }

    #[test]
    fn rpc_tags_fold_into_field_labels() {
        let mut d = Design::new();
        let i = d.new_attr(DataType::Primitive(Primitive::Int32));
        d.attr_mut(i).meta.set(crate::meta::RPC_TAG, "2");
        let mut o = Object::new();
        o.set("id", i);
        let dt = DataType::Object(o);
        assert_eq!(
            hash(&d, &dt, HashFlags::default()),
            "_object_+id#2:int32"
        );
        assert_eq!(
            hash(&d, &dt, HashFlags { ignore_tags: true, ..Default::default() }),
            "_object_+id:int32"
        );
    }

    #[test]
    fn named_types_prefix_their_name_unless_ignored() {
        let mut d = Design::new();
        let s = d.new_attr(DataType::Primitive(Primitive::String));
        let mut o = Object::new();
        o.set("a", s);
        let attr = d.new_attr(DataType::Object(o));
        let t = d.user_type("Named", attr);
        let dt = DataType::UserType(t);
        assert_eq!(
            hash(&d, &dt, HashFlags::default()),
            "Named;_object_+a:string"
        );
        assert_eq!(
            hash(&d, &dt, HashFlags { ignore_names: true, ..Default::default() }),
            "_object_+a:string"
        );
    }

    #[test]
    fn recursive_hash_is_stable_under_dup() {
        let mut d = Design::new();
        let t = rec_type(&mut d, "Rec");
        let flags = HashFlags::default();
        let h = hash(&d, &DataType::UserType(t), flags);
        assert!(h.contains("_cycle"));

        let copy = d.dup_user_type(t);
        let hc = hash(&d, &DataType::UserType(copy), flags);
        assert_eq!(h, hc);
    }

    #[test]
    fn equal_ignores_declared_names() {
        let mut d = Design::new();
        let a = rec_type(&mut d, "First");
        let b = rec_type(&mut d, "Second");
        assert!(equal(&d, &DataType::UserType(a), &DataType::UserType(b)));
        assert_ne!(
            hash(&d, &DataType::UserType(a), HashFlags::default()),
            hash(&d, &DataType::UserType(b), HashFlags::default())
        );
    }

    #[test]
    fn equal_distinguishes_shapes() {
        let mut d = Design::new();
        let s = d.new_attr(DataType::Primitive(Primitive::String));
        let i = d.new_attr(DataType::Primitive(Primitive::Int));
        let mut oa = Object::new();
        oa.set("x", s);
        let mut ob = Object::new();
        ob.set("x", i);
        assert!(!equal(&d, &DataType::Object(oa.clone()), &DataType::Object(ob)));

        let mut renamed = Object::new();
        renamed.set("y", s);
        assert!(!equal(&d, &DataType::Object(oa), &DataType::Object(renamed)));
    }

    #[test]
    fn named_type_equals_its_structure() {
        let mut d = Design::new();
        let s = d.new_attr(DataType::Primitive(Primitive::String));
        let mut o = Object::new();
        o.set("a", s);
        let attr = d.new_attr(DataType::Object(o.clone()));
        let t = d.user_type("Wrapped", attr);
        assert!(equal(&d, &DataType::UserType(t), &DataType::Object(o)));
    }

    #[test]
    fn equal_attr_handles_recursion() {
        let mut d = Design::new();
        let a = rec_type(&mut d, "A");
        let b = rec_type(&mut d, "B");
        assert!(equal_attr(&d, d.type_node(a).attr, d.type_node(b).attr));
    }
}
