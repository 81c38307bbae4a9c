//! The design arena and the build pipeline.
//!
//! All attribute nodes and named types live in two flat vectors owned by
//! [`Design`]; the graph refers to nodes by index ([`AttrId`], [`TypeId`]).
//! Indices are stable identities: nodes are never removed, so shared and
//! cyclic structure costs nothing and every algorithm can key its traversal
//! state by id.
//!
//! A design is built in stages, mirroring how a DSL runner drives it:
//! registered initializer closures run first (in generations, so closures
//! may register more closures), then every reachable node is prepared,
//! validated and finalized. Validation accumulates all violations before
//! reporting; preparation and finalization are idempotent per node.

use std::collections::HashSet;

use serde_json::Value;

use crate::attribute::Attribute;
use crate::error::{BuildError, ValidationErrors};
use crate::project::project;
use crate::types::{DataType, Object, as_object, is_compatible, qualified_type_name, zero_value};
use crate::user_type::{ResultPart, TypeNode};
use crate::validation::ValidationRules;

/// Stable identity of an attribute node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub(crate) u32);

impl AttrId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn test(n: u32) -> Self {
        AttrId(n)
    }
}

/// Stable identity of a named (user or result) type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The Empty sentinel type: an object with no fields, allocated in slot 0
/// of every design. Attributes without an explicit type resolve to it after
/// preparation. It is shared, never duplicated and never mutated.
pub const EMPTY: TypeId = TypeId(0);

/// Deferred initializer closure.
pub type Init = Box<dyn FnOnce(&mut Design)>;

/// Maximum number of initializer generations before the pipeline gives up.
const MAX_INIT_GENERATIONS: usize = 100;

/// Arena owning every attribute and named type of one design document.
#[derive(Default)]
pub struct Design {
    pub(crate) attrs: Vec<Attribute>,
    pub(crate) types: Vec<TypeNode>,
    inits: Vec<Init>,
    roots: Vec<AttrId>,
}

impl Design {
    /// Creates an empty design holding only the Empty sentinel.
    pub fn new() -> Self {
        let mut d = Design::default();
        let mut empty_attr = Attribute::typed(DataType::Object(Object::new()));
        empty_attr.description = Some("Empty represents empty values".to_string());
        let aid = d.push_attr(empty_attr);
        d.types.push(TypeNode {
            name: "Empty".to_string(),
            attr: aid,
            result: None,
            finalized: false,
        });
        d
    }

    // ------------------------------ arena ------------------------------ //

    pub fn push_attr(&mut self, att: Attribute) -> AttrId {
        let id = AttrId(self.attrs.len() as u32);
        self.attrs.push(att);
        id
    }

    /// Allocates an attribute of the given type with no other properties.
    pub fn new_attr(&mut self, ty: DataType) -> AttrId {
        self.push_attr(Attribute::typed(ty))
    }

    pub fn attr(&self, id: AttrId) -> &Attribute {
        &self.attrs[id.index()]
    }

    pub fn attr_mut(&mut self, id: AttrId) -> &mut Attribute {
        &mut self.attrs[id.index()]
    }

    pub fn type_node(&self, id: TypeId) -> &TypeNode {
        &self.types[id.index()]
    }

    pub fn type_node_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.index()]
    }

    /// Registers a named user type backed by the given attribute.
    pub fn user_type(&mut self, name: impl Into<String>, attr: AttrId) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeNode {
            name: name.into(),
            attr,
            result: None,
            finalized: false,
        });
        id
    }

    /// Registers a named result type with the given media type identifier.
    pub fn result_type(
        &mut self,
        name: impl Into<String>,
        identifier: impl Into<String>,
        attr: AttrId,
    ) -> TypeId {
        let identifier = identifier.into();
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeNode {
            name: name.into(),
            attr,
            result: Some(ResultPart {
                content_type: identifier.clone(),
                identifier,
                views: Vec::new(),
            }),
            finalized: false,
        });
        id
    }

    /// Number of named types, Empty included.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn iter_types(&self) -> impl Iterator<Item = (TypeId, &TypeNode)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, n)| (TypeId(i as u32), n))
    }

    /// Looks up a named type by display name.
    pub fn type_named(&self, name: &str) -> Option<TypeId> {
        self.iter_types()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| id)
    }

    // ----------------------------- pipeline ---------------------------- //

    /// Defers an initializer to the next pipeline run. Initializers may
    /// register further initializers; those run in the following generation.
    pub fn register(&mut self, init: impl FnOnce(&mut Design) + 'static) {
        self.inits.push(Box::new(init));
    }

    /// Marks an attribute as a root of the design so the pipeline reaches
    /// it even when no named type refers to it.
    pub fn add_root(&mut self, aid: AttrId) {
        self.roots.push(aid);
    }

    pub fn roots(&self) -> &[AttrId] {
        &self.roots
    }

    /// Runs the full pipeline: drains deferred initializers, prepares every
    /// reachable node, validates in bulk and finalizes. Returns the first
    /// hard failure; validation failures report every violation found.
    pub fn run_pipeline(&mut self) -> Result<(), BuildError> {
        let mut generations = 0;
        while !self.inits.is_empty() {
            generations += 1;
            if generations > MAX_INIT_GENERATIONS {
                return Err(BuildError::InitializerLoop);
            }
            let batch = std::mem::take(&mut self.inits);
            for init in batch {
                init(self);
            }
        }

        self.prepare_all();
        self.validate_all().into_result().map_err(BuildError::Validation)?;
        self.finalize_all();
        Ok(())
    }

    // ----------------------------- prepare ----------------------------- //

    fn prepare_all(&mut self) {
        for i in 0..self.types.len() {
            let node = &self.types[i];
            let mut pending = vec![node.attr];
            if let Some(result) = &node.result {
                pending.extend(result.views.iter().map(|v| v.attr));
            }
            for aid in pending {
                self.prepare_attr(aid);
            }
        }
        for aid in self.roots.clone() {
            self.prepare_attr(aid);
        }
    }

    /// Gives the attribute its resting defaults: untyped attributes become
    /// the Empty sentinel and missing validations become the empty rule
    /// set. Recurses through children, bases and references.
    pub fn prepare_attr(&mut self, aid: AttrId) {
        if self.attr(aid).prepared {
            return;
        }
        {
            let att = self.attr_mut(aid);
            att.prepared = true;
            if att.ty.is_none() {
                att.ty = Some(DataType::UserType(EMPTY));
            }
            if att.validation.is_none() {
                att.validation = Some(ValidationRules::default());
            }
        }
        let mut children = Vec::new();
        let att = self.attr(aid);
        if let Some(ty) = &att.ty {
            self.collect_children(ty, &mut children);
        }
        for dt in att.bases.iter().chain(att.references.iter()) {
            self.collect_children(dt, &mut children);
        }
        for child in children {
            self.prepare_attr(child);
        }
    }

    fn collect_children(&self, dt: &DataType, out: &mut Vec<AttrId>) {
        match dt {
            DataType::Primitive(_) => {}
            DataType::Array { elem } => out.push(*elem),
            DataType::Map { key, elem } => {
                out.push(*key);
                out.push(*elem);
            }
            DataType::Object(o) => out.extend(o.iter().map(|(_, f)| f)),
            DataType::UserType(t) | DataType::ResultType(t) => {
                out.push(self.type_node(*t).attr)
            }
        }
    }

    // ----------------------------- validate ---------------------------- //

    /// Validates every named type and root attribute, accumulating all
    /// violations. Never fails fast.
    pub fn validate_all(&self) -> ValidationErrors {
        let mut verr = ValidationErrors::new();
        let mut seen = HashSet::new();
        for (tid, node) in self.iter_types() {
            if tid == EMPTY {
                continue;
            }
            let parent = self.eval_name(tid);
            verr.merge(self.validate_attr(node.attr, "", &parent, &mut seen));
            if let Some(result) = &node.result {
                if !crate::user_type::is_media_type(&result.identifier) {
                    verr.add(
                        parent.as_str(),
                        format!("invalid media type identifier {:?}", result.identifier),
                    );
                }
                verr.merge(self.validate_views(tid, result, &parent));
            }
        }
        for &aid in &self.roots {
            verr.merge(self.validate_attr(aid, "", "attribute", &mut seen));
        }
        verr
    }

    /// Evaluation name of a type, used as error context.
    pub fn eval_name(&self, tid: TypeId) -> String {
        let node = self.type_node(tid);
        match &node.result {
            Some(r) => format!("result type {:?}", r.identifier),
            None => format!("type {:?}", node.name),
        }
    }

    fn validate_attr(
        &self,
        aid: AttrId,
        ctx: &str,
        parent: &str,
        seen: &mut HashSet<AttrId>,
    ) -> ValidationErrors {
        let mut verr = ValidationErrors::new();
        if !seen.insert(aid) {
            return verr;
        }
        let att = self.attr(aid);
        let label = if ctx.is_empty() {
            String::new()
        } else {
            format!("{ctx}: ")
        };

        let Some(ty) = &att.ty else {
            verr.add(parent, format!("{label}attribute type is nil"));
            return verr;
        };

        if let Some(rules) = &att.validation {
            let rctx = if ctx.is_empty() { "attribute" } else { ctx };
            verr.merge(rules.validate(rctx, parent));
            if let DataType::Primitive(p) = ty {
                for val in &rules.values {
                    if !p.is_compatible(val) {
                        verr.add(
                            parent,
                            format!(
                                "{label}enum value {val} is incompatible with type {}",
                                p.name()
                            ),
                        );
                    }
                }
            }
            if let Some(def) = &att.default_value {
                if !rules.values.is_empty() && !rules.values.contains(def) {
                    verr.add(
                        parent,
                        format!("{label}default value {def} is not one of the enum values"),
                    );
                }
            }
        }
        if let Some(def) = &att.default_value {
            if !is_compatible(self, ty, def) {
                verr.add(
                    parent,
                    format!(
                        "{label}default value {def} is incompatible with type {}",
                        qualified_type_name(self, ty)
                    ),
                );
            }
        }

        verr.merge(self.validate_view_tag(aid, &label, parent));

        if let Some(o) = as_object(self, ty) {
            for req in self.all_required(aid) {
                if self.find(aid, &req).is_none() {
                    verr.add(
                        parent,
                        format!(
                            "{label}required field {req:?} does not exist in type {}",
                            qualified_type_name(self, ty)
                        ),
                    );
                }
            }
            for (name, fid) in o.entries() {
                verr.merge(self.validate_attr(fid, &format!("field {name:?}"), parent, seen));
            }
        } else if let DataType::Array { elem } = ty {
            verr.merge(self.validate_attr(*elem, "array element", parent, seen));
        } else if let DataType::Map { key, elem } = ty {
            verr.merge(self.validate_attr(*key, "map key", parent, seen));
            verr.merge(self.validate_attr(*elem, "map value", parent, seen));
        }
        verr
    }

    /// Checks that a view tag, if present, nominates a view the attribute
    /// type actually defines. The tag is legal on result type attributes
    /// and on arrays of result types.
    fn validate_view_tag(&self, aid: AttrId, label: &str, parent: &str) -> ValidationErrors {
        let mut verr = ValidationErrors::new();
        let att = self.attr(aid);
        let Some(view) = att.meta.view() else {
            return verr;
        };
        let target = match att.ty.as_ref() {
            Some(DataType::ResultType(t)) => Some(*t),
            Some(DataType::Array { elem }) => match self.attr(*elem).ty.as_ref() {
                Some(DataType::ResultType(t)) => Some(*t),
                _ => None,
            },
            _ => None,
        };
        match target {
            None => verr.add(
                parent,
                format!("{label}cannot use view {view:?} on non result type attribute"),
            ),
            Some(t) => {
                let node = self.type_node(t);
                let defined = view == crate::user_type::DEFAULT_VIEW
                    || node
                        .result
                        .as_ref()
                        .is_some_and(|r| r.views.iter().any(|v| v.name == view));
                if !defined {
                    verr.add(
                        parent,
                        format!(
                            "{label}type {} does not define view {view:?}",
                            node.name
                        ),
                    );
                }
            }
        }
        verr
    }

    fn validate_views(&self, tid: TypeId, result: &ResultPart, parent: &str) -> ValidationErrors {
        let mut verr = ValidationErrors::new();
        let node = self.type_node(tid);
        let ty = self.attr(node.attr).ty.clone();
        let shaped = ty.as_ref().is_some_and(|t| {
            as_object(self, t).is_some() || crate::types::as_array(self, t).is_some()
        });
        if !result.views.is_empty() && !shaped {
            verr.add(
                parent,
                "result type must be an object or an array to define views",
            );
            return verr;
        }
        for view in &result.views {
            let Some(view_ty) = self.attr(view.attr).ty.as_ref() else {
                continue;
            };
            let Some(view_obj) = as_object(self, view_ty) else {
                continue;
            };
            for (field, _) in view_obj.iter() {
                if self.find(node.attr, field).is_none() {
                    verr.add(
                        parent,
                        format!("undefined field {field:?} in view {:?}", view.name),
                    );
                }
            }
        }
        verr
    }

    // ----------------------------- finalize ---------------------------- //

    fn finalize_all(&mut self) {
        // User types first so result type finalization sees merged bases.
        // New types may be appended (view projection), hence index loops.
        let mut i = 0;
        while i < self.types.len() {
            let tid = TypeId(i as u32);
            if self.types[i].result.is_none() {
                self.finalize_type(tid);
            }
            i += 1;
        }
        let mut i = 0;
        while i < self.types.len() {
            let tid = TypeId(i as u32);
            if self.types[i].result.is_some() {
                self.finalize_type(tid);
            }
            i += 1;
        }
        for aid in self.roots.clone() {
            self.finalize_attr(aid);
        }
    }

    /// Finalizes a named type: the backing attribute first (so merged base
    /// fields exist), then the default view synthesis of result types.
    pub fn finalize_type(&mut self, tid: TypeId) {
        if self.type_node(tid).finalized {
            return;
        }
        self.type_node_mut(tid).finalized = true;
        let aid = self.type_node(tid).attr;
        self.finalize_attr(aid);
        if self.type_node(tid).result.is_some() {
            self.ensure_default_view(tid);
            let view_attrs: Vec<AttrId> = self
                .type_node(tid)
                .result
                .as_ref()
                .map(|r| r.views.iter().map(|v| v.attr).collect())
                .unwrap_or_default();
            for va in view_attrs {
                self.finalize_attr(va);
            }
            self.finalize_nested_results(tid);
        }
    }

    /// Ensures result types reachable one level below a result type also
    /// carry their default view.
    fn finalize_nested_results(&mut self, tid: TypeId) {
        let aid = self.type_node(tid).attr;
        let mut nested = Vec::new();
        self.walk_fields(aid, |_, fid| nested.push(fid));
        for fid in nested {
            match self.attr(fid).ty.clone() {
                Some(DataType::ResultType(t)) => self.finalize_type(t),
                Some(DataType::Array { elem }) => {
                    if let Some(DataType::ResultType(t)) = self.attr(elem).ty.clone() {
                        self.finalize_type(t);
                    }
                }
                _ => {}
            }
        }
    }

    /// Finalizes an attribute: inherits from references, merges bases,
    /// applies explicit views, recurses into children and computes the zero
    /// value. Idempotent per node.
    pub fn finalize_attr(&mut self, aid: AttrId) {
        if self.attr(aid).finalized {
            return;
        }
        self.attr_mut(aid).finalized = true;

        // The named type behind `ty` finalizes first so fields contributed
        // by its own bases exist before this level inherits or merges.
        if let Some(DataType::UserType(t) | DataType::ResultType(t)) = self.attr(aid).ty.clone() {
            self.finalize_type(t);
        }

        let references = self.attr(aid).references.clone();
        for r in &references {
            if let DataType::UserType(t) | DataType::ResultType(t) = r {
                let parent = self.type_node(*t).attr;
                self.inherit(aid, parent);
            }
        }
        let bases = self.attr(aid).bases.clone();
        for b in &bases {
            if let DataType::UserType(t) | DataType::ResultType(t) = b {
                let other = self.type_node(*t).attr;
                self.merge_attr(aid, other);
            }
        }

        self.apply_explicit_view(aid);

        match self.attr(aid).ty.clone() {
            Some(DataType::UserType(t)) | Some(DataType::ResultType(t)) => {
                self.finalize_type(t);
            }
            Some(DataType::Object(o)) => {
                for (_, fid) in o.entries() {
                    self.finalize_attr(fid);
                }
            }
            Some(DataType::Array { elem }) => self.finalize_attr(elem),
            Some(DataType::Map { key, elem }) => {
                self.finalize_attr(key);
                self.finalize_attr(elem);
            }
            _ => {}
        }

        if self.attr(aid).zero_value.is_none() {
            if let Some(ty) = self.attr(aid).ty.clone() {
                let z = zero_value(self, &ty);
                self.attr_mut(aid).zero_value = Some(z);
            }
        }
    }

    /// Replaces a result-type attribute with its projection when the
    /// attribute nominates a view. The view tag was checked during
    /// validation, so failure here is a bug.
    fn apply_explicit_view(&mut self, aid: AttrId) {
        let Some(view) = self.attr(aid).meta.view().map(str::to_string) else {
            return;
        };
        if view == crate::user_type::DEFAULT_VIEW {
            return;
        }
        match self.attr(aid).ty.clone() {
            Some(DataType::ResultType(t)) => {
                let p = project(self, t, &view)
                    .unwrap_or_else(|_| panic!("view {view:?} should have been validated")); // bug
                self.attr_mut(aid).ty = Some(DataType::ResultType(p));
            }
            Some(DataType::Array { elem }) => {
                if let Some(DataType::ResultType(t)) = self.attr(elem).ty.clone() {
                    let p = project(self, t, &view)
                        .unwrap_or_else(|_| panic!("view {view:?} should have been validated")); // bug
                    self.attr_mut(elem).ty = Some(DataType::ResultType(p));
                }
            }
            _ => {}
        }
    }

    /// Computed zero value of an attribute after finalization, falling back
    /// to `Null` for unfinalized or untyped nodes.
    pub fn attr_zero_value(&self, aid: AttrId) -> Value {
        self.attr(aid).zero_value.clone().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;
    use serde_json::json;

    fn obj(d: &mut Design, fields: &[(&str, AttrId)]) -> AttrId {
        let mut o = Object::new();
        for (name, fid) in fields {
            o.set(*name, *fid);
        }
        d.new_attr(DataType::Object(o))
    }

    #[test]
    fn empty_sentinel_is_slot_zero() {
        let d = Design::new();
        assert_eq!(d.type_node(EMPTY).name, "Empty");
        let att = d.attr(d.type_node(EMPTY).attr);
        assert!(matches!(att.ty, Some(DataType::Object(_))));
    }

    #[test]
    fn prepare_defaults_untyped_attributes_to_empty() {
        let mut d = Design::new();
        let raw = d.push_attr(Attribute::default());
        d.add_root(raw);
        d.run_pipeline().expect("pipeline");
        assert_eq!(d.attr(raw).ty, Some(DataType::UserType(EMPTY)));
        assert!(d.attr(raw).validation.is_some());
    }

    #[test]
    fn initializers_run_in_generations() {
        let mut d = Design::new();
        d.register(|d| {
            let f = d.new_attr(DataType::Primitive(Primitive::String));
            let root = {
                let mut o = Object::new();
                o.set("late", f);
                d.new_attr(DataType::Object(o))
            };
            d.add_root(root);
            // Second generation sees the first generation's work.
            d.register(move |d| {
                d.attr_mut(root).description = Some("built late".to_string());
            });
        });
        d.run_pipeline().expect("pipeline");
        let root = *d.roots().last().unwrap();
        assert_eq!(d.attr(root).description.as_deref(), Some("built late"));
    }

    #[test]
    fn initializer_loop_is_detected() {
        fn requeue(d: &mut Design) {
            d.register(requeue);
        }
        let mut d = Design::new();
        d.register(requeue);
        assert!(matches!(
            d.run_pipeline(),
            Err(BuildError::InitializerLoop)
        ));
    }

    #[test]
    fn validate_reports_all_violations() {
        let mut d = Design::new();
        let num = d.new_attr(DataType::Primitive(Primitive::Int32));
        d.attr_mut(num).validation = Some(ValidationRules {
            minimum: Some(10.0),
            maximum: Some(1.0),
            ..Default::default()
        });
        let root = obj(&mut d, &[("n", num)]);
        d.attr_mut(root).validation = Some(ValidationRules {
            required: vec!["ghost".to_string()],
            ..Default::default()
        });
        d.user_type("Broken", root);

        let verr = d.validate_all();
        assert_eq!(verr.len(), 2);
        let msg = verr.to_string();
        assert!(msg.contains("required field \"ghost\" does not exist in type object"));
        assert!(msg.contains("minimum (10) is greater than maximum (1)"));
        assert!(msg.contains("type \"Broken\""));
    }

    #[test]
    fn validate_rejects_bad_enum_and_default() {
        let mut d = Design::new();
        let f = d.new_attr(DataType::Primitive(Primitive::Int));
        d.attr_mut(f).validation = Some(ValidationRules {
            values: vec![json!(1), json!("nope")],
            ..Default::default()
        });
        d.attr_mut(f).default_value = Some(json!(7));
        let root = obj(&mut d, &[("f", f)]);
        d.user_type("T", root);

        let msg = d.validate_all().to_string();
        assert!(msg.contains("enum value \"nope\" is incompatible with type int"));
        assert!(msg.contains("default value 7 is not one of the enum values"));
    }

    #[test]
    fn validate_rejects_view_on_non_result_type() {
        let mut d = Design::new();
        let f = d.new_attr(DataType::Primitive(Primitive::String));
        d.attr_mut(f).meta.set(crate::meta::VIEW_TAG, "tiny");
        let root = obj(&mut d, &[("f", f)]);
        d.user_type("T", root);

        let msg = d.validate_all().to_string();
        assert!(msg.contains("cannot use view \"tiny\" on non result type attribute"));
    }

    #[test]
    fn validate_rejects_bad_media_type_identifiers() {
        let mut d = Design::new();
        let attr = d.new_attr(DataType::Object(Object::new()));
        d.result_type("Odd", "not a media type", attr);
        let msg = d.validate_all().to_string();
        assert!(msg.contains("invalid media type identifier \"not a media type\""));
    }

    #[test]
    fn validate_handles_recursive_types() {
        let mut d = Design::new();
        let holder = d.new_attr(DataType::Object(Object::new()));
        let ut = d.user_type("Node", holder);
        let next = d.new_attr(DataType::UserType(ut));
        let name = d.new_attr(DataType::Primitive(Primitive::String));
        let mut o = Object::new();
        o.set("name", name);
        o.set("next", next);
        d.attr_mut(holder).ty = Some(DataType::Object(o));
        assert!(d.validate_all().is_empty());
    }

    #[test]
    fn finalize_merges_bases_and_inherits_references() {
        let mut d = Design::new();
        let base_f = d.new_attr(DataType::Primitive(Primitive::Int));
        let base_obj = obj(&mut d, &[("b", base_f)]);
        let base = d.user_type("Base", base_obj);

        let ref_f = d.new_attr(DataType::Primitive(Primitive::String));
        d.attr_mut(ref_f).default_value = Some(json!("from-ref"));
        let ref_obj = obj(&mut d, &[("r", ref_f)]);
        let reference = d.user_type("Ref", ref_obj);

        let own_r = d.push_attr(Attribute::default());
        let root = obj(&mut d, &[("r", own_r)]);
        d.attr_mut(root).bases.push(DataType::UserType(base));
        d.attr_mut(root).references.push(DataType::UserType(reference));
        let ut = d.user_type("Combined", root);
        d.run_pipeline().expect("pipeline");

        // Base field merged in, reference filled the untyped own field.
        assert_eq!(d.find(root, "b"), Some(base_f));
        assert_eq!(
            d.attr(own_r).ty,
            Some(DataType::Primitive(Primitive::String))
        );
        assert_eq!(d.attr(own_r).default_value, Some(json!("from-ref")));
        assert!(d.type_node(ut).finalized);
    }

    #[test]
    fn nested_type_bases_merge_before_references_fill() {
        let mut d = Design::new();
        // Holder finalizes first; its field's type and reference come later
        // in the table, so the field alone drives their finalization.
        let holder_obj = obj(&mut d, &[]);
        let holder = d.user_type("Holder", holder_obj);

        let bx = d.new_attr(DataType::Primitive(Primitive::String));
        let base_obj = obj(&mut d, &[("x", bx)]);
        let base = d.user_type("Base", base_obj);
        let inner_obj = obj(&mut d, &[]);
        d.attr_mut(inner_obj).bases.push(DataType::UserType(base));
        let inner = d.user_type("Inner", inner_obj);

        let rx = d.new_attr(DataType::Primitive(Primitive::String));
        d.attr_mut(rx).default_value = Some(json!("from-ref"));
        let ref_obj = obj(&mut d, &[("x", rx)]);
        let reference = d.user_type("Ref", ref_obj);

        let a = d.new_attr(DataType::UserType(inner));
        d.attr_mut(a).references.push(DataType::UserType(reference));
        let mut o = Object::new();
        o.set("a", a);
        d.attr_mut(holder_obj).ty = Some(DataType::Object(o));
        d.run_pipeline().expect("pipeline");

        // Inner's base merged in `x` before the reference filled it.
        let x = d.find(a, "x").expect("field merged from the nested base");
        assert_eq!(d.attr(x).default_value, Some(json!("from-ref")));
        assert!(d.type_node(holder).finalized);
    }

    #[test]
    fn finalize_computes_zero_values() {
        let mut d = Design::new();
        let s = d.new_attr(DataType::Primitive(Primitive::String));
        let n = d.new_attr(DataType::Primitive(Primitive::Int32));
        let arr = d.new_attr(DataType::Array { elem: n });
        let root = obj(&mut d, &[("s", s), ("ns", arr)]);
        d.user_type("T", root);
        d.run_pipeline().expect("pipeline");

        assert_eq!(d.attr_zero_value(s), json!(""));
        assert_eq!(d.attr_zero_value(arr), json!([]));
        assert_eq!(d.attr_zero_value(root), json!({}));
    }

    #[test]
    fn type_lookup_by_name() {
        let mut d = Design::new();
        let a = d.new_attr(DataType::Object(Object::new()));
        let t = d.user_type("Thing", a);
        assert_eq!(d.type_named("Thing"), Some(t));
        assert_eq!(d.type_named("Empty"), Some(EMPTY));
        assert_eq!(d.type_named("Missing"), None);
    }
}
