//! View projection: computing the result type that renders another result
//! type through one of its views.
//!
//! Projection allocates a new result type whose object keeps only the
//! fields the view names, with the required list intersected accordingly.
//! Fields that are themselves result types are projected recursively; the
//! sub-view is taken from the view's field copy first, then from the
//! original field, then `default`. A seen map keyed by projected
//! identifier is threaded through the whole recursion so mutually
//! recursive result types project to mutually recursive projections
//! instead of diverging.

use std::collections::HashMap;

use crate::design::{AttrId, Design, TypeId};
use crate::error::ProjectError;
use crate::types::{DataType, Object, as_array, as_object};
use crate::user_type::{
    DEFAULT_VIEW, canonical_identifier, parse_media_type, project_identifier, title,
};

/// Projects a result type onto one of its views. Returns the projected
/// type's id; projecting an already-projected type is the identity.
pub fn project(d: &mut Design, tid: TypeId, view: &str) -> Result<TypeId, ProjectError> {
    let mut seen = HashMap::new();
    project_with(d, tid, view, &mut seen)
}

fn project_with(
    d: &mut Design,
    tid: TypeId,
    view: &str,
    seen: &mut HashMap<String, TypeId>,
) -> Result<TypeId, ProjectError> {
    let node = d.type_node(tid);
    let result = node
        .result
        .as_ref()
        .unwrap_or_else(|| panic!("cannot project non result type {}", node.name)); // bug
    let identifier = result.identifier.clone();

    // Identity fast path: the type is already the requested projection.
    let (_, params) = parse_media_type(&identifier);
    if params.get("view").map(String::as_str) == Some(view) {
        return Ok(tid);
    }

    let key = project_identifier(&canonical_identifier(&identifier), view);
    if let Some(&p) = seen.get(&key) {
        return Ok(p);
    }

    if d.is_collection(tid) {
        project_collection(d, tid, view, key, seen)
    } else {
        project_single(d, tid, view, key, seen)
    }
}

fn project_single(
    d: &mut Design,
    tid: TypeId,
    view: &str,
    key: String,
    seen: &mut HashMap<String, TypeId>,
) -> Result<TypeId, ProjectError> {
    if view == DEFAULT_VIEW && d.view(tid, view).is_none() {
        d.ensure_default_view(tid);
    }
    let Some(view_expr) = d.view(tid, view) else {
        return Err(ProjectError::UnknownView {
            view: view.to_string(),
            ty: d.type_node(tid).name.clone(),
        });
    };
    let view_attr = view_expr.attr;
    let node = d.type_node(tid).clone();
    let result = node.result.as_ref().unwrap_or_else(|| unreachable!());

    let name = if view == DEFAULT_VIEW {
        node.name.clone()
    } else {
        format!("{}{}", node.name, title(view))
    };
    let identifier = project_identifier(&result.identifier, view);

    // Register the projection before filling it in so recursive fields
    // resolve to it instead of projecting forever.
    let proj_attr = d.new_attr(DataType::Object(Object::new()));
    let p = d.result_type(name, identifier, proj_attr);
    seen.insert(key, p);

    let view_fields = {
        let ty = d.attr(view_attr).ty.clone();
        ty.as_ref()
            .and_then(|t| as_object(d, t))
            .map(Object::entries)
            .unwrap_or_default()
    };

    let mut projected = Object::new();
    for (fname, vfid) in view_fields {
        let Some(src_fid) = d.find(node.attr, &fname) else {
            // Undefined view fields are reported by validation.
            continue;
        };
        let copy = d.dup_attr(src_fid);
        project_field(d, copy, vfid, view, &fname, seen)?;
        projected.set(fname, copy);
    }

    // Required list: the original's, restricted to fields the view keeps.
    let required: Vec<String> = d
        .all_required(node.attr)
        .into_iter()
        .filter(|r| projected.attribute(r).is_some())
        .collect();

    let description = d.attr(node.attr).description.clone();
    let mut rules = d.attr(node.attr).validation.clone().unwrap_or_default();
    rules.required = required;
    {
        let att = d.attr_mut(proj_attr);
        att.ty = Some(DataType::Object(projected));
        att.description = description;
        att.validation = Some(rules);
    }

    d.ensure_default_view(p);
    Ok(p)
}

/// Projects the copied field `copy` against the view's field attribute.
/// Result types project through their nominated sub-view (the view field's
/// tag first, then the field's own, then `default`); arrays are
/// transparent; object-shaped fields recurse field-by-field against the
/// view field's sub-object.
fn project_field(
    d: &mut Design,
    copy: AttrId,
    view_fid: AttrId,
    view: &str,
    fname: &str,
    seen: &mut HashMap<String, TypeId>,
) -> Result<(), ProjectError> {
    match d.attr(copy).ty.clone() {
        Some(DataType::ResultType(t)) => {
            let sub_view = d
                .attr(view_fid)
                .meta
                .view()
                .or_else(|| d.attr(copy).meta.view())
                .unwrap_or(DEFAULT_VIEW)
                .to_string();
            let sub = project_with(d, t, &sub_view, seen).map_err(|e| ProjectError::Field {
                view: view.to_string(),
                field: fname.to_string(),
                source: Box::new(e),
            })?;
            d.attr_mut(copy).ty = Some(DataType::ResultType(sub));
        }
        Some(DataType::Array { elem }) => project_field(d, elem, view_fid, view, fname, seen)?,
        Some(ty) => {
            let Some(o) = as_object(d, &ty).cloned() else {
                return Ok(());
            };
            let view_fields = {
                let vty = d.attr(view_fid).ty.clone();
                vty.as_ref()
                    .and_then(|t| as_object(d, t))
                    .map(Object::entries)
                    .unwrap_or_default()
            };
            for (name, vfid) in view_fields {
                if let Some(cfid) = o.attribute(&name) {
                    project_field(d, cfid, vfid, view, &name, seen)?;
                }
            }
        }
        None => {}
    }
    Ok(())
}

fn project_collection(
    d: &mut Design,
    tid: TypeId,
    view: &str,
    key: String,
    seen: &mut HashMap<String, TypeId>,
) -> Result<TypeId, ProjectError> {
    let node = d.type_node(tid).clone();
    let result = node.result.as_ref().unwrap_or_else(|| unreachable!());

    let elem_attr = d
        .attr(node.attr)
        .ty
        .clone()
        .and_then(|ty| as_array(d, &ty))
        .unwrap_or_else(|| panic!("collection result type {} has no element", node.name)); // bug
    let Some(DataType::ResultType(et)) = d.attr(elem_attr).ty.clone() else {
        panic!("collection result type {} of non result type element", node.name); // bug
    };

    let pe = project_with(d, et, view, seen)
        .map_err(|e| ProjectError::CollectionElement(Box::new(e)))?;
    if pe == et {
        return Ok(tid);
    }

    let name = format!("{}Collection", d.type_node(pe).name);
    let identifier = project_identifier(&result.identifier, view);
    let new_elem = d.new_attr(DataType::ResultType(pe));
    let arr_attr = d.new_attr(DataType::Array { elem: new_elem });
    let p = d.result_type(name, identifier, arr_attr);
    seen.insert(key, p);
    d.ensure_default_view(p);
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;
    use crate::validation::ValidationRules as Rules;

    /// Result type with fields `id: int32`, `name: string`, `notes: string`
    /// (required: id, name) and views `default` (id, name, notes) and
    /// `tiny` (name).
    fn bottle(d: &mut Design) -> TypeId {
        let id = d.new_attr(DataType::Primitive(Primitive::Int32));
        let name = d.new_attr(DataType::Primitive(Primitive::String));
        let notes = d.new_attr(DataType::Primitive(Primitive::String));
        let mut o = Object::new();
        o.set("id", id);
        o.set("name", name);
        o.set("notes", notes);
        let attr = d.new_attr(DataType::Object(o));
        d.attr_mut(attr).validation = Some(Rules {
            required: vec!["id".to_string(), "name".to_string()],
            ..Default::default()
        });
        let rt = d.result_type("Bottle", "application/vnd.bottle+json", attr);

        let vname = d.new_attr(DataType::Primitive(Primitive::String));
        let mut vo = Object::new();
        vo.set("name", vname);
        let vattr = d.new_attr(DataType::Object(vo));
        d.add_view(rt, "tiny", vattr);
        rt
    }

    #[test]
    fn projection_keeps_view_fields_and_intersects_required() {
        let mut d = Design::new();
        let rt = bottle(&mut d);
        let p = project(&mut d, rt, "tiny").expect("project");

        let node = d.type_node(p).clone();
        assert_eq!(node.name, "BottleTiny");
        let result = node.result.expect("result part");
        assert_eq!(result.identifier, "application/vnd.bottle+json; view=tiny");

        let ty = d.attr(node.attr).ty.clone().unwrap();
        let obj = as_object(&d, &ty).unwrap();
        assert!(obj.attribute("name").is_some());
        assert!(obj.attribute("id").is_none());
        assert_eq!(d.all_required(node.attr), vec!["name".to_string()]);
    }

    #[test]
    fn unknown_view_is_an_error() {
        let mut d = Design::new();
        let rt = bottle(&mut d);
        let err = project(&mut d, rt, "huge").unwrap_err();
        assert!(matches!(
            err,
            ProjectError::UnknownView { ref view, ref ty } if view == "huge" && ty == "Bottle"
        ));
    }

    #[test]
    fn projecting_a_projection_is_the_identity() {
        let mut d = Design::new();
        let rt = bottle(&mut d);
        let p = project(&mut d, rt, "tiny").expect("first");
        let types_before = d.type_count();
        let p2 = project(&mut d, p, "tiny").expect("second");
        assert_eq!(p, p2);
        assert_eq!(d.type_count(), types_before);
    }

    #[test]
    fn default_view_projection_keeps_the_type_name() {
        let mut d = Design::new();
        let rt = bottle(&mut d);
        let p = project(&mut d, rt, DEFAULT_VIEW).expect("project");
        let node = d.type_node(p).clone();
        assert_eq!(node.name, "Bottle");
        // The identifier encodes the view even for `default`.
        assert_eq!(
            node.result.as_ref().unwrap().identifier,
            "application/vnd.bottle+json; view=default"
        );
        // All fields survive the default view.
        let ty = d.attr(node.attr).ty.clone().unwrap();
        assert_eq!(as_object(&d, &ty).unwrap().len(), 3);

        // Re-projecting hits the identifier fast path, allocating nothing.
        let count = d.type_count();
        let p2 = project(&mut d, p, DEFAULT_VIEW).expect("again");
        assert_eq!(p, p2);
        assert_eq!(d.type_count(), count);
    }

    #[test]
    fn projection_recurses_into_object_fields() {
        let mut d = Design::new();
        let inner = bottle(&mut d);

        // Estate { cellar: { bottle: Bottle } }, the view tagging
        // cellar.bottle to render as "tiny".
        let bfield = d.new_attr(DataType::ResultType(inner));
        let mut bo = Object::new();
        bo.set("bottle", bfield);
        let boxed = d.new_attr(DataType::Object(bo));
        let mut o = Object::new();
        o.set("cellar", boxed);
        let attr = d.new_attr(DataType::Object(o));
        let outer = d.result_type("Estate", "application/vnd.estate", attr);

        let vbottle = d.new_attr(DataType::ResultType(inner));
        d.attr_mut(vbottle).meta.set(crate::meta::VIEW_TAG, "tiny");
        let mut vbo = Object::new();
        vbo.set("bottle", vbottle);
        let vbox = d.new_attr(DataType::Object(vbo));
        let mut vo = Object::new();
        vo.set("cellar", vbox);
        let vattr = d.new_attr(DataType::Object(vo));
        d.add_view(outer, "grand", vattr);

        let p = project(&mut d, outer, "grand").expect("project");
        let ty = d.attr(d.type_node(p).attr).ty.clone().unwrap();
        let cellar = as_object(&d, &ty).unwrap().attribute("cellar").unwrap();
        let cty = d.attr(cellar).ty.clone().unwrap();
        let bottle_field = as_object(&d, &cty).unwrap().attribute("bottle").unwrap();
        let DataType::ResultType(pb) = d.attr(bottle_field).ty.clone().unwrap() else {
            panic!("expected result type");
        };
        assert_eq!(d.type_node(pb).name, "BottleTiny");
    }

    #[test]
    fn projection_reaches_result_types_through_arrays_of_objects() {
        let mut d = Design::new();
        let inner = bottle(&mut d);

        // Rack { rows: [{ bottle: Bottle }] }; the view describes the
        // array's element object directly.
        let bfield = d.new_attr(DataType::ResultType(inner));
        let mut eo = Object::new();
        eo.set("bottle", bfield);
        let elem = d.new_attr(DataType::Object(eo));
        let arr = d.new_attr(DataType::Array { elem });
        let mut o = Object::new();
        o.set("rows", arr);
        let attr = d.new_attr(DataType::Object(o));
        let outer = d.result_type("Rack", "application/vnd.rack", attr);

        let vbottle = d.new_attr(DataType::ResultType(inner));
        d.attr_mut(vbottle).meta.set(crate::meta::VIEW_TAG, "tiny");
        let mut veo = Object::new();
        veo.set("bottle", vbottle);
        let vrows = d.new_attr(DataType::Object(veo));
        let mut vo = Object::new();
        vo.set("rows", vrows);
        let vattr = d.new_attr(DataType::Object(vo));
        d.add_view(outer, "wide", vattr);

        let p = project(&mut d, outer, "wide").expect("project");
        let ty = d.attr(d.type_node(p).attr).ty.clone().unwrap();
        let rows = as_object(&d, &ty).unwrap().attribute("rows").unwrap();
        let Some(DataType::Array { elem }) = d.attr(rows).ty.clone() else {
            panic!("expected array");
        };
        let ety = d.attr(elem).ty.clone().unwrap();
        let bottle_field = as_object(&d, &ety).unwrap().attribute("bottle").unwrap();
        let DataType::ResultType(pb) = d.attr(bottle_field).ty.clone().unwrap() else {
            panic!("expected result type");
        };
        assert_eq!(d.type_node(pb).name, "BottleTiny");
    }

    #[test]
    fn recursive_result_types_project_to_recursive_projections() {
        let mut d = Design::new();
        // Account { name: string, parent: Account } with view "tiny"
        // listing both fields, parent tagged to render as "tiny".
        let holder = d.new_attr(DataType::Object(Object::new()));
        let rt = d.result_type("Account", "application/vnd.account", holder);
        let name = d.new_attr(DataType::Primitive(Primitive::String));
        let parent = d.new_attr(DataType::ResultType(rt));
        let mut o = Object::new();
        o.set("name", name);
        o.set("parent", parent);
        d.attr_mut(holder).ty = Some(DataType::Object(o));

        let vname = d.new_attr(DataType::Primitive(Primitive::String));
        let vparent = d.new_attr(DataType::ResultType(rt));
        d.attr_mut(vparent).meta.set(crate::meta::VIEW_TAG, "tiny");
        let mut vo = Object::new();
        vo.set("name", vname);
        vo.set("parent", vparent);
        let vattr = d.new_attr(DataType::Object(vo));
        d.add_view(rt, "tiny", vattr);

        let p = project(&mut d, rt, "tiny").expect("project");
        let node = d.type_node(p).clone();
        let ty = d.attr(node.attr).ty.clone().unwrap();
        let obj = as_object(&d, &ty).unwrap();
        let parent_field = obj.attribute("parent").unwrap();
        // The projected parent points back at the projection itself.
        assert_eq!(
            d.attr(parent_field).ty,
            Some(DataType::ResultType(p))
        );
    }

    #[test]
    fn collections_project_their_element() {
        let mut d = Design::new();
        let rt = bottle(&mut d);
        let elem = d.new_attr(DataType::ResultType(rt));
        let arr = d.new_attr(DataType::Array { elem });
        let coll = d.result_type(
            "BottleCollection",
            "application/vnd.bottle+json; type=collection",
            arr,
        );

        let p = project(&mut d, coll, "tiny").expect("project");
        let node = d.type_node(p).clone();
        assert_eq!(node.name, "BottleTinyCollection");
        let ty = d.attr(node.attr).ty.clone().unwrap();
        let pelem = as_array(&d, &ty).unwrap();
        let elem_ty = d.attr(pelem).ty.clone().unwrap();
        let DataType::ResultType(pe) = elem_ty else {
            panic!("expected result type element");
        };
        assert_eq!(d.type_node(pe).name, "BottleTiny");
    }

    #[test]
    fn sub_view_defaults_to_default_view() {
        let mut d = Design::new();
        let inner = bottle(&mut d);
        let inner_field = d.new_attr(DataType::ResultType(inner));
        let label = d.new_attr(DataType::Primitive(Primitive::String));
        let mut o = Object::new();
        o.set("label", label);
        o.set("bottle", inner_field);
        let attr = d.new_attr(DataType::Object(o));
        let outer = d.result_type("Cellar", "application/vnd.cellar", attr);

        let vlabel = d.new_attr(DataType::Primitive(Primitive::String));
        let vbottle = d.new_attr(DataType::ResultType(inner));
        let mut vo = Object::new();
        vo.set("label", vlabel);
        vo.set("bottle", vbottle);
        let vattr = d.new_attr(DataType::Object(vo));
        d.add_view(outer, "full", vattr);

        let p = project(&mut d, outer, "full").expect("project");
        let node = d.type_node(p).clone();
        let ty = d.attr(node.attr).ty.clone().unwrap();
        let obj = as_object(&d, &ty).unwrap();
        let bottle_field = obj.attribute("bottle").unwrap();
        let DataType::ResultType(pb) = d.attr(bottle_field).ty.clone().unwrap() else {
            panic!("expected result type");
        };
        // Projected with the default view: name unchanged, all fields kept.
        assert_eq!(d.type_node(pb).name, "Bottle");
    }
}
