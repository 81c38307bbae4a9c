//! Design-time attribute/type expression model.
//!
//! This crate is the in-process engine a DSL or builder layer drives while
//! assembling a design document: a closed type system (primitives, arrays,
//! maps, ordered objects, named user and result types) over an arena of
//! attribute nodes, plus the algorithms generators need on top of it:
//! validation, destructive merge and additive inheritance, cycle-safe deep
//! copy, structural hashing and equality, and view projection for result
//! types.
//!
//! The entry point is [`Design`]: it owns every node, hands out stable
//! integer identities and runs the prepare/validate/finalize pipeline.
//!
//! ```
//! use typegraph::{DataType, Design, Object, Primitive};
//!
//! let mut d = Design::new();
//! let name = d.new_attr(DataType::Primitive(Primitive::String));
//! let mut fields = Object::new();
//! fields.set("name", name);
//! let attr = d.new_attr(DataType::Object(fields));
//! let account = d.user_type("Account", attr);
//! d.run_pipeline().unwrap();
//! assert_eq!(d.type_node(account).name, "Account");
//! ```

pub mod attribute;
pub mod design;
pub mod dup;
pub mod error;
pub mod example;
pub mod hash;
pub mod mapped;
pub mod meta;
pub mod project;
pub mod types;
pub mod user_type;
pub mod validation;

pub use attribute::{Attribute, Docs, ExampleValue};
pub use design::{AttrId, Design, EMPTY, TypeId};
pub use error::{BuildError, ProjectError, ValidationError, ValidationErrors};
pub use example::{ExampleGenerator, attr_example, type_example};
pub use hash::{HashFlags, equal, equal_attr, hash, hash_attr};
pub use mapped::MappedAttribute;
pub use meta::Meta;
pub use project::project;
pub use types::{DataType, Kind, Object, Primitive};
pub use user_type::{
    DEFAULT_VIEW, ResultPart, TypeNode, View, canonical_identifier, format_media_type,
    is_media_type, parse_media_type,
};
pub use validation::{Format, ValidationRules};
