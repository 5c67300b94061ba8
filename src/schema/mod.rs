//!
//! fieldgate schema module
//! -----------------------
//! The annotation-driven resolver-wrapping engine. A schema is declared as an
//! explicit, enumerable structure: objects, fields, declared return shapes and
//! per-field annotations. `compile` walks that structure once at startup and
//! replaces every field's resolver with a composed chain, innermost-first:
//!
//!   base fetch -> reference resolution -> role gate -> authentication gate
//!
//! The order is fixed and independent of annotation declaration order, so the
//! authentication check always runs before any resource lookup is attempted.
//! Shape/annotation mismatches fail compilation with `AppError::Config`; a
//! process holding such a schema must not serve traffic.

mod compiler;
mod field;
mod gate;
mod reference;
mod resolver;
mod shape;

pub use compiler::{compile, CompiledField, CompiledSchema};
pub use field::{Annotation, FieldDef, ObjectDef, SchemaDef};
pub use gate::{authenticated_gate, role_gate, ResourceLocator};
pub use reference::reference_resolver;
pub use resolver::{property_fetch, resolver, ResolveRequest, Resolver};
pub use shape::TypeShape;
