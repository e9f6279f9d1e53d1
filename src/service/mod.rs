//! Services between handlers and the store: CRUD, validation, relation tracking.

mod crud;
mod relations;
mod validation;
pub use crud::{not_found, CrudService};
pub use relations::{RelationKey, RelationTracker};
pub use validation::{check_type, RequestValidator, ValidationMode};
