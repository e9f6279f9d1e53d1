//! Route table, matcher and the axum mounting points.

pub mod common;
pub mod entity;
pub mod matcher;
pub mod table;
pub use common::{common_routes, common_routes_with_ready};
pub use entity::entity_routes;
pub use matcher::{find_route, match_route, param, segments_after_prefix, PathParams};
pub use table::{build_routes, Route, RouteKind, TAGS_COLLECTION, TAGS_SEGMENT};
