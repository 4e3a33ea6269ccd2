//! OpenAPI document for the HTTP interface, served at `/openapi.json`.

use crate::error::{ErrorBody, ErrorDetail};
use crate::model::{CreateRanger, Ranger, RangerStatus};
use crate::response::Count;
use crate::service::PageRequest;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Huntreasure API",
        description = "Treasure-hunt participants: registration, progress and prize claims."
    ),
    paths(
        crate::handlers::ranger::create,
        crate::handlers::ranger::page_list,
        crate::handlers::ranger::search,
        crate::handlers::ranger::list,
        crate::handlers::ranger::claimed_today,
        crate::handlers::ranger::read,
        crate::handlers::ranger::patch,
        crate::handlers::ranger::delete,
        crate::routes::common::health,
        crate::routes::common::ready,
    ),
    components(schemas(Ranger, RangerStatus, CreateRanger, PageRequest, Count, ErrorBody, ErrorDetail)),
    tags(
        (name = "ranger", description = "Treasure-hunt participants"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
