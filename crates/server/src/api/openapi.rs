use crate::api::{alerts::ALERTS_TAG, health::MISC_TAG};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Alert Engine API",
        version = "1.0.0",
        description = "Deduplicates, throttles, routes and escalates operational alerts."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = ALERTS_TAG, description = "Alert intake and acknowledgement")
    )
)]
pub struct ApiDoc;
