use actix_web::{HttpResponse, Responder, get};

macros_utils::routes! {
    route health_route,
}

/// Liveness probe for load balancers; an empty 200 is the whole answer.
#[get("/")]
pub async fn health_route() -> impl Responder {
    HttpResponse::Ok()
}
