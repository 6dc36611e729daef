//! Route registration helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web;

/// Generate a `pub fn routes(cfg: &mut ServiceConfig)` for a route module.
///
/// Leaf modules list their handlers with `route`, parent modules list their
/// child modules with `group`:
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
/// }
///
/// macros_utils::routes! {
///     group health,
///     group configs,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($(group $module:ident),+ $(,)?) => {
        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $($module::routes(cfg);)+
        }
    };
    ($(route $route:path),+ $(,)?) => {
        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $(cfg.service($route);)+
        }
    };
}

#[cfg(all(test, feature = "actix"))]
mod tests {
    use actix_web::{App, HttpResponse, Responder, get, http::StatusCode, test};

    mod leaf {
        use super::*;

        crate::routes! {
            route first,
            route second,
        }

        #[get("/first")]
        pub async fn first() -> impl Responder {
            HttpResponse::Ok()
        }

        #[get("/second")]
        pub async fn second() -> impl Responder {
            HttpResponse::Accepted()
        }
    }

    crate::routes! {
        group leaf,
    }

    #[actix_web::test]
    async fn test_grouped_routes_are_registered() {
        let app = test::init_service(App::new().configure(routes)).await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/first").to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second =
            test::call_service(&app, test::TestRequest::get().uri("/second").to_request()).await;
        assert_eq!(second.status(), StatusCode::ACCEPTED);

        let missing =
            test::call_service(&app, test::TestRequest::get().uri("/third").to_request()).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
