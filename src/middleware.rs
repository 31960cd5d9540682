use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http, Error, HttpMessage,
};
use futures::future::{ok, Ready};
use log::debug;

use crate::auth::{token_from_header, validate_jwt, AuthUser, TokenRejected};

/// Verifies the `Authorization` token, when present, and attaches the caller
/// to the request. Handlers decide whether a caller is required.
#[derive(Debug, Clone)]
pub struct Authentication {
    secret: Rc<str>,
}

impl Authentication {
    pub fn new(secret: &str) -> Self {
        Self { secret: Rc::from(secret) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(token_from_header)
            .map(String::from);

        if let Some(token) = token {
            match validate_jwt(&token, &self.secret) {
                Ok(claims) => {
                    req.extensions_mut().insert(AuthUser {
                        id: claims.sub,
                        role: claims.role,
                    });
                }
                Err(e) => {
                    debug!("Rejected token on {}: {}", req.path(), e);
                    req.extensions_mut().insert(TokenRejected(e.to_string()));
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{create_jwt, AdminUser, Role};
    use actix_web::{test, web, App, HttpResponse};

    const SECRET: &str = "middleware-secret";

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(format!("{}:{}", user.role, user.id))
    }

    async fn admin_only(admin: AdminUser) -> HttpResponse {
        HttpResponse::Ok().body(admin.0)
    }

    async fn public() -> HttpResponse {
        HttpResponse::Ok().body("open")
    }

    #[actix_web::test]
    async fn valid_token_reaches_handler() {
        let app = test::init_service(
            App::new()
                .wrap(Authentication::new(SECRET))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let token = create_jwt("c7", Role::Customer, SECRET, 1).unwrap();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((http::header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "customer:c7");
    }

    #[actix_web::test]
    async fn bad_token_is_unauthorized_on_protected_routes_only() {
        let app = test::init_service(
            App::new()
                .wrap(Authentication::new(SECRET))
                .route("/me", web::get().to(whoami))
                .route("/open", web::get().to(public)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((http::header::AUTHORIZATION, "Bearer not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/open")
            .insert_header((http::header::AUTHORIZATION, "Bearer not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[actix_web::test]
    async fn wrong_role_is_forbidden() {
        let app = test::init_service(
            App::new()
                .wrap(Authentication::new(SECRET))
                .route("/admin", web::get().to(admin_only)),
        )
        .await;

        let token = create_jwt("t1", Role::Team, SECRET, 1).unwrap();
        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header((http::header::AUTHORIZATION, token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);

        let req = test::TestRequest::get().uri("/admin").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
    }
}
