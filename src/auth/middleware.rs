use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_token;
use crate::config::Config;
use crate::db::StoreClient;
use crate::error::AppError;
use crate::models::User;

/// Bearer-token authentication for every private route.
///
/// Verifies the token against the shared secret, then re-fetches the
/// referenced user from the document store on every request (no caching of
/// verification results). The resolved [`User`] is inserted into request
/// extensions for downstream extractors.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

fn is_public(path: &str) -> bool {
    path == "/health"
        || path.starts_with("/api/auth/login")
        || path.starts_with("/api/auth/register")
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if is_public(req.path()) {
                return service.call(req).await;
            }

            let token = req
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_owned);

            let token = match token {
                Some(token) => token,
                None => {
                    return Err(
                        AppError::Unauthorized("Access denied. No token provided.".into()).into(),
                    )
                }
            };

            let config = req
                .app_data::<web::Data<Config>>()
                .cloned()
                .ok_or_else(|| {
                    Error::from(AppError::InternalServerError(
                        "Application configuration is not available".into(),
                    ))
                })?;
            let store = req
                .app_data::<web::Data<StoreClient>>()
                .cloned()
                .ok_or_else(|| {
                    Error::from(AppError::InternalServerError(
                        "Store client is not available".into(),
                    ))
                })?;

            let claims = verify_token(&token, &config.jwt_secret)?;

            // The user must still exist and be active; a store failure here
            // reads as an authentication failure, not a server error.
            let user = match store.find_by_id::<User>("users", &claims.sub).await {
                Ok(Some(user)) if user.is_active => user,
                Ok(_) => {
                    return Err(AppError::Unauthorized(
                        "User account is inactive or not found.".into(),
                    )
                    .into())
                }
                Err(_) => return Err(AppError::Unauthorized("User not found.".into()).into()),
            };

            req.extensions_mut().insert(user);
            service.call(req).await
        })
    }
}
