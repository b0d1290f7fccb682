use crate::app_config;
use crate::backend::{AuthUser, Backend};
use crate::web::error::ApiError;
use actix_web::dev::{
    self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
#[derive(Clone, Debug, Default)]
pub struct ClientCtxInner {
    /// Identity. None is an anonymous caller.
    pub user: Option<AuthUser>,
    /// Access token the identity was resolved from. Forwarded to the backend
    /// so its row rules see the same caller.
    pub token: Option<String>,
}

impl ClientCtxInner {
    pub async fn from_token(backend: &dyn Backend, token: Option<String>) -> Self {
        let token = match token {
            Some(token) => token,
            None => return Self::default(),
        };

        match backend.get_user(&token).await {
            Ok(Some(user)) => ClientCtxInner {
                user: Some(user),
                token: Some(token),
            },
            Ok(None) => {
                log::debug!("Access token did not resolve to a user.");
                Self::default()
            }
            Err(err) => {
                log::warn!("Unable to resolve access token: {}", err);
                Self::default()
            }
        }
    }
}

/// Pulls the access token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn extract_access_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match bearer {
        Some(token) => Some(token.to_owned()),
        None => req
            .cookie(cookie_name)
            .map(|c| c.value().to_owned())
            .filter(|t| !t.is_empty()),
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    pub fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            // Existing record in extensions; pull it and return clone.
            Some(cbox) => Self(cbox.clone()),
            // No existing record; create and insert it.
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<Uuid> {
        self.0.user.as_ref().map(|u| u.id)
    }

    pub fn get_user(&self) -> Option<&AuthUser> {
        self.0.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.0.token.as_deref()
    }

    /// Require user to be logged in. Returns user id or Unauthorized.
    pub fn require_login(&self) -> Result<Uuid, ApiError> {
        self.get_id().ok_or(ApiError::Unauthorized)
    }

    /// Require ownership of a resource. Returns () or Forbidden.
    pub fn require_ownership(&self, author_id: Option<Uuid>) -> Result<(), ApiError> {
        let user_id = self.require_login()?;

        match author_id {
            Some(owner_id) if owner_id == user_id => Ok(()),
            _ => Err(ApiError::Forbidden),
        }
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let token = extract_access_token(req.request(), &app_config::auth().access_token_cookie);

        // Without a backend there is nobody to ask; the request stays anonymous.
        Box::pin(async move {
            if let Some(backend) = req.app_data::<Data<Arc<dyn Backend>>>() {
                let backend = backend.clone();
                let inner = ClientCtxInner::from_token(backend.get_ref().as_ref(), token).await;
                req.extensions_mut().insert(Data::new(inner));
            } else {
                log::error!("Backend is not registered as app data; treating request as anonymous.");
            }

            svc.call(req).await
        })
    }
}
