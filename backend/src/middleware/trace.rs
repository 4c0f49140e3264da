//! Request tracing middleware.
//!
//! Every request runs inside a fresh [`TraceId`] scope. The identifier is
//! echoed in the `trace-id` response header, picked up by error payloads and
//! attached to the completion log line.

use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{error, info, warn};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware assigning a trace identifier to each request.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use portal::Trace;
///
/// let _app = App::new().wrap(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

/// Service produced by [`Trace`].
pub struct TraceMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = TraceId::generate();
        let method = req.method().clone();
        let path = req.path().to_owned();
        let started = Instant::now();
        // The inner future must be created inside the scope so extractors
        // that run eagerly can already see the trace id.
        let fut = TraceId::sync_scope(trace_id, || self.service.call(req));

        Box::pin(TraceId::scope(trace_id, async move {
            let result = fut.await;
            let elapsed_ms = started.elapsed().as_millis();
            let mut res = match result {
                Ok(res) => res,
                Err(err) => {
                    warn!(%trace_id, %method, %path, elapsed_ms, error = %err, "request failed");
                    return Err(err);
                }
            };
            match HeaderValue::from_str(&trace_id.to_string()) {
                Ok(value) => {
                    res.response_mut()
                        .headers_mut()
                        .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                }
                Err(err) => {
                    error!(error = %err, %trace_id, "failed to encode trace identifier header");
                }
            }
            info!(
                %trace_id,
                %method,
                %path,
                status = res.status().as_u16(),
                elapsed_ms,
                "request completed"
            );
            Ok(res)
        }))
    }
}
