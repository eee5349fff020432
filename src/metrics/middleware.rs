//! Request instrumentation for the HTTP router
//!
//! Every request is labelled by its matched route so `/models/7/predict`
//! and `/models/8/predict` share one series. Requests addressed to a model
//! additionally feed `model_requests_total`, keyed by the numeric id; unknown
//! ids (404) are left out so clients cannot mint label values.

use super::*;
use axum::{
    extract::{MatchedPath, Request},
    http::{Method, StatusCode},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Route prefix of every per-model endpoint
const MODEL_ROUTE_PREFIX: &str = "/models/:id";

#[derive(Clone)]
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    pub fn layer_with_config(config: MetricsConfig) -> MetricsLayer {
        MetricsLayer {
            config: Arc::new(config),
        }
    }
}

#[derive(Clone)]
pub struct MetricsLayer {
    config: Arc<MetricsConfig>,
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    config: Arc<MetricsConfig>,
}

/// What a request is recorded under
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestLabels {
    method: Method,
    route: String,
    model_id: Option<u64>,
}

impl RequestLabels {
    fn from_request(req: &Request) -> Self {
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        let model_id = route
            .starts_with(MODEL_ROUTE_PREFIX)
            .then(|| req.uri().path().split('/').nth(2))
            .flatten()
            .and_then(|segment| segment.parse().ok());

        Self {
            method: req.method().clone(),
            route,
            model_id,
        }
    }

    fn record(&self, status: StatusCode, elapsed_secs: f64, histograms: bool) {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[self.method.as_str(), &self.route, status.as_str()])
            .inc();

        if histograms {
            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&[self.method.as_str(), &self.route])
                .observe(elapsed_secs);
        }

        if let Some(id) = self.model_id {
            if status != StatusCode::NOT_FOUND {
                MODEL_REQUESTS_TOTAL
                    .with_label_values(&[&id.to_string(), &self.route, outcome(status)])
                    .inc();
            }
        }
    }
}

fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "server_error"
    } else if status.is_client_error() {
        "rejected"
    } else {
        "ok"
    }
}

impl<S> Service<Request> for MetricsService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let labels = RequestLabels::from_request(&req);
        if !self.config.enabled || self.config.is_path_excluded(&labels.route) {
            return Box::pin(self.inner.call(req));
        }

        let histograms = self.config.enable_histograms;
        let start = Instant::now();
        HTTP_REQUESTS_IN_FLIGHT.inc();
        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;
            HTTP_REQUESTS_IN_FLIGHT.dec();

            match &result {
                Ok(response) => {
                    labels.record(response.status(), start.elapsed().as_secs_f64(), histograms)
                }
                Err(_) => ERRORS_TOTAL
                    .with_label_values(&["http_middleware", "request_error"])
                    .inc(),
            }
            result
        })
    }
}
