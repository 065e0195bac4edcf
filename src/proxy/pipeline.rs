//! The per-request pipeline.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, Response},
    response::IntoResponse,
};
use url::Url;

use crate::cache::{CacheGateway, CacheKey};
use crate::config::{ErrorStatusMode, ProxyConfig};
use crate::error::{ProxyError, SetupError};
use crate::lifecycle::BackgroundTask;
use crate::rewrite::ResponseRewriter;
use crate::routing::{PathTranslator, UpstreamUrlBuilder};
use crate::upstream::UpstreamFetcher;

/// A response plus the cache write it scheduled, if any.
///
/// The response never waits for `background`; whoever hosts the pipeline
/// keeps the task alive (or awaits it in tests).
#[derive(Debug)]
pub struct Handled {
    pub response: Response<Body>,
    pub background: Option<BackgroundTask>,
}

impl Handled {
    fn immediate(response: Response<Body>) -> Self {
        Self {
            response,
            background: None,
        }
    }
}

/// Localized docs proxy: translate, look up, fetch, rewrite, populate.
pub struct DocsProxy {
    translator: PathTranslator,
    urls: UpstreamUrlBuilder,
    fetcher: UpstreamFetcher,
    rewriter: ResponseRewriter,
    cache: CacheGateway,
    on_error_status: ErrorStatusMode,
    cache_control: HeaderValue,
}

impl DocsProxy {
    pub fn new(config: &ProxyConfig, cache: CacheGateway) -> Result<Self, SetupError> {
        let base = Url::parse(&config.upstream.base_url)?;
        let fetcher = UpstreamFetcher::new(&config.upstream, base.clone())?;
        let cache_control =
            HeaderValue::from_str(&format!("public, max-age={}", config.cache.max_age_secs))?;

        let proxy = Self {
            translator: PathTranslator::new(config.routing.validation),
            urls: UpstreamUrlBuilder::new(base),
            fetcher,
            rewriter: ResponseRewriter::from_config(&config.rewrite),
            cache,
            on_error_status: config.upstream.on_error_status,
            cache_control,
        };
        tracing::info!(
            upstream = %proxy.urls.base(),
            cache = proxy.cache.is_enabled(),
            rewrite = proxy.rewriter.is_enabled(),
            "Docs pipeline ready"
        );
        Ok(proxy)
    }

    /// Build the pipeline with the cache described by `config`.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, SetupError> {
        Self::new(config, CacheGateway::from_config(&config.cache))
    }

    /// Serve one request. Failures become their error responses here.
    pub async fn handle(&self, request: Request<Body>) -> Handled {
        match self.try_handle(request).await {
            Ok(handled) => handled,
            Err(e) => {
                match &e {
                    ProxyError::MethodNotAllowed(method) => {
                        tracing::debug!(method = %method, "Rejected method");
                    }
                    ProxyError::Path(reason) => {
                        tracing::debug!(reason = %reason, "Rejected path");
                    }
                    _ => tracing::error!(error = %e, "Error fetching target URL"),
                }
                Handled::immediate(e.into_response())
            }
        }
    }

    pub async fn try_handle(&self, request: Request<Body>) -> Result<Handled, ProxyError> {
        if *request.method() != Method::GET {
            return Err(ProxyError::MethodNotAllowed(request.method().clone()));
        }

        let descriptor = self.translator.translate(request.uri().path())?;
        tracing::debug!(lang_code = %descriptor.lang_code, "Language code");

        let key = CacheKey::from_request(&request);
        tracing::debug!(cache_key = %key, "Cache key");
        if let Some(hit) = self.cache.lookup(&key).await {
            tracing::debug!(cache_key = %key, age_secs = hit.age().as_secs(), "Cache hit");
            return Ok(Handled::immediate(hit.into_response()));
        }

        let target = self.urls.build(&descriptor, request.uri().query())?;
        tracing::debug!(target_url = %target.url, "Fetching upstream");
        let upstream = self.fetcher.fetch(&target, request.headers()).await?;

        let status = upstream.status();
        if (status.is_client_error() || status.is_server_error())
            && self.on_error_status == ErrorStatusMode::BadGateway
        {
            return Err(ProxyError::UpstreamStatus(status));
        }

        let mut response = self.rewriter.rewrite(upstream);
        self.apply_edge_headers(response.headers_mut());

        let (response, background) = self.cache.populate(key, response);
        Ok(Handled { response, background })
    }

    fn apply_edge_headers(&self, headers: &mut HeaderMap) {
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    }
}
