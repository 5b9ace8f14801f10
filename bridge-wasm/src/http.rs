//! `fetch`-backed resource loader.
//!
//! Sounds only ever need the whole body of one URL, so every request is a
//! single `fetch` whose body is read into memory. The request and the body
//! read share one deadline; when it passes, the `AbortController` cancels
//! the transfer.

use crate::error::WasmError;
use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use bytes::Bytes;
use futures::future::{self, Either};
use gloo_timers::future::TimeoutFuture;
use js_sys::Uint8Array;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, RequestInit, Response, Window};

/// Deadline applied when a request carries none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads audio resources through `window.fetch`.
///
/// Request headers are not forwarded and response headers are not
/// collected; the browser handles caching and credentials.
pub struct WasmHttpClient {
    window: Window,
    timeout: Duration,
}

impl WasmHttpClient {
    /// Client for the current window with [`DEFAULT_TIMEOUT`].
    pub fn new() -> BridgeResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Client for the current window with a custom deadline.
    pub fn with_timeout(timeout: Duration) -> BridgeResult<Self> {
        let window = web_sys::window().ok_or_else(|| WasmError::NotAvailable("window".into()))?;
        Ok(Self { window, timeout })
    }

    async fn fetch(
        &self,
        method: HttpMethod,
        url: &str,
        timeout: Duration,
    ) -> BridgeResult<(u16, Bytes)> {
        let abort = AbortController::new().map_err(|err| WasmError::js("AbortController", err))?;
        let init = RequestInit::new();
        init.set_method(match method {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
        });
        init.set_signal(Some(&abort.signal()));

        let response = JsFuture::from(self.window.fetch_with_str_and_init(url, &init));
        let exchange = async move {
            let response: Response = response
                .await
                .map_err(|err| WasmError::js("fetch", err))?
                .dyn_into()
                .map_err(|value| WasmError::UnexpectedValue(format!("{:?}", value)))?;
            let status = response.status();
            if method == HttpMethod::Head {
                return Ok((status, Bytes::new()));
            }

            let buffer = response
                .array_buffer()
                .map_err(|err| WasmError::js("arrayBuffer", err))?;
            let buffer = JsFuture::from(buffer)
                .await
                .map_err(|err| WasmError::js("arrayBuffer", err))?;
            Ok::<_, WasmError>((status, Bytes::from(Uint8Array::new(&buffer).to_vec())))
        };

        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        futures::pin_mut!(exchange);
        match future::select(exchange, TimeoutFuture::new(millis)).await {
            Either::Left((result, _)) => Ok(result?),
            Either::Right(((), _)) => {
                abort.abort();
                Err(BridgeError::OperationFailed(format!(
                    "{url} did not respond within {} ms",
                    millis
                )))
            }
        }
    }
}

#[async_trait(?Send)]
impl HttpClient for WasmHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let timeout = request.timeout.unwrap_or(self.timeout);
        let (status, body) = self.fetch(request.method, &request.url, timeout).await?;
        debug!(url = %request.url, status, bytes = body.len(), "fetch completed");

        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    }
}
