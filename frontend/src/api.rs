use gloo_net::http::Request;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStream, ReadableStreamDefaultReader};

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::models::QueryRequest;

/// A response body read piece by piece. `Ok(None)` marks the end.
#[allow(async_fn_in_trait)]
pub trait ChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ClientError>;
}

/// Sends one query and hands back the successful body as a stream.
/// Non-2xx responses are turned into [`ClientError::Http`] here.
#[allow(async_fn_in_trait)]
pub trait QueryTransport {
    type Body: ChunkStream;

    async fn post_query(&self, request: &QueryRequest) -> Result<Self::Body, ClientError>;
}

/// `fetch`-backed transport targeting the page's own origin.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    endpoint: String,
}

impl HttpTransport {
    pub fn new(origin: &str, path: &str) -> Self {
        Self {
            endpoint: format!("{}{}", origin.trim_end_matches('/'), path),
        }
    }

    /// Resolves the endpoint against `window.location.origin`.
    pub fn for_current_origin(config: &ClientConfig) -> Result<Self, ClientError> {
        let window =
            web_sys::window().ok_or_else(|| ClientError::Network("no window".to_string()))?;
        let origin = window.location().origin().map_err(js_error)?;
        Ok(Self::new(&origin, &config.endpoint_path))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl QueryTransport for HttpTransport {
    type Body = BodyReader;

    async fn post_query(&self, request: &QueryRequest) -> Result<BodyReader, ClientError> {
        let resp = Request::post(&self.endpoint)
            .json(request)
            .map_err(|e| ClientError::Network(format!("Serialize error: {e}")))?
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !resp.ok() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::http(resp.status(), &body));
        }

        log::debug!("POST {} -> {}", self.endpoint, resp.status());
        Ok(BodyReader::new(resp.body()))
    }
}

/// Reads a `ReadableStream` through its default reader.
pub struct BodyReader {
    reader: Option<ReadableStreamDefaultReader>,
}

impl BodyReader {
    fn new(stream: Option<ReadableStream>) -> Self {
        // A null body (e.g. 204) reads as an empty stream.
        let reader = stream.map(|s| s.get_reader().unchecked_into::<ReadableStreamDefaultReader>());
        Self { reader }
    }
}

impl ChunkStream for BodyReader {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        let Some(reader) = &self.reader else {
            return Ok(None);
        };

        let result = JsFuture::from(reader.read()).await.map_err(js_error)?;
        let done = Reflect::get(&result, &JsValue::from_str("done"))
            .map_err(js_error)?
            .as_bool()
            .unwrap_or(false);
        if done {
            self.reader = None;
            return Ok(None);
        }

        let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_error)?;
        Ok(Some(Uint8Array::new(&value).to_vec()))
    }
}

fn js_error(value: JsValue) -> ClientError {
    let message = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"));
    ClientError::Network(message)
}
