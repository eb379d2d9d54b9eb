use ets_core::http_client::{HttpResponse, HttpTransport, ResponseHeaders};
use mockall::mock;
use url::Url;

mock! {
    /// HTTP transport with scripted responses
    pub Transport {}

    impl HttpTransport for Transport {
        fn get(&self, url: &Url) -> ets_core::Result<HttpResponse>;
    }
}

/// Canned response with an optional `Content-Type`
pub fn response(status: u16, content_type: Option<&str>, body: &'static [u8]) -> HttpResponse {
    let headers: ResponseHeaders = content_type
        .map(|ct| ("Content-Type", ct.to_string()))
        .into_iter()
        .collect();
    HttpResponse {
        status,
        headers,
        body: Box::new(body),
    }
}
