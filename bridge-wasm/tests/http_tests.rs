#![cfg(target_arch = "wasm32")]

use bridge_traits::{HttpClient, HttpMethod, HttpRequest};
use bridge_wasm::WasmHttpClient;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
async fn test_fetch_bytes_reads_whole_body() {
    let client = WasmHttpClient::new().unwrap();
    let body = client.fetch_bytes("data:text/plain,hello").await.unwrap();
    assert_eq!(body.as_ref(), b"hello");
}

#[wasm_bindgen_test]
async fn test_head_skips_body() {
    let client = WasmHttpClient::new().unwrap();
    let response = client
        .execute(HttpRequest::new(HttpMethod::Head, "data:text/plain,hello"))
        .await
        .unwrap();
    assert!(response.is_success());
    assert!(response.body.is_empty());
}
