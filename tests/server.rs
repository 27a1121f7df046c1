mod common;

use caption_service::Config;
use common::*;
use reqwest::multipart::{Form, Part};

#[test_log::test(tokio::test)]
async fn serves_captions_over_a_real_socket() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router_with(
        DescribingModel {
            delay: std::time::Duration::ZERO,
        },
        &Config::default(),
    );
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/generate");

    let form = Form::new().part(
        "file",
        Part::bytes(solid_png(10, 10, [0, 0, 255]))
            .file_name("blue.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let response = client.post(&url).multipart(form).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["caption"], "a 10x10 picture with mean colour #0000ff");

    let form = Form::new().part("file", Part::bytes(b"not an image".to_vec()));
    let response = client.post(&url).multipart(form).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    server.abort();
}
