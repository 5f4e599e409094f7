use catalog_api::config::ApiConfig;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod (in-memory store), bound to an ephemeral port.
        let app = catalog_api::app::build_app(&ApiConfig::default())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn widget() -> serde_json::Value {
    json!({
        "sku": "A1",
        "name": "Widget",
        "category": "Tools",
        "price": "9.99",
        "stock_qty": 5,
        "status": "active",
    })
}

fn csv_part(name: &str, body: &str) -> Part {
    Part::bytes(body.as_bytes().to_vec())
        .file_name(name.to_string())
        .mime_str("text/csv")
        .unwrap()
}

#[tokio::test]
async fn health_and_index_are_public() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/api/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["product_upload"], "/api/products/upload/");
}

#[tokio::test]
async fn collection_routes_answer_with_trailing_slash() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/api/products/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let all: Vec<serde_json::Value> = res.json().await.unwrap();
    assert!(all.is_empty());

    let res = client
        .post(srv.url("/api/products/"))
        .json(&widget())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client.get(srv.url("/api/products/")).send().await.unwrap();
    let all: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["sku"], "A1");
}

#[tokio::test]
async fn product_crud_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Create
    let res = client
        .post(srv.url("/api/products/"))
        .json(&widget())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["price"], "9.99");
    assert_eq!(created["status"], "active");

    // Duplicate SKU
    let res = client
        .post(srv.url("/api/products/"))
        .json(&widget())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    // Read
    let res = client
        .get(srv.url(&format!("/api/products/{id}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fetched["name"], "Widget");

    // Full update
    let mut replacement = widget();
    replacement["name"] = json!("Widget Pro");
    replacement["price"] = json!(12.5);
    let res = client
        .put(srv.url(&format!("/api/products/{id}/")))
        .json(&replacement)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Widget Pro");
    assert_eq!(updated["price"], "12.50");

    // Partial update
    let res = client
        .patch(srv.url(&format!("/api/products/{id}/")))
        .json(&json!({ "stock_qty": 0, "status": "INACTIVE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let patched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(patched["stock_qty"], 0);
    assert_eq!(patched["status"], "inactive");
    assert_eq!(patched["name"], "Widget Pro");

    // List
    let res = client.get(srv.url("/api/products/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let all: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(all.len(), 1);

    // Delete
    let res = client
        .delete(srv.url(&format!("/api/products/{id}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/api/products/{id}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_product_payloads_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut bad_status = widget();
    bad_status["status"] = json!("discontinued");
    let res = client
        .post(srv.url("/api/products/"))
        .json(&bad_status)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = client
        .patch(srv.url("/api/products/1/"))
        .json(&json!({ "price": "-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(srv.url("/api/products/abc/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn upload_reports_per_file_results() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let good = "sku,name,category,price,stock_qty,status\n\
                A1,Widget,Tools,9.99,5,active\n\
                A1,Widget2,Tools,10.99,3,active\n\
                B2,Gadget,Tools,1.00,1,active\n";
    let form = Form::new()
        .part("file", csv_part("notes.txt", "hello"))
        .part("file", csv_part("products.csv", good));

    let res = client
        .post(srv.url("/api/products/upload/"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();

    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["file"], "notes.txt");
    assert_eq!(files[0]["processed"], 0);
    assert_eq!(
        files[0]["errors"][0],
        "Failed to read file: Invalid file type. Only CSV or Excel files allowed."
    );
    assert_eq!(files[1]["file"], "products.csv");
    assert_eq!(files[1]["processed"], 2);
    assert_eq!(files[1]["errors"], json!(["Duplicate SKUs removed in file: [A1]"]));

    let res = client.get(srv.url("/api/products/")).send().await.unwrap();
    let all: Vec<serde_json::Value> = res.json().await.unwrap();
    let a1 = all.iter().find(|p| p["sku"] == "A1").unwrap();
    assert_eq!(a1["name"], "Widget2");
    assert_eq!(a1["price"], "10.99");
    assert_eq!(a1["stock_qty"], 3);
}

#[tokio::test]
async fn upload_without_files_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let form = Form::new().text("comment", "no attachments here");
    let res = client
        .post(srv.url("/api/products/upload/"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "No files uploaded" }));

    let res = client
        .post(srv.url("/api/products/upload/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
