use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, Server};
use crate::github::{Credentials, NewIssue, Verification};
use crate::prelude::*;
use crate::render::{self, FieldValues};

type ApiResult = Result<Json<Value>, ApiError>;

const MAX_TITLE_CHARS: usize = 200;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "version": VERSION }))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "issuesmith API is running",
        "version": VERSION,
        "status": "ok",
    }))
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "issuesmith API",
        "version": VERSION,
        "docs": "/api",
    }))
}

#[derive(Deserialize)]
pub struct TemplatesQuery {
    category: Option<String>,
}

pub async fn templates(State(server): State<Server>, Query(query): Query<TemplatesQuery>) -> Json<Value> {
    let templates = server.catalog.list(query.category.as_deref());

    Json(json!({
        "success": true,
        "message": format!("Found {} templates", templates.len()),
        "templates": templates,
    }))
}

pub async fn template(State(server): State<Server>, Path(name): Path<String>) -> ApiResult {
    let template = server
        .catalog
        .get(&name)
        .ok_or_else(|| ApiError::not_found("Template not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Template retrieved successfully",
        "data": {
            "template": template,
            "fields": server.catalog.fields(&name),
        },
    })))
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    template: Option<String>,
    body: Option<String>,
    #[serde(default)]
    fields: FieldValues,
}

/// Substitutes and renders a body server-side. An explicit `body` wins over the template's own.
pub async fn preview(State(server): State<Server>, Json(request): Json<PreviewRequest>) -> ApiResult {
    let substituted = match (&request.body, request.template.as_deref()) {
        (Some(body), _) => render::substitute(body, &request.fields).into_owned(),
        (None, Some(name)) => server
            .catalog
            .get(name)
            .map(|t| t.populate(&request.fields))
            .ok_or_else(|| ApiError::not_found(format!("Template '{name}' not found")))?,
        (None, None) => return Err(ApiError::bad_request("Either `template` or `body` is required")),
    };

    let html = render::render(&substituted);

    Ok(Json(json!({
        "success": true,
        "data": {
            "body": substituted,
            "html": html,
        },
    })))
}

#[derive(Deserialize)]
pub struct IssueRequest {
    title: String,
    body: String,
    token: String,
    username: String,
    repo_name: String,
    #[serde(default)]
    labels: Option<Vec<String>>,
    #[serde(default)]
    assignees: Option<Vec<String>>,
}

pub async fn create_issue(State(server): State<Server>, Json(request): Json<IssueRequest>) -> ApiResult {
    let missing = [
        ("title", &request.title),
        ("token", &request.token),
        ("username", &request.username),
        ("repo_name", &request.repo_name),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    if let Some((name, _)) = missing {
        return Err(ApiError::bad_request(format!("`{name}` must not be empty")));
    }

    if request.title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::bad_request(format!(
            "The title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }

    let creds = Credentials {
        token: request.token,
        username: request.username,
        repo_name: request.repo_name,
    };

    let issue = NewIssue {
        title: request.title,
        body: request.body,
        labels: request.labels.unwrap_or_default(),
        assignees: request.assignees.unwrap_or_default(),
    };

    let created = server
        .github
        .create_issue(&creds, &issue)
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Issue created successfully",
        "issue_url": created.html_url,
        "data": { "issue_number": created.number },
    })))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    creds: Credentials,
    #[serde(default)]
    save_to_redis: bool,
    #[serde(default)]
    metadata: Option<Value>,
}

pub async fn verify(State(server): State<Server>, Json(request): Json<VerifyRequest>) -> ApiResult {
    if request.save_to_redis || request.metadata.is_some() {
        debug!("Ignoring persistence options for {}; connections are not stored", request.creds.slug());
    }

    let result = verification(&server, &request.creds).await;

    if !result.valid {
        return Err(ApiError::unauthorized(result.message));
    }

    Ok(Json(json!({
        "success": true,
        "message": result.message,
        "data": { "repo_data": result.repo_data },
    })))
}

pub async fn verify_token(State(server): State<Server>, Query(creds): Query<Credentials>) -> Json<Verification> {
    Json(verification(&server, &creds).await)
}

/// Verifies `creds`, consulting the cache first. Only full successes are cached.
async fn verification(server: &Server, creds: &Credentials) -> Verification {
    let key = creds.fingerprint();

    if let Some(hit) = server.verified.get(&key) {
        debug!("Verification cache hit for {}", creds.slug());
        return hit;
    }

    let result = server.github.verify(creds).await;

    if result.valid && result.repo_exists {
        server.verified.insert(key, result.clone()).await;
    }

    result
}

#[cfg(test)]
mod test {
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::Router;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::serve::router;

    fn app(api_url: &str) -> Router {
        let args = Arguments::parse_from(["issuesmith", "serve"]);
        let mut config = Config::default();
        config.github.api_url = api_url.to_owned();
        config.serve.frontend_dir = None;

        let ctx = InnerContext::new(args, config);
        router(Server::new(&ctx).unwrap()).unwrap()
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn issue_body(title: &str) -> Value {
        json!({
            "title": title,
            "body": "Steps: none",
            "token": "t0ken",
            "username": "octo",
            "repo_name": "widgets",
            "labels": ["bug"],
        })
    }

    async fn mount_verification(server: &MockServer, user_status: u16) {
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(user_status).set_body_json(json!({ "login": "octo" })))
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "widgets",
                "full_name": "octo/widgets",
                "private": true,
                "stargazers_count": 3,
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = call(app("http://127.0.0.1:9"), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn templates_filtered() {
        let (status, body) = call(app("http://127.0.0.1:9"), get("/api/templates?category=BUG")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Found 1 templates");
        assert_eq!(body["templates"][0]["name"], "bug_report");
    }

    #[tokio::test]
    async fn template_alias() {
        let (status, body) = call(app("http://127.0.0.1:9"), get("/api/template/security")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["template"]["is_public"], false);
        assert_eq!(body["data"]["fields"][0]["name"], "vulnerability");
    }

    #[tokio::test]
    async fn unknown_template_is_404() {
        let (status, body) = call(app("http://127.0.0.1:9"), get("/api/templates/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Template not found");
    }

    #[tokio::test]
    async fn preview_from_template() {
        let request = post(
            "/api/preview",
            json!({
                "template": "bug_report",
                "fields": { "bug_description": "It *breaks*", "blocking": true }
            }),
        );

        let (status, body) = call(app("http://127.0.0.1:9"), request).await;
        let html = body["data"]["html"].as_str().unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["body"].as_str().unwrap().contains("It *breaks*"));
        assert!(html.contains("It <em>breaks</em>"));
        assert!(html.contains("<strong>Blocking release?</strong> Yes"));
    }

    #[tokio::test]
    async fn preview_from_body() {
        let request = post(
            "/api/preview",
            json!({
                "body": "Hello {name}, priority {priority}",
                "fields": { "name": "Alice", "priority": "High" }
            }),
        );

        let (_, body) = call(app("http://127.0.0.1:9"), request).await;

        assert_eq!(body["data"]["body"], "Hello Alice, priority High");
        assert_eq!(body["data"]["html"], "<p>Hello Alice, priority High</p>");
    }

    #[tokio::test]
    async fn preview_needs_input() {
        let (status, _) = call(app("http://127.0.0.1:9"), post("/api/preview", json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_validates_title() {
        let (status, body) = call(app("http://127.0.0.1:9"), post("/api/issues/create", issue_body(" "))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "`title` must not be empty");

        let long = "x".repeat(201);
        let (status, _) = call(app("http://127.0.0.1:9"), post("/api/issues/create", issue_body(&long))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_allows_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues"))
            .and(body_json(json!({ "title": "No details", "body": "", "labels": ["bug"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "number": 3,
                "html_url": "https://github.com/octo/widgets/issues/3"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = issue_body("No details");
        request["body"] = json!("");

        let (status, body) = call(app(&server.uri()), post("/api/issues/create", request)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["issue_number"], 3);
    }

    #[tokio::test]
    async fn create_proxies_to_github() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "number": 12,
                "html_url": "https://github.com/octo/widgets/issues/12"
            })))
            .mount(&server)
            .await;

        let (status, body) = call(app(&server.uri()), post("/api/create-issue", issue_body("Crash"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["issue_url"], "https://github.com/octo/widgets/issues/12");
        assert_eq!(body["data"]["issue_number"], 12);
    }

    #[tokio::test]
    async fn create_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "Validation Failed" })))
            .mount(&server)
            .await;

        let (status, body) = call(app(&server.uri()), post("/api/issues/create", issue_body("Crash"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "GitHub API error: 422 - Validation Failed");
    }

    #[tokio::test]
    async fn verify_rejects_bad_token() {
        let server = MockServer::start().await;
        mount_verification(&server, 401).await;

        let request = post(
            "/api/verify",
            json!({ "username": "octo", "repo_name": "widgets", "token": "t0ken", "save_to_redis": true }),
        );
        let (status, body) = call(app(&server.uri()), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token (HTTP 401)");
    }

    #[tokio::test]
    async fn verify_is_cached() {
        let server = MockServer::start().await;
        mount_verification(&server, 200).await;

        let app = app(&server.uri());
        let request = || post("/api/verify", json!({ "username": "octo", "repo_name": "widgets", "token": "t0ken" }));

        let (status, body) = call(app.clone(), request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["repo_data"]["full_name"], "octo/widgets");

        // Served from the cache; the `/user` mock only expects one hit.
        let (status, _) = call(app.clone(), request()).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(app, get("/api/verify-token?token=t0ken&username=octo&repo_name=widgets")).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["repo_exists"], true);
        assert_eq!(body["repo_data"]["stars"], 3);
    }
}
