//! Integration tests for the STNS catalog admin client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stns-integration-tests
//! ```
//!
//! Every test starts its own [`MockBackend`]: an in-process axum server on an
//! ephemeral port that speaks the catalog backend's JSON contract and counts
//! what it sees. No external services are needed.
//!
//! # Test Files
//!
//! - `auth_header` - Bearer header attachment
//! - `token_refresh` - Refresh-and-retry and its failure modes
//! - `concurrent_refresh` - Single-flight refresh under concurrent 401s
//! - `session_flow` - Login, logout and the route guard end to end
//! - `catalog` - Category and product services

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use stns_client::{
    App, ClientConfig, MemoryTokenStore, StoredTokens, TokenStore,
    client::REQUEST_ID_HEADER,
    token::{AccessToken, RefreshToken},
};
use stns_core::catalog::CategoryRef;
use stns_core::{Category, CategoryId, Page, Price, Product, ProductId};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Username accepted by the mock backend.
pub const USERNAME: &str = "admin";
/// Password accepted by the mock backend.
pub const PASSWORD: &str = "secret";
/// Category name that makes `POST /category` fail with a 500.
pub const FAILING_CATEGORY: &str = "explode";

/// One request the backend received on a protected endpoint.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Default)]
struct Catalog {
    categories: Vec<Category>,
    products: Vec<Product>,
    next_id: i64,
}

struct MockState {
    /// Token generation; access and refresh tokens are `access-N` / `refresh-N`.
    generation: AtomicU64,
    /// Whether the current access token is accepted.
    access_valid: AtomicBool,
    /// Reject every bearer token, even a freshly refreshed one.
    reject_all: AtomicBool,
    /// Refuse every refresh attempt.
    reject_refresh: AtomicBool,
    refresh_delay: Mutex<Duration>,
    refresh_calls: AtomicUsize,
    login_calls: AtomicUsize,
    seen: Mutex<Vec<SeenRequest>>,
    emails: Mutex<Vec<String>>,
    catalog: Mutex<Catalog>,
}

impl MockState {
    fn new() -> Self {
        Self {
            generation: AtomicU64::new(1),
            access_valid: AtomicBool::new(true),
            reject_all: AtomicBool::new(false),
            reject_refresh: AtomicBool::new(false),
            refresh_delay: Mutex::new(Duration::ZERO),
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            emails: Mutex::new(Vec::new()),
            catalog: Mutex::new(seed_catalog()),
        }
    }

    fn access_token(&self) -> String {
        format!("access-{}", self.generation.load(Ordering::SeqCst))
    }

    fn refresh_token(&self) -> String {
        format!("refresh-{}", self.generation.load(Ordering::SeqCst))
    }

    /// Record the request and check its bearer token.
    fn authorize(&self, path: &str, headers: &HeaderMap) -> Result<(), Response> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let authorization = header(AUTHORIZATION.as_str());
        lock(&self.seen).push(SeenRequest {
            path: path.to_string(),
            authorization: authorization.clone(),
            request_id: header(REQUEST_ID_HEADER),
        });

        let expected = format!("Bearer {}", self.access_token());
        let accepted = !self.reject_all.load(Ordering::SeqCst)
            && self.access_valid.load(Ordering::SeqCst)
            && authorization.as_deref() == Some(expected.as_str());
        if accepted {
            Ok(())
        } else {
            Err(error(StatusCode::UNAUTHORIZED, "Full authentication is required"))
        }
    }
}

fn seed_catalog() -> Catalog {
    let category = |id, name: &str| Category {
        id: CategoryId::new(id),
        name: name.to_string(),
        products: Vec::new(),
    };
    let product = |id, name: &str, price: &str, quantity, category_id| Product {
        id: ProductId::new(id),
        name: name.to_string(),
        quantity,
        price: Price::parse(price).expect("seed price"),
        category: Some(CategoryRef {
            id: CategoryId::new(category_id),
        }),
    };

    Catalog {
        categories: vec![
            category(1, "Tools"),
            category(2, "Garden"),
            category(3, "Kitchen"),
            category(4, "Lighting"),
        ],
        products: vec![
            product(10, "Hammer", "12.50", 3, 1),
            product(11, "Screwdriver", "4.99", 10, 1),
            product(12, "Rake", "20.00", 1, 2),
            product(13, "Garden Hose", "35.00", 2, 2),
            product(14, "Frying Pan", "18.75", 5, 3),
        ],
        next_id: 100,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Slice out 1-based `page` of `size` items.
fn paginate<T: Clone>(items: &[T], page: usize, size: usize) -> Page<T> {
    let size = size.max(1);
    let total_pages = items.len().div_ceil(size).max(1);
    let content = items
        .chunks(size)
        .nth(page.saturating_sub(1))
        .map(<[T]>::to_vec)
        .unwrap_or_default();
    Page {
        content,
        total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
    }
}

fn paging(params: &HashMap<String, String>) -> Option<(usize, usize)> {
    let page = params.get("page")?.parse().ok()?;
    let size = params.get("size")?.parse().ok()?;
    Some((page, size))
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn authenticate(
    State(state): State<Arc<MockState>>,
    Json(body): Json<LoginBody>,
) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if body.username == USERNAME && body.password == PASSWORD {
        state.access_valid.store(true, Ordering::SeqCst);
        Json(json!({
            "token": state.access_token(),
            "refresh_token": state.refresh_token(),
        }))
        .into_response()
    } else {
        // Real backends answer bad credentials with an empty 401.
        StatusCode::UNAUTHORIZED.into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpBody {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
}

async fn sign_up(State(state): State<Arc<MockState>>, Json(body): Json<SignUpBody>) -> Response {
    if body.password != body.confirm_password {
        return error(StatusCode::BAD_REQUEST, "Passwords do not match");
    }
    let mut emails = lock(&state.emails);
    if emails.contains(&body.email) {
        return error(StatusCode::BAD_REQUEST, "Email is already registered");
    }
    emails.push(body.email.clone());
    let id = emails.len();
    Json(json!({ "id": id, "name": body.name, "email": body.email })).into_response()
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<RefreshBody>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *lock(&state.refresh_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    if state.reject_refresh.load(Ordering::SeqCst) || body.refresh_token != state.refresh_token() {
        return error(StatusCode::UNAUTHORIZED, "Refresh token is invalid or expired");
    }
    state.generation.fetch_add(1, Ordering::SeqCst);
    state.access_valid.store(true, Ordering::SeqCst);
    Json(json!({
        "access_token": state.access_token(),
        "refresh_token": state.refresh_token(),
    }))
    .into_response()
}

async fn list_categories(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/category/all", &headers) {
        return rejection;
    }
    let catalog = lock(&state.catalog);
    match paging(&params) {
        Some((page, size)) => Json(paginate(&catalog.categories, page, size)).into_response(),
        None => Json(catalog.categories.clone()).into_response(),
    }
}

#[derive(Deserialize)]
struct NewCategoryBody {
    category: NewCategoryFields,
}

#[derive(Deserialize)]
struct NewCategoryFields {
    name: String,
}

async fn create_category(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<NewCategoryBody>,
) -> Response {
    if let Err(rejection) = state.authorize("/category", &headers) {
        return rejection;
    }
    let name = body.category.name;
    if name == FAILING_CATEGORY {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "could not execute statement");
    }
    let mut catalog = lock(&state.catalog);
    if catalog.categories.iter().any(|c| c.name.eq_ignore_ascii_case(&name)) {
        return error(StatusCode::BAD_REQUEST, "Category already exists");
    }
    catalog.next_id += 1;
    let category = Category {
        id: CategoryId::new(catalog.next_id),
        name,
        products: Vec::new(),
    };
    catalog.categories.push(category.clone());
    Json(category).into_response()
}

async fn list_products(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/product/all", &headers) {
        return rejection;
    }
    let catalog = lock(&state.catalog);
    match paging(&params) {
        Some((page, size)) => Json(paginate(&catalog.products, page, size)).into_response(),
        None => Json(catalog.products.clone()).into_response(),
    }
}

async fn search_products(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/product/search", &headers) {
        return rejection;
    }
    let needle = params.get("name").map(|n| n.to_lowercase()).unwrap_or_default();
    let catalog = lock(&state.catalog);
    let found: Vec<Product> = catalog
        .products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    Json(found).into_response()
}

#[derive(Deserialize)]
struct ProductBody {
    #[serde(default)]
    id: Option<ProductId>,
    name: String,
    quantity: u32,
    price: Price,
    #[serde(default)]
    category: Option<CategoryRef>,
}

async fn create_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<ProductBody>,
) -> Response {
    if let Err(rejection) = state.authorize("/product", &headers) {
        return rejection;
    }
    let mut catalog = lock(&state.catalog);
    let Some(category) = body
        .category
        .filter(|r| catalog.categories.iter().any(|c| c.id == r.id))
    else {
        return error(StatusCode::BAD_REQUEST, "Category not found");
    };
    catalog.next_id += 1;
    let product = Product {
        id: ProductId::new(catalog.next_id),
        name: body.name,
        quantity: body.quantity,
        price: body.price,
        category: Some(category),
    };
    catalog.products.push(product.clone());
    Json(product).into_response()
}

async fn update_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<ProductBody>,
) -> Response {
    if let Err(rejection) = state.authorize("/product", &headers) {
        return rejection;
    }
    let mut catalog = lock(&state.catalog);
    let Some(product) = catalog
        .products
        .iter_mut()
        .find(|p| Some(p.id) == body.id)
    else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };
    product.name = body.name;
    product.quantity = body.quantity;
    product.price = body.price;
    Json(product.clone()).into_response()
}

async fn delete_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(rejection) = state.authorize("/product/{id}", &headers) {
        return rejection;
    }
    let mut catalog = lock(&state.catalog);
    let before = catalog.products.len();
    catalog.products.retain(|p| p.id != ProductId::new(id));
    if catalog.products.len() == before {
        return error(StatusCode::NOT_FOUND, "Product not found");
    }
    StatusCode::OK.into_response()
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/users/authenticate", post(authenticate))
        .route("/users/sign-up", post(sign_up))
        .route("/refresh-token", post(refresh))
        .route("/category/all", get(list_categories))
        .route("/category", post(create_category))
        .route("/product/all", get(list_products))
        .route("/product/search", get(search_products))
        .route("/product", post(create_product).put(update_product))
        .route("/product/{id}", axum::routing::delete(delete_product))
        .with_state(state)
}

// =============================================================================
// Mock Backend
// =============================================================================

/// In-process catalog backend for one test.
///
/// The server task is aborted when the backend is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    data_dir: PathBuf,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::new());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral test port");
        let addr = listener.local_addr().expect("get local addr");
        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend failed");
        });

        let data_dir = std::env::temp_dir().join(format!("stns-it-{}", uuid::Uuid::new_v4()));
        Self {
            addr,
            state,
            data_dir,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this backend, with a private data
    /// directory.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url(), &self.data_dir).expect("valid mock base url")
    }

    /// A fully wired app with an in-memory token store.
    #[must_use]
    pub fn app(&self) -> App {
        self.app_with_store(Arc::new(MemoryTokenStore::new()))
    }

    #[must_use]
    pub fn app_with_store(&self, store: Arc<dyn TokenStore>) -> App {
        App::with_store(self.config(), store).expect("build app")
    }

    /// Credentials the backend currently accepts, as if returned by a login.
    #[must_use]
    pub fn issue_tokens(&self) -> StoredTokens {
        StoredTokens::new(
            AccessToken::new(self.state.access_token()),
            Some(RefreshToken::new(self.state.refresh_token())),
        )
    }

    /// Stop accepting the current access token until the next refresh.
    pub fn expire_access_token(&self) {
        self.state.access_valid.store(false, Ordering::SeqCst);
    }

    /// Refuse every refresh attempt.
    pub fn reject_refresh(&self) {
        self.state.reject_refresh.store(true, Ordering::SeqCst);
    }

    /// Reject every bearer token, including refreshed ones.
    pub fn reject_all_tokens(&self) {
        self.state.reject_all.store(true, Ordering::SeqCst);
    }

    /// Make every refresh call take at least `delay`.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *lock(&self.state.refresh_delay) = delay;
    }

    /// Number of calls to `/refresh-token`.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of calls to `/users/authenticate`.
    #[must_use]
    pub fn login_calls(&self) -> usize {
        self.state.login_calls.load(Ordering::SeqCst)
    }

    /// Requests received on protected endpoints, in arrival order.
    #[must_use]
    pub fn seen(&self) -> Vec<SeenRequest> {
        lock(&self.state.seen).clone()
    }

    /// Products currently in the catalog.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        lock(&self.state.catalog).products.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}
