//! Integration tests for the ComfyCube storefront.
//!
//! Tests drive the `comfycube-storefront` library over real HTTP against
//! [`FakeApi`], an in-process axum server that mimics the remote
//! catalog/order API: products, categories, reviews, token auth, and the
//! cart and wishlist write endpoints. Every test spawns its own server on
//! `127.0.0.1:0`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p comfycube-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use comfycube_storefront::Storefront;
use comfycube_storefront::config::ApiConfig;
use comfycube_storefront::storage::{MemoryStorage, Storage};

/// Seeded account that can sign in.
pub const SHOPPER_EMAIL: &str = "shopper@comfycube.test";
/// Password of [`SHOPPER_EMAIL`].
pub const SHOPPER_PASSWORD: &str = "secret1";

type Shared = Arc<Mutex<FakeState>>;

/// An account known to the fake API.
#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    /// Current bearer token; `None` once revoked.
    pub token: Option<String>,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
        })
    }
}

/// Everything the fake API serves and records.
#[derive(Debug, Default)]
pub struct FakeState {
    pub products: Vec<Value>,
    pub categories: Vec<Value>,
    pub reviews: HashMap<String, Vec<Value>>,
    pub users: Vec<FakeUser>,
    /// Number of `GET /products` calls.
    pub product_list_hits: usize,
    /// Number of `GET /products/{id}/reviews` calls.
    pub review_list_hits: usize,
    /// Number of `POST /auth/signup` calls.
    pub signup_hits: usize,
    /// Bodies accepted by `POST /cart/items`, in arrival order.
    pub cart_requests: Vec<Value>,
    /// Bodies accepted by `POST /wishlist/items`, in arrival order.
    pub wishlist_requests: Vec<Value>,
    /// When set, cart and wishlist writes fail with this status.
    pub fail_writes_with: Option<u16>,
    /// When set, product reads fail with this status.
    pub fail_reads_with: Option<u16>,
    /// When true, product reads answer 200 with a body that is not JSON.
    pub garble_reads: bool,
}

impl FakeState {
    /// Three categories, five products, one review and one account.
    #[must_use]
    pub fn seeded() -> Self {
        let products = vec![
            json!({
                "id": "p1", "name": "Cloud Sofa", "price": "20.00",
                "imageUrl": "https://img.comfycube.test/p1.jpg",
                "category_id": "sofas", "category": "Sofas",
                "description": "Deep seat, feather cushions",
                "measurements": "W 220 x D 95 x H 80 cm", "quantity": 5
            }),
            json!({
                "id": "p2", "name": "Oak Dining Chair", "price": 45.5,
                "category_id": "chairs", "category": "Chairs", "quantity": 12
            }),
            json!({
                "id": "p3", "name": "Linen Sofa", "price": "899.50",
                "category_id": "sofas", "category": "Sofas", "quantity": 3
            }),
            json!({
                "id": "p4", "name": "Velvet Sofa", "price": "1200.00",
                "category_id": "sofas", "category": "Sofas", "quantity": 0
            }),
            json!({
                "id": "p5", "name": "Bench", "price": "150.00",
                "category_id": "chairs", "category": "Chairs", "quantity": 40
            }),
        ];
        let categories = vec![
            json!({"id": "sofas", "name": "Sofas"}),
            json!({"id": "chairs", "name": "Chairs"}),
            json!({"id": "beds", "name": "Beds"}),
        ];
        let mut reviews = HashMap::new();
        reviews.insert(
            "p1".to_string(),
            vec![json!({
                "id": "r1", "product_id": "p1", "user_id": "u0", "rating": 5,
                "comment": "So comfortable", "created_at": "2026-02-01T10:00:00Z"
            })],
        );
        let users = vec![FakeUser {
            id: "u1".to_string(),
            name: "Sam Shopper".to_string(),
            email: SHOPPER_EMAIL.to_string(),
            password: SHOPPER_PASSWORD.to_string(),
            role: "User".to_string(),
            token: Some("tok-u1".to_string()),
        }];

        Self {
            products,
            categories,
            reviews,
            users,
            ..Self::default()
        }
    }

    fn user_for(&self, headers: &HeaderMap) -> Option<&FakeUser> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.users
            .iter()
            .find(|u| u.token.as_deref() == Some(token))
    }

    fn has_product(&self, id: &str) -> bool {
        self.products.iter().any(|p| p["id"] == id)
    }
}

/// A running fake remote API.
pub struct FakeApi {
    base_url: String,
    state: Shared,
}

impl FakeApi {
    /// Spawn a server with [`FakeState::seeded`] data.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        Self::spawn_with(FakeState::seeded()).await
    }

    /// Spawn a server serving `state`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn_with(state: FakeState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake API");
        let addr = listener.local_addr().expect("Fake API has no address");

        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API configuration pointing at this server.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse (it always does).
    #[must_use]
    pub fn config(&self) -> ApiConfig {
        ApiConfig::new(&self.base_url).expect("Fake API URL is valid")
    }

    /// A remote-auth storefront with in-memory persistence.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        self.storefront_with(Arc::new(MemoryStorage::new()))
    }

    /// A remote-auth storefront over `storage`.
    ///
    /// # Panics
    ///
    /// Panics if the persisted state cannot be read.
    #[must_use]
    pub fn storefront_with(&self, storage: Arc<dyn Storage>) -> Storefront {
        Storefront::remote(&self.config(), storage).expect("Failed to open storefront")
    }

    /// Inspect or change what the server serves and has recorded.
    ///
    /// # Panics
    ///
    /// Panics if a handler panicked while holding the lock.
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("Fake API state poisoned")
    }

    /// Make cart and wishlist writes fail with `status`, or succeed again.
    pub fn fail_writes_with(&self, status: Option<u16>) {
        self.state().fail_writes_with = status;
    }

    /// Make product reads fail with `status`, or succeed again.
    pub fn fail_reads_with(&self, status: Option<u16>) {
        self.state().fail_reads_with = status;
    }

    /// Answer product reads with an undecodable 200 body.
    pub fn garble_reads(&self) {
        self.state().garble_reads = true;
    }

    /// Invalidate every issued token; authenticated calls then get 401.
    pub fn revoke_tokens(&self) {
        for user in &mut self.state().users {
            user.token = None;
        }
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/reviews", get(list_reviews).post(create_review))
        .route("/categories", get(list_categories))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signup", post(sign_up))
        .route("/cart/items", post(put_cart_item))
        .route("/wishlist/items", post(put_wishlist_item))
        .with_state(state)
}

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().expect("Fake API state poisoned")
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_products(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    state.product_list_hits += 1;
    if let Some(rejection) = reject_read(&state) {
        return rejection;
    }
    Json(Value::Array(state.products.clone())).into_response()
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let state = lock(&state);
    if let Some(rejection) = reject_read(&state) {
        return rejection;
    }
    state
        .products
        .iter()
        .find(|p| p["id"] == id.as_str())
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Product not found"),
            |product| Json(product.clone()).into_response(),
        )
}

async fn list_categories(State(state): State<Shared>) -> Json<Value> {
    Json(Value::Array(lock(&state).categories.clone()))
}

async fn list_reviews(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    if !state.has_product(&id) {
        return error(StatusCode::NOT_FOUND, "Product not found");
    }
    state.review_list_hits += 1;
    let reviews = state.reviews.get(&id).cloned().unwrap_or_default();
    Json(Value::Array(reviews)).into_response()
}

#[derive(Deserialize)]
struct ReviewBody {
    rating: i64,
    comment: String,
}

async fn create_review(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ReviewBody>,
) -> Response {
    let mut state = lock(&state);
    let Some(user_id) = state.user_for(&headers).map(|u| u.id.clone()) else {
        return error(StatusCode::UNAUTHORIZED, "Invalid token");
    };
    if !state.has_product(&id) {
        return error(StatusCode::NOT_FOUND, "Product not found");
    }

    let reviews = state.reviews.entry(id.clone()).or_default();
    let review = json!({
        "id": format!("r-{id}-{}", reviews.len() + 1),
        "product_id": id,
        "user_id": user_id,
        "rating": body.rating,
        "comment": body.comment,
        "created_at": "2026-03-01T12:00:00Z",
    });
    reviews.push(review.clone());
    (StatusCode::CREATED, Json(review)).into_response()
}

#[derive(Deserialize)]
struct SignInBody {
    email: String,
    password: String,
}

async fn sign_in(State(state): State<Shared>, Json(body): Json<SignInBody>) -> Response {
    let mut state = lock(&state);
    let Some(user) = state
        .users
        .iter_mut()
        .find(|u| u.email == body.email && u.password == body.password)
    else {
        return error(StatusCode::UNAUTHORIZED, "Invalid login credentials");
    };

    let token = user
        .token
        .get_or_insert_with(|| format!("tok-{}-again", user.id))
        .clone();
    Json(json!({ "user": user.to_json(), "token": token })).into_response()
}

#[derive(Deserialize)]
struct SignUpBody {
    name: String,
    email: String,
    password: String,
    role: String,
}

async fn sign_up(State(state): State<Shared>, Json(body): Json<SignUpBody>) -> Response {
    let mut state = lock(&state);
    state.signup_hits += 1;
    if state.users.iter().any(|u| u.email == body.email) {
        return error(StatusCode::CONFLICT, "User already registered");
    }

    let id = format!("u{}", state.users.len() + 1);
    let user = FakeUser {
        token: Some(format!("tok-{id}")),
        id,
        name: body.name,
        email: body.email,
        password: body.password,
        role: body.role,
    };
    let response = json!({ "user": user.to_json(), "token": user.token });
    state.users.push(user);
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn put_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Some(rejection) = reject_write(&state, &headers) {
        return rejection;
    }
    state.cart_requests.push(body);
    StatusCode::NO_CONTENT.into_response()
}

async fn put_wishlist_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Some(rejection) = reject_write(&state, &headers) {
        return rejection;
    }
    state.wishlist_requests.push(body);
    StatusCode::NO_CONTENT.into_response()
}

fn reject_read(state: &FakeState) -> Option<Response> {
    if state.garble_reads {
        return Some((StatusCode::OK, "<html>maintenance</html>").into_response());
    }
    let status = state
        .fail_reads_with
        .and_then(|code| StatusCode::from_u16(code).ok())?;
    Some(error(status, "Catalog unavailable"))
}

fn reject_write(state: &FakeState, headers: &HeaderMap) -> Option<Response> {
    if state.user_for(headers).is_none() {
        return Some(error(StatusCode::UNAUTHORIZED, "Invalid token"));
    }
    let status = state
        .fail_writes_with
        .and_then(|code| StatusCode::from_u16(code).ok())?;
    Some(error(status, "Write rejected"))
}
