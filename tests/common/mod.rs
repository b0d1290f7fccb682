//! Shared setup for the HTTP contract tests.
#![allow(dead_code)]

pub mod failing;
pub mod fixtures;

use quickpoll::backend::{AuthUser, MemoryBackend};
use std::sync::Arc;

pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";
pub const PUBLIC_URL: &str = "http://storage.test";

/// Builds the app around a memory backend and starts a test service.
#[macro_export]
macro_rules! init_app {
    ($backend:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(
                    $backend.clone() as std::sync::Arc<dyn quickpoll::backend::Backend>
                ))
                .wrap(quickpoll::middleware::ClientCtx::default())
                .configure(quickpoll::web::configure)
                .default_service(actix_web::web::to(quickpoll::web::not_found)),
        )
        .await
    };
}

/// A memory backend with two registered users.
pub struct TestEnv {
    pub backend: Arc<MemoryBackend>,
    pub alice: AuthUser,
    pub bob: AuthUser,
}

pub fn setup() -> TestEnv {
    let backend = Arc::new(MemoryBackend::new(PUBLIC_URL.to_string()));
    let alice = backend.add_user(ALICE_TOKEN, "alice@example.com", Some("Alice".to_string()));
    let bob = backend.add_user(BOB_TOKEN, "bob@example.com", None);
    TestEnv {
        backend,
        alice,
        bob,
    }
}

/// `Authorization` header for a token.
pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
