//! Sign-in, sign-up and session persistence against the fake API.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use comfycube_core::Role;
use comfycube_integration_tests::{FakeApi, SHOPPER_EMAIL, SHOPPER_PASSWORD};
use comfycube_storefront::StorefrontError;
use comfycube_storefront::storage::FileStorage;

#[tokio::test]
async fn sign_in_persists_across_restarts() {
    let api = FakeApi::spawn().await;
    let dir = tempfile::tempdir().unwrap();

    let mut storefront = api.storefront_with(Arc::new(FileStorage::new(dir.path())));
    let user = storefront
        .sign_in(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.name, "Sam Shopper");
    assert_eq!(user.role, Role::User);
    assert!(storefront.session().is_authenticated());

    let reopened = api.storefront_with(Arc::new(FileStorage::new(dir.path())));
    assert!(!reopened.session().is_loading());
    assert_eq!(reopened.user().unwrap().email.as_str(), SHOPPER_EMAIL);
    assert!(!reopened.session().is_admin());
}

#[tokio::test]
async fn sign_out_clears_the_persisted_session() {
    let api = FakeApi::spawn().await;
    let dir = tempfile::tempdir().unwrap();

    let mut storefront = api.storefront_with(Arc::new(FileStorage::new(dir.path())));
    storefront
        .sign_in(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap();
    storefront.sign_out().unwrap();
    storefront.sign_out().unwrap();

    let reopened = api.storefront_with(Arc::new(FileStorage::new(dir.path())));
    assert!(reopened.user().is_none());
}

#[tokio::test]
async fn wrong_password_is_an_auth_error() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();

    let err = storefront
        .sign_in(SHOPPER_EMAIL, "wrong-password")
        .await
        .unwrap_err();
    assert!(err.requires_sign_in(), "{err:?}");
    assert!(storefront.user().is_none());
}

#[tokio::test]
async fn short_password_is_rejected_before_any_request() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();

    let err = storefront
        .sign_up("Alex Doe", "alex@comfycube.test", "12345", Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::Validation(_)), "{err:?}");
    assert_eq!(api.state().signup_hits, 0);
}

#[tokio::test]
async fn sign_up_signs_the_new_user_in() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();

    let user = storefront
        .sign_up("Alex Doe", "alex@comfycube.test", "secret99", Role::Admin)
        .await
        .unwrap();
    assert_eq!(user.name, "Alex Doe");
    assert!(storefront.session().is_admin());
    assert_eq!(api.state().users.len(), 2);
}

#[tokio::test]
async fn duplicate_email_on_sign_up_is_an_auth_error() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();

    let err = storefront
        .sign_up("Sam Again", SHOPPER_EMAIL, "secret99", Role::User)
        .await
        .unwrap_err();
    match err {
        StorefrontError::Auth(message) => assert!(message.contains("already exists")),
        other => panic!("expected Auth, got {other:?}"),
    }
    assert!(storefront.user().is_none());
}
