// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for cross-deployment link resolution.

mod common;

use aegis_variables::application::{InterpolationError, InterpolationOptions};
use aegis_variables::domain::variable::{RequestContext, VariableId};
use common::{Call, Harness, RacingRepository};
use serde_json::json;

fn request() -> RequestContext {
    RequestContext::new("admin")
}

#[tokio::test]
async fn test_provider_binding_is_copied_into_consumer() {
    let harness = Harness::new();
    let pinned = harness.server.put("/d1/provider/db_pw", json!("pinned"));
    harness.server.put("/d1/provider/db_pw", json!("newer"));

    let provider = harness.store.create_writable("provider").await.unwrap();
    harness
        .store
        .add("/d1/provider/db_pw", &VariableId::new(pinned.clone()), &provider)
        .await
        .unwrap();
    let provider = harness.store.freeze(&provider, true).await.unwrap();
    let consumer = harness.store.create_writable("consumer").await.unwrap();

    let result = harness
        .link_resolver()
        .resolve_link_properties(
            &json!({"password": "((db_pw))", "user": "admin"}),
            &consumer,
            &provider,
            &InterpolationOptions::default(),
            &request(),
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"password": "pinned", "user": "admin"}));
    assert_eq!(harness.server.calls(), vec![Call::GetById(pinned.clone())]);

    let associations = harness.store.associations(&consumer).await.unwrap();
    assert_eq!(associations.len(), 1);
    assert_eq!(associations[0].variable_name, "/d1/provider/db_pw");
    assert_eq!(associations[0].variable_id, VariableId::new(pinned));
    assert!(!associations[0].is_local);
    assert_eq!(associations[0].provider_deployment.as_deref(), Some("provider"));
}

#[tokio::test]
async fn test_consumer_binding_wins_over_provider() {
    let harness = Harness::new();
    let old = harness.server.put("/d1/provider/db_pw", json!("old"));
    let new = harness.server.put("/d1/provider/db_pw", json!("new"));

    let provider = harness.store.create_writable("provider").await.unwrap();
    harness
        .store
        .add("/d1/provider/db_pw", &VariableId::new(new), &provider)
        .await
        .unwrap();

    let consumer = harness.store.create_writable("consumer").await.unwrap();
    harness
        .store
        .add_link("/d1/provider/db_pw", &VariableId::new(old.clone()), "provider", &consumer)
        .await
        .unwrap();
    let consumer = harness.store.freeze(&consumer, true).await.unwrap();

    let result = harness
        .link_resolver()
        .resolve_link_properties(
            &json!({"password": "((db_pw))"}),
            &consumer,
            &provider,
            &InterpolationOptions::default(),
            &request(),
        )
        .await
        .unwrap();

    assert_eq!(result["password"], "old");
    assert_eq!(harness.server.calls(), vec![Call::GetById(old)]);
}

#[tokio::test]
async fn test_frozen_consumer_without_binding_is_fatal() {
    let harness = Harness::new();
    let provider = harness.store.create_writable("provider").await.unwrap();
    let consumer = harness.store.create_writable("consumer").await.unwrap();
    let consumer = harness.store.freeze(&consumer, true).await.unwrap();

    let error = harness
        .link_resolver()
        .resolve_link_properties(
            &json!({"password": "((db_pw))"}),
            &consumer,
            &provider,
            &InterpolationOptions::default(),
            &request(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, InterpolationError::InconsistentVariableState(_)));
    assert_eq!(
        error.to_string(),
        "Variable '/d1/provider/db_pw' must already be versioned in deployment 'consumer'"
    );
}

#[tokio::test]
async fn test_unversioned_provider_variable_is_fatal() {
    let harness = Harness::new();
    harness.server.put("/d1/provider/db_pw", json!("exists"));
    let provider = harness.store.create_writable("provider").await.unwrap();
    let consumer = harness.store.create_writable("consumer").await.unwrap();

    let error = harness
        .link_resolver()
        .resolve_link_properties(
            &json!({"password": "((db_pw))"}),
            &consumer,
            &provider,
            &InterpolationOptions::default(),
            &request(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Variable '/d1/provider/db_pw' must be already versioned in link provider deployment 'provider'"
    );
    assert!(harness.server.calls().is_empty());
}

#[tokio::test]
async fn test_absolute_names_are_not_namespaced() {
    let harness = Harness::new();
    let id = harness.server.put("/shared/ca", json!({"certificate": "cert"}));

    let provider = harness.store.create_writable("provider").await.unwrap();
    harness
        .store
        .add("/shared/ca", &VariableId::new(id), &provider)
        .await
        .unwrap();
    let consumer = harness.store.create_writable("consumer").await.unwrap();

    let result = harness
        .link_resolver()
        .resolve_link_properties(
            &json!({"ca": "((/shared/ca.certificate))"}),
            &consumer,
            &provider,
            &InterpolationOptions::default(),
            &request(),
        )
        .await
        .unwrap();

    assert_eq!(result["ca"], "cert");
}

#[tokio::test]
async fn test_lost_link_race_returns_winning_value() {
    let repository = RacingRepository::new();
    let harness = Harness::with_repository(repository.clone());
    let winner = harness.server.put("/d1/provider/db_pw", json!("first"));
    let pinned = harness.server.put("/d1/provider/db_pw", json!("pinned"));

    let provider = harness.store.create_writable("provider").await.unwrap();
    harness
        .store
        .add("/d1/provider/db_pw", &VariableId::new(pinned.clone()), &provider)
        .await
        .unwrap();
    let provider = harness.store.freeze(&provider, true).await.unwrap();
    let consumer = harness.store.create_writable("consumer").await.unwrap();
    repository.compete_for("/d1/provider/db_pw", winner.clone());

    let result = harness
        .link_resolver()
        .resolve_link_properties(
            &json!({"password": "((db_pw))"}),
            &consumer,
            &provider,
            &InterpolationOptions::default(),
            &request(),
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"password": "first"}));
    assert_eq!(harness.server.calls(), vec![Call::GetById(winner.clone())]);

    let associations = harness.store.associations(&consumer).await.unwrap();
    assert_eq!(associations.len(), 1);
    assert_eq!(associations[0].variable_id, VariableId::new(winner));
}
