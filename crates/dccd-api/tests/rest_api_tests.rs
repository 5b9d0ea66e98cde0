//! Endpoint behavior tests: authentication gating, content negotiation,
//! and error mapping.

mod common;

use axum::http::StatusCode;

use common::{
    create_test_app, create_test_backends, get, get_with_accept, ADMIN, OWNER, STRANGER,
};

#[tokio::test]
async fn test_health_check_is_open() {
    let (archive, users) = create_test_backends();
    let (status, body) = get(create_test_app(&archive, &users), "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
}

#[tokio::test]
async fn test_empty_project_listing() {
    let (archive, users) = create_test_backends();
    let (status, body) = get(create_test_app(&archive, &users), "/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("<?xml"));
    assert!(body.contains("<projects total=\"0\" offset=\"0\">"));
}

#[tokio::test]
async fn test_unknown_project_is_404() {
    let (archive, users) = create_test_backends();
    let (status, _) = get(create_test_app(&archive, &users), "/projects/dccd:999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_my_projects_require_authentication() {
    let (archive, users) = create_test_backends();

    let (status, _) = get(create_test_app(&archive, &users), "/myprojects", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(
        create_test_app(&archive, &users),
        "/myprojects",
        Some(("normaltestuser", "wrongpassword")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(
        create_test_app(&archive, &users),
        "/myprojects",
        Some(OWNER),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tridas_download_requires_authentication() {
    let (archive, users) = create_test_backends();
    let (status, _) = get(
        create_test_app(&archive, &users),
        "/projects/dccd:1/tridas",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_entity_level_is_404() {
    let (archive, users) = create_test_backends();
    // the level segment is validated before anything else
    let (status, body) = get(
        create_test_app(&archive, &users),
        "/projects/dccd:1/tridas/everything",
        Some(OWNER),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("level_not_found"));
}

#[tokio::test]
async fn test_project_listing_negotiates_json() {
    let (archive, users) = create_test_backends();
    let (status, body) = get_with_accept(
        create_test_app(&archive, &users),
        "/projects",
        None,
        Some("application/json"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["projects"]["@total"], "0");
}

#[tokio::test]
async fn test_bad_modified_filter_is_rejected() {
    let (archive, users) = create_test_backends();
    let (status, body) = get(
        create_test_app(&archive, &users),
        "/projects?modFrom=yesterday",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("validation_error"));
}

#[tokio::test]
async fn test_user_listing_is_admin_only() {
    let (archive, users) = create_test_backends();

    let (status, _) = get(create_test_app(&archive, &users), "/users", Some(STRANGER)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = get(create_test_app(&archive, &users), "/users", Some(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<id>normaltestuser</id>"));
    assert!(body.contains("<id>stranger</id>"));
}

#[tokio::test]
async fn test_user_details_for_admin_or_self() {
    let (archive, users) = create_test_backends();

    let (status, body) = get(
        create_test_app(&archive, &users),
        "/users/stranger",
        Some(STRANGER),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<displayName>Stranger</displayName>"));

    let (status, _) = get(
        create_test_app(&archive, &users),
        "/users/normaltestuser",
        Some(STRANGER),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(
        create_test_app(&archive, &users),
        "/users/normaltestuser",
        Some(ADMIN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_organisations_require_authentication() {
    let (archive, users) = create_test_backends();
    users.add_organisation(dccd_storage::Organisation {
        id: "RING".into(),
        city: Some("Amersfoort".into()),
        country: Some("NL".into()),
    });

    let (status, _) = get(create_test_app(&archive, &users), "/organisations", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(
        create_test_app(&archive, &users),
        "/organisations",
        Some(STRANGER),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<id>RING</id>"));
    assert!(body.contains("<city>Amersfoort</city>"));
}
