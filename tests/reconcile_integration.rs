//! Integration tests for label, member and participant reconciliation
//!
//! Each flow is driven against wiremock so conflicts, listings and role
//! assignments can be asserted call by call.

use nftower::{OrgRole, ParticipantRef, RetryPolicy, TowerClient, TowerError, WorkspaceRole};
use serde_json::json;
use std::collections::HashSet;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> TowerClient {
    TowerClient::builder("test-token")
        .api_url(server.uri())
        .retry_policy(RetryPolicy::none())
        .build_with_organization_id(1)
        .unwrap()
}

async fn mount_label_create(server: &MockServer, name: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/labels"))
        .and(query_param("workspaceId", "10"))
        .and(body_json(json!({"name": name})))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

mod label_tests {
    use super::*;

    /// One new label and one existing label both resolve from the listing
    #[tokio::test]
    async fn test_created_and_conflicting_labels_resolve() {
        let server = MockServer::start().await;

        mount_label_create(&server, "release", 201, json!({"id": 7, "name": "release"})).await;
        mount_label_create(&server, "nightly", 409, json!({"message": "Label already exists"})).await;

        Mock::given(method("GET"))
            .and(path("/labels"))
            .and(query_param("workspaceId", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": [
                    {"id": 7, "name": "release"},
                    {"id": 42, "name": "nightly"}
                ],
                "totalSize": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let labels = client(&server)
            .ensure_labels(10, &["release", "nightly"])
            .await
            .unwrap();

        let ids: HashSet<i64> = labels.iter().map(|l| l.id).collect();
        assert_eq!(ids, HashSet::from([7, 42]));
    }

    /// A create answered with a bare 201 still counts as created
    #[tokio::test]
    async fn test_bodiless_create_response_resolves() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/labels"))
            .and(body_json(json!({"name": "release"})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        mount_label_create(&server, "nightly", 409, json!({"message": "Label already exists"})).await;

        Mock::given(method("GET"))
            .and(path("/labels"))
            .and(query_param("workspaceId", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": [
                    {"id": 7, "name": "release"},
                    {"id": 42, "name": "nightly"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let labels = client(&server)
            .ensure_labels(10, &["release", "nightly"])
            .await
            .unwrap();

        let ids: HashSet<i64> = labels.iter().map(|l| l.id).collect();
        assert_eq!(ids, HashSet::from([7, 42]));
    }

    /// Ensuring the same name twice yields the same id
    #[tokio::test]
    async fn test_ensure_labels_is_idempotent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "a"})))
            .up_to_n_times(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let first = client.ensure_labels(10, &["a", "b"]).await.unwrap();
        let second = client.ensure_labels(10, &["a"]).await.unwrap();

        let first_a = first.iter().find(|l| l.name == "a").unwrap().id;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first_a);
    }

    /// Names missing from the listing are left out without failing
    #[tokio::test]
    async fn test_unresolved_label_is_dropped() {
        let server = MockServer::start().await;

        mount_label_create(&server, "release", 201, json!({"id": 7, "name": "release"})).await;
        mount_label_create(&server, "Release", 201, json!({"id": 8, "name": "Release"})).await;

        Mock::given(method("GET"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": [{"id": 7, "name": "release"}]
            })))
            .mount(&server)
            .await;

        let labels = client(&server)
            .ensure_labels(10, &["release", "Release"])
            .await
            .unwrap();

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].id, 7);
    }

    /// Any other create failure aborts before the listing
    #[tokio::test]
    async fn test_create_failure_propagates() {
        let server = MockServer::start().await;

        mount_label_create(&server, "release", 500, json!({"message": "boom"})).await;

        Mock::given(method("GET"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"labels": []})))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .ensure_labels(10, &["release"])
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
    }

    /// No names means no calls
    #[tokio::test]
    async fn test_empty_label_set() {
        let server = MockServer::start().await;
        let names: [&str; 0] = [];

        let labels = client(&server).ensure_labels(10, &names).await.unwrap();

        assert!(labels.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

mod member_tests {
    use super::*;

    fn member(id: i64, email: &str, role: &str) -> serde_json::Value {
        json!({"memberId": id, "email": email, "userName": "someone", "role": role})
    }

    /// An existing member is found by listing and still gets the role
    #[tokio::test]
    async fn test_existing_member_gets_role() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/add"))
            .and(body_json(json!({"user": "ada@example.org"})))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "User 'ada@example.org' is already a participant"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orgs/1/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "members": [
                    member(76, "grace@example.org", "member"),
                    member(77, "ada@example.org", "member")
                ],
                "totalSize": 2
            })))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/77/role"))
            .and(body_json(json!({"role": "owner"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .ensure_organization_member("ada@example.org", OrgRole::Owner)
            .await
            .unwrap();

        assert_eq!(result.member_id, 77);
        assert_eq!(result.role, OrgRole::Owner);
    }

    /// A newly added member still gets an explicit role call
    #[tokio::test]
    async fn test_new_member_gets_role() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/add"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"member": member(80, "new@example.org", "member")})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orgs/1/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"members": []})))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/80/role"))
            .and(body_json(json!({"role": "collaborator"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .ensure_organization_member("new@example.org", OrgRole::Collaborator)
            .await
            .unwrap();

        assert_eq!(result.role, OrgRole::Collaborator);
    }

    /// A conflict without the participant message is a real error
    #[tokio::test]
    async fn test_other_conflict_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/add"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"message": "Invitation pending"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .ensure_organization_member("ada@example.org", OrgRole::Member)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
    }

    /// Conflict with no matching listing entry is an inconsistency
    #[tokio::test]
    async fn test_conflict_without_listing_match() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/add"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "already a participant"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orgs/1/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "members": [member(77, "ADA@example.org", "member")]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .ensure_organization_member("ada@example.org", OrgRole::Member)
            .await
            .unwrap_err();

        assert!(matches!(err, TowerError::Inconsistent(_)));
    }

    /// Role assignment failures abort the reconciliation
    #[tokio::test]
    async fn test_role_failure_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/add"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"member": member(80, "new@example.org", "member")})),
            )
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/members/80/role"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "bad role"})))
            .mount(&server)
            .await;

        let err = client(&server)
            .ensure_organization_member("new@example.org", OrgRole::Owner)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
    }
}

mod participant_tests {
    use super::*;

    fn participant(id: i64, member_id: i64, email: &str) -> serde_json::Value {
        json!({"participantId": id, "memberId": member_id, "email": email, "wspRole": "view"})
    }

    /// Existing participant by member id is resolved from the unfiltered listing
    #[tokio::test]
    async fn test_existing_participant_by_member_id() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/workspaces/10/participants/add"))
            .and(body_json(json!({"memberId": 77})))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orgs/1/workspaces/10/participants"))
            .and(query_param_is_missing("search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "participants": [participant(3, 76, "grace@example.org"), participant(4, 77, "ada@example.org")],
                "totalSize": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/workspaces/10/participants/4/role"))
            .and(body_json(json!({"role": "maintain"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .ensure_workspace_participant(10, &ParticipantRef::MemberId(77), WorkspaceRole::Maintain)
            .await
            .unwrap();

        assert_eq!(result.participant_id, 4);
        assert_eq!(result.role, WorkspaceRole::Maintain);
    }

    /// Existing participant by email goes through the search filter
    #[tokio::test]
    async fn test_existing_participant_by_email() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/workspaces/10/participants/add"))
            .and(body_json(json!({"userNameOrEmail": "ada@example.org"})))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orgs/1/workspaces/10/participants"))
            .and(query_param("search", "ada@example.org"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "participants": [participant(4, 77, "ada@example.org")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/workspaces/10/participants/4/role"))
            .and(body_json(json!({"role": "launch"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .ensure_workspace_participant(
                10,
                &ParticipantRef::Email("ada@example.org".into()),
                WorkspaceRole::Launch,
            )
            .await
            .unwrap();

        assert_eq!(result.email.as_deref(), Some("ada@example.org"));
    }

    /// Listing failures during resolution propagate and skip the role call
    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/workspaces/10/participants/add"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orgs/1/workspaces/10/participants"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/orgs/1/workspaces/10/participants/4/role"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .ensure_workspace_participant(10, &ParticipantRef::MemberId(77), WorkspaceRole::View)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
    }
}
