use crate::{
    ActionKind, ActionState, ClientConfig, VirtError, VmIdentity, VmLifecycleState,
    tests::support::logged_in_client,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

async fn mount_status(server: &MockServer, data: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/virt/domains/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data })))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failed_stop_keeps_displayed_state() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    let web01 = VmIdentity::from("web01");

    // Only the initial load; a failed command must not trigger a resync.
    mount_status(&mock_server, serde_json::json!({ "web01": { "state": 1 } }), 1).await;
    Mock::given(method("POST"))
        .and(path("/virt/domain/web01/stop"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    client.refresh_status().await.unwrap();
    let result = client.action_controller().stop(&web01, false).await;

    match result {
        Err(VirtError::ActionCommand { vm_id, kind, message }) => {
            assert_eq!(vm_id, web01);
            assert_eq!(kind, ActionKind::Stop);
            assert!(message.contains("500"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(
        client.status_board().lifecycle_state(&web01).await,
        VmLifecycleState::Running
    );
    assert_eq!(client.action_controller().state(&web01), ActionState::Idle);
}

#[tokio::test]
async fn test_start_then_resync() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    let db1 = VmIdentity::from("db1");

    mount_status(&mock_server, serde_json::json!({ "db1": { "state": 5 } }), 1).await;
    client.refresh_status().await.unwrap();

    Mock::given(method("POST"))
        .and(path("/virt/domain/db1/start"))
        .and(body_json(serde_json::json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": null })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_status(&mock_server, serde_json::json!({ "db1": { "state": 1 } }), 1).await;

    let outcome = client.action_controller().start(&db1).await.unwrap();
    assert_eq!(outcome.resynced, Some(1));
    assert_eq!(
        client.status_board().lifecycle_state(&db1).await,
        VmLifecycleState::Running
    );

    // Now running: a second start is refused locally.
    let again = client.action_controller().start(&db1).await;
    assert!(matches!(again, Err(VirtError::ActionRejected { .. })));
}

#[tokio::test]
async fn test_command_for_vm_name_with_slash() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    let vm = VmIdentity::from("a/b");

    Mock::given(method("POST"))
        .and(path("/virt/domain/a/b/stop"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/virt/domain/a%2Fb/stop"))
        .and(body_json(serde_json::json!({ "force": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": null })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_status(&mock_server, serde_json::json!({ "a/b": { "state": 5 } }), 1).await;

    let outcome = client.action_controller().stop(&vm, false).await.unwrap();
    assert_eq!(outcome.kind, ActionKind::Stop);
    assert_eq!(
        client.status_board().lifecycle_state(&vm).await,
        VmLifecycleState::Shutoff
    );
}

#[tokio::test]
async fn test_unauthorized_command_expires_session() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    let web01 = VmIdentity::from("web01");
    let signal = client.session().expiry_signal();

    Mock::given(method("POST"))
        .and(path("/virt/domain/web01/reboot"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client.action_controller().reboot(&web01).await;
    assert!(matches!(result, Err(VirtError::AuthExpired)));
    assert!(*signal.borrow());
    assert_eq!(client.action_controller().state(&web01), ActionState::Idle);
}

#[tokio::test]
async fn test_delete_gate_end_to_end() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    let web01 = VmIdentity::from("web01");

    Mock::given(method("POST"))
        .and(path("/virt/domain/web01/delete"))
        .and(body_json(serde_json::json!({ "purge_storage": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": null })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_status(&mock_server, serde_json::json!({}), 1).await;

    let mut gate = client.delete_gate();
    gate.request_delete(web01.clone());

    let mismatch = gate
        .submit(client.action_controller(), "wrong-name", false)
        .await;
    assert!(matches!(mismatch, Err(VirtError::ConfirmationMismatch { .. })));
    assert!(gate.context().is_some());

    let outcome = gate
        .submit(client.action_controller(), "web01", true)
        .await
        .unwrap();
    assert_eq!(outcome.kind, ActionKind::Delete);
    assert!(gate.context().is_none());
    assert!(client.status_board().get(&web01).await.is_none());
}

#[tokio::test]
async fn test_delete_retry_after_server_error() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    let db1 = VmIdentity::from("db1");

    Mock::given(method("POST"))
        .and(path("/virt/domain/db1/delete"))
        .and(body_json(serde_json::json!({ "purge_storage": true })))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage busy"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/virt/domain/db1/delete"))
        .and(body_json(serde_json::json!({ "purge_storage": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": null })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_status(&mock_server, serde_json::json!({}), 1).await;

    let mut gate = client.delete_gate();
    gate.request_delete(db1.clone());

    let failed = gate.submit(client.action_controller(), "db1", true).await;
    assert!(matches!(failed, Err(VirtError::ActionCommand { .. })));
    let context = gate.context().unwrap();
    assert!(context.last_error.as_deref().unwrap().contains("storage busy"));
    assert_eq!(client.action_controller().state(&db1), ActionState::Idle);

    let outcome = gate.retry(client.action_controller()).await.unwrap();
    assert_eq!(outcome.kind, ActionKind::Delete);
    assert!(gate.context().is_none());
}
