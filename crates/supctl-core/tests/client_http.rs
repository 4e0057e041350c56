//! End-to-end tests over real HTTP against an in-process stub daemon.

use std::collections::BTreeMap;
use std::time::Duration;

use pretty_assertions::assert_eq;
use supctl_core::{
    ErrorKind, FaultCode, ProcessInfo, ProcessState, SupervisorClient, Value, methods,
};
use supctl_test_utils::{Reply, StubDaemon, TestConfigBuilder, init_test_tracing};

fn worker1() -> Value {
    let fields: [(&str, Value); 12] = [
        ("name", "worker1".into()),
        ("group", "myapp".into()),
        ("start", 1_700_000_000_i64.into()),
        ("stop", 0.into()),
        ("now", 1_700_000_500_i64.into()),
        ("state", 20.into()),
        ("statename", "RUNNING".into()),
        ("spawnerr", "".into()),
        ("exitstatus", 0.into()),
        ("stdout_logfile", "/var/log/worker1-out.log".into()),
        ("stderr_logfile", "/var/log/worker1-err.log".into()),
        ("pid", 4821.into()),
    ];
    Value::Struct(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[tokio::test]
async fn start_process_round_trip_over_tcp() {
    init_test_tracing();
    let daemon = StubDaemon::builder()
        .expect(
            methods::START_PROCESS,
            vec![Value::from("myapp:worker1"), Value::from(true)],
            Reply::Value(Value::from(true)),
        )
        .serve_tcp()
        .await;

    let client = SupervisorClient::new(daemon.url()).unwrap();
    assert!(client.start_process("myapp:worker1", true).await.unwrap());
    assert_eq!(daemon.calls().len(), 1);
}

#[tokio::test]
async fn get_all_process_info_decodes_record_without_logfile() {
    init_test_tracing();
    let daemon = StubDaemon::builder()
        .expect(
            methods::GET_ALL_PROCESS_INFO,
            vec![],
            Reply::Value(Value::Array(vec![worker1()])),
        )
        .serve_tcp()
        .await;

    let client = SupervisorClient::new(daemon.url()).unwrap();
    let infos = client.get_all_process_info().await.unwrap();

    assert_eq!(
        infos,
        vec![ProcessInfo {
            name: "worker1".to_string(),
            group: "myapp".to_string(),
            description: None,
            start: 1_700_000_000,
            stop: 0,
            now: 1_700_000_500,
            state: 20,
            statename: "RUNNING".to_string(),
            spawnerr: String::new(),
            exitstatus: 0,
            logfile: None,
            stdout_logfile: "/var/log/worker1-out.log".to_string(),
            stderr_logfile: "/var/log/worker1-err.log".to_string(),
            pid: 4821,
        }]
    );
    assert_eq!(infos[0].process_state(), Some(ProcessState::Running));
}

#[tokio::test]
async fn daemon_fault_over_http_is_remote_call() {
    let daemon = StubDaemon::builder()
        .respond(
            methods::STOP_PROCESS,
            Reply::fault(70, "NOT_RUNNING: worker1"),
        )
        .serve_tcp()
        .await;

    let client = SupervisorClient::new(daemon.url()).unwrap();
    let err = client.stop_process("worker1", true).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteCall);
    assert!(err.is_fault(FaultCode::NotRunning));
}

#[tokio::test]
async fn unexpected_arguments_are_rejected_by_daemon() {
    let daemon = StubDaemon::builder()
        .expect(
            methods::START_PROCESS,
            vec![Value::from("web"), Value::from(true)],
            Reply::Value(Value::from(true)),
        )
        .serve_tcp()
        .await;

    let client = SupervisorClient::new(daemon.url()).unwrap();
    let err = client.start_process("web", false).await.unwrap_err();

    assert!(err.is_fault(FaultCode::IncorrectParameters));
}

#[tokio::test]
async fn unknown_method_fault() {
    let daemon = StubDaemon::builder().serve_tcp().await;

    let client = SupervisorClient::new(daemon.url()).unwrap();
    let err = client.reload_config().await.unwrap_err();

    assert!(err.is_fault(FaultCode::UnknownMethod));
}

#[tokio::test]
async fn html_error_page_is_decode_error() {
    let daemon = StubDaemon::builder()
        .respond(
            methods::GET_API_VERSION,
            Reply::Raw("<html><body>proxy error</body></html>".to_string()),
        )
        .serve_tcp()
        .await;

    let client = SupervisorClient::new(daemon.url()).unwrap();
    let err = client.get_api_version().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn unresponsive_daemon_hits_deadline() {
    let daemon = StubDaemon::builder()
        .respond(methods::SHUTDOWN, Reply::Hang)
        .serve_tcp()
        .await;

    let client = SupervisorClient::new(daemon.url())
        .unwrap()
        .with_timeout(Duration::from_millis(200));
    let err = client.shutdown().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn client_from_config_reaches_daemon() {
    let daemon = StubDaemon::builder()
        .respond(methods::GET_API_VERSION, Reply::Value(Value::from("3.0")))
        .serve_tcp()
        .await;
    let config = TestConfigBuilder::new()
        .server_url(daemon.url())
        .timeout_secs(5)
        .build();

    let client = SupervisorClient::from_config(&config).unwrap();

    assert_eq!(client.get_api_version().await.unwrap(), "3.0");
}

#[tokio::test]
async fn stopped_daemon_is_connection_error() {
    let daemon = StubDaemon::builder().serve_tcp().await;
    let url = daemon.url().to_string();
    drop(daemon);
    // Give the aborted accept loop a moment to close the listener.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = SupervisorClient::new(&url).unwrap();
    let err = client.get_api_version().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[cfg(unix)]
#[tokio::test]
async fn start_process_round_trip_over_unix_socket() {
    init_test_tracing();
    let daemon = StubDaemon::builder()
        .expect(
            methods::START_PROCESS,
            vec![Value::from("myapp:worker1"), Value::from(true)],
            Reply::Value(Value::from(true)),
        )
        .serve_unix()
        .await;

    let client = SupervisorClient::new(daemon.url()).unwrap();
    assert!(client.start_process("myapp:worker1", true).await.unwrap());
}
