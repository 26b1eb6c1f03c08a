use std::time::Duration;

use stalk_client::v5::{Client, JobId, Manager, Publisher, SocketFactory, Subscriber, TubeName};
use stalk_client::ClientError;
use stalk_testkit::{JobStatus, TestServer};

fn client(server: &TestServer) -> Client {
    let addr = server.addr();
    Client::new(SocketFactory::new(addr.ip().to_string(), addr.port()))
}

fn tube(name: &str) -> TubeName {
    TubeName::new(name).unwrap()
}

#[test]
fn constants_match_protocol_defaults() {
    assert_eq!(SocketFactory::DEFAULT_PORT, 11300);
    assert_eq!(<Client as Publisher>::DEFAULT_PRIORITY, 1024);
    assert_eq!(<Client as Publisher>::DEFAULT_TTR, Duration::from_secs(60));
}

#[test]
fn socket_factory_fills_connect_timeout_default() {
    let factory = SocketFactory::new("queue.internal", 11301);
    assert_eq!(factory.host(), "queue.internal");
    assert_eq!(factory.port(), 11301);
    assert_eq!(
        factory,
        SocketFactory::new("queue.internal", 11301)
            .with_connect_timeout(SocketFactory::DEFAULT_CONNECT_TIMEOUT)
    );
}

#[test]
fn put_reserve_delete_lifecycle() {
    let server = TestServer::start();
    let mut client = client(&server);
    let emails = tube("emails");

    client.use_tube(&emails).unwrap();
    let id = client
        .put(
            b"hello",
            <Client as Publisher>::DEFAULT_PRIORITY,
            Duration::ZERO,
            Duration::from_secs(30),
        )
        .unwrap();

    client.watch_only(&emails).unwrap();
    let job = client
        .reserve_with_timeout(Duration::ZERO)
        .unwrap()
        .expect("job ready");
    assert_eq!(job.id, id);
    assert_eq!(job.data, b"hello");
    assert_eq!(server.job_status(id.get()), Some(JobStatus::Reserved));

    client.delete(&job.id).unwrap();
    let err = client.delete(&job.id).unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)), "got: {err:?}");
}

#[test]
fn delete_unknown_job_is_not_found() {
    let server = TestServer::start();
    let mut client = client(&server);

    let err = client.delete(&JobId::new(999)).unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)), "got: {err:?}");
}

#[test]
fn sub_second_reserve_timeout_rounds_up() {
    let server = TestServer::start();
    let mut client = client(&server);

    assert!(client
        .reserve_with_timeout(Duration::from_millis(10))
        .unwrap()
        .is_none());
    assert!(server
        .commands()
        .contains(&"reserve-with-timeout 1".to_string()));
}

#[test]
fn stats_tube_reports_reserved_jobs() {
    let server = TestServer::start();
    let mut client = client(&server);
    let reports = tube("reports");

    client.use_tube(&reports).unwrap();
    client
        .put(b"r", 1, Duration::ZERO, Duration::from_secs(60))
        .unwrap();
    client.watch_only(&reports).unwrap();
    client
        .reserve_with_timeout(Duration::ZERO)
        .unwrap()
        .expect("job ready");

    let stats = client.stats_tube(&reports).unwrap();
    assert_eq!(stats.current_jobs_ready, 0);
    assert_eq!(stats.current_jobs_reserved, 1);
    assert_eq!(stats.current_jobs_urgent, 0);
}
