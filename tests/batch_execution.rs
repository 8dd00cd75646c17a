//! End-to-end batch execution against a local mock server.

use mockito::{Matcher, Server};
use multi_http_batch::{BatchController, Error, FailureKind, RequestSpec, TaskId};
use serde_json::json;
use std::net::TcpListener;
use std::time::Duration;

fn controller() -> BatchController {
    BatchController::builder()
        .without_proxy()
        .build()
        .expect("controller")
}

#[test]
fn test_named_get_and_unnamed_json_post() {
    let mut server = Server::new();
    let a = server
        .mock("GET", "/a")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("body of a")
        .create();
    let b = server
        .mock("POST", "/b")
        .match_header("content-type", "application/json; charset=utf-8")
        .match_body(Matcher::Json(json!({"k": "v"})))
        .with_status(201)
        .with_body("created")
        .create();

    let batch = controller();
    batch
        .add_named("t1", RequestSpec::get(format!("{}/a", server.url())))
        .unwrap()
        .add(
            RequestSpec::post(format!("{}/b", server.url()))
                .with_params(json!({"k": "v"}))
                .json(),
        )
        .unwrap();
    assert_eq!(batch.task_ids(), vec![TaskId::from("t1"), TaskId::Auto(0)]);

    batch.execute().unwrap();

    a.assert();
    b.assert();
    assert!(batch.status());
    assert_eq!(batch.response("t1").unwrap().as_ref(), b"body of a");
    assert_eq!(batch.response_text(0u64).unwrap(), "created");

    let info = batch.info("t1").unwrap();
    assert_eq!(info.status, Some(200));
    assert_eq!(info.content_type.as_deref(), Some("text/plain"));
    assert_eq!(info.size_download, 9);
    assert!(info.total_time >= info.starttransfer_time);
    assert!(info.is_success());
    assert_eq!(batch.info(0u64).unwrap().status, Some(201));
}

#[test]
fn test_get_params_merge_into_existing_query() {
    let mut server = Server::new();
    let m = server
        .mock("GET", Matcher::Regex(r"^/a".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("z".into(), "1".into()),
            Matcher::UrlEncoded("y".into(), "2".into()),
        ]))
        .with_body("merged")
        .create();

    let url = format!("{}/a?z=1", server.url());
    let batch = controller();
    batch
        .add_named("q", RequestSpec::get(url.clone()).with_params(json!({"y": 2})))
        .unwrap();
    batch.execute().unwrap();

    m.assert();
    let info = batch.info("q").unwrap();
    assert_eq!(info.url, format!("{}&y=2", url));
    assert_eq!(info.effective_url, format!("{}/a?z=1&y=2", server.url()));
    assert_eq!(batch.handle("q").unwrap().descriptor.url, info.url);
}

#[test]
fn test_get_extra_header_sends_json_content_type() {
    let mut server = Server::new();
    let m = server
        .mock("GET", "/h")
        .match_header("x-trace", "abc")
        .match_header("content-type", "application/json; charset=utf-8")
        .match_header("user-agent", Matcher::Regex("^multi-http-batch/".to_string()))
        .with_body("ok")
        .create();

    let batch = controller();
    batch
        .add_named(
            "h",
            RequestSpec::get(format!("{}/h", server.url())).header("X-Trace: abc"),
        )
        .unwrap();
    batch.execute().unwrap();

    m.assert();
    assert_eq!(batch.info("h").unwrap().status, Some(200));
}

#[test]
fn test_form_post_is_multipart() {
    let mut server = Server::new();
    let m = server
        .mock("POST", "/form")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="k"\r\n\r\nv\r\n"#.to_string()),
            Matcher::Regex(r#"name="n"\r\n\r\n3\r\n"#.to_string()),
        ]))
        .with_body("form ok")
        .create();

    let batch = controller();
    batch
        .add(
            RequestSpec::post(format!("{}/form", server.url()))
                .with_params(json!({"k": "v", "n": 3}))
                .form(),
        )
        .unwrap();
    batch.execute().unwrap();

    m.assert();
    assert_eq!(batch.response_text(0u64).unwrap(), "form ok");
}

#[test]
fn test_failed_task_does_not_abort_siblings() {
    let mut server = Server::new();
    let ok = server.mock("GET", "/ok").with_body("fine").create();

    let batch = controller();
    batch
        .add_named("ok", RequestSpec::get(format!("{}/ok", server.url())))
        .unwrap()
        .add_named(
            "down",
            RequestSpec::get("http://127.0.0.1:1/nothing-listens-here").connect_timeout_ms(2000),
        )
        .unwrap();
    batch.execute().unwrap();

    ok.assert();
    assert!(batch.status());
    assert_eq!(batch.response_text("ok").unwrap(), "fine");

    let down = batch.info("down").unwrap();
    assert!(down.status.is_none());
    assert!(batch.response("down").unwrap().is_empty());
    let failure = down.error.expect("transport failure recorded");
    assert!(matches!(
        failure.kind,
        FailureKind::Connect | FailureKind::Request
    ));
    assert!(batch.handle("down").is_ok());
}

#[test]
fn test_every_task_has_info_response_and_handle() {
    let mut server = Server::new();
    let _m = server
        .mock("GET", Matcher::Any)
        .with_body("x")
        .expect(3)
        .create();

    let batch = controller();
    batch
        .add_named("req1", RequestSpec::get(format!("{}/one", server.url())))
        .unwrap()
        .add(RequestSpec::get(format!("{}/two", server.url())).with_params("task=1"))
        .unwrap()
        .add(RequestSpec::get(format!("{}/three", server.url())))
        .unwrap();

    assert_eq!(batch.exec_time(), 0.0);
    batch.execute().unwrap();
    assert!(batch.status());
    assert!(batch.exec_time() > 0.0);

    let mut serials = Vec::new();
    for id in batch.task_ids() {
        assert!(batch.info(&id).is_ok());
        assert!(batch.response(&id).is_ok());
        serials.push(batch.handle(&id).unwrap().serial);
    }
    serials.sort_unstable();
    serials.dedup();
    assert_eq!(serials.len(), 3);
}

#[test]
fn test_removed_task_is_not_executed() {
    let mut server = Server::new();
    let kept = server.mock("GET", "/kept").with_body("k").create();
    let gone = server.mock("GET", "/gone").expect(0).create();

    let batch = controller();
    batch
        .add_named("kept", RequestSpec::get(format!("{}/kept", server.url())))
        .unwrap()
        .add_named("gone", RequestSpec::get(format!("{}/gone", server.url())))
        .unwrap()
        .remove("gone")
        .remove("req_not_exist");
    batch.execute().unwrap();

    kept.assert();
    gone.assert();
    assert!(matches!(batch.info("gone"), Err(Error::NotFound { .. })));
}

#[test]
fn test_reset_clears_tasks_results_and_status() {
    let mut server = Server::new();
    let _m = server.mock("GET", "/a").with_body("a").create();

    let batch = controller();
    batch
        .add_named("t1", RequestSpec::get(format!("{}/a", server.url())))
        .unwrap();
    batch.execute().unwrap();
    assert!(batch.response("t1").is_ok());

    batch.reset().unwrap();
    assert!(batch.task_list().is_empty());
    assert!(!batch.status());
    assert_eq!(batch.exec_time(), 0.0);
    assert!(matches!(batch.response("t1"), Err(Error::NotFound { .. })));

    // surrogates restart after a reset
    batch
        .add(RequestSpec::get(format!("{}/a", server.url())))
        .unwrap();
    assert_eq!(batch.task_ids(), vec![TaskId::Auto(0)]);
}

#[test]
fn test_controller_is_reusable_across_executions() {
    let mut server = Server::new();
    let m = server.mock("GET", "/a").with_body("a").expect(2).create();

    let batch = controller();
    batch
        .add_named("t1", RequestSpec::get(format!("{}/a", server.url())))
        .unwrap();
    batch.execute().unwrap();
    let first = batch.handle("t1").unwrap().serial;
    batch.execute().unwrap();
    let second = batch.handle("t1").unwrap().serial;

    m.assert();
    assert!(second > first);
    assert_eq!(batch.response_text("t1").unwrap(), "a");
}

#[test]
fn test_response_body_is_cut_at_limit() {
    let mut server = Server::new();
    let _m = server.mock("GET", "/big").with_body("0123456789").create();

    let batch = BatchController::builder()
        .without_proxy()
        .max_response_bytes(4)
        .build()
        .unwrap();
    batch
        .add_named("big", RequestSpec::get(format!("{}/big", server.url())))
        .unwrap();
    batch.execute().unwrap();

    let info = batch.info("big").unwrap();
    assert!(info.truncated);
    assert_eq!(batch.response_text("big").unwrap(), "0123");
}

#[test]
fn test_concurrent_execute_and_reset_are_busy() {
    // accepted by the kernel backlog but never answered
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let batch = controller();
    batch
        .add_named(
            "stalled",
            RequestSpec::get(format!("http://{}/stall", addr)).timeout_ms(1500),
        )
        .unwrap();

    std::thread::scope(|s| {
        let runner = s.spawn(|| batch.execute().map(|_| ()));

        while !batch.is_executing() && !runner.is_finished() {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(batch.execute(), Err(Error::Busy { .. })));
        assert!(matches!(batch.reset(), Err(Error::Busy { .. })));

        runner.join().unwrap().unwrap();
    });

    let info = batch.info("stalled").unwrap();
    assert_eq!(info.error.map(|f| f.kind), Some(FailureKind::Timeout));
    assert!(batch.exec_time() > 0.0);
    drop(listener);
}
