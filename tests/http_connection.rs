//! Connection lifecycle against a mock HTTP endpoint: dial handshake, ping,
//! close, and error classification.

mod integration;

use clickhouse_http::{ColumnData, Error, HttpConnection, Options, QueryContext, QueryOptions};
use integration::mock_server::{native_body, string_block, MockServerFixture};

#[tokio::test]
async fn dial_resolves_server_timezone() {
    let fixture = MockServerFixture::new().await;
    let handshake = fixture.mock_handshake(&["Europe/Berlin"]).await;

    let conn = fixture.dial().await.expect("dial");
    assert_eq!(conn.server_timezone(), Some(chrono_tz::Europe::Berlin));
    assert!(!conn.is_bad());
    assert_eq!(conn.connection_id(), 1);
    handshake.assert_async().await;
}

#[tokio::test]
async fn dial_with_no_rows_leaves_timezone_unset() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&[]).await;

    let conn = fixture.dial().await.expect("dial");
    assert_eq!(conn.server_timezone(), None);
}

#[tokio::test]
async fn dial_keeps_the_last_timezone_row() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC", "Asia/Tokyo"]).await;

    let conn = fixture.dial().await.expect("dial");
    assert_eq!(conn.server_timezone(), Some(chrono_tz::Asia::Tokyo));
}

#[tokio::test]
async fn dial_fails_on_unknown_timezone() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["Nowhere/Special"]).await;

    let err = fixture.dial().await.err().expect("dial must fail");
    match err {
        Error::Connect { source } => {
            assert!(matches!(*source, Error::Timezone { ref name, .. } if name == "Nowhere/Special"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn dial_fails_when_handshake_is_rejected() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture
        .mock_query("SELECT timeZone()", 516, b"Authentication failed".to_vec())
        .await;

    let err = fixture.dial().await.err().expect("dial must fail");
    assert!(matches!(err, Error::Connect { .. }));
    assert_eq!(err.status_code(), Some(516));
    assert!(err.to_string().contains("Authentication failed"));
}

#[tokio::test]
async fn dial_bakes_configured_settings_into_every_request() {
    let fixture = MockServerFixture::new().await;
    let handshake = fixture
        .mock_params(
            &[("default_format", "Native"), ("max_threads", "4"), ("readonly", "1")],
            200,
            native_body(&[string_block("timeZone()", &["UTC"])]),
        )
        .await;

    let options = Options::default()
        .with_setting("max_threads", 4)
        .with_setting("readonly", "1")
        .with_setting("default_format", "JSON");
    let conn = fixture.dial_with(&options).await.expect("dial");
    assert_eq!(conn.server_timezone(), Some(chrono_tz::Tz::UTC));
    handshake.assert_async().await;
}

#[tokio::test]
async fn dial_rejects_invalid_options_without_io() {
    let fixture = MockServerFixture::new().await;
    let handshake = fixture.mock_query_expecting("SELECT timeZone()", 0).await;

    let err = fixture
        .dial_with(&Options::default().with_scheme("gopher"))
        .await
        .err()
        .expect("dial must fail");
    assert!(matches!(err, Error::Connect { ref source } if matches!(**source, Error::Configuration { .. })));
    handshake.assert_async().await;
}

#[tokio::test]
async fn ping_succeeds_on_single_column_named_one() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;
    let mut one = clickhouse_http::Block::new();
    one.add_column("1", ColumnData::UInt8(vec![1])).unwrap();
    let ping = fixture
        .mock_query("SELECT 1", 200, native_body(&[one]))
        .await;

    let mut conn = fixture.dial().await.expect("dial");
    conn.ping(&QueryContext::new()).await.expect("ping");
    ping.assert_async().await;
}

#[tokio::test]
async fn ping_fails_on_unexpected_columns() {
    for block in [
        string_block("x", &["1"]),
        {
            let mut two = clickhouse_http::Block::new();
            two.add_column("1", ColumnData::UInt8(vec![1])).unwrap();
            two.add_column("2", ColumnData::UInt8(vec![2])).unwrap();
            two
        },
    ] {
        let fixture = MockServerFixture::new().await;
        let _handshake = fixture.mock_handshake(&["UTC"]).await;
        let _ping = fixture
            .mock_query("SELECT 1", 200, native_body(&[block]))
            .await;

        let mut conn = fixture.dial().await.expect("dial");
        let err = conn.ping(&QueryContext::new()).await.unwrap_err();
        assert!(matches!(err, Error::Ping { .. }), "got {err}");
        assert!(err.to_string().contains("cannot ping"));
    }
}

#[tokio::test]
async fn ping_fails_on_empty_response() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;
    let _ping = fixture.mock_query("SELECT 1", 200, Vec::new()).await;

    let mut conn = fixture.dial().await.expect("dial");
    let err = conn.ping(&QueryContext::new()).await.unwrap_err();
    assert!(matches!(err, Error::Ping { ref columns } if columns.is_empty()));
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;
    let _bad = fixture
        .mock_query("SELECT bad", 500, b"syntax error".to_vec())
        .await;

    let mut conn = fixture.dial().await.expect("dial");
    let err = conn
        .query(&QueryContext::new(), None, "SELECT bad")
        .await
        .err()
        .expect("query must fail");
    match &err {
        Error::Server { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "syntax error");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("syntax error"));
    assert!(!conn.is_bad());
}

#[tokio::test]
async fn per_call_options_cannot_change_the_format() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;
    let query = fixture
        .mock_params(
            &[
                ("default_format", "Native"),
                ("query_id", "q-42"),
                ("quota_key", "team-a"),
                ("max_block_size", "128"),
            ],
            200,
            native_body(&[string_block("s", &["ok"])]),
        )
        .await;

    let mut conn = fixture.dial().await.expect("dial");
    let ctx = QueryContext::new().with_options(
        QueryOptions::new()
            .with_query_id("q-42")
            .with_quota_key("team-a")
            .with_setting("max_block_size", 128u64)
            .with_setting("default_format", "TabSeparated"),
    );
    let mut rows = conn.query(&ctx, None, "SELECT 'ok' AS s").await.expect("query");
    assert!(rows.next().await.unwrap());
    assert_eq!(rows.get_str(0).unwrap(), "ok");
    assert!(!rows.next().await.unwrap());
    drop(rows);
    query.assert_async().await;
}

#[tokio::test]
async fn close_is_idempotent_and_stops_all_io() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;
    let never = fixture.mock_query_expecting("SELECT 1", 0).await;

    let mut conn = fixture.dial().await.expect("dial");
    conn.close().expect("close");
    assert!(conn.is_bad());
    conn.close().expect("second close is a no-op");
    assert!(conn.is_bad());

    let ctx = QueryContext::new();
    let err = conn.ping(&ctx).await.unwrap_err();
    assert!(err.is_bad_connection());
    let err = conn.exec(&ctx, "SELECT 1").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
    never.assert_async().await;
}

#[tokio::test]
async fn cancelled_context_aborts_the_exchange() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;

    let mut conn = fixture.dial().await.expect("dial");
    let ctx = QueryContext::new();
    ctx.cancel();
    let err = conn.exec(&ctx, "SELECT sleep(3)").await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(!conn.is_bad());
}

#[tokio::test]
async fn async_insert_is_always_rejected() {
    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;

    let mut conn = fixture.dial().await.expect("dial");
    for (query, wait) in [("", true), ("", false), ("INSERT INTO t VALUES (1)", true)] {
        let err = conn
            .async_insert(&QueryContext::new(), query, wait)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        assert!(err.to_string().contains("HTTP: not supported"));
    }
}

#[tokio::test]
async fn cancelling_while_an_error_body_streams_returns_promptly() {
    use std::time::{Duration, Instant};

    let fixture = MockServerFixture::new().await;
    let _handshake = fixture.mock_handshake(&["UTC"]).await;
    let _slow = fixture
        .mock_stalled_body("SELECT throwIf(1)", 500, "partial ", "error", Duration::from_secs(3))
        .await;

    let mut conn = fixture.dial().await.expect("dial");
    let ctx = QueryContext::new();
    let token = ctx.cancellation().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let start = Instant::now();
    let err = conn.exec(&ctx, "SELECT throwIf(1)").await.unwrap_err();
    assert!(matches!(err, Error::Cancelled), "got {err}");
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn handshake_does_not_carry_caller_options() {
    let fixture = MockServerFixture::new().await;
    let handshake = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/")
            .match_query(mockito::Matcher::Exact("default_format=Native".into()))
            .match_body("SELECT timeZone()")
            .with_body(native_body(&[string_block("timeZone()", &["UTC"])]))
            .create_async()
            .await
    };

    let ctx = QueryContext::new().with_options(
        QueryOptions::new()
            .with_query_id("first-query")
            .with_setting("max_threads", 2u64),
    );
    let conn = HttpConnection::open(&ctx, &fixture.addr, 1, &Options::default())
        .await
        .expect("dial");
    assert_eq!(conn.server_timezone(), Some(chrono_tz::Tz::UTC));
    handshake.assert_async().await;

    let cancelled = QueryContext::new();
    cancelled.cancel();
    let err = HttpConnection::open(&cancelled, &fixture.addr, 2, &Options::default())
        .await
        .err()
        .expect("dial must fail");
    assert!(matches!(err, Error::Connect { ref source } if matches!(**source, Error::Cancelled)));
}
