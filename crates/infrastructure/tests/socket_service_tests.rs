//! Socket transport tests against an in-process fake daemon.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use domain::service::{PrinterService, ServiceBinder, ServiceIdentity};
use domain::{Bitmap, PrintError, TextFormat};
use infrastructure::service::SocketServiceBinder;

fn socket_path(tag: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "aurora-print-test-{}-{}-{}.sock",
        tag,
        std::process::id(),
        n
    ))
}

fn identity_for(path: &PathBuf) -> ServiceIdentity {
    ServiceIdentity::new("com.aurora.printservice", path.to_string_lossy().into_owned())
}

/// Accept one connection and answer `count` frames with the given
/// reply function, returning the raw frames the client sent.
fn spawn_daemon(
    listener: UnixListener,
    count: usize,
    reply: fn(u64, &Value) -> Value,
) -> tokio::task::JoinHandle<Vec<Value>> {
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        let mut frames = Vec::new();
        for _ in 0..count {
            let line = lines.next_line().await.unwrap().unwrap();
            let frame: Value = serde_json::from_str(&line).unwrap();
            let id = frame["id"].as_u64().unwrap();
            let mut out = reply(id, &frame).to_string();
            out.push('\n');
            write_half.write_all(out.as_bytes()).await.unwrap();
            frames.push(frame);
        }
        frames
    })
}

#[tokio::test]
async fn test_calls_travel_as_newline_delimited_json() {
    let path = socket_path("roundtrip");
    let listener = UnixListener::bind(&path).unwrap();
    let daemon = spawn_daemon(listener, 3, |id, frame| match frame["op"].as_str() {
        Some("getPrinterVersion") => json!({"id": id, "code": 0, "value": "2.3.1"}),
        Some("paperOut") => json!({"id": id, "code": 0, "value": 1}),
        _ => json!({"id": id, "code": 0}),
    });

    let service = SocketServiceBinder::new()
        .bind(&identity_for(&path))
        .await
        .unwrap();

    assert_eq!(
        service.printer_version().await.unwrap(),
        Some("2.3.1".to_string())
    );
    assert_eq!(service.check_paper().await.unwrap(), Some(1));
    let format = TextFormat::default().to_wire_map().unwrap();
    service.print_text("Thank you!", &format).await.unwrap();

    let frames = daemon.await.unwrap();
    assert_eq!(frames[0]["op"], "getPrinterVersion");
    // Paper presence goes out as a zero-pixel feed
    assert_eq!(frames[1]["op"], "paperOut");
    assert_eq!(frames[1]["pixels"], 0);
    assert_eq!(frames[2]["op"], "printText");
    assert_eq!(frames[2]["text"], "Thank you!");
    assert_eq!(frames[2]["textSize"], 24);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_nonzero_code_maps_to_remote_failure() {
    let path = socket_path("remote-failure");
    let listener = UnixListener::bind(&path).unwrap();
    let daemon = spawn_daemon(listener, 1, |id, _| {
        json!({"id": id, "code": -3, "message": "head overheated"})
    });

    let service = SocketServiceBinder::new()
        .bind(&identity_for(&path))
        .await
        .unwrap();

    let err = service.feed_paper(16).await.unwrap_err();
    assert_eq!(err, PrintError::remote(-3, "head overheated"));

    let frames = daemon.await.unwrap();
    assert_eq!(frames[0]["op"], "paperOut");
    assert_eq!(frames[0]["pixels"], 16);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_bitmap_pixels_travel_as_base64() {
    let path = socket_path("bitmap");
    let listener = UnixListener::bind(&path).unwrap();
    let daemon = spawn_daemon(listener, 1, |id, _| json!({"id": id, "code": 0}));

    let service = SocketServiceBinder::new()
        .bind(&identity_for(&path))
        .await
        .unwrap();

    let bitmap = Bitmap::new(2, 2, vec![1, 2, 3, 4]).unwrap();
    service.print_bitmap(&bitmap).await.unwrap();

    let frames = daemon.await.unwrap();
    let frame = &frames[0];
    assert_eq!(frame["op"], "printBitmap");
    assert_eq!(frame["width"], 2);
    assert_eq!(frame["height"], 2);
    assert_eq!(frame["centered"], true);
    assert_eq!(frame["cut"], false);
    let pixels = BASE64.decode(frame["pixels"].as_str().unwrap()).unwrap();
    assert_eq!(pixels, vec![1, 2, 3, 4]);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_barcode_and_qr_carry_vendor_flags() {
    let path = socket_path("flags");
    let listener = UnixListener::bind(&path).unwrap();
    let daemon = spawn_daemon(listener, 2, |id, _| json!({"id": id, "code": 0}));

    let service = SocketServiceBinder::new()
        .bind(&identity_for(&path))
        .await
        .unwrap();

    service.print_barcode("4006381333931", 300, 160).await.unwrap();
    service
        .print_qr_code("https://aurora.example/receipt/42", 300, 300)
        .await
        .unwrap();

    let frames = daemon.await.unwrap();
    assert_eq!(frames[0]["op"], "printBarcode");
    assert_eq!(frames[0]["showText"], true);
    assert_eq!(frames[0]["cut"], false);
    assert_eq!(frames[1]["op"], "printQrCode");
    assert_eq!(frames[1]["cut"], false);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_closed_resolves_when_peer_disconnects() {
    let path = socket_path("closed");
    let listener = UnixListener::bind(&path).unwrap();
    let daemon = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let service = SocketServiceBinder::new()
        .bind(&identity_for(&path))
        .await
        .unwrap();
    daemon.await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), service.closed())
        .await
        .expect("closed notification should resolve");

    let err = service.printer_status().await.unwrap_err();
    assert!(matches!(err, PrintError::ConnectionFailed(_)));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_bind_fails_when_socket_is_missing() {
    let path = socket_path("missing");
    let err = SocketServiceBinder::new()
        .bind(&identity_for(&path))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PrintError::ConnectionFailed(_)));
}
