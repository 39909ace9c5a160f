use std::{
    io::{BufRead, BufReader, Read, Write},
    net::TcpListener,
    thread,
};

use base64::Engine as _;
use handpose_client::{
    Config, DetectError, DetectionResult, Detector, HttpDetector, NetworkError, Upload,
};

struct Captured {
    request_line: String,
    body: Vec<u8>,
}

/// Serves exactly one request with a canned reply and hands back what it saw.
fn serve_once(status: &'static str, body: String) -> (String, thread::JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut content_length = None;
        let mut chunked = false;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let lower = line.to_ascii_lowercase();
            if let Some(value) = lower.strip_prefix("content-length:") {
                content_length = value.trim().parse::<usize>().ok();
            }
            if lower.starts_with("transfer-encoding:") && lower.contains("chunked") {
                chunked = true;
            }
        }

        let mut request_body = Vec::new();
        if let Some(len) = content_length {
            request_body.resize(len, 0);
            reader.read_exact(&mut request_body).unwrap();
        } else if chunked {
            while !request_body.ends_with(b"0\r\n\r\n") {
                let mut byte = [0u8; 1];
                if reader.read(&mut byte).unwrap() == 0 {
                    break;
                }
                request_body.push(byte[0]);
            }
        }

        let mut stream = stream;
        let reply = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(reply.as_bytes()).unwrap();
        stream.flush().unwrap();

        Captured {
            request_line: request_line.trim_end().to_string(),
            body: request_body,
        }
    });

    (base, handle)
}

fn upload() -> Upload {
    Upload {
        file_name: "hand.png".to_string(),
        mime: "image/png".to_string(),
        bytes: b"not really a png".to_vec(),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn server_error_status_is_reported_verbatim() {
    let (base, server) = serve_once(
        "500 Internal Server Error",
        r#"{"detail":"boom"}"#.to_string(),
    );
    let detector = HttpDetector::new(&Config::default().with_api_base(base)).unwrap();

    let err = detector.detect(&upload()).unwrap_err();
    assert_eq!(err, DetectError::Network(NetworkError::Status(500)));
    assert_eq!(err.to_string(), "HTTP error! status: 500");

    server.join().unwrap();
}

#[test]
fn detect_posts_multipart_file_and_parses_reply() {
    let annotated = base64::engine::general_purpose::STANDARD.encode([0xFFu8, 0xD8, 0xFF]);
    let reply = format!(
        r#"{{"success":true,"image":"{annotated}","detections":[{{"confidence":0.97,"keypoints":[[1,2],[3,4]],"box":[10,20,110,220]}}]}}"#
    );
    let (base, server) = serve_once("200 OK", reply);
    let detector = HttpDetector::new(&Config::default().with_api_base(base)).unwrap();

    let result = detector.detect(&upload()).unwrap();
    let captured = server.join().unwrap();

    assert!(captured.request_line.starts_with("POST /api/detect "));
    assert!(contains(&captured.body, b"name=\"file\""));
    assert!(contains(&captured.body, b"filename=\"hand.png\""));
    assert!(contains(&captured.body, b"not really a png"));

    match result {
        DetectionResult::Success { image, detections } => {
            assert_eq!(image, vec![0xFF, 0xD8, 0xFF]);
            assert_eq!(detections.len(), 1);
            assert_eq!(detections[0].keypoints.len(), 2);
            assert_eq!(detections[0].bbox, Some([10.0, 20.0, 110.0, 220.0]));
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn in_band_failure_is_not_a_transport_error() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"success":false,"error":"Invalid image file"}"#.to_string(),
    );
    let detector = HttpDetector::new(&Config::default().with_api_base(base)).unwrap();

    let result = detector.detect(&upload()).unwrap();
    assert_eq!(
        result,
        DetectionResult::Failure {
            error: "Invalid image file".to_string()
        }
    );
    server.join().unwrap();
}

#[test]
fn model_info_is_read_from_api_prefix() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"model_name":"YOLOv8 Hand Pose Detection","confidence_threshold":0.6,"device":"cpu"}"#
            .to_string(),
    );
    let detector = HttpDetector::new(&Config::default().with_api_base(base)).unwrap();

    let info = detector.model_info().unwrap().unwrap();
    let captured = server.join().unwrap();

    assert!(captured.request_line.starts_with("GET /api/model-info "));
    assert_eq!(info.summary(), "YOLOv8 Hand Pose Detection (cpu, conf 0.60)");
}

#[test]
fn unreachable_service_is_a_transport_error() {
    // Bind then drop so the port is very likely closed.
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let detector =
        HttpDetector::new(&Config::default().with_api_base(format!("http://{addr}/api"))).unwrap();

    let err = detector.detect(&upload()).unwrap_err();
    assert!(matches!(err, DetectError::Network(NetworkError::Transport(_))));
}
