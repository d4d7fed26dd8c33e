use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{Arc, Mutex},
};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use handctl::{
    detector::HandDetector,
    landmark::{HandLandmarks, HandObservation, Handedness, Landmark, LandmarkIdx},
    pipeline::GesturePipeline,
    server,
};
use handctl_image::{Image, Resolution};
use serde_json::{json, Value};
use tower::ServiceExt;

/// What the scripted detector does on its next call.
enum Step {
    Hand(HandObservation),
    Nothing,
    Fail,
    Panic,
}

/// A detector that plays back a fixed script and records every frame it sees.
struct Scripted {
    steps: VecDeque<Step>,
    frames: Arc<Mutex<Vec<Image>>>,
}

impl HandDetector for Scripted {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<HandObservation>> {
        self.frames.lock().unwrap().push(image.clone());
        match self.steps.pop_front().unwrap_or(Step::Nothing) {
            Step::Hand(hand) => Ok(Some(hand)),
            Step::Nothing => Ok(None),
            Step::Fail => anyhow::bail!("inference backend unavailable"),
            Step::Panic => panic!("detector crashed"),
        }
    }
}

struct Harness {
    router: Router,
    frames: Arc<Mutex<Vec<Image>>>,
}

impl Harness {
    fn new(steps: Vec<Step>) -> Self {
        Self::with_body_limit(steps, server::DEFAULT_MAX_BODY_BYTES)
    }

    fn with_body_limit(steps: Vec<Step>, max_body_bytes: usize) -> Self {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let detector = Scripted {
            steps: steps.into(),
            frames: frames.clone(),
        };
        let pipeline = Arc::new(GesturePipeline::new(detector));
        Self {
            router: server::router(pipeline, max_body_bytes),
            frames,
        }
    }

    fn detector_calls(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*",
            "CORS header missing on {} response",
            status
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    async fn post(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/gesture")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap();
        self.send(request).await
    }

    async fn post_image(&self, data_url: &str) -> (StatusCode, Value) {
        self.post(json!({ "image": data_url }).to_string()).await
    }
}

fn png_data_url(image: &Image) -> String {
    let buf = image::RgbImage::from_raw(image.width(), image.height(), image.data().to_vec())
        .unwrap();
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(buf)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn test_frame() -> Image {
    let mut image = Image::filled(Resolution::new(4, 2), [10, 20, 30]);
    image.set(0, 0, [255, 0, 0]);
    image.set(3, 1, [0, 0, 255]);
    image
}

/// A right hand with the fingers in `raised` extended and the thumb folded.
fn right_hand(raised: &[LandmarkIdx], thumb_spread: bool) -> HandObservation {
    use LandmarkIdx::*;

    let mut landmarks = HandLandmarks::splat(Landmark::new(0.5, 0.6, 0.0));
    for tip in [IndexFingerTip, MiddleFingerTip, RingFingerTip, PinkyTip] {
        let y = if raised.contains(&tip) { 0.2 } else { 0.8 };
        landmarks[tip] = Landmark::new(0.5, y, 0.0);
    }
    landmarks[ThumbMcp] = Landmark::new(0.5, 0.6, 0.0);
    landmarks[ThumbTip] = Landmark::new(if thumb_spread { 0.3 } else { 0.6 }, 0.6, 0.0);
    HandObservation::new(landmarks, Handedness::Right, 0.95)
}

#[tokio::test]
async fn empty_object_is_bad_request() {
    let harness = Harness::new(vec![]);
    let (status, body) = harness.post("{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No image received" }));
    assert_eq!(harness.detector_calls(), 0);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let harness = Harness::new(vec![]);
    for body in ["", "not json", "[1, 2]", "\"image\"", r#"{"picture": "data:,"}"#] {
        let (status, response) = harness.post(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {:?}", body);
        assert_eq!(response["error"], "No image received");
    }
}

#[tokio::test]
async fn missing_content_type_is_accepted() {
    let harness = Harness::new(vec![Step::Nothing]);
    let body = json!({ "image": png_data_url(&test_frame()) }).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/gesture")
        .body(Body::from(body))
        .unwrap();
    let (status, response) = harness.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "command": "stop" }));
}

#[tokio::test]
async fn invalid_base64_is_server_error() {
    let harness = Harness::new(vec![]);
    let (status, body) = harness.post_image("not,base64$$$").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(!message.is_empty());
    assert_eq!(harness.detector_calls(), 0);
}

#[tokio::test]
async fn undecodable_image_is_server_error() {
    let harness = Harness::new(vec![]);
    let garbage = format!("data:image/png;base64,{}", STANDARD.encode(b"not an image"));
    let (status, body) = harness.post_image(&garbage).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().is_empty());

    let (status, _) = harness.post_image("no separator at all").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn non_string_image_is_server_error() {
    let harness = Harness::new(vec![]);
    let (status, body) = harness.post(r#"{"image": 42}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn no_hand_is_stop() {
    let harness = Harness::new(vec![Step::Nothing]);
    let (status, body) = harness.post_image(&png_data_url(&test_frame())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "command": "stop" }));
    assert_eq!(harness.detector_calls(), 1);
}

#[tokio::test]
async fn open_hand_is_stop() {
    use LandmarkIdx::*;

    let open = right_hand(
        &[IndexFingerTip, MiddleFingerTip, RingFingerTip, PinkyTip],
        true,
    );
    let harness = Harness::new(vec![Step::Hand(open)]);
    let (status, body) = harness.post_image(&png_data_url(&test_frame())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "command": "stop" }));
}

#[tokio::test]
async fn index_finger_is_forward() {
    let pointing = right_hand(&[LandmarkIdx::IndexFingerTip], false);
    let harness = Harness::new(vec![Step::Hand(pointing)]);
    let (status, body) = harness.post_image(&png_data_url(&test_frame())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "command": "forward" }));
}

#[tokio::test]
async fn finger_counts_select_commands() {
    use LandmarkIdx::*;

    let harness = Harness::new(vec![
        Step::Hand(right_hand(&[IndexFingerTip, MiddleFingerTip], false)),
        Step::Hand(right_hand(&[IndexFingerTip, MiddleFingerTip], true)),
        Step::Hand(right_hand(
            &[IndexFingerTip, MiddleFingerTip, RingFingerTip, PinkyTip],
            false,
        )),
        Step::Hand(right_hand(&[], false)),
    ]);
    let url = png_data_url(&test_frame());
    for expected in ["left", "right", "backward", "stop"] {
        let (status, body) = harness.post_image(&url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["command"], expected);
    }
}

#[tokio::test]
async fn detector_failure_is_server_error() {
    let harness = Harness::new(vec![Step::Fail]);
    let (status, body) = harness.post_image(&png_data_url(&test_frame())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("inference backend unavailable"));
}

#[tokio::test]
async fn detector_panic_is_server_error() {
    let harness = Harness::new(vec![Step::Panic, Step::Nothing]);
    let url = png_data_url(&test_frame());

    let (status, body) = harness.post_image(&url).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    // The detector stays usable afterwards.
    let (status, body) = harness.post_image(&url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "command": "stop" }));
}

#[tokio::test]
async fn detector_sees_mirrored_frame() {
    let harness = Harness::new(vec![Step::Nothing]);
    let frame = test_frame();
    harness.post_image(&png_data_url(&frame)).await;

    let frames = harness.frames.lock().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0], frame.flip_horizontal());
    assert_eq!(frames[0].get(3, 0), Some([255, 0, 0]));
}

#[tokio::test]
async fn preflight() {
    let harness = Harness::new(vec![]);
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/gesture")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "message": "CORS preflight" }));
    assert_eq!(harness.detector_calls(), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let harness = Harness::with_body_limit(vec![], 1024);
    let body = json!({ "image": format!("data:,{}", "A".repeat(4096)) }).to_string();
    let (status, _) = harness.post(body).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(harness.detector_calls(), 0);
}
