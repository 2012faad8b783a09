//! End-to-end tests: frames in, pinches out, on a hand-stepped clock.

use async_trait::async_trait;
use nalgebra::Vector3;
use pinch_core::geometry::{midpoint, squared_distance};
use pinch_core::{
    FingerSample, Frame, FrameRouter, Pinch, PinchConfig, PinchStream, UNKNOWN_HAND_ID,
};
use pinch_env::PinchContext;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Clock that only moves when `sleep` is called.
#[derive(Default)]
struct SteppedContext {
    now: Mutex<Duration>,
}

#[async_trait]
impl PinchContext for SteppedContext {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }

    fn spawn<F>(&self, _name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }
}

const FRAME_INTERVAL: Duration = Duration::from_millis(5);

/// Two fingers of `hand_id` straddling `center` on the x axis with the given
/// squared distance between them.
fn pair(
    hand_id: i32,
    ids: (i32, i32),
    center: Vector3<f64>,
    distance_sq: f64,
) -> (FingerSample, FingerSample) {
    let half = Vector3::new(distance_sq.sqrt() / 2.0, 0.0, 0.0);
    (
        FingerSample::new(ids.0, hand_id, center - half),
        FingerSample::new(ids.1, hand_id, center + half),
    )
}

async fn route_all(
    ctx: &SteppedContext,
    router: &mut FrameRouter<SteppedContext>,
    frames: &[Frame],
) {
    for frame in frames {
        router.route_frame(frame).await.unwrap();
        ctx.sleep(FRAME_INTERVAL).await;
    }
}

async fn collect(mut pinches: PinchStream) -> Vec<Pinch> {
    let mut out = Vec::new();
    while let Some(pinch) = pinches.recv().await {
        out.push(pinch);
    }
    out
}

fn new_router() -> (Arc<SteppedContext>, FrameRouter<SteppedContext>, PinchStream) {
    let ctx = Arc::new(SteppedContext::default());
    let (router, pinches) = FrameRouter::new(ctx.clone(), PinchConfig::default()).unwrap();
    (ctx, router, pinches)
}

#[tokio::test]
async fn test_converging_fingers_pinch_once() {
    let (ctx, mut router, pinches) = new_router();
    let center = Vector3::new(40.0, 180.0, -25.0);

    // Squared distance 5000, 4500, ..., 1500 over 8 frames
    let mut frames = Vec::new();
    let mut last_pair = None;
    for step in 0..8 {
        let (a, b) = pair(1, (10, 11), center, 5000.0 - 500.0 * step as f64);
        frames.push(Frame::new(step, step * 5_000, vec![a.clone(), b.clone()]));
        last_pair = Some((a, b));
    }
    let (final_a, final_b) = last_pair.unwrap();
    assert!((squared_distance(&final_a.tip_position, &final_b.tip_position) - 1500.0).abs() < 1e-6);

    // Finger 11 disappears
    frames.push(Frame::new(8, 40_000, vec![final_a.clone()]));

    route_all(&ctx, &mut router, &frames).await;
    router.shutdown().await.unwrap();

    let pinches = collect(pinches).await;
    assert_eq!(pinches.len(), 1);
    assert_eq!(pinches[0].hand_id, 1);
    assert_eq!(pinches[0].position(), midpoint(&final_a.tip_position, &final_b.tip_position));
}

#[tokio::test]
async fn test_no_pinch_without_a_disappearance() {
    let (ctx, mut router, pinches) = new_router();
    let center = Vector3::new(0.0, 200.0, 0.0);

    let frames: Vec<Frame> = (0..10)
        .map(|step| {
            let (a, b) = pair(1, (10, 11), center, 5000.0 - 400.0 * step as f64);
            Frame::new(step, 0, vec![a, b])
        })
        .collect();

    route_all(&ctx, &mut router, &frames).await;
    router.shutdown().await.unwrap();

    assert!(collect(pinches).await.is_empty());
}

#[tokio::test]
async fn test_far_apart_fingers_do_not_pinch() {
    let (ctx, mut router, pinches) = new_router();
    let center = Vector3::new(0.0, 200.0, 0.0);

    // Converging, but still at squared distance 2600 when one vanishes
    let mut frames = Vec::new();
    for step in 0..8 {
        let (a, b) = pair(1, (10, 11), center, 6100.0 - 500.0 * step as f64);
        frames.push(Frame::new(step, 0, vec![a, b]));
    }
    let survivor = frames[7].samples[0].clone();
    frames.push(Frame::new(8, 0, vec![survivor]));

    route_all(&ctx, &mut router, &frames).await;
    router.shutdown().await.unwrap();

    assert!(collect(pinches).await.is_empty());
}

#[tokio::test]
async fn test_crossing_fingers_do_not_pinch() {
    let (ctx, mut router, pinches) = new_router();
    let center = Vector3::new(0.0, 200.0, 0.0);

    // Fingers spread apart the whole time but are still inside the distance
    // gate when one vanishes: every sampled step increases the distance.
    let mut frames = Vec::new();
    for step in 0..15 {
        let (a, b) = pair(1, (10, 11), center, 100.0 + 120.0 * step as f64);
        frames.push(Frame::new(step, 0, vec![a, b]));
    }
    let survivor = frames[14].samples[0].clone();
    frames.push(Frame::new(15, 0, vec![survivor]));

    route_all(&ctx, &mut router, &frames).await;
    router.shutdown().await.unwrap();

    assert!(collect(pinches).await.is_empty());
}

#[tokio::test]
async fn test_whole_hand_vanishing_is_not_a_disappearance() {
    let (ctx, mut router, pinches) = new_router();
    let center = Vector3::new(0.0, 200.0, 0.0);

    let mut frames: Vec<Frame> = (0..8)
        .map(|step| {
            let (a, b) = pair(1, (10, 11), center, 5000.0 - 500.0 * step as f64);
            Frame::new(step, 0, vec![a, b])
        })
        .collect();
    frames.push(Frame::new(8, 0, vec![]));

    route_all(&ctx, &mut router, &frames).await;
    assert_eq!(router.hand_ids(), vec![1]);
    router.shutdown().await.unwrap();

    assert!(collect(pinches).await.is_empty());
}

#[tokio::test]
async fn test_two_hands_pinch_independently() {
    let (ctx, mut router, pinches) = new_router();
    let left = Vector3::new(-100.0, 200.0, 0.0);
    let right = Vector3::new(100.0, 220.0, 10.0);

    let mut frames = Vec::new();
    for step in 0..8 {
        let d = 5000.0 - 500.0 * step as f64;
        let (a, b) = pair(1, (10, 11), left, d);
        let (c, e) = pair(2, (20, 21), right, d);
        frames.push(Frame::new(step, 0, vec![a, b, c, e]));
    }
    let last = frames[7].samples.clone();

    // Hand 1 loses a finger; hand 2 keeps both
    frames.push(Frame::new(8, 0, vec![last[0].clone(), last[2].clone(), last[3].clone()]));
    // Now hand 2 loses one too
    frames.push(Frame::new(9, 0, vec![last[0].clone(), last[2].clone()]));

    route_all(&ctx, &mut router, &frames).await;
    router.shutdown().await.unwrap();

    let mut pinches = collect(pinches).await;
    pinches.sort_by_key(|p| p.hand_id);
    assert_eq!(pinches.len(), 2);
    assert_eq!(pinches[0].hand_id, 1);
    assert_eq!(pinches[1].hand_id, 2);
    assert!((pinches[0].position() - left).norm() < 1e-9);
    assert!((pinches[1].position() - right).norm() < 1e-9);
}

#[tokio::test]
async fn test_unknown_hand_samples_do_not_affect_counts() {
    let (ctx, mut router, pinches) = new_router();
    let center = Vector3::new(0.0, 200.0, 0.0);

    // Unattributed samples come and go; hand 1 keeps both fingers throughout.
    let frames: Vec<Frame> = (0..10)
        .map(|step| {
            let (a, b) = pair(1, (10, 11), center, 5000.0 - 400.0 * step as f64);
            let mut samples = vec![a, b];
            if step % 2 == 0 {
                samples.push(FingerSample::new(99, UNKNOWN_HAND_ID, center));
                samples.push(FingerSample::new(98, UNKNOWN_HAND_ID, center));
            }
            Frame::new(step, 0, samples)
        })
        .collect();

    route_all(&ctx, &mut router, &frames).await;
    assert_eq!(router.hand_ids(), vec![1]);
    router.shutdown().await.unwrap();

    assert!(collect(pinches).await.is_empty());
}

#[tokio::test]
async fn test_run_consumes_frame_stream() {
    let ctx = Arc::new(SteppedContext::default());
    let (router, pinches) = FrameRouter::new(ctx.clone(), PinchConfig::default()).unwrap();
    let (frame_tx, frame_rx) = mpsc::channel(4);

    let routing = tokio::spawn(router.run(frame_rx));
    let collecting = tokio::spawn(collect(pinches));

    let center = Vector3::new(0.0, 150.0, 30.0);
    let mut last = None;
    for step in 0..8 {
        let (a, b) = pair(3, (30, 31), center, 4000.0 - 400.0 * step as f64);
        frame_tx.send(Frame::new(step, 0, vec![a.clone(), b])).await.unwrap();
        last = Some(a);
    }
    frame_tx.send(Frame::new(8, 0, vec![last.unwrap()])).await.unwrap();
    drop(frame_tx);

    routing.await.unwrap().unwrap();
    let pinches = collecting.await.unwrap();
    assert_eq!(pinches.len(), 1);
    assert_eq!(pinches[0].hand_id, 3);
}
