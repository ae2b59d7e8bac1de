//! Integration tests for the viewer session, layout engine and dispatcher.
//!
//! Everything here runs against in-memory documents and text services, so
//! neither pdfium nor network access is needed.

use async_trait::async_trait;
use edgequake_pdfview::{
    Action, CancelStage, Completion, DispatcherState, DocumentSource, FitMode, PageGeometry,
    PageSpan, ServiceError, TaskError, TaskEvent, TaskOutcome, TaskReport, TextService,
    ViewerConfig, ViewerError, ViewerSession, ViewportSize,
};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::Notify;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// A document with per-page sizes. Rasterises to solid white at the
/// requested zoom; pages listed in `broken` fail to rasterise.
struct FakeDoc {
    sizes: Vec<(f32, f32)>,
    broken: Vec<usize>,
    text: Vec<String>,
}

impl FakeDoc {
    fn uniform(pages: usize, width: f32, height: f32) -> Self {
        Self {
            sizes: vec![(width, height); pages],
            broken: vec![],
            text: (0..pages).map(|i| format!("Body of page {}.", i + 1)).collect(),
        }
    }
}

impl DocumentSource for FakeDoc {
    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn page_geometry(&self, index: usize) -> Result<PageGeometry, ViewerError> {
        let (w, h) = self.sizes.get(index).ok_or(ViewerError::PageOutOfRange {
            page: index + 1,
            total: self.sizes.len(),
        })?;
        Ok(PageGeometry::new(*w, *h))
    }

    fn rasterize(&self, index: usize, zoom: f32) -> Result<RgbImage, ViewerError> {
        if self.broken.contains(&index) {
            return Err(ViewerError::RasterisationFailed {
                page: index + 1,
                detail: "damaged content stream".into(),
            });
        }
        let (w, h) = self.sizes[index];
        Ok(RgbImage::from_pixel(
            (w * zoom) as u32,
            (h * zoom) as u32,
            Rgb([255, 255, 255]),
        ))
    }

    fn extract_text(&self, index: usize) -> String {
        self.text.get(index).cloned().unwrap_or_default()
    }
}

/// Records prompts and answers with a fixed reply.
struct Scripted {
    reply: Result<Completion, ServiceError>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(reply: Result<Completion, ServiceError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextService for Scripted {
    async fn complete(&self, prompt: &str) -> Result<Completion, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

/// Waits for `release` before answering; counts calls.
struct Held {
    release: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl TextService for Held {
    async fn complete(&self, _prompt: &str) -> Result<Completion, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(Completion::Text("late answer".into()))
    }
}

fn session_with(doc: FakeDoc) -> ViewerSession<FakeDoc> {
    let mut s = ViewerSession::new(ViewerConfig::default(), Handle::current());
    s.open(doc);
    s
}

async fn wait_finished(s: &mut ViewerSession<FakeDoc>) -> TaskReport {
    loop {
        match s.next_event().await {
            Some(TaskEvent::Finished(report)) => return report,
            Some(TaskEvent::Progress { .. }) => {}
            None => panic!("session went idle without a result"),
        }
    }
}

// ── Layout ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_page_walkthrough_of_five_pages() {
    let mut s = session_with(FakeDoc::uniform(5, 600.0, 800.0));
    s.set_two_page(true);
    let vp = ViewportSize::new(1215, 815);

    let plan = s.plan(vp).unwrap();
    assert_eq!(plan.pages, PageSpan::Single(0));
    assert!(!plan.is_paired());
    assert_eq!(plan.spacing_px, 0);
    assert!((plan.zoom - 1.0).abs() < 1e-6, "fit height 800/800");

    s.next_page();
    let plan = s.plan(vp).unwrap();
    assert_eq!(plan.pages, PageSpan::Pair(1, 2));

    s.next_page();
    assert_eq!(s.plan(vp).unwrap().pages, PageSpan::Pair(3, 4));

    s.next_page();
    assert_eq!(s.plan(vp).unwrap().pages, PageSpan::Single(4));
}

#[tokio::test]
async fn fit_width_pair_includes_spacing() {
    let mut s = session_with(FakeDoc::uniform(3, 600.0, 800.0));
    s.set_two_page(true);
    s.next_page();
    s.set_fit_width();

    // available = 1225 - 15 = 1210 = 2 * 600 + 10 → zoom 1.
    let plan = s.plan(ViewportSize::new(1225, 400)).unwrap();
    assert!((plan.zoom - 1.0).abs() < 1e-6);
    assert_eq!(plan.spacing_px, 10);

    // Half the width halves the zoom and the gap.
    let plan = s.plan(ViewportSize::new(620, 400)).unwrap();
    assert!((plan.zoom - 0.5).abs() < 1e-6);
    assert_eq!(plan.spacing_px, 5);
}

#[tokio::test]
async fn zoom_stays_in_range_under_any_operation_sequence() {
    let config = ViewerConfig::default();
    let mut s = session_with(FakeDoc::uniform(4, 595.0, 842.0));
    let viewports = [
        ViewportSize::new(1, 1),
        ViewportSize::new(16, 16),
        ViewportSize::new(800, 600),
        ViewportSize::new(100_000, 100_000),
    ];
    for step in 0..200usize {
        match step % 7 {
            0 => s.zoom_in(),
            1 => s.zoom_in(),
            2 => s.zoom_out(),
            3 => s.set_fit_width(),
            4 => s.set_fit_height(),
            5 => {
                s.toggle_two_page();
            }
            _ => {
                s.next_page();
            }
        }
        for vp in viewports {
            let z = s.plan(vp).unwrap().zoom;
            assert!(
                (config.min_zoom..=config.max_zoom).contains(&z),
                "step {step}: zoom {z} at {vp}"
            );
        }
        assert!(s.state().zoom_factor >= config.min_zoom);
        assert!(s.state().zoom_factor <= config.max_zoom);
    }
}

#[tokio::test]
async fn mismatched_pair_is_centred_vertically() {
    let doc = FakeDoc {
        sizes: vec![(100.0, 100.0), (100.0, 50.0), (100.0, 100.0)],
        broken: vec![],
        text: vec![],
    };
    let mut s = session_with(doc);
    s.set_two_page(true);
    s.next_page();
    s.set_zoom(1.0);

    let view = s.render(ViewportSize::new(500, 500)).unwrap();
    assert_eq!(view.image.dimensions(), (210, 100));
    let bg = Rgb(ViewerConfig::default().background);
    assert_eq!(view.image.get_pixel(50, 10), &bg);
    assert_eq!(view.image.get_pixel(50, 30), &Rgb([255, 255, 255]));
    assert_eq!(view.image.get_pixel(50, 80), &bg);
    assert_eq!(view.image.get_pixel(105, 50), &bg);
}

#[tokio::test]
async fn broken_page_renders_as_placeholder() {
    let mut doc = FakeDoc::uniform(3, 200.0, 300.0);
    doc.broken = vec![2];
    let mut s = session_with(doc);
    s.set_two_page(true);
    s.next_page();
    s.set_zoom(1.0);

    let view = s.render(ViewportSize::new(800, 800)).unwrap();
    assert_eq!(view.label, "2-3 / 3");
    // 200 px page + 10 px gap + 10 px placeholder.
    assert_eq!(view.image.dimensions(), (220, 300));
    assert_eq!(view.image.get_pixel(215, 150), &Rgb([255, 0, 0]));
}

#[tokio::test]
async fn render_after_close_is_an_error() {
    let mut s = session_with(FakeDoc::uniform(2, 100.0, 100.0));
    s.set_fit_mode(FitMode::FitHeight);
    s.close();
    assert!(matches!(
        s.render(ViewportSize::new(100, 100)),
        Err(ViewerError::NoDocument)
    ));
}

// ── Text actions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn translate_pair_end_to_end() {
    let service = Scripted::new(Ok(Completion::Text("翻訳されたテキスト".into())));
    let mut s = session_with(FakeDoc::uniform(5, 600.0, 800.0));
    s.set_service(Some(service.clone()));
    s.set_two_page(true);
    s.next_page();

    s.request(&Action::Translate).unwrap();
    let report = wait_finished(&mut s).await;
    assert_eq!(report.result_label, "Translation result");
    assert_eq!(report.outcome, TaskOutcome::Success("翻訳されたテキスト".into()));
    assert_eq!(s.task_state(), DispatcherState::Idle);

    let prompts = service.prompts.lock().unwrap();
    assert!(prompts[0].contains("[Page 2]\nBody of page 2."));
    assert!(prompts[0].contains("[Page 3]\nBody of page 3."));
    assert!(prompts[0].contains("Japanese"));
}

#[tokio::test]
async fn busy_rejection_leaves_running_task_alone() {
    let service = Arc::new(Held {
        release: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let mut s = session_with(FakeDoc::uniform(2, 100.0, 100.0));
    s.set_service(Some(service.clone()));

    s.request(&Action::Summarize).unwrap();
    // Let the worker reach the remote call.
    assert!(matches!(
        s.next_event().await,
        Some(TaskEvent::Progress { percent: 50, .. })
    ));

    for action in [Action::Translate, Action::Example, Action::Summarize] {
        match s.request(&action) {
            Err(ViewerError::Busy { action }) => assert_eq!(action, "Summary"),
            other => panic!("expected Busy, got {other:?}"),
        }
    }
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);

    service.release.notify_one();
    let report = wait_finished(&mut s).await;
    assert_eq!(report.outcome, TaskOutcome::Success("late answer".into()));

    // Idle again: a new request is accepted.
    s.request(&Action::Translate).unwrap();
    service.release.notify_one();
    assert_eq!(wait_finished(&mut s).await.action_name, "Translation");
    assert_eq!(service.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancel_while_waiting_discards_reply() {
    let service = Arc::new(Held {
        release: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let mut s = session_with(FakeDoc::uniform(2, 100.0, 100.0));
    s.set_service(Some(service.clone()));

    s.request(&Action::ExplainTerms).unwrap();
    assert!(matches!(s.next_event().await, Some(TaskEvent::Progress { .. })));
    assert!(s.cancel());
    service.release.notify_one();

    let report = wait_finished(&mut s).await;
    assert_eq!(report.outcome, TaskOutcome::Cancelled(CancelStage::AfterCall));
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_before_start_skips_the_call() {
    let service = Arc::new(Held {
        release: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let mut s = session_with(FakeDoc::uniform(2, 100.0, 100.0));
    s.set_service(Some(service.clone()));

    s.request(&Action::Example).unwrap();
    assert!(s.cancel());
    let report = wait_finished(&mut s).await;
    assert_eq!(report.outcome, TaskOutcome::Cancelled(CancelStage::BeforeCall));
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_reply_is_reported_as_invalid_response() {
    let service = Scripted::new(Ok(Completion::Rejected(None)));
    let mut s = session_with(FakeDoc::uniform(1, 100.0, 100.0));
    s.set_service(Some(service));

    s.request(&Action::Summarize).unwrap();
    match wait_finished(&mut s).await.outcome {
        TaskOutcome::Failed(e) => {
            assert!(matches!(e, TaskError::InvalidResponse { .. }));
            assert!(e.to_string().contains("invalid response"));
            assert!(e.to_string().contains("unknown response format"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn api_error_is_reported_with_message() {
    let service = Scripted::new(Err(ServiceError("403 API key not valid".into())));
    let mut s = session_with(FakeDoc::uniform(1, 100.0, 100.0));
    s.set_service(Some(service));

    s.request(&Action::Translate).unwrap();
    match wait_finished(&mut s).await.outcome {
        TaskOutcome::Failed(TaskError::Api { detail }) => assert!(detail.contains("403")),
        other => panic!("unexpected {other:?}"),
    }
    // A failure leaves the session usable.
    assert_eq!(s.task_state(), DispatcherState::Idle);
    assert_eq!(s.page_label(), "1 / 1");
}

#[tokio::test]
async fn request_checks_run_in_order() {
    // No document beats everything else.
    let mut empty: ViewerSession<FakeDoc> =
        ViewerSession::new(ViewerConfig::default(), Handle::current());
    assert!(matches!(
        empty.request(&Action::Translate),
        Err(ViewerError::NoDocument)
    ));

    // No service beats missing text.
    let mut doc = FakeDoc::uniform(1, 100.0, 100.0);
    doc.text = vec![String::new()];
    let mut s = session_with(doc);
    assert!(matches!(
        s.request(&Action::Translate),
        Err(ViewerError::ServiceNotConfigured { .. })
    ));

    // With a service, the empty page is reported.
    s.set_service(Some(Scripted::new(Ok(Completion::Text("x".into())))));
    match s.request(&Action::Translate) {
        Err(ViewerError::NoText { pages }) => assert_eq!(pages, "1"),
        other => panic!("expected NoText, got {other:?}"),
    }
    assert!(s.poll_event().is_none());
}
