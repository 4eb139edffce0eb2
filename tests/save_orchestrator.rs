use std::{
    io::Cursor,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use bytes::Bytes;
use casecraft::{
    BoundingBox, CasecraftError, CasecraftResult, ConfigStore, ConfigurationSelection,
    FixedGeometry, GeometryReader, ImageResource, ImageSourceKind, ImageUploader,
    OverlayPlacement, Point, SaveOrchestrator, Size, UploadFile, UploadedImage,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn solid_png(width: u32, height: u32) -> Bytes {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    Bytes::from(buf)
}

fn resource() -> ImageResource {
    ImageResource {
        source_kind: ImageSourceKind::Generated,
        pixel_width: 16,
        pixel_height: 16,
        bytes: solid_png(16, 16),
        url: "https://files.example/img.png".to_string(),
    }
}

fn placement() -> OverlayPlacement {
    OverlayPlacement {
        position: Point::new(150.0, 205.0),
        size: Size::new(16.0, 16.0),
    }
}

fn selection() -> ConfigurationSelection {
    ConfigurationSelection {
        color: "black".to_string(),
        model: "iphone12".to_string(),
        material: "silicone".to_string(),
        finish: "smooth".to_string(),
    }
}

fn template() -> FixedGeometry {
    FixedGeometry(BoundingBox::new(100.0, 50.0, 240.0, 492.0))
}

fn container() -> FixedGeometry {
    FixedGeometry(BoundingBox::new(0.0, 0.0, 800.0, 600.0))
}

struct Unmounted;

impl GeometryReader for Unmounted {
    fn bounding_box(&self) -> Option<BoundingBox> {
        None
    }
}

struct CountingUploader {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingUploader {
    fn new(fail: bool) -> Self {
        init_tracing();
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

impl ImageUploader for &CountingUploader {
    async fn upload(
        &self,
        files: Vec<UploadFile>,
        _config_id: &str,
    ) -> CasecraftResult<Vec<UploadedImage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(CasecraftError::save("upload collaborator returned 500"));
        }
        Ok(files
            .iter()
            .map(|f| UploadedImage {
                url: format!("https://files.example/{}", f.name),
                width: None,
                height: None,
            })
            .collect())
    }
}

struct CountingStore {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingStore {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

impl ConfigStore for &CountingStore {
    async fn save(
        &self,
        _config_id: &str,
        _selection: &ConfigurationSelection,
    ) -> CasecraftResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(CasecraftError::save("persistence collaborator returned 500"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn successful_save_returns_preview_route() {
    let uploader = CountingUploader::new(false);
    let store = CountingStore::new(false);
    let orchestrator = SaveOrchestrator::new(&uploader, &store);

    let route = orchestrator
        .save(
            "cfg-1",
            &selection(),
            &template(),
            &container(),
            &placement(),
            &resource(),
        )
        .await
        .unwrap();

    assert_eq!(route.path(), "/configure/preview?id=cfg-1");
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    assert!(!orchestrator.is_in_flight());
}

#[tokio::test]
async fn persistence_failure_fails_the_whole_save() {
    // Upload succeeds, persistence rejects: no partial success, no route.
    let uploader = CountingUploader::new(false);
    let store = CountingStore::new(true);
    let orchestrator = SaveOrchestrator::new(&uploader, &store);

    let err = orchestrator
        .save(
            "cfg-1",
            &selection(),
            &template(),
            &container(),
            &placement(),
            &resource(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CasecraftError::Save(_)));
    assert!(err.to_string().contains("could not save configuration"));
}

#[tokio::test]
async fn upload_failure_fails_the_whole_save() {
    let uploader = CountingUploader::new(true);
    let store = CountingStore::new(false);
    let orchestrator = SaveOrchestrator::new(&uploader, &store);

    let err = orchestrator
        .save(
            "cfg-1",
            &selection(),
            &template(),
            &container(),
            &placement(),
            &resource(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CasecraftError::Save(_)));
}

#[tokio::test]
async fn second_save_while_in_flight_issues_no_collaborator_calls() {
    let uploader = CountingUploader::new(false);
    let store = CountingStore::new(false);
    let orchestrator = SaveOrchestrator::new(&uploader, &store);

    let sel = selection();
    let tpl = template();
    let ctr = container();
    let pl = placement();
    let res = resource();

    let (first, second) = tokio::join!(
        orchestrator.save("cfg-1", &sel, &tpl, &ctr, &pl, &res),
        orchestrator.save("cfg-1", &sel, &tpl, &ctr, &pl, &res),
    );

    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);

    let rejected = if outcomes[0] { second } else { first };
    let err = rejected.unwrap_err();
    assert!(err.to_string().contains("already in flight"));
}

#[tokio::test]
async fn compositing_failure_aborts_before_any_collaborator_call() {
    let uploader = CountingUploader::new(false);
    let store = CountingStore::new(false);
    let orchestrator = SaveOrchestrator::new(&uploader, &store);

    let err = orchestrator
        .save(
            "cfg-1",
            &selection(),
            &Unmounted,
            &container(),
            &placement(),
            &resource(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CasecraftError::Compositing(_)));
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);

    // The guard released; a retry from the same state succeeds.
    let route = orchestrator
        .save(
            "cfg-1",
            &selection(),
            &template(),
            &container(),
            &placement(),
            &resource(),
        )
        .await
        .unwrap();
    assert_eq!(route.config_id(), "cfg-1");
}

#[tokio::test]
async fn save_after_failure_can_retry() {
    let failing_store = CountingStore::new(true);
    let uploader = CountingUploader::new(false);
    let orchestrator = SaveOrchestrator::new(&uploader, &failing_store);

    let err = orchestrator
        .save(
            "cfg-1",
            &selection(),
            &template(),
            &container(),
            &placement(),
            &resource(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CasecraftError::Save(_)));
    assert!(!orchestrator.is_in_flight());

    let ok_store = CountingStore::new(false);
    let retry = SaveOrchestrator::new(&uploader, &ok_store);
    let route = retry
        .save(
            "cfg-1",
            &selection(),
            &template(),
            &container(),
            &placement(),
            &resource(),
        )
        .await
        .unwrap();
    assert_eq!(route.path(), "/configure/preview?id=cfg-1");
}
