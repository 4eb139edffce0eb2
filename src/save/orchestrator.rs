use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::{
    compose::compositor::{self, GeometryReader},
    foundation::error::{CasecraftError, CasecraftResult},
    overlay::state::{ImageResource, OverlayPlacement},
    remote::{
        persist::{ConfigStore, ConfigurationSelection},
        upload::{ImageUploader, UploadFile},
    },
};

/// Navigation target after a successful save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewRoute {
    config_id: String,
}

impl PreviewRoute {
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn path(&self) -> String {
        format!("/configure/preview?id={}", self.config_id)
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the compositing, artifact upload, and selection persistence of one
/// save action as a single logical commit.
///
/// At most one save may be in flight per orchestrator; a second call while
/// the first is unresolved is rejected before any collaborator is contacted,
/// so duplicate uploads can never race each other.
pub struct SaveOrchestrator<U, S> {
    uploader: U,
    store: S,
    in_flight: AtomicBool,
}

impl<U: ImageUploader, S: ConfigStore> SaveOrchestrator<U, S> {
    pub fn new(uploader: U, store: S) -> Self {
        Self {
            uploader,
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Composites the current placement, then concurrently uploads the
    /// artifact and persists the selection. Succeeds only if both branches
    /// succeed; either failure reports one undifferentiated save error and
    /// the caller may retry from the same state.
    ///
    /// A compositing failure aborts before any upload or persistence call
    /// is issued.
    #[tracing::instrument(skip_all, fields(config_id = %config_id))]
    pub async fn save(
        &self,
        config_id: &str,
        selection: &ConfigurationSelection,
        template: &dyn GeometryReader,
        container: &dyn GeometryReader,
        placement: &OverlayPlacement,
        resource: &ImageResource,
    ) -> CasecraftResult<PreviewRoute> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CasecraftError::save("a save is already in flight"));
        }
        let _guard = InFlightGuard(&self.in_flight);

        let artifact = compositor::composite(template, container, placement, resource).await?;

        let upload = async {
            let file = UploadFile::png("filename.png", artifact.png.clone());
            self.uploader.upload(vec![file], config_id).await.map(|_| ())
        };
        let persist = self.store.save(config_id, selection);

        match tokio::try_join!(upload, persist) {
            Ok(((), ())) => {
                info!(config_id, "configuration saved");
                Ok(PreviewRoute {
                    config_id: config_id.to_string(),
                })
            }
            Err(err) => {
                warn!(config_id, error = %err, "save failed");
                Err(CasecraftError::save("could not save configuration"))
            }
        }
    }
}
