//! Casecraft is the placement-and-compositing core of a custom phone case
//! configurator.
//!
//! A foreground image enters the system through one of two acquisition paths
//! (direct upload, or remote text-to-image generation), is positioned over a
//! fixed-aspect product template by direct manipulation, and is flattened
//! into a pixel-accurate composite at save time.
//!
//! # Pipeline overview
//!
//! 1. **Acquire**: [`ExternalImageAcquirer`] normalizes both acquisition
//!    paths into one uploaded, URL-addressable [`ImageResource`]
//! 2. **Place**: [`OverlayState`] tracks the user-mutable placement, locked
//!    to the image's natural aspect ratio
//! 3. **Composite**: [`composite`] maps the placement from container space
//!    into template space and rasterizes template-sized PNG bytes
//! 4. **Save**: [`SaveOrchestrator`] uploads the artifact and persists the
//!    selection concurrently, as one logical commit
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Fresh geometry at composite time**: layout offsets are re-read on
//!   every save, never cached across edits.
//! - **Upload-before-attach**: an [`ImageResource`] only exists once the
//!   upload collaborator has confirmed a reference URL.
//! - **Single save in flight**: overlapping saves for a configuration are
//!   rejected at the orchestrator boundary.
#![forbid(unsafe_code)]

mod acquire;
mod compose;
mod foundation;
mod overlay;
mod remote;
mod save;

pub use acquire::image::ExternalImageAcquirer;
pub use compose::compositor::{CompositeArtifact, FixedGeometry, GeometryReader, composite};
pub use foundation::config::RemoteConfig;
pub use foundation::error::{CasecraftError, CasecraftResult};
pub use foundation::geometry::{
    BoundingBox, Offset, Point, Size, TEMPLATE_ASPECT_HEIGHT, TEMPLATE_ASPECT_WIDTH,
    centered_template_box, container_offset,
};
pub use overlay::state::{
    DEFAULT_OVERLAY_POSITION, ImageResource, ImageSourceKind, OverlayPlacement, OverlayState,
};
pub use remote::generate::{
    GenerationClient, GenerationFailure, GenerationResponse, HttpGenerationClient,
};
pub use remote::persist::{ConfigStore, ConfigurationSelection, HttpConfigStore};
pub use remote::upload::{
    HttpUploader, ImageUploader, UPLOAD_ROUTE_KEY, UploadFile, UploadedImage,
};
pub use save::orchestrator::{PreviewRoute, SaveOrchestrator};
