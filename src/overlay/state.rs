use bytes::Bytes;

use crate::foundation::{
    error::{CasecraftError, CasecraftResult},
    geometry::{Offset, Point, Size},
};

/// Default container-space position for a freshly attached image.
pub const DEFAULT_OVERLAY_POSITION: Point = Point { x: 150.0, y: 205.0 };

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSourceKind {
    Uploaded,
    Generated,
}

/// A foreground image that has been uploaded and is addressable by URL.
///
/// Produced by the acquirer only after the upload collaborator confirms the
/// reference URL, so attaching a resource to [`OverlayState`] can never show
/// an image that is not yet persisted.
#[derive(Clone, Debug)]
pub struct ImageResource {
    pub source_kind: ImageSourceKind,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub bytes: Bytes,
    pub url: String,
}

/// The user-controlled rectangle of the foreground image, in container-space
/// pixels. Width/height are locked to the image's natural aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayPlacement {
    pub position: Point,
    pub size: Size,
}

impl OverlayPlacement {
    /// Default placement when an image resource arrives: a quarter of the
    /// natural dimensions at the fixed default position.
    pub fn default_for(resource: &ImageResource) -> Self {
        Self {
            position: DEFAULT_OVERLAY_POSITION,
            size: Size::new(
                f64::from(resource.pixel_width) / 4.0,
                f64::from(resource.pixel_height) / 4.0,
            ),
        }
    }

    /// The same rectangle expressed relative to the template origin. Both
    /// spaces share scale, so only the position shifts.
    pub fn in_template_space(self, offset: Offset) -> Self {
        Self {
            position: Point::new(self.position.x - offset.x, self.position.y - offset.y),
            size: self.size,
        }
    }
}

/// Live placement of the current foreground image.
///
/// Owns the [`ImageResource`] once attached; placement is always fully
/// specified while a resource exists. Mutations replace the placement
/// atomically, so readers never observe a half-applied gesture.
#[derive(Debug, Default)]
pub struct OverlayState {
    current: Option<(ImageResource, OverlayPlacement)>,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a new image resource, discarding any previous one
    /// and resetting the placement to the default.
    pub fn attach(&mut self, resource: ImageResource) {
        let placement = OverlayPlacement::default_for(&resource);
        self.current = Some((resource, placement));
    }

    /// Commits the final values of a resize gesture. The UI layer enforces
    /// the aspect lock during the gesture; this re-checks the committed size
    /// against the natural ratio.
    pub fn resize(&mut self, new_size: Size, new_position: Point) -> CasecraftResult<()> {
        let Some((resource, placement)) = self.current.as_mut() else {
            return Err(CasecraftError::validation("no image attached to resize"));
        };
        if !new_size.preserves_ratio(resource.pixel_width, resource.pixel_height) {
            return Err(CasecraftError::validation(
                "resize must preserve the image aspect ratio",
            ));
        }
        *placement = OverlayPlacement {
            position: new_position,
            size: new_size,
        };
        Ok(())
    }

    /// Commits the final position of a drag gesture; size unchanged.
    /// Out-of-bounds positions are allowed (user-directed cropping).
    pub fn move_to(&mut self, new_position: Point) -> CasecraftResult<()> {
        let Some((_, placement)) = self.current.as_mut() else {
            return Err(CasecraftError::validation("no image attached to move"));
        };
        *placement = OverlayPlacement {
            position: new_position,
            size: placement.size,
        };
        Ok(())
    }

    pub fn placement(&self) -> Option<&OverlayPlacement> {
        self.current.as_ref().map(|(_, p)| p)
    }

    pub fn resource(&self) -> Option<&ImageResource> {
        self.current.as_ref().map(|(r, _)| r)
    }
}
