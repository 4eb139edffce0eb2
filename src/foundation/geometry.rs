use crate::foundation::error::{CasecraftError, CasecraftResult};

/// Aspect ratio of the phone case template (width : height).
pub const TEMPLATE_ASPECT_WIDTH: f64 = 896.0;
pub const TEMPLATE_ASPECT_HEIGHT: f64 = 1831.0;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether this size preserves `natural_width : natural_height` within
    /// integer-pixel rounding tolerance. Gesture handles commit rounded pixel
    /// values, so an exact ratio comparison would reject legitimate resizes.
    pub fn preserves_ratio(self, natural_width: u32, natural_height: u32) -> bool {
        if natural_width == 0 || natural_height == 0 || self.width <= 0.0 || self.height <= 0.0 {
            return false;
        }
        let expected_height = self.width * f64::from(natural_height) / f64::from(natural_width);
        (self.height - expected_height).abs() <= 1.0
    }
}

/// A rendered bounding box in viewport pixel coordinates, as reported by a
/// layout read of a mounted element.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rendered pixel dimensions, rounded for raster-surface allocation.
    pub fn pixel_size(self) -> CasecraftResult<(u32, u32)> {
        let width = self.width.round();
        let height = self.height.round();
        if width < 1.0 || height < 1.0 {
            return Err(CasecraftError::compositing(
                "bounding box has no renderable area",
            ));
        }
        Ok((width as u32, height as u32))
    }
}

/// Offset of the template origin relative to the scroll container origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// Rendered box of a template of the given width, centered in `container`,
/// with the fixed template aspect ratio.
pub fn centered_template_box(container: BoundingBox, width: f64) -> BoundingBox {
    let height = width * TEMPLATE_ASPECT_HEIGHT / TEMPLATE_ASPECT_WIDTH;
    BoundingBox::new(
        container.left + (container.width - width) / 2.0,
        container.top + (container.height - height) / 2.0,
        width,
        height,
    )
}

/// Offset between the template's rendered origin and the container's.
///
/// Computed fresh at composite time; layout can shift between a placement
/// edit and the save (scroll, responsive resize), so this is never cached.
pub fn container_offset(template: BoundingBox, container: BoundingBox) -> Offset {
    Offset {
        x: template.left - container.left,
        y: template.top - container.top,
    }
}
