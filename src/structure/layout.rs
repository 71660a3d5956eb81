use crate::config::CleaningConfig;
use crate::types::{BoundingBox, DocumentInput, Role};
use std::collections::HashMap;

/// Page dimensions for one document, passed explicitly into classification
#[derive(Debug, Clone, Default)]
pub struct PageGeometry {
    sizes: HashMap<u32, (f64, f64)>,
    page_count: u32,
}

impl PageGeometry {
    pub fn from_input(input: &DocumentInput) -> Self {
        Self {
            sizes: input
                .pages
                .iter()
                .map(|p| (p.page, (p.width, p.height)))
                .collect(),
            page_count: input.page_count(),
        }
    }

    /// Every page is US Letter
    pub fn uniform(page_count: u32) -> Self {
        Self {
            sizes: HashMap::new(),
            page_count,
        }
    }

    pub fn with_page(mut self, page: u32, width: f64, height: f64) -> Self {
        self.sizes.insert(page, (width, height));
        self.page_count = self.page_count.max(page);
        self
    }

    /// Width and height of `page`, defaulting to US Letter
    pub fn size(&self, page: u32) -> (f64, f64) {
        self.sizes
            .get(&page)
            .copied()
            .unwrap_or((crate::types::DEFAULT_PAGE_WIDTH, crate::types::DEFAULT_PAGE_HEIGHT))
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}

/// Page margins, in percent, whose content is running headers and footers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl CropRegion {
    pub fn from_config(config: &CleaningConfig) -> Self {
        Self {
            top: config.crop_top_percent,
            bottom: config.crop_bottom_percent,
            left: config.crop_left_percent,
            right: config.crop_right_percent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top <= 0.0 && self.bottom <= 0.0 && self.left <= 0.0 && self.right <= 0.0
    }

    /// HEADER or FOOTER when the box lies entirely inside a margin.
    ///
    /// Side margins have no natural role, so the vertical centre decides:
    /// upper half is a header, lower half a footer.
    pub fn classify(&self, bbox: &BoundingBox, page_size: (f64, f64)) -> Option<Role> {
        let (width, height) = page_size;

        if self.top > 0.0 && bbox.y1 <= height * self.top / 100.0 {
            return Some(Role::Header);
        }
        if self.bottom > 0.0 && bbox.y0 >= height * (1.0 - self.bottom / 100.0) {
            return Some(Role::Footer);
        }

        let in_left = self.left > 0.0 && bbox.x1 <= width * self.left / 100.0;
        let in_right = self.right > 0.0 && bbox.x0 >= width * (1.0 - self.right / 100.0);
        if in_left || in_right {
            return Some(if bbox.center_y() < height / 2.0 {
                Role::Header
            } else {
                Role::Footer
            });
        }

        None
    }
}
