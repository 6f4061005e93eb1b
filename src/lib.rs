//! Justified photo-grid layout and scroll virtualization.
//!
//! Pure row packing, offset tables, and window selection, plus background
//! loaders for aspect ratios and EXIF metadata. Headless: the host owns the
//! event loop and the render surface, and drives a [`GridSession`] through
//! explicit resize/scroll/pump calls.

pub mod config;
pub mod layout;
pub mod metadata;
pub mod nav;
pub mod queue;
pub mod ratio;
pub mod session;
pub mod source;
pub mod window;

/// Extra rows appended past the viewport window to mask recomputation
/// latency during fast scrolls.
pub const WINDOW_EXTRA_ROWS: usize = 5;

/// Ratio assumed for items whose dimensions have not been probed yet.
pub const DEFAULT_RATIO: f32 = 4.0 / 3.0;

/// Rows never shrink below this height, no matter how wide their contents.
pub const MIN_ROW_HEIGHT: f32 = 120.0;

pub use config::GridConfig;
pub use layout::{pack_rows, sanitize_ratio, Item, OffsetTable, Row};
pub use metadata::{MetaEvent, MetadataCache, MetadataLoader};
pub use nav::{Direction, NavIndex};
pub use queue::{Job, JobQueue};
pub use ratio::{RatioEvent, RatioLoader, RatioStore};
pub use session::{GridSession, ItemRect};
pub use source::{FsSource, PhotoMeta, PhotoSource};
pub use window::{visible_window, VisibleWindow};
