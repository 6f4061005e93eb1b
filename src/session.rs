use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::TryRecvError;

use crate::config::GridConfig;
use crate::layout::{pack_rows, sanitize_ratio, Item, OffsetTable, Row};
use crate::metadata::{MetaEvent, MetadataCache, MetadataLoader};
use crate::nav::{Direction, NavIndex};
use crate::queue::Job;
use crate::ratio::{RatioEvent, RatioLoader, RatioStore};
use crate::source::{PhotoMeta, PhotoSource};
use crate::window::{visible_window, VisibleWindow};
use crate::DEFAULT_RATIO;

/// Pixel rectangle of one item, in content coordinates (y grows downward
/// from the top of the grid).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One item list's worth of grid state: packed rows, offsets, the visible
/// window, ratio and metadata stores, and the loaders feeding them.
///
/// Instance-scoped by design; several sessions can coexist in one process.
/// The host owns the event loop and calls `on_resize` / `on_scroll` /
/// `pump_events` explicitly; the session never observes the environment
/// itself.
pub struct GridSession {
    config: GridConfig,
    items: Vec<Item>,
    path_index: HashMap<String, usize>,
    generation: u64,
    ratios: RatioStore,
    metadata: MetadataCache,
    ratio_loader: RatioLoader,
    meta_loader: MetadataLoader,
    rows: Vec<Row>,
    offsets: OffsetTable,
    nav: NavIndex,
    window: VisibleWindow,
    container_width: f32,
    scroll_top: f32,
    viewport_height: f32,
}

impl GridSession {
    pub fn new(config: GridConfig, source: Arc<dyn PhotoSource>) -> Self {
        let ratio_loader = RatioLoader::new(Arc::clone(&source), config.probe_workers);
        let meta_loader = MetadataLoader::new(source, config.metadata_workers);
        Self {
            config,
            items: Vec::new(),
            path_index: HashMap::new(),
            generation: 0,
            ratios: RatioStore::new(),
            metadata: MetadataCache::new(),
            ratio_loader,
            meta_loader,
            rows: Vec::new(),
            offsets: OffsetTable::new(&[], 0.0),
            nav: NavIndex::default(),
            window: VisibleWindow::default(),
            container_width: 0.0,
            scroll_top: 0.0,
            viewport_height: 0.0,
        }
    }

    /// Replaces the item list wholesale. Bumps the generation so results
    /// still in flight for the old list are discarded on arrival, resets the
    /// stores, and seeds the probe and metadata warm-up batches.
    pub fn set_items(&mut self, items: Vec<Item>) {
        self.generation += 1;
        self.path_index = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.path.clone(), i))
            .collect();
        self.items = items;
        self.ratios = RatioStore::new();
        self.metadata = MetadataCache::new();
        self.ratio_loader.clear_pending();
        self.meta_loader.clear_pending();
        self.scroll_top = 0.0;
        self.relayout();
        log::info!(
            "item list replaced: {} items, generation {}",
            self.items.len(),
            self.generation
        );

        let generation = self.generation;
        self.ratio_loader.request(
            self.items
                .iter()
                .take(self.config.probe_limit)
                .map(|item| Job {
                    generation,
                    path: item.path.clone(),
                }),
        );
        let warmup = self
            .items
            .iter()
            .take(self.config.metadata_warmup)
            .map(|item| item.path.as_str());
        self.meta_loader
            .ensure_loaded(&mut self.metadata, generation, warmup);
    }

    pub fn on_resize(&mut self, width: f32) {
        if width == self.container_width {
            return;
        }
        self.container_width = width;
        self.relayout();
    }

    pub fn on_scroll(&mut self, scroll_top: f32, viewport_height: f32) {
        self.scroll_top = scroll_top;
        self.viewport_height = viewport_height;
        self.refresh_window();
    }

    /// Drains loader events, applying only those from the current
    /// generation. Returns whether anything observable changed, so the host
    /// knows to redraw.
    pub fn pump_events(&mut self) -> bool {
        let mut ratios_changed = false;
        let mut metadata_changed = false;
        loop {
            match self.ratio_loader.try_recv() {
                Ok(event) => {
                    if event.generation() != self.generation {
                        log::debug!("discarding stale ratio event");
                        continue;
                    }
                    if let RatioEvent::Resolved { path, ratio, .. } = event {
                        if self.ratios.resolve(&path, ratio) {
                            ratios_changed = true;
                        }
                    }
                    // Failures keep the default ratio; nothing to apply.
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        loop {
            match self.meta_loader.try_recv() {
                Ok(event) => {
                    if event.generation() != self.generation {
                        log::debug!("discarding stale metadata event");
                        continue;
                    }
                    match event {
                        MetaEvent::Loaded { path, meta, .. } => {
                            if self.metadata.complete_loaded(&path, meta) {
                                metadata_changed = true;
                            }
                        }
                        MetaEvent::Failed { path, .. } => self.metadata.complete_failed(&path),
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if ratios_changed {
            self.relayout();
        }
        ratios_changed || metadata_changed
    }

    fn relayout(&mut self) {
        let ratios = &self.ratios;
        self.rows = pack_rows(
            &self.items,
            |path| ratios.get(path),
            self.container_width,
            self.config.target_row_height,
            self.config.gap,
        );
        self.offsets = OffsetTable::new(&self.rows, self.config.gap);
        self.nav = NavIndex::new(&self.rows);
        self.refresh_window();
    }

    fn refresh_window(&mut self) {
        self.window = visible_window(
            &self.offsets,
            &self.rows,
            self.scroll_top,
            self.viewport_height,
            self.config.overscan,
        );

        // Metadata for everything in or about to enter the window.
        let generation = self.generation;
        let paths = self.window.rows().flat_map(|r| {
            self.items[self.rows[r].indices()]
                .iter()
                .map(|item| item.path.as_str())
        });
        self.meta_loader
            .ensure_loaded(&mut self.metadata, generation, paths);

        // Pending probes for rows near the viewport resolve first.
        let viewport_center = self.scroll_top + self.viewport_height / 2.0;
        let path_index = &self.path_index;
        let nav = &self.nav;
        let offsets = &self.offsets;
        let rows = &self.rows;
        self.ratio_loader.reprioritize(move |path| {
            let idx = match path_index.get(path) {
                Some(&idx) => idx,
                None => return f32::MAX,
            };
            match nav.position_of(idx) {
                Some((row, _)) => {
                    let row_center = offsets.offsets[row] + rows[row].height / 2.0;
                    (row_center - viewport_center).abs()
                }
                None => f32::MAX,
            }
        });
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn total_height(&self) -> f32 {
        self.offsets.total_height
    }

    pub fn visible_window(&self) -> VisibleWindow {
        self.window
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn nav(&self) -> &NavIndex {
        &self.nav
    }

    pub fn step(&self, flat: usize, dir: Direction) -> usize {
        self.nav.step(flat, dir)
    }

    /// Ratio used for layout: the probed value if resolved, the default
    /// otherwise.
    pub fn ratio_of(&self, path: &str) -> f32 {
        sanitize_ratio(self.ratios.get(path).unwrap_or(DEFAULT_RATIO))
    }

    pub fn metadata(&self, path: &str) -> Option<&PhotoMeta> {
        self.metadata.get(path)
    }

    /// Flat indices of every item in the rendered window, in draw order.
    pub fn visible_items(&self) -> Vec<usize> {
        self.window
            .rows()
            .flat_map(|r| self.rows[r].indices())
            .collect()
    }

    /// Content-space rectangle for one item, or `None` if the index is out
    /// of range.
    pub fn item_rect(&self, flat: usize) -> Option<ItemRect> {
        let (row_idx, _) = self.nav.position_of(flat)?;
        let row = self.rows[row_idx];
        let mut x = 0.0f32;
        for i in row.start..flat {
            x += self.ratio_of(&self.items[i].path) * row.height + self.config.gap;
        }
        Some(ItemRect {
            x,
            y: self.offsets.top_of(row_idx),
            width: self.ratio_of(&self.items[flat].path) * row.height,
            height: row.height,
        })
    }
}

impl Drop for GridSession {
    fn drop(&mut self) {
        self.ratio_loader.close();
        self.meta_loader.close();
    }
}
