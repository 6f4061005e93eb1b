use toml::Value as TomlValue;

const MAX_WORKERS: usize = 32;

/// Engine tunables. Every field has a safe default; TOML overrides are
/// applied best-effort and clamped, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Height rows aim for before justification scales them.
    pub target_row_height: f32,
    /// Horizontal and vertical spacing between items.
    pub gap: f32,
    /// Extra margin above and below the viewport kept rendered.
    pub overscan: f32,
    /// Dimension-probe worker threads.
    pub probe_workers: usize,
    /// Metadata-fetch worker threads.
    pub metadata_workers: usize,
    /// How many items from the head of a new list get ratio probes.
    pub probe_limit: usize,
    /// Eager metadata warm-up batch from the head of a new list.
    pub metadata_warmup: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            target_row_height: 196.0,
            gap: 8.0,
            overscan: 600.0,
            probe_workers: 16,
            metadata_workers: 16,
            probe_limit: 200,
            metadata_warmup: 24,
        }
    }
}

impl GridConfig {
    /// Parses overrides from a TOML table, keeping defaults for any key that
    /// is missing or malformed.
    pub fn from_toml_str(s: &str) -> Self {
        let mut config = Self::default();
        let table = match toml::from_str::<TomlValue>(s) {
            Ok(TomlValue::Table(table)) => table,
            _ => return config,
        };
        for (key, val) in table {
            match key.as_str() {
                "target_row_height" => {
                    if let Some(v) = positive_float(&val) {
                        config.target_row_height = v;
                    }
                }
                "gap" => {
                    if let Some(v) = non_negative_float(&val) {
                        config.gap = v;
                    }
                }
                "overscan" => {
                    if let Some(v) = non_negative_float(&val) {
                        config.overscan = v;
                    }
                }
                "probe_workers" => {
                    if let Some(v) = count(&val) {
                        config.probe_workers = v.clamp(1, MAX_WORKERS);
                    }
                }
                "metadata_workers" => {
                    if let Some(v) = count(&val) {
                        config.metadata_workers = v.clamp(1, MAX_WORKERS);
                    }
                }
                "probe_limit" => {
                    if let Some(v) = count(&val) {
                        config.probe_limit = v;
                    }
                }
                "metadata_warmup" => {
                    if let Some(v) = count(&val) {
                        config.metadata_warmup = v;
                    }
                }
                _ => {}
            }
        }
        config
    }
}

fn float(val: &TomlValue) -> Option<f32> {
    match val {
        TomlValue::Float(f) => Some(*f as f32),
        TomlValue::Integer(i) => Some(*i as f32),
        _ => None,
    }
}

fn positive_float(val: &TomlValue) -> Option<f32> {
    float(val).filter(|v| v.is_finite() && *v > 0.0)
}

fn non_negative_float(val: &TomlValue) -> Option<f32> {
    float(val).filter(|v| v.is_finite() && *v >= 0.0)
}

fn count(val: &TomlValue) -> Option<usize> {
    match val {
        TomlValue::Integer(i) if *i >= 0 => Some(*i as usize),
        _ => None,
    }
}
