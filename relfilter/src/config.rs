use std::env;

/// Default limit on filter nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Evaluation settings carried by a [`crate::Store`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum nesting of objects and arrays in a filter
    pub max_depth: usize,
    /// Escape character for literal `%` and `_` in `$like` patterns
    pub like_escape: Option<char>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            like_escape: Some('\\'),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn like_escape(mut self, escape: Option<char>) -> Self {
        self.like_escape = escape;
        self
    }

    /// Defaults overridden by `RELFILTER_MAX_DEPTH` and `RELFILTER_LIKE_ESCAPE`.
    ///
    /// Unparseable values are ignored with a warning. An empty
    /// `RELFILTER_LIKE_ESCAPE` disables escaping.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var("RELFILTER_MAX_DEPTH") {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_depth = depth,
                _ => log::warn!("ignoring invalid RELFILTER_MAX_DEPTH={:?}", raw),
            }
        }
        if let Ok(raw) = env::var("RELFILTER_LIKE_ESCAPE") {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (None, _) => config.like_escape = None,
                (Some(c), None) => config.like_escape = Some(c),
                _ => log::warn!("ignoring invalid RELFILTER_LIKE_ESCAPE={:?}", raw),
            }
        }
        config
    }
}
