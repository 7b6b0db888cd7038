use std::sync::OnceLock;

use anyhow::Result;
use log::{info, warn};
use percent_encoding::percent_decode_str;

pub const SHOW_SANTA_PARAM: &str = "showSanta";
pub const STAR_CLICKED_PARAM: &str = "starClicked";

/// Decoded `key=value&...` launch parameters. The first occurrence of a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pairs: Vec<(String, String)>,
}

impl LaunchParams {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((key, value)) => (decode_component(key), decode_component(value)),
                None => (decode_component(part), String::new()),
            })
            .collect();
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    percent_decode_str(&raw).decode_utf8_lossy().into_owned()
}

/// Where launch parameters come from.
pub trait EnvironmentQuery: Send + Sync {
    fn param(&self, key: &str) -> Option<String>;
}

/// The widget's own launch parameters only.
pub struct SameContext {
    params: LaunchParams,
}

impl SameContext {
    pub fn new(query: &str) -> Self {
        Self {
            params: LaunchParams::parse(query),
        }
    }
}

impl EnvironmentQuery for SameContext {
    fn param(&self, key: &str) -> Option<String> {
        self.params.get(key).map(str::to_owned)
    }
}

type ParentReader = Box<dyn Fn() -> Result<String> + Send + Sync>;

/// Own parameters first, then the enclosing document's. The parent is read at
/// most once; any failure (typically a cross-origin denial) counts as absent.
pub struct EmbeddedContext {
    own: LaunchParams,
    read_parent: ParentReader,
    parent: OnceLock<Option<LaunchParams>>,
}

impl EmbeddedContext {
    pub fn new<F>(own_query: &str, read_parent: F) -> Self
    where
        F: Fn() -> Result<String> + Send + Sync + 'static,
    {
        Self {
            own: LaunchParams::parse(own_query),
            read_parent: Box::new(read_parent),
            parent: OnceLock::new(),
        }
    }

    fn parent_params(&self) -> Option<&LaunchParams> {
        self.parent
            .get_or_init(|| match (self.read_parent)() {
                Ok(query) => Some(LaunchParams::parse(&query)),
                Err(err) => {
                    warn!("parent launch parameters unavailable: {err:#}");
                    None
                }
            })
            .as_ref()
    }
}

impl EnvironmentQuery for EmbeddedContext {
    fn param(&self, key: &str) -> Option<String> {
        if let Some(value) = self.own.get(key) {
            return Some(value.to_owned());
        }
        self.parent_params()
            .and_then(|params| params.get(key))
            .map(str::to_owned)
    }
}

/// Launch-time directives the state machine cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchDirectives {
    /// `showSanta=false` was given explicitly.
    pub suppress_mascot: bool,
    /// `starClicked=true`: skip the trigger and start the animation on load.
    pub activate_immediately: bool,
}

impl LaunchDirectives {
    pub fn resolve(env: &dyn EnvironmentQuery) -> Self {
        let show_santa = env.param(SHOW_SANTA_PARAM);
        let star_clicked = env.param(STAR_CLICKED_PARAM);

        if let Some(value) = show_santa.as_deref() {
            if value != "true" && value != "false" {
                warn!("unrecognised {SHOW_SANTA_PARAM} value {value:?}, ignoring");
            }
        }

        let directives = Self {
            suppress_mascot: show_santa.as_deref() == Some("false"),
            activate_immediately: star_clicked.as_deref() == Some("true"),
        };
        info!(
            "launch directives: {SHOW_SANTA_PARAM}={:?} {STAR_CLICKED_PARAM}={:?} -> {:?}",
            show_santa, star_clicked, directives
        );
        directives
    }
}
