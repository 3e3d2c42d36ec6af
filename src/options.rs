use crate::source_map::SourceMap;

/// Options accepted by [`parse`](crate::parse).
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Input file identifier, recorded on every node's source
    pub from: Option<String>,
}

/// How [`stringify`](crate::stringify) should treat source maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MapOptions {
    /// Do not produce a map
    #[default]
    Off,
    /// Produce a map from the positions recorded on the tree
    Generate,
    /// Produce a map composed with an upstream map, given as Source Map v3
    /// JSON text
    Prev(String),
    /// Produce a map composed with an already decoded upstream map
    PrevMap(SourceMap),
}

impl MapOptions {
    pub fn is_off(&self) -> bool {
        matches!(self, MapOptions::Off)
    }
}

/// Options accepted by [`stringify`](crate::stringify).
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Output file identifier, recorded in the produced map
    pub to: Option<String>,
    /// Fallback source identifier for nodes whose input has no file name
    pub from: Option<String>,
    pub map: MapOptions,
}
