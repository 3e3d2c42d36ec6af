//! Source Map v3 support: the serde model of the JSON document, base64 VLQ
//! coding, a builder fed by the stringifier, and consumption of an upstream
//! map for composition.

use crate::location::Location;
use serde::{Deserialize, Serialize};

/// A Source Map v3 document, as serialized to and from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn from_json(json: &str) -> Result<SourceMap, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0x1f) as usize;
        vlq >>= 5;
        if vlq != 0 {
            digit |= 0x20;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

fn decode_base64(byte: u8) -> Option<i64> {
    match byte {
        b'A'..=b'Z' => Some((byte - b'A') as i64),
        b'a'..=b'z' => Some((byte - b'a') as i64 + 26),
        b'0'..=b'9' => Some((byte - b'0') as i64 + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Decodes one comma-free segment of a mappings string into its fields.
fn decode_segment(segment: &str) -> Option<Vec<i64>> {
    let mut fields = Vec::new();
    let mut value: i64 = 0;
    let mut shift = 0;

    for byte in segment.bytes() {
        let digit = decode_base64(byte)?;
        value += (digit & 0x1f) << shift;
        if digit & 0x20 != 0 {
            shift += 5;
        } else {
            let negative = value & 1 == 1;
            let magnitude = value >> 1;
            fields.push(if negative { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        }
    }

    Some(fields)
}

/// One decoded upstream mapping segment with source information.
/// All fields are 0-based.
#[derive(Debug, Clone, Copy)]
struct Segment {
    gen_col: usize,
    source: usize,
    line: usize,
    column: usize,
}

/// A decoded upstream map: per generated line, segments in column order.
struct Consumer {
    map: SourceMap,
    lines: Vec<Vec<Segment>>,
}

impl Consumer {
    fn new(map: SourceMap) -> Self {
        let mut lines = Vec::new();
        let mut source: i64 = 0;
        let mut src_line: i64 = 0;
        let mut src_col: i64 = 0;

        for line in map.mappings.split(';') {
            let mut segments = Vec::new();
            let mut gen_col: i64 = 0;

            for raw in line.split(',') {
                if raw.is_empty() {
                    continue;
                }
                let Some(fields) = decode_segment(raw) else {
                    log::warn!("skipping undecodable source map segment {:?}", raw);
                    continue;
                };
                if fields.is_empty() {
                    continue;
                }

                gen_col += fields[0];
                if fields.len() >= 4 {
                    source += fields[1];
                    src_line += fields[2];
                    src_col += fields[3];
                    segments.push(Segment {
                        gen_col: gen_col.max(0) as usize,
                        source: source.max(0) as usize,
                        line: src_line.max(0) as usize,
                        column: src_col.max(0) as usize,
                    });
                }
            }

            lines.push(segments);
        }

        Self { map, lines }
    }

    /// Resolves a 1-based position in the map's generated text to its
    /// original position (0-based source index, line, column). The match is
    /// the last segment at or before the column on the same line.
    fn original_position(&self, line: usize, column: usize) -> Option<(usize, usize, usize)> {
        let segments = self.lines.get(line.checked_sub(1)?)?;
        let column = column.checked_sub(1)?;

        let mut found = None;
        for segment in segments {
            if segment.gen_col <= column {
                found = Some(segment);
            } else {
                break;
            }
        }
        found.map(|s| (s.source, s.line, s.column))
    }
}

/// A single recorded mapping, all fields 0-based.
struct RawMapping {
    gen_line: usize,
    gen_col: usize,
    source: usize,
    src_line: usize,
    src_col: usize,
}

/// Collects mappings while the stringifier walks the tree and encodes them
/// into a [`SourceMap`]. When an upstream map is supplied, every recorded
/// input position is resolved through it first and the produced map
/// references the upstream sources.
pub(crate) struct MapBuilder {
    upstream: Option<Consumer>,
    /// Fallback source identifier for inputs without a file name
    default_source: Option<String>,
    sources: Vec<String>,
    mappings: Vec<RawMapping>,
}

impl MapBuilder {
    pub(crate) fn new(upstream: Option<SourceMap>, default_source: Option<String>) -> Self {
        let (upstream, sources) = match upstream {
            Some(map) => {
                let sources = map.sources.clone();
                (Some(Consumer::new(map)), sources)
            }
            None => (None, Vec::new()),
        };

        Self {
            upstream,
            default_source,
            sources,
            mappings: Vec::new(),
        }
    }

    fn source_index(&mut self, file: &str) -> usize {
        match self.sources.iter().position(|s| s == file) {
            Some(index) => index,
            None => {
                self.sources.push(file.to_string());
                self.sources.len() - 1
            }
        }
    }

    /// Records that output position `(gen_line, gen_col)` (1-based) comes
    /// from `start` in the named input.
    pub(crate) fn add(&mut self, gen_line: usize, gen_col: usize, file: Option<&str>, start: Location) {
        match &self.upstream {
            Some(consumer) => match consumer.original_position(start.line(), start.column()) {
                Some((source, line, column)) => self.mappings.push(RawMapping {
                    gen_line: gen_line - 1,
                    gen_col: gen_col - 1,
                    source,
                    src_line: line,
                    src_col: column,
                }),
                None => {
                    log::warn!(
                        "no upstream source map entry for {}:{}",
                        start.line(),
                        start.column()
                    );
                }
            },
            None => {
                let file = file
                    .map(str::to_string)
                    .or_else(|| self.default_source.clone())
                    .unwrap_or_else(|| "<css input>".to_string());
                let source = self.source_index(&file);
                self.mappings.push(RawMapping {
                    gen_line: gen_line - 1,
                    gen_col: gen_col - 1,
                    source,
                    src_line: start.line() - 1,
                    src_col: start.column() - 1,
                });
            }
        }
    }

    /// Encodes the collected mappings as a serialized Source Map v3 object.
    pub(crate) fn generate(self, file: Option<String>) -> Result<String, serde_json::Error> {
        self.build(file).to_json()
    }

    fn build(self, file: Option<String>) -> SourceMap {
        // mappings were recorded in output order, so generated lines only
        // ever grow
        let mut mappings = String::new();
        let mut line = 0;
        let mut prev_gen_col: i64 = 0;
        let mut prev_source: i64 = 0;
        let mut prev_src_line: i64 = 0;
        let mut prev_src_col: i64 = 0;

        for mapping in &self.mappings {
            while line < mapping.gen_line {
                mappings.push(';');
                line += 1;
                prev_gen_col = 0;
            }
            if !mappings.is_empty() && !mappings.ends_with(';') {
                mappings.push(',');
            }

            encode_vlq(&mut mappings, mapping.gen_col as i64 - prev_gen_col);
            prev_gen_col = mapping.gen_col as i64;
            encode_vlq(&mut mappings, mapping.source as i64 - prev_source);
            prev_source = mapping.source as i64;
            encode_vlq(&mut mappings, mapping.src_line as i64 - prev_src_line);
            prev_src_line = mapping.src_line as i64;
            encode_vlq(&mut mappings, mapping.src_col as i64 - prev_src_col);
            prev_src_col = mapping.src_col as i64;
        }

        let (sources, sources_content) = match self.upstream {
            Some(consumer) => (consumer.map.sources, consumer.map.sources_content),
            None => (self.sources, None),
        };

        SourceMap {
            version: 3,
            file,
            sources,
            sources_content,
            names: Vec::new(),
            mappings,
        }
    }
}
