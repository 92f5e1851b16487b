//! Transport path patterns.
//!
//! # Responsibilities
//! - Translate accumulated segments into a transport route string
//! - Match request paths exactly (routes) or by prefix (intercepts, mounts)
//! - Extract parameter values in path order
//!
//! # Design Decisions
//! - Literal matching is case-sensitive
//! - A trailing `/` on the request path is ignored
//! - Parameter values are percent-decoded; literals compare raw
//! - No regex: a pattern is a plain segment list

use percent_encoding::percent_decode_str;

use crate::routing::path::{Params, PathSegment};

/// A compiled path: literal segments plus positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<PathSegment>,
}

impl PathPattern {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Placeholder names, in extraction order. A parameter at chain
    /// position `i` is named `var{i}`.
    pub fn placeholders(&self) -> Vec<String> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.is_param())
            .map(|(index, _)| placeholder(index))
            .collect()
    }

    pub fn param_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_param()).count()
    }

    /// Route string in transport syntax, e.g. `/people/{var1}`.
    pub fn transport_path(&self) -> String {
        let parts: Vec<String> = self
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| match segment {
                PathSegment::Literal(text) => text.clone(),
                PathSegment::Param(_) => format!("{{{}}}", placeholder(index)),
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    /// Match the whole request path.
    pub fn match_exact(&self, path: &str) -> Option<Params> {
        let pieces = split_path(path);
        if pieces.len() != self.segments.len() {
            return None;
        }
        self.capture(&pieces)
    }

    /// Match a leading part of the request path on segment boundaries.
    /// Returns the captured params and the remaining (decoded) segments.
    pub fn match_prefix(&self, path: &str) -> Option<(Params, Vec<String>)> {
        let pieces = split_path(path);
        if pieces.len() < self.segments.len() {
            return None;
        }
        let (head, rest) = pieces.split_at(self.segments.len());
        let params = self.capture(head)?;
        Some((params, rest.iter().map(|piece| decode(piece)).collect()))
    }

    fn capture(&self, pieces: &[&str]) -> Option<Params> {
        let mut values = Vec::with_capacity(self.param_count());
        for (segment, piece) in self.segments.iter().zip(pieces) {
            match segment {
                PathSegment::Literal(text) if text.as_str() == *piece => {}
                PathSegment::Literal(_) => return None,
                PathSegment::Param(_) if piece.is_empty() => return None,
                PathSegment::Param(_) => values.push(decode(piece)),
            }
        }
        Some(Params::from(values))
    }
}

fn placeholder(index: usize) -> String {
    format!("var{}", index)
}

/// Split a request path into raw segments. `/` and `` give no segments.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn decode(piece: &str) -> String {
    percent_decode_str(piece).decode_utf8_lossy().into_owned()
}
