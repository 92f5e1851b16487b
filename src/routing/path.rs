//! Path accumulation.
//!
//! A [`PathAccumulator`] is an immutable node holding the segments collected
//! so far and the registration callback of its root. Descending yields a new
//! node; [`PathAccumulator::finalize`] consumes the node and hands
//! `(segments, payload)` to the callback. Nothing is registered before that.
//!
//! ```rust,ignore
//! server.get().descend("people").param("id").handle(get_person);
//! server.get().at("people/$id/phones/$type").handle(get_phone);
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Leading character that turns a segment into a positional parameter.
pub const PARAM_MARKER: char = '$';

/// One element of a registered path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Matched exactly.
    Literal(String),
    /// Captured positionally; holds the name after the marker.
    Param(String),
}

impl PathSegment {
    /// Classify opaque segment text.
    pub fn parse(text: &str) -> Self {
        match text.strip_prefix(PARAM_MARKER) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(text.to_string()),
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, PathSegment::Param(_))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Literal(text) => f.write_str(text),
            PathSegment::Param(name) => write!(f, "{}{}", PARAM_MARKER, name),
        }
    }
}

/// Payload accepted by the terminal call of an accumulator kind.
pub trait Terminal {
    type Payload;
}

/// Recursive path builder terminated by a registration call.
pub struct PathAccumulator<K: Terminal> {
    segments: Vec<PathSegment>,
    register: Arc<dyn Fn(Vec<PathSegment>, K::Payload) + Send + Sync>,
}

impl<K: Terminal> PathAccumulator<K> {
    /// Root node (no segments) bound to `register`.
    pub fn root<F>(register: F) -> Self
    where
        F: Fn(Vec<PathSegment>, K::Payload) + Send + Sync + 'static,
    {
        Self {
            segments: Vec::new(),
            register: Arc::new(register),
        }
    }

    /// New node with `name` appended. Any text is accepted; a leading `$`
    /// makes it a parameter.
    pub fn descend(&self, name: impl AsRef<str>) -> Self {
        self.push(PathSegment::parse(name.as_ref()))
    }

    /// New node with a parameter segment appended.
    pub fn param(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::Param(name.into()))
    }

    /// Descend through every `/`-separated piece of `path`.
    pub fn at(&self, path: &str) -> Self {
        path.split('/')
            .filter(|piece| !piece.is_empty())
            .fold(self.clone(), |node, piece| node.descend(piece))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Terminal call: deliver the chain and its payload to the root callback.
    pub fn finalize(self, payload: K::Payload) {
        (self.register)(self.segments, payload)
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self {
            segments,
            register: self.register.clone(),
        }
    }
}

impl<K: Terminal> Clone for PathAccumulator<K> {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            register: self.register.clone(),
        }
    }
}

impl<K: Terminal> fmt::Debug for PathAccumulator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathAccumulator")
            .field("segments", &self.segments)
            .finish_non_exhaustive()
    }
}

/// Positional parameter values, in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<String>);

impl Params {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for Params {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Params {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl FromIterator<String> for Params {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
