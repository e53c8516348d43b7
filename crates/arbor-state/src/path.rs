//! Paths locating nodes inside a state tree.
//!
//! A path is a sequence of segments from the root to a node. Each segment is
//! either a key (plain objects and keyed maps) or an index (ordered lists).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single segment in a path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Attribute or map key.
    Key(String),
    /// List position.
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }

    /// Get the index if this is an index segment.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(_) => None,
            Seg::Index(i) => Some(*i),
        }
    }

    /// The segment as a key, stringifying indices.
    pub fn to_key(&self) -> String {
        match self {
            Seg::Key(k) => k.clone(),
            Seg::Index(i) => i.to_string(),
        }
    }

    /// The segment as an index, parsing keys made of digits.
    pub fn to_index(&self) -> Option<usize> {
        match self {
            Seg::Key(k) => k.parse().ok(),
            Seg::Index(i) => Some(*i),
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => f.write_str(k),
            Seg::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<&String> for Seg {
    fn from(s: &String) -> Self {
        Seg::Key(s.clone())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

impl From<&Seg> for Seg {
    fn from(seg: &Seg) -> Self {
        seg.clone()
    }
}

/// A location in a state tree.
///
/// Paths are immutable: every derivation returns a new path.
///
/// # Examples
///
/// ```
/// use arbor_state::Path;
///
/// let path = Path::root().child("todos").child(0usize);
/// assert_eq!(path.to_string(), "/todos/0");
/// assert!(Path::root().child("todos").targets(&path));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The root path.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// A new path with `seg` appended.
    #[inline]
    pub fn child(&self, seg: impl Into<Seg>) -> Path {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(seg.into());
        Path(segments)
    }

    /// The parent path, or `None` at the root.
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Path(rest.to_vec())),
            None => None,
        }
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this is the root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Same as [`Path::is_root`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment, `None` at the root.
    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Check whether this path is an ancestor of, or equal to, `other`.
    ///
    /// ```
    /// use arbor_state::path;
    ///
    /// let todos = path!("todos");
    /// let todo = path!("todos", "abc");
    ///
    /// assert!(todos.targets(&todo));
    /// assert!(todo.targets(&todo));
    /// assert!(!todo.targets(&todos));
    /// ```
    #[inline]
    pub fn targets(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Check whether this path lies strictly below `other`.
    #[inline]
    pub fn is_descendant_of(&self, other: &Path) -> bool {
        self.0.len() > other.0.len() && other.targets(self)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    /// Parse the display form. Segments made only of digits become indices;
    /// the store canonicalizes them against the tree on lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.split('/')
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<usize>() {
                Ok(i) => Seg::Index(i),
                Err(_) => Seg::Key(part.to_owned()),
            })
            .collect())
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a `Path` from a sequence of segments.
///
/// ```
/// use arbor_state::path;
///
/// // String literals become key segments, numbers become index segments.
/// let p = path!("projects", 0usize, "epics");
/// assert_eq!(p.to_string(), "/projects/0/epics");
/// ```
#[macro_export]
macro_rules! path {
    (@seg $seg:expr) => {
        $crate::Seg::from($seg)
    };
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let segments: ::std::vec::Vec<$crate::Seg> = ::std::vec![
            $($crate::path!(@seg $seg)),+
        ];
        $crate::Path::from_segments(segments)
    }};
}
