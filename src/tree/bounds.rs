use std::fmt;

use serde::{Deserialize, Serialize};

/// On-screen rectangle of an element, as serialized by `"[left,top][right,bottom]"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Parse `"[l,t][r,b]"`. Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Bounds> {
        let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?;
        let (first, second) = inner.split_once("][")?;
        let (left, top) = parse_pair(first)?;
        let (right, bottom) = parse_pair(second)?;
        Some(Bounds::new(left, top, right, bottom))
    }

    /// Parse, falling back to `(0,0,0,0)` when the string is malformed.
    pub fn parse_or_default(raw: &str) -> Bounds {
        Self::parse(raw).unwrap_or_else(|| {
            if !raw.trim().is_empty() {
                tracing::debug!(bounds = raw, "failed to parse bounds; using (0,0,0,0)");
            }
            Bounds::default()
        })
    }

    /// Key for top-to-bottom, then left-to-right ordering.
    pub fn reading_order_key(&self) -> (i32, i32) {
        (self.top, self.left)
    }
}

fn parse_pair(raw: &str) -> Option<(i32, i32)> {
    let (a, b) = raw.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}
