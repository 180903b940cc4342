//! Index newtypes for dual-mesh entities.
//!
//! Hot loops index points with raw `usize`. The newtypes appear where local
//! and global numbering meet (restart files, halo matching) and where a
//! boundary marker is passed around, so the two cannot be swapped silently.

use std::fmt;

macro_rules! mesh_index {
    ($(#[$meta:meta])* $name:ident => $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Raw local index.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(index: $name) -> usize {
                index.0
            }
        }
    };
}

mesh_index!(
    /// Local point (dual control volume) index.
    ///
    /// ```
    /// use incflow::types::PointIndex;
    ///
    /// let p = PointIndex::new(42);
    /// assert_eq!(p.get(), 42);
    /// assert_eq!(p.to_string(), "point#42");
    /// ```
    PointIndex => "point"
);

mesh_index!(
    /// Position of a marker in the mesh marker list.
    MarkerIndex => "marker"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion() {
        let m = MarkerIndex::new(3);
        assert_eq!(usize::from(m), 3);
        assert_eq!(m.get(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(MarkerIndex::new(1).to_string(), "marker#1");
        assert!(PointIndex::new(2) < PointIndex::new(5));
    }
}
