//! Opaque ID newtypes for architecture entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, and `Serialize`/`Deserialize`.
//! Block types and RRG nodes are referenced by index into contiguous arrays
//! owned by [`crate::ArchitectureContext`] rather than by name, so that
//! identity comparison is an integer compare.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the ID as a `usize` for array indexing.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a block type in the architecture's type table.
    BlockTypeId
);

define_id!(
    /// Opaque, copyable ID for a node in the routing resource graph.
    RrgNodeId
);
