//! Opaque ID newtypes for place-and-route entities.
//!
//! [`GlobalBlockId`], [`NetId`], and [`ConnectionId`] are thin `u32` wrappers
//! used as arena indices into the [`crate::circuit::Circuit`]. They are
//! `Copy`, `Hash`, and `Serialize`/`Deserialize`.

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

            /// Returns the raw index as a `usize`, for indexing into backing vectors.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a global block (an IO or CLB/hardblock instance).
    GlobalBlockId
);

define_id!(
    /// Opaque, copyable ID for a net.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a driver-to-sink connection within a net.
    ConnectionId
);
