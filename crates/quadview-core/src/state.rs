//! Saved UI state.
//!
//! The host may ask for a snapshot at any time and hand it back when the window comes
//! back. The snapshot is the raw memory image of [`SavedState`]; there is no versioning.

use bytemuck::{Pod, Zeroable};

/// Fixed-size state carried across lifecycle transitions.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SavedState {
    /// Last pointer X coordinate.
    pub input_x: i32,
    /// Last pointer Y coordinate.
    pub input_y: i32,
    /// Frames drawn since the state was first created.
    pub frame_count: u64,
}

impl SavedState {
    /// Size of the snapshot blob in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Snapshot as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        bytemuck::bytes_of(self).to_vec()
    }

    /// Restore from a snapshot. Returns `None` if the blob has the wrong size.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }
}
