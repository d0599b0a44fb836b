//! Table lifecycle

/// Lifecycle state of a table record
///
/// ```text
/// Unloaded --read--> Loaded --set--> Dirty --write--> Loaded
///                      |                                  |
///                      +------------refresh-----------> Expired --read--> Loaded
/// ```
///
/// A setter also enters `Dirty` from `Unloaded` or `Expired`; the record keeps
/// that underlying state and still reads before serving unchanged fields.
/// A failed read or write never changes the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableState {
    /// Buffer allocated, no valid data
    #[default]
    Unloaded,
    /// Buffer populated from the device, fields readable
    Loaded,
    /// A field was modified locally and not yet written back
    Dirty,
    /// Explicitly invalidated; the next access re-fetches
    Expired,
}

impl TableState {
    /// Whether the buffer holds an image read from the device
    ///
    /// `Dirty` only says changes are pending, so it is asked of the state the
    /// changes were made over.
    pub fn is_loaded(&self) -> bool {
        matches!(self, TableState::Loaded)
    }

    /// Whether the next access must fetch the table
    pub fn needs_read(&self) -> bool {
        !self.is_loaded()
    }
}
