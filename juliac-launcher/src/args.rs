use std::ffi::{CStr, CString};

use crate::error::LaunchError;

mod narrow;
mod wide;

pub use narrow::NarrowEntry;
pub use wide::WideEntry;

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        /// Entry convention of the current platform (`wmain` receives UTF-16 arguments)
        pub type PlatformEntry = WideEntry;
    } else {
        /// Entry convention of the current platform (`main` receives byte strings)
        pub type PlatformEntry = NarrowEntry;
    }
}

/// Process arguments normalized to NUL-terminated UTF-8 (or raw bytes on Unix), in their original order.
///
/// Argument 0 is kept: it names the invoked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(Vec<CString>);

impl Arguments {
    /// Argument 0, or an empty string when the OS supplied no argument at all
    pub fn program_file(&self) -> &CStr {
        self.0.first().map_or(c"", CString::as_c_str)
    }

    /// Every argument except argument 0
    pub fn user_args(&self) -> &[CString] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Iterates over all arguments, argument 0 included
    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.0.iter().map(CString::as_c_str)
    }

    /// Number of arguments, argument 0 included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the OS supplied no argument
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CString> for Arguments {
    fn from_iter<I: IntoIterator<Item = CString>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<CString>> for Arguments {
    fn from(args: Vec<CString>) -> Self {
        Self(args)
    }
}

/// A way the OS hands arguments to the process.
///
/// One implementation is selected at compile time (see [`PlatformEntry`]), so the
/// launcher sequence is the same on every platform.
pub trait ProcessEntry {
    /// Converts the raw arguments into [`Arguments`], failing on the first argument that cannot be converted.
    fn normalize(&self) -> Result<Arguments, LaunchError>;

    /// Adjusts the console attached to the process before the runtime starts.
    fn prepare_console(&self) {}
}

/// Number of entries announced by `argc`; negative counts are treated as empty.
fn arg_count(argc: i32) -> usize {
    usize::try_from(argc).unwrap_or_default()
}
