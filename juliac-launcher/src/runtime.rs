//! Boundary between the launcher and the embedded runtime.

use std::ffi::{CStr, CString};

use crate::args::Arguments;
use crate::error::LaunchError;

#[cfg(feature = "julia")]
pub mod julia;

include!(concat!(env!("OUT_DIR"), "/image.rs"));

/// Name of the precompiled image loaded by the runtime at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile(CString);

impl ImageFile {
    /// Wraps an image file name
    pub fn new(name: &str) -> Result<Self, LaunchError> {
        CString::new(name)
            .map(Self)
            .map_err(|_| LaunchError::ImageFile { name: name.into() })
    }

    /// The image selected when the launcher was built
    pub fn builtin() -> Result<Self, LaunchError> {
        Self::new(IMAGE_FILE)
    }

    /// The name as a C string
    pub fn as_c_str(&self) -> &CStr {
        &self.0
    }
}

/// The embedded language runtime, seen through the handful of C API entry points the launcher needs.
///
/// Values are opaque handles owned by the runtime.
pub trait Runtime {
    /// Handle to a runtime value (a string, a list, ...)
    type Value: Copy;

    /// Initializes the support library (locale, standard streams). Called before anything else.
    fn init_support(&mut self);

    /// Boots the runtime from a precompiled image
    fn initialize(&mut self, image: &ImageFile) -> Result<(), LaunchError>;

    /// Exposes the complete argument vector, argument 0 included
    fn set_raw_args(&mut self, args: &Arguments) -> Result<(), LaunchError>;

    /// Reads a global of the base module
    fn global(&mut self, name: &CStr) -> Result<Self::Value, LaunchError>;

    /// Writes a global of the base module
    fn set_global(&mut self, name: &CStr, value: Self::Value) -> Result<(), LaunchError>;

    /// Builds a native string from raw bytes
    fn make_string(&mut self, bytes: &CStr) -> Result<Self::Value, LaunchError>;

    /// Appends `value` at the end of `list`
    fn append_to_list(&mut self, list: Self::Value, value: Self::Value)
    -> Result<(), LaunchError>;

    /// Runs finalizers, flushes buffers and releases the runtime
    fn shutdown(&mut self, code: i32);
}

impl<R: Runtime + ?Sized> Runtime for &mut R {
    type Value = R::Value;

    fn init_support(&mut self) {
        (**self).init_support();
    }

    fn initialize(&mut self, image: &ImageFile) -> Result<(), LaunchError> {
        (**self).initialize(image)
    }

    fn set_raw_args(&mut self, args: &Arguments) -> Result<(), LaunchError> {
        (**self).set_raw_args(args)
    }

    fn global(&mut self, name: &CStr) -> Result<Self::Value, LaunchError> {
        (**self).global(name)
    }

    fn set_global(&mut self, name: &CStr, value: Self::Value) -> Result<(), LaunchError> {
        (**self).set_global(name, value)
    }

    fn make_string(&mut self, bytes: &CStr) -> Result<Self::Value, LaunchError> {
        (**self).make_string(bytes)
    }

    fn append_to_list(
        &mut self,
        list: Self::Value,
        value: Self::Value,
    ) -> Result<(), LaunchError> {
        (**self).append_to_list(list, value)
    }

    fn shutdown(&mut self, code: i32) {
        (**self).shutdown(code);
    }
}

#[cfg(test)]
mod tests {
    use super::{IMAGE_FILE, ImageFile};
    use crate::error::LaunchError;

    #[test]
    fn builtin_image_is_valid() {
        let image = ImageFile::builtin().unwrap();
        assert_eq!(image.as_c_str().to_str().unwrap(), IMAGE_FILE);
        assert!(!IMAGE_FILE.is_empty());
    }

    #[test]
    fn nul_in_name_is_rejected() {
        assert!(matches!(
            ImageFile::new("sys\0.so"),
            Err(LaunchError::ImageFile { .. })
        ));
    }
}
