use std::ffi::OsStr;
use std::path::PathBuf;

use crate::error::LaunchError;

/// Name of the variable holding the runtime's data root
pub const DEPOT_PATH_VAR: &str = "JULIA_DEPOT_PATH";

/// Name of the variable holding the runtime's code load path
pub const LOAD_PATH_VAR: &str = "JULIA_LOAD_PATH";

/// Load path entry that resolves code from the active project
pub const ACTIVE_PROJECT: &str = "@";

/// The parts of the host process the launcher reads and writes.
pub trait Process {
    /// Absolute path of the running executable
    fn executable_path(&self) -> std::io::Result<PathBuf>;

    /// Installs an environment variable for the rest of the process lifetime
    fn set_var(&mut self, name: &str, value: &OsStr) -> Result<(), LaunchError>;
}

impl<P: Process + ?Sized> Process for &mut P {
    fn executable_path(&self) -> std::io::Result<PathBuf> {
        (**self).executable_path()
    }

    fn set_var(&mut self, name: &str, value: &OsStr) -> Result<(), LaunchError> {
        (**self).set_var(name, value)
    }
}

/// Checks that `name=value` can be stored in the process environment.
pub fn check_var(name: &str, value: &OsStr) -> Result<(), LaunchError> {
    let reason = if name.is_empty() {
        "empty name"
    } else if name.contains('=') {
        "name contains `=`"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else if value.as_encoded_bytes().contains(&0) {
        "value contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(LaunchError::Environment {
        name: name.to_owned(),
        reason,
    })
}

/// The real process: executable path from the OS and the process-wide environment.
#[derive(Debug)]
pub struct HostProcess(());

impl HostProcess {
    /// Gives access to the process environment.
    ///
    /// # Safety
    ///
    /// No other thread may read or write the environment while the returned value is used.
    pub unsafe fn new() -> Self {
        Self(())
    }
}

impl Process for HostProcess {
    fn executable_path(&self) -> std::io::Result<PathBuf> {
        std::env::current_exe()
    }

    fn set_var(&mut self, name: &str, value: &OsStr) -> Result<(), LaunchError> {
        check_var(name, value)?;

        // SAFETY: the launcher is the only thread (see `new`) and the variable was validated above.
        unsafe { std::env::set_var(name, value) };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::{ACTIVE_PROJECT, DEPOT_PATH_VAR, LOAD_PATH_VAR, check_var};
    use crate::error::LaunchError;

    #[test]
    fn launcher_variables_are_valid() {
        check_var(DEPOT_PATH_VAR, OsStr::new("/opt/app/")).unwrap();
        check_var(LOAD_PATH_VAR, OsStr::new(ACTIVE_PROJECT)).unwrap();
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["", "A=B", "A\0B"] {
            assert!(matches!(
                check_var(name, OsStr::new("x")),
                Err(LaunchError::Environment { .. })
            ));
        }
    }

    #[test]
    fn nul_in_value_is_rejected() {
        let error = check_var(DEPOT_PATH_VAR, OsStr::new("/opt\0/")).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Failed to set environment variable `JULIA_DEPOT_PATH`: value contains a NUL byte"
        );
    }
}
