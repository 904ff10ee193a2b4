use std::error::Error;
use std::fmt;

/// A fatal condition that stops the launcher before the entry function runs.
///
/// None of these are recoverable: the top-level entry point turns them into a
/// diagnostic on stderr and a failure exit status.
#[derive(Debug)]
#[non_exhaustive]
pub enum LaunchError {
    /// Argument `index` could not be converted to UTF-8
    ArgumentEncoding {
        /// Position of the argument in the raw vector
        index: usize,
    },

    /// The raw vector holds a null pointer before `argc` entries were read
    MissingArgument {
        /// Position of the null entry
        index: usize,
    },

    /// The path of the running executable could not be queried
    ExecutablePath(std::io::Error),

    /// An environment variable could not be installed
    Environment {
        /// Name of the variable
        name: String,
        /// What was wrong with the name or the value
        reason: &'static str,
    },

    /// The image file name cannot be passed to the runtime
    ImageFile {
        /// The offending name
        name: String,
    },

    /// A runtime primitive returned no value
    Runtime {
        /// Name of the primitive that failed
        operation: &'static str,
    },

    /// The runtime was already claimed by another launcher in this process
    RuntimeClaimed,
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentEncoding { index } => {
                write!(f, "Failed to convert argument {index} to UTF-8")
            }
            Self::MissingArgument { index } => {
                write!(f, "Argument {index} is missing from the argument vector")
            }
            Self::ExecutablePath(_) => {
                f.write_str("Unexpected error while retrieving the executable path")
            }
            Self::Environment { name, reason } => {
                write!(f, "Failed to set environment variable `{name}`: {reason}")
            }
            Self::ImageFile { name } => write!(f, "Invalid image file name `{name}`"),
            Self::Runtime { operation } => write!(f, "Runtime call `{operation}` failed"),
            Self::RuntimeClaimed => f.write_str("The runtime has already been initialized"),
        }
    }
}

impl Error for LaunchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ExecutablePath(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LaunchError> for proc_exit::Exit {
    fn from(error: LaunchError) -> Self {
        let mut message = format!("fatal error: {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        proc_exit::Code::FAILURE.with_message(message)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::LaunchError;

    #[test]
    fn display_includes_argument_index() {
        let error = LaunchError::ArgumentEncoding { index: 3 };
        assert_eq!(error.to_string(), "Failed to convert argument 3 to UTF-8");
    }

    #[test]
    fn exit_is_a_failure() {
        let error = LaunchError::ExecutablePath(io::Error::from(io::ErrorKind::NotFound));
        let exit = proc_exit::Exit::from(error);
        assert_eq!(exit.code(), proc_exit::Code::FAILURE);
    }
}
