use std::path::PathBuf;

use escargot::CommandMessages;
use escargot::error::CargoError;

pub trait CommandMessagesExt {
    /// Finds the launcher executable in the stream of messages from Cargo while forwarding compiler diagnostics.
    fn find_executable(self) -> Result<Option<PathBuf>, CargoError>;
}

impl CommandMessagesExt for CommandMessages {
    fn find_executable(self) -> Result<Option<PathBuf>, CargoError> {
        let mut executable = None;
        for message in self {
            match message?.decode()? {
                escargot::format::Message::CompilerArtifact(artifact) => {
                    if let Some(path) = artifact.executable {
                        executable = Some(path.into_owned());
                    }
                }
                escargot::format::Message::CompilerMessage(e) => {
                    if let Some(rendered) = e.message.rendered {
                        eprint!("{rendered}");
                    }
                }
                _ => {
                    // Ignored
                }
            }
        }

        Ok(executable)
    }
}
