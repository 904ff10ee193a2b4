use std::io::BufRead;
use std::process::Command;

use anyhow::Context;

/// Wrapper around the `rustc` command
pub struct Rustc;

impl Rustc {
    /// `cargo juliac` runs outside of any package, so `rustc` is invoked directly rather than through `cargo rustc`
    fn command() -> Command {
        Command::new(std::env::var_os("RUSTC").unwrap_or_else(|| "rustc".into()))
    }

    /// Returns the default target that rustc uses to build if none is provided (the host)
    pub fn default_target() -> anyhow::Result<String> {
        let version = Self::command()
            .arg("-vV")
            .output()
            .context("Failed to execute `rustc -vV`")?;

        Self::host_from_version(&version.stdout)
            .ok_or_else(|| anyhow::anyhow!("Failed to detect default target"))
    }

    fn host_from_version(verbose_version: &[u8]) -> Option<String> {
        verbose_version
            .lines()
            .map_while(Result::ok)
            .find_map(|line| line.strip_prefix("host: ").map(ToOwned::to_owned))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use target_lexicon::Triple;

    use super::Rustc;

    #[test]
    fn test_default_target_valid() {
        let target = Rustc::default_target().unwrap();
        Triple::from_str(&target).unwrap();
    }

    #[test]
    fn host_line_is_extracted() {
        let output = b"rustc 1.85.0 (4d91de4e4 2025-02-17)\nbinary: rustc\nhost: aarch64-apple-darwin\nrelease: 1.85.0\n";
        assert_eq!(
            Rustc::host_from_version(output).as_deref(),
            Some("aarch64-apple-darwin")
        );
        assert_eq!(Rustc::host_from_version(b"rustc 1.85.0\n"), None);
    }
}
