//! Write a starter configuration file.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

/// Run the init-config command.
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::starter()
        .write(path)
        .context("Failed to write configuration")?;

    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_a_loadable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.toml");

        run(&path, false).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.schedules.len(), 1);
        assert!(!config.schedules[0].enabled);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        assert!(run(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        run(&path, true).unwrap();
        assert!(Config::from_file(&path).is_ok());
    }
}
