//! X-Plane 12 installation lookup.
//!
//! The simulator records its install locations in a reference file, one
//! path per line. The first existing path is used to place the default
//! ground-ops menu file.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Menu file location relative to the installation root.
pub const MENU_FILE_RELATIVE: &str = "Output/gsx/menu";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Could not determine home directory")]
    NoHomeDirectory,

    #[error("X-Plane 12 install reference not found at {0}")]
    ReferenceNotFound(PathBuf),
}

/// Location of the install reference file.
///
/// - Linux and macOS: `~/.x-plane/x-plane_install_12.txt`
/// - Windows: `%LOCALAPPDATA%\x-plane\x-plane_install_12.txt`
pub fn install_reference_path() -> Result<PathBuf, InstallError> {
    #[cfg(target_os = "windows")]
    {
        let local_app_data =
            std::env::var("LOCALAPPDATA").map_err(|_| InstallError::NoHomeDirectory)?;
        Ok(PathBuf::from(local_app_data)
            .join("x-plane")
            .join("x-plane_install_12.txt"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().ok_or(InstallError::NoHomeDirectory)?;
        Ok(home.join(".x-plane").join("x-plane_install_12.txt"))
    }
}

/// Existing installation roots listed in a reference file.
pub fn installs_from_reference(reference: &Path) -> Vec<PathBuf> {
    let Ok(contents) = fs::read_to_string(reference) else {
        return Vec::new();
    };
    contents
        .lines()
        .map(|line| PathBuf::from(line.trim()))
        .filter(|path| !path.as_os_str().is_empty() && path.exists())
        .collect()
}

/// First existing X-Plane 12 installation.
pub fn detect_xplane_install() -> Result<PathBuf, InstallError> {
    let reference = install_reference_path()?;
    installs_from_reference(&reference)
        .into_iter()
        .next()
        .ok_or(InstallError::ReferenceNotFound(reference))
}

/// Menu file of an installation.
pub fn menu_file_for(install: &Path) -> PathBuf {
    install.join(MENU_FILE_RELATIVE)
}

/// Menu file of the detected installation, if there is one.
pub fn default_menu_file() -> Option<PathBuf> {
    detect_xplane_install().ok().map(|root| menu_file_for(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reference_path_name() {
        let path = install_reference_path().unwrap();
        assert!(path.to_string_lossy().ends_with("x-plane_install_12.txt"));
    }

    #[test]
    fn test_reference_lists_existing_installs_only() {
        let dir = TempDir::new().unwrap();
        let install = dir.path().join("X-Plane 12");
        std::fs::create_dir(&install).unwrap();
        let reference = dir.path().join("x-plane_install_12.txt");
        std::fs::write(
            &reference,
            format!("{}\n/does/not/exist\n\n", install.display()),
        )
        .unwrap();

        assert_eq!(installs_from_reference(&reference), vec![install]);
    }

    #[test]
    fn test_missing_reference_is_empty() {
        assert!(installs_from_reference(Path::new("/nonexistent/ref.txt")).is_empty());
    }

    #[test]
    fn test_menu_file_under_install() {
        let path = menu_file_for(Path::new("/games/X-Plane 12"));
        assert_eq!(path, PathBuf::from("/games/X-Plane 12/Output/gsx/menu"));
    }
}
