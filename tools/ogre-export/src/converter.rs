//! External XML ↔ binary converter process
//!
//! The converter is an opaque executable invoked synchronously:
//! - `converter file.mesh.xml` writes `file.mesh`
//! - `converter -q file.mesh` writes `file.mesh.xml`
//!
//! Callers turn every [`ConvertError`] into a warning; a missing or failing
//! converter never aborts a pass.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Program name looked up on PATH when nothing is configured.
pub const DEFAULT_CONVERTER: &str = "OgreXMLConverter";

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("XML converter not found: {0}")]
    NotFound(String),

    #[error("failed to run {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} exited with {status} while converting {input:?}")]
    Failed {
        path: PathBuf,
        input: PathBuf,
        status: ExitStatus,
    },

    #[error("converter finished but {0:?} was not produced")]
    MissingOutput(PathBuf),
}

/// A located converter executable.
#[derive(Debug, Clone)]
pub struct XmlConverter {
    path: PathBuf,
}

impl XmlConverter {
    /// Resolve the converter.
    ///
    /// An explicit path is used as-is, a bare program name is looked up on
    /// PATH, and with nothing configured [`DEFAULT_CONVERTER`] is tried on
    /// PATH and next to this executable.
    pub fn locate(configured: Option<&Path>) -> Result<Self, ConvertError> {
        match configured {
            Some(path) if is_bare_name(path) => which::which(path)
                .map(|path| Self { path })
                .map_err(|_| ConvertError::NotFound(path.display().to_string())),
            Some(path) => {
                if path.is_file() {
                    Ok(Self {
                        path: path.to_path_buf(),
                    })
                } else {
                    Err(ConvertError::NotFound(path.display().to_string()))
                }
            }
            None => {
                if let Ok(path) = which::which(DEFAULT_CONVERTER) {
                    return Ok(Self { path });
                }
                // Distributed bundles ship the converter next to the tool
                let exe_name = if cfg!(windows) {
                    "OgreXMLConverter.exe"
                } else {
                    DEFAULT_CONVERTER
                };
                if let Some(sibling) = std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(|dir| dir.join(exe_name)))
                    .filter(|p| p.is_file())
                {
                    return Ok(Self { path: sibling });
                }
                Err(ConvertError::NotFound(DEFAULT_CONVERTER.to_string()))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert an XML document to binary. Returns the binary's path.
    pub fn to_binary(&self, xml: &Path) -> Result<PathBuf, ConvertError> {
        let output = strip_xml_suffix(xml);
        self.run(&[xml.as_os_str()], xml, output)
    }

    /// Convert a binary file to XML. Returns the XML document's path.
    pub fn to_xml(&self, binary: &Path) -> Result<PathBuf, ConvertError> {
        let output = xml_sibling(binary);
        self.run(&[OsStr::new("-q"), binary.as_os_str()], binary, output)
    }

    fn run(&self, args: &[&OsStr], input: &Path, output: PathBuf) -> Result<PathBuf, ConvertError> {
        tracing::info!("Running {:?} on {:?}", self.path, input);
        let result = Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|source| ConvertError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        if !result.stdout.is_empty() {
            tracing::debug!("{}", String::from_utf8_lossy(&result.stdout).trim_end());
        }
        if !result.status.success() {
            tracing::debug!("{}", String::from_utf8_lossy(&result.stderr).trim_end());
            return Err(ConvertError::Failed {
                path: self.path.clone(),
                input: input.to_path_buf(),
                status: result.status,
            });
        }
        if !output.is_file() {
            return Err(ConvertError::MissingOutput(output));
        }
        Ok(output)
    }
}

fn is_bare_name(path: &Path) -> bool {
    path.components().count() == 1 && !path.is_absolute()
}

/// `hero.mesh.xml` → `hero.mesh`; paths without the suffix are unchanged.
pub fn strip_xml_suffix(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("xml") => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// `hero.mesh` → `hero.mesh.xml`
pub fn xml_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".xml");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_helpers() {
        assert_eq!(strip_xml_suffix(Path::new("a/hero.mesh.xml")), PathBuf::from("a/hero.mesh"));
        assert_eq!(strip_xml_suffix(Path::new("hero.mesh")), PathBuf::from("hero.mesh"));
        assert_eq!(xml_sibling(Path::new("a/hero.skeleton")), PathBuf::from("a/hero.skeleton.xml"));
    }

    #[test]
    fn test_missing_explicit_path_is_not_found() {
        let err = XmlConverter::locate(Some(Path::new("/nonexistent/dir/OgreXMLConverter"))).unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(_)));
    }

    #[test]
    fn test_missing_program_name_is_not_found() {
        let err = XmlConverter::locate(Some(Path::new("definitely-not-an-ogre-converter"))).unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(_)));
    }

    #[cfg(unix)]
    fn fake_converter(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-converter");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_both_directions_with_stub_process() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_converter(
            dir.path(),
            r#"if [ "$1" = "-q" ]; then cp "$2" "$2.xml"; else cp "$1" "${1%.xml}"; fi"#,
        );
        let converter = XmlConverter::locate(Some(&script)).unwrap();

        let xml = dir.path().join("box.mesh.xml");
        std::fs::write(&xml, "<mesh/>").unwrap();
        let binary = converter.to_binary(&xml).unwrap();
        assert_eq!(binary, dir.path().join("box.mesh"));
        assert!(binary.is_file());

        std::fs::remove_file(&xml).unwrap();
        let back = converter.to_xml(&binary).unwrap();
        assert_eq!(back, xml);
        assert_eq!(std::fs::read_to_string(back).unwrap(), "<mesh/>");
    }

    #[cfg(unix)]
    #[test]
    fn test_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let failing = XmlConverter::locate(Some(&fake_converter(dir.path(), "exit 3"))).unwrap();
        let input = dir.path().join("a.mesh.xml");
        assert!(matches!(failing.to_binary(&input), Err(ConvertError::Failed { .. })));

        let silent = dir.path().join("quiet");
        std::fs::create_dir(&silent).unwrap();
        let noop = XmlConverter::locate(Some(&fake_converter(&silent, "exit 0"))).unwrap();
        assert!(matches!(noop.to_binary(&input), Err(ConvertError::MissingOutput(_))));
    }
}
