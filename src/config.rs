//! Project-level build configuration (§2.11's ambient stack item):
//! which source file to assemble, which MCU to target, where to write
//! the `.hex`/`.lst` output. Declared with `serde` + `toml`, in the
//! style of the teacher's `config::project`/`config::target` pair, but
//! backed by real deserialization rather than hand-rolled line parsing
//! since this crate's config shape is simple enough not to need it.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// `noccavr.toml` project configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    #[serde(default)]
    pub build: BuildSection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    /// Path to the entry assembly source, relative to the config file.
    pub entry: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BuildSection {
    /// MCU target name, e.g. "ATMEGA328". Overridable by `--target`;
    /// if neither is set, codegen defaults to ATMEGA328 with a warning
    /// (scenario 6, §8).
    pub target: Option<String>,
    /// Output directory for `.hex`/`.lst` files, default `.`
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".")
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(format!("cannot read '{}': {e}", path.display()), Span::dummy())
        })?;
        toml::from_str(&content).map_err(|e| {
            Diagnostic::error(format!("invalid config '{}': {e}", path.display()), Span::dummy())
        })
    }

    /// Resolve the entry source path relative to the config file's directory.
    pub fn entry_path(&self, config_path: &Path) -> PathBuf {
        let root = config_path.parent().unwrap_or_else(|| Path::new("."));
        root.join(&self.project.entry)
    }

    /// Search `start_dir` and its ancestors for `noccavr.toml`.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join("noccavr.toml");
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noccavr.toml");
        fs::write(&path, "[project]\nname = \"blink\"\nentry = \"main.asm\"\n").unwrap();
        let cfg = ProjectConfig::load(&path).unwrap();
        assert_eq!(cfg.project.name, "blink");
        assert_eq!(cfg.build.out_dir, PathBuf::from("."));
        assert!(cfg.build.target.is_none());
    }

    #[test]
    fn loads_config_with_build_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noccavr.toml");
        fs::write(
            &path,
            "[project]\nname = \"blink\"\nentry = \"main.asm\"\n\n[build]\ntarget = \"ATMEGA1280\"\nout_dir = \"build\"\n",
        )
        .unwrap();
        let cfg = ProjectConfig::load(&path).unwrap();
        assert_eq!(cfg.build.target.as_deref(), Some("ATMEGA1280"));
        assert_eq!(cfg.build.out_dir, PathBuf::from("build"));
    }

    #[test]
    fn entry_path_resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noccavr.toml");
        fs::write(&path, "[project]\nname = \"x\"\nentry = \"src/main.asm\"\n").unwrap();
        let cfg = ProjectConfig::load(&path).unwrap();
        assert_eq!(cfg.entry_path(&path), dir.path().join("src/main.asm"));
    }

    #[test]
    fn rejects_missing_file() {
        assert!(ProjectConfig::load(Path::new("/nonexistent/noccavr.toml")).is_err());
    }
}
