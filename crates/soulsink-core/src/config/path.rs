//! Configuration path types for multi-file loading.

use std::path::{Path, PathBuf};

use clap::Args;

/// A configuration source - either a single file or a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigPath {
    /// A single configuration file.
    File(PathBuf),
    /// A directory whose YAML files are loaded in name order.
    Dir(PathBuf),
}

impl ConfigPath {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self::Dir(path.into())
    }
}

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

/// Config location flags shared by the soulsink binaries.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to configuration file (can be specified multiple times)
    #[arg(short, long)]
    pub config: Vec<PathBuf>,

    /// Path to configuration directory (can be specified multiple times)
    #[arg(short = 'C', long = "config-dir")]
    pub config_dirs: Vec<PathBuf>,
}

impl ConfigArgs {
    /// Files first, then directories, each group in command-line order.
    pub fn config_paths(&self) -> Vec<ConfigPath> {
        self.config
            .iter()
            .map(ConfigPath::file)
            .chain(self.config_dirs.iter().map(ConfigPath::dir))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yaml_file() {
        assert!(is_yaml_file(Path::new("a/sink.yaml")));
        assert!(is_yaml_file(Path::new("sink.yml")));
        assert!(!is_yaml_file(Path::new("sink.json")));
        assert!(!is_yaml_file(Path::new("sink")));
    }

    #[test]
    fn test_config_paths_files_before_dirs() {
        let args = ConfigArgs {
            config: vec![PathBuf::from("b.yaml"), PathBuf::from("a.yaml")],
            config_dirs: vec![PathBuf::from("conf.d")],
        };
        assert_eq!(
            args.config_paths(),
            vec![
                ConfigPath::file("b.yaml"),
                ConfigPath::file("a.yaml"),
                ConfigPath::dir("conf.d"),
            ]
        );
    }
}
