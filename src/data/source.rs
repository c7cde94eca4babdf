use std::path::{Path, PathBuf};

/// Where the active dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A file the user picked explicitly.
    Upload(PathBuf),
    /// The bundled archive export next to the executable.
    Default(PathBuf),
}

impl DataSource {
    /// Resolve the active source. An uploaded file always wins; the default
    /// dataset is used only when requested and present on disk.
    pub fn resolve(upload: Option<&Path>, use_default: bool, default_path: &Path) -> Option<Self> {
        if let Some(path) = upload {
            return Some(DataSource::Upload(path.to_path_buf()));
        }
        if use_default && default_path.exists() {
            return Some(DataSource::Default(default_path.to_path_buf()));
        }
        None
    }

    pub fn path(&self) -> &Path {
        match self {
            DataSource::Upload(p) | DataSource::Default(p) => p,
        }
    }

    /// Short label for status lines.
    pub fn label(&self) -> String {
        let name = self
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string());
        match self {
            DataSource::Upload(_) => format!("{name} (uploaded)"),
            DataSource::Default(_) => format!("{name} (default NASA dataset)"),
        }
    }
}
