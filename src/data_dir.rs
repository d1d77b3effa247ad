use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "DISCOVERY_DATA_DIR";
const APP_NAME: &str = "discovery";

/// Where profiles, history and the default catalog live.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Use `explicit` (the `--data-dir` flag) when given, else
    /// [`default_root`](Self::default_root). The directory is created if
    /// missing.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::default_root()?,
        };
        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;
        Ok(Self { root })
    }

    /// `$DISCOVERY_DATA_DIR` if set and non-empty, otherwise
    /// `$XDG_DATA_HOME/discovery`.
    pub fn default_root() -> Result<PathBuf> {
        if let Some(dir) =
            std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty())
        {
            return Ok(PathBuf::from(dir));
        }
        xdg::BaseDirectories::with_prefix(APP_NAME)
            .get_data_home()
            .ok_or_else(|| {
                Error::Config(format!("no XDG data home for {APP_NAME}"))
            })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_db(&self) -> PathBuf {
        self.root.join(format!("{APP_NAME}.redb"))
    }

    /// Default catalog location when none is given explicitly.
    pub fn catalog_file(&self) -> PathBuf {
        self.root.join("catalog.json")
    }
}
