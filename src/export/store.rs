//! Filesystem bundle writer.
//!
//! The storage collaborator of the recording core: writes an export bundle
//! into a directory layout of `map.json`, `chains/<id>.json`,
//! `sessions/<id>.json`, and `schemas/<id>.json` under
//! `<base>/<export name>/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::bundle::BundleContent;

/// Filesystem failure while writing a bundle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes export bundles under a base directory.
#[derive(Debug, Clone)]
pub struct BundleStore {
    base_dir: PathBuf,
}

impl BundleStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Write a bundle as `<base>/<export_name>/` and return the export path.
    pub fn write_bundle(
        &self,
        bundle: &BundleContent,
        export_name: &str,
    ) -> Result<PathBuf, StoreError> {
        let export_dir = self.base_dir.join(export_name);
        create_dir(&export_dir)?;

        write_file(&export_dir.join("map.json"), &bundle.map_json)?;

        let chains_dir = export_dir.join("chains");
        create_dir(&chains_dir)?;
        for (id, json) in &bundle.chains_json {
            write_file(&chains_dir.join(format!("{}.json", id)), json)?;
        }

        let sessions_dir = export_dir.join("sessions");
        create_dir(&sessions_dir)?;
        for (id, json) in &bundle.sessions_json {
            write_file(&sessions_dir.join(format!("{}.json", id)), json)?;
        }

        let schemas_dir = export_dir.join("schemas");
        create_dir(&schemas_dir)?;
        for (id, json) in &bundle.schemas_json {
            write_file(&schemas_dir.join(format!("{}.json", id)), json)?;
        }

        log::info!(
            "BUNDLE_WRITTEN path={} chains={} sessions={} schemas={}",
            export_dir.display(),
            bundle.chains_json.len(),
            bundle.sessions_json.len(),
            bundle.schemas_json.len()
        );

        Ok(export_dir)
    }

    /// Names of the exports present under the base directory. Missing or
    /// unreadable base directories yield an empty list.
    pub fn list_exports(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    /// Path an export of the given name would live at.
    pub fn export_path(&self, export_name: &str) -> PathBuf {
        self.base_dir.join(export_name)
    }
}

fn create_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|source| StoreError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), StoreError> {
    fs::write(path, contents).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
