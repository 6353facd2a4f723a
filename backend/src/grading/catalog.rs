// src/grading/catalog.rs

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use thiserror::Error;
use validator::Validate;

use crate::models::exam::ExamConfig;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("exam '{id}' is invalid: {source}")]
    Invalid {
        id: String,
        #[source]
        source: validator::ValidationErrors,
    },
    #[error("exam id '{0}' is defined more than once")]
    Duplicate(String),
}

/// Immutable set of exams, keyed by exam id.
#[derive(Debug, Default)]
pub struct ExamCatalog {
    exams: BTreeMap<String, Arc<ExamConfig>>,
}

impl ExamCatalog {
    /// Validates and indexes the given exams.
    pub fn from_exams(exams: Vec<ExamConfig>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for exam in exams {
            exam.validate().map_err(|source| CatalogError::Invalid {
                id: exam.id.clone(),
                source,
            })?;
            if catalog.exams.contains_key(&exam.id) {
                return Err(CatalogError::Duplicate(exam.id));
            }
            catalog.exams.insert(exam.id.clone(), Arc::new(exam));
        }
        Ok(catalog)
    }

    /// Loads every `*.json` file in `dir`, each holding one exam.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let io_err = |source| CatalogError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut paths = fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>();
        paths.sort();

        let mut exams = Vec::with_capacity(paths.len());
        for path in paths {
            let display = path.display().to_string();
            let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: display.clone(),
                source,
            })?;
            let exam: ExamConfig =
                serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                    path: display,
                    source,
                })?;
            exams.push(exam);
        }

        Self::from_exams(exams)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ExamConfig>> {
        self.exams.get(id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExamConfig>> {
        self.exams.values()
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }
}
