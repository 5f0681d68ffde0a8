//! Tree collections searched by rules
//!
//! A [`Treebank`] holds bracketed trees loaded from named files under a
//! folder. Loading is best effort: a file that cannot be opened or a tree that
//! cannot be parsed is reported and skipped. The total number of trees is
//! capped; reaching the cap stops loading and marks the report truncated.
//!
//! A [`DataSet`] pairs a development and a test treebank and picks the ones a
//! search should run over.

use crate::config::EngineConfig;
use crate::error::{CorpusError, SearchError, TreeParseError};
use crate::ptb::TreeReader;
use crate::tree::Tree;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum number of trees loaded into one treebank
pub const DEFAULT_TREE_LIMIT: usize = 30000;

/// Default file extension for tree files
pub const DEFAULT_TREE_EXTENSION: &str = "stp";

/// Ordered source of trees for a search
pub trait Corpus {
    fn count(&self) -> usize;

    fn is_loaded(&self) -> bool;

    /// Snapshot of the trees in corpus order
    fn trees(&self) -> Vec<Arc<Tree>>;
}

impl Corpus for [Arc<Tree>] {
    fn count(&self) -> usize {
        self.len()
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn trees(&self) -> Vec<Arc<Tree>> {
        self.to_vec()
    }
}

impl Corpus for Vec<Arc<Tree>> {
    fn count(&self) -> usize {
        self.len()
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn trees(&self) -> Vec<Arc<Tree>> {
        self.clone()
    }
}

/// Outcome of one load call
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Files opened successfully
    pub files: usize,
    /// Trees added
    pub trees: usize,
    /// Per-file failures; loading carried on past each of them
    pub errors: Vec<CorpusError>,
    /// The tree limit was reached and later trees were not read
    pub truncated: bool,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.truncated
    }
}

/// In-memory collection of parse trees
#[derive(Debug, Clone)]
pub struct Treebank {
    trees: Vec<Arc<Tree>>,
    limit: usize,
    loaded: bool,
}

impl Default for Treebank {
    fn default() -> Self {
        Self::with_limit(DEFAULT_TREE_LIMIT)
    }
}

impl Treebank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            trees: Vec::new(),
            limit,
            loaded: false,
        }
    }

    /// Parse every tree in `text`; any malformed tree is an error
    pub fn from_string(text: &str) -> Result<Self, TreeParseError> {
        let mut treebank = Self::new();
        for tree in TreeReader::from_string(text) {
            treebank.trees.push(Arc::new(tree?));
        }
        treebank.loaded = true;
        Ok(treebank)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.trees.clear();
        self.loaded = false;
    }

    /// Replace the contents with the trees in `folder/<name>.<extension>`
    /// for each name in the comma-separated `names`.
    ///
    /// An empty folder leaves the treebank untouched and unloaded.
    pub fn load_files(&mut self, folder: &Path, names: &str, extension: &str) -> LoadReport {
        if folder.as_os_str().is_empty() {
            return LoadReport::default();
        }
        let paths: Vec<PathBuf> = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                if extension.is_empty() {
                    folder.join(name)
                } else {
                    folder.join(format!("{name}.{extension}"))
                }
            })
            .collect();
        self.load_paths(&paths)
    }

    /// Replace the contents with the trees in every file matching `pattern`,
    /// in sorted path order
    pub fn load_glob(&mut self, pattern: &str) -> Result<LoadReport, CorpusError> {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?.filter_map(Result::ok).collect();
        paths.sort();
        Ok(self.load_paths(&paths))
    }

    /// Replace the contents with the trees in `paths`, in order
    pub fn load_paths(&mut self, paths: &[PathBuf]) -> LoadReport {
        self.clear();
        let mut report = LoadReport::default();

        'files: for path in paths {
            let reader = match TreeReader::from_file(path) {
                Ok(reader) => reader,
                Err(source) => {
                    tracing::warn!(path = %path.display(), error = %source, "skipping tree file");
                    report.errors.push(CorpusError::FileOpen {
                        path: path.clone(),
                        source,
                    });
                    continue;
                }
            };
            report.files += 1;

            for result in reader {
                if self.trees.len() >= self.limit {
                    tracing::warn!(limit = self.limit, path = %path.display(), "tree limit reached");
                    report.truncated = true;
                    break 'files;
                }
                match result {
                    Ok(tree) => self.trees.push(Arc::new(tree)),
                    Err(source) => {
                        tracing::warn!(path = %path.display(), error = %source, "skipping malformed tree");
                        report.errors.push(CorpusError::Parse {
                            path: path.clone(),
                            source,
                        });
                    }
                }
            }
            tracing::debug!(path = %path.display(), total = self.trees.len(), "loaded tree file");
        }

        report.trees = self.trees.len();
        self.loaded = true;
        report
    }
}

impl Corpus for Treebank {
    fn count(&self) -> usize {
        self.trees.len()
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn trees(&self) -> Vec<Arc<Tree>> {
        self.trees.clone()
    }
}

/// Development and test treebanks
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub dev: Treebank,
    pub test: Treebank,
}

/// Load reports for both halves of a [`DataSet`]
#[derive(Debug, Default)]
pub struct DataSetReport {
    pub dev: LoadReport,
    pub test: LoadReport,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load both treebanks from the folder and file lists in `config`
    pub fn load(config: &EngineConfig) -> (Self, DataSetReport) {
        let mut data = Self {
            dev: Treebank::with_limit(config.tree_limit),
            test: Treebank::with_limit(config.tree_limit),
        };
        let report = DataSetReport {
            dev: data
                .dev
                .load_files(&config.tree_folder, &config.dev_files, &config.tree_extension),
            test: data
                .test
                .load_files(&config.tree_folder, &config.test_files, &config.tree_extension),
        };
        tracing::debug!(dev = data.dev.count(), test = data.test.count(), "loaded data set");
        (data, report)
    }

    /// Trees of the selected and loaded sets, test set first
    pub fn trees(&self, use_dev: bool, use_test: bool) -> Result<Vec<Arc<Tree>>, SearchError> {
        if !use_dev && !use_test {
            return Err(SearchError::NoData);
        }
        let mut trees = Vec::new();
        if use_test && self.test.is_loaded() {
            trees.extend(self.test.trees());
        }
        if use_dev && self.dev.is_loaded() {
            trees.extend(self.dev.trees());
        }
        Ok(trees)
    }
}
