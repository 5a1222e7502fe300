//! Source file abstraction consumed by the sensor.
//!
//! The sensor never touches the disk directly. It asks a [`FileSystem`] for
//! the files of one [`Language`] and reads each [`InputFile`] through
//! [`InputFile::open`]. Handles are shared as `Rc<dyn InputFile>`; the
//! allocation is the file's identity, so callers group by handle rather than
//! by path (see [`same_file`]).
//!
//! [`ProjectFileSystem`] indexes a project directory on disk.
//! [`MemoryFileSystem`] holds files built in memory, for embedders and tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use walkdir::{DirEntry, WalkDir};

/// Build output directories skipped at the project root.
const SKIPPED_DIRS: &[&str] = &["target", "build", "node_modules"];

/// Source languages the sensor can be restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Kotlin,
    Java,
}

impl Language {
    /// Language key used in rule repositories and configuration.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Kotlin => "kotlin",
            Self::Java => "java",
        }
    }

    /// File extensions belonging to this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Kotlin => &["kt", "kts"],
            Self::Java => &["java"],
        }
    }

    /// Detect the language of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        [Self::Kotlin, Self::Java]
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kotlin" | "kt" => Ok(Self::Kotlin),
            "java" => Ok(Self::Java),
            _ => anyhow::bail!("Invalid language '{}'. Valid values: kotlin, java", s),
        }
    }
}

/// A source file known to the host.
pub trait InputFile: fmt::Debug {
    /// Bare file name, e.g. `FooTest.kt`.
    fn filename(&self) -> &str;

    /// Path relative to the project root, with `/` separators.
    fn relative_path(&self) -> &str;

    fn language(&self) -> Option<Language>;

    /// Open the file contents for line-by-line reading.
    fn open(&self) -> io::Result<Box<dyn BufRead + '_>>;
}

/// Anything that can enumerate the project's source files.
pub trait FileSystem {
    /// Files of `language`, in the host's iteration order.
    fn input_files(&self, language: Language) -> Vec<Rc<dyn InputFile>>;
}

/// Identity comparison of two file handles.
///
/// Compares allocations only, so two handles for the same path are distinct.
pub fn same_file(a: &Rc<dyn InputFile>, b: &Rc<dyn InputFile>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// A file on disk.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    path: PathBuf,
    relative_path: String,
    filename: String,
    language: Option<Language>,
}

impl ProjectFile {
    /// Describe `path`, which must live under `base_dir`.
    pub fn new(base_dir: &Path, path: &Path) -> Self {
        let relative = path.strip_prefix(base_dir).unwrap_or(path);
        let relative_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            relative_path,
            filename,
            language: Language::from_path(path),
        }
    }
}

impl InputFile for ProjectFile {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn language(&self) -> Option<Language> {
        self.language
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + '_>> {
        let file = std::fs::File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A file whose content is held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    relative_path: String,
    filename: String,
    language: Option<Language>,
    contents: String,
}

impl InMemoryFile {
    pub fn new(relative_path: impl Into<String>, contents: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let filename = relative_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let language = Language::from_path(Path::new(&filename));
        Self {
            relative_path,
            filename,
            language,
            contents: contents.into(),
        }
    }
}

impl InputFile for InMemoryFile {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn language(&self) -> Option<Language> {
        self.language
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(Cursor::new(self.contents.as_bytes())))
    }
}

/// Files of a project directory, indexed once at construction.
#[derive(Debug)]
pub struct ProjectFileSystem {
    files: Vec<Rc<dyn InputFile>>,
}

impl ProjectFileSystem {
    /// Walk `base_dir`, skipping hidden entries and the build output
    /// directories directly under it. Entries that can't be read are logged
    /// and skipped.
    pub fn index(base_dir: &Path) -> Result<Self> {
        let base_dir = base_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve project directory: {}", base_dir.display()))?;

        let mut files: Vec<Rc<dyn InputFile>> = Vec::new();
        for entry in WalkDir::new(&base_dir)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to read directory entry, skipping");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let file = ProjectFile::new(&base_dir, entry.path());
            if file.language().is_some() {
                files.push(Rc::new(file));
            }
        }

        tracing::debug!(
            base_dir = %base_dir.display(),
            files = files.len(),
            "Indexed project source files"
        );

        Ok(Self { files })
    }
}

impl FileSystem for ProjectFileSystem {
    fn input_files(&self, language: Language) -> Vec<Rc<dyn InputFile>> {
        filter_language(&self.files, language)
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.depth() == 1 && entry.file_type().is_dir() && SKIPPED_DIRS.contains(&&*name)
}

fn filter_language(files: &[Rc<dyn InputFile>], language: Language) -> Vec<Rc<dyn InputFile>> {
    files
        .iter()
        .filter(|file| file.language() == Some(language))
        .cloned()
        .collect()
}

/// An in-memory file set, iterated in insertion order.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Vec<Rc<dyn InputFile>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and return its handle.
    pub fn add(&mut self, file: impl InputFile + 'static) -> Rc<dyn InputFile> {
        let handle: Rc<dyn InputFile> = Rc::new(file);
        self.files.push(Rc::clone(&handle));
        handle
    }

    pub fn with_file(mut self, relative_path: &str, contents: &str) -> Self {
        self.add(InMemoryFile::new(relative_path, contents));
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn input_files(&self, language: Language) -> Vec<Rc<dyn InputFile>> {
        filter_language(&self.files, language)
    }
}
