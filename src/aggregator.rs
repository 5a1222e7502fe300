//! Grouping of slow tests by the source file they belong to.
//!
//! A test is associated with the first file whose name contains its class
//! name. Groups are keyed by file handle identity and kept in first-seen
//! order, each holding its results in insertion order.

use std::rc::Rc;

use crate::fs::{InputFile, same_file};
use crate::report::TestResult;

/// One source file and the slow tests resolved to it.
#[derive(Debug)]
pub struct FileExecutionGroup {
    file: Rc<dyn InputFile>,
    results: Vec<TestResult>,
}

impl FileExecutionGroup {
    pub fn new(file: Rc<dyn InputFile>) -> Self {
        Self {
            file,
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn file(&self) -> &Rc<dyn InputFile> {
        &self.file
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }
}

/// First file whose name contains `class_name`, in iteration order.
pub fn find_file_by_name(files: &[Rc<dyn InputFile>], class_name: &str) -> Option<Rc<dyn InputFile>> {
    files
        .iter()
        .find(|file| file.filename().contains(class_name))
        .cloned()
}

/// The existing group for exactly this handle, if any.
pub fn find_group<'a>(
    groups: &'a mut [FileExecutionGroup],
    file: &Rc<dyn InputFile>,
) -> Option<&'a mut FileExecutionGroup> {
    groups.iter_mut().find(|group| same_file(&group.file, file))
}

/// Builds the ordered group list one result at a time.
#[derive(Debug, Default)]
pub struct FileAssociation {
    groups: Vec<FileExecutionGroup>,
    unresolved: usize,
}

impl FileAssociation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `result` against `files` and append it to its file's group.
    ///
    /// Returns `false` when no file matches; the result is dropped.
    pub fn associate(&mut self, files: &[Rc<dyn InputFile>], result: TestResult) -> bool {
        let Some(file) = find_file_by_name(files, result.class_name()) else {
            self.unresolved += 1;
            return false;
        };

        match find_group(&mut self.groups, &file) {
            Some(group) => group.add(result),
            None => {
                let mut group = FileExecutionGroup::new(file);
                group.add(result);
                self.groups.push(group);
            }
        }
        true
    }

    /// Number of results dropped for lack of a matching file.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    pub fn groups(&self) -> &[FileExecutionGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<FileExecutionGroup> {
        self.groups
    }
}
