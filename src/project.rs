//! Projects and the build context that owns them.
//!
//! A [`Project`] is a name plus a [`Multimap`] of properties. The
//! [`Context`] keeps every project, indexes them by name through a second
//! multimap holding [`Value::Handle`]s, and tracks which one is *current*:
//! `add`/`set`/`remove_*` always apply to the current project.

use std::fmt;
use std::path::Path;

use serde_json::json;

use crate::buffer::DynString;
use crate::error::{CbError, Result};
use crate::mmap::{Multimap, Range, Value};

/// Well-known property keys.
pub mod keys {
    pub const BINARY_TYPE: &str = "binary_type";
    pub const CXFLAGS: &str = "cxflags";
    pub const CFLAGS: &str = "cflags";
    pub const CXXFLAGS: &str = "cxxflags";
    pub const DEFINES: &str = "defines";
    pub const FILES: &str = "files";
    pub const INCLUDE_DIR: &str = "include_dir";
    pub const LINK_PROJECT: &str = "link_project";
    pub const LFLAGS: &str = "lflags";
    pub const OUTPUT_DIR: &str = "output_dir";
    pub const TARGET_NAME: &str = "target_name";
    pub const WORKING_DIRECTORY: &str = "working_directory";

    // Values of BINARY_TYPE.
    pub const EXE: &str = "exe";
    pub const SHARED_LIBRARY: &str = "shared_library";
    pub const STATIC_LIBRARY: &str = "static_library";
}

/// Index of a project inside its [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectId(usize);

#[derive(Debug, Clone)]
pub struct Project {
    name: DynString,
    properties: Multimap,
}

impl Project {
    fn new(name: &str) -> Self {
        Self {
            name: DynString::from(name),
            properties: Multimap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn properties(&self) -> &Multimap {
        &self.properties
    }

    pub fn add(&mut self, key: &str, value: &str) {
        self.properties.insert(key, value);
    }

    pub fn add_fmt(&mut self, key: &str, args: fmt::Arguments<'_>) {
        let mut value = DynString::new();
        value.append_fmt(args);
        self.properties.insert(key, Value::Str(value));
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.properties.remove(key);
        self.properties.insert(key, value);
    }

    pub fn remove_all(&mut self, key: &str) -> usize {
        self.properties.remove(key)
    }

    pub fn remove_one(&mut self, key: &str, value: &str) -> bool {
        self.properties.remove_one(key, value)
    }

    /// First value of `key`.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .try_get_first(key)
            .and_then(|kv| kv.value().as_str())
    }

    pub fn property_equals(&self, key: &str, expected: &str) -> bool {
        self.property(key) == Some(expected)
    }

    pub fn values(&self, key: &str) -> Range<'_> {
        self.properties.get_range(key)
    }

    pub fn is_exe(&self) -> bool {
        self.property_equals(keys::BINARY_TYPE, keys::EXE)
    }

    pub fn is_shared_library(&self) -> bool {
        self.property_equals(keys::BINARY_TYPE, keys::SHARED_LIBRARY)
    }

    pub fn is_static_library(&self) -> bool {
        self.property_equals(keys::BINARY_TYPE, keys::STATIC_LIBRARY)
    }

    /// Output name, `target_name` when set, the project name otherwise.
    pub fn target_name(&self) -> &str {
        self.property(keys::TARGET_NAME).unwrap_or(self.name())
    }
}

#[derive(Debug, Default)]
pub struct Context {
    projects: Multimap,
    store: Vec<Project>,
    current: Option<ProjectId>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects project `name`, creating it on first use.
    pub fn project(&mut self, name: &str) -> ProjectId {
        let id = match self.find_project(name) {
            Some(id) => id,
            None => {
                let id = ProjectId(self.store.len());
                self.store.push(Project::new(name));
                self.projects.insert(name, Value::Handle(id.0));
                id
            }
        };
        self.current = Some(id);
        id
    }

    pub fn find_project(&self, name: &str) -> Option<ProjectId> {
        self.projects
            .try_get_first(name)
            .and_then(|kv| kv.value().as_handle())
            .map(ProjectId)
    }

    pub fn project_by_name(&self, name: &str) -> Result<&Project> {
        self.find_project(name)
            .map(|id| self.get(id))
            .ok_or_else(|| CbError::UnknownProject(name.to_string()))
    }

    pub fn get(&self, id: ProjectId) -> &Project {
        &self.store[id.0]
    }

    pub fn get_mut(&mut self, id: ProjectId) -> &mut Project {
        &mut self.store[id.0]
    }

    pub fn current_project(&self) -> Option<ProjectId> {
        self.current
    }

    fn current_mut(&mut self) -> Result<&mut Project> {
        let id = self.current.ok_or(CbError::NoCurrentProject)?;
        Ok(self.get_mut(id))
    }

    pub fn add(&mut self, key: &str, value: &str) -> Result<()> {
        self.current_mut()?.add(key, value);
        Ok(())
    }

    pub fn add_fmt(&mut self, key: &str, args: fmt::Arguments<'_>) -> Result<()> {
        self.current_mut()?.add_fmt(key, args);
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.current_mut()?.set(key, value);
        Ok(())
    }

    pub fn remove_all(&mut self, key: &str) -> Result<usize> {
        Ok(self.current_mut()?.remove_all(key))
    }

    pub fn remove_one(&mut self, key: &str, value: &str) -> Result<bool> {
        Ok(self.current_mut()?.remove_one(key, value))
    }

    /// Adds `path` to `files`, made absolute against the working directory.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let absolute = std::path::absolute(path).map_err(|e| CbError::io(path, e))?;
        self.add(keys::FILES, &absolute.to_string_lossy())
    }

    /// Projects in multimap order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects
            .iter()
            .filter_map(|kv| kv.value().as_handle())
            .map(|h| &self.store[h])
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Every project and its properties, one `key : value` per line.
    pub fn dump(&self) -> String {
        let mut out = DynString::new();
        for project in self.projects() {
            out.append_fmt(format_args!("Project '{}'\n", project.name()));
            for kv in project.properties() {
                out.append_fmt(format_args!("{} : {}\n", kv.key(), kv.value()));
            }
        }
        out.as_str().to_string()
    }

    pub fn dump_json(&self) -> serde_json::Value {
        let projects: Vec<serde_json::Value> = self
            .projects()
            .map(|project| {
                let properties: Vec<serde_json::Value> = project
                    .properties()
                    .iter()
                    .map(|kv| json!({ "key": kv.key(), "value": kv.value().to_string() }))
                    .collect();
                json!({ "name": project.name(), "properties": properties })
            })
            .collect();
        json!({ "projects": projects })
    }
}
