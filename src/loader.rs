// ABOUTME: Process-scoped template source registry and program builder
// ABOUTME: Scans configured directories, resolves set references, and caches parsed fragments

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use handlebars::Handlebars;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::assemble::{self, NamedSource, ParsedSource};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::helpers;
use crate::set::Set;
use crate::view::View;

/// A template data source: file-backed or inline text.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub file_path: Option<PathBuf>,
    pub content: Option<String>,
}

/// Collects the available template sources. It creates new sets and builds
/// their composed programs. Cloning a loader yields another handle to the
/// same registry.
#[derive(Clone, Debug)]
pub struct Loader {
    inner: Arc<LoaderInner>,
}

#[derive(Debug)]
struct LoaderInner {
    conf: Config,
    state: Mutex<LoaderState>,
    shared: Mutex<SharedRegistry>,
}

#[derive(Debug, Default)]
struct LoaderState {
    sources: HashMap<String, Source>,
    parse_cache: HashMap<PathBuf, ParsedSource>,
}

/// Views and sets addressable by name from the runView/runSet helpers.
#[derive(Debug, Default)]
struct SharedRegistry {
    views: HashMap<String, Arc<View>>,
    sets: HashMap<String, Set>,
}

impl Loader {
    /// Creates a new loader. It scans the configured source directories and
    /// collects all available template sources.
    pub fn new(conf: Config) -> Result<Loader> {
        let loader = Loader {
            inner: Arc::new(LoaderInner {
                conf: conf.normalized(),
                state: Mutex::new(LoaderState::default()),
                shared: Mutex::new(SharedRegistry::default()),
            }),
        };
        loader.scan()?;
        Ok(loader)
    }

    fn scan(&self) -> Result<()> {
        let conf = &self.inner.conf;
        let mut state = self.lock_state();

        // lowest priority first, so higher-priority directories overwrite
        // same-named entries scanned earlier
        for dir in conf.directories.iter().rev() {
            fs::metadata(dir).map_err(|source| Error::DirectoryNotFound {
                path: dir.clone(),
                source,
            })?;

            for entry in WalkDir::new(dir) {
                let entry = entry.map_err(|err| Error::Io {
                    path: dir.clone(),
                    source: err.into(),
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy();
                if file_name.starts_with('_') || !file_name.ends_with(&conf.extension) {
                    continue;
                }

                let Ok(relative) = entry.path().strip_prefix(dir) else {
                    continue;
                };
                let relative = relative.to_string_lossy().replace('\\', "/");
                let Some(name) = relative.strip_suffix(&conf.extension) else {
                    continue;
                };

                debug!(name, path = %entry.path().display(), "registered template source");
                state.sources.insert(
                    name.to_string(),
                    Source {
                        name: name.to_string(),
                        file_path: Some(entry.path().to_path_buf()),
                        content: None,
                    },
                );
            }
        }

        info!(sources = state.sources.len(), "template scan complete");
        Ok(())
    }

    /// Returns a new initialized set, pre-loaded with the default helpers.
    pub fn new_set(&self) -> Set {
        Set::new(self.clone(), helpers::default_funcs(self))
    }

    /// Adds a file-based template source, overwriting any existing source
    /// with the same name.
    pub fn add_file(&self, name: impl Into<String>, path: impl Into<PathBuf>) -> &Self {
        let name = name.into();
        self.lock_state().sources.insert(
            name.clone(),
            Source {
                name,
                file_path: Some(path.into()),
                content: None,
            },
        );
        self
    }

    /// Adds a text-based template source, overwriting any existing source
    /// with the same name.
    pub fn add_text(&self, name: impl Into<String>, content: impl Into<String>) -> &Self {
        let name = name.into();
        self.lock_state().sources.insert(
            name.clone(),
            Source {
                name,
                file_path: None,
                content: Some(content.into()),
            },
        );
        self
    }

    /// Returns a snapshot of all registered sources, in no particular order.
    pub fn sources(&self) -> Vec<Source> {
        self.lock_state().sources.values().cloned().collect()
    }

    /// Registers a built view under a name, making it addressable from
    /// templates via the runView helper.
    pub fn register_view(&self, name: impl Into<String>, view: View) -> Arc<View> {
        let view = Arc::new(view);
        self.lock_shared().views.insert(name.into(), view.clone());
        view
    }

    /// Registers a set under a name, making it addressable from templates
    /// via the runSet helper.
    pub fn register_set(&self, name: impl Into<String>, set: Set) {
        self.lock_shared().sets.insert(name.into(), set);
    }

    pub fn shared_view(&self, name: &str) -> Option<Arc<View>> {
        self.lock_shared().views.get(name).cloned()
    }

    pub fn shared_set(&self, name: &str) -> Option<Set> {
        self.lock_shared().sets.get(name).cloned()
    }

    pub fn config(&self) -> &Config {
        &self.inner.conf
    }

    pub(crate) fn auto_reload(&self) -> bool {
        self.inner.conf.auto_reload
    }

    /// Resolves, parses, and composes the set's sources into a validated,
    /// renderable program. Resolution and parsing run under the registry
    /// lock; sets built concurrently serialize here.
    pub(crate) fn build_program(&self, set: &Set) -> Result<Handlebars<'static>> {
        let conf = &self.inner.conf;
        let use_cache = !conf.auto_reload;
        let mut resolved = Vec::with_capacity(set.refs().len());

        {
            let mut state = self.lock_state();
            for source_ref in set.refs() {
                let source = state
                    .sources
                    .get(source_ref.source_name())
                    .cloned()
                    .ok_or_else(|| Error::SourceNotFound(source_ref.source_name().to_string()))?;

                let parsed = match (&source.file_path, &source.content) {
                    (Some(path), _) => {
                        let cached = if use_cache {
                            state.parse_cache.get(path).cloned()
                        } else {
                            None
                        };
                        match cached {
                            Some(parsed) => parsed,
                            None => {
                                let text =
                                    fs::read_to_string(path).map_err(|err| Error::Io {
                                        path: path.clone(),
                                        source: err,
                                    })?;
                                let parsed = assemble::parse_source(&source.name, &text, conf)?;
                                if use_cache {
                                    state.parse_cache.insert(path.clone(), parsed.clone());
                                }
                                parsed
                            }
                        }
                    }
                    (None, Some(content)) => assemble::parse_source(&source.name, content, conf)?,
                    (None, None) => return Err(Error::SourceNotFound(source.name.clone())),
                };

                resolved.push(NamedSource {
                    origin: source.name.clone(),
                    local: source_ref.local_name().to_string(),
                    parsed,
                });
            }
        }

        debug!(sources = resolved.len(), "composing template program");
        assemble::compose(resolved, set.funcs_ref())
    }

    fn lock_state(&self) -> MutexGuard<'_, LoaderState> {
        self.inner.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn lock_shared(&self) -> MutexGuard<'_, SharedRegistry> {
        self.inner.shared.lock().unwrap_or_else(|err| err.into_inner())
    }
}
