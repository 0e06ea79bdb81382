// ABOUTME: Copy-on-write collections of template source references and helper functions
// ABOUTME: Every mutating combinator returns a new Set; the receiver is never modified

use std::fmt;
use std::sync::Arc;

use handlebars::HelperDef;

use crate::error::Result;
use crate::helpers::FuncMap;
use crate::loader::Loader;
use crate::view::View;

/// A reference from a set to a registered source, together with the fragment
/// name its body is composed under. An empty local name marks the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRef {
    local: String,
    source: String,
}

impl SourceRef {
    pub fn local_name(&self) -> &str {
        &self.local
    }

    pub fn source_name(&self) -> &str {
        &self.source
    }

    pub fn is_root(&self) -> bool {
        self.local.is_empty()
    }
}

/// A collection of template sources. It allows creating a View from its
/// sources. Sets are immutable: all combinators clone and return the clone,
/// so a base set can safely be shared across many derived views.
#[derive(Clone)]
pub struct Set {
    loader: Loader,
    sources: Vec<SourceRef>,
    funcs: FuncMap,
}

impl Set {
    pub(crate) fn new(loader: Loader, funcs: FuncMap) -> Self {
        Self {
            loader,
            sources: Vec::new(),
            funcs,
        }
    }

    /// Appends each named source as a root-positioned reference.
    /// Returns a copy of the set.
    pub fn add<I>(&self, names: I) -> Set
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut next = self.clone();
        for name in names {
            next.sources.push(SourceRef {
                local: String::new(),
                source: name.into(),
            });
        }
        next
    }

    /// Appends a source reference bound under an explicit local fragment
    /// name. Returns a copy of the set.
    pub fn set(&self, local_name: impl Into<String>, source_name: impl Into<String>) -> Set {
        let mut next = self.clone();
        next.sources.push(SourceRef {
            local: local_name.into(),
            source: source_name.into(),
        });
        next
    }

    /// Appends the source references and helper functions of other sets.
    /// Later sets win on function name collision. Returns a copy of the set.
    pub fn merge<'a, I>(&self, others: I) -> Set
    where
        I: IntoIterator<Item = &'a Set>,
    {
        let mut next = self.clone();
        for other in others {
            next.sources.extend(other.sources.iter().cloned());
            for (name, func) in &other.funcs {
                next.funcs.insert(name.clone(), func.clone());
            }
        }
        next
    }

    /// Appends a named helper function, overwriting any previous function of
    /// the same name. Returns a copy of the set.
    pub fn add_func<H>(&self, name: impl Into<String>, func: H) -> Set
    where
        H: HelperDef + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.funcs.insert(name.into(), Arc::new(func));
        next
    }

    /// Appends all functions of the passed-in map; collisions favor the new
    /// functions. Returns a copy of the set.
    pub fn add_funcs(&self, funcs: FuncMap) -> Set {
        let mut next = self.clone();
        next.funcs.extend(funcs);
        next
    }

    /// Returns a copy of the set's helper function map.
    pub fn funcs(&self) -> FuncMap {
        self.funcs.clone()
    }

    /// Returns a copy of the set's source references.
    pub fn source_refs(&self) -> Vec<SourceRef> {
        self.sources.clone()
    }

    /// Creates a new view from the set's sources, building it eagerly.
    pub fn view(&self) -> Result<View> {
        let view = View::new(self.clone());
        view.build()?;
        Ok(view)
    }

    /// Like [`Set::view`], but panics on a build error. Intended for call
    /// sites during process startup where a broken template set should halt
    /// initialization.
    pub fn view_or_panic(&self) -> View {
        match self.view() {
            Ok(view) => view,
            Err(err) => panic!("template set failed to build: {err}"),
        }
    }

    pub(crate) fn loader(&self) -> &Loader {
        &self.loader
    }

    pub(crate) fn refs(&self) -> &[SourceRef] {
        &self.sources
    }

    pub(crate) fn funcs_ref(&self) -> &FuncMap {
        &self.funcs
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut func_names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        func_names.sort_unstable();
        f.debug_struct("Set")
            .field("sources", &self.sources)
            .field("funcs", &func_names)
            .finish()
    }
}
