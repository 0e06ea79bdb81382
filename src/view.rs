// ABOUTME: Lazily built, render-ready composed templates
// ABOUTME: Executes a set's composed program against caller-supplied data

use std::io;
use std::sync::{Arc, Mutex};

use handlebars::{Handlebars, RenderError};
use serde::Serialize;

use crate::assemble::ROOT_NAME;
use crate::error::{Error, Result};
use crate::set::Set;

/// A renderable composition of a set's template sources.
///
/// The composed program is built on creation and kept until the view is
/// dropped; with auto-reload enabled on the owning loader it is rebuilt on
/// every render instead. A built view renders from any number of threads in
/// parallel without locking the loader.
#[derive(Debug)]
pub struct View {
    set: Set,
    program: Mutex<Option<Arc<Handlebars<'static>>>>,
}

impl View {
    pub(crate) fn new(set: Set) -> Self {
        Self {
            set,
            program: Mutex::new(None),
        }
    }

    /// Returns the composed program, building it if necessary. On failure
    /// the view stays unbuilt and the error is returned to every caller.
    pub(crate) fn build(&self) -> Result<Arc<Handlebars<'static>>> {
        let mut slot = self.program.lock().unwrap_or_else(|err| err.into_inner());
        match &*slot {
            Some(program) if !self.set.loader().auto_reload() => Ok(program.clone()),
            _ => {
                let built = Arc::new(self.set.loader().build_program(&self.set)?);
                *slot = Some(built.clone());
                Ok(built)
            }
        }
    }

    /// Applies the composed program to the data value, returning the output
    /// as text. Pass `&()` to render without data.
    pub fn render<T>(&self, data: &T) -> Result<String>
    where
        T: Serialize,
    {
        let mut buf = Vec::new();
        self.write_to(&mut buf, data)?;
        String::from_utf8(buf).map_err(|err| {
            Error::Execution(RenderError::new(format!(
                "rendered output is not valid UTF-8: {err}"
            )))
        })
    }

    /// Applies the composed program to the data value, streaming the output
    /// to the writer.
    pub fn write_to<W, T>(&self, writer: W, data: &T) -> Result<()>
    where
        W: io::Write,
        T: Serialize,
    {
        let program = self.build()?;
        program
            .render_to_write(ROOT_NAME, data, writer)
            .map_err(Error::from)
    }
}
