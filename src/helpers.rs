// ABOUTME: Default helper functions bound into every template set
// ABOUTME: Implements raw, nl2br, and the inline-render helpers runView/runSet/runTemplate

use std::collections::HashMap;
use std::sync::Arc;

use handlebars::{
    html_escape, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderError,
};
use serde_json::Value as Json;

use crate::loader::Loader;

/// Mapping from helper name to a shareable helper implementation.
pub type FuncMap = HashMap<String, Arc<dyn HelperDef + Send + Sync>>;

/// Adapter that lets one helper instance be registered into many programs.
pub(crate) struct SharedHelper(Arc<dyn HelperDef + Send + Sync>);

impl SharedHelper {
    pub(crate) fn new(inner: Arc<dyn HelperDef + Send + Sync>) -> Self {
        Self(inner)
    }
}

impl HelperDef for SharedHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        self.0.call(h, r, ctx, rc, out)
    }
}

/// Raw helper - writes its parameter without sanitation
pub fn raw_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let text = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| RenderError::new("raw helper requires a string parameter"))?;
    out.write(text)?;
    Ok(())
}

/// Nl2br helper - escapes its parameter, then replaces newlines with '<br>'
pub fn nl2br_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let text = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| RenderError::new("nl2br helper requires a string parameter"))?;
    out.write(&html_escape(text).replace('\n', "<br>"))?;
    Ok(())
}

fn required_name(h: &Helper, helper: &str) -> Result<String, RenderError> {
    h.param(0)
        .and_then(|v| v.value().as_str())
        .map(str::to_string)
        .ok_or_else(|| RenderError::new(format!("{helper} helper requires a name parameter")))
}

fn inline_data(h: &Helper) -> Json {
    h.param(1).map(|v| v.value().clone()).unwrap_or(Json::Null)
}

/// Renders a one-template view built from the owning loader's registry.
struct RunTemplateHelper {
    loader: Loader,
}

impl HelperDef for RunTemplateHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let name = required_name(h, "runTemplate")?;
        let view = self
            .loader
            .new_set()
            .add([name])
            .view()
            .map_err(|err| RenderError::new(format!("error calling runTemplate: {err}")))?;
        let html = view
            .render(&inline_data(h))
            .map_err(|err| RenderError::new(format!("error calling runTemplate: {err}")))?;
        out.write(&html)?;
        Ok(())
    }
}

/// Renders a previously built view registered with the loader.
struct RunViewHelper {
    loader: Loader,
}

impl HelperDef for RunViewHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let name = required_name(h, "runView")?;
        let view = self
            .loader
            .shared_view(&name)
            .ok_or_else(|| RenderError::new(format!("{name:?} is not a registered view")))?;
        let html = view
            .render(&inline_data(h))
            .map_err(|err| RenderError::new(format!("error calling runView: {err}")))?;
        out.write(&html)?;
        Ok(())
    }
}

/// Builds a view from a set registered with the loader and renders it.
struct RunSetHelper {
    loader: Loader,
}

impl HelperDef for RunSetHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let name = required_name(h, "runSet")?;
        let set = self
            .loader
            .shared_set(&name)
            .ok_or_else(|| RenderError::new(format!("{name:?} is not a registered set")))?;
        let view = set
            .view()
            .map_err(|err| RenderError::new(format!("error calling runSet: {err}")))?;
        let html = view
            .render(&inline_data(h))
            .map_err(|err| RenderError::new(format!("error calling runSet: {err}")))?;
        out.write(&html)?;
        Ok(())
    }
}

/// The function map every new set starts out with.
pub fn default_funcs(loader: &Loader) -> FuncMap {
    let mut funcs: FuncMap = HashMap::new();
    funcs.insert("raw".to_string(), Arc::new(raw_helper));
    funcs.insert("nl2br".to_string(), Arc::new(nl2br_helper));
    funcs.insert(
        "runTemplate".to_string(),
        Arc::new(RunTemplateHelper {
            loader: loader.clone(),
        }),
    );
    funcs.insert(
        "runView".to_string(),
        Arc::new(RunViewHelper {
            loader: loader.clone(),
        }),
    );
    funcs.insert(
        "runSet".to_string(),
        Arc::new(RunSetHelper {
            loader: loader.clone(),
        }),
    );
    funcs
}
