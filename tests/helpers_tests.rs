// ABOUTME: Integration tests for the default and user-supplied helper functions
// ABOUTME: Covers escaping behaviour and the inline-render helpers runView/runSet/runTemplate

use std::sync::Arc;

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError};
use serde_json::json;
use viewset::{Error, FuncMap};

mod common;
use common::{standard_fixture, TemplateFixture};

fn exclaim_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let text = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| RenderError::new("exclaim helper requires a string parameter"))?;
    out.write(&format!("{text}!"))?;
    Ok(())
}

fn shout_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let text = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .unwrap_or_default();
    out.write(&text.to_uppercase())?;
    Ok(())
}

#[test]
fn test_raw_bypasses_escaping() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("page", "{{raw \"<br>\"}}");

    let out = loader.new_set().add(["page"]).view().unwrap().render(&()).unwrap();
    assert_eq!(out, "<br>");
}

#[test]
fn test_plain_values_are_escaped() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("page", "{{text}}");

    let out = loader
        .new_set()
        .add(["page"])
        .view()
        .unwrap()
        .render(&json!({ "text": "<b>bold</b>" }))
        .unwrap();
    assert!(!out.contains("<b>"));
    assert!(out.contains("&lt;b&gt;"));
}

#[test]
fn test_nl2br_escapes_then_converts_newlines() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("page", "{{nl2br text}}");
    let set = loader.new_set().add(["page"]);

    let out = set.view().unwrap().render(&json!({ "text": "a\nb" })).unwrap();
    assert_eq!(out, "a<br>b");

    let out = set
        .view()
        .unwrap()
        .render(&json!({ "text": "<i>\nx" }))
        .unwrap();
    assert_eq!(out, "&lt;i&gt;<br>x");
}

#[test]
fn test_add_func() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("page", "{{exclaim \"abc\"}}");

    let out = loader
        .new_set()
        .add(["page"])
        .add_func("exclaim", exclaim_helper)
        .view()
        .unwrap()
        .render(&())
        .unwrap();
    assert_eq!(out, "abc!");
}

#[test]
fn test_add_funcs_collision_favors_new_function() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("page", "{{exclaim \"abc\"}}");

    let mut funcs: FuncMap = FuncMap::new();
    funcs.insert("exclaim".to_string(), Arc::new(shout_helper));

    let out = loader
        .new_set()
        .add(["page"])
        .add_func("exclaim", exclaim_helper)
        .add_funcs(funcs)
        .view()
        .unwrap()
        .render(&())
        .unwrap();
    assert_eq!(out, "ABC");
}

#[test]
fn test_run_template() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("outer", "{{runTemplate \"pages/content\"}}");

    let out = loader.new_set().add(["outer"]).view().unwrap().render(&()).unwrap();
    assert_eq!(out, "<h1>Content</h1>");
}

#[test]
fn test_run_template_passes_data() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("greet", "Hello {{name}}!");
    loader.add_text("outer", "{{runTemplate \"greet\" person}}");

    let out = loader
        .new_set()
        .add(["outer"])
        .view()
        .unwrap()
        .render(&json!({ "person": { "name": "Ada" } }))
        .unwrap();
    assert_eq!(out, "Hello Ada!");
}

#[test]
fn test_run_template_missing_is_a_render_error() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("outer", "{{runTemplate \"missing\"}}");

    // building via the panic entry point must not turn render errors fatal
    let view = loader.new_set().add(["outer"]).view_or_panic();
    let err = view.render(&()).unwrap_err();
    assert!(matches!(&err, Error::Execution(_)), "got {err:?}");
    assert!(err.to_string().contains("runTemplate"));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_run_view_renders_registered_view() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    let inner = loader.new_set().add(["pages/content"]).view().unwrap();
    loader.register_view("partial", inner);
    loader.add_text("outer", "{{runView \"partial\"}}");

    let out = loader.new_set().add(["outer"]).view().unwrap().render(&()).unwrap();
    assert_eq!(out, "<h1>Content</h1>");
}

#[test]
fn test_run_view_unregistered_name_is_a_render_error() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.add_text("outer", "{{runView \"ghost\"}}");

    let view = loader.new_set().add(["outer"]).view_or_panic();
    let err = view.render(&()).unwrap_err();
    assert!(err.to_string().contains("not a registered view"));
}

#[test]
fn test_run_set_builds_and_renders() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.register_set("inner", loader.new_set().add(["pages/content"]));
    loader.add_text("outer", "{{runSet \"inner\"}}");

    let out = loader.new_set().add(["outer"]).view().unwrap().render(&()).unwrap();
    assert_eq!(out, "<h1>Content</h1>");
}

#[test]
fn test_run_set_build_failure_is_a_render_error() {
    let fixture = standard_fixture();
    let loader = fixture.loader(false);
    loader.register_set("inner", loader.new_set().add(["pages/nonsense"]));
    loader.add_text("outer", "{{runSet \"inner\"}}");

    let view = loader.new_set().add(["outer"]).view_or_panic();
    let err = view.render(&()).unwrap_err();
    assert!(err.to_string().contains("runSet"));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_helpers_compose_recursively() {
    // a template rendered through runTemplate may itself call runTemplate
    let fixture = TemplateFixture::new();
    let loader = fixture.loader(false);
    loader.add_text("leaf", "leaf");
    loader.add_text("middle", "[{{runTemplate \"leaf\"}}]");
    loader.add_text("outer", "({{runTemplate \"middle\"}})");

    let out = loader.new_set().add(["outer"]).view().unwrap().render(&()).unwrap();
    assert_eq!(out, "([leaf])");
}
