// ABOUTME: Fragment extraction, merging, and completeness validation for template sets
// ABOUTME: Compiles sources into fragments and links them into a renderable registry

use std::collections::{BTreeSet, HashMap, HashSet};

use handlebars::template::{
    DecoratorTemplate, HelperTemplate, Parameter, Template, TemplateElement,
};
use handlebars::Handlebars;

use crate::config::{Config, NATIVE_DELIM_LEFT, NATIVE_DELIM_RIGHT};
use crate::error::{Error, Result};
use crate::helpers::{FuncMap, SharedHelper};

/// Name of the anonymous root fragment, the entry point of a composed program.
pub(crate) const ROOT_NAME: &str = "";

/// Helpers the engine registers by default: the block helpers plus the
/// comparison and logic helpers available since 4.3.
const BUILTIN_HELPERS: &[&str] = &[
    "if", "unless", "each", "with", "lookup", "log", "eq", "ne", "gt", "gte", "lt", "lte", "and",
    "or", "not", "len",
];

/// The fragments compiled from a single template source: the top-level body
/// plus any inline partial definitions hoisted out of it.
#[derive(Clone, Debug)]
pub(crate) struct ParsedSource {
    body: Template,
    inlines: Vec<(String, Template)>,
}

/// A parsed source together with its composition position within a set.
pub(crate) struct NamedSource {
    /// Registry name, used in error messages.
    pub(crate) origin: String,
    /// Fragment name the body is composed under. Empty means root.
    pub(crate) local: String,
    pub(crate) parsed: ParsedSource,
}

/// Compiles one source text into its fragments. Inline partial blocks
/// (`{{#*inline "name"}}...{{/inline}}`) at the top level become standalone
/// named fragments; everything else remains the body.
pub(crate) fn parse_source(name: &str, text: &str, conf: &Config) -> Result<ParsedSource> {
    let text = translate_delimiters(text, conf);
    let compiled = Template::compile(&text).map_err(|source| Error::Syntax {
        name: name.to_string(),
        source,
    })?;
    Ok(split_fragments(compiled))
}

fn split_fragments(compiled: Template) -> ParsedSource {
    let mut body = compiled;
    let elements = std::mem::take(&mut body.elements);
    let mut mappings = std::mem::take(&mut body.mapping).into_iter();
    let mut inlines = Vec::new();

    for element in elements {
        let mapping = mappings.next();
        match element {
            TemplateElement::DecoratorBlock(mut decorator)
                if inline_name(&decorator).is_some() && decorator.template.is_some() =>
            {
                if let (Some(name), Some(inner)) =
                    (inline_name(&decorator), decorator.template.take())
                {
                    inlines.push((name, inner));
                }
            }
            other => {
                body.elements.push(other);
                if let Some(mapping) = mapping {
                    body.mapping.push(mapping);
                }
            }
        }
    }

    ParsedSource { body, inlines }
}

fn inline_name(decorator: &DecoratorTemplate) -> Option<String> {
    if decorator.name.as_name() != Some("inline") {
        return None;
    }
    match decorator.params.first() {
        Some(Parameter::Literal(value)) => value.as_str().map(str::to_string),
        Some(other) => other.as_name().map(str::to_string),
        None => None,
    }
}

/// Rewrites configured action delimiters to the engine's native pair. Native
/// markers already present in the source are escaped so they stay literal.
fn translate_delimiters(text: &str, conf: &Config) -> String {
    if conf.uses_native_delimiters() {
        return text.to_string();
    }
    // With a native left delimiter the escape would swallow every action
    // opener, so only escape when the opener is actually custom.
    let text = if conf.delim_left == NATIVE_DELIM_LEFT {
        text.to_string()
    } else {
        text.replace(NATIVE_DELIM_LEFT, "\\{{")
    };
    text.replace(&conf.delim_left, NATIVE_DELIM_LEFT)
        .replace(&conf.delim_right, NATIVE_DELIM_RIGHT)
}

fn has_content(template: &Template) -> bool {
    template.elements.iter().any(|element| match element {
        TemplateElement::RawString(text) => !text.trim().is_empty(),
        TemplateElement::Comment(_) => false,
        _ => true,
    })
}

/// Merges the parsed sources of a set into one program, validates it, and
/// links it into a ready-to-render registry.
pub(crate) fn compose(sources: Vec<NamedSource>, funcs: &FuncMap) -> Result<Handlebars<'static>> {
    let mut fragments: HashMap<String, Template> = HashMap::new();
    let mut root_seen = false;

    for source in sources {
        let NamedSource {
            origin,
            local,
            parsed,
        } = source;
        let ParsedSource { body, inlines } = parsed;

        // A whitespace-only root body next to inline definitions is dropped,
        // so partial-only files compose without claiming the root slot.
        let keep_body = !local.is_empty() || inlines.is_empty() || has_content(&body);

        let mut incoming = inlines;
        if keep_body {
            incoming.push((local, body));
        }

        for (name, template) in incoming {
            if name == ROOT_NAME {
                if root_seen {
                    return Err(Error::DuplicateRoot(origin));
                }
                root_seen = true;
            }
            // non-root redefinition is the documented override mechanism
            fragments.insert(name, template);
        }
    }

    validate(&fragments, funcs)?;
    Ok(link(fragments, funcs))
}

fn validate(fragments: &HashMap<String, Template>, funcs: &FuncMap) -> Result<()> {
    let root = fragments.get(ROOT_NAME).ok_or(Error::MissingRoot)?;

    // fragment completeness, walked transitively from the root
    let mut missing = BTreeSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(ROOT_NAME.to_string());
    let mut queue = vec![root];
    while let Some(template) = queue.pop() {
        for name in partial_references(template) {
            if !visited.insert(name.clone()) {
                continue;
            }
            match fragments.get(&name) {
                Some(fragment) => queue.push(fragment),
                None => {
                    missing.insert(name);
                }
            }
        }
    }
    if !missing.is_empty() {
        return Err(Error::MissingFragments(missing.into_iter().collect()));
    }

    // every helper invocation must resolve to a registered function
    let mut names: Vec<&String> = fragments.keys().collect();
    names.sort_unstable();
    for name in names {
        if let Some(helper) = undefined_helper(&fragments[name], funcs) {
            return Err(Error::UndefinedFunction {
                fragment: name.clone(),
                helper,
            });
        }
    }

    Ok(())
}

fn link(fragments: HashMap<String, Template>, funcs: &FuncMap) -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    for (name, func) in funcs {
        registry.register_helper(name, Box::new(SharedHelper::new(func.clone())));
    }
    for (name, template) in fragments {
        registry.register_template(&name, template);
    }
    registry
}

/// Visits every element of a template, descending into block bodies and
/// inverse branches. Uses an explicit work stack rather than recursion.
fn walk_templates<'a>(root: &'a Template, mut visit: impl FnMut(&'a TemplateElement)) {
    let mut stack: Vec<&Template> = vec![root];
    while let Some(template) = stack.pop() {
        for element in &template.elements {
            visit(element);
            match element {
                TemplateElement::HelperBlock(block) => {
                    stack.extend(block.template.as_ref());
                    stack.extend(block.inverse.as_ref());
                }
                TemplateElement::DecoratorBlock(block)
                | TemplateElement::PartialBlock(block) => {
                    stack.extend(block.template.as_ref());
                }
                _ => {}
            }
        }
    }
}

/// Collects the names of all fragments a template requires. Partial blocks
/// (`{{#> name}}`) carry their own fallback content and are not hard
/// requirements; dynamic partial names cannot be resolved statically.
fn partial_references(template: &Template) -> Vec<String> {
    let mut names = Vec::new();
    walk_templates(template, |element| {
        if let TemplateElement::PartialExpression(partial) = element {
            if let Some(name) = partial_name(partial) {
                names.push(name);
            }
        }
    });
    names
}

fn partial_name(partial: &DecoratorTemplate) -> Option<String> {
    match &partial.name {
        Parameter::Literal(value) => value.as_str().map(str::to_string),
        other => other.as_name().map(str::to_string),
    }
}

/// Returns the first helper invocation that no registered function satisfies.
/// Expressions without arguments are plain variable lookups and are skipped;
/// subexpression arguments are always helper calls and are checked too.
fn undefined_helper(template: &Template, funcs: &FuncMap) -> Option<String> {
    let mut found = None;
    walk_templates(template, |element| {
        if found.is_some() {
            return;
        }
        let invocation = match element {
            TemplateElement::Expression(call) | TemplateElement::HtmlExpression(call) => {
                if call.params.is_empty() && call.hash.is_empty() {
                    return;
                }
                call
            }
            TemplateElement::HelperBlock(call) => call,
            _ => return,
        };
        found = undefined_in_call(invocation, funcs);
    });
    found
}

fn undefined_in_call(call: &HelperTemplate, funcs: &FuncMap) -> Option<String> {
    if let Some(name) = call.name.as_name() {
        if !BUILTIN_HELPERS.contains(&name) && !funcs.contains_key(name) {
            return Some(name.to_string());
        }
    }
    call.params
        .iter()
        .chain(call.hash.values())
        .find_map(|param| match param {
            Parameter::Subexpression(sub) => match sub.as_element() {
                TemplateElement::Expression(inner) | TemplateElement::HtmlExpression(inner) => {
                    undefined_in_call(inner, funcs)
                }
                _ => None,
            },
            _ => None,
        })
}
