//! Grounding-context templates.
//!
//! Pure string rendering; the retriever supplies the results.

use super::{ModuleScope, RetrievalResult};

const REFERENCE_INTRO: &str =
    "Use the following textbook reference material to inform your responses:";

const PARAPHRASE_RULE: &str =
    "Reference the textbook material when relevant, but explain concepts in your own words.";

const PARAPHRASE_RULE_SCOPED: &str = "Reference the textbook material when relevant, but explain concepts in your own words step-by-step.";

/// Render one result as `[Reference i (Chapter .., Section ..)]\n<content>`.
///
/// `position` is 1-based. The label is keyed on the chapter: the section is
/// only shown next to one, and a chunk without a chapter gets `[Reference i]`.
pub fn render_reference(position: usize, result: &RetrievalResult) -> String {
    let Some(chapter) = present(&result.metadata.chapter) else {
        return format!("[Reference {position}]\n{}", result.content);
    };

    match present(&result.metadata.section) {
        Some(section) => format!(
            "[Reference {position} ({chapter}, {section})]\n{}",
            result.content
        ),
        None => format!("[Reference {position} ({chapter})]\n{}", result.content),
    }
}

fn present(label: &Option<String>) -> Option<&str> {
    label.as_deref().filter(|l| !l.is_empty())
}

/// All references, numbered from 1 and separated by blank lines.
pub fn render_references(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| render_reference(i + 1, result))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the grounding block for a tutoring prompt.
///
/// - With a module name: scope rules, then the reference block if any.
/// - Without one: the plain reference wrapper, or `""` when nothing was found.
pub fn render_context(results: &[RetrievalResult], scope: &ModuleScope) -> String {
    let references = render_references(results);

    let Some(name) = scope.display_name() else {
        if references.is_empty() {
            return String::new();
        }
        return format!("{REFERENCE_INTRO}\n---\n{references}\n---\n{PARAPHRASE_RULE}");
    };

    let mut context = scope_rules(name, scope.description());
    if !references.is_empty() {
        context.push_str(&format!(
            "\n{REFERENCE_INTRO}\n---\n{references}\n---\n{PARAPHRASE_RULE_SCOPED}\n"
        ));
    }
    context
}

fn scope_rules(name: &str, description: Option<&str>) -> String {
    let description = description
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();

    format!(
        "You are currently teaching the module: \"{name}\"{description}.\n\
         \n\
         IMPORTANT SCOPE RULES:\n\
         - Only answer questions related to this module's topic.\n\
         - If a student asks about a topic outside this module, gently redirect them by saying \
         something like: \"That's a great question! But right now we're focused on {name}. \
         Let's stay on track. Do you have any questions about this topic?\"\n\
         - Do NOT provide answers, hints, or explanations for topics outside the current module.\n"
    )
}
