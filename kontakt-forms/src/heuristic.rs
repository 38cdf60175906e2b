//! Deterministic field matcher over a static DOM snapshot.
//!
//! Picks the form with the most controls, builds a lower-cased attribute blob
//! per fillable control and assigns each control to the first role (in
//! role-set order) whose vocabulary pattern matches. A role keeps the first
//! control that claimed it.

use kontakt_common::{KontaktError, Result};
use scraper::{ElementRef, Html};

use crate::catalog::Vocabulary;
use crate::dom;
use crate::mapping::{FieldDescriptor, FieldMapping, MatchedBy, SourceAttributes};
use crate::role::FormField;

/// Run the matcher over a full HTML document.
///
/// Returns [`KontaktError::NoFormFound`] when the document has no `<form>`.
/// Roles nobody matched are present with a null selector.
pub fn match_document(html: &str, vocabulary: &Vocabulary) -> Result<FieldMapping> {
    let doc = Html::parse_document(html);
    let form = largest_form(&doc).ok_or(KontaktError::NoFormFound)?;
    let controls = dom::parse_selector(dom::CONTROLS)
        .ok_or_else(|| KontaktError::Config("control selector".into()))?;

    let mut mapping = FieldMapping::unresolved();
    for control in form.select(&controls).filter(|c| dom::is_fillable(*c)) {
        let Some(selector) = control_selector(&doc, form, control) else {
            tracing::trace!(target: "forms.heuristic", tag = control.value().name(), "control has neither id nor name");
            continue;
        };
        let attrs = source_attributes(control);
        let blob = attribute_blob(&doc, control, &attrs);

        let Some((role, matched_by)) = assign_role(control, &attrs, &blob, vocabulary) else {
            continue;
        };
        let descriptor = FieldDescriptor::found(role, selector, matched_by).with_attributes(attrs);
        let selector = descriptor.selector.clone().unwrap_or_default();
        if mapping.claim(descriptor) {
            tracing::debug!(target: "forms.heuristic", %role, %selector, ?matched_by, "role matched");
        } else {
            tracing::trace!(target: "forms.heuristic", %role, %selector, "role already claimed");
        }
    }

    tracing::info!(
        target: "forms.heuristic",
        resolved = mapping.resolved_count(),
        "heuristic matching finished"
    );
    Ok(mapping)
}

/// Count of input/textarea/select descendants; ties keep the earlier form.
fn largest_form(doc: &Html) -> Option<ElementRef<'_>> {
    let forms = dom::parse_selector("form")?;
    let controls = dom::parse_selector(dom::CONTROLS)?;
    doc.select(&forms)
        .map(|form| (form.select(&controls).count(), form))
        .fold(None, |best: Option<(usize, ElementRef<'_>)>, (count, form)| match best {
            Some((best_count, _)) if best_count >= count => best,
            _ => Some((count, form)),
        })
        .map(|(_, form)| form)
}

/// `#id`, else `tag[name='…']`; prefixed with the form's own selector when
/// the bare one also matches elsewhere in the document.
fn control_selector(doc: &Html, form: ElementRef<'_>, control: ElementRef<'_>) -> Option<String> {
    let el = control.value();
    let bare = match el.id().filter(|id| !id.trim().is_empty()) {
        Some(id) => dom::id_selector(id),
        None => {
            let name = el.attr("name").filter(|n| !n.trim().is_empty())?;
            format!("{}{}", el.name(), dom::name_selector(name))
        }
    };
    if dom::matches_exactly_once(doc, &bare) {
        return Some(bare);
    }
    let anchored = format!("{} {bare}", dom::structural_selector(doc, form));
    let first_in_doc = dom::parse_selector(&anchored)
        .and_then(|sel| doc.select(&sel).next())
        .is_some_and(|found| found == control);
    Some(if first_in_doc { anchored } else { dom::element_path(control) })
}

fn source_attributes(control: ElementRef<'_>) -> SourceAttributes {
    let attr = |name: &str| {
        control
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    SourceAttributes {
        name: attr("name"),
        id: attr("id"),
        placeholder: attr("placeholder"),
        aria_label: attr("aria-label"),
        control_type: Some(dom::control_type(control)),
    }
}

/// `name id placeholder aria-label` plus associated label texts, lower-cased.
fn attribute_blob(doc: &Html, control: ElementRef<'_>, attrs: &SourceAttributes) -> String {
    let mut parts: Vec<String> = [&attrs.name, &attrs.id, &attrs.placeholder, &attrs.aria_label]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

    if let Some(id) = &attrs.id {
        let css = format!("label[for={}]", dom::css_quote(id));
        if let Some(sel) = dom::parse_selector(&css) {
            parts.extend(doc.select(&sel).map(dom::element_text));
        }
    }
    if let Some(label) = control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "label")
    {
        parts.push(dom::element_text(label));
    }

    parts.join(" ").to_lowercase()
}

fn assign_role(
    control: ElementRef<'_>,
    attrs: &SourceAttributes,
    blob: &str,
    vocabulary: &Vocabulary,
) -> Option<(FormField, MatchedBy)> {
    match attrs.control_type.as_deref() {
        Some("email") => return Some((FormField::Email, MatchedBy::InputType)),
        Some("tel") => return Some((FormField::Phone, MatchedBy::InputType)),
        _ => {}
    }
    if let Some(role) = FormField::ALL
        .into_iter()
        .find(|role| vocabulary.matches(*role, blob))
    {
        return Some((role, MatchedBy::Pattern));
    }
    (control.value().name() == "textarea").then_some((FormField::Message, MatchedBy::TextareaDefault))
}
