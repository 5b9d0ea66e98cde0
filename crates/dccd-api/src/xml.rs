//! XML string assembly for resource responses.
//!
//! Listing and summary responses are small flat documents assembled as
//! escaped strings; only full TRiDaS downloads go through the serde
//! serializer in `dccd-domain`.

use dccd_domain::{FileUnit, Project};
use dccd_storage::{ProjectHit, SearchResult};

/// XML declaration emitted ahead of every assembled document.
pub const XML_INSTRUCTION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

/// `<tagname>escaped text</tagname>`
pub fn xml_element(tagname: &str, text: &str) -> String {
    format!(
        "<{tagname}>{}</{tagname}>",
        quick_xml::escape::escape(text)
    )
}

/// Like [`xml_element`], but empty/blank text renders nothing.
pub fn xml_element_optional(tagname: &str, text: Option<&str>) -> String {
    match text {
        Some(text) if !text.trim().is_empty() => xml_element(tagname, text),
        _ => String::new(),
    }
}

/// One project summary, as it appears in listings and single lookups.
///
/// `include_state` adds the administrative state, which is only shown on
/// owner-scoped resources.
pub fn append_project_hit(out: &mut String, hit: &ProjectHit, include_state: bool) {
    out.push_str("<project>");
    out.push_str(&xml_element("sid", &hit.sid));
    out.push_str(&xml_element("title", &hit.title));
    out.push_str(&xml_element("language", &hit.language));
    out.push_str(&xml_element_optional("category", hit.category.as_deref()));
    out.push_str(&xml_element_optional(
        "description",
        hit.description.as_deref(),
    ));
    if include_state {
        out.push_str(&xml_element("state", hit.state.as_str()));
        out.push_str(&xml_element("ownerId", &hit.owner_id));
    }
    out.push_str(&xml_element(
        "stateChanged",
        &hit.state_changed.to_rfc3339(),
    ));
    if !hit.object_types.is_empty() {
        out.push_str("<objectTypes>");
        for object_type in &hit.object_types {
            out.push_str(&xml_element("objectType", object_type));
        }
        out.push_str("</objectTypes>");
    }
    if !hit.element_taxons.is_empty() {
        out.push_str("<elementTaxons>");
        for taxon in &hit.element_taxons {
            out.push_str(&xml_element("taxon", taxon));
        }
        out.push_str("</elementTaxons>");
    }
    out.push_str("<permission>");
    out.push_str(&xml_element(
        "defaultLevel",
        &hit.permission_default_level.to_string(),
    ));
    out.push_str("</permission>");
    out.push_str("</project>");
}

/// A single project summary document.
pub fn project_hit_document(hit: &ProjectHit, include_state: bool) -> String {
    let mut out = String::from(XML_INSTRUCTION);
    append_project_hit(&mut out, hit, include_state);
    out
}

/// A paged project listing document.
pub fn project_list_document(
    result: &SearchResult<ProjectHit>,
    include_state: bool,
) -> String {
    let mut out = String::from(XML_INSTRUCTION);
    out.push_str(&format!(
        "<projects total=\"{}\" offset=\"{}\">",
        result.total_hits, result.offset
    ));
    for hit in &result.hits {
        append_project_hit(&mut out, hit, include_state);
    }
    out.push_str("</projects>");
    out
}

/// The file-name listing for associated or original files.
pub fn files_document(units: &[FileUnit]) -> String {
    let mut out = String::from(XML_INSTRUCTION);
    out.push_str("<files>");
    for unit in units {
        out.push_str(&xml_element("file", &unit.file_name));
    }
    out.push_str("</files>");
    out
}

/// The permission metadata document, shown to owners and admins.
pub fn permission_document(project: &Project) -> String {
    let mut out = String::from(XML_INSTRUCTION);
    out.push_str("<permission>");
    out.push_str(&xml_element("projectId", &project.sid));
    out.push_str(&xml_element("ownerId", &project.owner_id));
    out.push_str(&xml_element(
        "defaultLevel",
        &project.permission.default_level.to_string(),
    ));
    if !project.permission.user_permissions.is_empty() {
        out.push_str("<userPermissions>");
        for user_permission in &project.permission.user_permissions {
            out.push_str("<userPermission>");
            out.push_str(&xml_element("userId", &user_permission.user_id));
            out.push_str(&xml_element("level", &user_permission.level.to_string()));
            out.push_str("</userPermission>");
        }
        out.push_str("</userPermissions>");
    }
    out.push_str("</permission>");
    out
}
