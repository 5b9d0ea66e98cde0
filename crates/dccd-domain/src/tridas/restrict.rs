//! Permission-scoped redaction of TRiDaS documents.
//!
//! Removes entities (or attributes) the viewer is not permitted to see and
//! adds placeholders indicating that, and what, has been removed. Both
//! restrictors mutate the given document in place.
//!
//! Two variants share one recursive walker and differ in the wording of
//! the notes they stamp and in their PROJECT-level handling of objects:
//! [`PermissionRestrictor`] (driven by the viewer's *effective* permission)
//! keeps objects but reduces them to their open-access subset, while
//! [`RequestedLevelRestrictor`] (driven by what the client *asked* for)
//! removes objects outright. When a request exceeds the effective
//! permission the caller applies the effective restrictor on top; the
//! stricter of the two always wins.

use crate::permission::ProjectPermissionLevel;
use crate::tridas::{
    EntityKind, TridasElement, TridasGenericField, TridasObject, TridasProject, TridasRadius,
    TridasSample, TridasSeries,
};

/// Generic-field name of the note stamped when anything was removed.
pub const INCOMPLETE_NOTE_FIELD_NAME: &str = "dccd.incompleteTridasNote";

/// Generic-field name of a removed-entity placeholder.
pub const ENTITY_PLACEHOLDER_FIELD_NAME: &str = "dccd.incompleteTridas.entityPlaceholder";

/// Note wording of the two restrictor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wording {
    Authorised,
    Requested,
}

impl Wording {
    fn level_clause(self, level: ProjectPermissionLevel) -> String {
        match self {
            Wording::Authorised => format!(
                "You are currently authorised to view no more than the {level} level of this project. "
            ),
            Wording::Requested => format!(
                "You requested to view no more than the {level} level of this project. "
            ),
        }
    }
}

/// Restricts a document to what the viewer's effective permission allows.
#[derive(Debug, Default)]
pub struct PermissionRestrictor;

impl PermissionRestrictor {
    pub fn new() -> Self {
        Self
    }

    /// Prunes `project` in place so nothing below `level` remains visible.
    pub fn restrict_to_permitted(&self, project: &mut TridasProject, level: ProjectPermissionLevel) {
        match level {
            ProjectPermissionLevel::Minimal => {
                restrict_project_to_open_access(project);
            }
            ProjectPermissionLevel::Project => {
                remove_derived_series(project, level, Wording::Authorised);
                // objects stay, but only their open-access subset
                for object in &mut project.objects {
                    restrict_object_to_open_access(object);
                }
                project
                    .generic_fields
                    .push(incomplete_note(level, Wording::Authorised));
            }
            ProjectPermissionLevel::Object
            | ProjectPermissionLevel::Element
            | ProjectPermissionLevel::Sample
            | ProjectPermissionLevel::Radius => {
                remove_derived_series(project, level, Wording::Authorised);
                restrict_descendants(project, level, Wording::Authorised);
            }
            ProjectPermissionLevel::Series => {
                restrict_descendants(project, level, Wording::Authorised);
            }
            // allow all, do not remove anything
            ProjectPermissionLevel::Values => {}
        }
    }
}

/// Restricts a document to the level the client requested to see.
#[derive(Debug, Default)]
pub struct RequestedLevelRestrictor;

impl RequestedLevelRestrictor {
    pub fn new() -> Self {
        Self
    }

    /// Prunes `project` in place down to the requested `level`.
    ///
    /// The `minimal` level gives more information than `project` level; it
    /// is not an entity level, but requesting it is allowed.
    pub fn restrict_to_permitted(&self, project: &mut TridasProject, level: ProjectPermissionLevel) {
        match level {
            ProjectPermissionLevel::Minimal => {
                restrict_project_to_open_access(project);
            }
            ProjectPermissionLevel::Project => {
                remove_objects(project, level);
                remove_derived_series(project, level, Wording::Requested);
                project
                    .generic_fields
                    .push(incomplete_note(level, Wording::Requested));
            }
            ProjectPermissionLevel::Object
            | ProjectPermissionLevel::Element
            | ProjectPermissionLevel::Sample
            | ProjectPermissionLevel::Radius => {
                remove_derived_series(project, level, Wording::Requested);
                restrict_descendants(project, level, Wording::Requested);
            }
            ProjectPermissionLevel::Series => {
                restrict_descendants(project, level, Wording::Requested);
            }
            ProjectPermissionLevel::Values => {}
        }
    }
}

// ------------------------------------------------------------------
// Shared walker
// ------------------------------------------------------------------

/// Descends Object→Element→Sample→Radius→Series, pruning the next finer
/// layer wherever `level` does not permit it, then stamps the root note.
fn restrict_descendants(project: &mut TridasProject, level: ProjectPermissionLevel, wording: Wording) {
    for object in &mut project.objects {
        restrict_object(object, level, wording);
    }
    for series in &mut project.derived_series {
        restrict_series_values(series, level, wording);
    }
    project.generic_fields.push(incomplete_note(level, wording));
}

fn restrict_object(object: &mut TridasObject, level: ProjectPermissionLevel, wording: Wording) {
    if !ProjectPermissionLevel::Element.is_permitted_by(level) {
        let placeholders = removed_placeholders(
            EntityKind::Element,
            object.elements.len(),
            level,
            wording,
        );
        object.generic_fields.extend(placeholders);
        object.elements.clear();
    } else {
        for element in &mut object.elements {
            restrict_element(element, level, wording);
        }
    }

    // sub-objects, recursively
    for sub_object in &mut object.objects {
        restrict_object(sub_object, level, wording);
    }
}

fn restrict_element(element: &mut TridasElement, level: ProjectPermissionLevel, wording: Wording) {
    if !ProjectPermissionLevel::Sample.is_permitted_by(level) {
        let placeholders =
            removed_placeholders(EntityKind::Sample, element.samples.len(), level, wording);
        element.generic_fields.extend(placeholders);
        element.samples.clear();
    } else {
        for sample in &mut element.samples {
            restrict_sample(sample, level, wording);
        }
    }
}

fn restrict_sample(sample: &mut TridasSample, level: ProjectPermissionLevel, wording: Wording) {
    if !ProjectPermissionLevel::Radius.is_permitted_by(level) {
        let placeholders =
            removed_placeholders(EntityKind::Radius, sample.radiuses.len(), level, wording);
        sample.generic_fields.extend(placeholders);
        sample.radiuses.clear();
    } else {
        for radius in &mut sample.radiuses {
            restrict_radius(radius, level, wording);
        }
    }
}

fn restrict_radius(radius: &mut TridasRadius, level: ProjectPermissionLevel, wording: Wording) {
    if !ProjectPermissionLevel::Series.is_permitted_by(level) {
        let placeholders = removed_placeholders(
            EntityKind::MeasurementSeries,
            radius.measurement_series.len(),
            level,
            wording,
        );
        radius.generic_fields.extend(placeholders);
        radius.measurement_series.clear();
    } else {
        for series in &mut radius.measurement_series {
            restrict_series_values(series, level, wording);
        }
    }
}

/// Removes the values groups of a series when readings are not permitted.
fn restrict_series_values<S: TridasSeries>(
    series: &mut S,
    level: ProjectPermissionLevel,
    wording: Wording,
) {
    if !ProjectPermissionLevel::Values.is_permitted_by(level) {
        let placeholders =
            removed_placeholders(EntityKind::Values, series.values().len(), level, wording);
        series.generic_fields_mut().extend(placeholders);
        series.values_mut().clear();
    }
}

/// Removes all top-level derived series, leaving ordinal placeholders.
fn remove_derived_series(
    project: &mut TridasProject,
    level: ProjectPermissionLevel,
    wording: Wording,
) {
    let placeholders = removed_placeholders(
        EntityKind::DerivedSeries,
        project.derived_series.len(),
        level,
        wording,
    );
    project.generic_fields.extend(placeholders);
    project.derived_series.clear();
}

/// Removes all objects outright (requested-level variant only).
/// Sub-objects do not get a placeholder of their own.
fn remove_objects(project: &mut TridasProject, level: ProjectPermissionLevel) {
    let placeholders = removed_placeholders(
        EntityKind::Object,
        project.objects.len(),
        level,
        Wording::Requested,
    );
    project.generic_fields.extend(placeholders);
    project.objects.clear();
}

// ------------------------------------------------------------------
// Open-access collapse (MINIMAL)
// ------------------------------------------------------------------

/// Strips everything that is not open access from the project and all its
/// (recursive) objects; every surviving node gets the open-access note.
fn restrict_project_to_open_access(project: &mut TridasProject) {
    // attributes that are not open
    project.created_timestamp = None;
    project.last_modified_timestamp = None;
    project.comments = None;
    project.description = None;
    project.period = None;
    project.commissioner = None;

    // and lists
    project.references.clear();
    project.researches.clear();
    project.files.clear();
    project.generic_fields.clear();
    project.derived_series.clear();

    project.generic_fields.push(open_access_note());

    for object in &mut project.objects {
        restrict_object_to_open_access(object);
    }
}

/// Open-access subset of an object: only title and type survive.
fn restrict_object_to_open_access(object: &mut TridasObject) {
    object.created_timestamp = None;
    object.last_modified_timestamp = None;
    object.identifier = None;
    object.comments = None;
    object.coverage = None;
    object.creator = None;
    object.description = None;
    object.location = None;
    object.owner = None;

    object.files.clear();
    object.generic_fields.clear();
    object.elements.clear();

    object.generic_fields.push(open_access_note());

    for sub_object in &mut object.objects {
        restrict_object_to_open_access(sub_object); // recursion!
    }
}

// ------------------------------------------------------------------
// Notes and placeholders
// ------------------------------------------------------------------

fn open_access_note() -> TridasGenericField {
    TridasGenericField::new(
        INCOMPLETE_NOTE_FIELD_NAME,
        "This TRiDaS is incomplete. Only open access information is included!",
    )
}

fn incomplete_note(level: ProjectPermissionLevel, wording: Wording) -> TridasGenericField {
    TridasGenericField::new(
        INCOMPLETE_NOTE_FIELD_NAME,
        format!("This TRiDaS is incomplete. {}", wording.level_clause(level)),
    )
}

/// One placeholder per removed child, labeled `"(kind) i of N "`.
fn removed_placeholders(
    kind: EntityKind,
    removed_count: usize,
    level: ProjectPermissionLevel,
    wording: Wording,
) -> Vec<TridasGenericField> {
    (1..=removed_count)
        .map(|ordinal| {
            let label = format!("({}) {} of {} ", kind.label(), ordinal, removed_count);
            TridasGenericField::new(
                ENTITY_PLACEHOLDER_FIELD_NAME,
                format!(
                    "{label}- The entity has been removed. {}",
                    wording.level_clause(level)
                ),
            )
        })
        .collect()
}
