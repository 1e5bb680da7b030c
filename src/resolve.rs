//! Foreign key resolution
//!
//! Rewrites a record's relationship fields from local external keys to
//! platform identifiers via the directory. A reference that cannot be
//! resolved aborts only that record; the rest of the batch proceeds.

use thiserror::Error;

use crate::directory::ExternalKeyDirectory;
use crate::object::{ObjectSpec, RelationSpec};
use crate::record::{CandidateRecord, FieldMap, FieldValue};

/// A reference that named a key with no directory entry, or a polymorphic
/// discriminator outside the recognized target set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolved reference via {field}: no {target_object} with key '{missing_key}'")]
pub struct UnresolvedReference {
    pub field: String,
    pub target_object: String,
    pub missing_key: String,
}

fn take_text(fields: &mut FieldMap, name: &str) -> Option<String> {
    match fields.remove(name) {
        Some(FieldValue::Text(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Resolve every relation on a candidate record. On success the returned
/// field map has lookup columns consumed and target id fields written; on
/// failure the record must be excluded from submission (never sent).
pub fn resolve_relations(
    spec: &ObjectSpec,
    record: &CandidateRecord,
    directory: &ExternalKeyDirectory,
) -> Result<FieldMap, UnresolvedReference> {
    let mut fields = record.fields.clone();

    for relation in &spec.relations {
        match relation {
            RelationSpec::Direct {
                source_field,
                target_field,
                target_object,
            } => {
                // An absent reference is not an error; only an authored key
                // that fails lookup is.
                let Some(key) = take_text(&mut fields, source_field) else {
                    continue;
                };
                match directory.lookup(target_object, &key) {
                    Some(remote_id) => {
                        fields.insert(target_field.clone(), FieldValue::text(remote_id));
                    }
                    None => {
                        return Err(UnresolvedReference {
                            field: source_field.clone(),
                            target_object: target_object.clone(),
                            missing_key: key,
                        });
                    }
                }
            }
            RelationSpec::Polymorphic {
                type_field,
                source_field,
                target_field,
                targets,
            } => {
                let discriminator = take_text(&mut fields, type_field);
                let key = take_text(&mut fields, source_field);
                let (Some(discriminator), Some(key)) = (discriminator, key) else {
                    continue;
                };
                if !targets.iter().any(|t| t == &discriminator) {
                    // An unrecognized discriminator is indistinguishable from
                    // a missing parent: there is no sub-map to look in.
                    return Err(UnresolvedReference {
                        field: source_field.clone(),
                        target_object: discriminator,
                        missing_key: key,
                    });
                }
                match directory.lookup(&discriminator, &key) {
                    Some(remote_id) => {
                        fields.insert(target_field.clone(), FieldValue::text(remote_id));
                    }
                    None => {
                        return Err(UnresolvedReference {
                            field: source_field.clone(),
                            target_object: discriminator,
                            missing_key: key,
                        });
                    }
                }
            }
            RelationSpec::AnyOf {
                source_field,
                target_field,
                target_objects,
            } => {
                let Some(key) = take_text(&mut fields, source_field) else {
                    continue;
                };
                match target_objects
                    .iter()
                    .find_map(|object| directory.lookup(object, &key))
                {
                    Some(remote_id) => {
                        fields.insert(target_field.clone(), FieldValue::text(remote_id));
                    }
                    None => {
                        return Err(UnresolvedReference {
                            field: source_field.clone(),
                            target_object: target_objects.join(" or "),
                            missing_key: key,
                        });
                    }
                }
            }
        }
    }

    Ok(fields)
}
