//! Per-object load configuration
//!
//! Each remote object type carries its field allow-list, its optional
//! external-key field, typed-column hints for the dataset provider, and the
//! relation specs the resolver rewrites. `standard_objects` returns the full
//! seeded object set in dependency order.

use std::collections::HashMap;

/// Value kind hint for a typed dataset column. Columns without a hint are
/// read as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
}

/// A relationship field to rewrite before submission.
#[derive(Debug, Clone)]
pub enum RelationSpec {
    /// Direct lookup: the authored `source_field` holds a local external key
    /// of `target_object`; the resolved remote id is written to
    /// `target_field`.
    Direct {
        source_field: String,
        target_field: String,
        target_object: String,
    },
    /// Polymorphic lookup: `type_field` names the target object type and
    /// `source_field` its local external key. Only discriminators listed in
    /// `targets` are recognized.
    Polymorphic {
        type_field: String,
        source_field: String,
        target_field: String,
        targets: Vec<String>,
    },
    /// Undiscriminated parent lookup: the authored key is searched across
    /// `target_objects` in order, first hit wins. Used where authored data
    /// carries one parent column whose key space spans several object types.
    AnyOf {
        source_field: String,
        target_field: String,
        target_objects: Vec<String>,
    },
}

impl RelationSpec {
    pub fn direct(source_field: &str, target_field: &str, target_object: &str) -> Self {
        RelationSpec::Direct {
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            target_object: target_object.to_string(),
        }
    }

    pub fn polymorphic(
        type_field: &str,
        source_field: &str,
        target_field: &str,
        targets: &[&str],
    ) -> Self {
        RelationSpec::Polymorphic {
            type_field: type_field.to_string(),
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn any_of(source_field: &str, target_field: &str, target_objects: &[&str]) -> Self {
        RelationSpec::AnyOf {
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            target_objects: target_objects.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Authored columns consumed by this relation (never transmitted).
    pub fn source_columns(&self) -> Vec<&str> {
        match self {
            RelationSpec::Direct { source_field, .. } => vec![source_field],
            RelationSpec::Polymorphic {
                type_field,
                source_field,
                ..
            } => vec![type_field, source_field],
            RelationSpec::AnyOf { source_field, .. } => vec![source_field],
        }
    }
}

/// Rerun protection for object types without a deployable external-key
/// field: a query on an alternate key decides which records already exist
/// on the platform and are skipped instead of re-inserted.
#[derive(Debug, Clone)]
pub enum DedupeSpec {
    /// Skip records whose outgoing value in `field` already exists.
    ByField { field: String },
    /// Skip records whose resolved (`first`, `second`) value combination
    /// already exists. Runs after resolution, so the fields may be remote
    /// identifiers written by the resolver.
    ByFieldPair { first: String, second: String },
}

/// Load configuration for one remote object type.
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    /// Remote API name, e.g. "Account".
    pub api_name: String,
    /// Dataset file under the data directory.
    pub csv_file: String,
    /// Field carrying the local external key in authored data, when the
    /// object has a deployable external-key field.
    pub external_key_field: Option<String>,
    /// Column used as the local key when no external-key field exists.
    pub local_key_column: Option<String>,
    /// Fields safe to transmit to the platform.
    pub allowed_fields: Vec<String>,
    /// Typed-column hints for the dataset provider.
    pub field_kinds: HashMap<String, FieldKind>,
    /// Relationship fields rewritten by the resolver.
    pub relations: Vec<RelationSpec>,
    /// Alternate-key rerun protection for objects without an external key.
    pub dedupe: Option<DedupeSpec>,
}

impl ObjectSpec {
    pub fn new(api_name: &str) -> Self {
        Self {
            api_name: api_name.to_string(),
            csv_file: String::new(),
            external_key_field: None,
            local_key_column: None,
            allowed_fields: Vec::new(),
            field_kinds: HashMap::new(),
            relations: Vec::new(),
            dedupe: None,
        }
    }

    pub fn with_csv_file(mut self, file: &str) -> Self {
        self.csv_file = file.to_string();
        self
    }

    pub fn with_external_key(mut self, field: &str) -> Self {
        self.external_key_field = Some(field.to_string());
        self
    }

    pub fn keyed_by(mut self, column: &str) -> Self {
        self.local_key_column = Some(column.to_string());
        self
    }

    pub fn allow(mut self, fields: &[&str]) -> Self {
        self.allowed_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn typed(mut self, field: &str, kind: FieldKind) -> Self {
        self.field_kinds.insert(field.to_string(), kind);
        self
    }

    pub fn with_relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn dedupe_by(mut self, field: &str) -> Self {
        self.dedupe = Some(DedupeSpec::ByField {
            field: field.to_string(),
        });
        self
    }

    pub fn dedupe_by_pair(mut self, first: &str, second: &str) -> Self {
        self.dedupe = Some(DedupeSpec::ByFieldPair {
            first: first.to_string(),
            second: second.to_string(),
        });
        self
    }

    pub fn is_allowed(&self, field: &str) -> bool {
        self.allowed_fields.iter().any(|f| f == field)
    }

    /// Column holding the local external key in authored data, if any.
    pub fn key_column(&self) -> Option<&str> {
        self.external_key_field
            .as_deref()
            .or(self.local_key_column.as_deref())
    }

    pub fn kind_of(&self, field: &str) -> FieldKind {
        self.field_kinds
            .get(field)
            .copied()
            .unwrap_or(FieldKind::Text)
    }

    /// True if `field` is consumed by a relation (a lookup-only identity
    /// column that must never reach the wire).
    pub fn is_relation_source(&self, field: &str) -> bool {
        self.relations
            .iter()
            .any(|r| r.source_columns().contains(&field))
    }
}

/// The seeded object set, in dependency order: parents strictly before the
/// object types that reference them.
pub fn standard_objects() -> Vec<ObjectSpec> {
    vec![
        ObjectSpec::new("Account")
            .with_csv_file("accounts.csv")
            .with_external_key("AccountExtId__c")
            .allow(&[
                "Name",
                "Type",
                "Industry",
                "AnnualRevenue",
                "Rating",
                "BillingCity",
                "BillingState",
                "Website",
                "Description",
                "HealthScore__c",
                "ChurnRisk__c",
                "Customer_Since__c",
                "Segment__c",
                "ARR__c",
                "MRR__c",
                "Support_Tier__c",
                "Is_Gold_Client__c",
            ])
            .typed("AnnualRevenue", FieldKind::Number)
            .typed("HealthScore__c", FieldKind::Number)
            .typed("ChurnRisk__c", FieldKind::Number)
            .typed("Customer_Since__c", FieldKind::Date)
            .typed("ARR__c", FieldKind::Number)
            .typed("MRR__c", FieldKind::Number)
            .typed("Is_Gold_Client__c", FieldKind::Boolean),
        ObjectSpec::new("Contact")
            .with_csv_file("contacts.csv")
            .with_external_key("ContactExtId__c")
            .allow(&[
                "FirstName",
                "LastName",
                "Title",
                "Email",
                "Phone",
                "Department",
                "Description",
                "AccountId",
                "Role__c",
                "Decision_Role__c",
            ])
            .with_relation(RelationSpec::direct("AccountExtId__c", "AccountId", "Account")),
        ObjectSpec::new("Product2")
            .with_csv_file("products.csv")
            .with_external_key("ProductExtId__c")
            .allow(&["Name", "ProductCode", "Description", "IsActive", "Family"])
            .typed("IsActive", FieldKind::Boolean),
        ObjectSpec::new("Pricebook2")
            .with_csv_file("pricebooks.csv")
            .with_external_key("Pricebook2ExtId__c")
            .allow(&["Name", "Description", "IsActive"])
            .typed("IsActive", FieldKind::Boolean),
        ObjectSpec::new("PricebookEntry")
            .with_csv_file("pricebook_entries.csv")
            .keyed_by("PricebookEntryExtId__c")
            .allow(&[
                "Product2Id",
                "Pricebook2Id",
                "UnitPrice",
                "IsActive",
                "UseStandardPrice",
            ])
            .typed("UnitPrice", FieldKind::Number)
            .typed("IsActive", FieldKind::Boolean)
            .typed("UseStandardPrice", FieldKind::Boolean)
            .with_relation(RelationSpec::direct(
                "ProductExtId__c",
                "Product2Id",
                "Product2",
            ))
            .with_relation(RelationSpec::direct(
                "Pricebook2ExtId__c",
                "Pricebook2Id",
                "Pricebook2",
            ))
            .dedupe_by_pair("Product2Id", "Pricebook2Id"),
        ObjectSpec::new("Opportunity")
            .with_csv_file("opportunities.csv")
            .with_external_key("OpportunityExtId__c")
            .allow(&[
                "AccountId",
                "Name",
                "StageName",
                "Amount",
                "CloseDate",
                "Probability",
                "Type",
                "NextStep",
                "Description",
                "ARR__c",
                "Renewal__c",
                "Original_Opp_ExtId__c",
                "Term_Months__c",
            ])
            .typed("Amount", FieldKind::Number)
            .typed("CloseDate", FieldKind::Date)
            .typed("Probability", FieldKind::Number)
            .typed("ARR__c", FieldKind::Number)
            .typed("Renewal__c", FieldKind::Boolean)
            .typed("Term_Months__c", FieldKind::Number)
            .with_relation(RelationSpec::direct("AccountExtId__c", "AccountId", "Account")),
        // Case has no deployable external-key field; CaseExtId__c exists only
        // in authored data as the local key.
        ObjectSpec::new("Case")
            .with_csv_file("cases.csv")
            .keyed_by("CaseExtId__c")
            .allow(&[
                "AccountId",
                "ContactId",
                "Subject",
                "Description",
                "Status",
                "Priority",
                "Origin",
                "SLA_Due__c",
                "First_Response_Time_Min__c",
                "Resolve_Time_Min__c",
            ])
            .typed("SLA_Due__c", FieldKind::DateTime)
            .typed("First_Response_Time_Min__c", FieldKind::Number)
            .typed("Resolve_Time_Min__c", FieldKind::Number)
            .with_relation(RelationSpec::direct("AccountExtId__c", "AccountId", "Account"))
            .with_relation(RelationSpec::direct("ContactExtId__c", "ContactId", "Contact"))
            .dedupe_by("Subject"),
        ObjectSpec::new("Task")
            .with_csv_file("tasks.csv")
            .keyed_by("Subject")
            .allow(&[
                "Subject",
                "Status",
                "Priority",
                "ActivityDate",
                "Description",
                "WhatId",
                "WhoId",
            ])
            .typed("ActivityDate", FieldKind::Date)
            .with_relation(RelationSpec::polymorphic(
                "WhatExtId_Type",
                "WhatExtId__c",
                "WhatId",
                &["Account", "Opportunity", "Case"],
            ))
            .with_relation(RelationSpec::direct("WhoExtId__c", "WhoId", "Contact"))
            .dedupe_by("Subject"),
        // Activity records attach to one parent column whose authored keys
        // span accounts, opportunities, and cases.
        ObjectSpec::new("FeedItem")
            .with_csv_file("feed_items.csv")
            .keyed_by("Title")
            .allow(&["ParentId", "Title", "Body"])
            .with_relation(RelationSpec::any_of(
                "ParentExtId__c",
                "ParentId",
                &["Account", "Opportunity", "Case"],
            ))
            .dedupe_by("Title"),
        // ContentNote rides a two-step content flow (version insert, then
        // document link); the orchestrator routes it off the plain path.
        ObjectSpec::new("ContentNote")
            .with_csv_file("content_notes.csv")
            .keyed_by("Title")
            .allow(&["Title", "Content"])
            .with_relation(RelationSpec::any_of(
                "RelatedRecordExtId__c",
                "LinkedEntityId",
                &["Account", "Opportunity", "Case"],
            )),
        ObjectSpec::new("EmailMessage")
            .with_csv_file("email_messages.csv")
            .keyed_by("Subject")
            .allow(&[
                "ParentId",
                "Subject",
                "TextBody",
                "FromAddress",
                "ToAddress",
                "Incoming",
                "Status",
                "MessageDate",
            ])
            .typed("Incoming", FieldKind::Boolean)
            .typed("MessageDate", FieldKind::DateTime)
            .with_relation(RelationSpec::any_of(
                "ParentExtId__c",
                "ParentId",
                &["Account", "Opportunity", "Case"],
            ))
            .dedupe_by("Subject"),
    ]
}
