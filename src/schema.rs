//! Content schema catalog: which resource types carry translatable fields and
//! the constraints each field imposes.
//!
//! Every resource route only names its entity type and field; length and
//! presence rules come from here, so the translation engine stays generic.

use crate::i18n::FieldConstraint;
use serde::Serialize;

/// One translatable field of a resource type.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub constraint: FieldConstraint,
}

/// A resource type and its translatable fields.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    pub entity_type: &'static str,
    pub fields: &'static [FieldSpec],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.constraint.required)
    }
}

/// The catalog of all resource types with translatable content.
#[derive(Debug)]
pub struct ContentSchema {
    entities: &'static [EntitySchema],
}

static SCHEMA: ContentSchema = ContentSchema { entities: ENTITIES };

impl ContentSchema {
    pub fn get() -> &'static ContentSchema {
        &SCHEMA
    }

    pub fn entity(&self, entity_type: &str) -> Option<&'static EntitySchema> {
        self.entities
            .iter()
            .find(|entity| entity.entity_type == entity_type)
    }

    pub fn list_all(&self) -> &'static [EntitySchema] {
        self.entities
    }
}

const fn field(name: &'static str, constraint: FieldConstraint) -> FieldSpec {
    FieldSpec { name, constraint }
}

const TITLE: FieldConstraint = FieldConstraint::required(200).with_min_length(2);
const NAME: FieldConstraint = FieldConstraint::required(150).with_min_length(2);
const LABEL: FieldConstraint = FieldConstraint::required(80);
const SUMMARY: FieldConstraint = FieldConstraint::optional(500);
const BODY: FieldConstraint = FieldConstraint::optional(20_000);
const DESCRIPTION: FieldConstraint = FieldConstraint::optional(10_000);
const SHORT_TEXT: FieldConstraint = FieldConstraint::optional(255);

const ENTITIES: &[EntitySchema] = &[
    EntitySchema {
        entity_type: "events",
        fields: &[
            field("title", TITLE),
            field("summary", SUMMARY),
            field("description", DESCRIPTION),
            field("venue", SHORT_TEXT),
            field("organizer", SHORT_TEXT),
        ],
    },
    EntitySchema {
        entity_type: "artworks",
        fields: &[
            field("title", TITLE),
            field("description", DESCRIPTION),
            field("technique", SHORT_TEXT),
            field("period", SHORT_TEXT),
        ],
    },
    EntitySchema {
        entity_type: "artisans",
        fields: &[
            field("name", NAME),
            field("biography", DESCRIPTION),
            field("specialty", SHORT_TEXT),
        ],
    },
    EntitySchema {
        entity_type: "crafts",
        fields: &[
            field("name", NAME),
            field("description", DESCRIPTION),
            field("materials", SHORT_TEXT),
        ],
    },
    EntitySchema {
        entity_type: "places",
        fields: &[
            field("name", NAME),
            field("description", DESCRIPTION),
            field("address", SHORT_TEXT),
            field("access_info", SUMMARY),
        ],
    },
    EntitySchema {
        entity_type: "monuments",
        fields: &[
            field("name", NAME),
            field("history", BODY),
            field("description", DESCRIPTION),
            field("classification", SHORT_TEXT),
        ],
    },
    EntitySchema {
        entity_type: "museums",
        fields: &[
            field("name", NAME),
            field("description", DESCRIPTION),
            field("opening_hours", SHORT_TEXT),
        ],
    },
    EntitySchema {
        entity_type: "exhibitions",
        fields: &[
            field("title", TITLE),
            field("summary", SUMMARY),
            field("description", DESCRIPTION),
            field("curator_note", DESCRIPTION),
        ],
    },
    EntitySchema {
        entity_type: "collections",
        fields: &[field("title", TITLE), field("description", DESCRIPTION)],
    },
    EntitySchema {
        entity_type: "articles",
        fields: &[
            field("title", TITLE),
            field("summary", SUMMARY),
            field("body", BODY),
        ],
    },
    EntitySchema {
        entity_type: "news",
        fields: &[
            field("title", TITLE),
            field("summary", SUMMARY),
            field("body", BODY),
        ],
    },
    EntitySchema {
        entity_type: "personalities",
        fields: &[
            field("name", NAME),
            field("biography", BODY),
            field("epithet", SHORT_TEXT),
        ],
    },
    EntitySchema {
        entity_type: "categories",
        fields: &[field("name", LABEL), field("description", SUMMARY)],
    },
    EntitySchema {
        entity_type: "tags",
        fields: &[field("label", LABEL)],
    },
    EntitySchema {
        entity_type: "routes",
        fields: &[
            field("title", TITLE),
            field("description", DESCRIPTION),
            field("itinerary", BODY),
        ],
    },
];
