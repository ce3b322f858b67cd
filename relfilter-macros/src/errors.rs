//! Error messages for misconfigured `#[derive(Entity)]` input

use proc_macro2::Span;

#[derive(Debug, thiserror::Error)]
pub enum EntityDeriveError {
    #[error("#[derive(Entity)] only supports structs with named fields")]
    NotNamedStruct,

    #[error("No primary key field found in entity '{entity}'.\n\nMark a field with #[entity(primary_key)] or name it 'id'.\n\nExample:\n    #[entity(primary_key)]\n    field_id: String,")]
    NoPrimaryKey { entity: String },

    #[error("Unsupported field type '{ty}' for field '{field}'. Supported types: bool, i32, i64, u32, String, Option<T> of those, and HasMany<T> with #[entity(one_to_many = \"...\")].")]
    UnsupportedFieldType { field: String, ty: String },

    #[error("Relation '{field}' needs a mapped_by attribute naming the many-to-one field on '{target}'.\n\nExample:\n    #[entity(one_to_many = \"{target}\", mapped_by = \"owner\")]")]
    MissingMappedBy { field: String, target: String },

    #[error("Field '{field}' cannot be both many_to_one and one_to_many")]
    ConflictingRelation { field: String },

    #[error("autoincrement field '{field}' must be an integer")]
    AutoincrementNotInteger { field: String },
}

impl EntityDeriveError {
    pub fn into_syn(self, span: Span) -> syn::Error {
        syn::Error::new(span, self.to_string())
    }
}
