extern crate proc_macro;

mod entity;
mod errors;

use proc_macro::TokenStream;

/// Derive `relfilter::Entity` plus a typed filter module for a row struct.
///
/// ```ignore
/// #[derive(Entity)]
/// #[entity(name = "EntityTwo")]
/// pub struct EntityTwo {
///     #[entity(primary_key)]
///     pub field_id: String,
///     pub name: String,
///     #[entity(one_to_many = "EntityMiddle", mapped_by = "standalone2")]
///     pub middle_links: HasMany<EntityMiddle>,
/// }
///
/// // generated: entity_two::name::like("%asdf%"), entity_two::middle_links::none(vec![...])
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    entity::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
