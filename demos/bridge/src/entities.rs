use relfilter::{Entity, HasMany};

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "standalone_entity_one")]
pub struct EntityOne {
    #[entity(primary_key, autoincrement)]
    pub id: Option<i64>,
    pub name: String,
    #[entity(unique)]
    pub email: String,
}

impl EntityOne {
    /// A row whose id is assigned by the store on insert
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
        }
    }
}

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "standalone_entity_two")]
pub struct EntityTwo {
    #[entity(primary_key)]
    pub field_id: String,
    pub some_boolean_flag: bool,
    pub name: String,
    #[entity(one_to_many = "EntityMiddle", mapped_by = "standalone2")]
    pub middle_links: HasMany<EntityMiddle>,
}

impl EntityTwo {
    pub fn new(field_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            some_boolean_flag: true,
            name: name.into(),
            middle_links: HasMany::new(),
        }
    }

    pub fn flag(mut self, some_boolean_flag: bool) -> Self {
        self.some_boolean_flag = some_boolean_flag;
        self
    }
}

/// Link row between [`EntityOne`] and [`EntityTwo`], keyed by both references
#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "an_entity_in_the_middle")]
pub struct EntityMiddle {
    #[entity(primary_key, many_to_one = "EntityOne")]
    pub standalone1: i64,
    #[entity(primary_key, many_to_one = "EntityTwo")]
    pub standalone2: String,
    pub arbitrary_data: Option<String>,
}

impl EntityMiddle {
    pub fn new(standalone1: i64, standalone2: impl Into<String>) -> Self {
        Self {
            standalone1,
            standalone2: standalone2.into(),
            arbitrary_data: None,
        }
    }

    pub fn data(mut self, arbitrary_data: impl Into<String>) -> Self {
        self.arbitrary_data = Some(arbitrary_data.into());
        self
    }
}
