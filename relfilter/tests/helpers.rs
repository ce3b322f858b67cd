#![allow(dead_code)]

use relfilter::{
    Config, EntitySchema, FieldKind, FieldSchema, Registry, RelationKind, RelationSchema, Row,
    Store,
};

pub static AUTHOR: EntitySchema = EntitySchema {
    name: "Author",
    table_name: "authors",
    primary_key: &["id"],
    fields: &[
        FieldSchema {
            name: "id",
            column_name: "id",
            kind: FieldKind::Int,
            nullable: false,
            unique: true,
            autoincrement: true,
        },
        FieldSchema {
            name: "name",
            column_name: "name",
            kind: FieldKind::Text,
            nullable: false,
            unique: false,
            autoincrement: false,
        },
        FieldSchema {
            name: "nickname",
            column_name: "nickname",
            kind: FieldKind::Text,
            nullable: true,
            unique: false,
            autoincrement: false,
        },
    ],
    relations: &[RelationSchema {
        name: "books",
        target: "Book",
        kind: RelationKind::OneToMany { mapped_by: "author" },
    }],
};

pub static BOOK: EntitySchema = EntitySchema {
    name: "Book",
    table_name: "books",
    primary_key: &["isbn"],
    fields: &[
        FieldSchema {
            name: "isbn",
            column_name: "isbn",
            kind: FieldKind::Text,
            nullable: false,
            unique: true,
            autoincrement: false,
        },
        FieldSchema {
            name: "title",
            column_name: "title",
            kind: FieldKind::Text,
            nullable: false,
            unique: false,
            autoincrement: false,
        },
        FieldSchema {
            name: "pages",
            column_name: "pages",
            kind: FieldKind::Int,
            nullable: true,
            unique: false,
            autoincrement: false,
        },
        FieldSchema {
            name: "inPrint",
            column_name: "in_print",
            kind: FieldKind::Bool,
            nullable: false,
            unique: false,
            autoincrement: false,
        },
        FieldSchema {
            name: "authorId",
            column_name: "author_id",
            kind: FieldKind::Int,
            nullable: true,
            unique: false,
            autoincrement: false,
        },
    ],
    relations: &[RelationSchema {
        name: "author",
        target: "Author",
        kind: RelationKind::ManyToOne { column: "authorId" },
    }],
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn registry() -> Registry {
    Registry::new().with_schema(&AUTHOR).with_schema(&BOOK)
}

pub fn author(name: &str, nickname: Option<&str>) -> Row {
    Row::new("Author")
        .with("name", name)
        .with("nickname", nickname)
}

pub fn book(isbn: &str, title: &str, pages: Option<i64>, author_id: Option<i64>) -> Row {
    Row::new("Book")
        .with("isbn", isbn)
        .with("title", title)
        .with("pages", pages)
        .with("inPrint", true)
        .with("authorId", author_id)
}

/// Authors 1 (Ann, "annie"), 2 (Bob), 3 (Cy, no books) and five books:
///
/// | isbn | title       | pages | author |
/// |------|-------------|-------|--------|
/// | b1   | Rust 100%   | 300   | 1      |
/// | b2   | rust_basics | 120   | 1      |
/// | b3   | Go          | none  | 2      |
/// | b4   | Anonymous   | 50    | none   |
/// | b5   | RUST deep   | 900   | 2      |
pub fn library_with(config: Config) -> Store {
    let mut store = Store::with_config(registry(), config).unwrap();
    store.insert_row("Author", author("Ann", Some("annie"))).unwrap();
    store.insert_row("Author", author("Bob", None)).unwrap();
    store.insert_row("Author", author("Cy", None)).unwrap();
    store
        .insert_row("Book", book("b1", "Rust 100%", Some(300), Some(1)))
        .unwrap();
    store
        .insert_row("Book", book("b2", "rust_basics", Some(120), Some(1)))
        .unwrap();
    store
        .insert_row("Book", book("b3", "Go", None, Some(2)))
        .unwrap();
    store
        .insert_row("Book", book("b4", "Anonymous", Some(50), None))
        .unwrap();
    store
        .insert_row("Book", book("b5", "RUST deep", Some(900), Some(2)))
        .unwrap();
    store
}

pub fn library() -> Store {
    library_with(Config::default())
}

pub fn ids(store: &Store, entity: &str, filter: &serde_json::Value) -> Vec<String> {
    let schema = store.schema(entity).unwrap();
    store
        .query()
        .find(entity, filter)
        .unwrap()
        .into_iter()
        .map(|row| row.key(schema).to_string().trim_matches('"').to_string())
        .collect()
}
