use bridge::*;
use relfilter::{and, compare, compare_json, not, ErrorKind, Filter, FindOptions, Key, SortOrder, Store};
use serde_json::json;

#[path = "helpers.rs"]
mod helpers;

mod reproduction_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_all_forms_accepted_without_links() {
        init_logging();
        let store = reproduction_store(None).unwrap();
        for (label, filter) in reproduction_filters() {
            assert_eq!(two_ids(&store, &filter), vec!["t1"], "{}", label);
        }
    }

    #[test]
    fn test_all_forms_exclude_matching_link() {
        init_logging();
        let store = reproduction_store(Some("x")).unwrap();
        for (label, filter) in reproduction_filters() {
            assert!(two_ids(&store, &filter).is_empty(), "{}", label);
        }
    }

    #[test]
    fn test_all_forms_agree_pairwise() {
        init_logging();
        let stores = vec![
            reproduction_store(None).unwrap(),
            reproduction_store(Some("x")).unwrap(),
            mixed_store(),
        ];
        let filters = reproduction_filters();
        for store in &stores {
            let query = store.query();
            for (left_label, left) in &filters {
                for (right_label, right) in &filters {
                    let comparison = compare_json(&query, "EntityTwo", left, right).unwrap();
                    assert!(
                        comparison.is_equivalent(),
                        "{} vs {}: {}",
                        left_label,
                        right_label,
                        comparison
                    );
                }
            }
        }
    }

    #[test]
    fn test_mixed_store_selection() {
        init_logging();
        let store = mixed_store();
        // t2 has a data link to one 1, t3's link to one 1 has no data, t4 is
        // flagged off and t5 fails the case-sensitive $like
        assert_eq!(two_ids(&store, &none_at_top_level()), vec!["t1", "t3"]);
    }

    #[test]
    fn test_link_without_data_does_not_exclude() {
        init_logging();
        let mut store = reproduction_store(None).unwrap();
        store.insert(EntityMiddle::new(1, "t1")).unwrap();
        for (label, filter) in reproduction_filters() {
            assert_eq!(two_ids(&store, &filter), vec!["t1"], "{}", label);
        }
    }

    #[test]
    fn test_link_to_other_entity_one_does_not_exclude() {
        init_logging();
        let mut store = reproduction_store(None).unwrap();
        store
            .insert(EntityOne::new("two", "two@example.com"))
            .unwrap();
        store.insert(EntityMiddle::new(2, "t1").data("x")).unwrap();
        for (label, filter) in reproduction_filters() {
            assert_eq!(two_ids(&store, &filter), vec!["t1"], "{}", label);
        }
    }
}

mod scenario_tests {
    use super::helpers::*;
    use super::*;

    fn scenario_filter() -> serde_json::Value {
        json!({
            "$and": [
                { "someBooleanFlag": true },
                { "name": { "$like": "%asdf%" } }
            ],
            "middleLinks": { "$none": { "arbitraryData": { "$ne": null } } }
        })
    }

    #[test]
    fn test_vacuous_none_on_empty_collection() {
        init_logging();
        let store = reproduction_store(None).unwrap();
        assert_eq!(two_ids(&store, &scenario_filter()), vec!["t1"]);
    }

    #[test]
    fn test_matching_link_excludes_row() {
        init_logging();
        let store = reproduction_store(Some("x")).unwrap();
        assert!(two_ids(&store, &scenario_filter()).is_empty());

        let rewritten = json!({
            "$not": { "middleLinks": { "$some": { "arbitraryData": { "$ne": null } } } }
        });
        assert!(two_ids(&store, &rewritten).is_empty());
    }

    #[test]
    fn test_ilike_double_percent_matches_any_name() {
        init_logging();
        let store = mixed_store();
        assert_eq!(
            two_ids(&store, &json!({ "name": { "$ilike": "%%" } })),
            vec!["t1", "t2", "t3", "t4", "t5"]
        );
    }

    #[test]
    fn test_like_case_sensitivity_on_store() {
        init_logging();
        let store = mixed_store();
        assert_eq!(
            two_ids(&store, &json!({ "name": { "$like": "%asdf%" } })),
            vec!["t1", "t2", "t3", "t4"]
        );
        assert_eq!(
            two_ids(&store, &json!({ "name": { "$ilike": "%asdf%" } })),
            vec!["t1", "t2", "t3", "t4", "t5"]
        );
        assert_eq!(
            two_ids(&store, &json!({ "name": { "$like": "ASDF" } })),
            vec!["t5"]
        );
    }

    #[test]
    fn test_relation_key_position_does_not_matter() {
        init_logging();
        let store = mixed_store();
        let sub = json!({ "arbitraryData": { "$ne": null } });
        let forms = vec![
            json!({ "middleLinks": { "$none": sub } }),
            json!({ "$and": [{ "middleLinks": { "$none": sub } }] }),
            json!({ "$and": [{ "$and": [{ "middleLinks": { "$none": sub } }] }] }),
            json!({ "$not": { "middleLinks": { "$some": sub } } }),
            json!({ "$and": [{ "$not": { "middleLinks": { "$some": sub } } }] }),
            json!({ "$not": { "$not": { "$not": { "middleLinks": { "$some": sub } } } } }),
            json!({ "$or": [{ "middleLinks": { "$none": sub } }] }),
        ];
        for form in &forms {
            assert_eq!(two_ids(&store, form), vec!["t1", "t5"], "{}", form);
        }
    }

    #[test]
    fn test_transitive_reference_traversal() {
        init_logging();
        let store = mixed_store();
        let by_one_name = json!({
            "middleLinks": { "$some": { "standalone1": { "name": "one2" } } }
        });
        assert_eq!(two_ids(&store, &by_one_name), vec!["t3"]);

        // A reference compared by its stored key
        let by_key = json!({ "middleLinks": { "$some": { "standalone1": 3 } } });
        assert_eq!(two_ids(&store, &by_key), vec!["t4"]);

        // Back through standalone2 to the owning row
        let round_trip = json!({
            "middleLinks": { "$some": { "standalone2": { "someBooleanFlag": false } } }
        });
        assert_eq!(two_ids(&store, &round_trip), vec!["t4"]);
    }

    #[test]
    fn test_implicit_some_and_every() {
        init_logging();
        let store = mixed_store();
        let implicit = json!({ "middleLinks": { "arbitraryData": "y" } });
        assert_eq!(two_ids(&store, &implicit), vec!["t3"]);

        // Vacuously true for t1
        let every = json!({ "middleLinks": { "$every": { "arbitraryData": { "$ne": null } } } });
        assert_eq!(two_ids(&store, &every), vec!["t1", "t2", "t4", "t5"]);
    }
}

mod typed_builder_tests {
    use super::helpers::*;
    use super::*;

    fn typed_none() -> Filter {
        and(vec![
            entity_two::some_boolean_flag::equals(true),
            entity_two::name::like("%asdf%"),
            entity_two::middle_links::none(vec![
                entity_middle::standalone1::is(vec![entity_one::id::equals(1)]),
                entity_middle::arbitrary_data::is_not_null(),
            ]),
        ])
    }

    fn typed_not_some() -> Filter {
        and(vec![
            entity_two::some_boolean_flag::equals(true),
            entity_two::name::like("%asdf%"),
            not(entity_two::middle_links::some(vec![
                entity_middle::standalone1::is(vec![entity_one::id::equals(1)]),
                not(entity_middle::arbitrary_data::is_null()),
            ])),
        ])
    }

    #[test]
    fn test_typed_filters_match_json_forms() {
        init_logging();
        for store in [reproduction_store(None).unwrap(), mixed_store()] {
            let query = store.query();
            let parsed = query.parse("EntityTwo", &none_inside_and()).unwrap();
            for typed in [typed_none(), typed_not_some()] {
                let comparison = compare(&query, "EntityTwo", &typed, &parsed).unwrap();
                assert!(comparison.is_equivalent(), "{}", comparison);
            }
        }
    }

    #[test]
    fn test_typed_filter_renders_parseable_json() {
        init_logging();
        let store = mixed_store();
        let query = store.query();
        let typed = typed_none();
        let reparsed = query.parse("EntityTwo", &typed.to_json()).unwrap();
        assert_eq!(
            query.keys("EntityTwo", &typed).unwrap(),
            query.keys("EntityTwo", &reparsed).unwrap()
        );
    }

    #[test]
    fn test_range_and_membership_operators() {
        init_logging();
        let store = mixed_store();
        let query = store.query();
        let keys = query
            .keys("EntityOne", &entity_one::id::gte(2))
            .unwrap();
        assert_eq!(keys, vec![Key::single(2i64), Key::single(3i64)]);

        let keys = query
            .keys("EntityOne", &entity_one::name::in_vec(vec!["one1", "one3"]))
            .unwrap();
        assert_eq!(keys, vec![Key::single(1i64), Key::single(3i64)]);

        let count = query
            .count("EntityMiddle", &entity_middle::standalone2::not_in_vec(vec!["t3"]))
            .unwrap();
        assert_eq!(count, 2);
    }
}

mod store_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_autoincrement_and_unique_email() {
        init_logging();
        let mut store = new_store().unwrap();
        let first = store.insert(EntityOne::new("a", "a@example.com")).unwrap();
        let second = store.insert(EntityOne::new("b", "b@example.com")).unwrap();
        assert_eq!(first, Key::single(1i64));
        assert_eq!(second, Key::single(2i64));

        let err = store
            .insert(EntityOne::new("c", "a@example.com"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UniqueViolation);
        assert_eq!(store.len("EntityOne").unwrap(), 2);
    }

    #[test]
    fn test_composite_key_and_references() {
        init_logging();
        let mut store = reproduction_store(Some("x")).unwrap();

        let err = store.insert(EntityMiddle::new(1, "t1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        let err = store.insert(EntityMiddle::new(9, "t1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);

        let err = store.insert(EntityMiddle::new(1, "missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);

        let key = Key(vec![1i64.into(), "t1".into()]);
        assert!(store.get("EntityMiddle", &key).unwrap().is_some());
        assert_eq!(key.to_string(), "(1, \"t1\")");
    }

    #[test]
    fn test_insert_json_accepts_column_names() {
        init_logging();
        let mut store = reproduction_store(None).unwrap();
        store
            .insert_json(
                "EntityTwo",
                &json!({ "field_id": "t2", "some_boolean_flag": false, "name": "other" }),
            )
            .unwrap();
        store
            .insert_json(
                "EntityMiddle",
                &json!({ "standalone1": 1, "standalone2": "t2", "arbitraryData": null }),
            )
            .unwrap();
        assert_eq!(two_ids(&store, &json!({ "someBooleanFlag": false })), vec!["t2"]);

        let err = store
            .insert_json("EntityTwo", &json!({ "fieldId": "t3", "name": "no flag" }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[test]
    fn test_find_with_ordering_and_pagination() {
        init_logging();
        let store = mixed_store();
        let options = FindOptions::new()
            .order_by("name", SortOrder::Desc)
            .offset(1)
            .limit(2);
        let rows = store
            .query()
            .find_with("EntityTwo", &json!({}), &options)
            .unwrap();
        let names: Vec<_> = rows
            .iter()
            .map(|row| row.get("name").unwrap().as_str().unwrap())
            .collect();
        // Descending: xasdf, asdfg, asdfASDF, asdf, ASDF
        assert_eq!(names, vec!["asdfg", "asdfASDF"]);
    }
}

mod error_tests {
    use super::helpers::*;
    use super::*;

    fn parse_error(filter: serde_json::Value) -> ErrorKind {
        let store = mixed_store();
        let err = store.find("EntityTwo", &filter).unwrap_err();
        assert!(err.is_filter_error(), "{}", err);
        err.kind()
    }

    #[test]
    fn test_schema_mismatch() {
        init_logging();
        assert_eq!(parse_error(json!({ "nope": 1 })), ErrorKind::SchemaMismatch);
        assert_eq!(
            parse_error(json!({ "middleLinks": { "$none": { "name": "x" } } })),
            ErrorKind::SchemaMismatch
        );
        assert_eq!(
            parse_error(json!({ "middleLinks": { "$some": { "standalone1": { "nope": 1 } } } })),
            ErrorKind::SchemaMismatch
        );
    }

    #[test]
    fn test_unknown_operator() {
        init_logging();
        assert_eq!(parse_error(json!({ "$xor": [] })), ErrorKind::UnknownOperator);
        assert_eq!(
            parse_error(json!({ "name": { "$regex": "a" } })),
            ErrorKind::UnknownOperator
        );
        assert_eq!(
            parse_error(json!({ "middleLinks": { "$any": {} } })),
            ErrorKind::UnknownOperator
        );
    }

    #[test]
    fn test_invalid_filter_shape() {
        init_logging();
        assert_eq!(
            parse_error(json!({ "middleLinks": { "$none": 5 } })),
            ErrorKind::InvalidFilterShape
        );
        assert_eq!(
            parse_error(json!({ "middleLinks": { "$none": {}, "arbitraryData": "x" } })),
            ErrorKind::InvalidFilterShape
        );
        assert_eq!(parse_error(json!({ "$and": {} })), ErrorKind::InvalidFilterShape);
        assert_eq!(parse_error(json!({ "$some": {} })), ErrorKind::InvalidFilterShape);
        assert_eq!(parse_error(json!([])), ErrorKind::InvalidFilterShape);
    }

    #[test]
    fn test_like_on_boolean_is_type_mismatch() {
        init_logging();
        let store = mixed_store();
        let filter = entity_two::name::like("%");
        assert!(store.query().evaluate("EntityTwo", &filter).is_ok());

        let err = store
            .query()
            .evaluate("EntityTwo", &Filter::like("someBooleanFlag", "%"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_errors_do_not_depend_on_data() {
        init_logging();
        // The bad branch is never reached on an empty store, but is still rejected
        let store = new_store().unwrap();
        let filter = json!({ "$or": [{ "someBooleanFlag": true }, { "nope": 1 }] });
        let err = store.query().find("EntityTwo", &filter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }
}
