use std::{collections::HashMap, error::Error, num::ParseIntError};

use facet::Facet;
use facet_form::{FormBinder, FormErrorKind, FormValues, ScalarKind, ScalarParseError};
use indoc::indoc;

fn form(fixture: &str) -> FormValues {
    fixture
        .lines()
        .filter_map(|line| line.split_once('='))
        .collect()
}

#[test]
fn unparseable_integer() {
    #[derive(Facet, Debug, PartialEq)]
    struct Person {
        #[facet(rename = "Name")]
        name: String,
        #[facet(rename = "Age")]
        age: i64,
    }

    let values = form(indoc! {"
        Name=Alice
        Age=abc
    "});

    let err = facet_form::from_form::<Person, _>(&values).unwrap_err();
    assert_eq!(err.path(), Some("Age"));

    let FormErrorKind::FieldConversion {
        path,
        value,
        target,
        ..
    } = err.kind()
    else {
        panic!("unexpected error kind: {:?}", err.kind());
    };
    assert_eq!(path, "Age");
    assert_eq!(value, "abc");
    assert_eq!(*target, "i64");

    let message = err.to_string();
    assert!(message.contains("'Age'"), "{message}");
    assert!(message.contains("\"abc\""), "{message}");
}

#[test]
fn source_chain_reaches_std_parse_error() {
    #[derive(Facet, Debug)]
    struct Limits {
        max: u8,
    }

    let err = facet_form::from_form::<Limits, _>(&form("max=300")).unwrap_err();

    let scalar = err
        .source()
        .and_then(|source| source.downcast_ref::<ScalarParseError>())
        .expect("a scalar parse error");
    assert_eq!(scalar.kind(), ScalarKind::U8);
    assert_eq!(scalar.value(), "300");
    assert!(
        scalar
            .source()
            .and_then(|source| source.downcast_ref::<ParseIntError>())
            .is_some()
    );
}

#[test]
fn invalid_bool_spelling() {
    #[derive(Facet, Debug)]
    struct Consent {
        accepted: bool,
    }

    let err = facet_form::from_form::<Consent, _>(&form("accepted=yes")).unwrap_err();
    assert_eq!(err.path(), Some("accepted"));
    assert!(err.to_string().contains("invalid bool value"));
}

#[test]
fn negative_value_for_unsigned_field() {
    #[derive(Facet, Debug)]
    struct Stock {
        count: u32,
    }

    let err = facet_form::from_form::<Stock, _>(&form("count=-1")).unwrap_err();
    assert_eq!(err.path(), Some("count"));
}

#[test]
fn char_needs_exactly_one_character() {
    #[derive(Facet, Debug)]
    struct Grade {
        letter: char,
    }

    let err = facet_form::from_form::<Grade, _>(&form("letter=AB")).unwrap_err();
    assert_eq!(err.path(), Some("letter"));
}

#[test]
fn first_failure_in_declaration_order() {
    #[derive(Facet, Debug)]
    struct Dimensions {
        width: u32,
        height: u32,
    }

    let values = form(indoc! {"
        height=tall
        width=wide
    "});

    let err = facet_form::from_form::<Dimensions, _>(&values).unwrap_err();
    assert_eq!(err.path(), Some("width"));
}

#[test]
fn nested_failure_reports_full_key() {
    #[derive(Facet, Debug)]
    struct Order {
        lines: Vec<Line>,
    }

    #[derive(Facet, Debug)]
    struct Line {
        product: Product,
    }

    #[derive(Facet, Debug)]
    struct Product {
        quantity: u16,
    }

    let values = form(indoc! {"
        lines[0].product.quantity=1
        lines[1].product.quantity=lots
    "});

    let err = facet_form::from_form::<Order, _>(&values).unwrap_err();
    assert_eq!(err.path(), Some("lines[1].product.quantity"));
}

#[test]
fn failure_in_scalar_list_element() {
    #[derive(Facet, Debug)]
    struct Ratings {
        stars: Vec<u8>,
    }

    let values = form(indoc! {"
        stars=5
        stars=five
    "});

    let err = facet_form::from_form::<Ratings, _>(&values).unwrap_err();
    let FormErrorKind::FieldConversion { path, value, .. } = err.kind() else {
        panic!("unexpected error kind: {:?}", err.kind());
    };
    assert_eq!(path, "stars");
    assert_eq!(value, "five");
}

#[test]
fn non_struct_target() {
    let err = facet_form::from_form::<u32, _>(&form("value=1")).unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::InvalidTarget(_)));
    assert_eq!(err.path(), None);
    assert!(err.to_string().contains("target must be a struct"));

    let err = facet_form::from_form::<Vec<String>, _>(&FormValues::new()).unwrap_err();
    assert!(matches!(err.kind(), FormErrorKind::InvalidTarget(_)));
}

#[test]
fn failed_bind_into_leaves_target_untouched() {
    #[derive(Facet, Debug, PartialEq)]
    struct Profile {
        name: String,
        age: u8,
    }

    let mut profile = Profile {
        name: "Ada".to_string(),
        age: 36,
    };

    let values = form(indoc! {"
        name=Grace
        age=old
    "});

    let result = FormBinder::new().bind_into(&mut profile, &values);
    assert!(result.is_err());
    assert_eq!(
        profile,
        Profile {
            name: "Ada".to_string(),
            age: 36,
        }
    );
}

#[test]
fn unsupported_field_type_keeps_its_default() {
    #[derive(Facet, Debug, PartialEq)]
    struct Upload {
        title: String,
        metadata: HashMap<String, String>,
    }

    let values = form(indoc! {"
        title=report.pdf
        metadata=pages:3
    "});

    let upload: Upload = facet_form::from_form(&values).unwrap();
    assert_eq!(upload.title, "report.pdf");
    assert!(upload.metadata.is_empty());
}
