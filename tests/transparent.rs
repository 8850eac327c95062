use std::num::NonZeroU32;

use facet::Facet;
use facet_form::{FormErrorKind, FormValues};
use indoc::indoc;

fn form(fixture: &str) -> FormValues {
    fixture
        .lines()
        .filter_map(|line| line.split_once('='))
        .collect()
}

#[derive(Facet, Debug, PartialEq, Default, Clone, Copy)]
#[facet(transparent)]
struct UserId(u64);

#[test]
fn newtype_decodes_as_its_inner_type() {
    #[derive(Facet, Debug, PartialEq)]
    struct Grant {
        user: UserId,
        role: String,
    }

    let values = form(indoc! {"
        user=42
        role=admin
    "});

    let grant: Grant = facet_form::from_form(&values).unwrap();
    assert_eq!(
        grant,
        Grant {
            user: UserId(42),
            role: "admin".to_string(),
        }
    );
}

#[test]
fn missing_newtype_takes_default() {
    #[derive(Facet, Debug, PartialEq)]
    struct Grant {
        user: UserId,
    }

    let grant: Grant = facet_form::from_form(&FormValues::new()).unwrap();
    assert_eq!(grant.user, UserId(0));
}

#[test]
fn list_of_newtypes() {
    #[derive(Facet, Debug, PartialEq)]
    struct Invite {
        users: Vec<UserId>,
    }

    let values = form(indoc! {"
        users=1
        users=2
    "});

    let invite: Invite = facet_form::from_form(&values).unwrap();
    assert_eq!(invite.users, [UserId(1), UserId(2)]);
}

#[test]
fn optional_newtype() {
    #[derive(Facet, Debug, PartialEq)]
    struct Filter {
        owner: Option<UserId>,
    }

    let filter: Filter = facet_form::from_form(&FormValues::new()).unwrap();
    assert_eq!(filter.owner, None);

    let filter: Filter = facet_form::from_form(&form("owner=9")).unwrap();
    assert_eq!(filter.owner, Some(UserId(9)));
}

#[test]
fn invalid_newtype_value() {
    #[derive(Facet, Debug)]
    struct Grant {
        user: UserId,
    }

    let err = facet_form::from_form::<Grant, _>(&form("user=abc")).unwrap_err();
    let FormErrorKind::FieldConversion { path, value, .. } = err.kind() else {
        panic!("unexpected error kind: {:?}", err.kind());
    };
    assert_eq!(path, "user");
    assert_eq!(value, "abc");

    let err = facet_form::from_form::<Grant, _>(&form("user=-1")).unwrap_err();
    assert_eq!(err.path(), Some("user"));
}

#[test]
fn non_zero() {
    #[derive(Facet, Debug, PartialEq)]
    struct Pagination {
        per_page: NonZeroU32,
        pages: Vec<NonZeroU32>,
    }

    let values = form(indoc! {"
        per_page=7
        pages=1
        pages=3
    "});

    let pagination: Pagination = facet_form::from_form(&values).unwrap();
    assert_eq!(pagination.per_page.get(), 7);
    assert_eq!(
        pagination.pages.iter().map(|p| p.get()).collect::<Vec<_>>(),
        [1, 3]
    );
}

#[test]
fn zero_for_non_zero() {
    #[derive(Facet, Debug)]
    struct Pagination {
        per_page: NonZeroU32,
    }

    let err = facet_form::from_form::<Pagination, _>(&form("per_page=0")).unwrap_err();
    let FormErrorKind::FieldConversion { path, value, .. } = err.kind() else {
        panic!("unexpected error kind: {:?}", err.kind());
    };
    assert_eq!(path, "per_page");
    assert_eq!(value, "0");

    #[derive(Facet, Debug)]
    struct Pages {
        pages: Vec<NonZeroU32>,
    }

    let values = form(indoc! {"
        pages=2
        pages=0
    "});
    let err = facet_form::from_form::<Pages, _>(&values).unwrap_err();
    assert_eq!(err.path(), Some("pages"));
}

#[derive(Facet, Debug, PartialEq, Default, Clone)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Facet, Debug, PartialEq, Default)]
#[facet(transparent)]
struct Anchor(Point);

#[test]
fn transparent_struct_uses_nested_keys() {
    #[derive(Facet, Debug, PartialEq)]
    struct Canvas {
        origin: Anchor,
    }

    let values = form(indoc! {"
        origin.x=5
        origin.y=-2
    "});

    let canvas: Canvas = facet_form::from_form(&values).unwrap();
    assert_eq!(canvas.origin, Anchor(Point { x: 5, y: -2 }));
}

#[test]
fn list_of_transparent_structs() {
    #[derive(Facet, Debug, PartialEq)]
    struct Route {
        points: Vec<Anchor>,
        label: Option<Anchor>,
    }

    let values = form(indoc! {"
        points[0].x=1
        points[1].y=2
    "});

    let route: Route = facet_form::from_form(&values).unwrap();
    assert_eq!(
        route.points,
        [Anchor(Point { x: 1, y: 0 }), Anchor(Point { x: 0, y: 2 })]
    );
    assert_eq!(route.label, None);
}
