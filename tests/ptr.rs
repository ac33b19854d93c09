use std::{rc::Rc, sync::Arc};

use facet::Facet;
use facet_testhelpers::test;

// ============================================================================
// Optional fields
// ============================================================================

#[test]
fn nil_source_leaves_nil_destination() {
    #[derive(Facet, Clone, Default)]
    struct Source {
        nickname: Option<String>,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Target {
        nickname: Option<String>,
    }

    #[derive(Facet, Clone, Default)]
    struct Other {
        nickname: Option<i32>,
    }

    let mut target = Target::default();
    copier::copy(&mut target, &Other { nickname: None }).unwrap();
    assert_eq!(target.nickname, None);

    // Even with the same field type, nil does not overwrite a set value.
    let mut target = Target {
        nickname: Some("kept".into()),
    };
    copier::copy(&mut target, &Source { nickname: None }).unwrap();
    assert_eq!(target.nickname.as_deref(), Some("kept"));

    copier::copy(
        &mut target,
        &Source {
            nickname: Some("new".into()),
        },
    )
    .unwrap();
    assert_eq!(target.nickname.as_deref(), Some("new"));
}

/// A nil or zero source never overwrites an optional destination.
#[test]
fn zero_source_does_not_clobber_option() {
    #[derive(Facet, Clone, Default)]
    struct Source {
        count: i64,
        label: Option<String>,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Target {
        count: Option<i32>,
        label: Option<Box<String>>,
    }

    let mut target = Target {
        count: Some(4),
        label: Some(Box::new("kept".into())),
    };
    copier::copy(
        &mut target,
        &Source {
            count: 0,
            label: None,
        },
    )
    .unwrap();

    assert_eq!(
        target,
        Target {
            count: Some(4),
            label: Some(Box::new("kept".into())),
        }
    );

    let mut empty = Target::default();
    copier::copy(&mut empty, &Source::default()).unwrap();
    assert_eq!(empty, Target::default());
}

#[test]
fn value_is_written_through_option() {
    #[derive(Facet, Clone, Default)]
    struct Source {
        count: i64,
        label: String,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Target {
        count: Option<i32>,
        label: Option<Box<String>>,
    }

    let mut target = Target::default();
    copier::copy(
        &mut target,
        &Source {
            count: 12,
            label: "new".into(),
        },
    )
    .unwrap();

    assert_eq!(target.count, Some(12));
    assert_eq!(target.label.as_deref().map(String::as_str), Some("new"));
}

/// A value that doesn't fit the pointee doesn't allocate it either.
#[test]
fn ill_fitting_value_leaves_option_nil() {
    #[derive(Facet, Clone, Default)]
    struct Source {
        count: String,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Target {
        count: Option<i64>,
    }

    let mut target = Target::default();
    copier::copy(&mut target, &Source { count: "7".into() }).unwrap();
    assert_eq!(target.count, None);
}

/// Optional source values are unwrapped into plain destinations.
#[test]
fn option_source_into_plain_field() {
    #[derive(Facet, Clone, Default)]
    struct Source {
        count: Option<u8>,
        missing: Option<u8>,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Target {
        count: u64,
        missing: u64,
    }

    let mut target = Target {
        count: 0,
        missing: 77,
    };
    copier::copy(
        &mut target,
        &Source {
            count: Some(3),
            missing: None,
        },
    )
    .unwrap();

    assert_eq!(
        target,
        Target {
            count: 3,
            missing: 77
        }
    );
}

/// Zero scalars do overwrite non-optional destinations.
#[test]
fn zero_overwrites_plain_field() {
    #[derive(Facet, Clone, Default)]
    struct Source {
        count: i32,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Target {
        count: i64,
    }

    let mut target = Target { count: 5 };
    copier::copy(&mut target, &Source { count: 0 }).unwrap();
    assert_eq!(target.count, 0);
}

#[test]
fn optional_struct_field_is_allocated_and_mapped() {
    #[derive(Facet, Clone, Default)]
    struct AddressRow {
        city: String,
    }

    #[derive(Facet, Clone, Default)]
    struct Row {
        address: AddressRow,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct AddressDto {
        city: String,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Dto {
        address: Option<AddressDto>,
    }

    let mut dto = Dto::default();
    copier::copy(
        &mut dto,
        &Row {
            address: AddressRow {
                city: "Oslo".into(),
            },
        },
    )
    .unwrap();

    assert_eq!(
        dto.address,
        Some(AddressDto {
            city: "Oslo".into()
        })
    );
}

// ============================================================================
// Box, Rc, Arc
// ============================================================================

#[test]
fn box_source_and_destination() {
    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Point {
        x: i32,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Point64 {
        x: i64,
    }

    let mut target = Box::new(Point64::default());
    copier::copy(&mut target, &Box::new(Point { x: 2 })).unwrap();
    assert_eq!(target.x, 2);
}

#[derive(Facet, Clone, Default, Debug, PartialEq)]
struct Counter {
    hits: u32,
}

#[derive(Facet)]
struct Hits {
    hits: u16,
}

/// `Rc`/`Arc` sources are followed to their pointee.
#[test]
fn shared_source_is_followed() {
    let mut counter = Counter::default();
    copier::copy(&mut counter, &Arc::new(Hits { hits: 4 })).unwrap();
    assert_eq!(counter.hits, 4);

    copier::copy(&mut counter, &Rc::new(Rc::new(Hits { hits: 5 }))).unwrap();
    assert_eq!(counter.hits, 5);
}

/// A new `Rc`/`Arc` slot can't be shared yet, so it is built and filled.
#[test]
fn fresh_rc_and_arc_elements_are_built() {
    let source = vec![Hits { hits: 1 }, Hits { hits: 2 }];

    let mut rcs: Vec<Rc<Counter>> = Vec::new();
    copier::copy(&mut rcs, &source).unwrap();
    assert_eq!(rcs.iter().map(|c| c.hits).collect::<Vec<_>>(), [1, 2]);

    let mut arcs: Vec<Arc<Counter>> = Vec::new();
    copier::copy(&mut arcs, &source).unwrap();
    assert_eq!(arcs[1].hits, 2);
}

/// Same-typed `Rc` fields are assigned, sharing the source's pointee.
#[test]
fn same_typed_rc_field_is_shared() {
    #[derive(Facet)]
    struct Source {
        counter: Rc<Counter>,
        note: &'static str,
    }

    #[derive(Facet, Clone, Default)]
    struct Holder {
        counter: Rc<Counter>,
    }

    let source = Source {
        counter: Rc::new(Counter { hits: 8 }),
        note: "shared",
    };
    let mut target = Holder::default();
    copier::copy(&mut target, &source).unwrap();

    assert!(Rc::ptr_eq(&target.counter, &source.counter));
}

/// A non-struct field that can't take the source value is skipped, even when
/// it sits behind a pointer that can't be written through.
#[test]
fn unassignable_shared_scalar_field_is_skipped() {
    #[derive(Facet)]
    struct Source {
        count: i32,
        name: String,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct Target {
        count: Rc<i64>,
        name: String,
    }

    let mut target = Target {
        count: Rc::new(3),
        name: String::new(),
    };
    copier::copy(
        &mut target,
        &Source {
            count: 9,
            name: "kept going".into(),
        },
    )
    .unwrap();

    assert_eq!(*target.count, 3);
    assert_eq!(target.name, "kept going");
}

/// References are not pointers to follow: a copy from one is a no-op.
#[test]
fn reference_source_is_not_followed() {
    static DEFAULTS: Counter = Counter { hits: 3 };

    let mut counter = Counter { hits: 1 };
    copier::copy(&mut counter, &&DEFAULTS).unwrap();
    assert_eq!(counter.hits, 1);
}
