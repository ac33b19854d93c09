use facet::Facet;
use facet_testhelpers::test;

// ============================================================================
// Vec destinations
// ============================================================================

#[derive(Facet, Clone, Default)]
struct Row {
    id: i64,
    name: String,
}

#[derive(Facet, Clone, Default, Debug, PartialEq)]
struct Dto {
    id: i32,
    name: String,
}

fn rows() -> Vec<Row> {
    vec![
        Row {
            id: 1,
            name: "a".into(),
        },
        Row {
            id: 2,
            name: "b".into(),
        },
        Row {
            id: 3,
            name: "c".into(),
        },
    ]
}

#[test]
fn each_element_is_mapped() {
    let mut dtos: Vec<Dto> = Vec::new();
    copier::copy(&mut dtos, &rows()).unwrap();

    assert_eq!(
        dtos,
        vec![
            Dto {
                id: 1,
                name: "a".into()
            },
            Dto {
                id: 2,
                name: "b".into()
            },
            Dto {
                id: 3,
                name: "c".into()
            },
        ]
    );
}

/// A single record into a list destination yields one element.
#[test]
fn single_source_is_wrapped() {
    let mut dtos: Vec<Dto> = Vec::new();
    copier::copy(
        &mut dtos,
        &Row {
            id: 9,
            name: "solo".into(),
        },
    )
    .unwrap();

    assert_eq!(
        dtos,
        vec![Dto {
            id: 9,
            name: "solo".into()
        }]
    );
}

#[test]
fn elements_are_appended_to_existing_ones() {
    let mut dtos = vec![Dto {
        id: 0,
        name: "kept".into(),
    }];
    copier::copy(&mut dtos, &rows()).unwrap();

    assert_eq!(dtos.len(), 4);
    assert_eq!(dtos[0].name, "kept");
    assert_eq!(dtos[3].id, 3);
}

#[test]
fn optional_and_boxed_elements_are_allocated() {
    let mut optional: Vec<Option<Dto>> = Vec::new();
    copier::copy(&mut optional, &rows()).unwrap();
    assert_eq!(optional.len(), 3);
    assert_eq!(optional[1].as_ref().map(|d| d.id), Some(2));

    let mut boxed: Vec<Box<Dto>> = Vec::new();
    copier::copy(&mut boxed, &rows()).unwrap();
    assert_eq!(boxed[2].name, "c");
}

/// Nil source elements turn into default elements, so lengths line up.
#[test]
fn nil_source_elements_become_defaults() {
    let source = vec![
        Some(Row {
            id: 1,
            name: "a".into(),
        }),
        None,
    ];
    let mut dtos: Vec<Dto> = Vec::new();
    copier::copy(&mut dtos, &source).unwrap();

    assert_eq!(
        dtos,
        vec![
            Dto {
                id: 1,
                name: "a".into()
            },
            Dto::default(),
        ]
    );
}

#[test]
fn empty_source_list_adds_nothing() {
    let mut dtos: Vec<Dto> = Vec::new();
    copier::copy(&mut dtos, &Vec::<Row>::new()).unwrap();
    assert!(dtos.is_empty());
}

/// Lists of scalars are only copied when the element types are the same.
#[test]
fn scalar_lists_of_different_types_are_left_alone() {
    let mut same: Vec<i32> = Vec::new();
    copier::copy(&mut same, &vec![1i32, 2]).unwrap();
    assert_eq!(same, [1, 2]);

    let mut wider: Vec<i64> = vec![5];
    copier::copy(&mut wider, &vec![1i32, 2]).unwrap();
    assert_eq!(wider, [5]);
}

#[test]
fn list_fields_are_mapped_inside_structs() {
    #[derive(Facet, Clone, Default)]
    struct Page {
        items: Vec<Row>,
        total: u64,
    }

    #[derive(Facet, Clone, Default, Debug, PartialEq)]
    struct PageDto {
        items: Vec<Dto>,
        total: u64,
    }

    let page = Page {
        items: rows(),
        total: 3,
    };
    let mut dto = PageDto::default();
    copier::copy(&mut dto, &page).unwrap();

    assert_eq!(dto.total, 3);
    assert_eq!(dto.items.len(), 3);
    assert_eq!(dto.items[0].name, "a");
}

/// A pointer to a list is followed like any other pointer.
#[test]
fn list_behind_pointer() {
    let source: Option<Vec<Row>> = Some(rows());
    let mut dtos: Box<Vec<Dto>> = Box::default();
    copier::copy(&mut dtos, &source).unwrap();
    assert_eq!(dtos.len(), 3);
}
