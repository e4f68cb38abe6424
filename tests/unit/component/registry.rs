use std::path::PathBuf;

use super::*;
use crate::component::Property;
use crate::component::builtin::{BarLayout, ColorFill};

#[test]
fn parses_tagged_components_with_defaults() {
    let stack = StackFile::from_json(
        r#"{ "components": [
            { "type": "classic", "layout": "split", "color": [1, 2, 3] },
            { "type": "color", "color1": [111, 111, 111] },
            { "type": "tint", "amount": 0.25 }
        ] }"#,
    )
    .expect("parse");
    assert_eq!(stack.components.len(), 3);
    match &stack.components[0] {
        ComponentSpec::Classic(s) => {
            assert_eq!(s.layout, BarLayout::Split);
            assert_eq!(s.color, [1, 2, 3]);
            assert_eq!(s.smooth, 0.0);
        }
        other => panic!("unexpected {other:?}"),
    }
    match &stack.components[1] {
        ComponentSpec::Color(s) => {
            assert_eq!(s.color1, [111, 111, 111]);
            assert_eq!(s.fill, ColorFill::Solid);
        }
        other => panic!("unexpected {other:?}"),
    }
    let types: Vec<&str> = stack.components.iter().map(|c| c.type_name()).collect();
    assert_eq!(types, ["classic", "color", "tint"]);
}

#[test]
fn parses_gradient_fill() {
    let stack = StackFile::from_json(
        r#"{ "components": [ { "type": "color",
            "fill": { "kind": "radial", "center": [5.0, 5.0], "radius": 3.0 } } ] }"#,
    )
    .expect("parse");
    assert!(matches!(
        &stack.components[0],
        ComponentSpec::Color(ColorSettings {
            fill: ColorFill::Radial { .. },
            ..
        })
    ));
}

#[test]
fn unknown_type_is_rejected() {
    let err = StackFile::from_json(r#"{ "components": [ { "type": "hologram" } ] }"#).unwrap_err();
    assert!(err.to_string().contains("component stack"), "{err}");
}

#[test]
fn built_components_keep_stack_order() {
    let stack = StackFile {
        components: vec![
            ComponentSpec::Color(ColorSettings::default()),
            ComponentSpec::Classic(ClassicSettings::default()),
            ComponentSpec::Tint(TintSettings::default()),
        ],
    };
    let built = stack.build();
    let names: Vec<&str> = built.iter().map(|c| c.name()).collect();
    assert_eq!(names, ["Color", "Classic Visualizer", "Tint"]);
    assert!(
        built[2]
            .properties()
            .expect("props")
            .contains(Property::Composite)
    );
}

#[test]
fn relative_media_paths_resolve_against_stack_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stack_path = dir.path().join("stack.json");
    std::fs::write(
        &stack_path,
        r#"{ "components": [
            { "type": "sound", "path": "extra.wav" },
            { "type": "image", "path": "/abs/cover.png" }
        ] }"#,
    )
    .expect("write");

    let stack = StackFile::from_path(&stack_path).expect("load");
    match &stack.components[0] {
        ComponentSpec::Sound(s) => assert_eq!(s.path, dir.path().join("extra.wav")),
        other => panic!("unexpected {other:?}"),
    }
    match &stack.components[1] {
        ComponentSpec::Image(s) => assert_eq!(s.path, PathBuf::from("/abs/cover.png")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn text_layer_parses_and_resolves_its_font() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stack_path = dir.path().join("stack.json");
    std::fs::write(
        &stack_path,
        r#"{ "components": [
            { "type": "text", "text": "Side A", "font": "fonts/title.ttf", "size": 64.0 }
        ] }"#,
    )
    .expect("write");

    let stack = StackFile::from_path(&stack_path).expect("load");
    let ComponentSpec::Text(s) = &stack.components[0] else {
        panic!("unexpected {:?}", stack.components[0]);
    };
    assert_eq!(s.text, "Side A");
    assert_eq!(s.font, dir.path().join("fonts/title.ttf"));
    assert_eq!(s.size, 64.0);
    assert!(s.center);
    assert_eq!(stack.components[0].type_name(), "text");

    let built = stack.build();
    assert_eq!(built[0].name(), "Title Text");
    let props = built[0].properties().expect("props");
    assert!(props.contains(Property::Static));
    assert!(props.contains(Property::Error));
}
