//! Integration tests: VRML97 text → Browser → scene graph.

use pretty_assertions::assert_eq;
use vrml_core::*;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn n(s: &str) -> Name {
    Name::intern(s)
}

fn load(uri: &str, text: &str) -> (Browser, Scene) {
    let mut browser = Browser::new();
    let scene = browser
        .load(uri, text)
        .unwrap_or_else(|e| panic!("{uri} failed to load: {e}"));
    (browser, scene)
}

fn load_err(text: &str) -> VrmlError {
    Browser::new()
        .load("broken.wrl", text)
        .expect_err("document should be rejected")
}

fn node_field(browser: &Browser, node: NodeIndex, field: &str) -> FieldValue {
    browser.graph().field(node, n(field)).unwrap().clone()
}

fn first_impl(browser: &Browser, instance: NodeIndex) -> NodeIndex {
    browser.graph().node(instance).unwrap().implementation[0]
}

// ─── End-to-end ──────────────────────────────────────────────────────────

#[test]
fn shape_with_box_geometry() {
    let (browser, scene) = load("shape.wrl", include_str!("fixtures/shape_box.wrl"));
    assert_eq!(scene.roots.len(), 1);
    assert!(scene.diagnostics.is_empty());

    let shape = scene.roots[0];
    let node = browser.graph().node(shape).unwrap();
    assert_eq!(node.name, Some(n("S")));
    assert_eq!(node.type_name().as_str(), "Shape");

    let geometry = node_field(&browser, shape, "geometry").as_node().unwrap();
    assert_eq!(browser.graph().node(geometry).unwrap().type_name().as_str(), "Box");
    assert_eq!(
        node_field(&browser, geometry, "size"),
        FieldValue::SFVec3f([2.0, 2.0, 2.0])
    );
    assert_eq!(scene.node("S"), Some(shape));
}

#[test]
fn empty_document_has_no_roots() {
    let (_, scene) = load("empty.wrl", "#VRML V2.0 utf8\n");
    assert!(scene.roots.is_empty());
    assert!(scene.routes.is_empty());
}

// ─── DEF / USE and scopes ────────────────────────────────────────────────

#[test]
fn use_shares_the_defined_node() {
    let (browser, scene) = load(
        "share.wrl",
        "Shape { geometry DEF A Box { } }\nShape { geometry USE A }",
    );
    let first = node_field(&browser, scene.roots[0], "geometry").as_node();
    let second = node_field(&browser, scene.roots[1], "geometry").as_node();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn proto_body_names_are_visible_to_nested_protos() {
    let (browser, scene) = load("scopes.wrl", include_str!("fixtures/scopes.wrl"));
    let outer = scene.roots[0];
    let x = first_impl(&browser, outer);
    let x_node = browser.graph().node(x).unwrap();
    assert_eq!(x_node.type_name().as_str(), "Transform");
    assert!(!x_node.template);
    assert_eq!(
        node_field(&browser, x, "translation"),
        FieldValue::SFVec3f([1.0, 0.0, 0.0])
    );

    // Outer's second body node holds an Inner instance whose Group uses X.
    let group = browser.graph().node(outer).unwrap().implementation[1];
    let FieldValue::MFNode(children) = node_field(&browser, group, "children") else {
        panic!("children should be MFNode");
    };
    let inner_group = first_impl(&browser, children[0]);
    assert_eq!(
        node_field(&browser, inner_group, "children"),
        FieldValue::MFNode(vec![x])
    );
}

#[test]
fn proto_body_names_are_hidden_outside() {
    let err = load_err("PROTO Outer [ ] { DEF X Transform { } }\nGroup { children USE X }");
    assert!(matches!(err, VrmlError::Semantic { .. }));
    assert_eq!(err.message(), "Node \"X\" has not been defined in this scope");
    assert_eq!(err.position(), Some((2, 21)));
}

#[test]
fn duplicate_def_in_one_scope_is_rejected() {
    let err = load_err("DEF A Box { }\nDEF A Sphere { }");
    assert!(err.message().contains("already defined"));
}

// ─── Syntax and semantic errors ──────────────────────────────────────────

#[test]
fn unknown_node_type_is_semantic_error() {
    let err = load_err("#VRML V2.0 utf8\nGroup { children Teapot { } }");
    assert!(matches!(err, VrmlError::Semantic { .. }));
    assert!(err.message().starts_with("Unknown node type"));
    assert_eq!(err.position(), Some((2, 17)));
}

#[test]
fn unknown_field_is_semantic_error() {
    let err = load_err("Box { radius 2 }");
    assert_eq!(err.message(), "Node has no field or exposedField \"radius\"");
}

#[test]
fn duplicate_field_value_is_semantic_error() {
    let err = load_err("Sphere { radius 1 radius 2 }");
    assert_eq!(err.message(), "Value for radius already declared");
}

#[test]
fn bad_statement_start_is_syntax_error() {
    let err = load_err("#VRML V2.0 utf8\n\n  [ 1 2 3 ]");
    assert!(matches!(err, VrmlError::Syntax { .. }));
    assert_eq!(err.position(), Some((3, 2)));
}

#[test]
fn is_outside_proto_body_is_syntax_error() {
    let err = load_err("Sphere { radius IS r }");
    assert!(matches!(err, VrmlError::Syntax { .. }));
}

// ─── Value repair and SFImage ────────────────────────────────────────────

#[test]
fn out_of_range_color_is_clamped_with_warning() {
    let (browser, scene) = load("color.wrl", "Material { diffuseColor 1.5 -0.2 0.5 }");
    assert_eq!(
        node_field(&browser, scene.roots[0], "diffuseColor"),
        FieldValue::SFColor(Color::rgb(1.0, 0.0, 0.5))
    );
    assert_eq!(scene.diagnostics.len(), 1);
    assert_eq!(scene.diagnostics[0].severity, Severity::Warning);
    assert_eq!((scene.diagnostics[0].line, scene.diagnostics[0].column), (1, 24));
}

#[test]
fn image_pixel_count_is_enforced() {
    let err = load_err("PixelTexture { image 2 2 1 0 0 0 }");
    assert_eq!(err.message(), "Insufficient pixel values");

    let err = load_err("PixelTexture { image 1 1 1 0 0 }");
    assert_eq!(err.message(), "Too many pixel values");
    assert_eq!(err.position(), Some((1, 29)));

    let (browser, scene) = load("img.wrl", "PixelTexture { image 2 1 1 0xFF 0x00 }");
    let FieldValue::SFImage(image) = node_field(&browser, scene.roots[0], "image") else {
        panic!("image should be SFImage");
    };
    assert_eq!((image.width, image.height, image.pixels), (2, 1, vec![0xFF, 0]));
}

// ─── PROTO ───────────────────────────────────────────────────────────────

#[test]
fn proto_defaults_and_overrides_flow_through_is() {
    let (browser, scene) = load("proto.wrl", include_str!("fixtures/proto_is.wrl"));
    let a = scene.node("A").unwrap();
    let b = scene.node("B").unwrap();
    let size_of = |instance: NodeIndex| {
        let shape = first_impl(&browser, instance);
        let geometry = node_field(&browser, shape, "geometry").as_node().unwrap();
        node_field(&browser, geometry, "size")
    };
    assert_eq!(size_of(a), FieldValue::SFVec3f([2.0, 2.0, 2.0]));
    assert_eq!(size_of(b), FieldValue::SFVec3f([5.0, 5.0, 5.0]));
    assert_ne!(first_impl(&browser, a), first_impl(&browser, b));
    assert_eq!(browser.graph().node(a).unwrap().type_name().as_str(), "SizedBox");
}

#[test]
fn proto_instances_are_independent() {
    let (mut browser, scene) = load("proto.wrl", include_str!("fixtures/proto_is.wrl"));
    let a = scene.node("A").unwrap();
    let b = scene.node("B").unwrap();
    let box_of = |browser: &Browser, instance: NodeIndex| {
        let shape = first_impl(browser, instance);
        node_field(browser, shape, "geometry").as_node().unwrap()
    };

    let a_box = box_of(&browser, a);
    browser
        .graph_mut()
        .set_field(a_box, n("size"), FieldValue::SFVec3f([9.0, 9.0, 9.0]))
        .unwrap();
    let b_box = box_of(&browser, b);
    assert_eq!(node_field(&browser, b_box, "size"), FieldValue::SFVec3f([5.0, 5.0, 5.0]));

    // Setting the public field pushes into the bound implementation field.
    browser
        .graph_mut()
        .set_field(a, n("v"), FieldValue::SFVec3f([7.0, 7.0, 7.0]))
        .unwrap();
    assert_eq!(node_field(&browser, a_box, "size"), FieldValue::SFVec3f([7.0, 7.0, 7.0]));
    assert_eq!(node_field(&browser, b_box, "size"), FieldValue::SFVec3f([5.0, 5.0, 5.0]));
}

#[test]
fn exposed_proto_interface_forwards_events() {
    let (mut browser, scene) = load("proto.wrl", include_str!("fixtures/proto_is.wrl"));
    let a = scene.node("A").unwrap();
    let shape = first_impl(&browser, a);
    let appearance = node_field(&browser, shape, "appearance").as_node().unwrap();
    let material = node_field(&browser, appearance, "material").as_node().unwrap();
    assert_eq!(
        node_field(&browser, material, "diffuseColor"),
        FieldValue::SFColor(Color::rgb(1.0, 1.0, 1.0))
    );

    let red = FieldValue::SFColor(Color::rgb(1.0, 0.0, 0.0));
    browser
        .graph_mut()
        .send_event(a, n("set_tint"), red.clone(), 0.0)
        .unwrap();
    assert_eq!(node_field(&browser, material, "diffuseColor"), red);
    assert_eq!(node_field(&browser, a, "tint"), red);
}

#[test]
fn duplicate_proto_interface_is_rejected() {
    let mut browser = Browser::new();
    let classes = browser.registry().len();
    let err = browser
        .load(
            "dup.wrl",
            "PROTO P [ field SFFloat x 1.0 field SFFloat x 1.0 ] { Sphere { } }",
        )
        .unwrap_err();
    assert!(matches!(err, VrmlError::Semantic { .. }));
    assert_eq!(err.message(), "Interface \"x\" already declared");
    assert_eq!(browser.registry().len(), classes);
}

#[test]
fn incompatible_is_mapping_is_rejected() {
    let err = load_err("PROTO P [ field SFColor c 1 1 1 ] { Sphere { radius IS c } }");
    assert!(matches!(err, VrmlError::Semantic { .. }));
    assert!(err.message().contains("cannot be mapped"));
}

#[test]
fn event_alias_is_leaves_the_field_value() {
    let (mut browser, scene) = load(
        "alias.wrl",
        "PROTO P [ eventIn SFVec3f s ] { Transform { set_scale IS s } }\nDEF I P { }",
    );
    let instance = scene.node("I").unwrap();
    let transform = first_impl(&browser, instance);
    assert_eq!(node_field(&browser, transform, "scale"), FieldValue::SFVec3f([1.0; 3]));

    browser
        .graph_mut()
        .send_event(instance, n("s"), FieldValue::SFVec3f([3.0; 3]), 0.0)
        .unwrap();
    assert_eq!(node_field(&browser, transform, "scale"), FieldValue::SFVec3f([3.0; 3]));

    // An exposedField mapped to an eventIn is only driven by events.
    let (browser, scene) = load(
        "direct.wrl",
        "PROTO P [ eventIn SFVec3f s ] { Transform { scale IS s } }\nDEF I P { }",
    );
    let transform = first_impl(&browser, scene.node("I").unwrap());
    assert_eq!(node_field(&browser, transform, "scale"), FieldValue::SFVec3f([1.0; 3]));
}

#[test]
fn event_alias_is_combines_with_a_field_value() {
    let (browser, scene) = load(
        "alias.wrl",
        "PROTO P [ eventIn SFVec3f s ] { Transform { scale 2 2 2 set_scale IS s } }\nDEF I P { }",
    );
    let transform = first_impl(&browser, scene.node("I").unwrap());
    assert_eq!(node_field(&browser, transform, "scale"), FieldValue::SFVec3f([2.0; 3]));

    let text = emit_scene(&scene, browser.graph());
    assert!(text.contains("scale 2 2 2"));
    assert!(text.contains("set_scale IS s"));
}

#[test]
fn script_events_map_to_exposed_proto_interfaces() {
    let (mut browser, scene) = load(
        "script_is.wrl",
        "PROTO P [ exposedField SFFloat v 2 ] {\n  Script { eventIn SFFloat x IS v eventOut SFFloat y IS v }\n}\nDEF I P { }",
    );
    let instance = scene.node("I").unwrap();
    let script = first_impl(&browser, instance);
    let events = browser
        .graph_mut()
        .send_event(instance, n("set_v"), FieldValue::SFFloat(0.5), 1.0)
        .unwrap();
    assert_eq!(
        events,
        vec![ScriptEvent {
            script,
            event: n("x"),
            value: FieldValue::SFFloat(0.5),
            timestamp: 1.0,
        }]
    );
    assert_eq!(node_field(&browser, instance, "v"), FieldValue::SFFloat(0.5));
}

#[test]
fn proto_body_needs_a_node() {
    let err = load_err("PROTO Empty [ ] { }");
    assert!(matches!(err, VrmlError::Syntax { .. }));
}

#[test]
fn nested_protos_get_scoped_identities() {
    let (browser, _) = load(
        "nest.wrl",
        "PROTO A [ ] { PROTO Inner [ ] { Box { } } Inner { } }\n\
         PROTO B [ ] { PROTO Inner [ ] { Sphere { } } Inner { } }\n\
         A { } B { }",
    );
    assert!(browser.registry().contains("nest.wrl#A"));
    assert!(browser.registry().contains("nest.wrl#A#Inner"));
    assert!(browser.registry().contains("nest.wrl#B#Inner"));
}

// ─── EXTERNPROTO ─────────────────────────────────────────────────────────

#[test]
fn externproto_binds_first_matching_class() {
    let (browser, scene) = load("ext.wrl", include_str!("fixtures/externproto.wrl"));
    let my_box = node_field(&browser, scene.roots[0], "geometry").as_node().unwrap();
    let node = browser.graph().node(my_box).unwrap();
    assert_eq!(node.type_name().as_str(), "MyBox");
    assert_eq!(node.node_type.class.as_str(), "Box");
    assert_eq!(node_field(&browser, my_box, "size"), FieldValue::SFVec3f([1.0, 2.0, 3.0]));

    let ball = node_field(&browser, scene.roots[1], "geometry").as_node().unwrap();
    let sphere = first_impl(&browser, ball);
    assert_eq!(node_field(&browser, sphere, "radius"), FieldValue::SFFloat(3.0));

    assert_eq!(scene.declarations.len(), 4);
    let infos: Vec<_> = scene
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Info)
        .collect();
    assert_eq!(infos.len(), 1);
    assert!(infos[0].message.contains("Nowhere"));
    assert!(scene.find_type("Nowhere").is_none());
}

#[test]
fn unbound_externproto_cannot_be_used() {
    let err = load_err("EXTERNPROTO Thing [ ] \"http://example.com/t.wrl\"\nThing { }");
    assert!(err.message().starts_with("Unknown node type"));
}

#[test]
fn externproto_interface_mismatch_binds_nothing() {
    let (_, scene) = load(
        "ext.wrl",
        "EXTERNPROTO Wide [ exposedField SFVec3f size ] \"urn:vrml97:node:Box\"",
    );
    assert!(scene.find_type("Wide").is_none());
    assert_eq!(scene.diagnostics.len(), 1);
}

// ─── ROUTE ───────────────────────────────────────────────────────────────

#[test]
fn redundant_route_makes_one_connection() {
    let (browser, scene) = load("routes.wrl", include_str!("fixtures/routes.wrl"));
    assert_eq!(scene.routes.len(), 2);
    assert_eq!(browser.graph().routes().len(), 2);
    let clock = scene.node("CLOCK").unwrap();
    let spin = scene.node("SPIN").unwrap();
    assert_eq!(
        scene.routes[0],
        Route {
            from_node: clock,
            from_event: n("fraction_changed"),
            to_node: spin,
            to_event: n("set_fraction"),
        }
    );
}

#[test]
fn route_type_mismatch_is_rejected() {
    let text = "DEF T TimeSensor { }\nDEF M Material { }\nROUTE T.fraction_changed TO M.set_diffuseColor";
    let err = load_err(text);
    assert!(matches!(err, VrmlError::Semantic { .. }));
    assert!(err.message().contains("ROUTE type mismatch"));
    assert_eq!(err.position(), Some((3, 0)));

    let (mut browser, scene) = load("ok.wrl", "DEF T TimeSensor { }\nDEF M Material { }");
    let t = scene.node("T").unwrap();
    let m = scene.node("M").unwrap();
    let result = browser
        .graph_mut()
        .add_route(t, n("fraction_changed"), m, n("set_diffuseColor"));
    assert!(matches!(result, Err(VrmlError::RouteTypeMismatch { .. })));
    assert!(browser.graph().routes().is_empty());
}

#[test]
fn route_to_undefined_node_is_rejected() {
    let err = load_err("DEF T TimeSensor { }\nROUTE T.fraction_changed TO NOPE.set_fraction");
    assert_eq!(err.message(), "Node \"NOPE\" has not been defined in this scope");
}

#[test]
fn routed_events_cascade_to_transform() {
    let (mut browser, scene) = load("routes.wrl", include_str!("fixtures/routes.wrl"));
    let clock = scene.node("CLOCK").unwrap();
    let xf = scene.node("XF").unwrap();
    let spin = scene.node("SPIN").unwrap();

    browser
        .graph_mut()
        .emit_event(clock, n("fraction_changed"), FieldValue::SFFloat(0.5), 2.0)
        .unwrap();
    let slot = browser
        .graph()
        .node(spin)
        .unwrap()
        .node_type
        .interfaces
        .event_in(n("set_fraction"))
        .unwrap();
    assert_eq!(
        browser.graph().node(spin).unwrap().value_at(slot),
        &FieldValue::SFFloat(0.5)
    );
    // Interpolation itself is the scripting/animation layer's job: the
    // transform only changes once value_changed is emitted.
    let rotation = Rotation::new(0.0, 1.0, 0.0, 3.0);
    browser
        .graph_mut()
        .emit_event(spin, n("value_changed"), FieldValue::SFRotation(rotation), 2.0)
        .unwrap();
    assert_eq!(node_field(&browser, xf, "rotation"), FieldValue::SFRotation(rotation));
}

// ─── Script ──────────────────────────────────────────────────────────────

#[test]
fn script_declares_interfaces_and_refers_to_itself() {
    let (mut browser, scene) = load("script.wrl", include_str!("fixtures/script.wrl"));
    let s = scene.node("S").unwrap();
    let script = browser.graph().node(s).unwrap();
    assert!(script.node_type.has_capability(Capability::Script));
    assert_eq!(script.node_type.interfaces.len(), 7);
    assert_eq!(node_field(&browser, s, "me"), FieldValue::SFNode(Some(s)));
    assert_eq!(node_field(&browser, s, "speed"), FieldValue::SFFloat(1.5));
    assert_eq!(node_field(&browser, s, "mustEvaluate"), FieldValue::SFBool(true));

    let touch = scene.node("TOUCH").unwrap();
    let events = browser
        .graph_mut()
        .emit_event(touch, n("isActive"), FieldValue::SFBool(true), 4.0)
        .unwrap();
    assert_eq!(
        events,
        vec![ScriptEvent {
            script: s,
            event: n("go"),
            value: FieldValue::SFBool(true),
            timestamp: 4.0,
        }]
    );
}

#[test]
fn script_rejects_duplicate_and_exposed_declarations() {
    let err = load_err("Script { eventIn SFBool a eventIn SFBool a }");
    assert_eq!(err.message(), "Interface \"a\" already declared");

    let err = load_err("Script { exposedField SFBool a TRUE }");
    assert!(matches!(err, VrmlError::Semantic { .. }));
}

#[test]
fn script_self_reference_needs_def() {
    let err = load_err("Script { field SFNode me USE ME }");
    assert_eq!(err.message(), "Node \"ME\" has not been defined in this scope");
}

#[test]
fn nested_anonymous_script_is_not_the_outer_def() {
    let err = load_err("DEF S Script { field SFNode n Script { field SFNode m USE S } }");
    assert_eq!(err.message(), "Node \"S\" has not been defined in this scope");

    let (browser, scene) = load(
        "nested.wrl",
        "DEF S Script { field MFNode n [ Script { } USE S ] }",
    );
    let outer = scene.node("S").unwrap();
    let FieldValue::MFNode(nodes) = node_field(&browser, outer, "n") else {
        panic!("n should be an MFNode");
    };
    assert_ne!(nodes[0], outer);
    assert_eq!(nodes[1], outer);
}

// ─── Definitions ─────────────────────────────────────────────────────────

#[test]
fn definitions_record_source_positions() {
    let (_, scene) = load("proto.wrl", include_str!("fixtures/proto_is.wrl"));
    let summary: Vec<_> = scene
        .definitions
        .iter()
        .filter(|d| !d.in_proto)
        .map(|d| (d.kind, d.name.as_str().to_string(), d.line, d.column))
        .collect();
    assert_eq!(
        summary,
        vec![
            (DefinitionKind::Proto, "SizedBox".to_string(), 3, 6),
            (DefinitionKind::Def, "A".to_string(), 16, 4),
            (DefinitionKind::Def, "B".to_string(), 17, 4),
        ]
    );
}
