//! End-to-end checks: markup in, command stream and pixels out.

use svgread::{
    Color, Command, FontCatalog, Paint, Pt, Shading, Shape, Spread, SvgError, load_str, render,
};

struct NoFonts;

impl FontCatalog for NoFonts {
    fn has_family(&self, _family: &str) -> bool {
        false
    }
    fn generic_family(&self, _generic: &str) -> Option<String> {
        None
    }
    fn fallback_family(&self) -> String {
        "fallback".to_string()
    }
}

#[test]
fn parse_cascade_and_record() {
    let scene = load_str(
        r##"<svg width="100" height="100">
             <g fill="#ff0000" fill-opacity="0.5" transform="translate(10,0)">
               <rect x="0" y="0" width="20" height="20" fill-opacity="0.5"/>
               <circle cx="50" cy="50" r="10" fill="blue"/>
             </g>
           </svg>"##,
    )
    .expect("well-formed document");

    assert_eq!(scene.elements.len(), 1);
    let doc = render(&scene, &NoFonts);

    // The rect inherits red and multiplies its opacity with the group's.
    assert!(doc.commands.contains(&Command::SetFillColor(Color::rgb(1.0, 0.0, 0.0))));
    assert!(doc
        .commands
        .iter()
        .any(|c| matches!(c, Command::SetOpacity { fill, .. } if (*fill - 0.25).abs() < 1e-6)));
    // The circle's own blue wins outright.
    assert!(doc.commands.contains(&Command::SetFillColor(Color::rgb(0.0, 0.0, 1.0))));
    // The group translate reaches the draw as a concat.
    assert!(doc
        .commands
        .iter()
        .any(|c| matches!(c, Command::ConcatMatrix { e, .. } if *e == Pt::from_f32(10.0))));
}

#[test]
fn re_render_full_pipeline_is_idempotent() {
    let scene = load_str(
        r##"<svg viewBox="0 0 60 40">
             <defs>
               <linearGradient id="sky">
                 <stop offset="0" stop-color="#fff"/>
                 <stop offset="1" stop-color="#004488"/>
               </linearGradient>
             </defs>
             <rect width="60" height="40" fill="url(#sky)"/>
             <path d="M 10 30 Q 30 5 50 30 Z" fill="green" stroke="black" stroke-width="2"/>
           </svg>"##,
    )
    .expect("well-formed document");

    let first = render(&scene, &NoFonts);
    let second = render(&scene, &NoFonts);
    assert_eq!(first, second, "renders of an untouched scene must match");
    assert!(first
        .commands
        .iter()
        .any(|c| matches!(c, Command::ShadingFill(Shading::Axial { .. }))));
}

#[test]
fn gradient_reference_falls_back_per_shape() {
    let scene = load_str(
        r#"<svg width="10" height="10">
             <rect width="10" height="10" fill="url(#missing) green"/>
             <rect width="10" height="10" fill="url(#gone)"/>
           </svg>"#,
    )
    .expect("well-formed document");

    match &scene.elements[0].style.fill {
        Some(Paint::Gradient(id, Some(fallback))) => {
            assert_eq!(id, "missing");
            assert_eq!(*fallback, Color::from_u8(0, 128, 0));
        }
        other => panic!("unexpected fill {:?}", other),
    }

    let doc = render(&scene, &NoFonts);
    // One rect draws with the fallback green, the other draws nothing.
    let fills = doc
        .commands
        .iter()
        .filter(|c| matches!(c, Command::Fill))
        .count();
    assert_eq!(fills, 1);
}

#[test]
fn malformed_pieces_do_not_poison_the_document() {
    let scene = load_str(
        r#"<svg width="10" height="10">
             <circle cx="1" cy="1"/>
             <path d="M banana"/>
             <rect width="4" height="4" transform="rotate(banana) translate(2,2)"/>
             <unknown><rect width="3" height="3"/></unknown>
           </svg>"#,
    )
    .expect("still a valid document");
    // Only the rect survives, with the parsable half of its transform.
    assert_eq!(scene.elements.len(), 1);
    let m = scene.elements[0].style.transform.expect("transform kept");
    assert_eq!(m.apply(0.0, 0.0), (2.0, 2.0));
}

#[test]
fn hard_failures_are_errors() {
    assert!(matches!(load_str("not xml at all"), Err(SvgError::Xml(_))));
    assert!(matches!(load_str("<p>hello</p>"), Err(SvgError::NoRoot)));
    assert!(matches!(
        svgread::load_file("/definitely/not/here.svg"),
        Err(SvgError::Io(_))
    ));
}

#[test]
fn radial_gradient_pipeline_reaches_the_canvas() {
    let scene = load_str(
        r#"<svg width="40" height="40">
             <radialGradient id="glow" fx="0.6" fy="0.5" spreadMethod="reflect">
               <stop offset="0.2" stop-color="white"/>
               <stop offset="0.8" stop-color="black" stop-opacity="0.5"/>
             </radialGradient>
             <circle cx="20" cy="20" r="15" fill="url(#glow)"/>
           </svg>"#,
    )
    .expect("well-formed document");

    let doc = render(&scene, &NoFonts);
    let shading = doc
        .commands
        .iter()
        .find_map(|c| match c {
            Command::ShadingFill(s) => Some(s.clone()),
            _ => None,
        })
        .expect("radial shading recorded");
    let Shading::Radial { r0, r1, spread, stops, .. } = shading else {
        panic!("expected radial");
    };
    assert_eq!(r0, 0.0);
    assert!(r1 > 0.0);
    assert_eq!(spread, Spread::Reflect);
    // Boundary stops were synthesized around the declared 0.2/0.8 pair.
    assert_eq!(stops.first().map(|s| s.offset), Some(0.0));
    assert_eq!(stops.last().map(|s| s.offset), Some(1.0));
    assert_eq!(stops.len(), 4);
}

#[test]
fn scene_is_plain_data() {
    let scene = load_str(r#"<svg width="5" height="5"><rect width="2" height="3"/></svg>"#)
        .expect("well-formed document");
    let copy = scene.clone();
    match (&scene.elements[0].shape, &copy.elements[0].shape) {
        (Shape::Rect { w: a, .. }, Shape::Rect { w: b, .. }) => assert_eq!(a, b),
        _ => panic!("expected rects"),
    }
}
