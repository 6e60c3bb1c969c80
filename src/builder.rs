//! Lowers the parsed XML tree into a [`Scene`]. Everything here is
//! fail-soft: a malformed element is skipped with a debug note and the rest
//! of the document still builds. The only hard failure at this layer is a
//! document whose root is not `<svg>`.

use roxmltree::Node;
use tracing::debug;

use crate::color::{parse_color, parse_number, parse_number_list, parse_opacity, parse_paint};
use crate::error::SvgError;
use crate::matrix::{parse_transform, Matrix};
use crate::paint::{Coord, Gradient, GradientKind, GradientStop, GradientUnits, PaintCatalog};
use crate::path_data::parse_path_data;
use crate::scene::{Element, LineCap, LineJoin, RawStyle, Scene, Shape};
use crate::types::{Color, Size, Spread, TextAnchor};

pub fn build(doc: &roxmltree::Document) -> Result<Scene, SvgError> {
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(SvgError::NoRoot);
    }

    let (size, view_matrix) = viewport(root);

    let mut paints = PaintCatalog::default();
    for node in root.descendants().filter(Node::is_element) {
        if let Some((id, gradient)) = parse_gradient(node) {
            paints.insert(id, gradient);
        }
    }
    paints.resolve();

    let elements = root
        .children()
        .filter(Node::is_element)
        .filter_map(parse_element)
        .collect();

    Ok(Scene { size, view_matrix, elements, paints })
}

/// Document size and viewBox mapping. Explicit positive width/height win;
/// a viewBox alone supplies both the size and an origin shift; with both
/// present the viewBox is scaled uniformly to fit and centered.
fn viewport(root: Node) -> (Size, Matrix) {
    let vb: Option<[f32; 4]> = root.attribute("viewBox").and_then(|s| {
        let n = parse_number_list(s);
        (n.len() >= 4).then(|| [n[0], n[1], n[2], n[3]])
    });
    let w = root.attribute("width").and_then(parse_dim);
    let h = root.attribute("height").and_then(parse_dim);

    match (w, h, vb) {
        (Some(w), Some(h), Some([min_x, min_y, vw, vh])) if vw > 0.0 && vh > 0.0 => {
            let s = (w / vw).min(h / vh);
            let tx = (w - vw * s) * 0.5 - min_x * s;
            let ty = (h - vh * s) * 0.5 - min_y * s;
            let m = Matrix { a: s, b: 0.0, c: 0.0, d: s, e: tx, f: ty };
            (Size { width: w, height: h }, m)
        }
        (Some(w), Some(h), _) => (Size { width: w, height: h }, Matrix::identity()),
        (_, _, Some([min_x, min_y, vw, vh])) if vw > 0.0 && vh > 0.0 => (
            Size { width: vw, height: vh },
            Matrix::translate(-min_x, -min_y),
        ),
        _ => (Size { width: 0.0, height: 0.0 }, Matrix::identity()),
    }
}

fn parse_dim(s: &str) -> Option<f32> {
    // Percentage sizes have no resolvable reference length here.
    if s.trim().ends_with('%') {
        return None;
    }
    parse_number(s).filter(|v| *v > 0.0)
}

fn parse_element(node: Node) -> Option<Element> {
    let tag = node.tag_name().name();
    let shape = match tag {
        "g" => Shape::Group {
            children: node
                .children()
                .filter(Node::is_element)
                .filter_map(parse_element)
                .collect(),
        },
        "line" => Shape::Line {
            x1: num(node, "x1").unwrap_or(0.0),
            y1: num(node, "y1").unwrap_or(0.0),
            x2: num(node, "x2").unwrap_or(0.0),
            y2: num(node, "y2").unwrap_or(0.0),
        },
        "rect" => {
            let (Some(w), Some(h)) = (num(node, "width"), num(node, "height")) else {
                return skip(node, "rect without width/height");
            };
            if w <= 0.0 || h <= 0.0 {
                return skip(node, "rect with non-positive extent");
            }
            let rx = num(node, "rx");
            let ry = num(node, "ry");
            Shape::Rect {
                x: num(node, "x").unwrap_or(0.0),
                y: num(node, "y").unwrap_or(0.0),
                w,
                h,
                rx: rx.or(ry).unwrap_or(0.0),
                ry: ry.or(rx).unwrap_or(0.0),
            }
        }
        "circle" => {
            let Some(r) = num(node, "r").filter(|r| *r > 0.0) else {
                return skip(node, "circle without radius");
            };
            Shape::Circle {
                cx: num(node, "cx").unwrap_or(0.0),
                cy: num(node, "cy").unwrap_or(0.0),
                r,
            }
        }
        "ellipse" => {
            let rx = num(node, "rx").filter(|r| *r > 0.0);
            let ry = num(node, "ry").filter(|r| *r > 0.0);
            let (Some(rx), Some(ry)) = (rx, ry) else {
                return skip(node, "ellipse without radii");
            };
            Shape::Ellipse {
                cx: num(node, "cx").unwrap_or(0.0),
                cy: num(node, "cy").unwrap_or(0.0),
                rx,
                ry,
            }
        }
        "polyline" | "polygon" => {
            let points = pairs(prop(node, "points").unwrap_or(""));
            if points.len() < 2 {
                return skip(node, "poly with fewer than two points");
            }
            if tag == "polygon" {
                Shape::Polygon { points }
            } else {
                Shape::Polyline { points }
            }
        }
        "path" => {
            let segs = parse_path_data(prop(node, "d").unwrap_or(""));
            if segs.is_empty() {
                return skip(node, "path without drawable data");
            }
            let evenodd = prop(node, "fill-rule") == Some("evenodd");
            Shape::Path { segs, evenodd }
        }
        "text" => {
            let text: String = node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                return skip(node, "text without content");
            }
            Shape::Text {
                x: num(node, "x").unwrap_or(0.0),
                y: num(node, "y").unwrap_or(0.0),
                text,
            }
        }
        // Gradients are collected in their own pass; anything else is
        // unsupported markup and ignored.
        _ => return None,
    };

    Some(Element { shape, style: read_style(node) })
}

fn skip(node: Node, reason: &str) -> Option<Element> {
    debug!(tag = node.tag_name().name(), reason, "skipping element");
    None
}

/// Attribute lookup with the `style=""` shorthand taken into account; a
/// style property wins over the presentation attribute of the same name.
fn prop<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    if let Some(style) = node.attribute("style") {
        for item in style.split(';') {
            let mut parts = item.splitn(2, ':');
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    node.attribute(name)
}

fn num(node: Node, name: &str) -> Option<f32> {
    prop(node, name).and_then(parse_number)
}

fn pairs(list: &str) -> Vec<(f32, f32)> {
    let numbers = parse_number_list(list);
    numbers.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

fn read_style(node: Node) -> RawStyle {
    RawStyle {
        fill: prop(node, "fill").and_then(parse_paint),
        stroke: prop(node, "stroke").and_then(parse_paint),
        stroke_width: num(node, "stroke-width").filter(|w| *w >= 0.0),
        fill_opacity: prop(node, "fill-opacity").and_then(parse_opacity),
        stroke_opacity: prop(node, "stroke-opacity").and_then(parse_opacity),
        opacity: prop(node, "opacity").and_then(parse_opacity),
        line_cap: prop(node, "stroke-linecap").and_then(|v| match v {
            "butt" => Some(LineCap::Butt),
            "round" => Some(LineCap::Round),
            "square" => Some(LineCap::Square),
            _ => None,
        }),
        line_join: prop(node, "stroke-linejoin").and_then(|v| match v {
            "miter" => Some(LineJoin::Miter),
            "round" => Some(LineJoin::Round),
            "bevel" => Some(LineJoin::Bevel),
            _ => None,
        }),
        font_family: prop(node, "font-family").map(str::to_string),
        font_size: num(node, "font-size").filter(|s| *s > 0.0),
        text_anchor: prop(node, "text-anchor").and_then(|v| match v {
            "start" => Some(TextAnchor::Start),
            "middle" => Some(TextAnchor::Middle),
            "end" => Some(TextAnchor::End),
            _ => None,
        }),
        transform: node.attribute("transform").map(parse_transform),
    }
}

fn parse_gradient(node: Node) -> Option<(String, Gradient)> {
    let kind = match node.tag_name().name() {
        "linearGradient" => GradientKind::Linear,
        "radialGradient" => GradientKind::Radial,
        _ => return None,
    };
    let Some(id) = node.attribute("id") else {
        debug!("gradient without id is unreferencable, dropped");
        return None;
    };

    let coord = |name: &str| node.attribute(name).and_then(Coord::parse);
    let mut g = Gradient::new(kind);
    g.x1 = coord("x1");
    g.y1 = coord("y1");
    g.x2 = coord("x2");
    g.y2 = coord("y2");
    g.cx = coord("cx");
    g.cy = coord("cy");
    g.r = coord("r");
    g.fx = coord("fx");
    g.fy = coord("fy");
    g.units = node.attribute("gradientUnits").and_then(|v| match v {
        "userSpaceOnUse" => Some(GradientUnits::UserSpaceOnUse),
        "objectBoundingBox" => Some(GradientUnits::ObjectBoundingBox),
        _ => None,
    });
    g.spread = node.attribute("spreadMethod").and_then(|v| match v {
        "pad" => Some(Spread::Pad),
        "reflect" => Some(Spread::Reflect),
        "repeat" => Some(Spread::Repeat),
        _ => None,
    });
    g.transform = node.attribute("gradientTransform").map(parse_transform);
    // href carries the xlink namespace in older documents; accept both.
    g.href = node
        .attributes()
        .find(|a| a.name() == "href")
        .and_then(|a| a.value().strip_prefix('#'))
        .map(str::to_string);
    g.stops = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "stop")
        .map(parse_stop)
        .collect();

    Some((id.to_string(), g))
}

fn parse_stop(node: Node) -> GradientStop {
    let offset = prop(node, "offset")
        .and_then(Coord::parse)
        .map_or(0.0, |c| c.v)
        .clamp(0.0, 1.0);
    GradientStop {
        offset,
        color: prop(node, "stop-color")
            .and_then(parse_color)
            .unwrap_or(Color::BLACK),
        opacity: prop(node, "stop-opacity")
            .and_then(parse_opacity)
            .unwrap_or(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Paint;
    use crate::path_data::Segment;

    fn scene(xml: &str) -> Scene {
        let doc = roxmltree::Document::parse(xml).expect("test xml");
        build(&doc).expect("scene")
    }

    #[test]
    fn non_svg_root_is_a_hard_failure() {
        let doc = roxmltree::Document::parse("<html></html>").unwrap();
        assert!(matches!(build(&doc), Err(SvgError::NoRoot)));
    }

    #[test]
    fn size_prefers_explicit_attributes() {
        let s = scene(r#"<svg width="200" height="100" viewBox="0 0 50 50"></svg>"#);
        assert_eq!((s.size.width, s.size.height), (200.0, 100.0));
        // Uniform scale-to-fit: 50 units across 100px, centered horizontally.
        assert_eq!(s.view_matrix.a, 2.0);
        assert_eq!(s.view_matrix.e, 50.0);
        assert_eq!(s.view_matrix.f, 0.0);
    }

    #[test]
    fn size_falls_back_to_viewbox_then_zero() {
        let s = scene(r#"<svg viewBox="10 20 300 150"></svg>"#);
        assert_eq!((s.size.width, s.size.height), (300.0, 150.0));
        assert_eq!((s.view_matrix.e, s.view_matrix.f), (-10.0, -20.0));

        let s = scene("<svg></svg>");
        assert_eq!((s.size.width, s.size.height), (0.0, 0.0));
    }

    #[test]
    fn circle_without_radius_is_skipped() {
        let s = scene(r#"<svg><circle cx="5" cy="5"/><circle cx="1" cy="1" r="2"/></svg>"#);
        assert_eq!(s.elements.len(), 1);
        assert_eq!(
            s.elements[0].shape,
            Shape::Circle { cx: 1.0, cy: 1.0, r: 2.0 }
        );
    }

    #[test]
    fn rect_radii_default_to_each_other() {
        let s = scene(r#"<svg><rect width="10" height="10" rx="3"/></svg>"#);
        let Shape::Rect { rx, ry, .. } = s.elements[0].shape else {
            panic!("expected rect");
        };
        assert_eq!((rx, ry), (3.0, 3.0));
    }

    #[test]
    fn style_shorthand_wins_over_presentation_attribute() {
        let s = scene(r#"<svg><rect width="1" height="1" fill="red" style="fill: blue"/></svg>"#);
        assert_eq!(
            s.elements[0].style.fill,
            Some(Paint::Solid(Color::rgb(0.0, 0.0, 1.0)))
        );
    }

    #[test]
    fn absent_attributes_stay_unset() {
        let s = scene(r#"<svg><rect width="1" height="1"/></svg>"#);
        assert_eq!(s.elements[0].style, RawStyle::default());
    }

    #[test]
    fn groups_nest_and_carry_style() {
        let s = scene(
            r#"<svg><g fill-opacity="0.5"><g><rect width="1" height="1"/></g></g></svg>"#,
        );
        let Shape::Group { children } = &s.elements[0].shape else {
            panic!("expected group");
        };
        assert_eq!(s.elements[0].style.fill_opacity, Some(0.5));
        assert!(matches!(children[0].shape, Shape::Group { .. }));
    }

    #[test]
    fn path_fill_rule_and_data() {
        let s = scene(r#"<svg><path d="M 0 0 L 1 0" fill-rule="evenodd"/></svg>"#);
        let Shape::Path { ref segs, evenodd } = s.elements[0].shape else {
            panic!("expected path");
        };
        assert!(evenodd);
        assert_eq!(segs[1], Segment::LineTo { x: 1.0, y: 0.0 });
    }

    #[test]
    fn text_collapses_whitespace_across_spans() {
        let s = scene("<svg><text x=\"5\" y=\"9\">  hello\n   <tspan>world</tspan></text></svg>");
        assert_eq!(
            s.elements[0].shape,
            Shape::Text { x: 5.0, y: 9.0, text: "hello world".into() }
        );
        // Each run is collected exactly once, in document order.
        let s = scene("<svg><text>a<tspan>b</tspan> c</text></svg>");
        assert_eq!(
            s.elements[0].shape,
            Shape::Text { x: 0.0, y: 0.0, text: "ab c".into() }
        );
    }

    #[test]
    fn gradients_inside_defs_are_collected() {
        let s = scene(
            r#"<svg>
                 <defs>
                   <linearGradient id="a" x1="25%">
                     <stop offset="0" stop-color="red"/>
                     <stop offset="1" stop-color="blue" stop-opacity="0.5"/>
                   </linearGradient>
                 </defs>
               </svg>"#,
        );
        let g = s.paints.get("a").expect("gradient registered");
        assert_eq!(g.x1, Some(Coord::fraction(0.25)));
        assert_eq!(g.stops.len(), 2);
        assert_eq!(g.stops[1].opacity, 0.5);
        // defs children are not scene elements.
        assert!(s.elements.is_empty());
    }

    #[test]
    fn xlink_href_resolves_at_build_time() {
        let s = scene(
            r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink">
                 <linearGradient id="base">
                   <stop offset="0" stop-color="red"/>
                   <stop offset="1" stop-color="blue"/>
                 </linearGradient>
                 <radialGradient id="child" xlink:href="#base" r="40%"/>
               </svg>"##,
        );
        let child = s.paints.get("child").expect("child gradient");
        assert_eq!(child.stops.len(), 2, "stops inherited through href");
        assert_eq!(child.r, Some(Coord::fraction(0.4)));
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let s = scene(r#"<svg><blink/><rect width="1" height="1"/><marquee/></svg>"#);
        assert_eq!(s.elements.len(), 1);
    }
}
