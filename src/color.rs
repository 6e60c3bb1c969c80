use crate::types::Color;

/// A fill or stroke paint value as written in the markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    /// Explicit `none`: the slot is set, and set to "draw nothing".
    None,
    Solid(Color),
    /// `url(#id)` paint-server reference, with an optional fallback color.
    Gradient(String, Option<Color>),
}

impl Paint {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Paint::None)
    }
}

/// Parses a paint value. Returns `None` for values we cannot interpret
/// (e.g. `currentColor`), which callers treat as "not set" so the inherited
/// value stays in effect.
pub fn parse_paint(input: &str) -> Option<Paint> {
    let v = input.trim();
    if v.is_empty() {
        return None;
    }
    if v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("transparent") {
        return Some(Paint::None);
    }
    if let Some((id, rest)) = parse_url_ref(v) {
        let fallback = rest.and_then(|tail| {
            if tail.eq_ignore_ascii_case("none") {
                None
            } else {
                parse_color(tail)
            }
        });
        return Some(Paint::Gradient(id, fallback));
    }
    parse_color(v).map(Paint::Solid)
}

/// `url(#id)` with an optional trailing fallback token. Returns the id and
/// whatever follows the closing paren.
pub fn parse_url_ref(input: &str) -> Option<(String, Option<&str>)> {
    let s = input.trim();
    if !s.to_ascii_lowercase().starts_with("url(") {
        return None;
    }
    let open = s.find('(')?;
    let close = s.find(')')?;
    if close <= open + 1 {
        return None;
    }
    let inner = s[open + 1..close]
        .trim()
        .trim_matches('"')
        .trim_matches('\'');
    let id = inner.strip_prefix('#')?;
    if id.is_empty() {
        return None;
    }
    let rest = s[close + 1..].trim();
    let rest = if rest.is_empty() { None } else { Some(rest) };
    Some((id.to_string(), rest))
}

pub fn parse_color(input: &str) -> Option<Color> {
    let v = input.trim();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    if v.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("rgb(")) {
        return parse_rgb_func(v);
    }
    named_color(v)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
            Some(Color::from_u8(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::from_u8(r, g, b))
        }
        _ => None,
    }
}

fn parse_rgb_func(v: &str) -> Option<Color> {
    let open = v.find('(')?;
    let close = v.rfind(')')?;
    if close <= open {
        return None;
    }
    let mut channels = [0.0f32; 3];
    let mut it = v[open + 1..close].split(',');
    for ch in &mut channels {
        let tok = it.next()?.trim();
        let value = if let Some(p) = tok.strip_suffix('%') {
            p.trim().parse::<f32>().ok()? * 255.0 / 100.0
        } else {
            tok.parse::<f32>().ok()?
        };
        *ch = (value / 255.0).clamp(0.0, 1.0);
    }
    Some(Color::rgb(channels[0], channels[1], channels[2]))
}

/// Parses a numeric attribute value, tolerating the unit suffixes common in
/// exported documents (treated as user units).
pub fn parse_number(input: &str) -> Option<f32> {
    let s = input.trim();
    let s = s
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim_end_matches("mm")
        .trim_end_matches("cm")
        .trim_end_matches("in")
        .trim_end_matches("em")
        .trim();
    let v = s.parse::<f32>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

pub fn parse_number_list(input: &str) -> Vec<f32> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(parse_number)
        .collect()
}

/// Opacity value clamped to 0..=1. Percentages are accepted (some exporters
/// write them) even though the attribute is nominally a number.
pub fn parse_opacity(input: &str) -> Option<f32> {
    let s = input.trim();
    if let Some(p) = s.strip_suffix('%') {
        let v = p.trim().parse::<f32>().ok()?;
        return Some((v / 100.0).clamp(0.0, 1.0));
    }
    let v = s.parse::<f32>().ok()?;
    if !v.is_finite() {
        return None;
    }
    Some(v.clamp(0.0, 1.0))
}

fn named_color(name: &str) -> Option<Color> {
    // SVG 1.1 color keyword table.
    let c = |r: u8, g: u8, b: u8| Some(Color::from_u8(r, g, b));
    match name.to_ascii_lowercase().as_str() {
        "aliceblue" => c(240, 248, 255),
        "antiquewhite" => c(250, 235, 215),
        "aqua" | "cyan" => c(0, 255, 255),
        "aquamarine" => c(127, 255, 212),
        "azure" => c(240, 255, 255),
        "beige" => c(245, 245, 220),
        "bisque" => c(255, 228, 196),
        "black" => c(0, 0, 0),
        "blanchedalmond" => c(255, 235, 205),
        "blue" => c(0, 0, 255),
        "blueviolet" => c(138, 43, 226),
        "brown" => c(165, 42, 42),
        "burlywood" => c(222, 184, 135),
        "cadetblue" => c(95, 158, 160),
        "chartreuse" => c(127, 255, 0),
        "chocolate" => c(210, 105, 30),
        "coral" => c(255, 127, 80),
        "cornflowerblue" => c(100, 149, 237),
        "cornsilk" => c(255, 248, 220),
        "crimson" => c(220, 20, 60),
        "darkblue" => c(0, 0, 139),
        "darkcyan" => c(0, 139, 139),
        "darkgoldenrod" => c(184, 134, 11),
        "darkgray" | "darkgrey" => c(169, 169, 169),
        "darkgreen" => c(0, 100, 0),
        "darkkhaki" => c(189, 183, 107),
        "darkmagenta" => c(139, 0, 139),
        "darkolivegreen" => c(85, 107, 47),
        "darkorange" => c(255, 140, 0),
        "darkorchid" => c(153, 50, 204),
        "darkred" => c(139, 0, 0),
        "darksalmon" => c(233, 150, 122),
        "darkseagreen" => c(143, 188, 143),
        "darkslateblue" => c(72, 61, 139),
        "darkslategray" | "darkslategrey" => c(47, 79, 79),
        "darkturquoise" => c(0, 206, 209),
        "darkviolet" => c(148, 0, 211),
        "deeppink" => c(255, 20, 147),
        "deepskyblue" => c(0, 191, 255),
        "dimgray" | "dimgrey" => c(105, 105, 105),
        "dodgerblue" => c(30, 144, 255),
        "firebrick" => c(178, 34, 34),
        "floralwhite" => c(255, 250, 240),
        "forestgreen" => c(34, 139, 34),
        "fuchsia" | "magenta" => c(255, 0, 255),
        "gainsboro" => c(220, 220, 220),
        "ghostwhite" => c(248, 248, 255),
        "gold" => c(255, 215, 0),
        "goldenrod" => c(218, 165, 32),
        "gray" | "grey" => c(128, 128, 128),
        "green" => c(0, 128, 0),
        "greenyellow" => c(173, 255, 47),
        "honeydew" => c(240, 255, 240),
        "hotpink" => c(255, 105, 180),
        "indianred" => c(205, 92, 92),
        "indigo" => c(75, 0, 130),
        "ivory" => c(255, 255, 240),
        "khaki" => c(240, 230, 140),
        "lavender" => c(230, 230, 250),
        "lavenderblush" => c(255, 240, 245),
        "lawngreen" => c(124, 252, 0),
        "lemonchiffon" => c(255, 250, 205),
        "lightblue" => c(173, 216, 230),
        "lightcoral" => c(240, 128, 128),
        "lightcyan" => c(224, 255, 255),
        "lightgoldenrodyellow" => c(250, 250, 210),
        "lightgray" | "lightgrey" => c(211, 211, 211),
        "lightgreen" => c(144, 238, 144),
        "lightpink" => c(255, 182, 193),
        "lightsalmon" => c(255, 160, 122),
        "lightseagreen" => c(32, 178, 170),
        "lightskyblue" => c(135, 206, 250),
        "lightslategray" | "lightslategrey" => c(119, 136, 153),
        "lightsteelblue" => c(176, 196, 222),
        "lightyellow" => c(255, 255, 224),
        "lime" => c(0, 255, 0),
        "limegreen" => c(50, 205, 50),
        "linen" => c(250, 240, 230),
        "maroon" => c(128, 0, 0),
        "mediumaquamarine" => c(102, 205, 170),
        "mediumblue" => c(0, 0, 205),
        "mediumorchid" => c(186, 85, 211),
        "mediumpurple" => c(147, 112, 219),
        "mediumseagreen" => c(60, 179, 113),
        "mediumslateblue" => c(123, 104, 238),
        "mediumspringgreen" => c(0, 250, 154),
        "mediumturquoise" => c(72, 209, 204),
        "mediumvioletred" => c(199, 21, 133),
        "midnightblue" => c(25, 25, 112),
        "mintcream" => c(245, 255, 250),
        "mistyrose" => c(255, 228, 225),
        "moccasin" => c(255, 228, 181),
        "navajowhite" => c(255, 222, 173),
        "navy" => c(0, 0, 128),
        "oldlace" => c(253, 245, 230),
        "olive" => c(128, 128, 0),
        "olivedrab" => c(107, 142, 35),
        "orange" => c(255, 165, 0),
        "orangered" => c(255, 69, 0),
        "orchid" => c(218, 112, 214),
        "palegoldenrod" => c(238, 232, 170),
        "palegreen" => c(152, 251, 152),
        "paleturquoise" => c(175, 238, 238),
        "palevioletred" => c(219, 112, 147),
        "papayawhip" => c(255, 239, 213),
        "peachpuff" => c(255, 218, 185),
        "peru" => c(205, 133, 63),
        "pink" => c(255, 192, 203),
        "plum" => c(221, 160, 221),
        "powderblue" => c(176, 224, 230),
        "purple" => c(128, 0, 128),
        "red" => c(255, 0, 0),
        "rosybrown" => c(188, 143, 143),
        "royalblue" => c(65, 105, 225),
        "saddlebrown" => c(139, 69, 19),
        "salmon" => c(250, 128, 114),
        "sandybrown" => c(244, 164, 96),
        "seagreen" => c(46, 139, 87),
        "seashell" => c(255, 245, 238),
        "sienna" => c(160, 82, 45),
        "silver" => c(192, 192, 192),
        "skyblue" => c(135, 206, 235),
        "slateblue" => c(106, 90, 205),
        "slategray" | "slategrey" => c(112, 128, 144),
        "snow" => c(255, 250, 250),
        "springgreen" => c(0, 255, 127),
        "steelblue" => c(70, 130, 180),
        "tan" => c(210, 180, 140),
        "teal" => c(0, 128, 128),
        "thistle" => c(216, 191, 216),
        "tomato" => c(255, 99, 71),
        "turquoise" => c(64, 224, 208),
        "violet" => c(238, 130, 238),
        "wheat" => c(245, 222, 179),
        "white" => c(255, 255, 255),
        "whitesmoke" => c(245, 245, 245),
        "yellow" => c(255, 255, 0),
        "yellowgreen" => c(154, 205, 50),
        _ => None,
    }
}
