use crate::types::{Color, Pt, Shading, Size, TextAnchor};

/// One draw request recorded by the canvas. Backends replay these in order;
/// the renderer never talks to a backend directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    ConcatMatrix {
        a: f32,
        b: f32,
        c: f32,
        d: f32,
        e: Pt,
        f: Pt,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetLineCap(u8),
    SetLineJoin(u8),
    // Applies both fill and stroke alpha. Values outside 0..1 are clamped.
    SetOpacity {
        fill: f32,
        stroke: f32,
    },
    SetFontName(String),
    SetFontSize(Pt),
    // Clip to the current path. The current path is consumed.
    ClipPath {
        evenodd: bool,
    },
    // Paint a shading over the clipped region. Usually used with ClipPath.
    ShadingFill(Shading),
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    CurveTo {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
        x: Pt,
        y: Pt,
    },
    ClosePath,
    Fill,
    FillEvenOdd,
    Stroke,
    FillStroke,
    FillStrokeEvenOdd,
    // Baseline-origin text run. Anchor alignment needs font metrics, so it
    // rides along for the backend to resolve.
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
        anchor: TextAnchor,
    },
}

/// A finished recording: the surface size plus every draw request in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub size: Size,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    line_cap: u8,
    line_join: u8,
    font_size: Pt,
    font_name: String,
}

/// Command recorder. Tracks enough graphics state to drop redundant setter
/// commands; everything else is appended verbatim.
pub struct Canvas {
    size: Size,
    commands: Vec<Command>,
    state_stack: Vec<GraphicsState>,
    current_state: GraphicsState,
}

impl Canvas {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            commands: Vec::new(),
            state_stack: Vec::new(),
            current_state: GraphicsState {
                fill_color: Color::BLACK,
                stroke_color: Color::BLACK,
                line_width: Pt::from_f32(1.0),
                line_cap: 0,
                line_join: 0,
                font_size: Pt::from_f32(16.0),
                font_name: String::new(),
            },
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.current_state.clone());
        self.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.current_state = state;
            self.commands.push(Command::RestoreState);
        }
    }

    pub fn concat_matrix(&mut self, a: f32, b: f32, c: f32, d: f32, e: Pt, f: Pt) {
        self.commands.push(Command::ConcatMatrix { a, b, c, d, e, f });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = if width < Pt::ZERO { Pt::ZERO } else { width };
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_line_cap(&mut self, cap: u8) {
        if self.current_state.line_cap == cap {
            return;
        }
        self.current_state.line_cap = cap;
        self.commands.push(Command::SetLineCap(cap));
    }

    pub fn set_line_join(&mut self, join: u8) {
        if self.current_state.line_join == join {
            return;
        }
        self.current_state.line_join = join;
        self.commands.push(Command::SetLineJoin(join));
    }

    pub fn set_opacity(&mut self, fill: f32, stroke: f32) {
        self.commands.push(Command::SetOpacity {
            fill: fill.clamp(0.0, 1.0),
            stroke: stroke.clamp(0.0, 1.0),
        });
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.current_state.font_name == name {
            return;
        }
        self.current_state.font_name = name.to_string();
        self.commands
            .push(Command::SetFontName(self.current_state.font_name.clone()));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.commands.push(Command::SetFontSize(size));
    }

    pub fn clip_path(&mut self, evenodd: bool) {
        self.commands.push(Command::ClipPath { evenodd });
    }

    pub fn shading_fill(&mut self, shading: Shading) {
        self.commands.push(Command::ShadingFill(shading));
    }

    pub fn move_to(&mut self, x: Pt, y: Pt) {
        self.commands.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: Pt, y: Pt) {
        self.commands.push(Command::LineTo { x, y });
    }

    pub fn curve_to(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt, x: Pt, y: Pt) {
        self.commands.push(Command::CurveTo {
            x1,
            y1,
            x2,
            y2,
            x,
            y,
        });
    }

    pub fn close_path(&mut self) {
        self.commands.push(Command::ClosePath);
    }

    pub fn fill(&mut self) {
        self.commands.push(Command::Fill);
    }

    pub fn fill_evenodd(&mut self) {
        self.commands.push(Command::FillEvenOdd);
    }

    pub fn stroke(&mut self) {
        self.commands.push(Command::Stroke);
    }

    pub fn fill_stroke(&mut self) {
        self.commands.push(Command::FillStroke);
    }

    pub fn fill_stroke_evenodd(&mut self) {
        self.commands.push(Command::FillStrokeEvenOdd);
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>, anchor: TextAnchor) {
        self.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
            anchor,
        });
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn finish(self) -> Document {
        Document {
            size: self.size,
            commands: self.commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_color_setters_are_dropped() {
        let mut canvas = Canvas::new(Size {
            width: 10.0,
            height: 10.0,
        });
        canvas.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        canvas.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        let doc = canvas.finish();
        assert_eq!(doc.commands.len(), 1);
    }

    #[test]
    fn restore_resets_setter_dedup_state() {
        let mut canvas = Canvas::new(Size {
            width: 10.0,
            height: 10.0,
        });
        canvas.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        canvas.save_state();
        canvas.set_fill_color(Color::rgb(0.0, 1.0, 0.0));
        canvas.restore_state();
        // The restore reverted the tracked state, so re-setting green must
        // record a fresh command.
        canvas.set_fill_color(Color::rgb(0.0, 1.0, 0.0));
        let doc = canvas.finish();
        assert_eq!(
            doc.commands
                .iter()
                .filter(|c| matches!(c, Command::SetFillColor(_)))
                .count(),
            3
        );
    }
}
