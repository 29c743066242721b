//! A minimal, hand-rolled vector-graphics document builder.
//!
//! The output contract (declaration line, svg root, two-space per-node
//! indentation, exact attribute sets and ordering, five-entity XML escaping)
//! is itself part of what callers depend on, so this mirrors the original
//! project's own small `svg::Document`/`Circle`/`Polyline`/`Text` node types
//! rather than reaching for a general-purpose XML or SVG crate.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Color {
    Named(String),
    Rgb { r: u8, g: u8, b: u8 },
    Rgba { r: u8, g: u8, b: u8, a: f64 },
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Named(name) => write!(f, "{name}"),
            Color::Rgb { r, g, b } => write!(f, "rgb({r},{g},{b})"),
            Color::Rgba { r, g, b, a } => write!(f, "rgba({r},{g},{b},{a})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeLineCap {
    Butt,
    Round,
    Square,
}

impl fmt::Display for StrokeLineCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrokeLineCap::Butt => "butt",
            StrokeLineCap::Round => "round",
            StrokeLineCap::Square => "square",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeLineJoin {
    Arcs,
    Bevel,
    Miter,
    MiterClip,
    Round,
}

impl fmt::Display for StrokeLineJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrokeLineJoin::Arcs => "arcs",
            StrokeLineJoin::Bevel => "bevel",
            StrokeLineJoin::Miter => "miter",
            StrokeLineJoin::MiterClip => "miter-clip",
            StrokeLineJoin::Round => "round",
        };
        write!(f, "{s}")
    }
}

/// The fill/stroke attributes shared by every node kind. Each is emitted
/// only when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathProps {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub stroke_linecap: Option<StrokeLineCap>,
    pub stroke_linejoin: Option<StrokeLineJoin>,
}

impl PathProps {
    fn write_attrs(&self, out: &mut String) {
        if let Some(fill) = &self.fill {
            out.push_str(&format!(" fill=\"{fill}\""));
        }
        if let Some(stroke) = &self.stroke {
            out.push_str(&format!(" stroke=\"{stroke}\""));
        }
        if let Some(width) = self.stroke_width {
            out.push_str(&format!(" stroke-width=\"{width}\""));
        }
        if let Some(cap) = self.stroke_linecap {
            out.push_str(&format!(" stroke-linecap=\"{cap}\""));
        }
        if let Some(join) = self.stroke_linejoin {
            out.push_str(&format!(" stroke-linejoin=\"{join}\""));
        }
    }
}

fn escape(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Circle {
        center: Point,
        radius: f64,
        props: PathProps,
    },
    Polyline {
        points: Vec<Point>,
        props: PathProps,
    },
    Text {
        position: Point,
        offset: Point,
        font_size: u32,
        font_family: Option<String>,
        font_weight: Option<String>,
        data: String,
        props: PathProps,
    },
}

impl Node {
    fn write_to(&self, out: &mut String) {
        match self {
            Node::Circle {
                center,
                radius,
                props,
            } => {
                out.push_str(&format!(
                    "<circle cx=\"{}\" cy=\"{}\" r=\"{}\"",
                    center.x, center.y, radius
                ));
                props.write_attrs(out);
                out.push_str("/>");
            }
            Node::Polyline { points, props } => {
                out.push_str("<polyline points=\"");
                for (i, p) in points.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&format!("{},{}", p.x, p.y));
                }
                out.push('"');
                props.write_attrs(out);
                out.push_str("/>");
            }
            Node::Text {
                position,
                offset,
                font_size,
                font_family,
                font_weight,
                data,
                props,
            } => {
                out.push_str("<text");
                props.write_attrs(out);
                out.push_str(&format!(
                    " x=\"{}\" y=\"{}\" dx=\"{}\" dy=\"{}\" font-size=\"{}\"",
                    position.x, position.y, offset.x, offset.y, font_size
                ));
                if let Some(family) = font_family {
                    out.push_str(&format!(" font-family=\"{family}\""));
                }
                if let Some(weight) = font_weight {
                    out.push_str(&format!(" font-weight=\"{weight}\""));
                }
                out.push('>');
                out.push_str(&escape(data));
                out.push_str("</text>");
            }
        }
    }
}

/// An ordered list of nodes, rendered as a complete SVG document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n");
        out.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">\n");
        for node in &self.nodes {
            out.push_str("  ");
            node.write_to(&mut out);
            out.push('\n');
        }
        out.push_str("</svg>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document() {
        let doc = Document::new();
        assert_eq!(
            doc.render(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">\n</svg>"
        );
    }

    #[test]
    fn circle_renders_core_attrs() {
        let mut doc = Document::new();
        doc.add(Node::Circle {
            center: Point { x: 1.0, y: 2.0 },
            radius: 5.0,
            props: PathProps {
                fill: Some(Color::Named("white".to_string())),
                ..Default::default()
            },
        });
        let rendered = doc.render();
        assert!(rendered.contains("<circle cx=\"1\" cy=\"2\" r=\"5\" fill=\"white\"/>"));
    }

    #[test]
    fn text_escapes_entities() {
        let mut doc = Document::new();
        doc.add(Node::Text {
            position: Point { x: 0.0, y: 0.0 },
            offset: Point { x: 0.0, y: 0.0 },
            font_size: 10,
            font_family: Some("Verdana".to_string()),
            font_weight: None,
            data: "A & B <C>".to_string(),
            props: PathProps::default(),
        });
        let rendered = doc.render();
        assert!(rendered.contains("A &amp; B &lt;C&gt;"));
    }
}
