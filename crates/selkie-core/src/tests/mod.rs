mod class;
mod flowchart;
mod gantt;
mod mindmap;
mod misc;
mod pie;

use crate::*;

/// Parses with the default engine; these inputs never hit a cap.
pub(crate) fn parse_ok(text: &str) -> ParsedDiagram {
    Engine::new().parse_diagram(text).unwrap()
}
