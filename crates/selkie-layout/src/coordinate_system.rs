//! Coordinate system adjustment helpers.
//!
//! Positioning and routing work in a top-to-bottom frame: ranks grow along `y`, order along
//! `x`. Other directions are produced by mapping sizes into that frame before positioning and
//! mapping points back afterwards.

use selkie_graph::{Direction, Point};

/// Size of a box as seen by the top-to-bottom frame.
pub fn adjust(direction: Direction, width: f64, height: f64) -> (f64, f64) {
    match direction {
        Direction::LR | Direction::RL => (height, width),
        Direction::TB | Direction::BT => (width, height),
    }
}

/// Maps a frame point into the diagram's own direction.
pub fn undo(direction: Direction, p: Point) -> Point {
    let p = match direction {
        Direction::BT | Direction::RL => reverse_y(p),
        Direction::TB | Direction::LR => p,
    };
    match direction {
        Direction::LR | Direction::RL => swap_xy(p),
        Direction::TB | Direction::BT => p,
    }
}

fn reverse_y(p: Point) -> Point {
    Point::new(p.x, -p.y)
}

fn swap_xy(p: Point) -> Point {
    Point::new(p.y, p.x)
}
