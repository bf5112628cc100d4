use selkie_graph::{Direction, Point};
use selkie_layout::coordinate_system;

#[test]
fn coordinate_system_adjust_keeps_dimensions_for_vertical_directions() {
    assert_eq!(coordinate_system::adjust(Direction::TB, 100.0, 200.0), (100.0, 200.0));
    assert_eq!(coordinate_system::adjust(Direction::BT, 100.0, 200.0), (100.0, 200.0));
}

#[test]
fn coordinate_system_adjust_swaps_dimensions_for_horizontal_directions() {
    assert_eq!(coordinate_system::adjust(Direction::LR, 100.0, 200.0), (200.0, 100.0));
    assert_eq!(coordinate_system::adjust(Direction::RL, 100.0, 200.0), (200.0, 100.0));
}

#[test]
fn coordinate_system_undo_maps_frame_points() {
    let p = Point::new(100.0, 200.0);
    assert_eq!(coordinate_system::undo(Direction::TB, p), Point::new(100.0, 200.0));
    assert_eq!(coordinate_system::undo(Direction::BT, p), Point::new(100.0, -200.0));
    assert_eq!(coordinate_system::undo(Direction::LR, p), Point::new(200.0, 100.0));
    assert_eq!(coordinate_system::undo(Direction::RL, p), Point::new(-200.0, 100.0));
}
