pub mod ride;
pub mod waypoint;
