//! Structured attributes exported next to the rendered image.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::{
    Area, CalibrationPoint, ImageDimensions, MapSnapshot, Obstacle, Path, Point, Room, Wall,
    Zone,
};
use crate::error::Result;

/// Image section of the attributes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageAttributes {
    pub dimensions: ImageDimensions,
    /// Raw raster payload size in bytes
    pub size: usize,
    pub is_empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Everything a consumer needs besides the pixels
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapAttributes {
    pub calibration_points: Vec<CalibrationPoint>,
    pub charger: Option<Point>,
    pub goto: Option<Point>,
    pub goto_path: Option<Path>,
    pub goto_predicted_path: Option<Path>,
    pub image: ImageAttributes,
    pub is_empty: bool,
    pub map_name: Option<String>,
    pub no_go_areas: Vec<Area>,
    pub no_mopping_areas: Vec<Area>,
    pub obstacles: Vec<Obstacle>,
    pub ignored_obstacles: Vec<Obstacle>,
    pub obstacles_with_photo: Vec<Obstacle>,
    pub ignored_obstacles_with_photo: Vec<Obstacle>,
    pub path: Option<Path>,
    pub room_numbers: Vec<u32>,
    pub rooms: BTreeMap<u32, Room>,
    pub vacuum_position: Option<Point>,
    pub vacuum_room: Option<u32>,
    pub vacuum_room_name: Option<String>,
    pub walls: Vec<Wall>,
    pub zones: Vec<Zone>,
    pub cleaned_rooms: BTreeSet<u32>,
}

impl MapAttributes {
    /// Collect attributes from a decoded snapshot
    pub fn from_snapshot(snapshot: &MapSnapshot) -> Self {
        let image = &snapshot.image;
        Self {
            calibration_points: snapshot.calibration(),
            charger: snapshot.charger,
            goto: snapshot.goto_target,
            goto_path: snapshot.goto_path.clone(),
            goto_predicted_path: snapshot.predicted_path.clone(),
            image: ImageAttributes {
                dimensions: image.dimensions,
                size: image.size,
                is_empty: image.is_empty(),
                message: image.message.clone(),
            },
            is_empty: image.is_empty(),
            map_name: snapshot.map_name.clone(),
            no_go_areas: snapshot.no_go_areas.clone(),
            no_mopping_areas: snapshot.no_mopping_areas.clone(),
            obstacles: snapshot.obstacles.clone(),
            ignored_obstacles: snapshot.ignored_obstacles.clone(),
            obstacles_with_photo: snapshot.obstacles_with_photo.clone(),
            ignored_obstacles_with_photo: snapshot.ignored_obstacles_with_photo.clone(),
            path: snapshot.path.clone(),
            room_numbers: snapshot.rooms.keys().copied().collect(),
            rooms: snapshot.rooms.clone(),
            vacuum_position: snapshot.vacuum_position,
            vacuum_room: snapshot.vacuum_room,
            vacuum_room_name: snapshot.vacuum_room_name().map(str::to_string),
            walls: snapshot.walls.clone(),
            zones: snapshot.zones.clone(),
            cleaned_rooms: snapshot.cleaned_rooms.clone(),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BoundingBox;

    #[test]
    fn test_attributes_from_snapshot() {
        let mut s = MapSnapshot::default();
        s.rooms.insert(
            3,
            Room::new(3, BoundingBox::point(1.0, 1.0)).with_name("Hall"),
        );
        s.rooms.insert(1, Room::new(1, BoundingBox::point(0.0, 0.0)));
        s.vacuum_room = Some(3);
        s.charger = Some(Point::with_angle(1.0, 2.0, 90.0));

        let attrs = MapAttributes::from_snapshot(&s);
        assert_eq!(attrs.room_numbers, vec![1, 3]);
        assert_eq!(attrs.vacuum_room_name.as_deref(), Some("Hall"));
        assert_eq!(attrs.calibration_points.len(), 3);
        assert!(attrs.is_empty);
        assert_eq!(attrs.image.message.as_deref(), Some("NO MAP"));
    }

    #[test]
    fn test_attributes_json() {
        let mut s = MapSnapshot::default();
        s.map_name = Some("Ground floor".to_string());
        let json = MapAttributes::from_snapshot(&s).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["map_name"], "Ground floor");
        assert_eq!(value["calibration_points"].as_array().unwrap().len(), 3);
        assert_eq!(value["is_empty"], true);
    }
}
