//! Default value functions for serde deserialization.

pub fn scale() -> f32 {
    1.0
}

pub fn charger_radius() -> f32 {
    6.0
}

pub fn vacuum_radius() -> f32 {
    6.0
}

pub fn path_width() -> f32 {
    1.0
}

pub fn obstacle_radius() -> f32 {
    3.0
}

pub fn virtual_wall_width() -> f32 {
    2.0
}

pub fn font_size() -> u32 {
    1
}

pub fn text_color() -> super::Color {
    super::Color::rgb(0, 0, 0)
}
