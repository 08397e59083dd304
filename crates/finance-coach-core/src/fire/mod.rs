pub mod projection;
pub mod sensitivity;

pub use projection::{analyze_fire, fire_milestones, fire_number, project_to_fire, projection_series};
pub use sensitivity::fire_sensitivity;
