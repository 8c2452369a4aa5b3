pub mod class_table;
pub mod grayscale;
pub mod pixel_grid;
pub mod severity;
pub mod spot_mask;
pub mod spot_ratio;
pub mod utils;
