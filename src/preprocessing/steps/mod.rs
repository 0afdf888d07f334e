//! Individual pipeline stages

pub mod contours;
pub mod contrast;
pub mod load;
pub mod rectify;
pub mod resize;
pub mod threshold;
pub mod trim;
