pub mod features;
pub mod labels;
