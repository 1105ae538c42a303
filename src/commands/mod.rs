pub mod chapters;
pub mod info;
pub mod split;
