pub mod backup;
pub mod images;
