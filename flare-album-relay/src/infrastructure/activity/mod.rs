pub mod file_trail;

pub use file_trail::FileActivityTrail;
