pub mod report;
pub mod select;
pub mod sync;
pub mod verify;
