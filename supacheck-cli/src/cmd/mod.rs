pub mod doctor;
pub mod show;
pub mod validate;
pub mod verify;
