pub mod device;
pub mod reading;
