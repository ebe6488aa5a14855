pub mod booking_service;
pub mod package_service;
