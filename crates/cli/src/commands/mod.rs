pub mod doctor;
pub mod seed;
pub mod serve;
