pub mod applications;
pub mod backup_exchange;
pub mod companies;
pub mod core;
pub mod drives;
pub mod offers;
pub mod placements;
pub mod slots;
pub mod students;
