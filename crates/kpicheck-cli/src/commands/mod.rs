pub mod check;
pub mod fix;
pub mod info;
