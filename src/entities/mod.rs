pub mod daily_record;
pub mod product;

pub use crate::auth::user;
