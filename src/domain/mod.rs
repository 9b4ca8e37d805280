pub mod payment;
pub mod tariff;
pub mod user;

pub use payment::*;
pub use tariff::*;
pub use user::*;
