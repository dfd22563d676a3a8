// Models module - Database entity and remote payload representations

pub mod code;
pub mod event;
pub mod marketplace;
pub mod transaction;

pub use code::EcomCode;
pub use event::PaymentEventData;
pub use marketplace::{ItemMagento, OrderMagento, UserMagento};
pub use transaction::{EcomTransaction, PaymentStatus};
