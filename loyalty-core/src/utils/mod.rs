pub mod claim_owner;
pub mod luhn;
pub mod shutdown;

pub use claim_owner::ClaimOwner;
pub use luhn::{LuhnError, validate_order_number};
pub use shutdown::shutdown_requested;
