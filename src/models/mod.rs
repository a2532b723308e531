pub mod fulfillment_result;
pub mod record;
pub mod verification_token;

pub use fulfillment_result::FulfillmentResult;
pub use record::Record;
pub use verification_token::{NewToken, VerificationToken};
