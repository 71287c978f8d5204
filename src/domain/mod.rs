mod error;
mod money;
mod participant;
mod split;
mod tab;
mod transaction;

pub use error::*;
pub use money::*;
pub use participant::*;
pub use split::*;
pub use tab::*;
pub use transaction::*;
